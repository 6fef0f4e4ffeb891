use featuregen::command_builder::{build, working_directory, USER_STORY_ARG};
use featuregen::parameters::NamedParameter;
use featuregen::store::LlmConfiguration;
use std::path::PathBuf;

fn argv(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn generator(debug: bool) -> LlmConfiguration {
    LlmConfiguration::new("gpt", "gen.py", "python3")
        .with_parameter(NamedParameter::boolean("Debug", "--debug", debug))
        .with_parameter(NamedParameter::double("Temp", "--temperature", 0.7))
}

#[test]
fn test_empty_parameters_yield_minimal_argv() {
    let config = LlmConfiguration::new("plain", "gen.py", "python3");
    let line = build(&config, "story.txt");

    assert_eq!(
        line.argv,
        argv(&["python3", "gen.py", "--user_story_path", "story.txt"])
    );
    assert_eq!(line.working_directory, PathBuf::from("."));
}

#[test]
fn test_debug_and_temperature() {
    let line = build(&generator(true), "story.txt");
    assert_eq!(
        line.argv,
        argv(&[
            "python3",
            "gen.py",
            "--debug",
            "--temperature",
            "0.7",
            "--user_story_path",
            "story.txt"
        ])
    );
}

#[test]
fn test_unchecked_debug_is_omitted() {
    let line = build(&generator(false), "story.txt");
    assert_eq!(
        line.argv,
        argv(&[
            "python3",
            "gen.py",
            "--temperature",
            "0.7",
            "--user_story_path",
            "story.txt"
        ])
    );
    assert!(!line.argv.contains(&"--debug".to_string()));
}

#[test]
fn test_true_boolean_appears_once_without_value() {
    let line = build(&generator(true), "story.txt");
    let positions: Vec<_> = line
        .argv
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == "--debug")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(positions.len(), 1);
    assert!(line.argv[positions[0] + 1].starts_with("--"));
}

#[test]
fn test_blank_string_and_list_values_emit_nothing() {
    let config = LlmConfiguration::new("gemini", "gemini_main.py", "python3")
        .with_parameter(NamedParameter::string("Model", "--model", "   "))
        .with_parameter(NamedParameter::list(
            "Language",
            "--language",
            "",
            vec!["en".to_string(), "de".to_string()],
        ))
        .with_parameter(NamedParameter::string("Prompt", "--prompt", "  be brief  "));

    let line = build(&config, "story.txt");
    assert_eq!(
        line.argv,
        argv(&[
            "python3",
            "gemini_main.py",
            "--prompt",
            "be brief",
            "--user_story_path",
            "story.txt"
        ])
    );
}

#[test]
fn test_blank_arg_name_is_never_emitted() {
    let config = LlmConfiguration::new("gpt", "gen.py", "python3")
        .with_parameter(NamedParameter::int("Hidden", "", 3))
        .with_parameter(NamedParameter::boolean("Flag", "  ", true));

    let line = build(&config, "story.txt");
    assert_eq!(
        line.argv,
        argv(&["python3", "gen.py", "--user_story_path", "story.txt"])
    );
}

#[test]
fn test_parameter_order_is_preserved_and_story_is_last() {
    let config = LlmConfiguration::new("deepseek", "deepseek_main.py", "python3")
        .with_parameter(NamedParameter::int("Seed", "--seed", 42))
        .with_parameter(NamedParameter::list(
            "Model",
            "--model",
            "deepseek-chat",
            vec!["deepseek-chat".to_string()],
        ))
        .with_parameter(NamedParameter::double("Temp", "--temperature", 2.0))
        .with_parameter(NamedParameter::boolean("Verbose", "-v", true));

    let line = build(&config, "stories/login.txt");
    assert_eq!(
        line.argv,
        argv(&[
            "python3",
            "deepseek_main.py",
            "--seed",
            "42",
            "--model",
            "deepseek-chat",
            "--temperature",
            "2.0",
            "-v",
            USER_STORY_ARG,
            "stories/login.txt"
        ])
    );
}

#[test]
fn test_working_directory_from_output_dir_parameter() {
    let config = LlmConfiguration::new("gpt", "gen.py", "python3")
        .with_parameter(NamedParameter::string("Output", "--output_dir_path", " out/gpt "));

    let line = build(&config, "story.txt");
    assert_eq!(line.working_directory, PathBuf::from("out/gpt"));
    assert_eq!(working_directory(&config), PathBuf::from("out/gpt"));
    assert!(line.argv.contains(&"out/gpt".to_string()));
}

#[test]
fn test_blank_output_dir_falls_back_to_current_directory() {
    let config = LlmConfiguration::new("gpt", "gen.py", "python3")
        .with_parameter(NamedParameter::string("Output", "--output_dir_path", ""));

    assert_eq!(working_directory(&config), PathBuf::from("."));
}
