use featuregen::error_handler::FeatureGenError;
use featuregen::parameters::NamedParameter;
use featuregen::store::{ConfigurationStore, LlmConfiguration};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

/// A scratch directory holding a script and a parameter spec file.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("gen.py"), "print('Feature: x')\n").unwrap();
    fs::write(dir.path().join("params.json"), "[]").unwrap();
    dir
}

fn config_in(dir: &Path, name: &str) -> LlmConfiguration {
    LlmConfiguration::new(
        name,
        &dir.join("gen.py").display().to_string(),
        "python3",
    )
    .with_spec(&dir.join("params.json").display().to_string())
}

#[test]
fn test_add_and_list() {
    let dir = workspace();
    let mut store = ConfigurationStore::new();

    assert_ok!(store.add(config_in(dir.path(), "gpt")));
    assert_ok!(store.add(config_in(dir.path(), "gemini")));

    let names: Vec<_> = store.list().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["gpt", "gemini"]);
}

#[test]
fn test_duplicate_name_leaves_store_unchanged() {
    let dir = workspace();
    let mut store = ConfigurationStore::new();
    let first = config_in(dir.path(), "gpt");
    store.add(first.clone()).unwrap();

    let second = LlmConfiguration {
        command: "python".to_string(),
        ..config_in(dir.path(), "gpt")
    };
    let err = assert_err!(store.add(second));

    assert!(matches!(err, FeatureGenError::DuplicateName(name) if name == "gpt"));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get_by_name("gpt"), Some(&first));
}

#[test]
fn test_add_rejects_missing_files() {
    let dir = workspace();
    let mut store = ConfigurationStore::new();

    let missing_script = LlmConfiguration::new("gpt", "does/not/exist.py", "python3")
        .with_spec(&dir.path().join("params.json").display().to_string());
    assert!(matches!(
        store.add(missing_script),
        Err(FeatureGenError::InvalidPath { .. })
    ));

    let missing_spec = config_in(dir.path(), "gpt").with_spec("nope.json");
    assert!(matches!(
        store.add(missing_spec),
        Err(FeatureGenError::InvalidPath { path }) if path.ends_with("nope.json")
    ));
    assert!(store.is_empty());
}

#[test]
fn test_add_rejects_invalid_parameters() {
    let dir = workspace();
    let mut store = ConfigurationStore::new();

    let bad_flag = config_in(dir.path(), "gpt")
        .with_parameter(NamedParameter::string("Model", "model name", "gpt-4o"));
    assert!(matches!(
        store.add(bad_flag),
        Err(FeatureGenError::InvalidParameter { .. })
    ));

    let blank_required = config_in(dir.path(), "gpt")
        .with_parameter(NamedParameter::string("Model", "--model", " ").required(true));
    assert!(matches!(
        store.add(blank_required),
        Err(FeatureGenError::MissingRequired(key)) if key == "Model"
    ));

    assert!(store.is_empty());
}

#[test]
fn test_update_replaces_configuration() {
    let dir = workspace();
    let mut store = ConfigurationStore::new();
    store.add(config_in(dir.path(), "gpt")).unwrap();

    let renamed = config_in(dir.path(), "gpt-4o")
        .with_parameter(NamedParameter::double("Temp", "--temperature", 0.2));
    assert_ok!(store.update("gpt", renamed.clone()));

    assert_eq!(store.get_by_name("gpt-4o"), Some(&renamed));
    assert!(store.get_by_name("gpt").is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_update_errors() {
    let dir = workspace();
    let mut store = ConfigurationStore::new();
    store.add(config_in(dir.path(), "gpt")).unwrap();
    store.add(config_in(dir.path(), "gemini")).unwrap();

    assert!(matches!(
        store.update("claude", config_in(dir.path(), "claude")),
        Err(FeatureGenError::NotFound(name)) if name == "claude"
    ));
    assert!(matches!(
        store.update("gpt", config_in(dir.path(), "gemini")),
        Err(FeatureGenError::DuplicateName(_))
    ));
    // Keeping its own name is not a collision.
    assert_ok!(store.update("gpt", config_in(dir.path(), "gpt")));
}

#[test]
fn test_remove_and_selection() {
    let dir = workspace();
    let mut store = ConfigurationStore::new();
    store.add(config_in(dir.path(), "gpt")).unwrap();
    store.add(config_in(dir.path(), "gemini")).unwrap();

    assert!(store.selected().is_none());
    assert_ok!(store.select("gemini"));
    assert_eq!(store.selected().map(|c| c.name.as_str()), Some("gemini"));
    assert!(matches!(store.select("claude"), Err(FeatureGenError::NotFound(_))));

    store
        .update("gemini", config_in(dir.path(), "gemini-pro"))
        .unwrap();
    assert_eq!(store.selected().map(|c| c.name.as_str()), Some("gemini-pro"));

    let removed = store.remove("gemini-pro").unwrap();
    assert_eq!(removed.name, "gemini-pro");
    assert!(store.selected().is_none());
    assert!(matches!(store.remove("gemini-pro"), Err(FeatureGenError::NotFound(_))));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_save_and_load() {
    let dir = workspace();
    let path = dir.path().join("state").join("llms.yml");

    let mut store = ConfigurationStore::new();
    store
        .add(
            config_in(dir.path(), "gpt")
                .with_parameter(NamedParameter::boolean("Debug", "--debug", false))
                .with_parameter(NamedParameter::int("Seed", "--seed", 7))
                .with_parameter(NamedParameter::list(
                    "Model",
                    "--model",
                    "gpt-4o",
                    vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
                )),
        )
        .unwrap();
    store.select("gpt").unwrap();

    assert_ok!(store.save(&path));
    let loaded = ConfigurationStore::load(&path).unwrap();

    assert_eq!(loaded, store);
    assert_eq!(loaded.selected().map(|c| c.name.as_str()), Some("gpt"));
}

#[test]
fn test_load_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = ConfigurationStore::load(&dir.path().join("llms.yml")).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_load_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("llms.yml");
    fs::write(&path, "configurations: [ {name: ").unwrap();

    let err = ConfigurationStore::load(&path).unwrap_err();
    assert_eq!(err.kind(), "config_parse");
}

#[test]
fn test_load_rejects_hand_edited_duplicates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("llms.yml");
    fs::write(
        &path,
        "configurations:\n  - name: gpt\n    scriptFilePath: a.py\n    command: python3\n  - name: gpt\n    scriptFilePath: b.py\n    command: python3\n",
    )
    .unwrap();

    let err = ConfigurationStore::load(&path).unwrap_err();
    assert!(matches!(err, FeatureGenError::ConfigParse { .. }));
}
