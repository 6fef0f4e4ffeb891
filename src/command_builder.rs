use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::parameters::{format_double, ParameterValue, OUTPUT_DIR_ARG};
use crate::store::LlmConfiguration;

/// Flag under which the user story path is always passed, last.
pub const USER_STORY_ARG: &str = "--user_story_path";

/// A resolved invocation: program + arguments and the directory to run in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub argv: Vec<String>,
    pub working_directory: PathBuf,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.argv.iter().map(|arg| quote(arg)).collect();
        write!(f, "{}", rendered.join(" "))
    }
}

fn quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Compiles a configuration and a user story path into a command line.
///
/// `argv` is `[command, script, <parameters in order>, --user_story_path, input]`.
/// Parameters with a blank arg name are skipped, booleans emit only their flag
/// and only when true, blank string/list values emit nothing at all, and
/// numbers use `.` as decimal separator. The working directory is the
/// `--output_dir_path` string parameter when set, otherwise `.`.
pub fn build(config: &LlmConfiguration, input_path: &str) -> CommandLine {
    let mut argv = vec![config.command.clone(), config.script_file_path.clone()];

    for parameter in &config.named_parameters {
        if parameter.arg_name.trim().is_empty() {
            continue;
        }
        let flag = parameter.arg_name.clone();

        match &parameter.value {
            ParameterValue::Boolean(enabled) => {
                if *enabled {
                    argv.push(flag);
                }
            }
            ParameterValue::String(value) | ParameterValue::List { value, .. } => {
                let value = value.trim();
                if !value.is_empty() {
                    argv.push(flag);
                    argv.push(value.to_string());
                }
            }
            ParameterValue::Int(value) => {
                argv.push(flag);
                argv.push(value.to_string());
            }
            ParameterValue::Double(value) => {
                argv.push(flag);
                argv.push(format_double(*value));
            }
        }
    }

    argv.push(USER_STORY_ARG.to_string());
    argv.push(input_path.to_string());

    let working_directory = working_directory(config);

    debug!(llm = %config.name, argv = ?argv, cwd = %working_directory.display(), "built command line");
    CommandLine {
        argv,
        working_directory,
    }
}

/// Directory a configuration's generator runs in: the non-blank
/// `--output_dir_path` string parameter, otherwise `.`.
pub fn working_directory(config: &LlmConfiguration) -> PathBuf {
    config
        .named_parameters
        .iter()
        .find(|p| p.arg_name == OUTPUT_DIR_ARG)
        .and_then(|p| match &p.value {
            ParameterValue::String(dir) if !dir.trim().is_empty() => {
                Some(PathBuf::from(dir.trim()))
            }
            _ => None,
        })
        .unwrap_or_else(|| PathBuf::from("."))
}
