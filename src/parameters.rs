//! Typed, CLI-flag-bound parameters attached to an LLM configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use crate::error_handler::{FeatureGenError, Result};

/// Arg name of the parameter that doubles as the child's working directory.
pub const OUTPUT_DIR_ARG: &str = "--output_dir_path";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParameter", into = "RawParameter")]
pub struct NamedParameter {
    pub key: String,
    /// Flag to emit, e.g. `--temperature`. Empty means the parameter is never emitted.
    pub arg_name: String,
    pub required: bool,
    pub description: String,
    pub value: ParameterValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Int(i64),
    Double(f64),
    Boolean(bool),
    List {
        value: String,
        allowed_values: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Int,
    Double,
    Boolean,
    List,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::String => "string",
            ParameterKind::Int => "int",
            ParameterKind::Double => "double",
            ParameterKind::Boolean => "boolean",
            ParameterKind::List => "list",
        };
        f.write_str(name)
    }
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterKind {
        match self {
            ParameterValue::String(_) => ParameterKind::String,
            ParameterValue::Int(_) => ParameterKind::Int,
            ParameterValue::Double(_) => ParameterKind::Double,
            ParameterValue::Boolean(_) => ParameterKind::Boolean,
            ParameterValue::List { .. } => ParameterKind::List,
        }
    }

    /// Human-readable rendering used by `llm show` and reports.
    pub fn display_value(&self) -> String {
        match self {
            ParameterValue::String(s) => s.clone(),
            ParameterValue::Int(i) => i.to_string(),
            ParameterValue::Double(d) => format_double(*d),
            ParameterValue::Boolean(b) => b.to_string(),
            ParameterValue::List { value, .. } => value.clone(),
        }
    }
}

/// Canonical decimal form of a double: `.` separator, integral values keep a
/// trailing `.0` (`2.0`, not `2`).
pub fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

impl NamedParameter {
    fn with_value(key: &str, arg_name: &str, value: ParameterValue) -> Self {
        Self {
            key: key.to_string(),
            arg_name: arg_name.to_string(),
            required: false,
            description: String::new(),
            value,
        }
    }

    pub fn string(key: &str, arg_name: &str, value: &str) -> Self {
        Self::with_value(key, arg_name, ParameterValue::String(value.to_string()))
    }

    pub fn int(key: &str, arg_name: &str, value: i64) -> Self {
        Self::with_value(key, arg_name, ParameterValue::Int(value))
    }

    pub fn double(key: &str, arg_name: &str, value: f64) -> Self {
        Self::with_value(key, arg_name, ParameterValue::Double(value))
    }

    pub fn boolean(key: &str, arg_name: &str, value: bool) -> Self {
        Self::with_value(key, arg_name, ParameterValue::Boolean(value))
    }

    pub fn list(key: &str, arg_name: &str, value: &str, allowed_values: Vec<String>) -> Self {
        Self::with_value(
            key,
            arg_name,
            ParameterValue::List {
                value: value.to_string(),
                allowed_values,
            },
        )
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Checks a single parameter's intrinsic constraints.
    pub fn validate(&self) -> Result<()> {
        if !self.arg_name.is_empty() && !arg_name_pattern().is_match(&self.arg_name) {
            return Err(FeatureGenError::invalid_parameter(
                &self.key,
                format!("'{}' is not a valid command-line flag", self.arg_name),
            ));
        }

        match &self.value {
            ParameterValue::String(value) => {
                if self.required && value.trim().is_empty() {
                    return Err(FeatureGenError::MissingRequired(self.key.clone()));
                }
            }
            ParameterValue::List {
                value,
                allowed_values,
            } => {
                if self.required && value.trim().is_empty() {
                    return Err(FeatureGenError::MissingRequired(self.key.clone()));
                }
                if !value.trim().is_empty()
                    && !allowed_values.is_empty()
                    && !allowed_values.iter().any(|allowed| allowed == value)
                {
                    return Err(FeatureGenError::invalid_parameter(
                        &self.key,
                        format!(
                            "'{}' is not one of the allowed values: {}",
                            value,
                            allowed_values.join(", ")
                        ),
                    ));
                }
            }
            ParameterValue::Double(value) => {
                if !value.is_finite() {
                    return Err(FeatureGenError::invalid_parameter(
                        &self.key,
                        "value must be a finite number",
                    ));
                }
            }
            ParameterValue::Int(_) | ParameterValue::Boolean(_) => {}
        }

        Ok(())
    }
}

/// Validates a configuration's parameter list: unique keys and per-parameter rules.
pub fn validate_all(parameters: &[NamedParameter]) -> Result<()> {
    let mut seen = HashSet::new();
    for parameter in parameters {
        if parameter.key.trim().is_empty() {
            return Err(FeatureGenError::invalid_parameter(
                &parameter.arg_name,
                "parameter key cannot be empty",
            ));
        }
        if !seen.insert(parameter.key.as_str()) {
            return Err(FeatureGenError::invalid_parameter(
                &parameter.key,
                "duplicate parameter key",
            ));
        }
        parameter.validate()?;
    }
    Ok(())
}

fn arg_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^-{1,2}[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("arg name pattern is valid")
    })
}

/// Flat on-disk shape shared by the store file and the LLM definitions document:
/// `{type, key?, argName, required?, description?, value, allowedValues?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParameter {
    #[serde(rename = "type")]
    kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default)]
    arg_name: String,
    #[serde(default)]
    required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default)]
    value: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    allowed_values: Vec<String>,
}

impl TryFrom<RawParameter> for NamedParameter {
    type Error = String;

    fn try_from(raw: RawParameter) -> std::result::Result<Self, Self::Error> {
        let key = raw
            .key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| raw.arg_name.trim_start_matches('-').to_string());

        let mismatch = |expected: &str| {
            format!(
                "parameter '{}' has type {} but its value {} is not {}",
                key, raw.kind, raw.value, expected
            )
        };

        let value = match raw.kind {
            ParameterKind::String => ParameterValue::String(match &raw.value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            ParameterKind::Int => match &raw.value {
                Value::Null => ParameterValue::Int(0),
                Value::Number(n) => {
                    ParameterValue::Int(n.as_i64().ok_or_else(|| mismatch("an integer"))?)
                }
                Value::String(s) => ParameterValue::Int(
                    s.trim().parse().map_err(|_| mismatch("an integer"))?,
                ),
                _ => return Err(mismatch("an integer")),
            },
            ParameterKind::Double => match &raw.value {
                Value::Null => ParameterValue::Double(0.0),
                Value::Number(n) => {
                    ParameterValue::Double(n.as_f64().ok_or_else(|| mismatch("a number"))?)
                }
                Value::String(s) => ParameterValue::Double(
                    s.trim().parse().map_err(|_| mismatch("a number"))?,
                ),
                _ => return Err(mismatch("a number")),
            },
            ParameterKind::Boolean => match &raw.value {
                Value::Null => ParameterValue::Boolean(false),
                Value::Bool(b) => ParameterValue::Boolean(*b),
                Value::String(s) => ParameterValue::Boolean(
                    parse_flag(s).ok_or_else(|| mismatch("a boolean"))?,
                ),
                _ => return Err(mismatch("a boolean")),
            },
            ParameterKind::List => ParameterValue::List {
                value: match &raw.value {
                    Value::Null => String::new(),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
                allowed_values: raw.allowed_values,
            },
        };

        Ok(NamedParameter {
            key,
            arg_name: raw.arg_name,
            required: raw.required,
            description: raw.description,
            value,
        })
    }
}

impl From<NamedParameter> for RawParameter {
    fn from(parameter: NamedParameter) -> Self {
        let kind = parameter.value.kind();
        let (value, allowed_values) = match parameter.value {
            ParameterValue::String(s) => (Value::String(s), Vec::new()),
            ParameterValue::Int(i) => (Value::from(i), Vec::new()),
            ParameterValue::Double(d) => (Value::from(d), Vec::new()),
            ParameterValue::Boolean(b) => (Value::Bool(b), Vec::new()),
            ParameterValue::List {
                value,
                allowed_values,
            } => (Value::String(value), allowed_values),
        };

        RawParameter {
            kind,
            key: Some(parameter.key),
            arg_name: parameter.arg_name,
            required: parameter.required,
            description: parameter.description,
            value,
            allowed_values,
        }
    }
}

/// Lenient boolean parsing shared by the on-disk format and form inputs.
pub fn parse_flag(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_use_canonical_decimal_form() {
        assert_eq!(format_double(0.7), "0.7");
        assert_eq!(format_double(2.0), "2.0");
        assert_eq!(format_double(-1.25), "-1.25");
        assert_eq!(format_double(0.0), "0.0");
    }

    #[test]
    fn parses_cli_shaped_parameter_without_key() {
        let json = r#"{"type": "double", "argName": "--temperature", "value": 0.7}"#;
        let parameter: NamedParameter = serde_json::from_str(json).unwrap();

        assert_eq!(parameter.key, "temperature");
        assert_eq!(parameter.arg_name, "--temperature");
        assert_eq!(parameter.value, ParameterValue::Double(0.7));
        assert!(!parameter.required);
    }

    #[test]
    fn rejects_value_of_wrong_type() {
        let json = r#"{"type": "int", "argName": "--seed", "value": "forty-two"}"#;
        let err = serde_json::from_str::<NamedParameter>(json).unwrap_err();
        assert!(err.to_string().contains("is not an integer"));
    }

    #[test]
    fn list_parameter_keeps_allowed_values_through_yaml() {
        let parameter = NamedParameter::list(
            "Model",
            "--model",
            "deepseek-chat",
            vec!["deepseek-chat".to_string(), "deepseek-coder".to_string()],
        );
        let yaml = serde_yaml::to_string(&parameter).unwrap();
        assert!(yaml.contains("type: list"));
        assert!(yaml.contains("allowedValues"));

        let back: NamedParameter = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, parameter);
    }

    #[test]
    fn validation_rules() {
        assert!(NamedParameter::string("Out", "--output_dir_path", "")
            .validate()
            .is_ok());

        let err = NamedParameter::string("Key", "--api_key", "  ")
            .required(true)
            .validate()
            .unwrap_err();
        assert!(matches!(err, FeatureGenError::MissingRequired(key) if key == "Key"));

        let err = NamedParameter::list("Model", "--model", "gpt-5", vec!["gpt-4".to_string()])
            .validate()
            .unwrap_err();
        assert!(matches!(err, FeatureGenError::InvalidParameter { .. }));

        let err = NamedParameter::boolean("Debug", "debug mode", true)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("not a valid command-line flag"));

        assert!(NamedParameter::double("Temp", "--temperature", f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let parameters = vec![
            NamedParameter::boolean("Debug", "--debug", true),
            NamedParameter::boolean("Debug", "--verbose", false),
        ];
        let err = validate_all(&parameters).unwrap_err();
        assert!(err.to_string().contains("duplicate parameter key"));
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
