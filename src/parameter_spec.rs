//! Parameter spec files and the headless form that turns raw input into
//! [`NamedParameter`]s.
//!
//! A parameter spec is a JSON array describing the arguments a backend script
//! accepts. Each entry names the input control that would edit it, which also
//! decides the parameter's type:
//!
//! | `ui_element`    | parameter type                     |
//! |-----------------|------------------------------------|
//! | `textfield`     | string                             |
//! | `filePicker`    | string                             |
//! | `optionalField` | string, empty unless a value given |
//! | `checkbox`      | boolean                            |
//! | `combobox`      | list (value from `allowed_values`) |
//! | `spinner`       | int, or double for fractional steps|

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error_handler::{FeatureGenError, Result};
use crate::parameters::{parse_flag, NamedParameter, ParameterValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub ui_element: UiElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<AllowedValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    /// Explicit CLI flag. Derived from `name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiElement {
    #[serde(rename = "textfield")]
    TextField,
    #[serde(rename = "checkbox")]
    CheckBox,
    #[serde(rename = "combobox")]
    ComboBox,
    #[serde(rename = "spinner")]
    Spinner,
    #[serde(rename = "filePicker")]
    FilePicker,
    #[serde(rename = "optionalField")]
    OptionalField,
    #[serde(other)]
    Unknown,
}

impl UiElement {
    pub fn label(&self) -> &'static str {
        match self {
            UiElement::TextField => "text",
            UiElement::CheckBox => "checkbox",
            UiElement::ComboBox => "choice",
            UiElement::Spinner => "number",
            UiElement::FilePicker => "file",
            UiElement::OptionalField => "optional text",
            UiElement::Unknown => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedValues {
    Options(Vec<Value>),
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
}

impl ParameterSpec {
    /// CLI flag for this parameter: `arg_name`, or `--<name>` in snake case.
    pub fn flag(&self) -> String {
        match &self.arg_name {
            Some(arg_name) => arg_name.trim().to_string(),
            None => {
                let snake = self
                    .name
                    .trim()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("_")
                    .to_lowercase();
                format!("--{}", snake)
            }
        }
    }

    /// Options for a combobox, rendered as plain strings.
    pub fn options(&self) -> Vec<String> {
        match &self.allowed_values {
            Some(AllowedValues::Options(values)) => values.iter().map(value_to_text).collect(),
            _ => Vec::new(),
        }
    }

    /// Numeric bounds for a spinner. Missing bounds are open.
    pub fn range(&self) -> (f64, f64) {
        match &self.allowed_values {
            Some(AllowedValues::Range { min, max }) => (
                min.unwrap_or(f64::NEG_INFINITY),
                max.unwrap_or(f64::INFINITY),
            ),
            _ => (f64::NEG_INFINITY, f64::INFINITY),
        }
    }

    /// Default rendered as text, if one was given.
    pub fn default_text(&self) -> Option<String> {
        match &self.default_value {
            None | Some(Value::Null) => None,
            Some(value) => Some(value_to_text(value)),
        }
    }

    /// A spinner is integral when its step, bounds and default carry no fraction.
    fn is_integral(&self) -> bool {
        let integral = |v: f64| !v.is_finite() || v.fract() == 0.0;
        let (min, max) = self.range();
        let default_integral = match &self.default_value {
            Some(Value::Number(n)) => n.as_f64().map_or(true, integral),
            Some(Value::String(s)) => s.trim().parse::<f64>().map_or(true, integral),
            _ => true,
        };
        self.step.map_or(true, integral) && integral(min) && integral(max) && default_integral
    }

    fn parameter(&self, value: ParameterValue) -> NamedParameter {
        NamedParameter {
            key: self.name.clone(),
            arg_name: self.flag(),
            required: self.required,
            description: self.description.clone(),
            value,
        }
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads a parameter spec file. A missing file yields an empty spec.
pub fn load(path: &Path) -> Result<Vec<ParameterSpec>> {
    if !path.exists() {
        debug!(path = %path.display(), "parameter spec file not found, using empty spec");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| FeatureGenError::io(path, e))?;
    parse(&content).map_err(|err| match err {
        FeatureGenError::ConfigParse { message, .. } => {
            FeatureGenError::parse(path.display().to_string(), message)
        }
        other => other,
    })
}

pub fn parse(content: &str) -> Result<Vec<ParameterSpec>> {
    serde_json::from_str(content).map_err(|e| FeatureGenError::parse("parameter spec", e))
}

/// Resolves one spec entry against a raw form input (`None` means "left at default").
pub fn resolve_value(spec: &ParameterSpec, raw: Option<&str>) -> Result<NamedParameter> {
    let key = spec.name.as_str();

    match spec.ui_element {
        UiElement::TextField | UiElement::FilePicker => {
            let text = raw
                .map(str::to_string)
                .or_else(|| spec.default_text())
                .unwrap_or_default();
            let text = text.trim();
            if spec.required && text.is_empty() {
                return Err(FeatureGenError::MissingRequired(key.to_string()));
            }
            Ok(spec.parameter(ParameterValue::String(text.to_string())))
        }
        UiElement::OptionalField => {
            // An untouched optional field is disabled and contributes nothing.
            let text = raw.map(str::trim).unwrap_or_default();
            Ok(spec.parameter(ParameterValue::String(text.to_string())))
        }
        UiElement::CheckBox => {
            let checked = match raw {
                Some(input) => parse_flag(input).ok_or_else(|| {
                    FeatureGenError::invalid_parameter(
                        key,
                        format!("'{}' is not a boolean (use true or false)", input),
                    )
                })?,
                None => match &spec.default_value {
                    Some(Value::Bool(b)) => *b,
                    Some(Value::String(s)) => parse_flag(s).unwrap_or(false),
                    _ => false,
                },
            };
            Ok(spec.parameter(ParameterValue::Boolean(checked)))
        }
        UiElement::ComboBox => {
            let options = spec.options();
            let selected = match raw {
                Some(input) => input.trim().to_string(),
                None => spec
                    .default_text()
                    .or_else(|| options.first().cloned())
                    .unwrap_or_default(),
            };
            if spec.required && selected.is_empty() {
                return Err(FeatureGenError::MissingRequired(key.to_string()));
            }
            if !selected.is_empty() && !options.is_empty() && !options.contains(&selected) {
                return Err(FeatureGenError::invalid_parameter(
                    key,
                    format!(
                        "'{}' is not one of the allowed values: {}",
                        selected,
                        options.join(", ")
                    ),
                ));
            }
            Ok(spec.parameter(ParameterValue::List {
                value: selected,
                allowed_values: options,
            }))
        }
        UiElement::Spinner => resolve_spinner(spec, raw),
        UiElement::Unknown => Err(FeatureGenError::invalid_parameter(
            key,
            "unsupported ui_element",
        )),
    }
}

fn resolve_spinner(spec: &ParameterSpec, raw: Option<&str>) -> Result<NamedParameter> {
    let key = spec.name.as_str();
    let (min, max) = spec.range();
    if min > max {
        return Err(FeatureGenError::invalid_parameter(
            key,
            format!("spec range is empty (min {} > max {})", min, max),
        ));
    }

    if spec.is_integral() {
        let value = match raw {
            Some(input) => parse_whole(key, input, min, max)?,
            None => default_whole(spec, min, max),
        };
        return Ok(spec.parameter(ParameterValue::Int(value)));
    }

    let value = match raw {
        Some(input) => {
            let value: f64 = input.trim().parse().map_err(|_| {
                FeatureGenError::invalid_parameter(key, format!("'{}' is not a number", input))
            })?;
            if !value.is_finite() {
                return Err(FeatureGenError::invalid_parameter(
                    key,
                    format!("'{}' is not a finite number", input),
                ));
            }
            if value < min || value > max {
                return Err(FeatureGenError::OutOfRange {
                    key: key.to_string(),
                    value,
                    min,
                    max,
                });
            }
            value
        }
        None => {
            let initial = spec
                .default_text()
                .and_then(|text| text.trim().parse::<f64>().ok())
                .unwrap_or(if min.is_finite() { min } else { 0.0 });
            initial.clamp(min, max)
        }
    };
    Ok(spec.parameter(ParameterValue::Double(value)))
}

/// Integer bounds of an integral spinner. Open ends span the whole `i64` range.
fn whole_bounds(min: f64, max: f64) -> (i64, i64) {
    let lowest = if min.is_finite() { min.ceil() as i64 } else { i64::MIN };
    let highest = if max.is_finite() { max.floor() as i64 } else { i64::MAX };
    (lowest, highest)
}

/// Parses integral spinner input exactly, without a round trip through `f64`.
fn parse_whole(key: &str, input: &str, min: f64, max: f64) -> Result<i64> {
    let trimmed = input.trim();
    let value: i64 = trimmed.parse().map_err(|_| {
        let reason = match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() != 0.0 => {
                format!("'{}' is not a whole number", input)
            }
            Ok(_) => format!("'{}' is not a whole number within the 64-bit range", input),
            Err(_) => format!("'{}' is not a number", input),
        };
        FeatureGenError::invalid_parameter(key, reason)
    })?;

    let (lowest, highest) = whole_bounds(min, max);
    if value < lowest || value > highest {
        return Err(FeatureGenError::OutOfRange {
            key: key.to_string(),
            value: value as f64,
            min,
            max,
        });
    }
    Ok(value)
}

/// Initial position of an integral spinner: its default, clamped into range.
fn default_whole(spec: &ParameterSpec, min: f64, max: f64) -> i64 {
    let (lowest, highest) = whole_bounds(min, max);
    let initial = spec
        .default_text()
        .and_then(|text| {
            let text = text.trim();
            text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| v.round() as i64)
            })
        })
        .unwrap_or(if min.is_finite() { lowest } else { 0 });
    initial.max(lowest).min(highest)
}

/// Resolves a whole form.
///
/// Every spec entry produces one parameter, in spec order. `inputs` maps spec
/// names to raw values; names that match no spec entry are rejected. Boolean
/// parameters in `existing` that the form no longer produces are kept as `false`
/// so an unchecked box is persisted rather than dropped.
pub fn resolve_form(
    specs: &[ParameterSpec],
    inputs: &HashMap<String, String>,
    existing: &[NamedParameter],
) -> Result<Vec<NamedParameter>> {
    if let Some(unknown) = inputs
        .keys()
        .find(|name| !specs.iter().any(|spec| &spec.name == *name))
    {
        return Err(FeatureGenError::invalid_parameter(
            unknown.as_str(),
            "not declared in the parameter spec",
        ));
    }

    let mut resolved = Vec::with_capacity(specs.len());
    for spec in specs {
        if spec.ui_element == UiElement::Unknown {
            warn!(parameter = %spec.name, "skipping parameter with unsupported ui_element");
            continue;
        }
        let raw = inputs.get(&spec.name).map(String::as_str);
        resolved.push(resolve_value(spec, raw)?);
    }

    for parameter in existing {
        if let ParameterValue::Boolean(_) = parameter.value {
            if !resolved.iter().any(|p| p.key == parameter.key) {
                let mut unchecked = parameter.clone();
                unchecked.value = ParameterValue::Boolean(false);
                resolved.push(unchecked);
            }
        }
    }

    Ok(resolved)
}
