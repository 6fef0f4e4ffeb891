//! Reads LLM definitions from a user-supplied JSON document, for runs that do
//! not use the persisted store:
//!
//! ```json
//! { "llms": [ { "name": "gpt", "scriptFilePath": "gen.py", "command": "python3",
//!               "namedParameters": [ { "type": "double", "argName": "--temperature", "value": 0.7 } ] } ] }
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error_handler::{FeatureGenError, Result};
use crate::store::{ConfigurationStore, LlmConfiguration};

#[derive(Debug, Deserialize)]
struct LlmsDocument {
    llms: Vec<LlmConfiguration>,
}

pub fn parse_llms(content: &str) -> Result<ConfigurationStore> {
    let document: LlmsDocument =
        serde_json::from_str(content).map_err(|e| FeatureGenError::parse("LLM definitions", e))?;
    ConfigurationStore::from_configurations(document.llms)
}

pub fn load_llms_file(path: &Path) -> Result<ConfigurationStore> {
    let content = std::fs::read_to_string(path).map_err(|e| FeatureGenError::io(path, e))?;
    parse_llms(&content).map_err(|err| match err {
        FeatureGenError::ConfigParse { message, .. } => {
            FeatureGenError::parse(path.display().to_string(), message)
        }
        other => other,
    })
}
