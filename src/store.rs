use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error_handler::{FeatureGenError, Result};
use crate::parameters::{self, NamedParameter};

/// How to invoke one LLM-backed generator script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfiguration {
    pub name: String,
    pub script_file_path: String,
    /// Program that runs the script, e.g. `python3`.
    pub command: String,
    /// JSON parameter spec driving `llm form` / `llm configure`. Not used at run time.
    #[serde(default)]
    pub parameter_spec_file_path: String,
    /// Emitted on the command line in this order.
    #[serde(default)]
    pub named_parameters: Vec<NamedParameter>,
}

impl LlmConfiguration {
    pub fn new(name: &str, script_file_path: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            script_file_path: script_file_path.to_string(),
            command: command.to_string(),
            parameter_spec_file_path: String::new(),
            named_parameters: Vec::new(),
        }
    }

    pub fn with_spec(mut self, parameter_spec_file_path: &str) -> Self {
        self.parameter_spec_file_path = parameter_spec_file_path.to_string();
        self
    }

    pub fn with_parameter(mut self, parameter: NamedParameter) -> Self {
        self.named_parameters.push(parameter);
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&NamedParameter> {
        self.named_parameters.iter().find(|p| p.key == key)
    }

    /// Checks everything that does not depend on the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FeatureGenError::invalid_parameter(
                "name",
                "configuration name cannot be empty",
            ));
        }
        if self.command.trim().is_empty() {
            return Err(FeatureGenError::invalid_parameter(
                "command",
                format!("configuration '{}' has no command", self.name),
            ));
        }
        parameters::validate_all(&self.named_parameters)
    }
}

/// The set of configured backends, keyed by unique name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationStore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected: Option<String>,
    #[serde(default)]
    configurations: Vec<LlmConfiguration>,
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store without the on-disk checks `add` performs. Used by the
    /// LLM definitions adapter, whose entries may point at scripts elsewhere.
    pub fn from_configurations(configurations: Vec<LlmConfiguration>) -> Result<Self> {
        let mut store = Self::new();
        for config in configurations {
            config.validate()?;
            store.ensure_unique(&config.name, None)?;
            store.configurations.push(config);
        }
        Ok(store)
    }

    /// Appends a configuration.
    ///
    /// Fails with `InvalidPath` when the script or parameter spec file does not
    /// exist, with `DuplicateName` when the name is taken. A failed add leaves
    /// the store untouched.
    pub fn add(&mut self, config: LlmConfiguration) -> Result<()> {
        for path in [&config.script_file_path, &config.parameter_spec_file_path] {
            if !Path::new(path).exists() {
                return Err(FeatureGenError::InvalidPath {
                    path: PathBuf::from(path),
                });
            }
        }
        config.validate()?;
        self.ensure_unique(&config.name, None)?;

        debug!(name = %config.name, "adding LLM configuration");
        self.configurations.push(config);
        Ok(())
    }

    /// Replaces the configuration named `old_name` in place.
    pub fn update(&mut self, old_name: &str, config: LlmConfiguration) -> Result<()> {
        let index = self
            .position(old_name)
            .ok_or_else(|| FeatureGenError::NotFound(old_name.to_string()))?;
        config.validate()?;
        self.ensure_unique(&config.name, Some(index))?;

        if self.selected.as_deref() == Some(old_name) {
            self.selected = Some(config.name.clone());
        }
        debug!(old = old_name, new = %config.name, "updating LLM configuration");
        self.configurations[index] = config;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<LlmConfiguration> {
        let index = self
            .position(name)
            .ok_or_else(|| FeatureGenError::NotFound(name.to_string()))?;
        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }
        debug!(name, "removing LLM configuration");
        Ok(self.configurations.remove(index))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&LlmConfiguration> {
        let found = self.configurations.iter().find(|c| c.name == name);
        if found.is_none() {
            debug!(name, "no LLM configuration with this name");
        }
        found
    }

    pub fn list(&self) -> &[LlmConfiguration] {
        &self.configurations
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    pub fn select(&mut self, name: &str) -> Result<()> {
        if self.position(name).is_none() {
            return Err(FeatureGenError::NotFound(name.to_string()));
        }
        self.selected = Some(name.to_string());
        Ok(())
    }

    pub fn selected(&self) -> Option<&LlmConfiguration> {
        self.selected.as_deref().and_then(|name| self.get_by_name(name))
    }

    /// Reads a persisted store. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path).map_err(|e| FeatureGenError::io(path, e))?;
        let store: Self = serde_yaml::from_str(&content)
            .map_err(|e| FeatureGenError::parse(path.display().to_string(), e))?;

        // Re-check what a hand-edited file might have broken.
        let Self {
            selected,
            configurations,
        } = store;
        let mut checked = Self::from_configurations(configurations)
            .map_err(|e| FeatureGenError::parse(path.display().to_string(), e))?;
        checked.selected = selected.filter(|name| checked.position(name).is_some());
        Ok(checked)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FeatureGenError::io(parent, e))?;
        }
        let content =
            serde_yaml::to_string(self).map_err(|e| FeatureGenError::parse("store", e))?;
        std::fs::write(path, content).map_err(|e| FeatureGenError::io(path, e))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.configurations.iter().position(|c| c.name == name)
    }

    fn ensure_unique(&self, name: &str, except: Option<usize>) -> Result<()> {
        match self.position(name) {
            Some(index) if Some(index) != except => {
                Err(FeatureGenError::DuplicateName(name.to_string()))
            }
            _ => Ok(()),
        }
    }
}
