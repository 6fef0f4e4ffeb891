use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::report::OutputFormat;

/// Overrides the settings directory (default `~/.featuregen`).
pub const HOME_ENV: &str = "FEATUREGEN_HOME";
/// Prefix for per-setting environment overrides, e.g. `FEATUREGEN__RUN__TIMEOUT_SECS=60`.
pub const ENV_PREFIX: &str = "FEATUREGEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(skip)]
    home: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Where LLM configurations are persisted. Defaults to `<home>/llms.yml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Per-run limit. Unset means a generator may run for as long as it needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            parallel: default_parallel(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

impl Config {
    pub fn home_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(HOME_ENV) {
            if !dir.trim().is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".featuregen"))
    }

    pub fn config_path_in(home: &Path) -> PathBuf {
        home.join("config.yml")
    }

    pub fn config_path(&self) -> PathBuf {
        Self::config_path_in(&self.home)
    }

    /// Defaults for a given settings directory, without touching the disk.
    pub fn in_home(home: PathBuf) -> Self {
        Self {
            home,
            ..Self::default()
        }
    }

    pub async fn load() -> Result<Self> {
        Self::load_from(Self::home_dir()?).await
    }

    /// Layers defaults, `<home>/config.yml` and `FEATUREGEN__*` environment
    /// variables. Writes a default file when none exists yet.
    pub async fn load_from(home: PathBuf) -> Result<Self> {
        let path = Self::config_path_in(&home);
        let existed = path.exists();

        let layered = config::Config::builder()
            .add_source(config::File::from(path.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let mut loaded: Config = layered
            .try_deserialize()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        loaded.home = home;

        if !existed {
            loaded.save().await?;
        }
        Ok(loaded)
    }

    pub async fn save(&self) -> Result<()> {
        let path = self.config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(&path, content).await?;
        Ok(())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.home.join("llms.yml"))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.run.timeout_secs.map(Duration::from_secs)
    }

    pub fn set_timeout(&mut self, timeout_secs: Option<u64>) {
        self.run.timeout_secs = timeout_secs.filter(|secs| *secs > 0);
    }

    pub fn set_store_path(&mut self, path: PathBuf) {
        self.store.path = Some(path);
    }
}
