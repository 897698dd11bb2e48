//! Configuration loader
//!
//! Reads the plugin list from a YAML file:
//!
//! ```yaml
//! plugins:
//!   - stats
//!   - name: redact
//!     options:
//!       pattern: "^[0-9]+$"
//!       mask: "#"
//! ```
//!
//! Entries are attached in file order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{errors::RetextError, plugins::Options, processor::Processor};

/// Looked up in the working directory when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".retext.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetextConfig {
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

/// A catalog plugin, by bare name or with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginEntry {
    Name(String),
    Configured {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Options>,
    },
}

impl PluginEntry {
    pub fn name(&self) -> &str {
        match self {
            PluginEntry::Name(name) | PluginEntry::Configured { name, .. } => name,
        }
    }

    pub fn options(&self) -> Option<&Options> {
        match self {
            PluginEntry::Name(_) => None,
            PluginEntry::Configured { options, .. } => options.as_ref(),
        }
    }
}

impl From<&str> for PluginEntry {
    fn from(name: &str) -> Self {
        PluginEntry::Name(name.to_string())
    }
}

impl RetextConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, RetextError> {
        serde_yaml::from_str(content).map_err(|e| RetextError::config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, RetextError> {
        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetextError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml_str(&content).map_err(|e| match e {
            RetextError::Config { message } => {
                RetextError::config(format!("failed to parse {}: {message}", path.display()))
            }
            other => other,
        })?;
        info!("Loaded {} plugin entries", config.plugins.len());
        Ok(config)
    }

    /// Loads `path` if given, else [`DEFAULT_CONFIG_FILE`] if it exists, else
    /// an empty configuration.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, RetextError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            Self::load(&fallback)
        } else {
            debug!("no configuration file found");
            Ok(Self::default())
        }
    }

    /// Attaches every entry to `processor`, stopping at the first failure.
    pub fn apply(&self, processor: &Processor) -> Result<(), RetextError> {
        for entry in &self.plugins {
            processor.use_entry(entry)?;
        }
        Ok(())
    }
}
