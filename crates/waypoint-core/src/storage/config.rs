use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::kernel::error::Result;
use crate::storage::error::StorageSystemError;
use crate::storage::provider::StorageProvider;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// In-memory representation of the installer configuration.
///
/// Values are kept untyped; each consumer asks for the shape it needs with
/// [`try_get`](Self::try_get) or [`require`](Self::require) at the moment it
/// needs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    /// Raw configuration values
    #[serde(flatten)]
    values: BTreeMap<String, serde_json::Value>,
}

impl ConfigData {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a configuration value, `None` if it is absent or has another shape
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.try_get(key).ok().flatten()
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Get a configuration value, `Ok(None)` if it is absent and an
    /// `InvalidConfigValue` error if it is present with another shape.
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                StorageSystemError::InvalidConfigValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
        }
    }

    /// Get a configuration value that must be present
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.try_get(key)?.ok_or_else(|| {
            StorageSystemError::MissingConfigKey { key: key.to_string() }.into()
        })
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value).map_err(|e| {
            StorageSystemError::SerializationError {
                format: "JSON".to_string(),
                source: Box::new(e),
            }
        })?;
        self.values.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Check if key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Get all keys
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Render as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self).map_err(|e| {
            StorageSystemError::SerializationError {
                format: "JSON".to_string(),
                source: Box::new(e),
            }
            .into()
        })
    }

    /// Deserialize from string based on format. An empty document yields an
    /// empty configuration.
    pub fn deserialize(data: &str, format: ConfigFormat) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::new());
        }
        let parsed: std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> =
            match format {
                ConfigFormat::Json => serde_json::from_str(data).map_err(Into::into),
                #[cfg(feature = "yaml-config")]
                ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(Into::into),
                #[cfg(feature = "toml-config")]
                ConfigFormat::Toml => toml::from_str(data).map_err(Into::into),
            };
        parsed.map_err(|source| {
            StorageSystemError::DeserializationError {
                format: format.extension().to_uppercase(),
                source,
            }
            .into()
        })
    }
}

/// Load the configuration file at `path` through `provider`.
///
/// The format is picked from the file extension. A missing file is an error;
/// the contents are not validated beyond parsing.
pub fn load_config(provider: &dyn StorageProvider, path: &Path) -> Result<ConfigData> {
    if !provider.is_file(path) {
        return Err(StorageSystemError::FileNotFound(path.to_path_buf()).into());
    }

    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        StorageSystemError::UnsupportedConfigFormat(path.display().to_string())
    })?;

    let content = provider.read_to_string(path)?;
    let config = ConfigData::deserialize(&content, format)?;
    debug!("Loaded configuration from {} ({} keys)", path.display(), config.values.len());
    Ok(config)
}
