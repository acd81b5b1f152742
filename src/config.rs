//! Processor configuration

use crate::content::ContentExtractionOptions;
use crate::error::ConfigError;
use crate::types::StorageTarget;
use serde::{Deserialize, Serialize};

/// Where attachment retrieval URLs point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub target: StorageTarget,
    pub base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            target: StorageTarget::Local,
            base_url: "https://storage.example.com/attachments".to_string(),
        }
    }
}

/// Settings for [`EmailProcessor`](crate::EmailProcessor)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProcessorConfig {
    pub storage: StorageConfig,

    /// Messages processed in parallel by a batch
    pub concurrency: usize,

    pub extraction: ContentExtractionOptions,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            concurrency: 5,
            extraction: ContentExtractionOptions::all(),
        }
    }
}

impl ProcessorConfig {
    /// Load from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.storage.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.base_url is empty".into()));
        }
        Ok(())
    }
}
