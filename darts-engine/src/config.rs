//! Engine configuration.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the engine treats a dart whose index is not the next one expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DartOrderPolicy {
    /// Reject the dart as invalid input.
    #[default]
    Strict,
    /// Record the dart and log a warning.
    Lenient,
}

/// Errors raised when configuration cannot be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("engine config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_dart_order")]
    pub dart_order: DartOrderPolicy,
}

impl EngineConfig {
    const fn default_dart_order() -> DartOrderPolicy {
        DartOrderPolicy::Strict
    }

    /// Parse a config document; omitted fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the JSON is malformed or a field
    /// holds an unknown value.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub const fn with_dart_order(mut self, dart_order: DartOrderPolicy) -> Self {
        self.dart_order = dart_order;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dart_order: Self::default_dart_order(),
        }
    }
}
