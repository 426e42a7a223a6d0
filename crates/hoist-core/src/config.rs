//! Lowering configuration, loaded from YAML.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default name of the configuration file looked up next to inputs.
pub const CONFIG_FILE_NAME: &str = "hoist.yaml";

/// Annotation that opts a companion property into direct field exposure.
pub const DEFAULT_DIRECT_FIELD_ANNOTATION: &str = "JvmField";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoweringConfig {
    /// Annotation name that makes an interface companion property eligible for
    /// hoisting even when it is not `const`.
    pub direct_field_annotation: String,
    /// Run the IR verifier after lowering.
    pub verify: bool,
    /// Lower independent programs on the rayon thread pool.
    pub parallel: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        LoweringConfig {
            direct_field_annotation: DEFAULT_DIRECT_FIELD_ANNOTATION.to_string(),
            verify: true,
            parallel: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl LoweringConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
