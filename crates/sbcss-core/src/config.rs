use crate::error::Error;
use crate::generator::{GeneratorOptions, DEFAULT_NAMESPACE_DIVIDER, DEFAULT_STATE_ATTRIBUTE_PREFIX};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Project configuration, usually `sbcss.json`:
///
/// ```json
/// { "namespaceDivider": "__", "stateAttributePrefix": "data" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    pub namespace_divider: String,
    pub state_attribute_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace_divider: DEFAULT_NAMESPACE_DIVIDER.to_string(),
            state_attribute_prefix: DEFAULT_STATE_ATTRIBUTE_PREFIX.to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            namespace_divider: self.namespace_divider.clone(),
            state_attribute_prefix: self.state_attribute_prefix.clone(),
        }
    }
}
