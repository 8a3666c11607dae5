//! The shared options object and its configuration resolver.
//!
//! Resolution order: an explicit path that exists on disk wins; otherwise a
//! conventionally-named file in the user's home directory is tried; otherwise
//! built-in defaults. A missing or malformed file is never an error here,
//! the resolver recovers to defaults with at most a warning.

use directories::BaseDirs;
use irobf_utils::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Conventional configuration file name looked up in the home directory.
pub const CONFIG_FILE_NAME: &str = "irobf.yaml";

/// Per-transform switches and shared parameters read from the configuration
/// file. All fields are optional in the YAML; absent keys take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObfuscationOptions {
    /// Umbrella switch gating the whole pipeline.
    pub enable: bool,
    pub indirect_branch: bool,
    pub indirect_call: bool,
    pub indirect_global_variable: bool,
    pub flattening: bool,
    pub string_encryption: bool,
    /// Seed for the passes' deterministic randomness.
    pub seed: u64,
}

impl Default for ObfuscationOptions {
    fn default() -> Self {
        Self {
            enable: false,
            indirect_branch: false,
            indirect_call: false,
            indirect_global_variable: false,
            flattening: false,
            string_encryption: false,
            seed: 42,
        }
    }
}

impl ObfuscationOptions {
    /// Resolves options from an explicit path, the home-directory fallback,
    /// or built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            if path.exists() {
                return Self::load_or_default(path);
            }
        }
        match BaseDirs::new() {
            Some(dirs) => {
                let path = dirs.home_dir().join(CONFIG_FILE_NAME);
                if path.exists() {
                    Self::load_or_default(&path)
                } else {
                    debug!("no configuration at {}, using defaults", path.display());
                    Self::default()
                }
            }
            None => {
                debug!("home directory unresolvable, using default options");
                Self::default()
            }
        }
    }

    /// Loads a file, recovering to defaults with a warning on any failure.
    fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(options) => options,
            Err(err) => {
                warn!("ignoring configuration at {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }
}
