//! Runtime settings
//!
//! Where the configuration tree lives and which container receives reload
//! signals. Loaded from a TOML file, with `FERRYMAN_*` environment variables
//! taking precedence. All fragment paths are derived here so the naming
//! scheme lives in exactly one place.

use crate::entity::VirtualHostKind;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension shared by every managed file
pub const CONFIG_EXT: &str = "kdl";

fn default_config_root() -> PathBuf {
    PathBuf::from("/etc/ferryman")
}

fn default_container_name() -> String {
    "ferron".to_string()
}

/// Ferryman runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the master document and all fragment files
    #[serde(default = "default_config_root")]
    pub config_root: PathBuf,

    /// Docker container running the proxy; receives the reload signal
    #[serde(default = "default_container_name")]
    pub container_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_root: default_config_root(),
            container_name: default_container_name(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Settings(format!("failed to read settings file: {e}")))?;
        let mut settings: Settings = toml::from_str(&content)
            .map_err(|e| Error::Settings(format!("invalid settings file: {e}")))?;
        settings.apply_env();
        Ok(settings)
    }

    /// Defaults plus environment overrides (no settings file)
    pub fn from_env() -> Self {
        let mut settings = Settings::default();
        settings.apply_env();
        settings
    }

    fn apply_env(&mut self) {
        if let Ok(root) = std::env::var("FERRYMAN_CONFIG_ROOT") {
            self.config_root = PathBuf::from(root);
        }
        if let Ok(name) = std::env::var("FERRYMAN_CONTAINER_NAME") {
            self.container_name = name;
        }
    }

    /// The master document: a flat list of include lines
    pub fn master_path(&self) -> PathBuf {
        self.config_root.join(format!("ferryman.{CONFIG_EXT}"))
    }

    /// Fixed path of the global-settings fragment
    pub fn global_path(&self) -> PathBuf {
        self.config_root.join(format!("global.{CONFIG_EXT}"))
    }

    /// Deterministic per-entity fragment path: `<root>/<id>_<kind>.kdl`
    pub fn fragment_path(&self, kind: VirtualHostKind, id: i64) -> PathBuf {
        self.config_root
            .join(format!("{id}_{}.{CONFIG_EXT}", kind.file_stem()))
    }
}
