use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ShowcaseError;

pub const CONFIG_ENV: &str = "SHARESPACE_CONFIG";
pub const HOST_ENV: &str = "SHARESPACE_HOST";
pub const PORT_ENV: &str = "SHARESPACE_PORT";
pub const BVH_DIR_ENV: &str = "SHARESPACE_BVH_DIR";

/// Showcase configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowcaseConfig {
    /// Rendering host to stream to.
    pub host: String,
    pub port: u16,
    #[serde(alias = "deviceName")]
    pub device_name: String,
    /// Directory holding the bundled BVH recordings.
    #[serde(alias = "bvhDir")]
    pub bvh_dir: PathBuf,
    #[serde(alias = "keepaliveSecs")]
    pub keepalive_secs: u64,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8888,
            device_name: "Sharespace Showcase".to_owned(),
            bvh_dir: PathBuf::from("./bvh"),
            keepalive_secs: 1,
        }
    }
}

impl ShowcaseConfig {
    /// Load from the JSON file named by `SHARESPACE_CONFIG` (if any), then
    /// apply the individual environment overrides.
    pub fn from_env() -> Result<Self, ShowcaseError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ShowcaseError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ShowcaseError::ConfigurationInvalid {
            reason: format!("{}: {e}", path.display()),
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `SHARESPACE_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ShowcaseError> {
        if let Some(host) = lookup(HOST_ENV) {
            debug!("{HOST_ENV} override: {host}");
            self.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port.trim().parse().map_err(|_| ShowcaseError::ConfigurationInvalid {
                reason: format!("{PORT_ENV}={port:?} is not a port number"),
            })?;
        }
        if let Some(dir) = lookup(BVH_DIR_ENV) {
            self.bvh_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ShowcaseError> {
        if self.host.trim().is_empty() {
            return Err(ShowcaseError::ConfigurationInvalid { reason: "host is empty".into() });
        }
        if self.port == 0 {
            return Err(ShowcaseError::ConfigurationInvalid { reason: "port must be non-zero".into() });
        }
        if self.keepalive_secs == 0 {
            return Err(ShowcaseError::ConfigurationInvalid {
                reason: "keepalive_secs must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Path of a bundled recording.
    pub fn bundled_motion_path(&self, file_name: &str) -> PathBuf {
        self.bvh_dir.join(file_name)
    }
}
