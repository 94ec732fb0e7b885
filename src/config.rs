//! Configuration.

use std::{fs, io};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::layer::LayerOptions;


//------------ Config --------------------------------------------------------

/// The configuration file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The JSON file to load the features from.
    pub features: Option<PathBuf>,

    /// The address the server listens on.
    pub listen: Option<SocketAddr>,

    /// The options of the layer.
    pub layer: LayerOptions,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path.as_ref())?;
        let mut res: Self = toml::from_str(&data)?;
        if let Some(path) = path.as_ref().parent() {
            res.prepare(path);
        }
        Ok(res)
    }

    /// Resolves relative paths against `base_dir`.
    pub fn prepare(&mut self, base_dir: &Path) {
        if let Some(features) = self.features.as_mut() {
            *features = base_dir.join(&features)
        }
    }
}


//------------ ConfigError ---------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}


//============ Tests =========================================================
