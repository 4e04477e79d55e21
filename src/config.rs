use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::params::SceneParams;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV_VAR: &str = "CAGEBOX_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window_title: String,
    pub window_size: [u32; 2],
    /// Directory holding `textures/`.
    pub assets_dir: PathBuf,
    /// Start with the options panel expanded.
    pub options_open: bool,
    pub params: SceneParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_title: "cagebox".to_string(),
            window_size: [1280, 720],
            assets_dir: PathBuf::from("assets"),
            options_open: false,
            params: SceneParams::default(),
        }
    }
}

pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let json = std::fs::read_to_string(path)?;
    let mut config: AppConfig = serde_json::from_str(&json)?;
    config.params = config.params.sanitized();
    config.window_size = [config.window_size[0].max(1), config.window_size[1].max(1)];
    Ok(config)
}

/// Config named by `CAGEBOX_CONFIG`, or the defaults when it is unset or
/// unusable.
pub fn load_from_env() -> AppConfig {
    let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
        return AppConfig::default();
    };
    let path = PathBuf::from(path);
    match load_config_from_file(&path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(err) => {
            log::warn!(
                "Ignoring config {}: {}; using defaults",
                path.display(),
                err
            );
            AppConfig::default()
        }
    }
}
