use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Points at a JSON settings file; everything has defaults when unset.
pub(crate) const SETTINGS_ENV_VAR: &str = "BRAMBLEWICK_SETTINGS";
pub(crate) const DEBUG_COLLISION_ENV_VAR: &str = "BRAMBLEWICK_DEBUG_COLLISION";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_fps: u32,
    pub debug_collision: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_title: "Bramblewick".to_string(),
            window_width: 960,
            window_height: 640,
            target_fps: 60,
            debug_collision: false,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

pub(crate) fn load_settings() -> Result<Settings, SettingsError> {
    let mut settings = match env::var(SETTINGS_ENV_VAR) {
        Ok(path) => read_settings_file(Path::new(&path))?,
        Err(env::VarError::NotPresent) => Settings::default(),
        Err(source) => {
            return Err(SettingsError::EnvVar {
                var: SETTINGS_ENV_VAR,
                source,
            })
        }
    };
    if env_flag(DEBUG_COLLISION_ENV_VAR) {
        settings.debug_collision = true;
        info!("debug_collision_enabled");
    }
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<Settings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_flag(var: &str) -> bool {
    env::var(var)
        .map(|value| {
            let value = value.trim().to_ascii_lowercase();
            value == "1" || value == "true"
        })
        .unwrap_or(false)
}
