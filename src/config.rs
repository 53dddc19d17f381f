use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "ALTO_VISION_CONFIG";

/// Root of `alto-vision.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub escriptorium: EscriptoriumConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Explicit path first, then `$ALTO_VISION_CONFIG`, then
    /// `./config/default.toml`. Falls back to defaults when none exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "failed to resolve the working directory".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "VisionConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "VisionConfig::default_language")]
    pub language: String,
    #[serde(default = "VisionConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl VisionConfig {
    fn default_endpoint() -> String {
        "https://vision.googleapis.com".to_string()
    }

    fn default_language() -> String {
        "es".to_string()
    }

    fn default_timeout() -> u64 {
        120
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: Self::default_endpoint(),
            language: Self::default_language(),
            timeout_secs: Self::default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EscriptoriumConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Transcription the merged layouts are imported into.
    #[serde(default = "EscriptoriumConfig::default_transcription")]
    pub transcription: String,
    #[serde(default = "VisionConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl EscriptoriumConfig {
    fn default_transcription() -> String {
        "vision".to_string()
    }
}

impl Default for EscriptoriumConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            username: None,
            password: None,
            transcription: Self::default_transcription(),
            timeout_secs: VisionConfig::default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
