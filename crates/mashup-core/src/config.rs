//! Configuration management for mashup

use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    pub temp: TempConfig,
    pub web: WebConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to yt-dlp binary (auto-detected if not set)
    pub yt_dlp: Option<PathBuf>,
    /// Path to FFmpeg binary (auto-detected if not set)
    pub ffmpeg: Option<PathBuf>,
    /// Path to ffprobe binary (auto-detected if not set)
    pub ffprobe: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// How many candidates to request per required clip (default: 2.0)
    pub overfetch_factor: f32,
    /// Appended to the artist name when searching
    pub query_suffix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Netscape cookie file handed to yt-dlp
    pub cookie_file: Option<PathBuf>,
    /// Browser to read cookies from (e.g. "chrome", "firefox")
    pub cookies_from_browser: Option<String>,
    /// Network timeout for yt-dlp, in seconds
    pub socket_timeout: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Sample rate for clips and the final mashup
    pub sample_rate: u32,
    /// Channel count for clips and the final mashup
    pub channels: u8,
    /// Bitrate for lossy output formats
    pub bitrate: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TempConfig {
    /// Custom temp directory (uses system temp if not set)
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address the web form listens on
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address (defaults to the username)
    pub from: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            search: SearchConfig {
                overfetch_factor: 2.0,
                query_suffix: "official video".to_string(),
            },
            fetch: FetchConfig::default(),
            output: OutputConfig {
                sample_rate: 44100,
                channels: 2,
                bitrate: "192k".to_string(),
            },
            temp: TempConfig::default(),
            web: WebConfig {
                bind: "127.0.0.1:5000".to_string(),
            },
            smtp: SmtpConfig {
                host: None,
                port: 587,
                username: None,
                password: None,
                from: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Load from default config directory
        if let Some(path) = Self::default_path() {
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
            }
        }

        // Load from specified config file
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::LoadError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        // MASHUP_SMTP__HOST -> smtp.host
        figment = figment.merge(Env::prefixed("MASHUP_").split("__"));

        Self::from_figment(figment)
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.search.overfetch_factor.is_finite() || self.search.overfetch_factor < 1.0 {
            return Err(ConfigError::InvalidValue(format!(
                "search.overfetch_factor must be at least 1.0, got {}",
                self.search.overfetch_factor
            )));
        }
        if self.output.sample_rate == 0 || self.output.channels == 0 {
            return Err(ConfigError::InvalidValue(
                "output.sample_rate and output.channels must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// `<config_dir>/mashup/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mashup/config.toml"))
    }

    /// Get yt-dlp path, auto-detecting if not configured
    pub fn yt_dlp_path(&self) -> Result<PathBuf, ConfigError> {
        resolve_tool(self.paths.yt_dlp.as_ref(), "yt-dlp")
    }

    /// Get FFmpeg path, auto-detecting if not configured
    pub fn ffmpeg_path(&self) -> Result<PathBuf, ConfigError> {
        resolve_tool(self.paths.ffmpeg.as_ref(), "ffmpeg")
    }

    /// Get ffprobe path, auto-detecting if not configured
    pub fn ffprobe_path(&self) -> Result<PathBuf, ConfigError> {
        resolve_tool(self.paths.ffprobe.as_ref(), "ffprobe")
    }

    /// Get temp directory
    pub fn temp_dir(&self) -> PathBuf {
        self.temp.directory.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn resolve_tool(configured: Option<&PathBuf>, name: &str) -> Result<PathBuf, ConfigError> {
    match configured {
        Some(path) => Ok(path.clone()),
        None => which::which(name)
            .map_err(|_| ConfigError::InvalidValue(format!("{} not found in PATH", name))),
    }
}
