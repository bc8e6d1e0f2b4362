use anyhow::{Context, Result};
use console::style;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ScribeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// AssemblyAI settings
    pub assemblyai: AssemblyAiConfig,

    /// External tool and buffering settings
    pub media: MediaConfig,

    /// Log output settings
    pub logging: LoggingConfig,

    /// Never read from or written to the config file
    #[serde(skip)]
    pub api_key: Option<ApiKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on (`PORT` overrides)
    pub port: u16,

    /// Directory holding the built front end
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyAiConfig {
    /// API root, without the `/v2` suffix
    pub base_url: String,

    /// Seconds between job status checks
    pub poll_interval_secs: u64,

    /// Give up on a job after this many seconds
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub yt_dlp_path: String,

    pub ffmpeg_path: String,

    /// How audio is handed to ffmpeg
    pub transcode_mode: TranscodeMode,

    /// Reject audio streams larger than this (unbounded when unset)
    pub max_audio_bytes: Option<u64>,

    /// Directory for temporary transcoder input (system default when unset)
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscodeMode {
    /// Feed ffmpeg through stdin
    Pipe,
    /// Write a uniquely named temporary file and point ffmpeg at it
    TempFile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human readable ones
    pub json: bool,
}

/// AssemblyAI credential, redacted from debug output
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            static_dir: PathBuf::from("client/build"),
        }
    }
}

impl Default for AssemblyAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.assemblyai.com".to_string(),
            poll_interval_secs: 5,
            poll_timeout_secs: 30 * 60,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            transcode_mode: TranscodeMode::TempFile,
            max_audio_bytes: None,
            temp_dir: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            assemblyai: AssemblyAiConfig::default(),
            media: MediaConfig::default(),
            logging: LoggingConfig::default(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults, then apply environment overrides
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without touching the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // Working directory takes precedence over the user config dir
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("tubescribe").join("config.yaml"))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ScribeError::Config(format!("PORT is not a valid port: {}", port)))?;
        }

        if let Ok(key) = std::env::var("ASSEMBLYAI_API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(ApiKey::new(key));
            }
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.assemblyai.base_url.trim().is_empty() {
            return Err(ScribeError::Config("assemblyai.base_url must not be empty".into()).into());
        }

        if self.assemblyai.poll_interval_secs == 0 {
            return Err(
                ScribeError::Config("assemblyai.poll_interval_secs must be positive".into()).into(),
            );
        }

        if self.assemblyai.poll_timeout_secs < self.assemblyai.poll_interval_secs {
            return Err(ScribeError::Config(
                "assemblyai.poll_timeout_secs must not be shorter than the poll interval".into(),
            )
            .into());
        }

        if self.media.max_audio_bytes == Some(0) {
            return Err(ScribeError::Config("media.max_audio_bytes must be positive".into()).into());
        }

        Ok(())
    }

    /// Replace the API key, ignoring empty values
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.api_key = Some(ApiKey::new(key));
        }
        self
    }

    /// The configured key, or an error naming the variable to set
    pub fn require_api_key(&self) -> Result<&ApiKey> {
        self.api_key.as_ref().ok_or_else(|| {
            ScribeError::Config("ASSEMBLYAI_API_KEY is not set".to_string()).into()
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.assemblyai.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.assemblyai.poll_timeout_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("{}", style("Current Configuration:").bold());
        println!("  Listen: {}:{}", self.server.host, self.server.port);
        println!("  Static Dir: {}", self.server.static_dir.display());
        println!("  AssemblyAI: {}", self.assemblyai.base_url);
        println!(
            "  Polling: every {}s, timeout {}s",
            self.assemblyai.poll_interval_secs, self.assemblyai.poll_timeout_secs
        );
        println!("  yt-dlp: {}", self.media.yt_dlp_path);
        println!("  ffmpeg: {}", self.media.ffmpeg_path);
        println!("  Transcode Mode: {:?}", self.media.transcode_mode);
        match self.media.max_audio_bytes {
            Some(limit) => println!("  Max Audio: {}", crate::utils::format_file_size(limit)),
            None => println!("  Max Audio: unbounded"),
        }
        let key_state = if self.api_key.is_some() {
            style("set").green()
        } else {
            style("missing").red()
        };
        println!("  API Key: {}", key_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.media.transcode_mode, TranscodeMode::TempFile);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 8080\nmedia:\n  transcode_mode: pipe\n  max_audio_bytes: 1024"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.media.transcode_mode, TranscodeMode::Pipe);
        assert_eq!(config.media.max_audio_bytes, Some(1024));
        assert_eq!(config.assemblyai.poll_interval_secs, 5);
    }

    #[test]
    fn test_api_key_never_serialized() {
        let config = Config::default().with_api_key(Some("secret-key".to_string()));
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret-key"));
        assert!(!format!("{:?}", config).contains("secret-key"));
        assert_eq!(config.require_api_key().unwrap().expose(), "secret-key");
    }

    #[test]
    fn test_empty_api_key_ignored() {
        let config = Config::default().with_api_key(Some(String::new()));
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_polling() {
        let mut config = Config::default();
        config.assemblyai.poll_interval_secs = 0;
        tokio_test::assert_err!(config.validate());

        let mut config = Config::default();
        config.assemblyai.poll_timeout_secs = 1;
        tokio_test::assert_err!(config.validate());

        config.assemblyai.poll_timeout_secs = 5;
        tokio_test::assert_ok!(config.validate());
    }
}
