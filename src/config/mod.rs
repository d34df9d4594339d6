use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// x264 presets accepted by ffmpeg
const PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Encoder parameters for the final mux
    #[serde(default)]
    pub encoding: EncodingConfig,

    /// External binaries
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Working directory for per-run downloads and final files
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    pub video_codec: String,
    pub audio_codec: String,

    /// Output frame rate
    pub fps: u32,

    /// Encoder speed/quality preset
    pub preset: String,

    /// Encoder threads
    pub threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub yt_dlp_path: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            temp_dir: Some(PathBuf::from("downloads")),
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            fps: 45,
            preset: "ultrafast".to_string(),
            threads: 4,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("streammux").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let encoding = &self.encoding;

        if encoding.fps == 0 {
            anyhow::bail!("encoding.fps must be greater than zero");
        }
        if encoding.threads == 0 {
            anyhow::bail!("encoding.threads must be greater than zero");
        }
        if encoding.video_codec.trim().is_empty() || encoding.audio_codec.trim().is_empty() {
            anyhow::bail!("encoding codecs must not be empty");
        }
        if !PRESETS.contains(&encoding.preset.as_str()) {
            anyhow::bail!(
                "Unknown encoder preset '{}' (expected one of: {})",
                encoding.preset,
                PRESETS.join(", ")
            );
        }

        Ok(())
    }

    /// Directory that holds every run's intermediate and final files
    pub fn temp_dir(&self) -> PathBuf {
        self.app
            .temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("streammux"))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Working Directory: {}", self.temp_dir().display());
        println!("  Video Codec: {}", self.encoding.video_codec);
        println!("  Audio Codec: {}", self.encoding.audio_codec);
        println!("  Frame Rate: {}", self.encoding.fps);
        println!("  Preset: {}", self.encoding.preset);
        println!("  Threads: {}", self.encoding.threads);
        println!("  yt-dlp: {}", self.tools.yt_dlp_path);
        println!("  ffmpeg: {}", self.tools.ffmpeg_path);
        println!("  ffprobe: {}", self.tools.ffprobe_path);
    }
}
