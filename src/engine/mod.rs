use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod ffmpeg;

use crate::config::EncodingConfig;
use crate::Result;

/// A media file loaded by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaHandle {
    pub path: PathBuf,

    /// Duration in seconds
    pub duration: f64,

    pub video_streams: usize,
    pub audio_streams: usize,
}

/// A video handle whose audio has been replaced, optionally restricted to a window
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedHandle {
    pub video: MediaHandle,
    pub audio: MediaHandle,

    /// `(start, end)` in seconds on the combined timeline
    pub window: Option<(f64, f64)>,
}

impl CombinedHandle {
    /// Length of the output the handle describes
    pub fn output_duration(&self) -> f64 {
        match self.window {
            Some((start, end)) => end - start,
            None => self.video.duration,
        }
    }
}

/// Operator-tunable encoder parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub fps: u32,
    pub preset: String,
    pub threads: usize,
}

impl From<&EncodingConfig> for EncodeSettings {
    fn from(config: &EncodingConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            fps: config.fps,
            preset: config.preset.clone(),
            threads: config.threads,
        }
    }
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from(&EncodingConfig::default())
    }
}

/// Loads, combines and writes media files
#[async_trait]
pub trait MediaEncodingEngine: Send + Sync {
    /// Open a file as time-addressable media
    async fn load(&self, path: &Path) -> Result<MediaHandle>;

    /// Use `audio` as the only audio source of `video`
    fn attach_audio(&self, video: &MediaHandle, audio: &MediaHandle) -> CombinedHandle {
        CombinedHandle {
            video: video.clone(),
            audio: audio.clone(),
            window: None,
        }
    }

    /// Restrict a combined handle to `[start, end]` seconds
    fn slice(&self, combined: &CombinedHandle, start: f64, end: f64) -> CombinedHandle {
        CombinedHandle {
            window: Some((start, end)),
            ..combined.clone()
        }
    }

    /// Encode `combined` to `dest`
    async fn write(&self, combined: &CombinedHandle, dest: &Path, settings: &EncodeSettings) -> Result<()>;

    /// Get the name of this engine
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(path: &str, duration: f64) -> MediaHandle {
        MediaHandle {
            path: PathBuf::from(path),
            duration,
            video_streams: 1,
            audio_streams: 0,
        }
    }

    #[test]
    fn test_output_duration_follows_window() {
        let combined = CombinedHandle {
            video: handle("v.mp4", 120.0),
            audio: handle("a.mp4", 120.0),
            window: None,
        };
        assert_eq!(combined.output_duration(), 120.0);

        let sliced = CombinedHandle {
            window: Some((30.0, 60.0)),
            ..combined
        };
        assert_eq!(sliced.output_duration(), 30.0);
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = EncodeSettings::default();
        assert_eq!(settings.video_codec, "libx264");
        assert_eq!(settings.fps, 45);
        assert_eq!(settings.preset, "ultrafast");
    }
}
