use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::{CombinedHandle, EncodeSettings, MediaEncodingEngine, MediaHandle};
use crate::config::ToolsConfig;
use crate::Result;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_probe(path: &Path, json: &str) -> Result<MediaHandle> {
    let probe: ProbeOutput = serde_json::from_str(json).context("Failed to parse ffprobe output")?;

    let count = |kind: &str| {
        probe
            .streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some(kind))
            .count()
    };

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| anyhow::anyhow!("ffprobe reported no duration for {}", path.display()))?;

    Ok(MediaHandle {
        path: path.to_path_buf(),
        duration,
        video_streams: count("video"),
        audio_streams: count("audio"),
    })
}

fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

/// Arguments for one encode. The trim window is passed as output options so
/// it cuts the already-synchronized timeline instead of either input.
fn build_write_args(combined: &CombinedHandle, dest: &Path, settings: &EncodeSettings) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        combined.video.path.to_string_lossy().into_owned(),
        "-i".into(),
        combined.audio.path.to_string_lossy().into_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
    ];

    if let Some((start, end)) = combined.window {
        args.extend(["-ss".into(), format_seconds(start), "-to".into(), format_seconds(end)]);
    }

    args.extend([
        "-c:v".into(),
        settings.video_codec.clone(),
        "-preset".into(),
        settings.preset.clone(),
        "-r".into(),
        settings.fps.to_string(),
        "-threads".into(),
        settings.threads.to_string(),
        "-c:a".into(),
        settings.audio_codec.clone(),
        "-shortest".into(),
        dest.to_string_lossy().into_owned(),
    ]);

    args
}

/// Encoding engine driving the ffmpeg and ffprobe binaries
pub struct FfmpegEngine {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self::from_tools(&ToolsConfig::default())
    }

    pub fn from_tools(tools: &ToolsConfig) -> Self {
        Self {
            ffmpeg_path: tools.ffmpeg_path.clone(),
            ffprobe_path: tools.ffprobe_path.clone(),
        }
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEncodingEngine for FfmpegEngine {
    async fn load(&self, path: &Path) -> Result<MediaHandle> {
        if !path.is_file() {
            anyhow::bail!("Media file does not exist: {}", path.display());
        }

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffprobe_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffprobe failed on {}: {}", path.display(), error.trim());
        }

        let json = String::from_utf8(output.stdout)?;
        parse_probe(path, &json)
    }

    async fn write(&self, combined: &CombinedHandle, dest: &Path, settings: &EncodeSettings) -> Result<()> {
        if combined.video.video_streams == 0 {
            anyhow::bail!("{} has no video stream", combined.video.path.display());
        }
        if combined.audio.audio_streams == 0 {
            anyhow::bail!("{} has no audio stream", combined.audio.path.display());
        }

        let args = build_write_args(combined, dest, settings);
        tracing::debug!("Running {} {}", self.ffmpeg_path, args.join(" "));

        let output = Command::new(&self.ffmpeg_path)
            .args(&args)
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffmpeg_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "ffmpeg exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                error.trim()
            );
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn combined(window: Option<(f64, f64)>) -> CombinedHandle {
        CombinedHandle {
            video: MediaHandle {
                path: PathBuf::from("/tmp/video_720p.mp4"),
                duration: 120.0,
                video_streams: 1,
                audio_streams: 0,
            },
            audio: MediaHandle {
                path: PathBuf::from("/tmp/audio.mp4"),
                duration: 120.0,
                video_streams: 0,
                audio_streams: 1,
            },
            window,
        }
    }

    #[test]
    fn test_parse_probe_counts_streams() {
        let json = r#"{
            "streams": [{"codec_type": "video"}, {"codec_type": "audio"}, {"codec_type": "audio"}],
            "format": {"duration": "120.500000"}
        }"#;
        let handle = parse_probe(Path::new("x.mp4"), json).unwrap();
        assert_eq!(handle.duration, 120.5);
        assert_eq!(handle.video_streams, 1);
        assert_eq!(handle.audio_streams, 2);
    }

    #[test]
    fn test_parse_probe_requires_duration() {
        let json = r#"{"streams": [], "format": {}}"#;
        assert!(parse_probe(Path::new("x.mp4"), json).is_err());
    }

    #[test]
    fn test_write_args_replace_audio() {
        let args = build_write_args(&combined(None), Path::new("/tmp/out.mp4"), &EncodeSettings::default());
        let joined = args.join(" ");
        assert!(joined.contains("-map 0:v:0 -map 1:a:0"));
        assert!(joined.contains("-c:v libx264 -preset ultrafast -r 45 -threads 4"));
        assert!(!joined.contains("-ss"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[test]
    fn test_trim_window_is_an_output_option() {
        let args = build_write_args(&combined(Some((30.0, 60.0))), Path::new("/tmp/out.mp4"), &EncodeSettings::default());
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let last_input = args.iter().rposition(|a| a == "-i").unwrap();
        assert!(ss > last_input);
        assert_eq!(args[ss + 1], "30.000");
        assert_eq!(args[ss + 3], "60.000");
    }
}
