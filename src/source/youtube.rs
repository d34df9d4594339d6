use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::process::Command;

use super::{http_download, MediaKind, SourceSummary, StreamHandle, StreamSourceProvider};
use crate::Result;

/// Subset of the `yt-dlp --dump-json` document we rely on
#[derive(Debug, Clone, Deserialize)]
struct VideoInfo {
    title: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<FormatInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct FormatInfo {
    format_id: String,
    #[serde(default)]
    ext: String,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    tbr: Option<f64>,
    abr: Option<f64>,
    url: Option<String>,
    protocol: Option<String>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

impl FormatInfo {
    fn has_codec(codec: &Option<String>) -> bool {
        matches!(codec.as_deref(), Some(c) if c != "none")
    }

    fn is_video_only(&self) -> bool {
        Self::has_codec(&self.vcodec) && !Self::has_codec(&self.acodec) && self.height.is_some()
    }

    fn is_audio_only(&self) -> bool {
        Self::has_codec(&self.acodec) && !Self::has_codec(&self.vcodec)
    }

    /// MP4-family containers only, matching what the muxer writes
    fn is_mp4_family(&self) -> bool {
        matches!(self.ext.as_str(), "mp4" | "m4a")
    }

    fn resolution_tag(&self) -> Option<String> {
        self.height.map(|h| format!("{}p", h))
    }

    fn into_handle(self, source: &str, kind: MediaKind) -> StreamHandle {
        let resolution = match kind {
            MediaKind::Video => self.resolution_tag(),
            MediaKind::Audio => None,
        };
        let direct = matches!(self.protocol.as_deref(), Some("https") | Some("http"));

        StreamHandle {
            source: source.to_string(),
            kind,
            resolution,
            format_id: self.format_id,
            url: if direct { self.url } else { None },
            extension: self.ext,
            bitrate: self.abr.or(self.tbr),
            http_headers: self.http_headers,
        }
    }
}

fn list_resolutions_of(info: &VideoInfo) -> Vec<String> {
    let mut heights: Vec<u32> = info
        .formats
        .iter()
        .filter(|f| f.is_video_only() && f.is_mp4_family())
        .filter_map(|f| f.height)
        .collect();
    heights.sort_unstable();
    heights.dedup();
    heights.into_iter().map(|h| format!("{}p", h)).collect()
}

fn pick_video<'a>(info: &'a VideoInfo, resolution: &str) -> Option<&'a FormatInfo> {
    info.formats
        .iter()
        .filter(|f| f.is_video_only() && f.is_mp4_family())
        .filter(|f| f.resolution_tag().as_deref() == Some(resolution))
        .max_by(|a, b| a.tbr.unwrap_or(0.0).total_cmp(&b.tbr.unwrap_or(0.0)))
}

fn pick_audio(info: &VideoInfo) -> Option<&FormatInfo> {
    info.formats
        .iter()
        .filter(|f| f.is_audio_only() && f.is_mp4_family())
        .max_by(|a, b| {
            let a_rate = a.abr.or(a.tbr).unwrap_or(0.0);
            let b_rate = b.abr.or(b.tbr).unwrap_or(0.0);
            a_rate.total_cmp(&b_rate)
        })
}

/// Stream source backed by yt-dlp
pub struct YtDlpProvider {
    yt_dlp_path: String,
    cache: Mutex<HashMap<String, Arc<VideoInfo>>>,
}

impl YtDlpProvider {
    pub fn new() -> Self {
        Self::with_binary("yt-dlp")
    }

    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: path.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Probe a source once; later lookups for the same URL hit the cache
    async fn video_info(&self, source: &str) -> Result<Arc<VideoInfo>> {
        if let Some(info) = self.cached(source) {
            return Ok(info);
        }

        tracing::debug!("Extracting video info for: {}", source);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", source])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", self.yt_dlp_path, e))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let json_str = String::from_utf8(output.stdout)?;
        let info: VideoInfo = serde_json::from_str(&json_str)?;
        let info = Arc::new(info);

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(source.to_string(), Arc::clone(&info));
        }

        Ok(info)
    }

    fn cached(&self, source: &str) -> Option<Arc<VideoInfo>> {
        self.cache.lock().ok()?.get(source).cloned()
    }

    /// Let yt-dlp fetch a fragmented format itself.
    /// `--no-part` keeps partial bytes at `dest` so cleanup can find them.
    async fn download_with_ytdlp(&self, handle: &StreamHandle, dest: &Path) -> Result<()> {
        tracing::debug!("Downloading {} with yt-dlp", handle.describe());

        let dest_str = dest.to_string_lossy();
        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--format",
                handle.format_id.as_str(),
                "--output",
                dest_str.as_ref(),
                "--no-part",
                "--force-overwrites",
                "--no-playlist",
                "--concurrent-fragments",
                "4",
                "--newline",
                handle.source.as_str(),
            ])
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp download failed: {}", error.trim());
        }

        Ok(())
    }
}

#[async_trait]
impl StreamSourceProvider for YtDlpProvider {
    async fn list_resolutions(&self, source: &str) -> Result<Vec<String>> {
        let info = self.video_info(source).await?;
        Ok(list_resolutions_of(&info))
    }

    async fn duration(&self, source: &str) -> Result<u64> {
        let info = self.video_info(source).await?;
        info.duration
            .map(|d| d.floor() as u64)
            .ok_or_else(|| anyhow::anyhow!("yt-dlp reported no duration for {}", source))
    }

    async fn resolve_stream(
        &self,
        source: &str,
        kind: MediaKind,
        resolution: Option<&str>,
    ) -> Result<Option<StreamHandle>> {
        let info = self.video_info(source).await?;
        let format = match (kind, resolution) {
            (MediaKind::Video, Some(res)) => pick_video(&info, res),
            (MediaKind::Video, None) => {
                anyhow::bail!("A resolution is required to resolve a video stream")
            }
            (MediaKind::Audio, _) => pick_audio(&info),
        };
        Ok(format.cloned().map(|f| f.into_handle(source, kind)))
    }

    async fn download(&self, handle: &StreamHandle, dest: &Path) -> Result<()> {
        match &handle.url {
            Some(url) => {
                tracing::debug!("Downloading {} over HTTP", handle.describe());
                http_download(url, &handle.http_headers, dest).await?;
                Ok(())
            }
            None => self.download_with_ytdlp(handle, dest).await,
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn summary(&self, source: &str) -> Result<SourceSummary> {
        let info = self.video_info(source).await?;
        Ok(SourceSummary {
            source: source.to_string(),
            title: info.title.clone(),
            duration_seconds: info.duration.map(|d| d.floor() as u64).unwrap_or(0),
            resolutions: list_resolutions_of(&info),
        })
    }
}

impl Default for YtDlpProvider {
    fn default() -> Self {
        Self::new()
    }
}
