use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use url::Url;

pub mod youtube;

use crate::Result;

/// Kind of elementary stream offered by a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single downloadable stream resolved by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamHandle {
    /// Source URL the stream was resolved from
    pub source: String,

    /// Video or audio
    pub kind: MediaKind,

    /// Resolution tag such as "720p" (video only)
    pub resolution: Option<String>,

    /// Provider-specific format identifier
    pub format_id: String,

    /// Direct URL of the stream, when the provider exposes one
    pub url: Option<String>,

    /// Container extension reported by the provider
    pub extension: String,

    /// Total bitrate in kbit/s if known
    pub bitrate: Option<f64>,

    /// Extra HTTP headers required to fetch `url`
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

impl StreamHandle {
    pub fn describe(&self) -> String {
        match &self.resolution {
            Some(res) => format!("{} {} ({})", self.kind, res, self.format_id),
            None => format!("{} ({})", self.kind, self.format_id),
        }
    }
}

/// Metadata shown to the user before a download is chosen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: String,
    pub title: Option<String>,
    pub duration_seconds: u64,
    pub resolutions: Vec<String>,
}

/// Catalog and byte-fetch side of a remote video platform.
///
/// Implementations must be safe to share between the two concurrent
/// downloads of a run.
#[async_trait]
pub trait StreamSourceProvider: Send + Sync {
    /// Resolution tags of the video-only streams, lowest first
    async fn list_resolutions(&self, source: &str) -> Result<Vec<String>>;

    /// Duration of the source in whole seconds
    async fn duration(&self, source: &str) -> Result<u64>;

    /// Resolve a stream of `kind`; `resolution` is only consulted for video.
    /// Returns `Ok(None)` when nothing matches.
    async fn resolve_stream(
        &self,
        source: &str,
        kind: MediaKind,
        resolution: Option<&str>,
    ) -> Result<Option<StreamHandle>>;

    /// Download `handle` to `dest`, overwriting anything already there
    async fn download(&self, handle: &StreamHandle, dest: &Path) -> Result<()>;

    /// Get the name of this provider
    fn name(&self) -> &'static str;

    /// Title, duration and resolutions in one call
    async fn summary(&self, source: &str) -> Result<SourceSummary> {
        Ok(SourceSummary {
            source: source.to_string(),
            title: None,
            duration_seconds: self.duration(source).await?,
            resolutions: self.list_resolutions(source).await?,
        })
    }
}

/// Stream a URL to disk, sending any headers the provider requires
pub async fn http_download(
    url: &str,
    headers: &HashMap<String, String>,
    dest: &Path,
) -> Result<u64> {
    use futures_util::StreamExt;
    use std::io::Write;

    let client = reqwest::Client::new();
    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        anyhow::bail!("Failed to download stream: HTTP {}", response.status());
    }

    let mut file = fs_err::File::create(dest)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
    }
    file.flush()?;

    tracing::debug!("Wrote {} bytes to {}", downloaded, dest.display());
    Ok(downloaded)
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(validate_url("ftp://example.com/video").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_describe_handle() {
        let handle = StreamHandle {
            source: "https://youtu.be/abc".to_string(),
            kind: MediaKind::Video,
            resolution: Some("720p".to_string()),
            format_id: "136".to_string(),
            url: None,
            extension: "mp4".to_string(),
            bitrate: None,
            http_headers: HashMap::new(),
        };
        assert_eq!(handle.describe(), "video 720p (136)");
    }
}
