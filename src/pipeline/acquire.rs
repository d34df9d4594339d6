use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::context::RunContext;
use super::{ProgressNotice, ProgressSender, VideoRequest};
use crate::source::{MediaKind, StreamHandle, StreamSourceProvider};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Resolution {requested} is not available (available: {})", .available.join(", "))]
    ResolutionUnavailable { requested: String, available: Vec<String> },

    #[error("No {0} stream could be resolved for this source")]
    StreamNotFound(MediaKind),

    #[error("Could not read stream catalog: {0}")]
    SourceUnavailable(String),

    #[error("Failed to download {0} stream: {1}")]
    DownloadFailed(MediaKind, String),
}

/// Outcome of one stream download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success(PathBuf),
    Failure(String),
}

#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub handle: StreamHandle,
    pub outcome: DownloadOutcome,
}

/// Both streams of a run, on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredStreams {
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
}

/// Resolves and downloads the video and audio streams of one request
pub struct AcquisitionCoordinator {
    provider: Arc<dyn StreamSourceProvider>,
    progress: Option<ProgressSender>,
}

impl AcquisitionCoordinator {
    pub fn new(provider: Arc<dyn StreamSourceProvider>) -> Self {
        Self { provider, progress: None }
    }

    pub fn with_progress(mut self, progress: Option<ProgressSender>) -> Self {
        self.progress = progress;
        self
    }

    fn notify(&self, notice: ProgressNotice) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(notice);
        }
    }

    /// Resolve both streams, then download them concurrently into the run's
    /// temporary paths. Nothing is downloaded unless both streams resolve.
    pub async fn acquire(
        &self,
        ctx: &RunContext,
        request: &VideoRequest,
    ) -> Result<AcquiredStreams, AcquisitionError> {
        let source = request.source.as_str();
        let resolution = request.resolution.as_str();

        let available = self
            .provider
            .list_resolutions(source)
            .await
            .map_err(|e| AcquisitionError::SourceUnavailable(format!("{:#}", e)))?;

        if !available.iter().any(|r| r == resolution) {
            return Err(AcquisitionError::ResolutionUnavailable {
                requested: resolution.to_string(),
                available,
            });
        }

        let video = self.resolve(source, MediaKind::Video, Some(resolution)).await?;
        let audio = self.resolve(source, MediaKind::Audio, None).await?;

        tracing::info!(
            "Run {}: downloading {} and {}",
            ctx.run_id(),
            video.describe(),
            audio.describe()
        );
        self.notify(ProgressNotice::Downloading { resolution: resolution.to_string() });

        let provider = &self.provider;
        let video_task =
            DownloadTask::spawn(Arc::clone(provider), video, ctx.video_path(resolution));
        let audio_task = DownloadTask::spawn(Arc::clone(provider), audio, ctx.audio_path());
        let (video_result, audio_result) = tokio::join!(video_task.finish(), audio_task.finish());

        let video_path = self.collect(video_result)?;
        let audio_path = self.collect(audio_result)?;

        Ok(AcquiredStreams { video_path, audio_path })
    }

    async fn resolve(
        &self,
        source: &str,
        kind: MediaKind,
        resolution: Option<&str>,
    ) -> Result<StreamHandle, AcquisitionError> {
        self.provider
            .resolve_stream(source, kind, resolution)
            .await
            .map_err(|e| AcquisitionError::SourceUnavailable(format!("{:#}", e)))?
            .ok_or(AcquisitionError::StreamNotFound(kind))
    }

    fn collect(&self, result: DownloadResult) -> Result<PathBuf, AcquisitionError> {
        let kind = result.handle.kind;
        match result.outcome {
            DownloadOutcome::Success(path) => {
                tracing::debug!("{} stream saved to {}", kind, path.display());
                self.notify(ProgressNotice::Downloaded { kind });
                Ok(path)
            }
            DownloadOutcome::Failure(reason) => {
                tracing::error!("{} download failed: {}", kind, reason);
                Err(AcquisitionError::DownloadFailed(kind, reason))
            }
        }
    }
}

/// One download running as its own task so both streams progress in parallel.
/// Dropping it aborts the task, so a cancelled run stops writing to its paths.
struct DownloadTask {
    handle: StreamHandle,
    dest: PathBuf,
    join: JoinHandle<crate::Result<()>>,
}

impl DownloadTask {
    fn spawn(provider: Arc<dyn StreamSourceProvider>, handle: StreamHandle, dest: PathBuf) -> Self {
        let task_handle = handle.clone();
        let task_dest = dest.clone();
        let join = tokio::spawn(async move { provider.download(&task_handle, &task_dest).await });

        Self { handle, dest, join }
    }

    async fn finish(mut self) -> DownloadResult {
        let outcome = match (&mut self.join).await {
            Ok(Ok(())) => verify_download(&self.dest),
            Ok(Err(e)) => DownloadOutcome::Failure(format!("{:#}", e)),
            Err(e) => DownloadOutcome::Failure(format!("download task aborted: {}", e)),
        };

        DownloadResult { handle: self.handle.clone(), outcome }
    }
}

impl Drop for DownloadTask {
    fn drop(&mut self) {
        if !self.join.is_finished() {
            tracing::debug!("Aborting {} download", self.handle.kind);
            self.join.abort();
        }
    }
}

/// A provider reporting success must have left a file behind
fn verify_download(dest: &Path) -> DownloadOutcome {
    if dest.is_file() {
        DownloadOutcome::Success(dest.to_path_buf())
    } else {
        DownloadOutcome::Failure(format!(
            "provider reported success but {} is missing",
            dest.display()
        ))
    }
}
