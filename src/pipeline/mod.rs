//! Acquisition and mux pipeline.
//!
//! A run goes: trim resolution (if requested) -> concurrent download of the
//! video and audio streams -> mux -> cleanup of the downloaded inputs. The
//! final file is the only thing a successful run leaves behind; a failed run
//! leaves nothing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub mod acquire;
pub mod artifacts;
pub mod context;
pub mod mux;
pub mod trim;

use crate::config::Config;
use crate::engine::{EncodeSettings, MediaEncodingEngine};
use crate::source::{MediaKind, StreamSourceProvider};
use crate::PipelineError;

pub use acquire::{
    AcquiredStreams, AcquisitionCoordinator, AcquisitionError, DownloadOutcome, DownloadResult,
};
pub use artifacts::{with_scoped_artifacts, Artifact, ArtifactKind, ArtifactScope};
pub use context::RunContext;
pub use mux::{MuxError, MuxOrchestrator};
pub use trim::{TimeInput, TrimError, TrimRange, TrimRequest};

/// Advisory status updates for whoever drives the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressNotice {
    Probing,
    Downloading { resolution: String },
    Downloaded { kind: MediaKind },
    Encoding { trimmed: bool },
    CleanedUp,
    Finished(PathBuf),
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressNotice>;

/// One user submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub source: String,
    pub resolution: String,
    pub trim: Option<TrimRequest>,
}

impl VideoRequest {
    pub fn new(source: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            resolution: resolution.into(),
            trim: None,
        }
    }

    pub fn with_trim(mut self, start: TimeInput, end: TimeInput) -> Self {
        self.trim = Some(TrimRequest::new(start, end));
        self
    }
}

/// What a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub source: String,
    pub resolution: String,
    pub trim: Option<TrimRange>,
    pub output: PathBuf,
    pub output_size: u64,
    pub elapsed_seconds: f64,
}

/// Wires a stream source and an encoding engine into runs
pub struct Pipeline {
    provider: Arc<dyn StreamSourceProvider>,
    engine: Arc<dyn MediaEncodingEngine>,
    settings: EncodeSettings,
    work_dir: PathBuf,
    progress: Option<ProgressSender>,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn StreamSourceProvider>,
        engine: Arc<dyn MediaEncodingEngine>,
        settings: EncodeSettings,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            engine,
            settings,
            work_dir: work_dir.into(),
            progress: None,
        }
    }

    pub fn from_config(
        config: &Config,
        provider: Arc<dyn StreamSourceProvider>,
        engine: Arc<dyn MediaEncodingEngine>,
    ) -> Self {
        Self::new(provider, engine, EncodeSettings::from(&config.encoding), config.temp_dir())
    }

    /// Send progress notices to `tx`. Dropping the receiver is harmless.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    fn notify(&self, notice: ProgressNotice) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(notice);
        }
    }

    /// Produce the final muxed file for `request`
    pub async fn run(&self, request: &VideoRequest) -> Result<PathBuf, PipelineError> {
        self.run_with_report(request).await.map(|report| report.output)
    }

    pub async fn run_with_report(
        &self,
        request: &VideoRequest,
    ) -> Result<RunReport, PipelineError> {
        let started = std::time::Instant::now();
        let ctx = RunContext::create(&self.work_dir)
            .map_err(|e| PipelineError::Workspace(format!("{:#}", e)))?;

        tracing::info!(
            "Run {} started for {} at {}",
            ctx.run_id(),
            request.source,
            request.resolution
        );

        let trim = match request.trim {
            Some(raw) => {
                self.notify(ProgressNotice::Probing);
                let duration = self
                    .provider
                    .duration(&request.source)
                    .await
                    .map_err(|e| PipelineError::Source(format!("{:#}", e)))?;
                Some(trim::resolve(raw.start, raw.end, duration)?)
            }
            None => None,
        };

        let temporaries = vec![ctx.video_path(&request.resolution), ctx.audio_path()];
        let artifact =
            with_scoped_artifacts(temporaries, || self.acquire_and_mux(&ctx, request, trim)).await;
        self.notify(ProgressNotice::CleanedUp);
        let artifact = artifact?;

        let output_size = fs_err::metadata(&artifact.path).map(|m| m.len()).unwrap_or(0);
        tracing::info!(
            "Run {} finished: {} ({})",
            ctx.run_id(),
            artifact.path.display(),
            crate::utils::format_file_size(output_size)
        );
        self.notify(ProgressNotice::Finished(artifact.path.clone()));

        Ok(RunReport {
            run_id: ctx.run_id().to_string(),
            started_at: ctx.started_at(),
            source: request.source.clone(),
            resolution: request.resolution.clone(),
            trim,
            output: artifact.path,
            output_size,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        })
    }

    async fn acquire_and_mux(
        &self,
        ctx: &RunContext,
        request: &VideoRequest,
        trim: Option<TrimRange>,
    ) -> Result<Artifact, PipelineError> {
        let streams = AcquisitionCoordinator::new(Arc::clone(&self.provider))
            .with_progress(self.progress.clone())
            .acquire(ctx, request)
            .await?;

        self.notify(ProgressNotice::Encoding { trimmed: trim.is_some() });
        let artifact = MuxOrchestrator::new(Arc::clone(&self.engine), self.settings.clone())
            .combine(&streams.video_path, &streams.audio_path, trim)
            .await?;

        Ok(artifact)
    }
}
