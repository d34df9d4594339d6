//! StreamMux - download a video's separate video and audio streams and mux them
//!
//! This library resolves the requested resolution against a stream source,
//! downloads the video-only and audio-only streams concurrently, optionally
//! trims the combined timeline and encodes a single output file, removing every
//! intermediate download whether the run succeeds or fails.

pub mod cli;
pub mod config;
pub mod engine;
pub mod output;
pub mod pipeline;
pub mod source;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use engine::{EncodeSettings, MediaEncodingEngine};
pub use pipeline::{Pipeline, ProgressNotice, RunReport, VideoRequest};
pub use source::{MediaKind, StreamHandle, StreamSourceProvider};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Why a run did not produce a final file
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Trim(#[from] pipeline::TrimError),

    #[error(transparent)]
    Acquisition(#[from] pipeline::AcquisitionError),

    #[error(transparent)]
    Mux(#[from] pipeline::MuxError),

    #[error("Could not read source metadata: {0}")]
    Source(String),

    #[error("Failed to prepare working directory: {0}")]
    Workspace(String),
}
