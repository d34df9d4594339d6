use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::artifacts::{Artifact, ArtifactScope};
use super::trim::TrimRange;
use crate::engine::{EncodeSettings, MediaEncodingEngine};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MuxError {
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

/// Final output path: same directory and stem as the video, `_final` suffix
pub fn final_path_for(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    video_path.with_file_name(format!("{}_final.mp4", stem))
}

/// Combines downloaded streams into the final file
pub struct MuxOrchestrator {
    engine: Arc<dyn MediaEncodingEngine>,
    settings: EncodeSettings,
}

impl MuxOrchestrator {
    pub fn new(engine: Arc<dyn MediaEncodingEngine>, settings: EncodeSettings) -> Self {
        Self { engine, settings }
    }

    pub async fn combine(
        &self,
        video_path: &Path,
        audio_path: &Path,
        trim: Option<TrimRange>,
    ) -> Result<Artifact, MuxError> {
        let failed = |stage: &str, e: anyhow::Error| {
            MuxError::EncodingFailed(format!("{}: {:#}", stage, e))
        };

        let video = self
            .engine
            .load(video_path)
            .await
            .map_err(|e| failed("loading video", e))?;
        let audio = self
            .engine
            .load(audio_path)
            .await
            .map_err(|e| failed("loading audio", e))?;

        let mut combined = self.engine.attach_audio(&video, &audio);
        if let Some(range) = trim {
            tracing::info!("Trimming output to {}s-{}s", range.start(), range.end());
            combined = self
                .engine
                .slice(&combined, range.start() as f64, range.end() as f64);
        }

        let output = final_path_for(video_path);
        tracing::info!(
            "Encoding {} with {} ({} fps, preset {})",
            output.display(),
            self.engine.name(),
            self.settings.fps,
            self.settings.preset
        );

        // Removes a partial or empty output unless the write is confirmed below
        let mut pending = ArtifactScope::new(vec![output.clone()]);
        self.engine
            .write(&combined, &output, &self.settings)
            .await
            .map_err(|e| failed("writing output", e))?;

        match fs_err::metadata(&output) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                pending.persist();
                Ok(Artifact::final_output(output))
            }
            Ok(_) => Err(MuxError::EncodingFailed(format!(
                "{} engine produced an empty file at {}",
                self.engine.name(),
                output.display()
            ))),
            Err(e) => Err(MuxError::EncodingFailed(format!("output not written: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_path_keeps_stem_and_directory() {
        let path = final_path_for(Path::new("/work/video_720p_ab12cd34ef56.mp4"));
        assert_eq!(path, PathBuf::from("/work/video_720p_ab12cd34ef56_final.mp4"));
    }
}
