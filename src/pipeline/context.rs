use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::utils::sanitize_filename;
use crate::Result;

/// Per-run namespace for every temporary path the pipeline creates.
///
/// Two runs in the same working directory never share a file name because the
/// run id is embedded in each path.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    work_dir: PathBuf,
}

impl RunContext {
    /// Create a context rooted at `work_dir`, creating the directory if absent
    pub fn create(work_dir: &Path) -> Result<Self> {
        fs_err::create_dir_all(work_dir)
            .with_context(|| format!("Failed to create working directory {}", work_dir.display()))?;

        Ok(Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            work_dir: work_dir.to_path_buf(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn short_id(&self) -> String {
        self.run_id.simple().to_string()[..12].to_string()
    }

    /// Destination of the downloaded video-only stream
    pub fn video_path(&self, resolution: &str) -> PathBuf {
        self.work_dir.join(format!(
            "video_{}_{}.mp4",
            sanitize_filename(resolution),
            self.short_id()
        ))
    }

    /// Destination of the downloaded audio-only stream
    pub fn audio_path(&self) -> PathBuf {
        self.work_dir.join(format!("audio_{}.mp4", self.short_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_namespaced_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let first = RunContext::create(dir.path()).unwrap();
        let second = RunContext::create(dir.path()).unwrap();

        assert_ne!(first.audio_path(), second.audio_path());
        assert_ne!(first.video_path("720p"), second.video_path("720p"));
        assert_ne!(first.video_path("720p"), first.video_path("1080p"));
    }

    #[test]
    fn test_paths_live_in_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::create(&dir.path().join("nested")).unwrap();

        assert!(ctx.work_dir().is_dir());
        let video = ctx.video_path("720p");
        assert_eq!(video.parent(), Some(ctx.work_dir()));
        let name = video.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("video_720p_"));
        assert!(name.ends_with(".mp4"));
        assert!(ctx.audio_path().file_name().unwrap().to_string_lossy().starts_with("audio_"));
    }
}
