//! Temporary artifact lifecycle.
//!
//! Every intermediate file of a run is registered with an [`ArtifactScope`]
//! before it can exist on disk. The scope removes them exactly once: either
//! when [`ArtifactScope::release`] is called or, if the run unwinds or its
//! future is dropped, when the scope itself is dropped.

use serde::Serialize;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Whether a file is pipeline-owned scratch or the caller's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Temporary,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn temporary(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: ArtifactKind::Temporary }
    }

    pub fn final_output(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: ArtifactKind::Final }
    }
}

/// Outcome of removing one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Missing,
    Failed,
}

/// Remove a single file. Never fails; problems are logged.
pub fn remove_artifact(path: &Path) -> Removal {
    match fs_err::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed temporary file {}", path.display());
            Removal::Removed
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("Temporary file already gone: {}", path.display());
            Removal::Missing
        }
        Err(e) => {
            tracing::warn!("Failed to remove temporary file: {}", e);
            Removal::Failed
        }
    }
}

/// Remove every path, tolerating ones that are already gone.
/// Returns how many files were actually deleted.
pub fn release_paths(paths: &[PathBuf]) -> usize {
    paths
        .iter()
        .map(|p| remove_artifact(p))
        .filter(|r| *r == Removal::Removed)
        .count()
}

/// Owns a set of temporary paths until they are released
#[derive(Debug, Default)]
pub struct ArtifactScope {
    paths: Vec<PathBuf>,
    released: bool,
}

impl ArtifactScope {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths, released: false }
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Delete the tracked files. Only the first call does any work.
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;

        let removed = release_paths(&self.paths);
        tracing::debug!("Released {}/{} temporary files", removed, self.paths.len());
        removed
    }

    /// Hand the tracked files over to the caller; nothing will be deleted.
    pub fn persist(&mut self) {
        self.released = true;
    }
}

impl Drop for ArtifactScope {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!("Artifact scope dropped before release, cleaning up");
            self.release();
        }
    }
}

/// Run `body` with `paths` scoped to it: the files are deleted once the body
/// returns, whatever it returns. A panic inside `body`, or dropping the
/// returned future, is covered by the scope's drop. Tasks spawned by `body`
/// must be aborted by their own owners before that happens.
pub async fn with_scoped_artifacts<T, E, F, Fut>(paths: Vec<PathBuf>, body: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut scope = ArtifactScope::new(paths);
    let outcome = body().await;
    scope.release();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs_err::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn test_release_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![touch(dir.path(), "a.mp4"), touch(dir.path(), "b.mp4")];

        assert_eq!(release_paths(&paths), 2);
        assert_eq!(release_paths(&paths), 0);
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[test]
    fn test_scope_releases_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut scope = ArtifactScope::new(vec![touch(dir.path(), "a.mp4")]);
        scope.track(dir.path().join("never-created.mp4"));

        assert_eq!(scope.release(), 1);
        assert!(scope.is_released());

        // Recreate the file: a released scope must not touch it again.
        let again = touch(dir.path(), "a.mp4");
        assert_eq!(scope.release(), 0);
        drop(scope);
        assert!(again.exists());
    }

    #[test]
    fn test_persisted_scope_keeps_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "out_final.mp4");
        {
            let mut scope = ArtifactScope::new(vec![path.clone()]);
            scope.persist();
            assert!(scope.is_released());
        }
        assert!(path.exists());
    }

    #[test]
    fn test_drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact::temporary(touch(dir.path(), "a.mp4"));
        assert_eq!(artifact.kind, ArtifactKind::Temporary);
        {
            let _scope = ArtifactScope::new(vec![artifact.path.clone()]);
        }
        assert!(!artifact.path.exists());
    }

    #[test]
    fn test_scoped_body_error_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "a.mp4");
        let keep = dir.path().join("final.mp4");

        let result: Result<Artifact, String> =
            tokio_test::block_on(with_scoped_artifacts(vec![path.clone()], || async {
                Err("encode failed".to_string())
            }));
        assert!(result.is_err());
        assert!(!path.exists());

        let result: Result<Artifact, String> = tokio_test::block_on(with_scoped_artifacts(
            vec![touch(dir.path(), "b.mp4")],
            || {
                let keep = keep.clone();
                async move {
                    fs_err::write(&keep, b"out").unwrap();
                    Ok(Artifact::final_output(keep))
                }
            },
        ));
        let artifact = result.unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Final);
        assert!(artifact.path.exists());
        assert!(!dir.path().join("b.mp4").exists());
    }

    #[test]
    fn test_scoped_body_panic_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "a.mp4");
        let scoped = path.clone();

        let outcome = std::panic::catch_unwind(move || {
            tokio_test::block_on(with_scoped_artifacts(vec![scoped], || async {
                if true {
                    panic!("engine crashed");
                }
                Ok::<(), ()>(())
            }))
        });

        assert!(outcome.is_err());
        assert!(!path.exists());
    }
}
