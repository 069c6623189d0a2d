//! Temporary artifact lifecycle.
//!
//! Each pipeline job writes intermediate files (original download,
//! masked image, normalized image) under the shared working directory.
//! The store tracks every path it hands out, keyed by job id, and
//! deletes them when the job terminates. Names embed the job's UUID,
//! so concurrent jobs can never collide; the tracking mutex is held
//! only to mutate the table, never across a suspension point.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use retouch_common::{Error, Result};
use tracing::{debug, warn};
use uuid::Uuid;

/// Tracks and cleans up per-job temporary files
pub struct ArtifactStore {
    dir: PathBuf,
    tracked: Mutex<HashMap<Uuid, Vec<PathBuf>>>,
}

impl ArtifactStore {
    /// Create a store rooted at `dir` (expected to exist)
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            tracked: Mutex::new(HashMap::new()),
        }
    }

    /// Directory artifacts are written under
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a collision-free path for one pipeline stage.
    ///
    /// The name is `<job-uuid>_<suffix>.png`; uniqueness follows from
    /// the job id being a freshly generated UUIDv4, not from checking
    /// the filesystem. The path is tracked for release.
    pub fn allocate(&self, job_id: Uuid, suffix: &str) -> PathBuf {
        let path = self.dir.join(format!("{}_{}.png", job_id.simple(), suffix));
        self.tracked
            .lock()
            .expect("artifact table lock poisoned")
            .entry(job_id)
            .or_default()
            .push(path.clone());
        path
    }

    /// Write artifact bytes; failure here is fatal to the pipeline
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| Error::ArtifactIo {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Delete a single artifact as soon as its successor stage no
    /// longer needs it, keeping per-job disk usage bounded.
    pub async fn discard(&self, job_id: Uuid, path: &Path) {
        {
            let mut tracked = self.tracked.lock().expect("artifact table lock poisoned");
            if let Some(paths) = tracked.get_mut(&job_id) {
                paths.retain(|p| p != path);
            }
        }
        remove_quietly(path).await;
    }

    /// Delete every remaining artifact of a job.
    ///
    /// Called exactly once per job, on success and on every failure
    /// path. Already-deleted files are not an error; other I/O errors
    /// are logged as warnings and never fail the request.
    pub async fn release(&self, job_id: Uuid) {
        let paths = self
            .tracked
            .lock()
            .expect("artifact table lock poisoned")
            .remove(&job_id)
            .unwrap_or_default();

        for path in paths {
            remove_quietly(&path).await;
        }
    }

    /// Number of paths currently tracked for a job
    pub fn tracked_count(&self, job_id: Uuid) -> usize {
        self.tracked
            .lock()
            .expect("artifact table lock poisoned")
            .get(&job_id)
            .map_or(0, Vec::len)
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove artifact {}: {}", path.display(), e),
    }
}
