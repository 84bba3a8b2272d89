//! Flat directory of compressed artifacts named `<unixNanoTimestamp>.jpg`.
//!
//! Names come from the wall clock, but the store never hands out the same timestamp twice within a
//! process and opens files with `create_new`, so a collision (another process, clock going
//! backwards) moves on to the next nanosecond instead of overwriting an existing artifact.
//! Nothing is ever deleted except a partially written artifact after a failed encode.

use chrono::Utc;
use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::{debug, warn};

const ARTIFACT_EXTENSION: &str = "jpg";
const MAX_CREATE_ATTEMPTS: usize = 16;

/// Handle to the output directory, shared by all requests.
#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    last_issued: AtomicU64,
}

/// A freshly created, empty artifact file.
#[derive(Debug)]
pub struct Artifact {
    pub filename: String,
    pub path: PathBuf,
    pub file: File,
}

impl ArtifactStore {
    /// Open the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Artifact store ready");

        Ok(Self {
            dir,
            last_issued: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Next timestamp: the current time in nanoseconds, or one past the last one issued if the
    /// clock has not advanced.
    fn next_stamp(&self) -> u64 {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or_default();

        let previous = self
            .last_issued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);

        now.max(previous + 1)
    }

    /// Create a new, empty artifact.
    pub fn create(&self) -> io::Result<Artifact> {
        let mut last_err = None;

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let filename = format!("{}.{ARTIFACT_EXTENSION}", self.next_stamp());
            let path = self.dir.join(&filename);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok(Artifact { filename, path, file }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(filename = %filename, "Artifact name already taken, retrying");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| io::Error::other("could not allocate an artifact name")))
    }

    /// Size in bytes of a stored artifact.
    pub fn size(&self, filename: &str) -> io::Result<u64> {
        Ok(std::fs::metadata(self.dir.join(filename))?.len())
    }

    /// Best-effort removal of an artifact that failed to encode.
    pub fn discard(&self, filename: &str) {
        if let Err(e) = std::fs::remove_file(self.dir.join(filename)) {
            warn!(filename = %filename, error = %e, "Failed to remove partial artifact");
        }
    }
}
