//! Thumbnail resolution and memoization.
//!
//! [`ThumbnailResolver::resolve`] decides, per request, which file to serve
//! as the thumbnail of a [`PhotoRecord`]:
//!
//! 1. **Memoized**: the record's thumbnail slot is already set: serve it.
//!    The requested size is not consulted; the first successful request
//!    fixes the thumbnail for the rest of the process lifetime.
//! 2. **Fits**: the original is no larger than `target` on either side:
//!    the original is its own thumbnail.
//! 3. **Generate**: scale the original so its longer side is `target`,
//!    write a JPEG to `{output_dir}/{fresh id}.jpg`, and memoize that path.
//!
//! A failed generation leaves the slot empty, so the next request retries.
//!
//! ## Concurrency
//!
//! The slot is a `tokio::sync::OnceCell`. Concurrent first requests for one
//! record collapse into a single generation: one caller runs the backend,
//! the others wait and receive the same path. Requests for different
//! records never block each other.
//!
//! Backend work runs on the blocking pool under a timeout. A timed-out
//! generation is reported as [`BackendError::Timeout`]; its blocking task is
//! left to finish on its own and its output, if any, is never memoized.

use crate::id::IdGenerator;
use crate::imaging::calculations::fits_within;
use crate::imaging::{BackendError, ImageBackend, Quality, create_thumbnail};
use crate::index::PhotoRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Thumbnail task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Thumbnail directory {path} is not usable: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Settings that shape every generated thumbnail.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub quality: Quality,
    pub timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Create `dir` if needed and verify that files can be written into it.
pub fn prepare_output_dir(dir: &Path) -> Result<(), ThumbnailError> {
    let wrap = |source: std::io::Error| ThumbnailError::OutputDir {
        path: dir.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(wrap)?;
    tempfile::tempfile_in(dir).map_err(wrap)?;
    Ok(())
}

pub struct ThumbnailResolver {
    backend: Arc<dyn ImageBackend>,
    output_dir: PathBuf,
    ids: Arc<IdGenerator>,
    settings: ResolverSettings,
}

impl ThumbnailResolver {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        output_dir: PathBuf,
        ids: Arc<IdGenerator>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            backend,
            output_dir,
            ids,
            settings,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the file to serve as `record`'s thumbnail at `target` pixels.
    pub async fn resolve(
        &self,
        record: &PhotoRecord,
        target: u32,
    ) -> Result<PathBuf, ThumbnailError> {
        if let Some(path) = record.thumbnail_path() {
            debug!(id = %record.id, "thumbnail memoized");
            return Ok(path.to_path_buf());
        }
        let path = record
            .thumbnail_slot()
            .get_or_try_init(|| self.produce(record, target))
            .await?;
        Ok(path.clone())
    }

    async fn produce(&self, record: &PhotoRecord, target: u32) -> Result<PathBuf, ThumbnailError> {
        if fits_within(record.dimensions, target) {
            debug!(id = %record.id, target, "original fits, serving it as thumbnail");
            return Ok(record.source_path.clone());
        }

        let output = self.output_dir.join(format!("{}.jpg", self.ids.next_id()));
        debug!(id = %record.id, target, output = %output.display(), "generating thumbnail");

        let backend = Arc::clone(&self.backend);
        let source = record.source_path.clone();
        let dims = record.dimensions;
        let quality = self.settings.quality;
        let job_output = output.clone();
        let job = tokio::task::spawn_blocking(move || {
            create_thumbnail(backend.as_ref(), &source, &job_output, dims, target, quality)
        });

        match tokio::time::timeout(self.settings.timeout, job).await {
            Ok(joined) => {
                joined??;
            }
            Err(_) => return Err(BackendError::Timeout(self.settings.timeout).into()),
        }

        info!(id = %record.id, target, output = %output.display(), "thumbnail generated");
        Ok(output)
    }
}
