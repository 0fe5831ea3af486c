//! In-memory photo index, built once at startup.
//!
//! Walks the photo root, probes every image for its dimensions and size,
//! and assigns each one a fresh [`PhotoId`]. The resulting [`PhotoIndex`]
//! is never re-scanned: files added after startup are invisible until the
//! next restart, and files removed after startup surface as I/O errors when
//! served.
//!
//! ## Scan
//!
//! ```text
//! static/
//! ├── 2019/
//! │   ├── beach.JPG      ✓ (extension match is case-insensitive)
//! │   └── notes.txt      ✗
//! ├── broken.png         ✗ (header unreadable → skipped with a warning)
//! └── cat.gif            ✓
//! ```
//!
//! Candidates are sorted by path before probing, and ids are assigned in
//! that order, so [`PhotoIndex::list`] pages deterministically for the
//! lifetime of the process. Probing runs in parallel on the rayon pool.
//!
//! ## Thumbnail slot
//!
//! Each [`PhotoRecord`] carries a set-once thumbnail slot. The
//! [`thumbs`](crate::thumbs) resolver fills it on the first successful
//! request; after that the stored path is served for every request on that
//! record, whatever size was asked for.

use crate::id::{IdGenerator, PhotoId};
use crate::imaging::{Dimensions, ImageBackend, get_dimensions, supported_input_extensions};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Photo root not found or not a directory: {0}")]
    RootNotFound(PathBuf),
}

/// One indexed image file.
#[derive(Debug)]
pub struct PhotoRecord {
    pub id: PhotoId,
    /// Absolute path of the original.
    pub source_path: PathBuf,
    /// Base filename, e.g. `beach.JPG`.
    pub name: String,
    pub dimensions: Dimensions,
    /// Size of the original in bytes, captured at scan time.
    pub size_on_disk: u64,
    thumbnail: OnceCell<PathBuf>,
}

impl PhotoRecord {
    pub fn new(
        id: PhotoId,
        source_path: PathBuf,
        dimensions: Dimensions,
        size_on_disk: u64,
    ) -> Self {
        let name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id,
            source_path,
            name,
            dimensions,
            size_on_disk,
            thumbnail: OnceCell::new(),
        }
    }

    /// Download URL of the original.
    pub fn url(&self) -> String {
        format!("/d/{}", self.id)
    }

    /// URL of the thumbnail endpoint for this photo.
    pub fn thumb_url(&self) -> String {
        format!("/thumbs/{}", self.id)
    }

    /// Human-readable on-disk size, e.g. `"1.2 MB"`.
    pub fn size_display(&self) -> String {
        format_size(self.size_on_disk)
    }

    /// The memoized thumbnail, if one has been produced.
    pub fn thumbnail_path(&self) -> Option<&Path> {
        self.thumbnail.get().map(PathBuf::as_path)
    }

    pub(crate) fn thumbnail_slot(&self) -> &OnceCell<PathBuf> {
        &self.thumbnail
    }
}

/// Format a byte count with binary (1024) units and one decimal.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// One page of ids plus derived pagination metadata.
#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a> {
    pub ids: &'a [PhotoId],
    /// `ceil(total / limit)`
    pub pages: usize,
    /// `floor(offset / limit)`
    pub current_page: usize,
}

/// Read-mostly map from id to record with a fixed iteration order.
#[derive(Debug, Default)]
pub struct PhotoIndex {
    order: Vec<PhotoId>,
    records: HashMap<PhotoId, PhotoRecord>,
}

impl PhotoIndex {
    /// Build an index from already-constructed records, keeping their order.
    pub fn from_records(records: Vec<PhotoRecord>) -> Self {
        let order = records.iter().map(|r| r.id.clone()).collect();
        let records = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self { order, records }
    }

    pub fn lookup(&self, id: &str) -> Option<&PhotoRecord> {
        self.records.get(id)
    }

    /// Contiguous slice of the fixed order: at most `limit` ids from `offset`.
    ///
    /// An offset past the end yields an empty page, not an error.
    pub fn list(&self, offset: usize, limit: usize) -> Page<'_> {
        if limit == 0 {
            return Page {
                ids: &[],
                pages: 0,
                current_page: 0,
            };
        }
        let start = offset.min(self.order.len());
        let end = start.saturating_add(limit).min(self.order.len());
        Page {
            ids: &self.order[start..end],
            pages: self.order.len().div_ceil(limit),
            current_page: offset / limit,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records in index order.
    pub fn iter(&self) -> impl Iterator<Item = &PhotoRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }
}

/// Scan `root` and build the index.
///
/// Unreadable images are skipped with a warning; only a missing root is fatal.
pub fn build(
    root: &Path,
    backend: &(impl ImageBackend + ?Sized),
    ids: &IdGenerator,
) -> Result<PhotoIndex, IndexError> {
    if !root.is_dir() {
        return Err(IndexError::RootNotFound(root.to_path_buf()));
    }
    let root = root.canonicalize()?;
    let candidates = discover(&root);
    debug!(count = candidates.len(), root = %root.display(), "probing candidates");

    let probed: Vec<(PathBuf, Dimensions, u64)> = candidates
        .into_par_iter()
        .filter_map(|path| match probe(backend, &path) {
            Ok((dims, size)) => Some((path, dims, size)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable image");
                None
            }
        })
        .collect();

    let records = probed
        .into_iter()
        .map(|(path, dims, size)| PhotoRecord::new(ids.next_id(), path, dims, size))
        .collect();
    let index = PhotoIndex::from_records(records);
    info!(photos = index.len(), root = %root.display(), "photo index built");
    Ok(index)
}

/// All image files under `root`, sorted by path.
fn discover(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_image(path))
        .collect();
    paths.sort();
    paths
}

fn is_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}

fn probe(
    backend: &(impl ImageBackend + ?Sized),
    path: &Path,
) -> Result<(Dimensions, u64), Box<dyn std::error::Error + Send + Sync>> {
    let dims = get_dimensions(backend, path)?;
    let size = std::fs::metadata(path)?.len();
    Ok((dims, size))
}
