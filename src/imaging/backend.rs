//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify (header probe for dimensions) and scale (one
//! proportional downscale written as JPEG).
//!
//! Two implementations ship:
//!
//! | Backend | Scale implementation |
//! |---|---|
//! | [`RustBackend`](super::rust_backend::RustBackend) | `image` crate decode, Lanczos3 resize, JPEG encode, in-process |
//! | [`ImageMagickBackend`](super::magick_backend::ImageMagickBackend) | `convert -thumbnail` subprocess with a kill-on-timeout |
//!
//! The thumbnail resolver only ever sees `dyn ImageBackend`; which one runs
//! is decided by configuration at startup.

use super::params::ScaleParams;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Implementations must be shareable across the scan thread pool and the
/// async runtime's blocking pool, hence `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Downscale `params.source` and write a JPEG to exactly `params.output`.
    ///
    /// The output file either appears complete or not at all.
    fn scale(&self, params: &ScaleParams) -> Result<(), BackendError>;
}
