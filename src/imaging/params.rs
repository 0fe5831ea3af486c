//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides how large a thumbnail should be) and the
//! [`backend`](super::backend) (which does the actual pixel work). Swapping
//! backends, or substituting a mock in tests, never touches operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`Side`]: one output side: a concrete pixel count or [`Side::Auto`].
//! - [`ScaleParams`]: everything a scale-to-fit needs: source, output, both sides, quality.

use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// One side of a scale request.
///
/// `Auto` means "derive this side proportionally from the other one".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Px(u32),
    Auto,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Px(n) => write!(f, "{n}"),
            Side::Auto => f.write_str("auto"),
        }
    }
}

/// Parameters for a single proportional downscale to JPEG.
///
/// Exactly one of `width`/`height` is expected to be [`Side::Px`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: Side,
    pub height: Side,
    pub quality: Quality,
}
