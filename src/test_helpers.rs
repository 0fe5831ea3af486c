//! Shared test utilities for the album-server test suite.
//!
//! Writes small synthetic images with the `image` crate into temporary
//! directories, so tests never depend on checked-in binary fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_photo_dir(&[
//!     PhotoSpec::jpeg("landscape.jpg", 800, 600),
//!     PhotoSpec::png("icons/small.png", 40, 40),
//! ]);
//! let index = build(tmp.path(), &RustBackend::new(), &IdGenerator::new()).unwrap();
//! ```

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Single-file writers
// =========================================================================

/// Write a valid JPEG with a gradient so encoders have real content to chew on.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a valid RGBA PNG (half-transparent, to exercise alpha flattening).
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, 64, (y % 256) as u8, 128])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Write a valid single-frame GIF.
pub fn create_test_gif(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        image::Rgba([if x % 2 == 0 { 255 } else { 0 }, 0, 0, 255])
    });
    img.save_with_format(path, image::ImageFormat::Gif).unwrap();
}

// =========================================================================
// Directory fixtures
// =========================================================================

#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Jpeg,
    Png,
    Gif,
}

/// One file to create in a fixture directory.
#[derive(Debug, Clone)]
pub struct PhotoSpec {
    pub rel_path: &'static str,
    pub kind: Kind,
    pub width: u32,
    pub height: u32,
}

impl PhotoSpec {
    pub fn jpeg(rel_path: &'static str, width: u32, height: u32) -> Self {
        Self {
            rel_path,
            kind: Kind::Jpeg,
            width,
            height,
        }
    }

    pub fn png(rel_path: &'static str, width: u32, height: u32) -> Self {
        Self {
            rel_path,
            kind: Kind::Png,
            width,
            height,
        }
    }

    pub fn gif(rel_path: &'static str, width: u32, height: u32) -> Self {
        Self {
            rel_path,
            kind: Kind::Gif,
            width,
            height,
        }
    }
}

/// Create a temp directory populated with the given images.
///
/// Parent directories in `rel_path` are created as needed.
pub fn setup_photo_dir(specs: &[PhotoSpec]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for spec in specs {
        let path = tmp.path().join(spec.rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        match spec.kind {
            Kind::Jpeg => create_test_jpeg(&path, spec.width, spec.height),
            Kind::Png => create_test_png(&path, spec.width, spec.height),
            Kind::Gif => create_test_gif(&path, spec.width, spec.height),
        }
    }
    tmp
}
