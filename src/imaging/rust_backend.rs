//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF) | `image` crate decoders |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Atomic write | `tempfile::NamedTempFile` in the output directory, then `persist` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::resolve_sides;
use super::params::ScaleParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions the index picks up, paired with the decoder that handles them.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the lowercase image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Read width and height from the file header.
///
/// Shared by both backends: probing is cheap enough that shelling out for it
/// would only add process-spawn overhead to the startup scan.
pub(crate) fn probe_dimensions(path: &Path) -> Result<Dimensions, BackendError> {
    let (width, height) = image::image_dimensions(path).map_err(|e| {
        BackendError::ProcessingFailed(format!(
            "Failed to read dimensions of {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(Dimensions { width, height })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from content.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode as baseline JPEG and move into place at `path`.
///
/// JPEG has no alpha channel, so the image is flattened to RGB8 first.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality as u8);
        DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        probe_dimensions(path)
    }

    fn scale(&self, params: &ScaleParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let source = Dimensions {
            width: img.width(),
            height: img.height(),
        };
        let (width, height) = resolve_sides(source, params.width, params.height).ok_or_else(|| {
            BackendError::ProcessingFailed(format!(
                "Cannot scale {}x{} to {}x{}",
                source.width, source.height, params.width, params.height
            ))
        })?;
        let resized = img.resize_exact(width, height, FilterType::Lanczos3);
        save_jpeg(&resized, &params.output, params.quality.value())
    }
}
