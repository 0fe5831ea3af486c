//! Image processing: dimension probing and scale-to-fit thumbnails.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Scale → JPEG** | Lanczos3 + `JpegEncoder`, or ImageMagick `convert -thumbnail` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`] + [`ImageMagickBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
pub mod calculations;
pub mod magick_backend;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use magick_backend::ImageMagickBackend;
pub use operations::{create_thumbnail, get_dimensions, plan_scale};
pub use params::{Quality, ScaleParams, Side};
pub use rust_backend::{RustBackend, supported_input_extensions};
