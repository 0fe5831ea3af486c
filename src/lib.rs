//! # album-server
//!
//! A minimal photo-gallery HTTP backend. Point it at a directory tree of
//! images; it scans the tree once at startup, gives every photo an opaque
//! id, and serves paginated listings, metadata, originals, and thumbnails
//! generated on first request.
//!
//! # Request Flow
//!
//! ```text
//! startup   config → thumbnail dir check → index::build (rayon) → bind
//! /thumbs   api → thumbs::ThumbnailResolver → memoized path
//!                                            | original (fits)
//!                                            | imaging backend → {id}.jpg
//! ```
//!
//! The index is never re-scanned. Its only mutable state is the set-once
//! thumbnail slot on each [`index::PhotoRecord`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`id`] | 40-char lowercase hex photo and thumbnail ids |
//! | [`index`] | Startup scan, per-photo records, pagination |
//! | [`thumbs`] | Thumbnail resolution, memoization, single-flight generation |
//! | [`imaging`] | Dimension probing and scale-to-fit, behind the `ImageBackend` trait |
//! | [`api`] | axum router, parameter validation, JSON error bodies |
//! | [`server`] | Startup assembly and the graceful-shutdown listener |
//! | [`config`] | `album-server.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting for the `scan` command |
//!
//! # Design Decisions
//!
//! ## First Thumbnail Wins
//!
//! A photo's thumbnail is fixed by the first successful `/thumbs` request;
//! the `d` of later requests is ignored. Concurrent first requests share
//! one generation instead of racing.
//!
//! ## Two Resize Backends
//!
//! The default backend decodes and resizes in-process with the `image`
//! crate, so the binary has no runtime dependencies. Setting
//! `backend = "imagemagick"` shells out to `convert -thumbnail` instead,
//! with the child killed if it exceeds the configured timeout.

pub mod api;
pub mod config;
pub mod id;
pub mod imaging;
pub mod index;
pub mod output;
pub mod server;
pub mod thumbs;

#[cfg(test)]
pub(crate) mod test_helpers;
