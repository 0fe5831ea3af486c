//! Startup and serving.
//!
//! [`prepare`] does all the blocking work (thumbnail directory check, the
//! full index scan) and only then does [`serve`] bind the listener, so no
//! request ever sees a partially built index.

use crate::api::{self, AppState};
use crate::config::{BackendKind, ServerConfig, ServerSection, ThumbnailsConfig};
use crate::id::IdGenerator;
use crate::imaging::{ImageBackend, ImageMagickBackend, Quality, RustBackend};
use crate::index::{self, IndexError, PhotoIndex};
use crate::thumbs::{ResolverSettings, ThumbnailError, ThumbnailResolver, prepare_output_dir};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Thumbnails(#[from] ThumbnailError),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

/// The backend named by `config.backend`.
pub fn select_backend(config: &ThumbnailsConfig) -> Arc<dyn ImageBackend> {
    match config.backend {
        BackendKind::Rust => Arc::new(RustBackend::new()),
        BackendKind::ImageMagick => Arc::new(ImageMagickBackend::new(
            config.convert_binary.clone(),
            config.timeout(),
        )),
    }
}

/// Scan the photo root into an index using `config`'s backend.
pub fn scan(config: &ServerConfig, ids: &IdGenerator) -> Result<PhotoIndex, StartupError> {
    let backend = select_backend(&config.thumbnails);
    Ok(index::build(&config.paths.photos, backend.as_ref(), ids)?)
}

/// Verify the thumbnail directory, build the index, and assemble handler state.
pub fn prepare(config: &ServerConfig) -> Result<AppState, StartupError> {
    let thumbs = config.thumbnail_dir();
    prepare_output_dir(&thumbs)?;
    info!(dir = %thumbs.display(), "thumbnail directory ready");

    let backend = select_backend(&config.thumbnails);
    let ids = Arc::new(IdGenerator::new());
    let index = index::build(&config.paths.photos, backend.as_ref(), &ids)?;

    let resolver = ThumbnailResolver::new(
        backend,
        thumbs,
        ids,
        ResolverSettings {
            quality: Quality::new(config.thumbnails.quality),
            timeout: config.thumbnails.timeout(),
        },
    );

    Ok(AppState {
        index: Arc::new(index),
        resolver: Arc::new(resolver),
    })
}

/// Bind `host:port` and serve until Ctrl-C.
pub async fn serve(listen: &ServerSection, state: AppState) -> Result<(), StartupError> {
    let addr = format!("{}:{}", listen.host, listen.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(
        "Listening on http://{} ({} photos)",
        addr,
        state.index.len()
    );

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
