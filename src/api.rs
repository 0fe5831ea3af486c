//! HTTP surface: an axum [`Router`] over the photo index and the thumbnail
//! resolver.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /` | plain-text liveness banner |
//! | `GET /photos?from&max` | `{photos, pages, currentPage}` |
//! | `GET /photos/{id}` | `{name, size: {width, height, onDisk}, thumb, url}` |
//! | `GET /d/{id}` | original bytes |
//! | `GET /thumbs/{id}?d` | thumbnail bytes |
//!
//! Every parameter is validated before the index is consulted. All failing
//! parameters of one request are reported together in a single 400 body:
//!
//! ```json
//! {"errors": [{"value": "7", "msg": "Invalid value", "param": "max", "location": "query"}]}
//! ```
//!
//! An empty query value (`?max=`) means the default, the same as omitting it.
//! A parameter given more than once is invalid, and so is a path segment that
//! does not decode to UTF-8. Both are reported in the same 400 shape.

use crate::id::PhotoId;
use crate::index::{PhotoIndex, PhotoRecord};
use crate::thumbs::{ThumbnailError, ThumbnailResolver};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, async_trait};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Accepted values of `max` on `/photos`.
pub const PAGE_SIZES: [u32; 3] = [10, 20, 30];
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Accepted values of `d` on `/thumbs/{id}`.
pub const THUMB_SIZES: [u32; 3] = [50, 150, 250];
pub const DEFAULT_THUMB_SIZE: u32 = 50;

/// Shared handler state. Cloned per request; both halves are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<PhotoIndex>,
    pub resolver: Arc<ThumbnailResolver>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/photos", get(list_photos))
        .route("/photos/:id", get(photo_info))
        .route("/d/:id", get(download))
        .route("/thumbs/:id", get(thumbnail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =========================================================================
// Errors
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Query,
    Params,
}

/// One entry of an `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub value: String,
    pub msg: &'static str,
    pub param: &'static str,
    pub location: Location,
}

impl FieldError {
    fn invalid(param: &'static str, location: Location, value: &str) -> Self {
        Self {
            value: value.to_string(),
            msg: "Invalid value",
            param,
            location,
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request parameters")]
    Validation(Vec<FieldError>),
    #[error("photo {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ApiError {
    /// Collect the failures of independently validated parameters.
    fn validation(results: impl IntoIterator<Item = Option<FieldError>>) -> Self {
        Self::Validation(results.into_iter().flatten().collect())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::NotFound(value) => {
                let body = json!({
                    "errors": [{
                        "value": value,
                        "msg": "Not found",
                        "param": "id",
                        "location": Location::Params,
                    }]
                });
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            err @ (ApiError::Thumbnail(_) | ApiError::Read { .. }) => {
                error!(error = %err, "request failed");
                let body = json!({ "errors": [{ "msg": err.to_string() }] });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

// =========================================================================
// Parameter parsing
// =========================================================================

/// Raw query pairs in request order. Repeated keys are kept so that
/// [`QueryParams::single`] can reject them.
#[derive(Debug, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// The value of `name`, if present exactly once.
    fn single(&self, name: &'static str) -> Result<Option<&str>, FieldError> {
        let values: Vec<&str> = self
            .0
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect();
        match values.as_slice() {
            [] => Ok(None),
            [value] => Ok(Some(*value)),
            _ => Err(FieldError::invalid(name, Location::Query, &values.join(","))),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for QueryParams {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<Vec<(String, String)>>::from_request_parts(parts, state).await {
            Ok(Query(pairs)) => Ok(Self(pairs)),
            Err(rejection) => {
                let raw = parts.uri.query().unwrap_or_default();
                debug!(error = %rejection.body_text(), "undecodable query string");
                Err(ApiError::validation([Some(FieldError::invalid(
                    "query",
                    Location::Query,
                    raw,
                ))]))
            }
        }
    }
}

/// The `:id` path segment, parsed. A segment that axum cannot decode is
/// reported with its raw, still percent-encoded text.
pub struct IdSegment(Result<PhotoId, FieldError>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IdSegment {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let parsed = match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(raw)) => parse_id(&raw),
            Err(rejection) => {
                debug!(error = %rejection.body_text(), "undecodable id segment");
                let raw = parts.uri.path().rsplit('/').next().unwrap_or_default();
                Err(FieldError::invalid("id", Location::Params, raw))
            }
        };
        Ok(Self(parsed))
    }
}

fn parse_id(raw: &str) -> Result<PhotoId, FieldError> {
    raw.parse()
        .map_err(|_| FieldError::invalid("id", Location::Params, raw))
}

/// Non-negative integer offset. Missing or empty means 0.
fn parse_offset(raw: Option<&str>) -> Result<usize, FieldError> {
    match raw {
        None | Some("") => Ok(0),
        Some(s) if s.bytes().all(|b| b.is_ascii_digit()) => s
            .parse()
            .map_err(|_| FieldError::invalid("from", Location::Query, s)),
        Some(s) => Err(FieldError::invalid("from", Location::Query, s)),
    }
}

/// One of `allowed`, spelled exactly. Missing or empty means `default`.
fn parse_choice(
    param: &'static str,
    raw: Option<&str>,
    allowed: &[u32],
    default: u32,
) -> Result<u32, FieldError> {
    match raw {
        None | Some("") => Ok(default),
        Some(s) => allowed
            .iter()
            .copied()
            .find(|n| n.to_string() == s)
            .ok_or_else(|| FieldError::invalid(param, Location::Query, s)),
    }
}

fn find<'a>(index: &'a PhotoIndex, id: &PhotoId) -> Result<&'a PhotoRecord, ApiError> {
    index
        .lookup(id.as_str())
        .ok_or_else(|| ApiError::NotFound(id.to_string()))
}

async fn file_response(path: &FsPath) -> Result<Response, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.essence_str().to_string())], bytes).into_response())
}

// =========================================================================
// Handlers
// =========================================================================

async fn banner() -> &'static str {
    "hello world"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoList {
    pub photos: Vec<PhotoId>,
    pub pages: usize,
    pub current_page: usize,
}

async fn list_photos(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<PhotoList>, ApiError> {
    let offset = query.single("from").and_then(parse_offset);
    let limit = query
        .single("max")
        .and_then(|raw| parse_choice("max", raw, &PAGE_SIZES, DEFAULT_PAGE_SIZE));
    let (offset, limit) = match (offset, limit) {
        (Ok(offset), Ok(limit)) => (offset, limit as usize),
        (offset, limit) => return Err(ApiError::validation([offset.err(), limit.err()])),
    };

    let page = state.index.list(offset, limit);
    Ok(Json(PhotoList {
        photos: page.ids.to_vec(),
        pages: page.pages,
        current_page: page.current_page,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeInfo {
    pub width: u32,
    pub height: u32,
    pub on_disk: String,
}

#[derive(Debug, Serialize)]
pub struct PhotoInfo {
    pub name: String,
    pub size: SizeInfo,
    pub thumb: String,
    pub url: String,
}

impl From<&PhotoRecord> for PhotoInfo {
    fn from(record: &PhotoRecord) -> Self {
        Self {
            name: record.name.clone(),
            size: SizeInfo {
                width: record.dimensions.width,
                height: record.dimensions.height,
                on_disk: record.size_display(),
            },
            thumb: record.thumb_url(),
            url: record.url(),
        }
    }
}

async fn photo_info(
    State(state): State<AppState>,
    IdSegment(id): IdSegment,
) -> Result<Json<PhotoInfo>, ApiError> {
    let id = id.map_err(|e| ApiError::validation([Some(e)]))?;
    let record = find(&state.index, &id)?;
    Ok(Json(PhotoInfo::from(record)))
}

async fn download(
    State(state): State<AppState>,
    IdSegment(id): IdSegment,
) -> Result<Response, ApiError> {
    let id = id.map_err(|e| ApiError::validation([Some(e)]))?;
    let record = find(&state.index, &id)?;
    file_response(&record.source_path).await
}

async fn thumbnail(
    State(state): State<AppState>,
    IdSegment(id): IdSegment,
    query: QueryParams,
) -> Result<Response, ApiError> {
    let target = query
        .single("d")
        .and_then(|raw| parse_choice("d", raw, &THUMB_SIZES, DEFAULT_THUMB_SIZE));
    let (id, target) = match (id, target) {
        (Ok(id), Ok(target)) => (id, target),
        (id, target) => return Err(ApiError::validation([id.err(), target.err()])),
    };

    let record = find(&state.index, &id)?;
    let path = state.resolver.resolve(record, target).await?;
    debug!(%id, target, path = %path.display(), "serving thumbnail");
    file_response(&path).await
}
