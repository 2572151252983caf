//! JSON HTTP API.
//!
//! A thin axum layer over [`Gallery`]. Handlers move every store and
//! filesystem call onto tokio's blocking pool; nothing here touches the disk
//! directly except streaming file bytes back.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | GET | `/api/folders?parent=` | list folders |
//! | GET | `/api/images?folder=&page=&per_page=&width=` | folder view |
//! | GET, DELETE | `/api/media/{folder…}/{file}` | file bytes / delete |
//! | GET | `/api/thumbnails/{path…}` | thumbnail bytes |
//! | GET | `/api/favorites?width=` | favorites view |
//! | POST, DELETE | `/api/favorites/{folder…}/{file}` | add / remove favorite |
//! | GET, POST | `/api/tags` | list / create tag |
//! | DELETE | `/api/tags/{id}` | delete tag |
//! | GET | `/api/tags/{id}/images?width=` | tag view |
//! | GET | `/api/image-tags/{folder…}/{file}` | tags of one file |
//! | POST, DELETE | `/api/image-tags/{id}/{folder…}/{file}` | assign / unassign |
//!
//! Errors are always `{"success": false, "message": "..."}` with status 400
//! (bad input), 403 (path escapes the dataset), 404 or 500.

use crate::folders::FolderError;
use crate::gallery::{Gallery, GalleryError, SharedGallery};
use crate::paths::{self, PathError};
use crate::scan::ScanError;
use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io;
use tracing::{error, info};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

/// HTTP status for a gallery failure.
pub fn status_for(err: &GalleryError) -> StatusCode {
    if err.is_escape() {
        return StatusCode::FORBIDDEN;
    }
    match err {
        GalleryError::Path(_)
        | GalleryError::Folders(FolderError::Path(_))
        | GalleryError::Scan(ScanError::Path(_))
        | GalleryError::Unsupported(_)
        | GalleryError::AlreadyFavorite(_)
        | GalleryError::TagNameRequired
        | GalleryError::InvalidColor(_)
        | GalleryError::TagExists(_) => StatusCode::BAD_REQUEST,
        GalleryError::FolderNotFound(_)
        | GalleryError::MediaNotFound(_)
        | GalleryError::NotFavorite(_)
        | GalleryError::TagNotFound(_)
        | GalleryError::TagNotAssigned { .. }
        | GalleryError::Scan(ScanError::FolderNotFound(_)) => StatusCode::NOT_FOUND,
        GalleryError::Store(_)
        | GalleryError::Folders(FolderError::Io(_))
        | GalleryError::Io(_)
        | GalleryError::Queue(_)
        | GalleryError::Scan(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<GalleryError> for ApiError {
    fn from(err: GalleryError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<PathError> for ApiError {
    fn from(err: PathError) -> Self {
        GalleryError::from(err).into()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "message": self.message }));
        (self.status, body).into_response()
    }
}

/// `{"success": true, ...data}`.
#[derive(Serialize)]
struct Success<T> {
    success: bool,
    #[serde(flatten)]
    data: T,
}

fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}

type ApiResult<T> = Result<T, ApiError>;

/// Run gallery work on the blocking pool.
async fn blocking<T, F>(gallery: SharedGallery, f: F) -> ApiResult<T>
where
    F: FnOnce(&Gallery) -> Result<T, GalleryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&gallery))
        .await
        .map_err(|e| ApiError::internal(format!("worker failed: {e}")))?
        .map_err(ApiError::from)
}

pub fn router(gallery: SharedGallery) -> Router {
    Router::new()
        .route("/api/folders", get(list_folders))
        .route("/api/images", get(folder_images))
        .route("/api/media/*path", get(media_bytes).delete(delete_media))
        .route("/api/thumbnails/*path", get(thumbnail_bytes))
        .route("/api/favorites", get(favorites))
        .route(
            "/api/favorites/*path",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/api/tags", get(list_tags).post(create_tag))
        .route("/api/tags/:id", delete(delete_tag))
        .route("/api/tags/:id/images", get(tag_images))
        // One route: a catch-all and an `:id` prefix can't share a segment.
        .route(
            "/api/image-tags/*path",
            get(image_tags).post(assign_tag).delete(unassign_tag),
        )
        .with_state(gallery)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(gallery: SharedGallery, addr: &str) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(gallery))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}

// ============================================================================
// Folders
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct FoldersQuery {
    #[serde(default)]
    parent: String,
}

async fn list_folders(
    State(gallery): State<SharedGallery>,
    query: Result<Query<FoldersQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let folders = blocking(gallery, move |g| g.list_folders(&query.parent)).await?;
    Ok(success(json!({ "folders": folders })))
}

#[derive(Debug, Default, Deserialize)]
struct ImagesQuery {
    #[serde(default)]
    folder: String,
    page: Option<u32>,
    per_page: Option<u32>,
    width: Option<u32>,
}

async fn folder_images(
    State(gallery): State<SharedGallery>,
    query: Result<Query<ImagesQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(q) = query?;
    let page = blocking(gallery, move |g| {
        g.folder_view(&q.folder, q.page.unwrap_or(1), q.per_page, q.width)
    })
    .await?;
    Ok(success(page))
}

// ============================================================================
// Files
// ============================================================================

fn content_type(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

async fn file_response(path: std::path::PathBuf) -> ApiResult<Response> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::from(GalleryError::Io(e)))?;
    Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response())
}

async fn media_bytes(
    State(gallery): State<SharedGallery>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    let (folder, filename) = paths::split_media_path(&path)?;
    let (file, _) = blocking(gallery, move |g| g.media_file(&folder, &filename)).await?;
    file_response(file).await
}

async fn delete_media(
    State(gallery): State<SharedGallery>,
    Path(path): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (folder, filename) = paths::split_media_path(&path)?;
    blocking(gallery, move |g| g.delete_media(&folder, &filename)).await?;
    Ok(success(json!({ "message": format!("Deleted {path}") })))
}

async fn thumbnail_bytes(
    State(gallery): State<SharedGallery>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    let file = blocking(gallery, move |g| g.thumbnail_file(&path)).await?;
    file_response(file).await
}

// ============================================================================
// Favorites
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct WidthQuery {
    width: Option<u32>,
}

async fn favorites(
    State(gallery): State<SharedGallery>,
    query: Result<Query<WidthQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(q) = query?;
    let images = blocking(gallery, move |g| g.favorites_view(q.width)).await?;
    Ok(success(json!({ "total": images.len(), "images": images })))
}

async fn add_favorite(
    State(gallery): State<SharedGallery>,
    Path(path): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (folder, filename) = paths::split_media_path(&path)?;
    blocking(gallery, move |g| g.add_favorite(&folder, &filename)).await?;
    Ok((
        StatusCode::CREATED,
        success(json!({ "message": "Added to favorites" })),
    ))
}

async fn remove_favorite(
    State(gallery): State<SharedGallery>,
    Path(path): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (folder, filename) = paths::split_media_path(&path)?;
    blocking(gallery, move |g| g.remove_favorite(&folder, &filename)).await?;
    Ok(success(json!({ "message": "Removed from favorites" })))
}

// ============================================================================
// Tags
// ============================================================================

async fn list_tags(State(gallery): State<SharedGallery>) -> ApiResult<impl IntoResponse> {
    let tags = blocking(gallery, |g| g.list_tags()).await?;
    Ok(success(json!({ "tags": tags })))
}

#[derive(Debug, Deserialize)]
struct NewTag {
    #[serde(default)]
    name: String,
    color: Option<String>,
}

async fn create_tag(
    State(gallery): State<SharedGallery>,
    body: Result<Json<NewTag>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    let tag = blocking(gallery, move |g| {
        g.create_tag(&body.name, body.color.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, success(json!({ "tag": tag }))))
}

async fn delete_tag(
    State(gallery): State<SharedGallery>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_tag_id(&id)?;
    blocking(gallery, move |g| g.delete_tag(id)).await?;
    Ok(success(json!({ "message": "Tag deleted" })))
}

async fn tag_images(
    State(gallery): State<SharedGallery>,
    Path(id): Path<String>,
    query: Result<Query<WidthQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_tag_id(&id)?;
    let Query(q) = query?;
    let view = blocking(gallery, move |g| g.tag_view(id, q.width)).await?;
    Ok(success(view))
}

fn parse_tag_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid tag id: {raw}")))
}

/// `{id}/{folder…}/{file}` → (id, folder, file).
fn split_tagged_path(path: &str) -> ApiResult<(i64, String, String)> {
    let (id, rest) = path
        .split_once('/')
        .ok_or_else(|| ApiError::bad_request(format!("Expected tag id and file: {path}")))?;
    let (folder, filename) = paths::split_media_path(rest)?;
    Ok((parse_tag_id(id)?, folder, filename))
}

async fn image_tags(
    State(gallery): State<SharedGallery>,
    Path(path): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (folder, filename) = paths::split_media_path(&path)?;
    let tags = blocking(gallery, move |g| g.image_tags(&folder, &filename)).await?;
    Ok(success(json!({ "tags": tags })))
}

async fn assign_tag(
    State(gallery): State<SharedGallery>,
    Path(path): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (id, folder, filename) = split_tagged_path(&path)?;
    let tag = blocking(gallery, move |g| g.assign_tag(&folder, &filename, id)).await?;
    Ok(success(json!({ "tag": tag })))
}

async fn unassign_tag(
    State(gallery): State<SharedGallery>,
    Path(path): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (id, folder, filename) = split_tagged_path(&path)?;
    blocking(gallery, move |g| g.unassign_tag(&folder, &filename, id)).await?;
    Ok(success(json!({ "message": "Tag removed" })))
}
