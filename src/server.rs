use crate::config::Config;
use crate::library::{self, LibraryError, PlaylistEntry, TreeNode};
use crate::stream::open_stream;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Router state; immutable for the life of the server
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    pub success: bool,
    pub count: usize,
    pub playlist: Vec<PlaylistEntry>,
    /// Directories that could not be read and were left out
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub success: bool,
    pub filename: String,
    pub metadata: library::AudioMetadata,
}

#[derive(Debug, Serialize)]
pub struct TreeResponse {
    pub success: bool,
    pub tree: TreeNode,
}

/// Error body for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    pub depth: Option<usize>,
}

/// Create the music API router
pub fn create_router(config: Config) -> Router {
    let public_dir = config.public_dir.clone();
    let state = AppState {
        config: Arc::new(config),
    };

    let mut router = Router::new()
        .route("/api/ping", get(ping))
        .route("/api/music/playlist", get(get_playlist))
        .route("/api/music/stream/*filename", get(stream_file))
        .route("/api/music/metadata/*filename", get(get_file_metadata))
        .route("/api/music/tree", get(get_tree));

    if let Some(dir) = public_dir {
        info!("Serving player assets from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness check
async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Scan the media root and return every playable file
async fn get_playlist(State(state): State<AppState>) -> Result<Json<PlaylistResponse>, LibraryError> {
    let config = state.config.clone();
    let report = run_blocking(move || library::scan(&config.music_path, &config.allowed_extensions))
        .await?;

    let playlist = library::build_playlist(&state.config.music_path, &report);
    info!("Found {} music files", playlist.len());

    Ok(Json(PlaylistResponse {
        success: true,
        count: playlist.len(),
        playlist,
        skipped: report.skipped.len(),
    }))
}

/// Stream a file, honoring a single-range `Range` header
async fn stream_file(
    Path(filename): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, LibraryError> {
    // A non-ASCII header value is still a range request; the parser rejects it.
    let range = headers
        .get(header::RANGE)
        .map(|value| value.to_str().unwrap_or_default());

    let stream = open_stream(&state.config, &filename, range).await?;

    let status = if stream.is_partial() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, stream.content_type)
        .header(header::CONTENT_LENGTH, stream.content_length())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, state.config.cache_control());
    if let Some(content_range) = stream.content_range() {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    builder
        .body(Body::from_stream(stream.into_body_stream()))
        .map_err(|e| LibraryError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
}

/// Filesystem metadata for one file
async fn get_file_metadata(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MetadataResponse>, LibraryError> {
    let config = state.config.clone();
    let name = filename.clone();
    let metadata = run_blocking(move || {
        library::get_metadata(&config.music_path, &config.allowed_extensions, &name)
    })
    .await?;

    Ok(Json(MetadataResponse {
        success: true,
        filename,
        metadata,
    }))
}

/// Nested folder view of the media root
async fn get_tree(
    Query(query): Query<TreeQuery>,
    State(state): State<AppState>,
) -> Result<Json<TreeResponse>, LibraryError> {
    let config = state.config.clone();
    let depth = query.depth.unwrap_or(library::tree::DEFAULT_TREE_DEPTH);
    let tree = run_blocking(move || {
        library::directory_tree(&config.music_path, &config.allowed_extensions, depth)
    })
    .await?;

    Ok(Json(TreeResponse {
        success: true,
        tree,
    }))
}

/// Run blocking filesystem work off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, LibraryError>
where
    F: FnOnce() -> Result<T, LibraryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| LibraryError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

impl IntoResponse for LibraryError {
    fn into_response(self) -> Response {
        let status = match &self {
            LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
            LibraryError::InvalidPath | LibraryError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            LibraryError::MalformedRange { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            LibraryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if self.is_client_error() {
            warn!("Rejected request: {}", self);
            self.to_string()
        } else {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                success: false,
                error: message,
            }),
        )
            .into_response();

        if let LibraryError::MalformedRange { file_size, .. } = self {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", file_size)) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }

        response
    }
}
