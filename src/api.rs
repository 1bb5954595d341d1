//! HTTP interface
//!
//! Thin axum layer over [`StreamSupervisor`]. Every JSON response carries
//! `Cache-Control: no-store` since stream state changes from one request to
//! the next.

use std::future::Future;
use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;

use crate::camera::CameraId;
use crate::supervisor::{is_stream_file, MaintenanceReport, StopReason, StreamError, StreamSupervisor};

const NO_STORE: &str = "no-store, max-age=0";

/// Create the router with all endpoints
pub fn router(supervisor: Arc<StreamSupervisor>) -> Router {
    Router::new()
        .route("/api/cameras", get(list_cameras_handler))
        .route("/api/cameras/count", get(count_cameras_handler))
        .route("/api/cameras/optimize", post(optimize_handler))
        .route(
            "/api/streams/{id}",
            get(ensure_stream_handler).delete(stop_stream_handler),
        )
        .route("/streams/{file}", get(stream_file_handler))
        .with_state(supervisor)
}

/// Serve the router until `signal` resolves, then shut the supervisor down
///
/// The supervisor is shut down whether or not serving failed, so transcoders
/// always get a graceful stop.
pub async fn serve<F>(
    listener: TcpListener,
    supervisor: Arc<StreamSupervisor>,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = axum::serve(listener, router(Arc::clone(&supervisor)))
        .with_graceful_shutdown(signal)
        .await;

    supervisor.shutdown().await;

    served
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamResponse {
    url: String,
    /// `started` for the request that launched the transcoder, else `active`
    status: &'static str,
    camera_id: CameraId,
    rtsp_url: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct OptimizeResponse {
    success: bool,
    optimizations: MaintenanceReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CameraInfo {
    id: CameraId,
    name: String,
    host: String,
    port: u16,
    #[serde(rename = "type")]
    kind: &'static str,
    stream_path: String,
    rtsp_template: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LimitsInfo {
    max_concurrent_streams: usize,
    auto_stop_ms: u64,
}

#[derive(Debug, Serialize)]
struct CamerasResponse {
    total: usize,
    cameras: Vec<CameraInfo>,
    limits: LimitsInfo,
}

#[derive(Debug, Serialize)]
struct CountResponse {
    count: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn json_no_store<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, [(header::CACHE_CONTROL, NO_STORE)], Json(body)).into_response()
}

/// Start (or join) the stream for a camera and return its playlist URL
async fn ensure_stream_handler(
    Path(id): Path<String>,
    State(supervisor): State<Arc<StreamSupervisor>>,
) -> Result<Response, ApiError> {
    let camera_id = parse_camera_id(&id)?;
    let outcome = supervisor.ensure_stream(camera_id).await?;

    Ok(json_no_store(
        StatusCode::OK,
        StreamResponse {
            url: outcome.playlist_url,
            status: if outcome.already_running {
                "active"
            } else {
                "started"
            },
            camera_id,
            rtsp_url: outcome.sanitized_source_url,
        },
    ))
}

async fn stop_stream_handler(
    Path(id): Path<String>,
    State(supervisor): State<Arc<StreamSupervisor>>,
) -> Result<Response, ApiError> {
    let camera_id = parse_camera_id(&id)?;

    if !supervisor.stop_stream(camera_id, StopReason::Manual).await {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "stream not found"));
    }

    Ok(json_no_store(
        StatusCode::OK,
        MessageResponse {
            message: format!("stream for camera {} stopped", camera_id),
        },
    ))
}

async fn optimize_handler(State(supervisor): State<Arc<StreamSupervisor>>) -> Response {
    let report = supervisor.optimize().await;

    json_no_store(
        StatusCode::OK,
        OptimizeResponse {
            success: true,
            optimizations: report,
        },
    )
}

/// List configured cameras with masked source URLs
async fn list_cameras_handler(State(supervisor): State<Arc<StreamSupervisor>>) -> Response {
    let registry = supervisor.registry();
    let credentials = registry.credentials();
    let limits = registry.limits();

    let cameras: Vec<CameraInfo> = registry
        .cameras()
        .into_iter()
        .map(|camera| CameraInfo {
            rtsp_template: camera.sanitized_source_url(&credentials),
            id: camera.id,
            name: camera.name,
            host: camera.host,
            port: camera.port,
            kind: camera.kind.as_str(),
            stream_path: camera.stream_path,
        })
        .collect();

    json_no_store(
        StatusCode::OK,
        CamerasResponse {
            total: cameras.len(),
            cameras,
            limits: LimitsInfo {
                max_concurrent_streams: limits.max_concurrent_streams,
                auto_stop_ms: limits.auto_stop.as_millis() as u64,
            },
        },
    )
}

async fn count_cameras_handler(State(supervisor): State<Arc<StreamSupervisor>>) -> Response {
    json_no_store(
        StatusCode::OK,
        CountResponse {
            count: supervisor.registry().cameras().len(),
        },
    )
}

/// Serve a playlist or segment from the streams directory
async fn stream_file_handler(
    Path(file): Path<String>,
    State(supervisor): State<Arc<StreamSupervisor>>,
) -> Result<Response, ApiError> {
    if !is_stream_file(&file) || file.contains(['/', '\\']) || file.contains("..") {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "file not found"));
    }

    let path = supervisor.config().streams_dir.join(&file);
    let handle = match tokio::fs::File::open(&path).await {
        Ok(handle) => handle,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ApiError::new(StatusCode::NOT_FOUND, "file not found"));
        }
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "Failed to open stream file");
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            ));
        }
    };

    let body = Body::from_stream(ReaderStream::new(handle));

    if file.ends_with(".m3u8") {
        // Playlists are rewritten every segment
        Ok((
            [
                (header::CONTENT_TYPE, "application/vnd.apple.mpegurl"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response())
    } else {
        Ok(([(header::CONTENT_TYPE, "video/mp2t")], body).into_response())
    }
}

fn parse_camera_id(value: &str) -> Result<CameraId, ApiError> {
    match value.trim().parse::<CameraId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::new(StatusCode::BAD_REQUEST, "invalid camera id")),
    }
}

/// Error response rendered as `{"error": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<StreamError> for ApiError {
    fn from(e: StreamError) -> Self {
        // 499 is not a registered code but is within the valid range
        let status = StatusCode::from_u16(e.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %e, "Stream request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %e, "Stream request rejected");
        }

        let message = match e {
            StreamError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        ApiError::new(status, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_no_store(
            self.status,
            ErrorBody {
                error: self.message,
            },
        )
    }
}
