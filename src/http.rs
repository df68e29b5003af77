//! HTTP transport for cobol-lens
//!
//! Axum router serving the upload page, the upload endpoint and the results
//! page/JSON pair. Health is plain text.

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::converter::Converter;
use crate::error::{CobolLensError, Result};

const INDEX_HTML: &str = include_str!("../templates/index.html");
const RESULTS_HTML: &str = include_str!("../templates/results.html");

const ALLOWED_EXTENSIONS: [&str; 2] = ["cob", "txt"];

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub converter: Converter,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Upload page
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Accepts a multipart `file` field and returns the new conversion id
pub async fn upload_handler(
    State(state): State<HttpState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Upload rejected: {}", e);
        CobolLensError::validation("No file part")
    })?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(upload_error)?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| CobolLensError::validation("No file part"))?;
    if filename.is_empty() {
        return Err(CobolLensError::validation("No selected file"));
    }
    if !allowed_file(&filename) {
        return Err(CobolLensError::validation("Invalid file type"));
    }
    let source = String::from_utf8(bytes.to_vec())
        .map_err(|_| CobolLensError::validation("File is not valid UTF-8 text"))?;

    tracing::info!("Converting upload '{}' ({} bytes)", filename, source.len());
    let id = state.converter.convert(&source).await?;
    Ok(Json(json!({ "conversion_id": id })))
}

fn upload_error(err: MultipartError) -> CobolLensError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        CobolLensError::PayloadTooLarge {
            message: "File exceeds the upload size limit".to_string(),
        }
    } else {
        CobolLensError::validation(format!("Malformed upload: {}", err.body_text()))
    }
}

/// HTML scaffold that loads `/api/results/{id}` client-side
pub async fn results_page_handler(
    State(state): State<HttpState>,
    Path(conversion_id): Path<String>,
) -> Result<Response> {
    match lookup(&state, &conversion_id).await? {
        Some((id, _)) => Ok(Html(RESULTS_HTML.replace("{{conversion_id}}", &id.to_string()))
            .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Results not found or have expired.",
        )
            .into_response()),
    }
}

/// Raw JSON record for a conversion
pub async fn api_results_handler(
    State(state): State<HttpState>,
    Path(conversion_id): Path<String>,
) -> Result<Response> {
    match lookup(&state, &conversion_id).await? {
        Some((_, result)) => Ok(Json(result).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Results not found or expired" })),
        )
            .into_response()),
    }
}

async fn lookup(
    state: &HttpState,
    conversion_id: &str,
) -> Result<Option<(Uuid, crate::store::ConversionResult)>> {
    // Ids that are not UUIDs were never issued
    let Ok(id) = Uuid::parse_str(conversion_id) else {
        return Ok(None);
    };
    Ok(state
        .converter
        .store()
        .get(&id)
        .await?
        .map(|result| (id, result)))
}

/// `name.ext` with ext in {cob, txt}, case-insensitive
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Build the application router
pub fn router(state: HttpState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .route("/results/:conversion_id", get(results_page_handler))
        .route("/api/results/:conversion_id", get(api_results_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(config: &Config, converter: Converter) -> anyhow::Result<()> {
    let app = router(HttpState { converter }, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down HTTP server");
}
