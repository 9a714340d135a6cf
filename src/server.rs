use crate::config::ServerConfig;
use crate::error::AppError;
use crate::preprocessing::{Pipeline, PipelineConfig};
use crate::recognizer::RecognizerHandle;
use crate::recognizers;
use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use image::DynamicImage;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tower_http::trace::TraceLayer;

/// Extensions accepted for uploads
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recognizer: Arc<RecognizerHandle>,
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, recognizer: Arc<RecognizerHandle>) -> Self {
        Self {
            recognizer,
            pipeline: Arc::new(Pipeline::new(config.pipeline.clone())),
            config: Arc::new(config),
        }
    }
}

/// Successful conversion
#[derive(Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub latex: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub engine_loaded: bool,
    pub available_engines: Vec<&'static str>,
    pub allowed_extensions: Vec<&'static str>,
    pub max_file_size_bytes: usize,
    pub pipeline: PipelineConfig,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/", get(handle_index))
        .route("/process", post(handle_process))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.upload_dir).with_context(|| {
        format!(
            "Failed to create upload directory {}",
            config.upload_dir.display()
        )
    })?;

    let addr = format!("{}:{}", config.host, config.port);
    let recognizer = Arc::new(RecognizerHandle::new(config.recognizer.clone()));

    // Load the model in the background so the first request doesn't pay for it
    let warm = recognizer.clone();
    tokio::spawn(async move {
        if let Err(e) = warm.get().await {
            tracing::warn!("Recognizer not ready, will retry on first request: {}", e);
        }
    });

    let app = router(AppState::new(config, recognizer));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Handle conversion requests
async fn handle_process(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, AppError> {
    let start = Instant::now();
    let max_file_size = state.config.max_file_size;

    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_file_size))?;
        upload = Some((filename, data));
    }

    let (filename, data) = upload.ok_or(AppError::MissingFile)?;
    if filename.is_empty() {
        return Err(AppError::EmptyFilename);
    }
    let extension = allowed_extension(&filename).ok_or_else(|| {
        AppError::UnsupportedFormat(ALLOWED_EXTENSIONS.map(str::to_uppercase).join(", "))
    })?;
    if data.len() > max_file_size {
        return Err(AppError::ImageTooLarge { max: max_file_size });
    }

    let upload_dir = &state.config.upload_dir;
    let input = temp_file_in(upload_dir, "input_", &format!(".{}", extension))?;
    let output = temp_file_in(upload_dir, "preprocessed_", ".png")?;

    let result = convert(&state, &data, &input, &output).await;

    remove_temp(input);
    remove_temp(output);

    let latex = result?;

    tracing::info!(
        "Converted {} ({} bytes) in {}ms",
        filename,
        data.len(),
        start.elapsed().as_millis()
    );

    Ok(Json(ProcessResponse {
        success: true,
        latex,
    }))
}

/// Save the upload, normalize it to `output` and recognize the result.
async fn convert(
    state: &AppState,
    data: &[u8],
    input: &NamedTempFile,
    output: &NamedTempFile,
) -> Result<String, AppError> {
    input
        .as_file()
        .write_all(data)
        .map_err(|e| AppError::Internal(format!("Failed to write upload: {}", e)))?;

    let pipeline = state.pipeline.clone();
    let input_path = input.path().to_path_buf();
    let output_path = output.path().to_path_buf();
    let processed =
        tokio::task::spawn_blocking(move || pipeline.process_file(&input_path, &output_path))
            .await
            .map_err(|e| AppError::Internal(format!("Preprocessing task failed: {}", e)))??;

    tracing::debug!(
        "Preprocessed in {}ms (skew: {:?}, corrected: {})",
        processed.total_time_ms,
        processed.skew.map(|s| s.degrees()),
        processed.skew_corrected
    );

    let latex = state
        .recognizer
        .recognize(DynamicImage::ImageLuma8(processed.image))
        .await?;

    Ok(latex)
}

/// Lowercased extension of `filename` if it is on the allow-list.
fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn multipart_error(e: MultipartError, max_file_size: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::ImageTooLarge { max: max_file_size }
    } else {
        AppError::InvalidRequest(format!("Failed to parse multipart: {}", e))
    }
}

fn temp_file_in(dir: &Path, prefix: &str, suffix: &str) -> Result<NamedTempFile, AppError> {
    tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))
}

/// Best-effort removal; failures are logged and otherwise ignored.
fn remove_temp(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.recognizer.engine().to_string(),
        engine_loaded: state.recognizer.is_loaded(),
        available_engines: recognizers::available(),
        allowed_extensions: ALLOWED_EXTENSIONS.to_vec(),
        max_file_size_bytes: state.config.max_file_size,
        pipeline: state.pipeline.config().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecognizerConfig;
    use crate::recognizer::testing::FakeRecognizer;
    use axum::body::Body;
    use axum::http::{header, Request};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "whiteboardtestboundary";

    struct TestApp {
        app: Router,
        upload_dir: tempfile::TempDir,
    }

    fn test_app_with(fail: bool, max_file_size: usize) -> TestApp {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            upload_dir: upload_dir.path().to_path_buf(),
            max_file_size,
            recognizer: RecognizerConfig::default(),
            pipeline: PipelineConfig::default(),
        };
        let recognizer = Arc::new(RecognizerHandle::with_recognizer(Arc::new(
            FakeRecognizer { fail },
        )));

        TestApp {
            app: router(AppState::new(config, recognizer)),
            upload_dir,
        }
    }

    fn test_app() -> TestApp {
        test_app_with(false, 16 * 1024 * 1024)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            if (y % 20) < 2 && x > 5 {
                Rgb([20, 20, 60])
            } else {
                Rgb([235, 235, 230])
            }
        });
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn process_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn upload_dir_is_empty(test: &TestApp) -> bool {
        std::fs::read_dir(test.upload_dir.path())
            .unwrap()
            .next()
            .is_none()
    }

    #[tokio::test]
    async fn test_health() {
        let test = test_app();
        let request = Request::get("/health").body(Body::empty()).unwrap();

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_index_serves_upload_form() {
        let test = test_app();
        let request = Request::get("/").body(Body::empty()).unwrap();

        let response = test.app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("name=\"image\""));
        assert!(html.contains("/process"));
    }

    #[tokio::test]
    async fn test_info_reports_pipeline_config() {
        let test = test_app();
        let request = Request::get("/info").body(Body::empty()).unwrap();

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["engine"], "fake");
        assert_eq!(body["engine_loaded"], true);
        assert_eq!(body["pipeline"]["target_width"], 800);
        assert_eq!(body["pipeline"]["mode"], "standard");
        assert_eq!(body["pipeline"]["resize_filter"], "area");
        assert_eq!(body["allowed_extensions"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_process_returns_latex() {
        let test = test_app();
        let request = process_request(multipart_body("image", "board.PNG", &png_bytes(1600, 400)));

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::OK, "body: {}", body);
        assert_eq!(body["success"], true);
        // Fake recognizer echoes the normalized size: 1600x400 shrinks to 800x200
        assert_eq!(body["latex"], "\\frac{800}{200}");
        assert!(upload_dir_is_empty(&test));
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let test = test_app();
        let request = process_request(multipart_body("file", "board.png", &png_bytes(10, 10)));

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No image file provided");
    }

    #[tokio::test]
    async fn test_empty_filename() {
        let test = test_app();
        let request = process_request(multipart_body("image", "", b""));

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file selected");
    }

    #[tokio::test]
    async fn test_disallowed_extension() {
        let test = test_app();
        let request = process_request(multipart_body("image", "notes.pdf", b"%PDF-1.4"));

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Invalid file type. Allowed: PNG, JPG, JPEG, GIF, BMP"
        );
        assert!(upload_dir_is_empty(&test));
    }

    #[tokio::test]
    async fn test_undecodable_upload_is_server_error_and_cleaned_up() {
        let test = test_app();
        let request = process_request(multipart_body("image", "board.jpg", b"not a jpeg"));

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("decode"));
        assert!(upload_dir_is_empty(&test));
    }

    #[tokio::test]
    async fn test_recognizer_failure_is_server_error_and_cleaned_up() {
        let test = test_app_with(true, 16 * 1024 * 1024);
        let request = process_request(multipart_body("image", "board.png", &png_bytes(300, 200)));

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Recognition failed: model exploded");
        assert!(upload_dir_is_empty(&test));
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let test = test_app_with(false, 1024);
        let request = process_request(multipart_body("image", "board.png", &[7u8; 8192]));

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert!(upload_dir_is_empty(&test));
    }

    #[test]
    fn test_allowed_extension() {
        assert_eq!(allowed_extension("a.PNG").as_deref(), Some("png"));
        assert_eq!(allowed_extension("scan.final.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(allowed_extension("noext"), None);
        assert_eq!(allowed_extension("image.tiff"), None);
    }
}
