//! Web服务器

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use hemoscope_core::Result;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::handlers::{analyze, analyze_pdf, health, index, AppState};

/// multipart 边界和表单字段的额外开销
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState, max_upload_bytes: usize) -> Self {
        let app = create_app(state, max_upload_bytes);
        Self { addr, app }
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Web server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// 构建路由
pub fn create_app(mut state: AppState, max_upload_bytes: usize) -> Router {
    state.max_upload_bytes = max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes.saturating_add(MULTIPART_OVERHEAD)))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// API v1 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/analyze/pdf", post(analyze_pdf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use hemoscope_integration::clinical_advisor::FALLBACK_RECOMMENDATIONS;
    use hemoscope_integration::mock::MockVisionClient;
    use hemoscope_integration::{ClinicalAdvisor, ConfidenceCalibration, ImageAnalyzer};
    use hemoscope_report::ReportGenerator;
    use hemoscope_workflow::WorkflowEngine;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "hemoscope-test-boundary";

    fn app(vision: MockVisionClient) -> Router {
        let engine = WorkflowEngine::new(
            ImageAnalyzer::new(Arc::new(vision), ConfidenceCalibration::default()),
            ClinicalAdvisor::offline(),
            ReportGenerator::default(),
        );
        create_app(AppState::new(Arc::new(engine)), 1024 * 1024)
    }

    fn multipart_body(fields: &[(&str, &str)], image: Option<&[u8]>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some(image) = image {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"image\"; \
                     filename=\"cell.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                    BOUNDARY
                )
                .as_bytes(),
            );
            body.extend_from_slice(image);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn analyze_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(MockVisionClient::responding("Normal"))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["classifier_model"], "mock-vision");
        assert_eq!(body["advisor"], "static_fallback");
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let response = app(MockVisionClient::responding("Normal"))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("analyze-form"));
    }

    #[tokio::test]
    async fn test_analyze_normal() {
        let body = multipart_body(
            &[("name", "Jane Doe"), ("gender", "female")],
            Some(b"jpeg-bytes"),
        );
        let response = app(MockVisionClient::responding("Normal"))
            .oneshot(analyze_request("/api/v1/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["patient"]["name"], "Jane Doe");
        assert_eq!(body["patient"]["gender"], "Female");
        assert_eq!(body["classification"]["label"], "Normal");
        assert!(body["advisory"].is_null());
        assert_eq!(body["trace"]["steps"][1]["status"], "skipped");
        assert!(body["report_html"].as_str().unwrap().contains("Jane Doe"));
        assert!(body["pdf_base64"].as_str().unwrap().starts_with("JVBERi")); // "%PDF"
    }

    #[tokio::test]
    async fn test_analyze_leukemia_uses_fallback_without_key() {
        let body = multipart_body(&[("name", "John Smith")], Some(b"jpeg-bytes"));
        let response = app(MockVisionClient::responding("Leukemia"))
            .oneshot(analyze_request("/api/v1/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["advisory"]["source"], "StaticFallback");
        assert_eq!(body["advisory"]["recommendations"], FALLBACK_RECOMMENDATIONS);
        assert_eq!(body["trace"]["steps"][1]["status"], "fallback");
    }

    #[tokio::test]
    async fn test_analyze_pdf_download() {
        let body = multipart_body(&[("name", "Jane Doe")], Some(b"jpeg-bytes"));
        let response = app(MockVisionClient::responding("Normal"))
            .oneshot(analyze_request("/api/v1/analyze/pdf", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"report_Jane_Doe_"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[0..4], b"%PDF");
    }

    #[tokio::test]
    async fn test_missing_name_is_bad_request() {
        let body = multipart_body(&[("dob", "1990-01-01")], Some(b"jpeg-bytes"));
        let vision = Arc::new(MockVisionClient::responding("Normal"));
        let engine = WorkflowEngine::new(
            ImageAnalyzer::new(vision.clone(), ConfidenceCalibration::default()),
            ClinicalAdvisor::offline(),
            ReportGenerator::default(),
        );
        let response = create_app(AppState::new(Arc::new(engine)), 1024)
            .oneshot(analyze_request("/api/v1/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(body["status"], 400);
        assert_eq!(vision.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_image_is_bad_request() {
        let body = multipart_body(&[("name", "Jane Doe")], None);
        let response = app(MockVisionClient::responding("Normal"))
            .oneshot(analyze_request("/api/v1/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unavailable_classifier_is_bad_gateway() {
        let body = multipart_body(&[("name", "Jane Doe")], Some(b"jpeg-bytes"));
        let response = app(MockVisionClient::unavailable())
            .oneshot(analyze_request("/api/v1/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["status"], 502);
    }

    #[tokio::test]
    async fn test_oversized_image_is_payload_too_large() {
        let vision = Arc::new(MockVisionClient::responding("Normal"));
        let engine = WorkflowEngine::new(
            ImageAnalyzer::new(vision.clone(), ConfidenceCalibration::default()),
            ClinicalAdvisor::offline(),
            ReportGenerator::default(),
        );
        let image = vec![0xFFu8; 200 * 1024];
        let body = multipart_body(&[("name", "Jane Doe")], Some(&image));
        let response = create_app(AppState::new(Arc::new(engine)), 1024)
            .oneshot(analyze_request("/api/v1/analyze", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["status"], 413);
        assert!(body["message"].as_str().unwrap().contains("1024"));
        assert_eq!(vision.call_count(), 0);
    }
}
