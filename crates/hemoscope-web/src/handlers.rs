//! HTTP处理器

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hemoscope_core::{Advisory, ClassificationResult, Gender, PatientRecord, ScopeError};
use hemoscope_workflow::{AnalysisRequest, WorkflowEngine, WorkflowOutcome, WorkflowTrace};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::static_files::INDEX_HTML;

/// 默认图像上传上限
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// 处理器共享状态，只读
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
    pub started_at: DateTime<Utc>,
    /// 图像上传上限，由 `create_app` 设置
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self {
            engine,
            started_at: Utc::now(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// 错误响应
#[derive(Debug)]
pub struct ApiError(pub ScopeError);

impl From<ScopeError> for ApiError {
    fn from(err: ScopeError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ScopeError::Validation(_) => StatusCode::BAD_REQUEST,
            ScopeError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ScopeError::UnavailableModel(_) | ScopeError::ModelResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        let body = Json(json!({
            "error": true,
            "message": self.0.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// 单页表单
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// 健康检查处理器
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "started_at": state.started_at.to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "classifier_model": state.engine.analyzer_model(),
        "advisor": if state.engine.advisor_is_model_backed() { "model" } else { "static_fallback" }
    }))
}

/// 分析接口响应
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub run_id: Uuid,
    pub patient: PatientRecord,
    pub classification: ClassificationResult,
    pub advisory: Option<Advisory>,
    pub trace: WorkflowTrace,
    pub report_html: String,
    pub pdf_file_name: String,
    pub pdf_base64: String,
}

impl From<WorkflowOutcome> for AnalyzeResponse {
    fn from(outcome: WorkflowOutcome) -> Self {
        Self {
            run_id: outcome.run_id,
            patient: outcome.report.patient,
            classification: outcome.report.classification,
            advisory: outcome.report.advisory,
            trace: outcome.trace,
            report_html: outcome.rendered.html,
            pdf_file_name: outcome.rendered.pdf_file_name,
            pdf_base64: STANDARD.encode(&outcome.rendered.pdf),
        }
    }
}

/// 分析并返回 JSON
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let outcome = run_analysis(&state, multipart).await?;
    Ok(Json(AnalyzeResponse::from(outcome)))
}

/// 分析并直接下载 PDF
pub async fn analyze_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let outcome = run_analysis(&state, multipart).await?;
    let disposition = format!("attachment; filename=\"{}\"", outcome.rendered.pdf_file_name);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        outcome.rendered.pdf,
    )
        .into_response())
}

async fn run_analysis(
    state: &AppState,
    multipart: Multipart,
) -> Result<WorkflowOutcome, ApiError> {
    let generated_at = Utc::now();
    let form = AnalyzeForm::read(multipart, state.max_upload_bytes).await?;
    let request = form.into_request(generated_at)?;

    info!(patient_id = %request.patient.patient_id, "Analysis requested");
    Ok(state.engine.run(request).await?)
}

/// 表单字段
#[derive(Debug, Default)]
struct AnalyzeForm {
    name: String,
    dob: String,
    gender: String,
    context: String,
    image: Option<Vec<u8>>,
}

/// 超出请求体上限时返回 413，其余解析错误按输入错误处理
fn multipart_error(e: MultipartError, limit: usize) -> ScopeError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ScopeError::PayloadTooLarge { limit }
    } else {
        ScopeError::Validation(format!("invalid multipart body: {}", e))
    }
}

impl AnalyzeForm {
    async fn read(mut multipart: Multipart, limit: usize) -> Result<Self, ScopeError> {
        let mut form = AnalyzeForm::default();
        let invalid = |e: MultipartError| multipart_error(e, limit);

        while let Some(field) = multipart.next_field().await.map_err(invalid)? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "name" => form.name = field.text().await.map_err(invalid)?,
                "dob" => form.dob = field.text().await.map_err(invalid)?,
                "gender" => form.gender = field.text().await.map_err(invalid)?,
                "context" => form.context = field.text().await.map_err(invalid)?,
                "image" => {
                    let bytes = field.bytes().await.map_err(invalid)?;
                    debug!(image_bytes = bytes.len(), "Image field received");
                    form.image = Some(bytes.to_vec());
                }
                other => debug!("Ignoring multipart field `{}`", other),
            }
        }

        Ok(form)
    }

    fn into_request(self, generated_at: DateTime<Utc>) -> Result<AnalysisRequest, ScopeError> {
        let patient = PatientRecord::register(
            &self.name,
            self.dob.trim(),
            Gender::parse_lenient(&self.gender),
            generated_at,
        )?;
        let image = self
            .image
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| ScopeError::Validation("an image file is required".to_string()))?;

        let request = AnalysisRequest::new(patient, image, generated_at);
        Ok(match self.context.trim() {
            "" => request,
            context => request.with_context(context),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ScopeError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ScopeError::PayloadTooLarge { limit: 1024 }, StatusCode::PAYLOAD_TOO_LARGE),
            (ScopeError::UnavailableModel("x".into()), StatusCode::BAD_GATEWAY),
            (ScopeError::ModelResponse("x".into()), StatusCode::BAD_GATEWAY),
            (ScopeError::Report("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ScopeError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_form_requires_name_and_image() {
        let at = Utc::now();

        let form = AnalyzeForm {
            name: "  ".to_string(),
            image: Some(vec![1]),
            ..Default::default()
        };
        assert!(matches!(form.into_request(at), Err(ScopeError::Validation(_))));

        let form = AnalyzeForm {
            name: "Jane Doe".to_string(),
            image: Some(Vec::new()),
            ..Default::default()
        };
        assert!(matches!(form.into_request(at), Err(ScopeError::Validation(_))));

        let form = AnalyzeForm {
            name: "Jane Doe".to_string(),
            gender: "female".to_string(),
            context: "night sweats".to_string(),
            image: Some(vec![1, 2, 3]),
            ..Default::default()
        };
        let request = form.into_request(at).unwrap();
        assert_eq!(request.patient.gender, Gender::Female);
        assert_eq!(request.patient_context.as_deref(), Some("night sweats"));
    }
}
