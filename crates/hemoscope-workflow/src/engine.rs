//! 工作流引擎
//!
//! 串联图像分析、路由、临床建议和报告生成。每个请求独立执行，引擎本身无可变状态。

use chrono::{DateTime, Utc};
use hemoscope_core::utils::format_confidence;
use hemoscope_core::{AdvisorySource, PatientRecord, Report, Result, ScopeError};
use hemoscope_integration::{ClinicalAdvisor, ImageAnalyzer};
use hemoscope_report::{RenderedReport, ReportGenerator};
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::routing::{route, RoutingTarget};
use crate::state_machine::{RunEvent, RunStage, RunStateMachine};
use crate::trace::{StepStatus, WorkflowTrace};

pub const IMAGE_ANALYZER: &str = "image_analyzer";
pub const CLINICAL_ADVISOR: &str = "clinical_advisor";
pub const REPORT_GENERATOR: &str = "report_generator";

/// 一次分析请求
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub patient: PatientRecord,
    pub image: Vec<u8>,
    /// 额外的病史说明，附加在患者信息之后交给临床顾问
    pub patient_context: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(patient: PatientRecord, image: Vec<u8>, generated_at: DateTime<Utc>) -> Self {
        Self {
            patient,
            image,
            patient_context: None,
            generated_at,
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.patient_context = Some(context.to_string());
        self
    }

    fn advisor_context(&self) -> String {
        match self.patient_context.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => {
                format!("{}. {}", self.patient.context_line(), extra)
            }
            _ => self.patient.context_line(),
        }
    }
}

/// 运行结果
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub run_id: Uuid,
    pub report: Report,
    pub rendered: RenderedReport,
    pub trace: WorkflowTrace,
}

/// 工作流引擎
pub struct WorkflowEngine {
    state_machine: RunStateMachine,
    analyzer: ImageAnalyzer,
    advisor: ClinicalAdvisor,
    reporter: ReportGenerator,
}

impl WorkflowEngine {
    pub fn new(
        analyzer: ImageAnalyzer,
        advisor: ClinicalAdvisor,
        reporter: ReportGenerator,
    ) -> Self {
        Self {
            state_machine: RunStateMachine::new(),
            analyzer,
            advisor,
            reporter,
        }
    }

    pub fn analyzer_model(&self) -> &str {
        self.analyzer.model()
    }

    pub fn advisor_is_model_backed(&self) -> bool {
        self.advisor.is_model_backed()
    }

    /// 执行一次完整分析
    ///
    /// 图像模型不可用时直接返回错误；文本模型不可用时由临床顾问降级为固定建议。
    pub async fn run(&self, request: AnalysisRequest) -> Result<WorkflowOutcome> {
        let run_id = Uuid::new_v4();
        let mut trace = WorkflowTrace::new();
        let mut stage = RunStage::Received;

        info!(%run_id, patient_id = %request.patient.patient_id, "Workflow started");
        debug!(%run_id, image_bytes = request.image.len(), "Image received");

        // 1. 图像分类
        let started = Instant::now();
        let classification = match self.analyzer.analyze(&request.image).await {
            Ok(classification) => classification,
            Err(e) => {
                error!(%run_id, "Image analysis failed: {}", e);
                return Err(e);
            }
        };
        stage = self.state_machine.transition(stage, RunEvent::ImageClassified)?;
        trace.record(
            IMAGE_ANALYZER,
            StepStatus::Completed,
            format!("{} ({})", classification.label, format_confidence(classification.confidence)),
            started.elapsed(),
        );

        // 2. 路由
        let routing = route(&classification);
        info!(%run_id, next = routing.target.node_name(), "{}", routing.reason);

        // 3. 临床建议
        let advisory = match routing.target {
            RoutingTarget::ClinicalAdvisor => {
                let started = Instant::now();
                let context = request.advisor_context();
                let advisory = self.advisor.advise(&classification, Some(&context)).await;
                stage = self.state_machine.transition(stage, RunEvent::AdvisoryIssued)?;

                let status = match advisory.source {
                    AdvisorySource::Model => StepStatus::Completed,
                    AdvisorySource::StaticFallback => StepStatus::Fallback,
                };
                trace.record(
                    CLINICAL_ADVISOR,
                    status,
                    format!("severity {}", advisory.severity),
                    started.elapsed(),
                );
                Some(advisory)
            }
            RoutingTarget::ReportGenerator => {
                trace.record(
                    CLINICAL_ADVISOR,
                    StepStatus::Skipped,
                    routing.reason,
                    Default::default(),
                );
                None
            }
        };

        // 4. 报告
        let started = Instant::now();
        let report = Report::new(request.patient, classification, advisory, request.generated_at);
        let reporter = self.reporter.clone();
        let to_render = report.clone();
        let rendered = tokio::task::spawn_blocking(move || reporter.generate(&to_render))
            .await
            .map_err(|e| ScopeError::Internal(format!("report task failed: {}", e)))??;
        stage = self.state_machine.transition(stage, RunEvent::ReportRendered)?;
        trace.record(
            REPORT_GENERATOR,
            StepStatus::Completed,
            rendered.pdf_file_name.clone(),
            started.elapsed(),
        );

        info!(%run_id, ?stage, total_ms = trace.total_ms(), "Workflow finished");

        Ok(WorkflowOutcome {
            run_id,
            report,
            rendered,
            trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hemoscope_core::{ClassificationLabel, Gender};
    use hemoscope_integration::mock::{MockTextGenerator, MockVisionClient};
    use hemoscope_integration::ConfidenceCalibration;
    use std::sync::Arc;

    fn request(name: &str) -> AnalysisRequest {
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap();
        let patient = PatientRecord::register(name, "1990-01-01", Gender::Female, at).unwrap();
        AnalysisRequest::new(patient, vec![0xFF, 0xD8, 0xFF], at)
    }

    fn analyzer(vision: MockVisionClient) -> ImageAnalyzer {
        ImageAnalyzer::new(Arc::new(vision), ConfidenceCalibration::default())
    }

    #[tokio::test]
    async fn test_vision_failure_is_surfaced() {
        let engine = WorkflowEngine::new(
            analyzer(MockVisionClient::unavailable()),
            ClinicalAdvisor::offline(),
            ReportGenerator::default(),
        );

        let err = engine.run(request("Jane Doe")).await.unwrap_err();
        assert!(matches!(err, ScopeError::UnavailableModel(_)));
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let engine = WorkflowEngine::new(
            analyzer(MockVisionClient::responding("Normal")),
            ClinicalAdvisor::offline(),
            ReportGenerator::default(),
        );
        let mut req = request("Jane Doe");
        req.image.clear();

        let err = engine.run(req).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_model_advisory_passes_patient_context() {
        let generator =
            Arc::new(MockTextGenerator::responding("## Interpretation\nRefer urgently."));
        let engine = WorkflowEngine::new(
            analyzer(MockVisionClient::responding("Leukemia")),
            ClinicalAdvisor::new(Some(
                generator.clone() as Arc<dyn hemoscope_integration::TextGenerator>
            )),
            ReportGenerator::default(),
        );

        let outcome = engine
            .run(request("Ana Lima").with_context("fatigue for 3 weeks"))
            .await
            .unwrap();

        assert_eq!(generator.call_count(), 1);
        assert_eq!(outcome.report.classification.label, ClassificationLabel::Leukemia);
        assert_eq!(outcome.trace.status_of(CLINICAL_ADVISOR), Some(StepStatus::Completed));
        assert!(outcome.rendered.html.contains("Refer urgently."));
        assert_eq!(outcome.trace.steps.len(), 3);
    }
}
