//! # HemoScope报告模块
//!
//! 将患者信息、分类结果和可选的临床建议合并为 HTML 报告与 PDF 导出。
//! HTML 渲染是输入的纯函数：相同输入得到逐字节相同的输出。

pub mod html;
pub mod markdown;
pub mod pdf;
pub mod text;

use hemoscope_core::{Report, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 免责声明要点
pub const DISCLAIMER_POINTS: [&str; 5] = [
    "This report is generated by an AI screening tool for research and educational purposes only",
    "This is NOT a medical diagnosis",
    "Results must be confirmed by qualified healthcare professionals",
    "Do not make treatment decisions based solely on this report",
    "Always consult a hematologist or oncologist for definitive diagnosis",
];

/// 分析方法说明，展示在报告的分析详情中
///
/// `model_id` 是发布指标所对应的适配器；`serving_model` 是本地推理服务中的模型标签。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub method: String,
    pub model_id: String,
    pub serving_model: Option<String>,
    pub metrics: Vec<(String, String)>,
}

impl AnalysisDetails {
    pub fn with_serving_model(mut self, tag: &str) -> Self {
        self.serving_model = Some(tag.trim().to_string()).filter(|t| !t.is_empty());
        self
    }
}

impl Default for AnalysisDetails {
    fn default() -> Self {
        Self {
            method: "MedGemma 1.5 4B (fine-tuned LoRA)".to_string(),
            model_id: "chaudhrysuleman/medgemma-1.5-4b-it-leukemia-lora".to_string(),
            serving_model: None,
            metrics: vec![
                ("Overall Accuracy".to_string(), "78.15%".to_string()),
                (
                    "Leukemia Precision / Recall / F1".to_string(),
                    "83% / 83% / 83%".to_string(),
                ),
                (
                    "Normal Precision / Recall / F1".to_string(),
                    "68% / 69% / 69%".to_string(),
                ),
            ],
        }
    }
}

/// 渲染结果
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub html: String,
    pub pdf: Vec<u8>,
    pub pdf_file_name: String,
}

/// 报告生成器
#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
    details: AnalysisDetails,
}

impl ReportGenerator {
    pub fn new(details: AnalysisDetails) -> Self {
        Self { details }
    }

    pub fn details(&self) -> &AnalysisDetails {
        &self.details
    }

    pub fn render_html(&self, report: &Report) -> String {
        html::render(report, &self.details)
    }

    pub fn render_pdf(&self, report: &Report) -> Result<Vec<u8>> {
        pdf::render(report, &self.details)
    }

    /// 渲染 HTML 与 PDF
    pub fn generate(&self, report: &Report) -> Result<RenderedReport> {
        let html = self.render_html(report);
        let pdf = self.render_pdf(report)?;

        info!(
            patient_id = %report.patient.patient_id,
            html_len = html.len(),
            pdf_len = pdf.len(),
            "Report rendered"
        );

        Ok(RenderedReport {
            html,
            pdf,
            pdf_file_name: pdf_file_name(report),
        })
    }
}

/// PDF 下载文件名：report_<姓名>_<时间戳>.pdf
pub fn pdf_file_name(report: &Report) -> String {
    let name: String = report
        .patient
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(20)
        .collect();
    let name = if name.trim_matches('_').is_empty() {
        "anonymous".to_string()
    } else {
        name
    };

    format!("report_{}_{}.pdf", name, report.generated_at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hemoscope_core::{ClassificationLabel, ClassificationResult, Gender, PatientRecord};

    fn report(name: &str) -> Report {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 30, 0).unwrap();
        let patient = PatientRecord::register(name, "1980-05-01", Gender::Male, at).unwrap();
        let classification =
            ClassificationResult::new(ClassificationLabel::Normal, 0.91, "normal");
        Report::new(patient, classification, None, at)
    }

    #[test]
    fn test_pdf_file_name() {
        assert_eq!(
            pdf_file_name(&report("John Smith")),
            "report_John_Smith_20260201_083000.pdf"
        );
        assert_eq!(pdf_file_name(&report("张三")), "report_anonymous_20260201_083000.pdf");
    }

    #[test]
    fn test_generate_produces_both_artifacts() {
        let rendered = ReportGenerator::default().generate(&report("Jane Doe")).unwrap();
        assert!(rendered.html.contains("Jane Doe"));
        assert_eq!(&rendered.pdf[0..4], b"%PDF");
    }

    #[test]
    fn test_serving_model_is_listed_beside_adapter() {
        let details = AnalysisDetails::default().with_serving_model("medgemma-leukemia");
        assert_eq!(details.model_id, "chaudhrysuleman/medgemma-1.5-4b-it-leukemia-lora");

        let html = ReportGenerator::new(details).render_html(&report("Jane Doe"));
        assert!(html.contains("<code>chaudhrysuleman/medgemma-1.5-4b-it-leukemia-lora</code>"));
        assert!(html.contains("Serving Model"));
        assert!(html.contains("<code>medgemma-leukemia</code>"));

        let html = ReportGenerator::default().render_html(&report("Jane Doe"));
        assert!(!html.contains("Serving Model"));
        assert_eq!(AnalysisDetails::default().with_serving_model("  ").serving_model, None);
    }
}
