//! 图像分析器
//!
//! 调用视觉模型并把自由文本输出解析为分类结果

use hemoscope_core::{ClassificationLabel, ClassificationResult, Result, ScopeError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::knowledge::CLASSIFICATION_PROMPT;
use crate::vision::VisionClient;

/// 各标签的校准置信度
///
/// 模型只输出一个词，置信度取自离线评估的各类别指标。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceCalibration {
    pub normal: f64,
    pub leukemia: f64,
    pub uncertain: f64,
}

impl ConfidenceCalibration {
    pub fn for_label(&self, label: ClassificationLabel) -> f64 {
        match label {
            ClassificationLabel::Normal => self.normal,
            ClassificationLabel::Leukemia => self.leukemia,
            ClassificationLabel::Uncertain => self.uncertain,
        }
    }
}

impl Default for ConfidenceCalibration {
    fn default() -> Self {
        Self {
            normal: 0.70,
            leukemia: 0.83,
            uncertain: 0.50,
        }
    }
}

/// 解析模型输出
///
/// 只看最后一个非空行，按子串匹配：同时提到两类时判为白血病，都未提到时为不确定。
pub fn parse_classification(
    text: &str,
    calibration: &ConfidenceCalibration,
) -> ClassificationResult {
    let last_line = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("")
        .to_lowercase();

    let label = if last_line.contains("leukemia") {
        ClassificationLabel::Leukemia
    } else if last_line.contains("normal") {
        ClassificationLabel::Normal
    } else {
        ClassificationLabel::Uncertain
    };

    ClassificationResult::new(label, calibration.for_label(label), last_line)
}

/// 图像分析器
pub struct ImageAnalyzer {
    client: Arc<dyn VisionClient>,
    calibration: ConfidenceCalibration,
}

impl ImageAnalyzer {
    pub fn new(client: Arc<dyn VisionClient>, calibration: ConfidenceCalibration) -> Self {
        Self { client, calibration }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// 分类一张血细胞图像，模型不可用时向调用方返回错误
    pub async fn analyze(&self, image: &[u8]) -> Result<ClassificationResult> {
        if image.is_empty() {
            return Err(ScopeError::Validation("image is empty".to_string()));
        }

        let raw = self.client.chat_with_image(CLASSIFICATION_PROMPT, image).await?;
        let result = parse_classification(&raw, &self.calibration);

        info!(
            model = %self.client.model(),
            label = %result.label,
            confidence = result.confidence,
            "Image classified"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockVisionClient;

    #[test]
    fn test_parse_labels() {
        let cal = ConfidenceCalibration::default();

        let normal = parse_classification("model\nNormal", &cal);
        assert_eq!(normal.label, ClassificationLabel::Normal);
        assert_eq!(normal.confidence, 0.70);
        assert_eq!(normal.raw_output, "normal");

        let leukemia = parse_classification("Answer: Leukemia\n", &cal);
        assert_eq!(leukemia.label, ClassificationLabel::Leukemia);
        assert_eq!(leukemia.confidence, 0.83);

        let both = parse_classification("not normal, leukemia", &cal);
        assert_eq!(both.label, ClassificationLabel::Leukemia);

        let neither = parse_classification("I cannot tell", &cal);
        assert_eq!(neither.label, ClassificationLabel::Uncertain);
        assert_eq!(neither.confidence, 0.50);
    }

    #[test]
    fn test_parse_only_last_line() {
        let cal = ConfidenceCalibration::default();
        let result = parse_classification("Is the cell NORMAL or LEUKEMIA?\nnormal", &cal);
        assert_eq!(result.label, ClassificationLabel::Normal);
    }

    #[test]
    fn test_class_word_inside_longer_token() {
        let cal = ConfidenceCalibration::default();

        for (output, expected) in [
            ("abnormal morphology", ClassificationLabel::Normal),
            ("normal_cell", ClassificationLabel::Normal),
            ("Normalcy", ClassificationLabel::Normal),
            ("class: leukemia_blast", ClassificationLabel::Leukemia),
        ] {
            let result = parse_classification(output, &cal);
            assert_eq!(result.label, expected, "output: {}", output);
        }
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_image() {
        let client = Arc::new(MockVisionClient::responding("Normal"));
        let analyzer = ImageAnalyzer::new(client.clone(), ConfidenceCalibration::default());

        let err = analyzer.analyze(&[]).await.unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_analyze_surfaces_unavailable_model() {
        let client = Arc::new(MockVisionClient::unavailable());
        let analyzer = ImageAnalyzer::new(client, ConfidenceCalibration::default());

        let err = analyzer.analyze(b"png").await.unwrap_err();
        assert!(matches!(err, ScopeError::UnavailableModel(_)));
    }
}
