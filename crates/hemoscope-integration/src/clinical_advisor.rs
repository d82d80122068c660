//! 临床顾问
//!
//! 检出白血病时生成临床建议。文本模型不可用时替换为固定建议，不向上传播错误。

use hemoscope_core::utils::format_confidence;
use hemoscope_core::{Advisory, AdvisorySource, ClassificationResult, Severity};
use std::sync::Arc;
use tracing::{info, warn};

use crate::knowledge::advisor_system_instruction;
use crate::llm::TextGenerator;

/// 固定建议正文
pub const FALLBACK_RECOMMENDATIONS: &str = "Leukemia blast cells detected. \
    Immediate referral to hematologist recommended. \
    Confirm diagnosis with CBC and bone marrow biopsy.";

const FALLBACK_NEXT_STEPS: [&str; 5] = [
    "Complete Blood Count (CBC) with differential",
    "Bone marrow biopsy for definitive diagnosis",
    "Refer to hematologist/oncologist",
    "Flow cytometry for cell typing",
    "Genetic testing for prognosis",
];

const MODEL_NEXT_STEPS: [&str; 5] = [
    "Complete Blood Count (CBC)",
    "Bone marrow biopsy",
    "Hematologist referral",
    "Flow cytometry",
    "Genetic testing",
];

/// 远程调用不可用时使用的固定建议
pub fn static_fallback_advisory() -> Advisory {
    Advisory {
        recommendations: FALLBACK_RECOMMENDATIONS.to_string(),
        next_steps: FALLBACK_NEXT_STEPS.iter().map(|s| s.to_string()).collect(),
        severity: Severity::High,
        requires_urgent_action: true,
        source: AdvisorySource::StaticFallback,
    }
}

/// 非白血病结果的建议，不调用模型
pub fn no_action_advisory() -> Advisory {
    Advisory {
        recommendations: "No immediate clinical action required for normal cells.".to_string(),
        next_steps: vec![
            "Regular monitoring".to_string(),
            "Follow-up if symptoms develop".to_string(),
        ],
        severity: Severity::Low,
        requires_urgent_action: false,
        source: AdvisorySource::StaticFallback,
    }
}

/// 构造用户提示词
pub fn build_user_prompt(
    classification: &ClassificationResult,
    patient_context: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Blood cell analysis result:\n- Classification: {}\n- Confidence: {}\n",
        classification.label,
        format_confidence(classification.confidence)
    );
    if let Some(context) = patient_context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("- Additional context: {}\n", context));
    }
    prompt.push_str(
        "\nProvide:\n\
1. Clinical interpretation\n\
2. Recommended next steps (numbered list)\n\
3. Urgency assessment\n\
4. Key points for the patient/clinician",
    );
    prompt
}

/// 临床顾问
pub struct ClinicalAdvisor {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl ClinicalAdvisor {
    /// 未配置文本模型时始终使用固定建议
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn offline() -> Self {
        Self { generator: None }
    }

    pub fn is_model_backed(&self) -> bool {
        self.generator.is_some()
    }

    /// 生成临床建议
    pub async fn advise(
        &self,
        classification: &ClassificationResult,
        patient_context: Option<&str>,
    ) -> Advisory {
        if !classification.is_leukemia() {
            return no_action_advisory();
        }

        let Some(generator) = &self.generator else {
            warn!("No text model configured, using static clinical advisory");
            return static_fallback_advisory();
        };

        let system = advisor_system_instruction();
        let prompt = build_user_prompt(classification, patient_context);

        match generator.generate(&system, &prompt).await {
            Ok(text) => {
                info!(model = %generator.model(), "Clinical advisory generated");
                Advisory {
                    recommendations: text,
                    next_steps: MODEL_NEXT_STEPS.iter().map(|s| s.to_string()).collect(),
                    severity: Severity::High,
                    requires_urgent_action: true,
                    source: AdvisorySource::Model,
                }
            }
            Err(e) => {
                warn!(
                    model = %generator.model(),
                    "Text model unavailable, using static advisory: {}",
                    e
                );
                static_fallback_advisory()
            }
        }
    }
}
