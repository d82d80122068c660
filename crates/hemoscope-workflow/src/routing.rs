//! 分类后的路由规则
//!
//! 只有一条分支：白血病进入临床顾问，其余直接生成报告。

use hemoscope_core::{ClassificationLabel, ClassificationResult};
use serde::{Deserialize, Serialize};

/// 分类之后的下一个节点
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoutingTarget {
    ClinicalAdvisor, // 临床顾问
    ReportGenerator, // 报告生成器
}

impl RoutingTarget {
    pub fn node_name(&self) -> &'static str {
        match self {
            RoutingTarget::ClinicalAdvisor => "clinical_advisor",
            RoutingTarget::ReportGenerator => "report_generator",
        }
    }
}

/// 路由结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingResult {
    pub target: RoutingTarget,
    pub reason: String,
}

/// 是否需要咨询临床顾问
pub fn should_consult_advisor(classification: &ClassificationResult) -> bool {
    classification.label == ClassificationLabel::Leukemia
}

pub fn route(classification: &ClassificationResult) -> RoutingResult {
    if should_consult_advisor(classification) {
        RoutingResult {
            target: RoutingTarget::ClinicalAdvisor,
            reason: "Leukemia detected, clinical advisory required".to_string(),
        }
    } else {
        RoutingResult {
            target: RoutingTarget::ReportGenerator,
            reason: format!("Classified as {}, no advisory needed", classification.label),
        }
    }
}
