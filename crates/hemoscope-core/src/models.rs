//! 核心数据模型定义

use crate::error::{Result, ScopeError};
use crate::utils::generate_patient_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 患者基本信息
///
/// 登记后不可变，仅用于报告展示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: String,    // 登记编号 LS-YYYYMMDDHHMMSS
    pub name: String,          // 患者姓名
    pub date_of_birth: String, // 出生日期，期望 YYYY-MM-DD，不做校验
    pub gender: Gender,        // 性别
}

impl PatientRecord {
    /// 登记患者，除姓名外不做任何校验
    pub fn register(
        name: &str,
        date_of_birth: &str,
        gender: Gender,
        registered_at: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ScopeError::Validation("patient name is required".to_string()));
        }

        Ok(Self {
            patient_id: generate_patient_id(registered_at),
            name: name.to_string(),
            date_of_birth: date_of_birth.trim().to_string(),
            gender,
        })
    }

    /// 供临床顾问使用的上下文描述
    pub fn context_line(&self) -> String {
        format!(
            "Name: {}, DOB: {}, Gender: {}",
            self.name,
            if self.date_of_birth.is_empty() { "Not provided" } else { &self.date_of_birth },
            self.gender
        )
    }
}

/// 性别枚举
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    NotSpecified,
    Male,
    Female,
    Other,
}

impl Gender {
    /// 宽松解析表单输入，无法识别时为未指定
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            "other" | "o" => Gender::Other,
            _ => Gender::NotSpecified,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::NotSpecified => write!(f, "Not specified"),
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
            Gender::Other => write!(f, "Other"),
        }
    }
}

/// 分类标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationLabel {
    Normal,    // 正常
    Leukemia,  // 白血病（原始细胞）
    Uncertain, // 模型输出无法判定
}

impl ClassificationLabel {
    /// 报告横幅上的状态文字
    pub fn status_text(&self) -> &'static str {
        match self {
            ClassificationLabel::Normal => "NORMAL",
            ClassificationLabel::Leukemia => "LEUKEMIA DETECTED",
            ClassificationLabel::Uncertain => "UNCERTAIN",
        }
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationLabel::Normal => write!(f, "Normal"),
            ClassificationLabel::Leukemia => write!(f, "Leukemia"),
            ClassificationLabel::Uncertain => write!(f, "Uncertain"),
        }
    }
}

/// 图像分类结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: ClassificationLabel,
    pub confidence: f64, // 0.0 - 1.0
    pub raw_output: String,
}

impl ClassificationResult {
    pub fn new(label: ClassificationLabel, confidence: f64, raw_output: impl Into<String>) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            label,
            confidence,
            raw_output: raw_output.into(),
        }
    }

    pub fn is_leukemia(&self) -> bool {
        self.label == ClassificationLabel::Leukemia
    }
}

/// 临床紧急程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
        }
    }
}

/// 建议来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvisorySource {
    Model,
    StaticFallback,
}

/// 临床建议
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub recommendations: String,
    pub next_steps: Vec<String>,
    pub severity: Severity,
    pub requires_urgent_action: bool,
    pub source: AdvisorySource,
}

/// 筛查报告
///
/// `generated_at` 由调用方固定，相同输入渲染出相同内容。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub patient: PatientRecord,
    pub classification: ClassificationResult,
    pub advisory: Option<Advisory>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        patient: PatientRecord,
        classification: ClassificationResult,
        advisory: Option<Advisory>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            patient,
            classification,
            advisory,
            generated_at,
        }
    }

    /// 仅在存在临床建议时显示紧急程度
    pub fn severity(&self) -> Option<Severity> {
        self.advisory.as_ref().map(|a| a.severity)
    }
}
