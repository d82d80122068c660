//! # HemoScope集成模块
//!
//! 封装与外部模型服务的集成，包括：
//! - 模型端点连接配置与认证
//! - 视觉模型客户端（血细胞图像分类）
//! - 文本生成模型客户端（临床建议）
//! - 图像分析器与临床顾问两个工作流节点

pub mod clinical_advisor;
pub mod connectors;
pub mod image_analyzer;
pub mod knowledge;
pub mod llm;
pub mod mock;
pub mod vision;

pub use clinical_advisor::{static_fallback_advisory, ClinicalAdvisor};
pub use connectors::{AuthenticationConfig, EndpointConfig};
pub use image_analyzer::{parse_classification, ConfidenceCalibration, ImageAnalyzer};
pub use llm::{GeminiClient, TextGenerator};
pub use vision::{OllamaVisionClient, VisionClient};
