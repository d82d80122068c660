//! 测试用模型客户端，返回预设响应并记录调用次数

use async_trait::async_trait;
use hemoscope_core::{Result, ScopeError};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::llm::TextGenerator;
use crate::vision::VisionClient;

/// 模拟视觉模型
pub struct MockVisionClient {
    response: Option<String>,
    calls: AtomicUsize,
}

impl MockVisionClient {
    pub fn responding(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// 每次调用都返回模型不可用
    pub fn unavailable() -> Self {
        Self {
            response: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionClient for MockVisionClient {
    fn model(&self) -> &str {
        "mock-vision"
    }

    async fn chat_with_image(&self, _prompt: &str, _image: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .ok_or_else(|| ScopeError::UnavailableModel("mock vision model is offline".to_string()))
    }
}

/// 模拟文本模型
pub struct MockTextGenerator {
    response: Option<String>,
    calls: AtomicUsize,
}

impl MockTextGenerator {
    pub fn responding(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            response: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    fn model(&self) -> &str {
        "mock-text"
    }

    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .ok_or_else(|| ScopeError::UnavailableModel("mock text model is offline".to_string()))
    }
}
