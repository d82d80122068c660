//! 视觉模型客户端
//!
//! 微调后的血细胞分类模型通过 Ollama 兼容的 `/api/chat` 接口提供服务，
//! 图像以 base64 随用户消息发送。

use async_trait::async_trait;
use base64::Engine;
use hemoscope_core::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::connectors::{add_auth_headers, ensure_success, map_transport_error, EndpointConfig};

/// 分类只需要一个词
const MAX_PREDICT_TOKENS: i32 = 20;

/// 视觉模型接口
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// 模型名称
    fn model(&self) -> &str;

    /// 发送图像与提示词，返回模型原始文本
    async fn chat_with_image(&self, prompt: &str, image: &[u8]) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<String>,
}

/// 确定性解码
#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Ollama 兼容的视觉模型客户端
pub struct OllamaVisionClient {
    config: EndpointConfig,
    client: reqwest::Client,
}

impl OllamaVisionClient {
    pub fn new(config: EndpointConfig) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }
}

#[async_trait]
impl VisionClient for OllamaVisionClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat_with_image(&self, prompt: &str, image: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        debug!(
            model = %self.config.model,
            image_size = image.len(),
            "Sending image to vision model"
        );

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
                images: vec![encoded],
            }],
            stream: false,
            options: ChatOptions {
                temperature: 0.0,
                num_predict: MAX_PREDICT_TOKENS,
            },
        };

        let request = self.client.post(self.config.url("/api/chat")).json(&body);
        let request = add_auth_headers(request, &self.config.authentication);

        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(&self.config, e))?;
        let response = ensure_success(&self.config, response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScopeError::ModelResponse(format!("invalid vision response: {}", e)))?;

        info!(model = %self.config.model, "Vision model responded");
        Ok(parsed.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let body = ChatRequest {
            model: "medgemma",
            messages: vec![ChatMessage {
                role: "user",
                content: "classify",
                images: vec!["aGVsbG8=".to_string()],
            }],
            stream: false,
            options: ChatOptions {
                temperature: 0.0,
                num_predict: MAX_PREDICT_TOKENS,
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["images"][0], "aGVsbG8=");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 20);
    }

    #[test]
    fn test_chat_response_parse() {
        let raw = r#"{"model":"medgemma",
            "message":{"role":"assistant","content":"Leukemia"},"done":true}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, "Leukemia");
    }
}
