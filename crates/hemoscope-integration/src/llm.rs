//! 文本生成模型客户端
//!
//! 临床建议使用 Google Generative Language 的 `generateContent` 接口。

use async_trait::async_trait;
use hemoscope_core::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::connectors::{add_auth_headers, ensure_success, map_transport_error, EndpointConfig};

/// 文本生成接口
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// 拼接首个候选的全部文本片段
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: Vec<String> = content.parts.into_iter().filter_map(|p| p.text).collect();
        let text = text.join("");
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Gemini 客户端
pub struct GeminiClient {
    config: EndpointConfig,
    temperature: f32,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: EndpointConfig, temperature: f32) -> Result<Self> {
        if !config.authentication.is_configured() {
            return Err(ScopeError::Config(format!("{} requires an API key", config.name)));
        }
        let client = config.build_client()?;
        Ok(Self {
            config,
            temperature,
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let url = self
            .config
            .url(&format!("/v1beta/models/{}:generateContent", self.config.model));
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };
        debug!(model = %self.config.model, prompt_len = prompt.len(), "Calling text model");

        let request = self.client.post(url).json(&body);
        let request = add_auth_headers(request, &self.config.authentication);

        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(&self.config, e))?;
        let response = ensure_success(&self.config, response).await?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ScopeError::ModelResponse(format!("invalid text model response: {}", e)))?;

        let text = parsed
            .into_text()
            .ok_or_else(|| {
                ScopeError::ModelResponse("text model returned no content".to_string())
            })?;
        info!(model = %self.config.model, response_len = text.len(), "Text model responded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::AuthenticationConfig;

    #[test]
    fn test_request_uses_camel_case() {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: "sys" }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: GenerationConfig { temperature: 0.3 },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert!(json["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn test_response_text_joined() {
        let raw = r###"{"candidates":[{"content":{"role":"model",
            "parts":[{"text":"## Plan\n"},{"text":"1. CBC"}]}}]}"###;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_text().as_deref(), Some("## Plan\n1. CBC"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.into_text().is_none());
    }

    #[test]
    fn test_client_requires_key() {
        let config =
            EndpointConfig::new("advisor", "https://generativelanguage.googleapis.com", "gemini");
        assert!(GeminiClient::new(config.clone(), 0.3).is_err());

        let config = config.with_authentication(AuthenticationConfig::ApiKey {
            key: "k".to_string(),
            header: Some("x-goog-api-key".to_string()),
        });
        assert!(GeminiClient::new(config, 0.3).is_ok());
    }
}
