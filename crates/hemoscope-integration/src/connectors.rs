//! 模型端点连接器
//!
//! 两个外部模型服务共用的端点配置、认证头和传输错误映射

use hemoscope_core::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// 认证配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticationConfig {
    None,
    ApiKey { key: String, header: Option<String> },
    BearerToken { token: String },
}

impl AuthenticationConfig {
    /// 空凭据视为无认证
    pub fn bearer(token: Option<&str>) -> Self {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => AuthenticationConfig::BearerToken { token: token.to_string() },
            None => AuthenticationConfig::None,
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, AuthenticationConfig::None)
    }
}

/// 模型端点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub authentication: AuthenticationConfig,
}

impl EndpointConfig {
    pub fn new(name: &str, base_url: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs: 120,
            authentication: AuthenticationConfig::None,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_authentication(mut self, authentication: AuthenticationConfig) -> Self {
        self.authentication = authentication;
        self
    }

    /// 拼接端点路径
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// 创建带超时的HTTP客户端
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| {
                ScopeError::Config(format!("failed to build HTTP client for {}: {}", self.name, e))
            })
    }
}

/// 添加认证头
pub(crate) fn add_auth_headers(
    request: reqwest::RequestBuilder,
    auth: &AuthenticationConfig,
) -> reqwest::RequestBuilder {
    match auth {
        AuthenticationConfig::None => request,
        AuthenticationConfig::ApiKey { key, header } => {
            let header_name = header.as_deref().unwrap_or("X-API-Key");
            request.header(header_name, key)
        }
        AuthenticationConfig::BearerToken { token } => request.bearer_auth(token),
    }
}

/// 传输层错误统一视为模型不可用
pub(crate) fn map_transport_error(config: &EndpointConfig, err: reqwest::Error) -> ScopeError {
    if err.is_connect() {
        ScopeError::UnavailableModel(format!(
            "cannot connect to {} at {}",
            config.name, config.base_url
        ))
    } else if err.is_timeout() {
        ScopeError::UnavailableModel(format!(
            "{} request timed out after {}s",
            config.name, config.timeout_secs
        ))
    } else {
        ScopeError::UnavailableModel(format!("{} request failed: {}", config.name, err))
    }
}

/// 检查响应状态，非成功状态视为模型不可用
pub(crate) async fn ensure_success(
    config: &EndpointConfig,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("{} returned {}: {}", config.name, status, body);
    Err(ScopeError::UnavailableModel(format!(
        "{} returned HTTP {}",
        config.name,
        status.as_u16()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_ignores_blank_token() {
        assert_eq!(AuthenticationConfig::bearer(None), AuthenticationConfig::None);
        assert_eq!(AuthenticationConfig::bearer(Some(" \n")), AuthenticationConfig::None);
        assert_eq!(
            AuthenticationConfig::bearer(Some("hf_abc\n")),
            AuthenticationConfig::BearerToken { token: "hf_abc".to_string() }
        );
    }

    #[test]
    fn test_endpoint_url() {
        let config = EndpointConfig::new("vision", "http://localhost:11434/", "medgemma");
        assert_eq!(config.url("/api/chat"), "http://localhost:11434/api/chat");
        assert_eq!(config.url("api/chat"), "http://localhost:11434/api/chat");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let config =
            EndpointConfig::new("vision", "http://127.0.0.1:9", "medgemma").with_timeout(2);
        let client = config.build_client().unwrap();
        let err = client
            .get(config.url("/api/tags"))
            .send()
            .await
            .map_err(|e| map_transport_error(&config, e))
            .unwrap_err();
        assert!(matches!(err, ScopeError::UnavailableModel(_)));
    }
}
