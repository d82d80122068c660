//! 配置管理
//!
//! 加载顺序：内置默认值 → TOML 文件 → `HEMOSCOPE_` 前缀环境变量 → 模型凭据环境变量。
//! 嵌套字段用 `__` 分隔，例如 `HEMOSCOPE_SERVER__PORT=8080`。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use hemoscope_integration::{AuthenticationConfig, ConfidenceCalibration, EndpointConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// 图像模型凭据
pub const HF_TOKEN_VAR: &str = "HF_TOKEN";
/// 文本模型凭据，缺失时临床顾问使用固定建议
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";

const ENV_PREFIX: &str = "HEMOSCOPE";

/// HemoScope完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub server: ServerConfig,
    pub classifier: ClassifierConfig,
    pub advisor: AdvisorConfig,
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 上传图像的最大字节数
    pub max_upload_bytes: usize,
}

/// 图像分类模型配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub calibration: ConfidenceCalibration,
}

/// 临床顾问文本模型配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter 指令，例如 `info` 或 `hemoscope_workflow=debug,info`
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
            max_upload_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "medgemma-leukemia".to_string(),
            timeout_secs: 120,
            api_token: None,
            calibration: ConfidenceCalibration::default(),
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            temperature: 0.3,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ClassifierConfig {
    /// 图像模型端点，HF_TOKEN 作为 Bearer 令牌
    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig::new("classifier", &self.base_url, &self.model)
            .with_timeout(self.timeout_secs)
            .with_authentication(AuthenticationConfig::bearer(self.api_token.as_deref()))
    }
}

impl AdvisorConfig {
    /// 未配置 API 密钥时返回 None
    pub fn endpoint(&self) -> Option<EndpointConfig> {
        let key = non_blank(self.api_key.as_deref())?;
        Some(
            EndpointConfig::new("advisor", &self.base_url, &self.model)
                .with_timeout(self.timeout_secs)
                .with_authentication(AuthenticationConfig::ApiKey {
                    key: key.to_string(),
                    header: Some("x-goog-api-key".to_string()),
                }),
        )
    }
}

impl ScopeConfig {
    /// 序列化为 TOML，不写出凭据
    pub fn to_toml(&self) -> Result<String> {
        let mut redacted = self.clone();
        redacted.classifier.api_token = None;
        redacted.advisor.api_key = None;
        toml::to_string_pretty(&redacted).context("Failed to serialize configuration")
    }

    /// 保存配置到文件
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write configuration file {}", path.display()))?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }
}

/// 配置加载器
#[derive(Debug, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    /// 替代进程环境变量，测试使用
    env: Option<HashMap<String, String>>,
    validator: ConfigValidator,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let value = match &self.env {
            Some(env) => env.get(key).cloned(),
            None => std::env::var(key).ok(),
        };
        non_blank(value.as_deref()).map(str::to_string)
    }

    /// 加载并校验配置
    pub fn load(&self) -> Result<ScopeConfig> {
        let defaults = Config::try_from(&ScopeConfig::default())
            .context("Failed to build default configuration")?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = &self.path {
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env.clone()),
        );

        let hf_token = self.lookup(HF_TOKEN_VAR);
        let google_api_key = self.lookup(GOOGLE_API_KEY_VAR);
        debug!(
            hf_token = hf_token.is_some(),
            google_api_key = google_api_key.is_some(),
            "Model credentials discovered"
        );
        builder = builder
            .set_override_option("classifier.api_token", hf_token)?
            .set_override_option("advisor.api_key", google_api_key)?;

        let config: ScopeConfig = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        self.validator.validate(&config)?;

        match &self.path {
            Some(path) => info!("Configuration loaded successfully from: {}", path.display()),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    field_path: &'static str,
    validator: fn(&ScopeConfig) -> Result<()>,
}

fn require_url(name: &str, url: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        anyhow::bail!("{} endpoint cannot be empty", name);
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("{} endpoint must be an http(s) URL: {}", name, url);
    }
    Ok(())
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "server.port",
                validator: |config| {
                    if config.server.port == 0 {
                        anyhow::bail!("Server port cannot be 0");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "server.max_upload_bytes",
                validator: |config| {
                    if config.server.max_upload_bytes == 0 {
                        anyhow::bail!("Upload limit cannot be 0");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "classifier.base_url",
                validator: |config| require_url("Classifier", &config.classifier.base_url),
            },
            ValidationRule {
                field_path: "classifier.model",
                validator: |config| {
                    if config.classifier.model.trim().is_empty() {
                        anyhow::bail!("Classifier model cannot be empty");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "classifier.calibration",
                validator: |config| {
                    let c = &config.classifier.calibration;
                    let labels = [
                        ("normal", c.normal),
                        ("leukemia", c.leukemia),
                        ("uncertain", c.uncertain),
                    ];
                    for (label, value) in labels {
                        if !(0.0..=1.0).contains(&value) {
                            anyhow::bail!(
                                "Confidence for {} must be within [0, 1], got {}",
                                label,
                                value
                            );
                        }
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "advisor.base_url",
                validator: |config| require_url("Advisor", &config.advisor.base_url),
            },
            ValidationRule {
                field_path: "advisor.model",
                validator: |config| {
                    if config.advisor.model.trim().is_empty() {
                        anyhow::bail!("Advisor model cannot be empty");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "advisor.temperature",
                validator: |config| {
                    if !(0.0..=2.0).contains(&config.advisor.temperature) {
                        anyhow::bail!("Advisor temperature must be within [0, 2]");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    if config.logging.level.trim().is_empty() {
                        anyhow::bail!("Log level cannot be empty");
                    }
                    Ok(())
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置，遇到第一条失败的规则即返回
    pub fn validate(&self, config: &ScopeConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(e.context(format!("Invalid configuration value `{}`", rule.field_path)));
            }
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
