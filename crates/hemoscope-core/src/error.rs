//! 错误定义模块

use thiserror::Error;

/// 筛查系统统一错误类型
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("上传内容过大: 图像不能超过 {limit} 字节")]
    PayloadTooLarge { limit: usize },

    /// 模型服务无法连接或返回非成功状态
    #[error("模型服务不可用: {0}")]
    UnavailableModel(String),

    #[error("模型响应无法解析: {0}")]
    ModelResponse(String),

    #[error("报告生成错误: {0}")]
    Report(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl ScopeError {
    /// 是否属于调用方输入问题
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScopeError::Validation(_) | ScopeError::PayloadTooLarge { .. })
    }
}

/// 筛查系统统一结果类型
pub type Result<T> = std::result::Result<T, ScopeError>;
