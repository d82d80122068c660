//! # HemoScope管理模块
//!
//! 服务运行所需的配置加载、校验、保存，以及日志初始化

pub mod config;
pub mod logging;

pub use config::{
    AdvisorConfig, ClassifierConfig, ConfigLoader, ConfigValidator, LoggingConfig, ScopeConfig,
    ServerConfig,
};
pub use logging::{init_tracing, LogHandle, BOOTSTRAP_LEVEL};
