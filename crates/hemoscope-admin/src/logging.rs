//! 日志初始化
//!
//! `RUST_LOG` 优先于配置文件和命令行给出的级别。
//! 订阅者在读取配置之前安装，配置中的级别随后通过 [`LogHandle`] 生效。

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// 读取配置之前使用的级别
pub const BOOTSTRAP_LEVEL: &str = "info";

/// 解析日志过滤指令
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level.trim()).map_err(|e| anyhow!("Invalid log level `{}`: {}", level, e))
}

/// 运行中调整日志级别的句柄
#[derive(Clone)]
pub struct LogHandle {
    inner: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// 替换当前过滤器，设置了 `RUST_LOG` 时保持环境变量的指令
    pub fn set_level(&self, level: &str) -> Result<()> {
        let filter = build_filter(level)?;
        self.inner
            .reload(filter)
            .map_err(|e| anyhow!("Failed to update log level: {}", e))
    }
}

fn reloadable_filter(level: &str) -> Result<(reload::Layer<EnvFilter, Registry>, LogHandle)> {
    let (layer, inner) = reload::Layer::new(build_filter(level)?);
    Ok((layer, LogHandle { inner }))
}

/// 初始化全局 tracing 订阅者，只能调用一次
pub fn init_tracing(level: &str) -> Result<LogHandle> {
    let (filter, handle) = reloadable_filter(level)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("hemoscope_workflow=debug,tower_http=info,warn").is_ok());
    }

    #[test]
    fn test_level_applies_after_install() {
        let (layer, handle) = reloadable_filter(BOOTSTRAP_LEVEL).unwrap();
        let _subscriber = tracing_subscriber::registry().with(layer);

        assert!(handle.set_level("debug").is_ok());
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(handle.set_level("hemoscope=verbose").is_err());
        }
    }
}
