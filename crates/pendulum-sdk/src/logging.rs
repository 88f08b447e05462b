//! 日志初始化
//!
//! 安装 `tracing-subscriber` 的 fmt 输出，过滤规则取自 `RUST_LOG`，
//! 同时把 `log` crate 的记录桥接到 tracing。

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Global tracing subscriber already set: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Failed to install log bridge: {0}")]
    LogBridge(String),
}

/// 以 `info` 为默认级别初始化日志
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_default("info")
}

/// 初始化日志，`RUST_LOG` 未设置时使用 `default_directive`
///
/// 进程内只能成功调用一次。
pub fn init_logging_with_default(default_directive: &str) -> Result<(), LoggingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing_log::LogTracer::init().map_err(|e| LoggingError::LogBridge(e.to_string()))?;
    Ok(())
}
