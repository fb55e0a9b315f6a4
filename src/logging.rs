//! 日志配置模块
//!
//! 聊天界面占用终端，日志只写入滚动文件；级别可用 RUST_LOG 覆盖。

use std::path::PathBuf;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志目录
const LOG_DIR: &str = "logs";

/// 日志文件前缀
const LOG_FILE_PREFIX: &str = "localchat";

/// 初始化日志系统
///
/// 返回的 guard 必须在进程存活期间持有，否则缓冲中的日志会丢失。
pub fn init() -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let log_dir = PathBuf::from(LOG_DIR);
    std::fs::create_dir_all(&log_dir)?;

    // 每天滚动一个日志文件
    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
