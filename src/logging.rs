//! 日志初始化
//!
//! 控制台层输出到 stderr（stdout 留给命令输出），同时写入数据
//! 目录下按天滚动的日志文件。

use std::path::Path;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// 初始化日志系统
///
/// 返回的 guard 在进程退出前必须保持存活，否则文件日志的
/// 后台写入线程会提前结束。
pub fn init(log_dir: &Path, verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    if std::fs::create_dir_all(log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::daily(log_dir, "foldersync.log");
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_target(false);

        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer);

        let _ = tracing::subscriber::set_global_default(subscriber);
        Some(guard)
    } else {
        // 日志目录创建失败，回退到纯控制台
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer);

        let _ = tracing::subscriber::set_global_default(subscriber);
        None
    }
}
