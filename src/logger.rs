use crate::config::LoggingConfig;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking;
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const FILE_NAME_PREFIX: &str = "mute_user_bot";

/// 控制台按配置的级别输出，文件按天滚动并记录全部日志。
pub fn init_logger(path: &str, config: &LoggingConfig) -> non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(path, FILE_NAME_PREFIX);
    let (file_writer, guard) = non_blocking(file_appender);

    let stdout_layer = fmt::layer()
        .with_ansi(true)
        .with_target(true)
        .with_filter(LevelFilter::from(config.level));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_writer(file_writer)
        .with_filter(LevelFilter::TRACE);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}
