use crate::utils::DhtConfig;
use env_logger::{Builder, Env};
use log::{LevelFilter, SetLoggerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(#[from] SetLoggerError),
}

/// 设置日志记录器
///
/// `RUST_LOG` 优先于传入的级别。已经安装过日志记录器时返回错误。
pub fn setup_logger(level: Option<LevelFilter>) -> Result<(), LoggerError> {
    let default_level = level_to_string(level.unwrap_or(LevelFilter::Info));
    let env = Env::default().default_filter_or(default_level);

    Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()?;

    Ok(())
}

/// 按配置中的日志级别设置日志记录器
pub fn setup_logger_from_config(config: &DhtConfig) -> Result<(), LoggerError> {
    let level = parse_log_level(&config.log_level)?;
    setup_logger(Some(level))
}

fn level_to_string(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

/// 从字符串解析日志级别，不区分大小写
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter, LoggerError> {
    match level_str.to_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        _ => Err(LoggerError::InvalidLevel(level_str.to_string())),
    }
}
