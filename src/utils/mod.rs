mod logger;
mod config;

pub use logger::{parse_log_level, setup_logger, setup_logger_from_config, LoggerError};
pub use config::{ConfigError, DhtConfig};

/// 获取库版本
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 获取库名称
pub fn name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
