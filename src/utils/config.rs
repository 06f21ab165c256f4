use crate::dht::{ping::DEFAULT_PING_TIMEOUT, DEFAULT_SHARED_KEY_CACHE_SIZE};
use crate::utils::parse_log_level;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// DHT配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DhtConfig {
    /// 共享密钥缓存大小（0 表示禁用）
    pub shared_key_cache_size: usize,

    /// Ping超时时间（秒）
    pub ping_timeout_secs: u64,

    /// 日志级别
    pub log_level: String,
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            shared_key_cache_size: DEFAULT_SHARED_KEY_CACHE_SIZE,
            ping_timeout_secs: DEFAULT_PING_TIMEOUT.as_secs(),
            log_level: "info".to_string(),
        }
    }
}

impl DhtConfig {
    /// 从文件加载配置
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // 文件不存在时使用默认配置
        if !path.exists() {
            return Ok(Self::default());
        }

        let mut file = File::open(path)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;

        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        // 确保目录存在
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;

        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;

        Ok(())
    }

    /// 检查配置值是否有效
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "ping_timeout_secs must be greater than zero".to_string(),
            ));
        }

        self.log_level_filter()?;

        Ok(())
    }

    /// 配置中的日志级别
    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        parse_log_level(&self.log_level).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}
