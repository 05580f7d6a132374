//! 统一配置中心
//!
//! 提供聊天服务的全局配置，包括：
//! - 监听地址
//! - 会话策略（空闲超时、单行长度上限）
//!
//! 加载顺序：内置默认值 -> 可选配置文件（`CHATROOM_CONFIG_FILE`）-> 环境变量（`CHATROOM_*`，
//! 嵌套字段用 `__` 分隔，例如 `CHATROOM_SERVER__PORT=9000`）。

use std::time::Duration;

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_VAR: &str = "CHATROOM_CONFIG_FILE";
pub const ENV_PREFIX: &str = "CHATROOM_";

/// 单行长度上限的最小允许值
const MIN_LINE_LENGTH: usize = 64;

/// 全局应用配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 会话配置
    #[serde(default)]
    pub session: SessionConfig,
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
        }
    }
}

/// 会话配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 无任何入站数据多久后踢出
    pub idle_timeout_secs: u64,
    /// 单行最大字节数，超出的行被丢弃
    pub max_line_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 60,
            max_line_length: 4096,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl AppConfig {
    /// 按默认值、配置文件、环境变量的顺序加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment().extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// 组装配置来源，后合并的覆盖先合并的
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var(CONFIG_FILE_VAR) {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                figment = figment.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                figment = figment.merge(Json::file(path));
            } else {
                figment = figment.merge(Toml::file(path));
            }
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidServerConfig(
                "host cannot be empty".to_string(),
            ));
        }

        if self.session.idle_timeout_secs == 0 {
            return Err(ConfigError::InvalidSessionConfig(
                "idle timeout must be greater than 0".to_string(),
            ));
        }

        if self.session.max_line_length < MIN_LINE_LENGTH {
            return Err(ConfigError::InvalidSessionConfig(format!(
                "max line length must be at least {MIN_LINE_LENGTH} bytes"
            )));
        }

        Ok(())
    }

    /// 监听地址，形如 `127.0.0.1:8888`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid session configuration: {0}")]
    InvalidSessionConfig(String),
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}
