//! 应用配置模块
//!
//! 提供评测服务凭证、评测参数和流水线输出的加载、保存和管理功能
//!
//! 配置文件为 JSON，缺失的字段使用默认值；凭证也可以通过环境变量
//! `ISE_APP_ID`、`ISE_API_KEY`、`ISE_API_SECRET` 和 `ISE_HOST` 提供。
//!
//! # 使用示例
//!
//! ```no_run
//! use ise_client::config::{ConfigManager, GlobalConfig};
//!
//! // 加载配置并叠加环境变量
//! let config = ConfigManager::load_with_env("config.json").unwrap();
//!
//! // 放入全局配置
//! let global = GlobalConfig::new(config);
//! assert!(global.get().assessment.timeout_secs > 0);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assessment::{Category, Language, StreamOptions};
use crate::network::signer::{DEFAULT_HOST, DEFAULT_PATH};
use crate::network::{Credentials, ServiceEndpoint};

/// 应用 ID 环境变量
pub const ENV_APP_ID: &str = "ISE_APP_ID";

/// API Key 环境变量
pub const ENV_API_KEY: &str = "ISE_API_KEY";

/// API Secret 环境变量
pub const ENV_API_SECRET: &str = "ISE_API_SECRET";

/// 服务主机环境变量
pub const ENV_HOST: &str = "ISE_HOST";

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 凭证缺失
    #[error("Missing credentials: {0} is empty")]
    MissingCredentials(&'static str),
}

/// 配置结果类型
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 服务配置
    pub api: ApiConfig,
    /// 评测配置
    pub assessment: AssessmentConfig,
    /// 流水线配置
    pub pipeline: PipelineConfig,
}

/// 服务配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 应用 ID
    pub app_id: String,
    /// API Key
    pub api_key: String,
    /// API Secret
    pub api_secret: String,
    /// 服务主机
    pub host: String,
    /// 请求路径
    pub path: String,
    /// URL 协议（`wss`，本地测试可用 `ws`）
    pub scheme: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            host: DEFAULT_HOST.to_string(),
            path: DEFAULT_PATH.to_string(),
            scheme: "wss".to_string(),
        }
    }
}

impl ApiConfig {
    /// 检查凭证是否完整
    pub fn has_credentials(&self) -> bool {
        !self.app_id.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// 构建凭证
    ///
    /// # Errors
    ///
    /// 任一部分为空时返回 [`ConfigError::MissingCredentials`]
    pub fn credentials(&self) -> ConfigResult<Credentials> {
        for (name, value) in [
            ("app_id", &self.app_id),
            ("api_key", &self.api_key),
            ("api_secret", &self.api_secret),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingCredentials(name));
            }
        }

        Ok(Credentials::new(
            self.app_id.trim(),
            self.api_key.trim(),
            self.api_secret.trim(),
        ))
    }

    /// 构建服务地址
    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint::new(&self.host)
            .with_scheme(&self.scheme)
            .with_path(&self.path)
    }
}

/// 评测配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    /// 评测语种
    pub language: Language,
    /// 默认题型
    pub category: Category,
    /// 会话超时（秒）
    pub timeout_secs: u64,
    /// 音频帧大小（字节）
    pub frame_size: usize,
    /// 音频帧间隔（毫秒）
    pub frame_interval_ms: u64,
    /// 握手超时（毫秒）
    pub connect_timeout_ms: u64,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            language: Language::Cn,
            category: Category::ReadSentence,
            timeout_secs: 15,
            frame_size: 1280,
            frame_interval_ms: 40,
            connect_timeout_ms: 10_000,
        }
    }
}

impl AssessmentConfig {
    /// 会话超时
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 音频流发送参数
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            frame_size: self.frame_size,
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            connect_timeout_ms: self.connect_timeout_ms,
        }
    }
}

/// 流水线配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 反馈语音的输出文件
    pub feedback_audio_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feedback_audio_path: PathBuf::from("feedback.wav"),
        }
    }
}

/// 配置管理器
///
/// 提供配置的加载、保存和环境变量叠加
pub struct ConfigManager;

impl ConfigManager {
    /// 加载配置
    ///
    /// 文件不存在时返回默认配置
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
        let path = path.as_ref();

        tracing::debug!(path = %path.display(), "Loading config");

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = serde_json::from_str(&content)?;
            tracing::info!(path = %path.display(), "Config loaded successfully");
            Ok(config)
        } else {
            tracing::info!("Config file not found, using defaults");
            Ok(AppConfig::default())
        }
    }

    /// 加载配置并叠加进程环境变量
    pub fn load_with_env(path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
        let mut config = Self::load(path)?;
        Self::apply_env(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// 保存配置
    ///
    /// 父目录不存在时自动创建
    pub fn save(path: impl AsRef<Path>, config: &AppConfig) -> ConfigResult<()> {
        let path = path.as_ref();

        tracing::debug!(path = %path.display(), "Saving config");

        // 确保目录存在
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(path, content)?;

        tracing::info!(path = %path.display(), "Config saved successfully");
        Ok(())
    }

    /// 用环境变量覆盖凭证和主机
    ///
    /// `lookup` 在生产环境中通常是 `std::env::var`，空值会被忽略
    pub fn apply_env<F>(config: &mut AppConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut String); 4] = [
            (ENV_APP_ID, &mut config.api.app_id),
            (ENV_API_KEY, &mut config.api.api_key),
            (ENV_API_SECRET, &mut config.api.api_secret),
            (ENV_HOST, &mut config.api.host),
        ];

        for (key, field) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(key, "Config overridden from environment");
                *field = value;
            }
        }
    }

    /// 重置为默认配置
    pub fn reset(path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
        let config = AppConfig::default();
        Self::save(path, &config)?;
        tracing::info!("Config reset to defaults");
        Ok(config)
    }
}

/// 全局配置状态
///
/// 使用 ArcSwap 实现无锁读取，每次评测读取一份快照
pub struct GlobalConfig {
    config: ArcSwap<AppConfig>,
}

impl GlobalConfig {
    /// 创建新的全局配置
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: ArcSwap::new(Arc::new(config)),
        }
    }

    /// 获取当前配置
    pub fn get(&self) -> Arc<AppConfig> {
        self.config.load_full()
    }

    /// 更新配置
    pub fn update(&self, config: AppConfig) {
        self.config.store(Arc::new(config));
    }

    /// 更新凭证
    pub fn set_credentials(
        &self,
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) {
        let mut config = (*self.config.load_full()).clone();
        config.api.app_id = app_id.into();
        config.api.api_key = api_key.into();
        config.api.api_secret = api_secret.into();
        self.config.store(Arc::new(config));
    }

    /// 检查凭证是否已配置
    pub fn has_credentials(&self) -> bool {
        self.config.load().api.has_credentials()
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
