//! 应用层错误
//!
//! `AppError` 汇总网络、评测、题型和配置错误，并补充外部协作方错误。
//! 展示端通过 [`ErrorCode`] 区分错误，通过 [`ErrorContext`] 拿到
//! 可直接显示的中文提示、恢复建议以及是否可以重新评测。
//!
//! ```
//! use ise_client::assessment::AssessmentError;
//! use ise_client::utils::error::{AppError, ErrorCode};
//!
//! let err: AppError = AssessmentError::Service {
//!     code: 10163,
//!     message: "param invalid".to_string(),
//! }
//! .into();
//!
//! assert_eq!(err.code(), ErrorCode::AssessmentServiceError);
//! assert_eq!(err.context().service_code, Some(10163));
//! assert!(err.is_retryable());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assessment::{AssessmentError, CategoryError};
use crate::config::ConfigError;
use crate::network::error::NetworkError;

/// 一轮评测中可能出现的全部错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 网络错误
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// 评测错误
    #[error("Assessment error: {0}")]
    Assessment(#[from] AssessmentError),

    /// 题型错误
    #[error("Category error: {0}")]
    Category(#[from] CategoryError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 外部协作方（录音、识别、合成、反馈、展示）失败
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 错误代码
///
/// 用于展示端识别和处理特定错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 网络错误 (2xxx)
    /// 连接失败
    NetworkConnectionFailed,
    /// 认证失败（签名或凭证无效）
    NetworkAuthFailed,
    /// 协议错误
    NetworkProtocolError,
    /// 连接超时
    NetworkTimeout,

    // 评测错误 (3xxx)
    /// 音频或参考文本无效
    AssessmentInvalidInput,
    /// 评测连接失败
    AssessmentConnectionFailed,
    /// 服务返回错误码
    AssessmentServiceError,
    /// 评测超时
    AssessmentTimeout,
    /// 结果无法解码
    AssessmentProtocolError,

    // 题型错误
    /// 当前语种不支持该题型
    CategoryUnsupported,
    /// 未知题型或语种
    CategoryUnknown,

    // 配置错误 (4xxx)
    /// 配置加载失败
    ConfigLoadFailed,
    /// 配置无效
    ConfigInvalid,
    /// 凭证缺失
    ConfigMissingCredentials,

    // 通用错误 (9xxx)
    /// 外部协作方失败
    CollaboratorFailed,
    /// 内部错误
    InternalError,
}

/// 推送给展示端的错误描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub code: ErrorCode,
    /// 中文提示
    pub message: String,
    /// 原始错误文本，只用于日志
    pub detail: String,
    pub recovery_hint: Option<String>,
    /// 评测服务返回的错误码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_code: Option<i64>,
    pub recoverable: bool,
    /// 是否可以直接重新评测
    pub retryable: bool,
}

impl AppError {
    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            // 网络错误
            AppError::Network(NetworkError::AuthenticationFailed(_)) => ErrorCode::NetworkAuthFailed,
            AppError::Network(NetworkError::ProtocolError(_)) => ErrorCode::NetworkProtocolError,
            AppError::Network(NetworkError::Timeout(_)) => ErrorCode::NetworkTimeout,
            AppError::Network(_) => ErrorCode::NetworkConnectionFailed,

            // 评测错误
            AppError::Assessment(AssessmentError::InvalidInput(_)) => {
                ErrorCode::AssessmentInvalidInput
            }
            AppError::Assessment(AssessmentError::Connection(_)) => {
                ErrorCode::AssessmentConnectionFailed
            }
            AppError::Assessment(AssessmentError::Service { .. }) => {
                ErrorCode::AssessmentServiceError
            }
            AppError::Assessment(AssessmentError::Timeout(_)) => ErrorCode::AssessmentTimeout,
            AppError::Assessment(AssessmentError::Protocol(_)) => {
                ErrorCode::AssessmentProtocolError
            }

            // 题型错误
            AppError::Category(CategoryError::Unsupported { .. }) => ErrorCode::CategoryUnsupported,
            AppError::Category(_) => ErrorCode::CategoryUnknown,

            // 配置错误
            AppError::Config(ConfigError::Io(_)) => ErrorCode::ConfigLoadFailed,
            AppError::Config(ConfigError::Json(_)) => ErrorCode::ConfigInvalid,
            AppError::Config(ConfigError::MissingCredentials(_)) => {
                ErrorCode::ConfigMissingCredentials
            }

            // 通用错误
            AppError::Collaborator(_) => ErrorCode::CollaboratorFailed,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// 获取用户友好的错误消息
    ///
    /// 返回适合直接显示给用户的错误消息
    pub fn user_message(&self) -> String {
        match self {
            // 网络错误
            AppError::Network(NetworkError::AuthenticationFailed(_)) => {
                "评测服务拒绝了认证，请检查 API 凭证".to_string()
            }
            AppError::Network(NetworkError::Timeout(_)) => {
                "连接超时，请检查网络状况".to_string()
            }
            AppError::Network(NetworkError::ConnectionClosed) => {
                "连接已断开，请重试".to_string()
            }
            AppError::Network(_) => "网络错误，请检查网络连接".to_string(),

            // 评测错误
            AppError::Assessment(AssessmentError::InvalidInput(_)) => {
                "录音为空或无效，请重新录音".to_string()
            }
            AppError::Assessment(AssessmentError::Connection(_)) => {
                "无法连接到评测服务，请检查网络连接".to_string()
            }
            AppError::Assessment(AssessmentError::Service { code, .. }) => {
                format!("评测服务返回错误（错误码 {}），请重试", code)
            }
            AppError::Assessment(AssessmentError::Timeout(timeout)) => {
                format!("评测超时（{} 秒），请重试", timeout.as_secs())
            }
            AppError::Assessment(AssessmentError::Protocol(_)) => {
                "评测结果无法解析，请重试".to_string()
            }

            // 题型错误
            AppError::Category(CategoryError::Unsupported { .. }) => {
                "当前语种不支持该题型".to_string()
            }
            AppError::Category(_) => "未知的题型或语种".to_string(),

            // 配置错误
            AppError::Config(ConfigError::Io(_)) => "无法读取配置文件".to_string(),
            AppError::Config(ConfigError::Json(_)) => "配置文件格式错误".to_string(),
            AppError::Config(ConfigError::MissingCredentials(_)) => {
                "尚未配置评测服务凭证".to_string()
            }

            // 通用错误
            AppError::Collaborator(msg) => format!("外部服务出错: {}", msg),
            AppError::Internal(msg) => format!("内部错误: {}", msg),
        }
    }

    /// 展示端使用的错误描述
    pub fn context(&self) -> ErrorContext {
        let service_code = match self {
            AppError::Assessment(err) => err.service_code(),
            _ => None,
        };

        ErrorContext {
            code: self.code(),
            message: self.user_message(),
            detail: self.to_string(),
            recovery_hint: self.recovery_hint(),
            service_code,
            recoverable: self.is_recoverable(),
            retryable: self.is_retryable(),
        }
    }

    /// 获取恢复建议
    pub fn recovery_hint(&self) -> Option<String> {
        match self {
            AppError::Network(NetworkError::AuthenticationFailed(_))
            | AppError::Config(ConfigError::MissingCredentials(_)) => Some(
                "请设置 ISE_APP_ID、ISE_API_KEY 和 ISE_API_SECRET，或在配置文件中填写凭证"
                    .to_string(),
            ),
            AppError::Assessment(AssessmentError::InvalidInput(_)) => {
                Some("请确认录音文件存在且为 16 kHz 16 位单声道音频".to_string())
            }
            AppError::Assessment(AssessmentError::Connection(_))
            | AppError::Network(NetworkError::ConnectionFailed(_)) => {
                Some("请检查网络连接，或稍后重试".to_string())
            }
            AppError::Assessment(AssessmentError::Timeout(_)) => {
                Some("请缩短录音或在配置中增加超时时间".to_string())
            }
            AppError::Category(CategoryError::Unsupported { language, .. }) => Some(format!(
                "可用题型: {}",
                language
                    .categories()
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            _ => None,
        }
    }

    /// 检查错误是否可恢复
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::Config(_) | AppError::Internal(_))
    }

    /// 检查是否是超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AppError::Assessment(AssessmentError::Timeout(_))
                | AppError::Network(NetworkError::Timeout(_))
        )
    }

    /// 检查是否适合提示用户重新评测
    ///
    /// 只有会话终止类错误（连接、服务、超时）可以重试，输入错误需要先修正
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Assessment(
                AssessmentError::Connection(_)
                    | AssessmentError::Service { .. }
                    | AssessmentError::Timeout(_)
            ) | AppError::Network(
                NetworkError::ConnectionFailed(_)
                    | NetworkError::Timeout(_)
                    | NetworkError::ConnectionClosed
            )
        )
    }

    /// 检查是否是认证错误
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::Network(NetworkError::AuthenticationFailed(_))
                | AppError::Config(ConfigError::MissingCredentials(_))
        )
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{Category, Language};
    use std::time::Duration;

    #[test]
    fn test_error_code() {
        let err = AppError::Network(NetworkError::AuthenticationFailed(401));
        assert_eq!(err.code(), ErrorCode::NetworkAuthFailed);

        let err = AppError::Assessment(AssessmentError::Timeout(Duration::from_secs(15)));
        assert_eq!(err.code(), ErrorCode::AssessmentTimeout);

        let err = AppError::Config(ConfigError::MissingCredentials("api_key"));
        assert_eq!(err.code(), ErrorCode::ConfigMissingCredentials);
    }

    #[test]
    fn test_user_message() {
        let err = AppError::Assessment(AssessmentError::InvalidInput("empty".to_string()));
        assert!(err.user_message().contains("录音"));

        let err = AppError::Assessment(AssessmentError::Service {
            code: 68675,
            message: "audio invalid".to_string(),
        });
        assert!(err.user_message().contains("68675"));

        let err = AppError::Assessment(AssessmentError::Timeout(Duration::from_secs(15)));
        assert!(err.user_message().contains("15"));
    }

    #[test]
    fn test_service_error_context() {
        let err = AppError::Assessment(AssessmentError::Service {
            code: 11201,
            message: "licc limit".to_string(),
        });
        let ctx = err.context();

        assert_eq!(ctx.code, ErrorCode::AssessmentServiceError);
        assert_eq!(ctx.service_code, Some(11201));
        assert!(ctx.detail.contains("licc limit"));
        assert!(ctx.retryable);
        assert!(ctx.recoverable);
    }

    #[test]
    fn test_auth_context_has_hint() {
        let ctx = AppError::Network(NetworkError::AuthenticationFailed(403)).context();

        assert_eq!(ctx.code, ErrorCode::NetworkAuthFailed);
        assert!(ctx.recovery_hint.unwrap().contains("ISE_API_KEY"));
        assert_eq!(ctx.service_code, None);
        assert!(!ctx.retryable);
    }

    #[test]
    fn test_recoverable() {
        let err = AppError::Assessment(AssessmentError::Connection("refused".to_string()));
        assert!(err.is_recoverable());

        let err = AppError::Internal("fatal".to_string());
        assert!(!err.is_recoverable());
        assert!(!err.context().recoverable);
    }

    #[test]
    fn test_error_predicates() {
        let err = AppError::Assessment(AssessmentError::Timeout(Duration::from_secs(1)));
        assert!(err.is_timeout());
        assert!(err.is_retryable());

        let err = AppError::Assessment(AssessmentError::InvalidInput("empty".to_string()));
        assert!(!err.is_retryable());

        let err = AppError::Config(ConfigError::MissingCredentials("app_id"));
        assert!(err.is_auth_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_category_recovery_hint() {
        let err = AppError::Category(CategoryError::Unsupported {
            category: Category::Topic,
            language: Language::Cn,
        });

        let hint = err.recovery_hint().unwrap();
        assert!(hint.contains("read_syllable"));
        assert!(!hint.contains("topic"));
    }

    #[test]
    fn test_context_json_for_presenter() {
        let err = AppError::Assessment(AssessmentError::Timeout(Duration::from_secs(15)));
        let json = serde_json::to_value(err.context()).unwrap();

        assert_eq!(json["code"], "ASSESSMENT_TIMEOUT");
        assert_eq!(json["retryable"], true);
        assert!(json.get("service_code").is_none());

        let back: ErrorContext = serde_json::from_value(json).unwrap();
        assert_eq!(back, err.context());
    }

    #[test]
    fn test_internal_from_str() {
        let err: AppError = "receiver task panicked".into();
        assert!(matches!(err, AppError::Internal(ref msg) if msg == "receiver task panicked"));
        assert!(!err.is_recoverable());
    }
}
