use std::time::Duration;

use thiserror::Error;

use crate::network::NetworkError;

/// 评测会话错误
///
/// 每次评测调用最多产生一个错误，且与会话终态一一对应：
/// `InvalidInput` 时会话保持 `Idle`，`Timeout` 对应 `TimedOut`，
/// 其余对应 `Failed`。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssessmentError {
    /// 参考文本或音频不合法，未建立连接
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 连接失败、传输中断或连接提前关闭
    #[error("Connection error: {0}")]
    Connection(String),

    /// 服务返回非零错误码
    #[error("Service error {code}: {message}")]
    Service { code: i64, message: String },

    /// 超时未收到最终结果
    #[error("Assessment timed out after {0:?}")]
    Timeout(Duration),

    /// 最终帧内容无法解码
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl AssessmentError {
    /// 检查是否为服务端返回的错误
    pub fn is_service_error(&self) -> bool {
        matches!(self, Self::Service { .. })
    }

    /// 服务错误码（如果有）
    pub fn service_code(&self) -> Option<i64> {
        match self {
            Self::Service { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<NetworkError> for AssessmentError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::ProtocolError(msg) => AssessmentError::Protocol(msg),
            NetworkError::InvalidConfig(msg) => AssessmentError::InvalidInput(msg),
            other => AssessmentError::Connection(other.to_string()),
        }
    }
}

/// 评测结果类型
pub type AssessmentResult<T> = Result<T, AssessmentError>;
