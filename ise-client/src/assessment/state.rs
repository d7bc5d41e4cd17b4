use serde::Serialize;
use thiserror::Error;

/// 评测会话状态
///
/// 一次评测从 `Idle` 出发，最终停在三个终态之一：
/// `Completed`、`Failed` 或 `TimedOut`。终态不可再转换，任何状态都不会被重复进入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// 尚未开始
    Idle,

    /// 正在建立连接
    Connecting,

    /// 连接已建立
    Open,

    /// 正在发送控制帧和音频帧
    Sending,

    /// 音频发送完毕，等待最终结果
    AwaitingResult,

    /// 收到最终结果
    Completed,

    /// 连接失败或服务返回错误
    Failed(String),

    /// 超时未收到最终结果
    TimedOut,
}

impl SessionState {
    /// 创建失败状态
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self::Failed(diagnostic.into())
    }

    /// 检查是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::TimedOut)
    }

    /// 检查是否成功完成
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// 检查是否失败
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// 检查是否超时
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// 获取失败诊断信息（如果处于失败状态）
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    /// 获取状态名称（用于日志和调试）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Open => "Open",
            Self::Sending => "Sending",
            Self::AwaitingResult => "AwaitingResult",
            Self::Completed => "Completed",
            Self::Failed(_) => "Failed",
            Self::TimedOut => "TimedOut",
        }
    }

    /// 验证状态转换是否合法
    fn can_transition_to(&self, to: &SessionState) -> bool {
        use SessionState::*;

        match (self, to) {
            (Idle, Connecting) => true,

            (Connecting, Open) => true,

            (Open, Sending) => true,

            (Sending, AwaitingResult) => true,
            // 服务端在音频发完前就给出最终结果
            (Sending, Completed) => true,

            (AwaitingResult, Completed) => true,

            // 连接之后的任何非终态都可能失败或超时
            (Connecting | Open | Sending | AwaitingResult, Failed(_) | TimedOut) => true,

            _ => false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// 状态相关错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// 无效的状态转换
    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

/// 会话状态机
///
/// 记录当前状态与完整的转换历史，只由会话驱动方修改
///
/// # Examples
///
/// ```
/// use ise_client::assessment::{SessionState, SessionStateMachine};
///
/// let mut machine = SessionStateMachine::new();
///
/// // 合法转换
/// assert!(machine.transition(SessionState::Connecting).is_ok());
///
/// // 非法转换
/// assert!(machine.transition(SessionState::AwaitingResult).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    current: SessionState,
    history: Vec<SessionState>,
}

impl SessionStateMachine {
    /// 创建处于 `Idle` 的状态机
    pub fn new() -> Self {
        Self {
            current: SessionState::Idle,
            history: vec![SessionState::Idle],
        }
    }

    /// 获取当前状态
    pub fn current(&self) -> &SessionState {
        &self.current
    }

    /// 获取转换历史（包含初始的 `Idle`）
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// 转换到新状态
    ///
    /// # Errors
    ///
    /// 如果状态转换不合法，返回 [`StateError::InvalidTransition`]，当前状态不变
    pub fn transition(&mut self, new_state: SessionState) -> Result<(), StateError> {
        if !self.current.can_transition_to(&new_state) {
            return Err(StateError::InvalidTransition {
                from: self.current.clone(),
                to: new_state,
            });
        }

        tracing::debug!(from = self.current.name(), to = new_state.name(), "Session state changed");

        self.current = new_state.clone();
        self.history.push(new_state);
        Ok(())
    }

    /// 获取历史中的状态名称序列
    pub fn history_names(&self) -> Vec<&'static str> {
        self.history.iter().map(SessionState::name).collect()
    }

    /// 转换为历史记录
    pub fn into_history(self) -> Vec<SessionState> {
        self.history
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut machine = SessionStateMachine::new();

        for state in [
            SessionState::Connecting,
            SessionState::Open,
            SessionState::Sending,
            SessionState::AwaitingResult,
            SessionState::Completed,
        ] {
            machine.transition(state).unwrap();
        }

        assert!(machine.current().is_completed());
        assert_eq!(
            machine.history_names(),
            vec!["Idle", "Connecting", "Open", "Sending", "AwaitingResult", "Completed"]
        );
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut machine = SessionStateMachine::new();
        machine.transition(SessionState::Connecting).unwrap();
        machine.transition(SessionState::TimedOut).unwrap();

        assert!(machine.transition(SessionState::Completed).is_err());
        assert!(machine.transition(SessionState::failed("late")).is_err());
        assert!(machine.current().is_timed_out());
    }

    #[test]
    fn test_no_reentry() {
        let mut machine = SessionStateMachine::new();
        machine.transition(SessionState::Connecting).unwrap();

        let err = machine.transition(SessionState::Connecting).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                from: SessionState::Connecting,
                to: SessionState::Connecting,
            }
        );
    }

    #[test]
    fn test_idle_cannot_fail_directly() {
        let mut machine = SessionStateMachine::new();
        assert!(machine.transition(SessionState::failed("x")).is_err());
        assert_eq!(machine.current(), &SessionState::Idle);
    }

    #[test]
    fn test_failure_during_sending() {
        let mut machine = SessionStateMachine::new();
        machine.transition(SessionState::Connecting).unwrap();
        machine.transition(SessionState::Open).unwrap();
        machine.transition(SessionState::Sending).unwrap();
        machine
            .transition(SessionState::failed("Service error 10163: param invalid"))
            .unwrap();

        assert_eq!(
            machine.current().diagnostic(),
            Some("Service error 10163: param invalid")
        );
        assert!(machine.current().is_terminal());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::AwaitingResult.name(), "AwaitingResult");
        assert_eq!(SessionState::failed("x").name(), "Failed");
        assert_eq!(SessionState::default(), SessionState::Idle);
    }
}
