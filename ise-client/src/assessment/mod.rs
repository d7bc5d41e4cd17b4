//! 发音评测
//!
//! 提供语种与题型模型、会话状态机、单次评测会话以及对外的客户端。

pub mod category;
pub mod client;
pub mod error;
pub mod session;
pub mod state;

pub use category::{Category, CategoryError, CategorySelector, Language};
pub use client::IseClient;
pub use error::{AssessmentError, AssessmentResult};
pub use session::{
    AssessmentRequest, AssessmentSession, SessionOutcome, StreamOptions, DEFAULT_SESSION_TIMEOUT,
};
pub use state::{SessionState, SessionStateMachine, StateError};
