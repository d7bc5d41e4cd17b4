/// Network communication with the assessment service
///
/// This module provides request signing, the frame codec, the WebSocket
/// connection and the concurrent send/receive tasks.

/// WebSocket connection management
pub mod connection;

/// Network error types
pub mod error;

/// Wire frame definitions
pub mod messages;

/// Authenticated URL construction
pub mod signer;

/// Async tasks for the send and receive sides of a session
pub mod tasks;

// Re-export commonly used types
pub use connection::{FrameWriter, IseConnection, WsReader, WsWriter};
pub use error::{NetworkError, NetworkResult};
pub use messages::{
    AudioChunk, AudioFrame, AudioRole, ControlFrame, FrameVerdict, ResultData, ResultFrame,
    chunk_audio,
};
pub use signer::{Credentials, ServiceEndpoint, sign, sign_now};
pub use tasks::TerminalEvent;
