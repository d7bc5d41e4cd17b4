/// Pronunciation assessment sessions and the client facade
pub mod assessment;

/// Application configuration
pub mod config;

/// Network communication with the assessment service
pub mod network;

/// End-to-end assessment round and collaborator seams
pub mod pipeline;

/// Score extraction
pub mod scoring;

/// Utility modules
pub mod utils;

pub use assessment::{AssessmentError, Category, IseClient, Language, SessionOutcome, SessionState};
pub use network::Credentials;
pub use scoring::{ScoreExtractor, ScoreReport};
