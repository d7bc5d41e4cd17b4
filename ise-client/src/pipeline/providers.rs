/// Collaborator seams around the assessment core
///
/// Capture, transcription, synthesis, feedback generation and presentation
/// are provided by external services. Only their call and return shapes are
/// defined here.

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::scoring::ScoreReport;

/// Result of a transcription call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcription {
    /// Whether the provider recognized anything
    pub success: bool,

    /// Recognized text (empty on failure)
    pub text: String,
}

impl Transcription {
    pub fn recognized(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            text: String::new(),
        }
    }
}

/// Provides the recording to assess as mono 16 kHz 16-bit PCM
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn capture(&self) -> anyhow::Result<Vec<u8>>;
}

/// Speech-to-text provider
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> anyhow::Result<Transcription>;
}

/// Text-to-speech provider
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` into `output`; `Ok(false)` means the provider declined
    async fn synthesize(&self, text: &str, output: &Path) -> anyhow::Result<bool>;
}

/// Turns an assessment into feedback text for the speaker
///
/// Implementations own their retry and fallback policy.
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn feedback(&self, reference_text: &str, raw_result: &str) -> anyhow::Result<String>;
}

/// Downstream presentation channel
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn present(&self, event: &PresentationEvent) -> anyhow::Result<()>;
}

/// Events pushed to the presentation channel
///
/// # Example
/// ```
/// use ise_client::pipeline::PresentationEvent;
/// use ise_client::scoring::ScoreReport;
///
/// let event = PresentationEvent::AssessmentResult {
///     scores: ScoreReport::default(),
///     feedback: "读得很好".to_string(),
/// };
///
/// let json = serde_json::to_value(&event).unwrap();
/// assert_eq!(json["type"], "assessment_result");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresentationEvent {
    /// Scores and feedback of a completed round
    AssessmentResult { scores: ScoreReport, feedback: String },
}

impl PresentationEvent {
    /// Event type name as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            PresentationEvent::AssessmentResult { .. } => "assessment_result",
        }
    }
}

/// Presenter that writes events to the log as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

#[async_trait]
impl Presenter for LogPresenter {
    async fn present(&self, event: &PresentationEvent) -> anyhow::Result<()> {
        let json = serde_json::to_string(event)?;
        info!(kind = event.kind(), "{}", json);
        Ok(())
    }
}
