/// Score report returned to callers
///
/// The report always has the same shape. Fields that no extraction tier could
/// resolve are 0.0, and `diagnostic` says which tier produced the values or
/// why extraction failed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagnostic used when there is no payload to extract from
pub const EXTRACTION_FAILED: &str = "extraction failed";

/// Diagnostic used when well-formed markup carries no score fields
pub const NO_SCORES_FOUND: &str = "no scores found";

/// Diagnostic prefix used when the markup cannot be parsed
pub const PARSE_FAILED_PREFIX: &str = "parse failed: ";

/// Strategy that produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionTier {
    /// Category (or alternate) root element carrying the scores as attributes
    DirectRootMatch,

    /// Independently located score elements or attributes
    NamedSubElementScan,

    /// `key="value"` occurrences in the raw text
    RawTextScan,

    /// Components found without a total; total is their mean
    TotalSynthesis,
}

impl ExtractionTier {
    /// Strategies tried in order; synthesis is applied afterwards
    pub const STRATEGIES: [ExtractionTier; 3] = [
        ExtractionTier::DirectRootMatch,
        ExtractionTier::NamedSubElementScan,
        ExtractionTier::RawTextScan,
    ];

    /// Label stored in [`ScoreReport::diagnostic`]
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionTier::DirectRootMatch => "direct root match",
            ExtractionTier::NamedSubElementScan => "named sub-element scan",
            ExtractionTier::RawTextScan => "raw text scan",
            ExtractionTier::TotalSynthesis => "total synthesis",
        }
    }
}

impl fmt::Display for ExtractionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed-shape pronunciation score summary
///
/// # Example
/// ```
/// use ise_client::scoring::ScoreReport;
///
/// let report = ScoreReport::failed("extraction failed");
/// assert_eq!(report.total, 0.0);
/// assert!(!report.rejected);
///
/// let json = serde_json::to_value(&report).unwrap();
/// assert_eq!(json["total_score"], 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoreReport {
    /// Overall score
    #[serde(rename = "total_score", default)]
    pub total: f64,

    /// Fluency score
    #[serde(rename = "fluency_score", default)]
    pub fluency: f64,

    /// Integrity (completeness) score
    #[serde(rename = "integrity_score", default)]
    pub integrity: f64,

    /// Pronunciation score
    #[serde(rename = "phone_score", default)]
    pub phone: f64,

    /// Tone score
    #[serde(rename = "tone_score", default)]
    pub tone: f64,

    /// Accuracy score (English categories)
    #[serde(
        rename = "accuracy_score",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub accuracy: Option<f64>,

    /// Emotion score (English categories)
    #[serde(
        rename = "emotion_score",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub emotion: Option<f64>,

    /// Service flagged the recording as unusable (noise, wrong text, silence)
    #[serde(rename = "is_rejected", default)]
    pub rejected: bool,

    /// Tier label or failure reason
    #[serde(default)]
    pub diagnostic: String,
}

impl ScoreReport {
    /// All-zero report carrying a failure reason
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: diagnostic.into(),
            ..Self::default()
        }
    }

    /// All-zero report for markup that could not be parsed
    pub fn parse_failed(cause: impl fmt::Display) -> Self {
        Self::failed(format!("{}{}", PARSE_FAILED_PREFIX, cause))
    }

    /// Tier that produced the report, `None` for failures
    pub fn tier(&self) -> Option<ExtractionTier> {
        ExtractionTier::STRATEGIES
            .iter()
            .chain(std::iter::once(&ExtractionTier::TotalSynthesis))
            .copied()
            .find(|tier| tier.label() == self.diagnostic)
    }

    /// Check whether any tier produced values
    pub fn is_extracted(&self) -> bool {
        self.tier().is_some()
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total {:.2} | fluency {:.2} | integrity {:.2} | phone {:.2} | tone {:.2}",
            self.total, self.fluency, self.integrity, self.phone, self.tone
        )?;

        if self.rejected {
            f.write_str(" | rejected")?;
        }

        write!(f, " ({})", self.diagnostic)
    }
}
