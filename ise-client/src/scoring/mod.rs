/// Score extraction from assessment results
///
/// Turns the opaque result markup returned by the service into a
/// fixed-shape [`ScoreReport`].

/// Tiered extractor
pub mod extractor;

/// Report type and tier labels
pub mod report;

pub use extractor::{PartialScores, ScoreExtractor};
pub use report::{ExtractionTier, ScoreReport};
