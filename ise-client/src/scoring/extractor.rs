/// Tiered score extraction from the service's result markup
///
/// The result schema varies between categories and service versions, so
/// extraction is an ordered list of strategies. The first strategy that finds
/// anything wins; a missing total is then synthesized from the components.
/// Extraction never fails: every outcome is a complete [`ScoreReport`].

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::assessment::Category;
use crate::scoring::report::{EXTRACTION_FAILED, ExtractionTier, NO_SCORES_FOUND, ScoreReport};

/// Root elements tried after the requested category, in order
const ALTERNATE_ROOTS: [&str; 5] = [
    "read_sentence",
    "read_word",
    "read_chapter",
    "read_syllable",
    "sentence",
];

/// Component scores used for total synthesis
const COMPONENTS: [&str; 4] = ["fluency", "integrity", "phone", "tone"];

/// Element wrapped around multi-root fragments before re-parsing
const FRAGMENT_WRAPPER: &str = "xml_result";

/// Values found by one strategy; `None` means not found
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialScores {
    pub total: Option<f64>,
    pub fluency: Option<f64>,
    pub integrity: Option<f64>,
    pub phone: Option<f64>,
    pub tone: Option<f64>,
    pub accuracy: Option<f64>,
    pub emotion: Option<f64>,
    pub rejected: Option<bool>,
}

impl PartialScores {
    fn components(&self) -> [Option<f64>; 4] {
        [self.fluency, self.integrity, self.phone, self.tone]
    }

    /// Check whether any score field was found
    pub fn is_empty(&self) -> bool {
        self.total.is_none()
            && self.accuracy.is_none()
            && self.emotion.is_none()
            && self.components().iter().all(Option::is_none)
    }

    /// Mean of the components actually found
    pub fn component_mean(&self) -> Option<f64> {
        let found: Vec<f64> = self.components().into_iter().flatten().collect();
        if found.is_empty() {
            None
        } else {
            Some(found.iter().sum::<f64>() / found.len() as f64)
        }
    }

    fn set(&mut self, key: &str, value: f64) {
        match key {
            "total" => self.total = Some(value),
            "fluency" => self.fluency = Some(value),
            "integrity" => self.integrity = Some(value),
            "phone" => self.phone = Some(value),
            "tone" => self.tone = Some(value),
            "accuracy" => self.accuracy = Some(value),
            "emotion" => self.emotion = Some(value),
            _ => {}
        }
    }

    /// Merge into a report, synthesizing the total when only components were found
    pub fn into_report(self, tier: ExtractionTier) -> ScoreReport {
        let (total, tier) = match (self.total, tier) {
            (Some(total), tier) => (total, tier),
            (None, ExtractionTier::DirectRootMatch) => (0.0, tier),
            (None, tier) => match self.component_mean() {
                Some(mean) => {
                    debug!("Total synthesized from component mean: {:.2}", mean);
                    (mean, ExtractionTier::TotalSynthesis)
                }
                None => (0.0, tier),
            },
        };

        ScoreReport {
            total,
            fluency: self.fluency.unwrap_or(0.0),
            integrity: self.integrity.unwrap_or(0.0),
            phone: self.phone.unwrap_or(0.0),
            tone: self.tone.unwrap_or(0.0),
            accuracy: self.accuracy,
            emotion: self.emotion,
            rejected: self.rejected.unwrap_or(false),
            diagnostic: tier.label().to_string(),
        }
    }
}

/// Score extractor bound to one category
///
/// # Example
/// ```
/// use ise_client::assessment::Category;
/// use ise_client::scoring::ScoreExtractor;
///
/// let extractor = ScoreExtractor::new(Category::ReadSentence);
/// let report = extractor.extract(Some(r#"<read_sentence total_score="87.3"/>"#));
/// assert_eq!(report.total, 87.3);
/// assert_eq!(report.diagnostic, "direct root match");
///
/// assert_eq!(extractor.extract(None).diagnostic, "extraction failed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreExtractor {
    category: Category,
}

impl ScoreExtractor {
    pub fn new(category: Category) -> Self {
        Self { category }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Extract a report from the decoded result markup
    pub fn extract(&self, raw: Option<&str>) -> ScoreReport {
        let text = match raw.map(|s| s.trim_start_matches('\u{FEFF}').trim()) {
            Some(text) if !text.is_empty() => text,
            _ => {
                warn!("No assessment result to extract scores from");
                return ScoreReport::failed(EXTRACTION_FAILED);
            }
        };

        let wrapped;
        let document = match Document::parse(text) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                debug!("Markup rejected ({}), retrying as a fragment", e);
                wrapped = wrap_fragment(text);
                Document::parse(&wrapped).map_err(|_| e)
            }
        };

        for tier in ExtractionTier::STRATEGIES {
            let found = match (tier, &document) {
                (ExtractionTier::DirectRootMatch, Ok(doc)) => self.direct_root_match(doc),
                (ExtractionTier::NamedSubElementScan, Ok(doc)) => named_element_scan(doc),
                (ExtractionTier::RawTextScan, _) => raw_text_scan(text),
                _ => None,
            };

            if let Some(partial) = found {
                let report = partial.into_report(tier);
                debug!(tier = %report.diagnostic, "Scores extracted: {}", report);
                return report;
            }
        }

        match document {
            Ok(_) => {
                warn!("Result markup carries no scores");
                ScoreReport::failed(NO_SCORES_FOUND)
            }
            Err(e) => {
                warn!("Failed to parse result markup: {}", e);
                ScoreReport::parse_failed(e)
            }
        }
    }

    /// Tier 1: first candidate root element carrying a `total_score` attribute
    fn direct_root_match(&self, doc: &Document<'_>) -> Option<PartialScores> {
        let category = self.category.as_str();
        let candidates = std::iter::once(category)
            .chain(ALTERNATE_ROOTS.into_iter().filter(|tag| *tag != category));

        for tag in candidates {
            let found = doc
                .descendants()
                .filter(|node| node.is_element() && node.has_tag_name(tag))
                .find(|node| attribute_number(node, "total_score").is_some());

            if let Some(node) = found {
                debug!("Scores found on <{}>", tag);

                let mut scores = PartialScores::default();
                for key in ["total", "fluency", "integrity", "phone", "tone", "accuracy", "emotion"] {
                    if let Some(value) = attribute_number(&node, &format!("{}_score", key)) {
                        scores.set(key, value);
                    }
                }
                scores.rejected = node.attribute("is_rejected").map(parse_flag);

                return Some(scores);
            }
        }

        None
    }
}

/// Tier 2: each component located independently by element or attribute name
fn named_element_scan(doc: &Document<'_>) -> Option<PartialScores> {
    let mut scores = PartialScores::default();

    for key in COMPONENTS {
        if let Some(value) = named_value(doc, key) {
            scores.set(key, value);
        }
    }

    if scores.is_empty() {
        return None;
    }

    scores.rejected = doc
        .descendants()
        .find_map(|node| node.attribute("is_rejected"))
        .map(parse_flag);

    Some(scores)
}

/// Value of `<key>`, `<key_score>`, or a `key_score` / `key` attribute, in that order
fn named_value(doc: &Document<'_>, key: &str) -> Option<f64> {
    let scored = format!("{}_score", key);
    let names = [key, scored.as_str()];

    let from_element = names.iter().find_map(|name| {
        doc.descendants()
            .filter(|node| node.is_element() && node.has_tag_name(*name))
            .find_map(|node| element_number(&node))
    });

    from_element.or_else(|| {
        names.iter().rev().find_map(|name| {
            doc.descendants()
                .find_map(|node| attribute_number(&node, name))
        })
    })
}

/// Tier 3: first `key_score="value"` occurrence of each field in the raw text
fn raw_text_scan(text: &str) -> Option<PartialScores> {
    let mut scores = PartialScores::default();

    for key in ["total", "fluency", "integrity", "phone", "tone", "accuracy", "emotion"] {
        if let Some(value) = quoted_value(text, &format!("{}_score", key)).and_then(parse_number) {
            scores.set(key, value);
        }
    }

    if scores.is_empty() {
        return None;
    }

    scores.rejected = quoted_value(text, "is_rejected").map(parse_flag);
    Some(scores)
}

/// Text between the quotes of the first standalone `name="..."`
fn quoted_value<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);

    text.match_indices(&needle)
        .find(|(start, _)| {
            text[..*start]
                .chars()
                .next_back()
                .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
        })
        .and_then(|(start, _)| {
            let rest = &text[start + needle.len()..];
            rest.find('"').map(|end| &rest[..end])
        })
}

/// Element text, or its `value` attribute when the text is empty
fn element_number(node: &Node<'_, '_>) -> Option<f64> {
    match node.text().map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => parse_number(text),
        None => attribute_number(node, "value"),
    }
}

fn attribute_number(node: &Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name).and_then(parse_number)
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

/// Wrap a multi-root fragment in a single element, dropping any XML declaration
fn wrap_fragment(text: &str) -> String {
    let body = match text.strip_prefix("<?xml") {
        Some(rest) => rest.find("?>").map_or(text, |end| &rest[end + 2..]),
        None => text,
    };

    format!("<{0}>{1}</{0}>", FRAGMENT_WRAPPER, body)
}
