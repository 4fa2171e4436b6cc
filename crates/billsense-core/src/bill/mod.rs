//! Utility bill field extraction module.

mod parser;
pub mod rules;

pub use parser::{read_source, BillParser, RuleBasedParser};

use crate::models::bill::{ExtractionResult, FallbackDate};

/// Extract units, amount and bill date from raw OCR text with default
/// settings, substituting `fallback` when no date can be recovered.
pub fn extract(raw_text: &str, fallback: Option<FallbackDate>) -> ExtractionResult {
    RuleBasedParser::new().extract(raw_text, fallback.as_ref())
}
