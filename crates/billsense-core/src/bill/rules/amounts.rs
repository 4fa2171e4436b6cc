//! Amount payable extraction.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, trace};

use super::patterns::{
    AMOUNT_RULES, CURRENCY_MARKED_PRIORITY, ITEMIZED_CHARGES, ITEMIZED_PRIORITY,
};
use super::{is_date_fragment, Field, FieldCandidate, FieldExtractor, SanityBounds};

/// Amount field extractor.
pub struct AmountExtractor {
    bounds: SanityBounds,
}

impl AmountExtractor {
    pub fn new() -> Self {
        Self {
            bounds: SanityBounds::amount(),
        }
    }

    pub fn with_bounds(mut self, bounds: SanityBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Candidates from labeled totals and currency-marked numbers.
    fn direct_candidates(&self, text: &str) -> Vec<FieldCandidate<Decimal>> {
        let mut results = Vec::new();

        for rule in AMOUNT_RULES.iter() {
            for caps in rule.regex.captures_iter(text) {
                let Some(m) = caps.get(1) else { continue };
                if is_date_fragment(text, m.start(), m.end()) {
                    trace!("Skipping {} match {:?} inside a date", rule.id, m.as_str());
                    continue;
                }
                let Some(amount) = parse_bill_number(m.as_str()) else {
                    continue;
                };
                if !self.bounds.contains(amount) {
                    trace!("Discarding {} amount {} outside bounds", rule.id, amount);
                    continue;
                }

                results.push(
                    FieldCandidate::new(Field::Amount, amount, rule.priority, rule.id)
                        .with_position(m.start(), m.end()),
                );
            }
        }

        results
    }

    /// Rebuild the total from itemized charges.
    ///
    /// Returns the summed candidate together with the spans of the summed
    /// line items.
    fn itemized_candidate(
        &self,
        text: &str,
    ) -> Option<(FieldCandidate<Decimal>, Vec<(usize, usize)>)> {
        let mut items = Vec::new();
        let mut spans = Vec::new();
        for caps in ITEMIZED_CHARGES.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            if is_date_fragment(text, m.start(), m.end()) {
                continue;
            }
            if let Some(value) = parse_bill_number(m.as_str()) {
                items.push(value);
                spans.push((m.start(), m.end()));
            }
        }

        if !items.iter().any(|v| *v > Decimal::ZERO) {
            return None;
        }

        let total: Decimal = items.iter().sum();
        debug!("Itemized charges {:?} sum to {}", items, total);

        if !self.bounds.contains(total) {
            trace!("Discarding itemized total {} outside bounds", total);
            return None;
        }

        let candidate =
            FieldCandidate::new(Field::Amount, total, ITEMIZED_PRIORITY, "itemized_sum");
        Some((candidate, spans))
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = Decimal;

    fn extract_all(&self, text: &str) -> Vec<FieldCandidate<Decimal>> {
        let mut results = self.direct_candidates(text);

        if results.iter().any(|c| c.priority > CURRENCY_MARKED_PRIORITY) {
            return results;
        }

        if let Some((total, spans)) = self.itemized_candidate(text) {
            // Currency-marked line items are parts of the total.
            results.retain(|c| {
                c.position
                    .is_none_or(|(start, end)| !spans.iter().any(|&(s, e)| start < e && s < end))
            });
            results.push(total);
        }

        results
    }
}

/// Parse a bill number such as `1,250.00`, `1,25,000` or `1 250`.
///
/// Thousands separators (commas, spaces, NBSP) are stripped; a single dot is
/// the decimal separator.
pub fn parse_bill_number(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() || cleaned.matches('.').count() > 1 {
        return None;
    }

    Decimal::from_str(cleaned.trim_end_matches('.')).ok()
}
