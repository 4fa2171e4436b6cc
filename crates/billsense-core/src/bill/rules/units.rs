//! Consumed-units extraction.

use rust_decimal::Decimal;
use tracing::trace;

use super::amounts::parse_bill_number;
use super::meter::MeterReadingCalculator;
use super::patterns::UNITS_RULES;
use super::{is_date_fragment, Field, FieldCandidate, FieldExtractor, SanityBounds};

/// Units field extractor.
///
/// Combines label-based matches with the meter-reading difference, which
/// outranks every label when both readings are present.
pub struct UnitsExtractor {
    bounds: SanityBounds,
    use_meter_readings: bool,
}

impl UnitsExtractor {
    pub fn new() -> Self {
        Self {
            bounds: SanityBounds::units(),
            use_meter_readings: true,
        }
    }

    pub fn with_bounds(mut self, bounds: SanityBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set meter-reading derivation.
    pub fn with_meter_readings(mut self, enabled: bool) -> Self {
        self.use_meter_readings = enabled;
        self
    }

    /// Candidates from labels and unit suffixes only.
    pub fn label_candidates(&self, text: &str) -> Vec<FieldCandidate<Decimal>> {
        let mut results = Vec::new();

        for rule in UNITS_RULES.iter() {
            for caps in rule.regex.captures_iter(text) {
                let Some(m) = caps.get(1) else { continue };
                if is_date_fragment(text, m.start(), m.end()) {
                    trace!("Skipping {} match {:?} inside a date", rule.id, m.as_str());
                    continue;
                }
                let Some(units) = parse_bill_number(m.as_str()) else {
                    continue;
                };
                if !self.bounds.contains(units) {
                    trace!("Discarding {} units {} outside bounds", rule.id, units);
                    continue;
                }

                results.push(
                    FieldCandidate::new(Field::Units, units, rule.priority, rule.id)
                        .with_position(m.start(), m.end()),
                );
            }
        }

        results
    }
}

impl Default for UnitsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for UnitsExtractor {
    type Output = Decimal;

    fn extract_all(&self, text: &str) -> Vec<FieldCandidate<Decimal>> {
        let mut results = self.label_candidates(text);

        if self.use_meter_readings {
            let calculator = MeterReadingCalculator::new().with_bounds(self.bounds);
            results.extend(calculator.candidate(text));
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_fully_qualified_label() {
        let text = "Units Billed: 250\nRate: 5.00\nNet Amount: ₹1250.00";
        assert_eq!(UnitsExtractor::new().extract(text), Some(dec("250")));
    }

    #[test]
    fn test_consumption_with_unit_in_label() {
        let text = "Consumer No: 98765\nConsumption (KL): 15.5\nSewerage Cess: 35%";
        assert_eq!(UnitsExtractor::new().extract(text), Some(dec("15.5")));
    }

    #[test]
    fn test_specific_label_beats_larger_generic_value() {
        let text = "Units Consumed: 180\nUnits: 1800";
        assert_eq!(UnitsExtractor::new().extract(text), Some(dec("180")));
    }

    #[test]
    fn test_unit_suffix_as_last_resort() {
        let text = "Reading taken 12 days ago\n342 kWh";
        assert_eq!(UnitsExtractor::new().extract(text), Some(dec("342")));
    }

    #[test]
    fn test_localized_label() {
        let text = "వినియోగించిన యూనిట్లు: 275";
        let candidates = UnitsExtractor::new().extract_all(text);
        assert!(candidates.iter().any(|c| c.rule == "units_localized"));
        assert_eq!(UnitsExtractor::new().extract(text), Some(dec("275")));
    }

    #[test]
    fn test_zero_and_huge_values_discarded() {
        let extractor = UnitsExtractor::new();
        assert!(extractor.extract_all("Units Billed: 0").is_empty());
        assert!(extractor.extract_all("Units Billed: 250000").is_empty());
    }

    #[test]
    fn test_date_digits_are_not_units() {
        let text = "Consumption Period: 01/04/2025 to 30/04/2025\nUnits Billed: 250";
        let candidates = UnitsExtractor::new().extract_all(text);
        assert!(candidates.iter().all(|c| c.rule != "consumption"));
        assert_eq!(UnitsExtractor::new().extract(text), Some(dec("250")));
    }

    #[test]
    fn test_unit_suffix_stays_on_its_line() {
        let text = "Reading Date: 12/04/2025\nUnits Billed: 250";
        let candidates = UnitsExtractor::new().extract_all(text);
        assert!(candidates.iter().all(|c| c.rule != "units_suffix"));

        let text = "Meter No 4417\nUnits 90";
        let candidates = UnitsExtractor::new().extract_all(text);
        assert!(candidates.iter().all(|c| c.rule != "units_suffix"));
    }

    #[test]
    fn test_meter_difference_wins() {
        let text = "Consumption: 40\nPresent Rdg: 10542\nPrevious Rdg: 10510";
        assert_eq!(UnitsExtractor::new().extract(text), Some(dec("32")));

        let without_meter = UnitsExtractor::new().with_meter_readings(false);
        assert_eq!(without_meter.extract(text), Some(dec("40")));
    }
}
