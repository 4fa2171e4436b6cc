//! Consumption derived from present/previous meter readings.

use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::patterns::{METER_PRIORITY, PRESENT_READING, PREVIOUS_READING};
use super::{is_date_fragment, Field, FieldCandidate, SanityBounds};

/// A present and a previous meter counter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterPair {
    pub present: u64,
    pub previous: u64,
}

impl MeterPair {
    /// Positive difference between the readings, if the meter moved forward.
    pub fn consumption(&self) -> Option<u64> {
        (self.present > self.previous).then(|| self.present - self.previous)
    }
}

/// Finds paired meter readings and turns them into a units candidate.
///
/// Abstains silently when either reading is missing or the counter did not
/// advance.
pub struct MeterReadingCalculator {
    bounds: SanityBounds,
}

impl MeterReadingCalculator {
    pub fn new() -> Self {
        Self {
            bounds: SanityBounds::units(),
        }
    }

    pub fn with_bounds(mut self, bounds: SanityBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Locate both readings, each independently and in either order.
    pub fn find_pair(&self, text: &str) -> Option<MeterPair> {
        let present = first_reading(&PRESENT_READING, text)?;
        let previous = first_reading(&PREVIOUS_READING, text)?;
        Some(MeterPair { present, previous })
    }

    /// Units candidate from the reading difference.
    pub fn candidate(&self, text: &str) -> Option<FieldCandidate<Decimal>> {
        let pair = self.find_pair(text)?;
        let Some(consumption) = pair.consumption() else {
            debug!(
                "Meter readings do not advance (present {}, previous {})",
                pair.present, pair.previous
            );
            return None;
        };

        let value = Decimal::from(consumption);
        if !self.bounds.contains(value) {
            debug!("Meter difference {} outside units bounds", value);
            return None;
        }

        debug!(
            "Meter readings {} - {} = {}",
            pair.present, pair.previous, consumption
        );
        Some(FieldCandidate::new(
            Field::Units,
            value,
            METER_PRIORITY,
            "meter_difference",
        ))
    }
}

impl Default for MeterReadingCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn first_reading(pattern: &Regex, text: &str) -> Option<u64> {
    pattern.captures_iter(text).find_map(|caps| {
        let (whole, m) = (caps.get(0)?, caps.get(1)?);

        // "Present Reading Date" headers carry a date, not a counter.
        let label = &text[whole.start()..m.start()];
        if label.to_ascii_lowercase().contains("date") || is_date_fragment(text, m.start(), m.end())
        {
            trace!("Skipping reading {:?} taken from a date", m.as_str());
            return None;
        }

        let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_in_either_order() {
        let calculator = MeterReadingCalculator::new();

        let forward = "Present Rdg: 10542\nPrevious Rdg: 10510";
        let backward = "Previous Reading - 10510\nCurrent Reading - 10542";

        for text in [forward, backward] {
            let candidate = calculator.candidate(text).unwrap();
            assert_eq!(candidate.value, Decimal::from(32));
            assert_eq!(candidate.priority, METER_PRIORITY);
        }
    }

    #[test]
    fn test_reading_date_headers_are_not_readings() {
        let calculator = MeterReadingCalculator::new();

        let headers = "Present Reading Date: 15/05/2025\nPrevious Reading Date: 12/04/2025";
        assert!(calculator.find_pair(headers).is_none());

        let text = "Present Reading Date: 15/05/2025\nPresent Reading: 10542\n\
                    Previous Reading Date: 12/04/2025\nPrevious Reading: 10510";
        assert_eq!(
            calculator.find_pair(text),
            Some(MeterPair {
                present: 10542,
                previous: 10510
            })
        );
    }

    #[test]
    fn test_missing_reading_abstains() {
        let calculator = MeterReadingCalculator::new();
        assert!(calculator.candidate("Present Rdg: 10542").is_none());
        assert!(calculator.candidate("Previous Rdg: 10510").is_none());
    }

    #[test]
    fn test_non_advancing_meter_abstains() {
        let calculator = MeterReadingCalculator::new();
        assert!(calculator.candidate("Present Rdg: 10510\nPrevious Rdg: 10542").is_none());
        assert!(calculator.candidate("Present Rdg: 10510\nPrevious Rdg: 10510").is_none());
    }

    #[test]
    fn test_grouped_readings() {
        let pair = MeterReadingCalculator::new()
            .find_pair("Closing Reading: 120,450\nOpening Reading: 119,900")
            .unwrap();
        assert_eq!(pair.consumption(), Some(550));
    }
}
