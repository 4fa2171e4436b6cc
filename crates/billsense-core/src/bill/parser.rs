//! Pipeline orchestrator: raw OCR text in, structured bill fields out.

use std::fmt::Display;
use std::io::Read;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info};

use crate::error::InputError;
use crate::models::bill::{
    CandidateSummary, ExtractionReport, ExtractionResult, ExtractionTrace, FallbackDate,
    DATE_FORMAT,
};
use crate::models::config::{BillsenseConfig, DateConfig};

use super::rules::{
    detect_bill_kind, rank, select, AmountExtractor, DateExtractor, DateNormalizer,
    FieldCandidate, FieldExtractor, SanityBounds, UnitsExtractor,
};

/// Trait for bill parsing.
pub trait BillParser {
    /// Parse bill text into fields plus diagnostics.
    fn parse(&self, text: &str, fallback: Option<&FallbackDate>) -> ExtractionReport;

    /// Parse bill text into fields only.
    fn extract(&self, text: &str, fallback: Option<&FallbackDate>) -> ExtractionResult {
        self.parse(text, fallback).result
    }
}

/// Rule-based bill parser.
///
/// Holds settings only; every call is independent, so one parser can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct RuleBasedParser {
    /// Sanity bounds for units candidates.
    units_bounds: SanityBounds,
    /// Sanity bounds for amount candidates.
    amount_bounds: SanityBounds,
    /// Date plausibility window.
    date_config: DateConfig,
    /// Whether to derive units from meter readings.
    use_meter_readings: bool,
    /// Pinned reference date; the local date at call time otherwise.
    today: Option<NaiveDate>,
}

impl RuleBasedParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self {
            units_bounds: SanityBounds::units(),
            amount_bounds: SanityBounds::amount(),
            date_config: DateConfig::default(),
            use_meter_readings: true,
            today: None,
        }
    }

    /// Create a parser from a loaded configuration.
    pub fn from_config(config: &BillsenseConfig) -> Self {
        let e = &config.extraction;
        Self::new()
            .with_units_bounds(SanityBounds::from_f64(
                e.min_units,
                e.max_units,
                SanityBounds::units(),
            ))
            .with_amount_bounds(SanityBounds::from_f64(
                e.min_amount,
                e.max_amount,
                SanityBounds::amount(),
            ))
            .with_date_config(config.dates.clone())
    }

    /// Set units bounds.
    pub fn with_units_bounds(mut self, bounds: SanityBounds) -> Self {
        self.units_bounds = bounds;
        self
    }

    /// Set amount bounds.
    pub fn with_amount_bounds(mut self, bounds: SanityBounds) -> Self {
        self.amount_bounds = bounds;
        self
    }

    /// Set the date plausibility window.
    pub fn with_date_config(mut self, config: DateConfig) -> Self {
        self.date_config = config;
        self
    }

    /// Set meter-reading derivation.
    pub fn with_meter_readings(mut self, enabled: bool) -> Self {
        self.use_meter_readings = enabled;
        self
    }

    /// Pin the reference date used by the plausibility filters.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BillParser for RuleBasedParser {
    fn parse(&self, text: &str, fallback: Option<&FallbackDate>) -> ExtractionReport {
        let start = Instant::now();
        // Captured once so the whole call sees the same day.
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let mut warnings = Vec::new();

        if text.trim().is_empty() {
            debug!("Empty OCR text, returning defaults");
            return ExtractionReport {
                result: ExtractionResult::default(),
                bill_kind: Default::default(),
                trace: ExtractionTrace::default(),
                warnings: vec!["OCR text is empty".to_string()],
                processing_time_ms: start.elapsed().as_millis() as u64,
            };
        }

        info!("Parsing bill from {} characters of text", text.len());

        // Units
        let units_candidates = UnitsExtractor::new()
            .with_bounds(self.units_bounds)
            .with_meter_readings(self.use_meter_readings)
            .extract_all(text);
        let units = winning_number(&units_candidates, "units");
        if units.is_none() {
            warnings.push("Could not extract units".to_string());
        }

        // Amount
        let amount_candidates = AmountExtractor::new()
            .with_bounds(self.amount_bounds)
            .extract_all(text);
        let amount = winning_number(&amount_candidates, "amount");
        if amount.is_none() {
            warnings.push("Could not extract amount".to_string());
        }

        // Date
        let normalizer = DateNormalizer::new(today).with_config(self.date_config.clone());
        let (date_candidates, year_repairs) =
            DateExtractor::new(normalizer).extract_with_repairs(text);
        let mut fallback_date_used = false;
        let date = match select(&date_candidates) {
            Some(winner) => {
                debug!("Bill date {} from rule {}", winner.value, winner.rule);
                Some(winner.value.format(DATE_FORMAT).to_string())
            }
            None => {
                warnings.push("Could not extract bill date".to_string());
                fallback.map(|f| {
                    fallback_date_used = true;
                    let rendered = f.render();
                    debug!("Using fallback date {}", rendered);
                    rendered
                })
            }
        };

        let bill_kind = detect_bill_kind(text);

        let result = ExtractionResult {
            units: units.unwrap_or(0.0),
            amount: amount.unwrap_or(0.0),
            date,
        };

        info!(
            "Extracted {} bill: units {}, amount {}, date {}",
            bill_kind,
            result.units,
            result.amount,
            result.date.as_deref().unwrap_or("none")
        );

        ExtractionReport {
            result,
            bill_kind,
            trace: ExtractionTrace {
                units: summarize(&units_candidates),
                amount: summarize(&amount_candidates),
                date: summarize(&date_candidates),
                year_repairs,
                fallback_date_used,
            },
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Read OCR text from a source.
///
/// Fails only when the source cannot be read, is not UTF-8, or holds no
/// text; callers treat either failure as an all-default result.
pub fn read_source<R: Read>(mut reader: R) -> Result<String, InputError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| InputError::Unreadable(e.to_string()))?;

    let text = String::from_utf8(bytes).map_err(|e| InputError::Unreadable(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(InputError::Empty);
    }

    Ok(text)
}

fn winning_number(candidates: &[FieldCandidate<Decimal>], field: &str) -> Option<f64> {
    let winner = select(candidates)?;
    debug!(
        "Selected {} {} from rule {} among {} candidates",
        field,
        winner.value,
        winner.rule,
        candidates.len()
    );
    winner.value.to_f64()
}

fn summarize<T: Ord + Display>(candidates: &[FieldCandidate<T>]) -> Vec<CandidateSummary> {
    rank(candidates)
        .into_iter()
        .map(|c| CandidateSummary {
            rule: c.rule.to_string(),
            priority: c.priority,
            value: c.value.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bill::{BillKind, RepairMethod};
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parser() -> RuleBasedParser {
        RuleBasedParser::new().with_today(ymd(2025, 6, 1))
    }

    #[test]
    fn test_electricity_bill() {
        let text = "Units Billed: 250\nRate: 5.00\nNet Amount: ₹1250.00\nDate: 15/05/2025";
        let result = parser().extract(text, None);

        assert_eq!(
            result,
            ExtractionResult {
                units: 250.0,
                amount: 1250.0,
                date: Some("2025-05-15".to_string()),
            }
        );
    }

    #[test]
    fn test_water_bill_meter_pair_wins() {
        let text = r#"
            HYDERABAD METROPOLITAN WATER SUPPLY & SEWERAGE BOARD
            Bill Date: 12-04-2025
            Consumption (KL): 15.5
            Present Rdg: 10542
            Previous Rdg: 10510
            Total Payable: 450.00
        "#;

        let report = parser().parse(text, None);
        assert_eq!(report.result.units, 32.0);
        assert_eq!(report.result.amount, 450.0);
        assert_eq!(report.result.date.as_deref(), Some("2025-04-12"));
        assert_eq!(report.bill_kind, BillKind::Water);
        assert_eq!(report.trace.units[0].rule, "meter_difference");
    }

    #[test]
    fn test_reading_date_columns_do_not_become_units() {
        let text = "Present Reading Date: 15/05/2025\nPrevious Reading Date: 12/04/2025\nUnits Billed: 250";
        let report = parser().parse(text, None);

        assert_eq!(report.result.units, 250.0);
        assert!(report.trace.units.iter().all(|c| c.rule != "meter_difference"));
        assert!(report.trace.units.iter().all(|c| c.rule != "units_suffix"));
    }

    #[test]
    fn test_extreme_date_tolerances_do_not_panic() {
        let config = DateConfig {
            max_future_days: i64::MAX,
            max_age_years: u32::MAX,
            repair_lookback_years: i32::MAX,
            ..DateConfig::default()
        };
        let result = parser()
            .with_date_config(config)
            .extract("Bill Date: 15/05/2025\nDate: 12/03/2924", None);
        assert_eq!(result.date.as_deref(), Some("2025-05-15"));
    }

    #[test]
    fn test_corrupted_year_recorded_in_trace() {
        let report = parser().parse("Bill Date: 24-01-1673\nUnits Billed: 120", None);
        assert_eq!(report.result.date.as_deref(), Some("2024-01-24"));
        assert_eq!(report.trace.year_repairs.len(), 1);
        assert_eq!(report.trace.year_repairs[0].to, 2024);
        assert_eq!(report.trace.year_repairs[0].method, RepairMethod::DigitPair);
    }

    #[test]
    fn test_no_evidence() {
        let report = parser().parse("Thank you for paying on time", None);
        assert_eq!(report.result, ExtractionResult::default());
        assert!(!report.trace.fallback_date_used);
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn test_empty_input_short_circuits() {
        for text in ["", "   \n\t "] {
            let fallback = FallbackDate::from(ymd(2025, 5, 1));
            let result = parser().extract(text, Some(&fallback));
            assert_eq!(result, ExtractionResult::default());
        }
    }

    #[test]
    fn test_fallback_date_substituted_verbatim() {
        let fallback = FallbackDate::from("31/02/2025");
        let report = parser().parse("Net Amount: 900.00\nDate: 15/05/1999", Some(&fallback));
        assert_eq!(report.result.amount, 900.0);
        assert_eq!(report.result.date.as_deref(), Some("31/02/2025"));
        assert!(report.trace.fallback_date_used);

        let fallback = FallbackDate::from(ymd(2025, 5, 20));
        let result = parser().extract("Units: 90", Some(&fallback));
        assert_eq!(result.date.as_deref(), Some("2025-05-20"));
    }

    #[test]
    fn test_itemized_amount() {
        let result = parser().extract("Energy Charges 620.00\nFixed Charges 85.00", None);
        assert_eq!(result.amount, 705.0);
    }

    #[test]
    fn test_messy_ocr() {
        let text = "\n    Bill Date: 10/10/2024\n    Unls Consumed: 180 .\n    Am0unt Payable : 900.50\n";
        let result = parser().extract(text, None);
        assert_eq!(result.units, 180.0);
        assert_eq!(result.amount, 900.5);
        assert_eq!(result.date.as_deref(), Some("2024-10-10"));
    }

    #[test]
    fn test_out_of_bounds_only() {
        let result = parser().extract("Units Billed: 0\nNet Amount: 12.00", None);
        assert_eq!(result.units, 0.0);
        assert_eq!(result.amount, 0.0);
    }

    #[test]
    fn test_from_config_bounds() {
        let mut config = BillsenseConfig::default();
        config.extraction.min_amount = 10.0;
        let result = RuleBasedParser::from_config(&config)
            .with_today(ymd(2025, 6, 1))
            .extract("Net Amount: 12.00", None);
        assert_eq!(result.amount, 12.0);
    }

    #[test]
    fn test_deterministic_across_threads() {
        let parser = parser();
        let text = "Units Billed: 250\nNet Amount: ₹1250.00\nBill Date: 24-01-1673";
        let expected = parser.extract(text, None);

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| parser.extract(text, None))).collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_read_source() {
        assert_eq!(read_source("Units: 40".as_bytes()).unwrap(), "Units: 40");
        assert_eq!(read_source("  \n".as_bytes()), Err(InputError::Empty));
        assert!(matches!(
            read_source(&[0xff, 0xfe, 0x00][..]),
            Err(InputError::Unreadable(_))
        ));
    }
}
