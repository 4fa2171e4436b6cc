//! Rule-based field extractors for utility bills.

pub mod amounts;
pub mod dates;
pub mod kind;
pub mod meter;
pub mod patterns;
pub mod select;
pub mod units;

pub use amounts::{parse_bill_number, AmountExtractor};
pub use dates::{DateExtractor, DateNormalizer, DateTemplate, NormalizedDate};
pub use kind::detect_bill_kind;
pub use meter::{MeterPair, MeterReadingCalculator};
pub use select::{rank, select};
pub use units::UnitsExtractor;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Which result field a candidate is proposed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Units,
    Amount,
    Date,
}

/// A value proposed for one field, tagged with the priority of the rule
/// that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCandidate<T> {
    pub field: Field,
    /// Extracted value.
    pub value: T,
    /// Rule priority; the primary selection key.
    pub priority: u8,
    /// Id of the producing rule.
    pub rule: &'static str,
    /// Byte span of the match in the source text.
    pub position: Option<(usize, usize)>,
}

impl<T> FieldCandidate<T> {
    pub fn new(field: Field, value: T, priority: u8, rule: &'static str) -> Self {
        Self {
            field,
            value,
            priority,
            rule,
            position: None,
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output: Ord + Clone;

    /// Extract every candidate for the field, in discovery order.
    fn extract_all(&self, text: &str) -> Vec<FieldCandidate<Self::Output>>;

    /// Extract the winning value, if any.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        select(&self.extract_all(text)).map(|c| c.value.clone())
    }
}

/// Inclusive numeric sanity range.
///
/// Matches outside the range are discarded when the candidate is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanityBounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl SanityBounds {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    /// Build bounds from configuration values, keeping `default` for any
    /// value that is not a finite number.
    pub fn from_f64(min: f64, max: f64, default: SanityBounds) -> Self {
        Self {
            min: Decimal::from_f64(min).unwrap_or(default.min),
            max: Decimal::from_f64(max).unwrap_or(default.max),
        }
    }

    /// Units consumed: 1 to 100 000.
    pub fn units() -> Self {
        Self::new(Decimal::ONE, Decimal::from(100_000))
    }

    /// Amount payable: 50 to 1 000 000.
    pub fn amount() -> Self {
        Self::new(Decimal::from(50), Decimal::from(1_000_000))
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Whether the number at `text[start..end]` is part of a date such as
/// `15/05/2025`: a `/`, `-` or `.` separator touches a digit on either side.
pub fn is_date_fragment(text: &str, start: usize, end: usize) -> bool {
    fn is_separator(c: char) -> bool {
        matches!(c, '/' | '-' | '.')
    }

    let mut before = text[..start].chars().rev();
    let preceded = matches!(
        (before.next(), before.next()),
        (Some(sep), Some(d)) if is_separator(sep) && d.is_ascii_digit()
    );

    let mut after = text[end..].chars();
    let followed = matches!(
        (after.next(), after.next()),
        (Some(sep), Some(d)) if is_separator(sep) && d.is_ascii_digit()
    );

    preceded || followed
}
