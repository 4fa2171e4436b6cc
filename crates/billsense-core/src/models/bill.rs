//! Bill extraction data models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used for every normalized bill date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The structured fields recovered from one bill.
///
/// Serializes as `{"units": 250.0, "amount": 1250.0, "date": "2025-05-15"}`
/// with `date` set to `null` when nothing usable was found.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Consumed units (kWh, KL, CBM); `0.0` when not found.
    pub units: f64,

    /// Payable amount; `0.0` when not found.
    pub amount: f64,

    /// Bill date as `YYYY-MM-DD`, or the caller's fallback.
    pub date: Option<String>,
}

impl ExtractionResult {
    /// Whether units or amount carry a value.
    ///
    /// Uploads where this is false are usually rejected by callers.
    pub fn has_reading(&self) -> bool {
        self.units > 0.0 || self.amount > 0.0
    }
}

/// Date substituted when no date token in the text survives normalization.
///
/// Substitution is verbatim: a text fallback is not parsed or validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackDate {
    /// A calendar date, rendered as `YYYY-MM-DD`.
    Date(NaiveDate),
    /// An already formatted date string.
    Text(String),
}

impl FallbackDate {
    pub fn render(&self) -> String {
        match self {
            FallbackDate::Date(date) => date.format(DATE_FORMAT).to_string(),
            FallbackDate::Text(text) => text.clone(),
        }
    }
}

impl From<NaiveDate> for FallbackDate {
    fn from(date: NaiveDate) -> Self {
        FallbackDate::Date(date)
    }
}

impl From<&str> for FallbackDate {
    fn from(text: &str) -> Self {
        FallbackDate::Text(text.to_string())
    }
}

impl From<String> for FallbackDate {
    fn from(text: String) -> Self {
        FallbackDate::Text(text)
    }
}

/// Utility the bill was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillKind {
    Electricity,
    Water,
    #[default]
    Unknown,
}

impl std::fmt::Display for BillKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillKind::Electricity => write!(f, "electricity"),
            BillKind::Water => write!(f, "water"),
            BillKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// How a corrupted year was repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairMethod {
    /// At least three of four digits matched a recent year.
    DigitOverlap,
    /// A fixed two-digit co-occurrence rule fired.
    DigitPair,
}

/// A year correction applied while normalizing a date token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRepair {
    /// Raw token the repair was applied to.
    pub token: String,
    /// Year as read from the token (after two-digit expansion).
    pub from: i32,
    /// Year adopted instead.
    pub to: i32,
    pub method: RepairMethod,
}

/// One competing candidate, as recorded in the diagnostic trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    /// Id of the rule that produced the candidate.
    pub rule: String,
    pub priority: u8,
    /// Candidate value rendered as text.
    pub value: String,
}

/// Which rules matched and which candidates competed, per field.
///
/// Candidates are listed winner first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionTrace {
    pub units: Vec<CandidateSummary>,
    pub amount: Vec<CandidateSummary>,
    pub date: Vec<CandidateSummary>,
    /// Year corrections taken for date tokens that survived normalization.
    pub year_repairs: Vec<YearRepair>,
    /// Whether the caller's fallback date was substituted.
    pub fallback_date_used: bool,
}

/// Extraction result plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// The extracted fields.
    pub result: ExtractionResult,
    /// Detected utility kind.
    pub bill_kind: BillKind,
    /// Competing candidates and repairs.
    pub trace: ExtractionTrace,
    /// Human-readable notes about missing fields.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}
