//! Core library for utility bill OCR text.
//!
//! This crate provides:
//! - A layered regex pattern library for units, amount and bill date
//! - Meter-reading based consumption for water bills
//! - Priority-based candidate selection shared by every field
//! - Date normalization with OCR year-corruption repair
//! - A stateless pipeline turning raw OCR text into an `ExtractionResult`

pub mod bill;
pub mod error;
pub mod models;

pub use bill::{extract, read_source, BillParser, RuleBasedParser};
pub use error::{BillsenseError, InputError, Result};
pub use models::bill::{BillKind, ExtractionReport, ExtractionResult, FallbackDate};
pub use models::config::BillsenseConfig;
