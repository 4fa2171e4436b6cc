//! Error types for the billsense-core library.

use thiserror::Error;

/// Main error type for the billsense library.
#[derive(Error, Debug)]
pub enum BillsenseError {
    /// The OCR text source could not be used.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to the raw OCR text source.
///
/// These are the only failures the engine reports; bad or noisy text never
/// is an error, it just yields default fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The source contained no text at all.
    #[error("OCR text is empty")]
    Empty,

    /// The source could not be read or is not valid UTF-8.
    #[error("OCR text is unreadable: {0}")]
    Unreadable(String),
}

/// Result type for the billsense library.
pub type Result<T> = std::result::Result<T, BillsenseError>;
