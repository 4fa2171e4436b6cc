//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use billsense_core::models::bill::DATE_FORMAT;
use billsense_core::{BillsenseConfig, FallbackDate};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("billsense")
        .join("config.json")
}

/// Load the explicit config file, else the default one if present, else
/// built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<BillsenseConfig> {
    if let Some(path) = config_path {
        return Ok(BillsenseConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(BillsenseConfig::from_file(&default_path)?)
    } else {
        Ok(BillsenseConfig::default())
    }
}

/// Resolve the `--fallback-date` argument.
///
/// Absent means the upload date (`today`), `none` disables substitution,
/// a `YYYY-MM-DD` value becomes a date and anything else is passed through
/// as text.
pub fn resolve_fallback(arg: Option<&str>, today: NaiveDate) -> Option<FallbackDate> {
    match arg {
        None => Some(FallbackDate::Date(today)),
        Some(s) if s.eq_ignore_ascii_case("none") => None,
        Some(s) => match NaiveDate::parse_from_str(s, DATE_FORMAT) {
            Ok(date) => Some(FallbackDate::Date(date)),
            Err(_) => Some(FallbackDate::Text(s.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_fallback() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        assert_eq!(resolve_fallback(None, today), Some(FallbackDate::Date(today)));
        assert_eq!(resolve_fallback(Some("none"), today), None);
        assert_eq!(
            resolve_fallback(Some("2025-05-01"), today),
            Some(FallbackDate::Date(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()))
        );
        assert_eq!(
            resolve_fallback(Some("May 2025"), today),
            Some(FallbackDate::Text("May 2025".to_string()))
        );
    }
}
