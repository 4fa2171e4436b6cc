//! Bill date extraction and normalization.
//!
//! Raw date tokens are found by the layered date rules, then each token is
//! normalized on its own: calendar templates are tried in order, two-digit
//! years are expanded, a year outside the accepted window is repaired when
//! the OCR corruption is recognizable, and dates too far in the future or
//! past are dropped.

use chrono::{Datelike, Duration, Months, NaiveDate};
use tracing::{debug, trace};

use super::patterns::DATE_RULES;
use super::{Field, FieldCandidate, FieldExtractor};
use crate::models::bill::{RepairMethod, YearRepair, DATE_FORMAT};
use crate::models::config::DateConfig;

/// Component order of a date template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayMonthYear,
    YearMonthDay,
}

/// A calendar layout a raw token may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTemplate {
    pub order: DateOrder,
    pub separator: char,
    /// Width of the year component (2 or 4).
    pub year_digits: usize,
}

impl DateTemplate {
    const fn dmy(separator: char, year_digits: usize) -> Self {
        Self {
            order: DateOrder::DayMonthYear,
            separator,
            year_digits,
        }
    }

    const fn ymd(separator: char) -> Self {
        Self {
            order: DateOrder::YearMonthDay,
            separator,
            year_digits: 4,
        }
    }

    /// Split a token into `(day, month, year)` as written.
    fn split(&self, token: &str) -> Option<RawParts> {
        let parts: Vec<&str> = token.split(self.separator).collect();
        if parts.len() != 3 || !parts.iter().all(|p| is_digits(p)) {
            return None;
        }

        let (day, month, year) = match self.order {
            DateOrder::DayMonthYear => (parts[0], parts[1], parts[2]),
            DateOrder::YearMonthDay => (parts[2], parts[1], parts[0]),
        };

        if day.len() > 2 || month.len() > 2 || year.len() != self.year_digits {
            return None;
        }

        Some(RawParts {
            day: day.parse().ok()?,
            month: month.parse().ok()?,
            year: year.parse().ok()?,
        })
    }
}

impl std::fmt::Display for DateTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sep = self.separator;
        let year = if self.year_digits == 2 { "YY" } else { "YYYY" };
        match self.order {
            DateOrder::DayMonthYear => write!(f, "DD{sep}MM{sep}{year}"),
            DateOrder::YearMonthDay => write!(f, "{year}{sep}MM{sep}DD"),
        }
    }
}

/// Templates in the order they are tried.
pub const TEMPLATES: [DateTemplate; 9] = [
    DateTemplate::dmy('/', 4),
    DateTemplate::dmy('-', 4),
    DateTemplate::dmy('.', 4),
    DateTemplate::dmy('/', 2),
    DateTemplate::dmy('-', 2),
    DateTemplate::dmy('.', 2),
    DateTemplate::ymd('-'),
    DateTemplate::ymd('/'),
    DateTemplate::ymd('.'),
];

/// Last-resort year guesses from digits seen anywhere in the token.
///
/// Tried in this order; only covers 2023-2026.
const DIGIT_PAIR_RULES: [(u32, u32, i32); 4] = [
    (2, 4, 2024),
    (2, 3, 2023),
    (2, 5, 2025),
    (2, 6, 2026),
];

#[derive(Debug, Clone, Copy)]
struct RawParts {
    day: u32,
    month: u32,
    year: i32,
}

/// A token that survived normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    pub date: NaiveDate,
    /// Template the token was read with.
    pub template: DateTemplate,
    /// Year correction, if one was needed.
    pub repair: Option<YearRepair>,
}

impl NormalizedDate {
    /// `YYYY-MM-DD` rendering.
    pub fn formatted(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

/// Turns raw date tokens into plausible calendar dates relative to `today`.
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    today: NaiveDate,
    config: DateConfig,
}

impl DateNormalizer {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            config: DateConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Normalize one raw token, or `None` if it cannot be trusted.
    pub fn normalize(&self, token: &str) -> Option<NormalizedDate> {
        let token = token.trim();

        for template in TEMPLATES.iter() {
            let Some(parts) = template.split(token) else {
                continue;
            };
            if !(1..=31).contains(&parts.day) || !(1..=12).contains(&parts.month) {
                continue;
            }

            let year = expand_year(parts.year, template.year_digits);
            let mut repair = None;

            let year = if self.year_in_window(year) {
                year
            } else {
                if template.order == DateOrder::YearMonthDay && self.looks_swapped(parts) {
                    trace!("Token {:?} looks day-first under {}, skipping", token, template);
                    continue;
                }

                let Some((repaired, method)) = self.repair_year(token, year) else {
                    debug!("Rejecting {:?}: year {} cannot be repaired", token, year);
                    return None;
                };
                debug!(
                    "Repaired year in {:?}: {} -> {} ({:?})",
                    token, year, repaired, method
                );
                repair = Some(YearRepair {
                    token: token.to_string(),
                    from: year,
                    to: repaired,
                    method,
                });
                repaired
            };

            let Some(date) = NaiveDate::from_ymd_opt(year, parts.month, parts.day) else {
                trace!("Token {:?} is not a calendar date under {}", token, template);
                continue;
            };

            if !self.is_plausible(date) {
                debug!("Rejecting {:?}: {} outside plausible range", token, date);
                return None;
            }

            return Some(NormalizedDate {
                date,
                template: *template,
                repair,
            });
        }

        None
    }

    fn year_in_window(&self, year: i32) -> bool {
        (self.config.min_year..=self.config.max_year).contains(&year)
    }

    /// A year-first read whose year slot is a small number and whose day
    /// could itself be a two-digit year is more likely a day-first token.
    fn looks_swapped(&self, parts: RawParts) -> bool {
        (1..=31).contains(&parts.year) && self.year_in_window(expand_year(parts.day as i32, 2))
    }

    /// Guess the intended year for an out-of-window one.
    fn repair_year(&self, token: &str, year: i32) -> Option<(i32, RepairMethod)> {
        if let Some(repaired) = self.repair_by_overlap(year) {
            return Some((repaired, RepairMethod::DigitOverlap));
        }

        let seen = digit_counts(token);
        DIGIT_PAIR_RULES
            .iter()
            .find(|(a, b, _)| seen[*a as usize] > 0 && seen[*b as usize] > 0)
            .map(|(_, _, guess)| *guess)
            .filter(|guess| self.year_in_window(*guess))
            .map(|guess| (guess, RepairMethod::DigitPair))
    }

    /// Compare the year's digits with the current and preceding years.
    /// Needs at least three of four digits in common; the most recent year
    /// wins a tie.
    fn repair_by_overlap(&self, year: i32) -> Option<i32> {
        let digits = year.to_string();
        if digits.len() != 4 {
            return None;
        }
        let counts = digit_counts(&digits);

        let current = self.today.year();
        let mut best: Option<(usize, i32)> = None;

        let oldest = current
            .saturating_sub(self.config.repair_lookback_years)
            .max(self.config.min_year);

        for candidate in (oldest..=current).rev() {
            if !self.year_in_window(candidate) {
                continue;
            }
            let overlap = multiset_overlap(&counts, &digit_counts(&candidate.to_string()));
            if overlap >= 3 && best.is_none_or(|(o, _)| overlap > o) {
                best = Some((overlap, candidate));
            }
        }

        best.map(|(_, year)| year)
    }

    fn is_plausible(&self, date: NaiveDate) -> bool {
        let latest = Duration::try_days(self.config.max_future_days)
            .and_then(|ahead| self.today.checked_add_signed(ahead))
            .unwrap_or(NaiveDate::MAX);
        let earliest = self
            .config
            .max_age_years
            .checked_mul(12)
            .and_then(|months| self.today.checked_sub_months(Months::new(months)))
            .unwrap_or(NaiveDate::MIN);

        date <= latest && date >= earliest
    }
}

/// Bill date extractor.
///
/// Every date token found by the date rules is normalized independently;
/// only tokens that survive become candidates.
pub struct DateExtractor {
    normalizer: DateNormalizer,
}

impl DateExtractor {
    pub fn new(normalizer: DateNormalizer) -> Self {
        Self { normalizer }
    }

    /// Candidates plus the year repairs that produced them.
    pub fn extract_with_repairs(
        &self,
        text: &str,
    ) -> (Vec<FieldCandidate<NaiveDate>>, Vec<YearRepair>) {
        let mut results = Vec::new();
        let mut repairs = Vec::new();

        for rule in DATE_RULES.iter() {
            for caps in rule.regex.captures_iter(text) {
                let (Some(whole), Some(m)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if rule.id == "date_label" && preceded_by_due(text, whole.start()) {
                    continue;
                }

                let Some(normalized) = self.normalizer.normalize(m.as_str()) else {
                    continue;
                };
                trace!("{} matched {:?} -> {}", rule.id, m.as_str(), normalized.date);

                results.push(
                    FieldCandidate::new(Field::Date, normalized.date, rule.priority, rule.id)
                        .with_position(m.start(), m.end()),
                );
                if let Some(repair) = normalized.repair {
                    if !repairs.contains(&repair) {
                        repairs.push(repair);
                    }
                }
            }
        }

        (results, repairs)
    }
}

impl FieldExtractor for DateExtractor {
    type Output = NaiveDate;

    fn extract_all(&self, text: &str) -> Vec<FieldCandidate<NaiveDate>> {
        self.extract_with_repairs(text).0
    }
}

fn expand_year(year: i32, digits: usize) -> i32 {
    if digits != 2 {
        year
    } else if year <= 50 {
        2000 + year
    } else {
        1900 + year
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn digit_counts(s: &str) -> [u8; 10] {
    let mut counts = [0u8; 10];
    for d in s.chars().filter_map(|c| c.to_digit(10)) {
        counts[d as usize] += 1;
    }
    counts
}

fn multiset_overlap(a: &[u8; 10], b: &[u8; 10]) -> usize {
    a.iter().zip(b).map(|(x, y)| (*x).min(*y) as usize).sum()
}

fn preceded_by_due(text: &str, start: usize) -> bool {
    let before = text[..start].trim_end();
    before
        .get(before.len().saturating_sub(3)..)
        .is_some_and(|tail| tail.eq_ignore_ascii_case("due"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn normalizer() -> DateNormalizer {
        DateNormalizer::new(ymd(2025, 6, 1))
    }

    #[test]
    fn test_clean_date_needs_no_repair() {
        let normalized = normalizer().normalize("15/05/2025").unwrap();
        assert_eq!(normalized.formatted(), "2025-05-15");
        assert_eq!(normalized.repair, None);
        assert_eq!(normalized.template.to_string(), "DD/MM/YYYY");
    }

    #[test]
    fn test_separators_and_year_first() {
        let n = normalizer();
        assert_eq!(n.normalize("12-04-2025").unwrap().date, ymd(2025, 4, 12));
        assert_eq!(n.normalize("12.04.2025").unwrap().date, ymd(2025, 4, 12));
        assert_eq!(n.normalize("2025-04-12").unwrap().date, ymd(2025, 4, 12));
        assert_eq!(n.normalize("2025/04/12").unwrap().date, ymd(2025, 4, 12));
    }

    #[test]
    fn test_two_digit_years() {
        let n = normalizer();
        assert_eq!(n.normalize("15/05/25").unwrap().date, ymd(2025, 5, 15));
        // 99 expands to 1999 and nothing in the token suggests a repair
        assert_eq!(n.normalize("15/05/99"), None);
    }

    #[test]
    fn test_corrupted_year_repaired_by_digit_pair() {
        let normalized = normalizer().normalize("24-01-1673").unwrap();
        assert_eq!(normalized.formatted(), "2024-01-24");

        let repair = normalized.repair.unwrap();
        assert_eq!(repair.from, 1673);
        assert_eq!(repair.to, 2024);
        assert_eq!(repair.method, RepairMethod::DigitPair);
    }

    #[test]
    fn test_corrupted_year_repaired_by_overlap() {
        let normalized = normalizer().normalize("12/03/2924").unwrap();
        assert_eq!(normalized.date, ymd(2024, 3, 12));
        assert_eq!(normalized.repair.unwrap().method, RepairMethod::DigitOverlap);
    }

    #[test]
    fn test_overlap_runs_before_digit_pairs() {
        // 2052 shares three digits with 2025; the {2,3} pair rule would say 2023
        let normalized = normalizer().normalize("13/03/2052").unwrap();
        assert_eq!(normalized.date, ymd(2025, 3, 13));
        assert_eq!(normalized.repair.unwrap().method, RepairMethod::DigitOverlap);
    }

    #[test]
    fn test_repaired_year_stays_in_window() {
        let n = normalizer();
        for token in ["24-01-1673", "12/03/2924", "13/03/2052", "01/01/7777", "05/05/1111"] {
            if let Some(normalized) = n.normalize(token) {
                assert!((2000..=2050).contains(&normalized.date.year()), "{token}");
            }
        }
        assert_eq!(n.normalize("01/01/7777"), None);
    }

    #[test]
    fn test_swapped_year_first_token_is_skipped() {
        assert_eq!(normalizer().normalize("0015-05-20"), None);
    }

    #[test]
    fn test_invalid_calendar_date() {
        assert_eq!(normalizer().normalize("30/02/2025"), None);
        assert_eq!(normalizer().normalize("31/04/2025"), None);
        assert_eq!(normalizer().normalize("15/13/2025"), None);
    }

    #[test]
    fn test_future_tolerance() {
        let n = normalizer();
        assert_eq!(n.normalize("02/06/2025").unwrap().date, ymd(2025, 6, 2));
        assert_eq!(n.normalize("03/06/2025"), None);
    }

    #[test]
    fn test_too_old() {
        let n = normalizer();
        assert_eq!(n.normalize("01/06/2015").unwrap().date, ymd(2015, 6, 1));
        assert_eq!(n.normalize("31/05/2015"), None);
    }

    #[test]
    fn test_labeled_date_outranks_bare_date() {
        let extractor = DateExtractor::new(normalizer());
        let text = "Printed 20/05/2025\nBill Date: 15/05/2025\nDue Date: 30/05/2025";
        assert_eq!(extractor.extract(text), Some(ymd(2025, 5, 15)));
    }

    #[test]
    fn test_due_date_is_not_a_bill_date_label() {
        let extractor = DateExtractor::new(normalizer());
        let candidates = extractor.extract_all("Due Date: 30/05/2025");
        assert!(candidates.iter().all(|c| c.rule != "date_label"));
        assert!(candidates.iter().any(|c| c.rule == "due_date"));
    }

    #[test]
    fn test_most_recent_wins_on_equal_priority() {
        let extractor = DateExtractor::new(normalizer());
        let text = "01/03/2025 some text 15/04/2025";
        assert_eq!(extractor.extract(text), Some(ymd(2025, 4, 15)));
    }

    #[test]
    fn test_unrepairable_token_falls_through_to_next() {
        let extractor = DateExtractor::new(normalizer());
        let text = "Bill Date: 15/05/1111\nReading Date: 10/05/2025";
        let (candidates, repairs) = extractor.extract_with_repairs(text);
        assert!(repairs.is_empty());
        assert_eq!(extractor.extract(text), Some(ymd(2025, 5, 10)));
        assert!(candidates.iter().all(|c| c.rule != "bill_date"));
    }
}
