//! Regex pattern library for utility bill extraction.
//!
//! Rules are grouped per field and carry a priority reflecting how specific
//! their label is. Every labeled rule tolerates a bounded run of arbitrary
//! characters, newlines included, between the label and its value.

use lazy_static::lazy_static;
use regex::Regex;

/// A number with optional thousands grouping (Western `1,250` or Indian
/// `1,25,000`, or space separated `1 250`) and an optional decimal part.
const NUMBER: &str = r"(\d{1,3}(?:,\d{2,3}|[ \u{00a0}]\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)";

/// A meter counter: at least two digits, optionally comma grouped.
const METER_NUMBER: &str = r"(\d{1,3}(?:,\d{3})+|\d{2,})";

/// A short numeric date with `/`, `-` or `.` separators.
const DATE_TOKEN: &str = r"\b(\d{1,4}[/\-.]\d{1,2}[/\-.]\d{2,4})\b";

/// Optional currency marker in front of an amount.
const CURRENCY: &str = r"(?:₹|\bRs\b\.?|\bINR\b)?";

/// A field rule: the value is always in capture group 1.
#[derive(Debug)]
pub struct PatternRule {
    /// Stable rule id, reported in traces.
    pub id: &'static str,
    /// Higher wins during selection.
    pub priority: u8,
    pub regex: Regex,
}

impl PatternRule {
    fn new(id: &'static str, priority: u8, pattern: &str) -> Self {
        Self {
            id,
            priority,
            regex: Regex::new(pattern).unwrap(),
        }
    }

    fn numeric(id: &'static str, priority: u8, label: &str, gap: usize) -> Self {
        Self::new(
            id,
            priority,
            &format!(r"(?is)(?:{label}).{{0,{gap}}}?[:=\-]?\s*{NUMBER}"),
        )
    }

    fn money(id: &'static str, priority: u8, label: &str, gap: usize) -> Self {
        Self::new(
            id,
            priority,
            &format!(r"(?is)(?:{label}).{{0,{gap}}}?[:=\-]?\s*{CURRENCY}\s*{NUMBER}"),
        )
    }

    fn date(id: &'static str, priority: u8, label: &str, gap: usize) -> Self {
        Self::new(
            id,
            priority,
            &format!(r"(?is)(?:{label}).{{0,{gap}}}?[:=\-]?\s*{DATE_TOKEN}"),
        )
    }
}

/// Priority of the units value derived from a present/previous meter pair.
/// Exceeds every label-based units rule.
pub const METER_PRIORITY: u8 = 100;

/// Priority of a bare currency-marked number. Anything above it is a
/// labeled total.
pub const CURRENCY_MARKED_PRIORITY: u8 = 30;

/// Priority of the amount rebuilt from itemized charges.
pub const ITEMIZED_PRIORITY: u8 = 10;

lazy_static! {
    // Units consumed, most specific label first
    pub static ref UNITS_RULES: Vec<PatternRule> = vec![
        PatternRule::numeric("units_billed", 90, r"\b(?:units?\s*billed|billed\s*units?)\b", 15),
        PatternRule::numeric(
            "units_consumed",
            90,
            r"\b(?:units?\s*consumed|consumed\s*units?|units?\s*consumption)\b",
            15,
        ),
        PatternRule::numeric("consumption", 60, r"\b(?:consumption|consumed)\b", 15),
        PatternRule::numeric("units_localized", 55, r"యూనిట్లు|వినియోగం|यूनिट|खपत", 15),
        PatternRule::numeric("units_label", 50, r"\bunits?\b", 10),
        PatternRule::numeric(
            "units_misspelled",
            30,
            r"\b(?:unls|unlts|un1ts|untis|umits|uints|vnits|urits|unils)\b",
            15,
        ),
        PatternRule::new(
            "units_suffix",
            20,
            &format!(r"(?i){NUMBER}[ \t\u{{00a0}}]*(?:kwh|kl|cbm|units?)\b"),
        ),
    ];

    // Amount payable
    pub static ref AMOUNT_RULES: Vec<PatternRule> = vec![
        PatternRule::money(
            "amount_payable",
            90,
            r"\b(?:net\s*amount|amount\s*payable|total\s*payable|net\s*payable|total\s*amount\s*due|amount\s*due)\b",
            20,
        ),
        PatternRule::money("total_amount", 80, r"\btotal\s*amount\b", 20),
        PatternRule::money("bill_amount", 75, r"\b(?:bill\s*amount|current\s*bill)\b", 20),
        PatternRule::money(
            "amount_localized",
            55,
            r"మొత్తం|చెల్లించాల్సిన|कुल\s*राशि|देय\s*राशि",
            20,
        ),
        PatternRule::money("payable", 50, r"\bpayable\b", 15),
        PatternRule::money("total", 45, r"\b(?:grand\s*)?total\b", 15),
        PatternRule::money(
            "amount_misspelled",
            35,
            r"\b(?:am0unt|arnount|amout|amounl|amoumt|amnt|arnt)\b",
            20,
        ),
        PatternRule::new(
            "currency_marked",
            CURRENCY_MARKED_PRIORITY,
            &format!(r"(?:₹|\bRs\b\.?|\bINR\b)\s*{NUMBER}"),
        ),
        PatternRule::new(
            "currency_marked",
            CURRENCY_MARKED_PRIORITY,
            &format!(r"{NUMBER}\s*(?:₹|\bRs\b|\bINR\b|/-)"),
        ),
    ];

    // Itemized charges summed when no total is printed
    pub static ref ITEMIZED_CHARGES: Regex = Regex::new(&format!(
        r"(?is)\b(?:energy\s*charges?|fixed\s*charges?|customer\s*charges?|meter\s*rent|fuel\s*(?:cost\s*)?surcharge|fppca|surcharges?|electricity\s*duty|duty|water\s*charges?|sewerage\s*charges?)\b.{{0,20}}?[:=\-]?\s*{CURRENCY}\s*{NUMBER}"
    )).unwrap();

    // Meter readings on water bills
    pub static ref PRESENT_READING: Regex = Regex::new(&format!(
        r"(?is)\b(?:present|current|curr\.?|closing)\s*(?:meter\s*)?(?:reading|rdng|rdg|read)\b.{{0,20}}?[:=\-]?\s*{METER_NUMBER}"
    )).unwrap();

    pub static ref PREVIOUS_READING: Regex = Regex::new(&format!(
        r"(?is)\b(?:previous|prev\.?|past|earlier|last|opening)\s*(?:meter\s*)?(?:reading|rdng|rdg|read)\b.{{0,20}}?[:=\-]?\s*{METER_NUMBER}"
    )).unwrap();

    // Bill date tokens, context-qualified labels first
    pub static ref DATE_RULES: Vec<PatternRule> = vec![
        PatternRule::date(
            "bill_date",
            90,
            r"\b(?:bill(?:ing)?\s*date|date\s*of\s*bill|bill\s*dt\.?|invoice\s*date|issue\s*date)",
            20,
        ),
        PatternRule::date("reading_date", 70, r"\b(?:meter\s*)?(?:reading\s*date|rdg\s*dt\.?)", 20),
        PatternRule::date("date_localized", 60, r"తేదీ|दिनांक|तारीख", 20),
        PatternRule::date("date_label", 50, r"\bdate\b", 15),
        PatternRule::date("due_date", 20, r"\bdue\s*date\b", 15),
        PatternRule::new("date_shaped", 10, DATE_TOKEN),
    ];

    // Bill kind keywords
    pub static ref ELECTRICITY_HINTS: Regex = Regex::new(
        r"(?i)\b(?:kwh|electricity|electric|power|discom|energy\s*charges?|tariff|load)\b"
    ).unwrap();

    pub static ref WATER_HINTS: Regex = Regex::new(
        r"(?i)\b(?:water|sewerage|kl|cbm|kilo\s*litres?|jal)\b"
    ).unwrap();
}
