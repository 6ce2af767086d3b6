//! Parsing and ranking of free-text cashback descriptions.
//!
//! Descriptions such as `"5%"`, `"Opptil 8,5 %"` or `"35 kr"` are turned into a
//! [`CashbackRate`] that [`compare_cashback_rates`] can order. The regex
//! strategy lives entirely in [`parse_cashback_rate`].

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static VARIABLE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:opptil|opp\s+til|inntil|up\s+to)\s*").expect("valid prefix regex")
});

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*%").expect("valid percent regex"));

static FIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:kr(?:oner)?\b|nok\b|,-)").expect("valid fixed regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateKind {
    Percent,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashbackRate {
    pub value: f64,
    pub kind: RateKind,
    /// `true` for "up to" rates, which are not guaranteed.
    pub is_variable: bool,
}

impl CashbackRate {
    /// Rate for descriptions that could not be parsed; ranks below everything.
    pub const UNPARSED: CashbackRate = CashbackRate {
        value: 0.0,
        kind: RateKind::Percent,
        is_variable: false,
    };
}

pub fn parse_cashback_rate(description: &str) -> CashbackRate {
    let (rest, is_variable) = match VARIABLE_PREFIX.find(description) {
        Some(m) => (&description[m.end()..], true),
        None => (description, false),
    };

    if let Some(value) = capture_number(&PERCENT, rest) {
        return CashbackRate {
            value,
            kind: RateKind::Percent,
            is_variable,
        };
    }

    if let Some(value) = capture_number(&FIXED, rest) {
        return CashbackRate {
            value,
            kind: RateKind::Fixed,
            is_variable,
        };
    }

    CashbackRate::UNPARSED
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    let digits = re.captures(text)?.get(1)?.as_str().replace(',', ".");
    digits.parse().ok()
}

/// Order two rates best-first: `Less` means `a` ranks ahead of `b`.
///
/// Percentages always beat fixed amounts; within a kind the higher value
/// wins, and at equal value a guaranteed rate beats an "up to" rate.
pub fn compare_cashback_rates(a: &CashbackRate, b: &CashbackRate) -> Ordering {
    match (a.kind, b.kind) {
        (RateKind::Percent, RateKind::Fixed) => return Ordering::Less,
        (RateKind::Fixed, RateKind::Percent) => return Ordering::Greater,
        _ => {}
    }

    b.value
        .partial_cmp(&a.value)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.is_variable.cmp(&b.is_variable))
}
