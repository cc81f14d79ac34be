//! Text normalization for scraped table cells.
//!
//! Portals render dates and currency in their own formats; drivers hand the raw
//! cell text to these helpers and get either a canonical value or a
//! `PageStructure` error naming the offending text.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{Result, ScrapeError};

// -$1,234.56 / $1,234 / $0.99
static DOLLARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<neg>-)?\$(?P<num>\d{1,3}(?:,?\d{3})*)(?P<cents>\.\d\d)?$").unwrap());

/// Whether a currency cell must carry a cents part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cents {
    Required,
    Optional,
}

/// Whether a leading minus sign is acceptable in a currency cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Signed,
    Unsigned,
}

/// Replace every whitespace run with a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a date cell with a chrono format string, e.g. `"%b %d, %Y"`.
pub fn parse_date(text: &str, format: &str) -> Result<NaiveDate> {
    let text = collapse_whitespace(text);
    NaiveDate::parse_from_str(&text, format)
        .map_err(|e| ScrapeError::page(format!("date {text:?} does not match {format:?}: {e}")))
}

/// Parse a dollar cell such as `-$1,234.56` into a signed decimal.
pub fn parse_dollars(text: &str, cents: Cents, sign: Sign) -> Result<Decimal> {
    let text = text.trim();
    let caps = DOLLARS_RE
        .captures(text)
        .ok_or_else(|| ScrapeError::page(format!("amount {text:?} is not a dollar value")))?;

    if cents == Cents::Required && caps.name("cents").is_none() {
        return Err(ScrapeError::page(format!("amount {text:?} has no cents")));
    }
    if sign == Sign::Unsigned && caps.name("neg").is_some() {
        return Err(ScrapeError::page(format!("amount {text:?} must not be negative")));
    }

    let mut raw = caps["num"].replace(',', "");
    if let Some(c) = caps.name("cents") {
        raw.push_str(c.as_str());
    }
    let mut amount = Decimal::from_str(&raw)
        .map_err(|e| ScrapeError::page(format!("amount {text:?}: {e}")))?;
    if caps.name("neg").is_some() {
        amount = -amount;
    }
    Ok(amount)
}

/// Pick exactly one of a funds-out / funds-in column pair. Funds out come back
/// negative.
///
/// `debit_sign` says how the portal renders funds out: `Signed` portals print
/// them with a leading minus (which is then required), `Unsigned` ones print a
/// bare amount. Funds in are always unsigned.
pub fn debit_or_credit(debit: &str, credit: &str, cents: Cents, debit_sign: Sign) -> Result<Decimal> {
    let (debit, credit) = (debit.trim(), credit.trim());
    match (debit.is_empty(), credit.is_empty()) {
        (false, true) => {
            let amount = parse_dollars(debit, cents, debit_sign)?;
            match debit_sign {
                Sign::Unsigned => Ok(-amount),
                Sign::Signed if amount.is_sign_negative() => Ok(amount),
                Sign::Signed => Err(ScrapeError::page(format!("funds out {debit:?} is not negative"))),
            }
        }
        (true, false) => parse_dollars(credit, cents, Sign::Unsigned),
        _ => Err(ScrapeError::page(format!(
            "expected exactly one of funds out {debit:?} / funds in {credit:?}"
        ))),
    }
}

/// Keep only ASCII digits; fails when nothing is left.
pub fn digits_only(text: &str) -> Result<String> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(ScrapeError::page(format!("no digits in {text:?}")));
    }
    Ok(digits)
}

/// First capture group of `re` in `text`, or a `PageStructure` error.
pub fn capture<'t>(re: &Regex, text: &'t str, what: &str) -> Result<&'t str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ScrapeError::page(format!("{what}: {text:?} does not match {}", re.as_str())))
}
