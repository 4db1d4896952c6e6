//! Cache key grammar: `{operation}:{normalized-args}`.
//!
//! Symbols are uppercased, search queries lowercased, dates rendered as
//! `YYYY-MM-DD`.

use chrono::NaiveDate;

use crate::models::{Interval, Operation};

const STALE_PREFIX: &str = "stale:";

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

pub fn quote(symbol: &str) -> String {
    format!("{}:{}", Operation::Quote, normalize_symbol(symbol))
}

pub fn historical(symbol: &str, start: NaiveDate, end: NaiveDate, interval: Interval) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        Operation::HistoricalPrices,
        normalize_symbol(symbol),
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
        interval
    )
}

pub fn fundamentals(symbol: &str) -> String {
    format!("{}:{}", Operation::Fundamentals, normalize_symbol(symbol))
}

pub fn profile(symbol: &str) -> String {
    format!("{}:{}", Operation::CompanyProfile, normalize_symbol(symbol))
}

/// The result limit is not part of the key.
pub fn search(query: &str) -> String {
    format!("{}:{}", Operation::SymbolSearch, query.trim().to_lowercase())
}

/// Long-lived shadow of a primary key.
pub fn stale_key(key: &str) -> String {
    format!("{}{}", STALE_PREFIX, key)
}
