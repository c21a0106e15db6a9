use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;

/// Parse a calendar date: ISO `YYYY-MM-DD` or natural language relative to today in `tz`.
pub fn parse_date(input: &str, tz: Tz) -> Result<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(input, Utc::now().with_timezone(&tz), Dialect::Uk)
        .map(|at| at.date_naive())
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", input, e))
}
