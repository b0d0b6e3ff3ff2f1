//! Date range parameters for `/api/commits/by-date`.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid date: {0}")]
pub struct InvalidDate(pub String);

/// Which end of a range a bare calendar date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Parses an RFC 3339 timestamp or a `YYYY-MM-DD` date.
///
/// A bare date is widened to the first or last instant of that UTC day,
/// depending on `bound`.
pub fn parse_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>, InvalidDate> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| InvalidDate(raw.to_string()))?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
            .ok_or_else(|| InvalidDate(raw.to_string()))?,
    };
    Ok(date.and_time(time).and_utc())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeParams {
    /// Validates both bounds. The range is only applied when both are given.
    pub fn resolve(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, InvalidDate> {
        let start = non_empty(&self.start_date)
            .map(|s| parse_bound(s, Bound::Start))
            .transpose()?;
        let end = non_empty(&self.end_date)
            .map(|s| parse_bound(s, Bound::End))
            .transpose()?;
        Ok(start.zip(end))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
