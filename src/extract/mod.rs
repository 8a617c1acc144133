//! Extractors turn raw pages into fragments.
//!
//! - [`markup`]: CSS-selector driven extraction over parsed HTML.
//! - [`text`]: regex extraction over the flattened page text, for values that the
//!   site interpolates into free text with client-side templates.
//!
//! Both normalise Swedish locale quirks (decimal commas, `kr` suffixes) and express
//! every date as a timestamp in the local zone.

pub mod markup;
pub mod text;

use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;

use crate::error::{ScrapeError, ScrapeResult};

pub(crate) fn date_pattern() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("static date pattern"))
}

/// Compiles a descriptor pattern, reporting a bad pattern as a parse error.
pub(crate) fn compile(pattern: &str) -> ScrapeResult<Regex> {
    Regex::new(pattern).map_err(|e| ScrapeError::Parse(format!("invalid pattern {pattern:?}: {e}")))
}

/// Midnight of `date` in the local zone.
pub fn local_midnight(date: NaiveDate) -> ScrapeResult<DateTime<Local>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ScrapeError::Parse(format!("no midnight for {date}")))?;
    local_datetime(naive)
}

/// Interprets a naive timestamp in the local zone, taking the earlier instant on
/// ambiguous DST transitions.
pub fn local_datetime(naive: NaiveDateTime) -> ScrapeResult<DateTime<Local>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| ScrapeError::Parse(format!("{naive} does not exist in the local zone")))
}

/// Parses an exact `YYYY-MM-DD` string into local midnight.
pub fn parse_ymd(s: &str) -> ScrapeResult<DateTime<Local>> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| ScrapeError::Parse(format!("invalid date {s:?}: {e}")))?;
    local_midnight(date)
}

/// Parses `YYYY-MM-DD HH:MM` with seconds zeroed, in the local zone.
pub fn parse_ymd_hm(s: &str) -> ScrapeResult<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M")
        .map_err(|e| ScrapeError::Parse(format!("invalid timestamp {s:?}: {e}")))?;
    local_datetime(naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parse_ymd_is_local_midnight() {
        let t = parse_ymd("2023-01-31").unwrap();
        assert_eq!(t.date_naive(), NaiveDate::from_ymd_opt(2023, 1, 31).unwrap());
        assert_eq!((t.hour(), t.minute(), t.second(), t.nanosecond()), (0, 0, 0, 0));
    }

    #[test]
    fn parse_ymd_hm_zeroes_seconds() {
        let t = parse_ymd_hm("2017-02-01 13:37").unwrap();
        assert_eq!((t.hour(), t.minute(), t.second()), (13, 37, 0));
    }

    #[test]
    fn bad_pattern_is_parse_error() {
        assert!(matches!(compile("(unclosed"), Err(ScrapeError::Parse(_))));
    }
}
