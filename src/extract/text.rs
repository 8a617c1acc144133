//! Regex extraction over flattened page text.
//!
//! Used where a value is not in a discrete element but interpolated into free text
//! or a script block. Patterns come from the site descriptors; every function takes
//! the pattern so markup drift is a descriptor change only.

use chrono::{DateTime, Local};
use tracing::debug;

use super::{compile, parse_ymd, parse_ymd_hm};
use crate::error::{ScrapeError, ScrapeResult};

/// Sums the first capture group of every match of `pattern`.
///
/// Every match counts, so a balance rendered both in a summary and in a detail
/// block is added twice. Zero matches is a parse error.
pub fn sum_integer_matches(text: &str, pattern: &str) -> ScrapeResult<i64> {
    let re = compile(pattern)?;
    let mut total = 0i64;
    let mut matches = 0usize;
    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        match m.as_str().parse::<i64>() {
            Ok(v) => {
                total += v;
                matches += 1;
            }
            Err(e) => debug!(value = m.as_str(), error = %e, "Ignoring non-integer amount match"),
        }
    }
    if matches == 0 {
        return Err(ScrapeError::Parse(format!("no match for balance pattern {pattern:?}")));
    }
    debug!(matches, total, "Summed amount matches");
    Ok(total)
}

/// First match of a two-date window pattern, e.g. `Från 2023-01-01 Till 2023-01-31`.
///
/// No match means no active window. A match whose dates do not parse is an error.
pub fn date_window(
    text: &str,
    pattern: &str,
) -> ScrapeResult<Option<(DateTime<Local>, DateTime<Local>)>> {
    let re = compile(pattern)?;
    let Some(caps) = re.captures(text) else {
        return Ok(None);
    };
    match (caps.get(1), caps.get(2)) {
        (Some(start), Some(end)) => Ok(Some((parse_ymd(start.as_str())?, parse_ymd(end.as_str())?))),
        _ => Err(ScrapeError::Parse(format!(
            "window pattern {pattern:?} must capture two dates"
        ))),
    }
}

/// First `YYYY-MM-DD HH:MM` timestamp captured by `pattern`, minute precision.
pub fn timestamp(text: &str, pattern: &str) -> ScrapeResult<Option<DateTime<Local>>> {
    let re = compile(pattern)?;
    match re.captures(text).and_then(|c| c.get(1)) {
        Some(m) => parse_ymd_hm(m.as_str()).map(Some),
        None => Ok(None),
    }
}

/// Two integers captured by `pattern`, e.g. queue position and copies in queue.
pub fn integer_pair(text: &str, pattern: &str) -> ScrapeResult<Option<(u32, u32)>> {
    let re = compile(pattern)?;
    let Some(caps) = re.captures(text) else {
        return Ok(None);
    };
    let field = |i: usize| -> ScrapeResult<u32> {
        caps.get(i)
            .ok_or_else(|| ScrapeError::Parse(format!("pattern {pattern:?} lacks group {i}")))?
            .as_str()
            .parse::<u32>()
            .map_err(|e| ScrapeError::Parse(format!("invalid count in {text:?}: {e}")))
    };
    Ok(Some((field(1)?, field(2)?)))
}
