use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::prelude::*;

/// Timestamp which always carries its offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Parse an RFC 3339 timestamp, rejecting naive ones.
pub fn parse_timestamp(input: &str) -> Result<Timestamp> {
    let input = input.trim();
    match DateTime::parse_from_rfc3339(input) {
        Ok(timestamp) => Ok(timestamp),
        Err(_) if is_naive(input) => Err(Error::MissingTimezone(input.to_owned())),
        Err(source) => Err(Error::InvalidTimestamp { input: input.to_owned(), source }),
    }
}

fn is_naive(input: &str) -> bool {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(input, format).is_ok())
        || NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok()
}

/// Local midnight of the date, the earlier one if it is ambiguous.
///
/// [`None`] when the midnight falls into a DST gap.
#[must_use]
pub fn midnight(timezone: Tz, date: NaiveDate) -> Option<Timestamp> {
    timezone
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|timestamp| timestamp.fixed_offset())
}

/// Local midnight of the timestamp's calendar day in the timezone.
#[must_use]
pub fn start_of_day(timestamp: Timestamp, timezone: Tz) -> Timestamp {
    midnight(timezone, timestamp.with_timezone(&timezone).date_naive()).unwrap_or(timestamp)
}

/// Next local midnight, unless the timestamp already is one.
#[must_use]
pub fn ceil_to_day(timestamp: Timestamp, timezone: Tz) -> Timestamp {
    let start = start_of_day(timestamp, timezone);
    if start == timestamp {
        return start;
    }
    timestamp
        .with_timezone(&timezone)
        .date_naive()
        .succ_opt()
        .and_then(|date| midnight(timezone, date))
        .unwrap_or(timestamp)
}

/// Widen the requested bounds to whole days of the site before fetching them.
///
/// The end never goes past the start of the current day, so that an incomplete day is not cached.
#[must_use]
pub fn normalize_bounds(
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    now: DateTime<Utc>,
    timezone: Tz,
) -> (Option<Timestamp>, Option<Timestamp>) {
    let now = now.fixed_offset();
    let end = end.map(|end| {
        let ceiled = ceil_to_day(end, timezone);
        if ceiled > now { start_of_day(now, timezone) } else { ceiled }
    });
    (start.map(|start| start_of_day(start, timezone)), end)
}
