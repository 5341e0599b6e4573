//! Lossless conversions of the temporal values into integer columns.

use chrono::{DateTime, NaiveDate, TimeDelta};

use crate::core::time::Timestamp;

/// Seconds since the Unix epoch.
pub fn to_epoch(timestamp: Timestamp) -> i64 {
    timestamp.timestamp()
}

/// Read a UTC timestamp back.
pub fn from_epoch(index: usize, seconds: i64) -> rusqlite::Result<Timestamp> {
    DateTime::from_timestamp(seconds, 0)
        .map(|timestamp| timestamp.fixed_offset())
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(index, seconds))
}

pub fn to_seconds(duration: TimeDelta) -> i64 {
    duration.num_seconds()
}

pub fn from_seconds(index: usize, seconds: i64) -> rusqlite::Result<TimeDelta> {
    TimeDelta::try_seconds(seconds).ok_or(rusqlite::Error::IntegralValueOutOfRange(index, seconds))
}

/// Days since the Unix epoch.
pub fn to_days(date: NaiveDate) -> i64 {
    date.signed_duration_since(NaiveDate::default()).num_days()
}

pub fn from_days(index: usize, days: i64) -> rusqlite::Result<NaiveDate> {
    TimeDelta::try_days(days)
        .and_then(|delta| NaiveDate::default().checked_add_signed(delta))
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(index, days))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days() -> rusqlite::Result<()> {
        let date = NaiveDate::from_ymd_opt(2019, 3, 1).unwrap();
        assert_eq!(to_days(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
        assert_eq!(from_days(0, to_days(date))?, date);
        Ok(())
    }

    #[test]
    fn test_epoch_keeps_instant() -> rusqlite::Result<()> {
        let timestamp = DateTime::parse_from_rfc3339("2024-03-01T12:15:00+01:00").unwrap();
        let restored = from_epoch(0, to_epoch(timestamp))?;
        assert_eq!(restored, timestamp);
        assert_eq!(restored.offset().local_minus_utc(), 0);
        Ok(())
    }
}
