//! Resampling of sorted power periods into coarser ones.
//!
//! [`aggregate`] batches positionally: it is not anchored to the calendar, so the input has to
//! start on a period boundary if the output must be aligned. [`group_by_day`] is the calendar-anchored
//! alternative.

use chrono::{NaiveDate, TimeDelta};
use chrono_tz::Tz;
use itertools::Itertools;

use crate::{core::period::PowerPeriod, prelude::*};

/// Tolerance of the period length multiplier to be considered integer.
const MULTIPLIER_TOLERANCE: f64 = 1e-4;

/// How periods of one batch get combined.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Combiner {
    Sum,
    Mean,
    Min,
    Max,

    /// Pick a specific period of each batch.
    Specific,
}

/// Combine sorted fixed-size batches of periods into periods of `period_length`.
///
/// All the periods are expected to last as long as the earliest one.
#[instrument(skip_all, fields(n_periods = periods.len(), %period_length, ?combiner))]
pub fn aggregate(
    mut periods: Vec<PowerPeriod>,
    period_length: TimeDelta,
    combiner: Combiner,
) -> Result<Vec<PowerPeriod>> {
    if matches!(combiner, Combiner::Min | Combiner::Max | Combiner::Specific) {
        return Err(Error::UnsupportedCombiner(combiner));
    }
    periods.sort();
    let Some(first) = periods.first() else {
        return Ok(Vec::new());
    };
    let batch_size = batch_size(period_length, first.duration())?;
    if let Some(duplicate) =
        periods.iter().duplicates_by(|period| (period.site_id, period.start_time)).next()
    {
        return Err(Error::DuplicateTime {
            site_id: duplicate.site_id,
            start_time: duplicate.start_time,
        });
    }
    debug!(batch_size, "batching…");

    periods
        .chunks(batch_size)
        .map(|batch| {
            let sum = sum_batch(batch)?;
            Ok(match combiner {
                Combiner::Mean => {
                    #[expect(clippy::cast_precision_loss)]
                    let batch_len = batch.len() as f64;
                    sum.with_power(sum.power.map(|power| power / batch_len))
                }
                _ => sum,
            })
        })
        .collect()
}

fn batch_size(period_length: TimeDelta, source_duration: TimeDelta) -> Result<usize> {
    let multiplier = period_length.as_seconds_f64() / source_duration.as_seconds_f64();
    let rounded = multiplier.round();
    if (multiplier - rounded).abs() > MULTIPLIER_TOLERANCE || rounded < 1.0 {
        return Err(Error::InvalidPeriodLength { period_length, source_duration });
    }
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let batch_size = rounded as usize;
    Ok(batch_size)
}

fn sum_batch(batch: &[PowerPeriod]) -> Result<PowerPeriod> {
    let [first, rest @ ..] = batch else { unreachable!("batches are never empty") };
    rest.iter().try_fold(*first, |sum, period| {
        Ok(sum.try_join(period, |lhs, rhs| lhs + rhs)?.period)
    })
}

/// Periods folded per calendar day.
#[must_use]
#[derive(Debug, Default)]
pub struct DailyGroups {
    pub periods: Vec<PowerPeriod>,

    /// Periods that could not be merged into their day.
    pub n_dropped: usize,
}

/// Fold the periods into one per calendar day of their start time by pairwise merging.
///
/// Days are those of the site's timezone, whatever offset the periods come with. Periods which
/// fail to merge are dropped from their day and counted.
#[instrument(skip_all, fields(n_periods = periods.len(), %timezone))]
pub fn group_by_day(mut periods: Vec<PowerPeriod>, timezone: Tz) -> DailyGroups {
    periods.sort();
    let mut groups = DailyGroups::default();
    let mut current: Option<(NaiveDate, PowerPeriod)> = None;

    for mut period in periods {
        period.start_time = period.start_time.with_timezone(&timezone).fixed_offset();
        let date = period.start_time.date_naive();
        match current {
            Some((current_date, ref mut accumulated)) if current_date == date => {
                match accumulated.try_merge(&period) {
                    Ok(merged) => *accumulated = merged.period,
                    Err(error) => {
                        warn!(%date, start_time = %period.start_time, %error, "dropped");
                        groups.n_dropped += 1;
                    }
                }
            }
            _ => {
                if let Some((date, accumulated)) = current.replace((date, period)) {
                    trace!(%date, "day finished");
                    groups.periods.push(accumulated);
                }
            }
        }
    }
    groups.periods.extend(current.map(|(_, accumulated)| accumulated));

    info!(n_days = groups.periods.len(), groups.n_dropped, "grouped");
    groups
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono_tz::Europe::Amsterdam;

    use super::*;
    use crate::core::{
        measurement::Measurement,
        period::tests::{at, period},
        site::SiteId,
    };

    fn quarters(n: usize, value: f64) -> Vec<PowerPeriod> {
        (0..n)
            .map(|index| {
                let start_time = at(0, 0) + TimeDelta::minutes(15 * i64::try_from(index).unwrap());
                period(1, start_time, 15, value)
            })
            .collect()
    }

    #[test]
    fn test_daily_sum() -> Result {
        let aggregated = aggregate(quarters(96, 1.0), TimeDelta::days(1), Combiner::Sum)?;
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].start_time, at(0, 0));
        assert_eq!(aggregated[0].duration(), TimeDelta::days(1));
        assert_abs_diff_eq!(aggregated[0].get(Measurement::Generated).0, 96.0);
        Ok(())
    }

    #[test]
    fn test_daily_mean() -> Result {
        let aggregated = aggregate(quarters(96, 1.0), TimeDelta::days(1), Combiner::Mean)?;
        assert_eq!(aggregated.len(), 1);
        assert_abs_diff_eq!(aggregated[0].get(Measurement::Generated).0, 1.0);
        Ok(())
    }

    #[test]
    fn test_length_and_mean_equals_sum_over_batch_size() -> Result {
        let periods = (0..10)
            .map(|index| {
                let start_time = at(0, 0) + TimeDelta::minutes(15 * index);
                #[expect(clippy::cast_precision_loss)]
                let value = index as f64 * 1.7;
                period(1, start_time, 15, value)
            })
            .collect_vec();
        let sums = aggregate(periods.clone(), TimeDelta::hours(1), Combiner::Sum)?;
        let means = aggregate(periods, TimeDelta::hours(1), Combiner::Mean)?;
        assert_eq!(sums.len(), 3);
        assert_eq!(means.len(), 3);
        for ((sum, mean), batch_len) in sums.iter().zip(&means).zip([4.0, 4.0, 2.0]) {
            assert_eq!(sum.start_time, mean.start_time);
            for (measurement, value) in sum.power.iter() {
                assert_eq!((value / batch_len).0, mean.get(measurement).0);
            }
        }
        assert_eq!(sums[2].duration(), TimeDelta::minutes(30));
        Ok(())
    }

    #[test]
    fn test_unsorted_input() -> Result {
        let mut periods = quarters(4, 2.0);
        periods.reverse();
        let aggregated = aggregate(periods, TimeDelta::hours(1), Combiner::Sum)?;
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].start_time, at(0, 0));
        Ok(())
    }

    #[test]
    fn test_duplicate_time() {
        let mut periods = quarters(4, 1.0);
        periods.push(period(1, at(0, 30), 15, 5.0));
        let result = aggregate(periods, TimeDelta::hours(1), Combiner::Sum);
        assert!(matches!(result, Err(Error::DuplicateTime { .. })));
    }

    #[test]
    fn test_duplicate_time_among_other_sites() {
        let periods = vec![
            period(1, at(0, 0), 15, 1.0),
            period(2, at(0, 0), 15, 2.0),
            period(1, at(0, 0), 15, 3.0),
        ];
        let result = aggregate(periods, TimeDelta::hours(1), Combiner::Sum);
        assert!(matches!(
            result,
            Err(Error::DuplicateTime { site_id: SiteId(1), .. }),
        ));
    }

    #[test]
    fn test_period_length_not_a_multiple() {
        let result = aggregate(quarters(4, 1.0), TimeDelta::minutes(20), Combiner::Sum);
        assert!(matches!(result, Err(Error::InvalidPeriodLength { .. })));
        let result = aggregate(quarters(4, 1.0), TimeDelta::minutes(5), Combiner::Sum);
        assert!(matches!(result, Err(Error::InvalidPeriodLength { .. })));
    }

    #[test]
    fn test_unsupported_combiners() {
        for combiner in [Combiner::Min, Combiner::Max, Combiner::Specific] {
            let result = aggregate(quarters(4, 1.0), TimeDelta::hours(1), combiner);
            assert!(matches!(result, Err(Error::UnsupportedCombiner(_))));
        }
    }

    #[test]
    fn test_empty() -> Result {
        assert!(aggregate(Vec::new(), TimeDelta::hours(1), Combiner::Mean)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_group_by_day() {
        let mut periods = quarters(96 + 4, 4.0);
        periods.push(period(1, at(0, 0), 15, 8.0));
        let groups = group_by_day(periods, Tz::UTC);
        assert_eq!(groups.periods.len(), 2);
        assert_eq!(groups.n_dropped, 1);
        assert_eq!(groups.periods[0].start_time, at(0, 0));
        assert_eq!(groups.periods[0].duration(), TimeDelta::days(1));
        assert_eq!(groups.periods[1].start_time, at(0, 0) + TimeDelta::days(1));
        assert_eq!(groups.periods[1].duration(), TimeDelta::hours(1));
    }

    #[test]
    fn test_group_by_day_in_site_timezone() {
        // Read back from the database in UTC: 00:15 and 12:00 in Amsterdam.
        let periods = vec![
            period(1, at(0, 0) - TimeDelta::minutes(45), 15, 1.0),
            period(1, at(11, 0), 15, 3.0),
        ];
        let groups = group_by_day(periods, Amsterdam);
        assert_eq!(groups.periods.len(), 1);
        assert_eq!(groups.n_dropped, 0);

        let start_time = groups.periods[0].start_time;
        assert_eq!(start_time.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(start_time.offset().local_minus_utc(), 3600);
        assert_abs_diff_eq!(groups.periods[0].get(Measurement::Consumed).0, 2.0);
    }
}
