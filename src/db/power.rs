use rusqlite::{Row, params};

use crate::{
    core::{
        measurement::Measurements,
        period::PowerPeriod,
        site::{SiteId, TimeLimits},
        time::Timestamp,
    },
    db::{
        Db,
        timestamp::{from_epoch, from_seconds, to_epoch, to_seconds},
    },
    prelude::*,
    quantity::power::Watts,
};

/// Number of rows inserted in one transaction.
const INSERT_BATCH_SIZE: usize = 100;

impl Db {
    /// Insert the periods, skipping those already present.
    ///
    /// Returns the number of actually inserted periods.
    #[instrument(skip_all, fields(n_periods = periods.len()))]
    pub fn add_power(&self, periods: &[PowerPeriod]) -> Result<usize> {
        let connection = self.connection()?;
        let mut n_inserted = 0;
        for batch in periods.chunks(INSERT_BATCH_SIZE) {
            let transaction = connection.unchecked_transaction()?;
            {
                let mut statement = transaction.prepare_cached(
                    "INSERT INTO power (site_id, start_time, duration, consumed, exported, generated, imported, self_consumed)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT (site_id, start_time) DO NOTHING",
                )?;
                for period in batch {
                    let n_changed = statement.execute(params![
                        period.site_id.0,
                        to_epoch(period.start_time),
                        to_seconds(period.duration()),
                        period.power.consumed.0,
                        period.power.exported.0,
                        period.power.generated.0,
                        period.power.imported.0,
                        period.power.self_consumed.0,
                    ])?;
                    if n_changed == 0 {
                        warn!(site_id = %period.site_id, start_time = %period.start_time, "skipped as already present");
                    }
                    n_inserted += n_changed;
                }
            }
            transaction.commit()?;
        }
        info!(n_inserted, "inserted");
        Ok(n_inserted)
    }

    /// Get the cached periods starting within the inclusive bounds, in chronological order.
    #[instrument(skip_all, fields(site_id = %site_id, start = ?start, end = ?end))]
    pub fn get_cached_power(
        &self,
        site_id: SiteId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Vec<PowerPeriod>> {
        let connection = self.connection()?;
        let mut statement = connection.prepare_cached(
            "SELECT site_id, start_time, duration, consumed, exported, generated, imported, self_consumed
            FROM power
            WHERE site_id = ?1 AND start_time BETWEEN ?2 AND ?3
            ORDER BY start_time",
        )?;
        let rows = statement
            .query_map(
                params![
                    site_id.0,
                    start.map_or(i64::MIN, to_epoch),
                    end.map_or(i64::MAX, to_epoch),
                ],
                PowerRow::read,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let periods = rows.into_iter().map(PowerPeriod::try_from).collect::<Result<Vec<_>>>()?;
        debug!(n_periods = periods.len(), "fetched");
        Ok(periods)
    }

    /// Get the start of the earliest period and the end of the latest one.
    pub fn get_cached_time_limits(&self, site_id: SiteId) -> Result<Option<TimeLimits>> {
        let limits = self.connection()?.query_row(
            "SELECT
                MIN(start_time),
                (SELECT start_time + duration FROM power WHERE site_id = ?1 ORDER BY start_time DESC LIMIT 1)
            FROM power
            WHERE site_id = ?1",
            [site_id.0],
            |row| match (row.get::<_, Option<i64>>(0)?, row.get::<_, Option<i64>>(1)?) {
                (Some(start), Some(end)) => {
                    Ok(Some(TimeLimits { start: from_epoch(0, start)?, end: from_epoch(1, end)? }))
                }
                _ => Ok(None),
            },
        )?;
        Ok(limits)
    }
}

/// Raw `power` row before the validation.
struct PowerRow {
    site_id: SiteId,
    start_time: Timestamp,
    duration_secs: i64,
    power: Measurements<Watts>,
}

impl PowerRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            site_id: SiteId(row.get(0)?),
            start_time: from_epoch(1, row.get(1)?)?,
            duration_secs: row.get(2)?,
            power: Measurements {
                consumed: Watts(row.get(3)?),
                exported: Watts(row.get(4)?),
                generated: Watts(row.get(5)?),
                imported: Watts(row.get(6)?),
                self_consumed: Watts(row.get(7)?),
            },
        })
    }
}

impl TryFrom<PowerRow> for PowerPeriod {
    type Error = Error;

    fn try_from(row: PowerRow) -> Result<Self> {
        let duration = from_seconds(2, row.duration_secs)?;
        Self::try_new(row.site_id, row.start_time, duration, row.power)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use itertools::Itertools;

    use super::*;
    use crate::{
        core::period::tests::{at, period},
        db::tests::new_db,
    };

    #[test]
    fn test_round_trip() -> Result {
        let (_directory, db) = new_db();
        let mut expected = period(1, at(0, 15), 15, 10.0);
        expected.power.self_consumed = Watts(2.5);
        let periods = [expected, period(1, at(0, 0), 15, 7.0)];
        assert_eq!(db.add_power(&periods)?, 2);

        let actual = db.get_cached_power(SiteId(1), None, None)?;
        assert_eq!(actual.len(), 2);
        assert_eq!(actual[0].start_time, at(0, 0));
        assert_eq!(actual[1], expected);
        assert_eq!(actual[1].duration(), TimeDelta::minutes(15));
        assert_eq!(actual[1].site_id, SiteId(1));
        Ok(())
    }

    #[test]
    fn test_insert_is_idempotent() -> Result {
        let (_directory, db) = new_db();
        let periods = [period(1, at(0, 0), 15, 1.0), period(1, at(0, 15), 15, 1.0)];
        assert_eq!(db.add_power(&periods)?, 2);

        let mut replayed = periods.to_vec();
        replayed[0].power.generated = Watts(100.0);
        replayed.push(period(1, at(0, 30), 15, 1.0));
        assert_eq!(db.add_power(&replayed)?, 1);

        let cached = db.get_cached_power(SiteId(1), None, None)?;
        assert_eq!(cached.len(), 3);
        assert_eq!(cached[0].power.generated, Watts(1.0));
        Ok(())
    }

    #[test]
    fn test_many_batches() -> Result {
        let (_directory, db) = new_db();
        let periods = (0..250)
            .map(|index| period(1, at(0, 0) + TimeDelta::minutes(15 * index), 15, 1.0))
            .collect_vec();
        assert_eq!(db.add_power(&periods)?, 250);
        Ok(())
    }

    #[test]
    fn test_inclusive_bounds() -> Result {
        let (_directory, db) = new_db();
        let periods = (0..4).map(|index| period(1, at(0, 15 * index), 15, 1.0)).collect_vec();
        db.add_power(&periods)?;

        let selected = db.get_cached_power(SiteId(1), Some(at(0, 15)), Some(at(0, 30)))?;
        assert_eq!(selected.iter().map(|period| period.start_time).collect_vec(), [at(0, 15), at(0, 30)]);
        assert_eq!(db.get_cached_power(SiteId(1), Some(at(0, 45)), None)?.len(), 1);
        assert_eq!(db.get_cached_power(SiteId(1), None, Some(at(0, 0)))?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_time_limits() -> Result {
        let (_directory, db) = new_db();
        assert_eq!(db.get_cached_time_limits(SiteId(1))?, None);

        db.add_power(&[period(1, at(1, 0), 60, 1.0), period(1, at(0, 0), 15, 1.0)])?;
        let limits = db.get_cached_time_limits(SiteId(1))?;
        assert_eq!(limits, Some(TimeLimits { start: at(0, 0), end: at(2, 0) }));
        Ok(())
    }

    #[test]
    fn test_site_scoping() -> Result {
        let (_directory, db) = new_db();
        db.add_power(&[period(1, at(0, 0), 15, 1.0), period(2, at(0, 0), 15, 2.0)])?;
        let cached = db.get_cached_power(SiteId(2), None, None)?;
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].site_id, SiteId(2));
        assert_eq!(db.get_cached_time_limits(SiteId(3))?, None);
        Ok(())
    }
}
