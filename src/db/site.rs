use chrono_tz::Tz;
use rusqlite::{OptionalExtension, Row, params, types::Type};

use crate::{
    core::site::{Site, SiteId},
    db::{
        Db,
        timestamp::{from_days, to_days},
    },
    prelude::*,
    quantity::{energy::WattHours, power::Kilowatts},
};

impl Db {
    /// Cache the site, unless it is already there.
    #[instrument(skip_all, fields(site_id = %site.id))]
    pub fn add_site(&self, site: &Site) -> Result {
        let n_inserted = self.connection()?.execute(
            "INSERT INTO site (site_id, name, start_date, end_date, peak_power, lifetime_energy, country, timezone)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (site_id) DO NOTHING",
            params![
                site.id.0,
                site.name,
                to_days(site.start_date),
                to_days(site.end_date),
                site.peak_power.0,
                site.lifetime_energy.map(|energy| energy.0),
                site.country,
                site.timezone.map(|timezone| timezone.name()),
            ],
        )?;
        if n_inserted == 0 {
            debug!("already cached");
        } else {
            info!("cached");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(site_id = %site_id))]
    pub fn get_cached_site(&self, site_id: SiteId) -> Result<Site> {
        self.connection()?
            .query_row(
                "SELECT site_id, name, start_date, end_date, peak_power, lifetime_energy, country, timezone
                FROM site WHERE site_id = ?1",
                [site_id.0],
                read_site,
            )
            .optional()?
            .ok_or(Error::SiteNotFound(site_id))
    }

    pub fn get_cached_site_ids(&self) -> Result<Vec<SiteId>> {
        let connection = self.connection()?;
        let mut statement = connection.prepare("SELECT site_id FROM site ORDER BY site_id")?;
        let site_ids = statement
            .query_map([], |row| row.get(0).map(SiteId))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(site_ids)
    }
}

fn read_site(row: &Row<'_>) -> rusqlite::Result<Site> {
    let timezone = row
        .get::<_, Option<String>>(7)?
        .map(|name| {
            name.parse::<Tz>().map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(7, Type::Text, error.to_string().into())
            })
        })
        .transpose()?;
    Ok(Site {
        id: SiteId(row.get(0)?),
        name: row.get(1)?,
        start_date: from_days(2, row.get(2)?)?,
        end_date: from_days(3, row.get(3)?)?,
        peak_power: Kilowatts(row.get(4)?),
        lifetime_energy: row.get::<_, Option<f64>>(5)?.map(WattHours),
        country: row.get(6)?,
        timezone,
    })
}
