mod models;

use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use serde::de::DeserializeOwned;
use ureq::Agent;

use self::models::{
    DATETIME_FORMAT,
    DetailsResponse,
    OverviewResponse,
    PowerDetailsResponse,
    SitesResponse,
};
use crate::{
    core::{
        period::PowerPeriod,
        site::{Site, SiteId, TimeLimits},
        source::{Source, single_site_id},
        time::{Timestamp, midnight},
    },
    prelude::*,
    quantity::energy::WattHours,
};

pub const DEFAULT_URL: &str = "https://monitoringapi.solaredge.com";

/// Requests spanning more days get split.
const MAX_WINDOW_DAYS: i64 = 28;

/// Length of a split-off window.
const WINDOW_DAYS: i64 = 27;

/// SolarEdge monitoring API client.
pub struct Api {
    client: Agent,
    base_url: String,
    api_key: String,
    now: fn() -> DateTime<Utc>,
}

impl Api {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client =
            Agent::config_builder().timeout_global(Some(Duration::from_secs(30))).build().into();
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url, api_key: api_key.into(), now: Utc::now }
    }

    #[cfg(test)]
    fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    #[instrument(skip_all, fields(path = path))]
    fn call<R: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<R> {
        debug!("requesting…");
        let mut request =
            self.client.get(format!("{}/{path}", self.base_url)).query("api_key", &self.api_key);
        for (key, value) in query {
            request = request.query(*key, value);
        }
        let body = request.call()?.body_mut().read_to_string()?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Site details without the lifetime energy, which costs another request.
    #[instrument(skip_all, fields(site_id = %site_id))]
    fn get_site_details(&self, site_id: SiteId) -> Result<Site> {
        let response: DetailsResponse = self.call(&format!("site/{site_id}/details.json"), &[])?;
        response.details.into_site(None)
    }

    #[instrument(skip_all, fields(site_id = %site_id))]
    fn get_lifetime_energy(&self, site_id: SiteId) -> Result<Option<WattHours>> {
        let overview: OverviewResponse = self.call(&format!("site/{site_id}/overview.json"), &[])?;
        Ok(overview.overview.life_time_data.map(|data| WattHours(data.energy)))
    }

    /// Fetch one window, which must not exceed the upstream limit.
    #[instrument(skip_all, fields(start = %start, end = %end))]
    fn get_window(
        &self,
        site_id: SiteId,
        timezone: Tz,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<PowerPeriod>> {
        info!("fetching…");
        let format = |timestamp: Timestamp| {
            timestamp.with_timezone(&timezone).format(DATETIME_FORMAT).to_string()
        };
        let response: PowerDetailsResponse = self.call(
            &format!("site/{site_id}/powerDetails.json"),
            &[("startTime", format(start)), ("endTime", format(end))],
        )?;
        response.power_details.into_periods(site_id, timezone)
    }
}

impl Source for Api {
    #[instrument(skip_all)]
    fn get_site_ids(&self) -> Result<Vec<SiteId>> {
        let response: SitesResponse = self.call("sites/list", &[])?;
        Ok(response.sites.site.into_iter().map(|site| site.id).collect())
    }

    #[instrument(skip_all, fields(site_id = ?site_id))]
    fn get_site(&self, site_id: Option<SiteId>) -> Result<Site> {
        let site_id = match site_id {
            Some(site_id) => site_id,
            None => single_site_id(&self.get_site_ids()?)?,
        };
        let site = self.get_site_details(site_id)?;
        Ok(Site { lifetime_energy: self.get_lifetime_energy(site_id)?, ..site })
    }

    fn get_time_limits(&self, site_id: SiteId) -> Result<Option<TimeLimits>> {
        let site = self.get_site_details(site_id)?;
        let timezone = site.local_timezone();
        let start = local_midnight(timezone, site.start_date)?;
        let end = local_midnight(timezone, site.end_date + TimeDelta::days(1))?;
        Ok(Some(TimeLimits { start, end }))
    }

    fn get_power(
        &self,
        site_id: SiteId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Vec<PowerPeriod>> {
        self.get_site_power(&self.get_site_details(site_id)?, start, end)
    }

    #[instrument(skip_all, fields(site_id = %site.id, start = ?start, end = ?end))]
    fn get_site_power(
        &self,
        site: &Site,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Vec<PowerPeriod>> {
        let timezone = site.local_timezone();
        let start = match start {
            Some(start) => start,
            None => local_midnight(timezone, site.start_date)?,
        };
        // A cached site's end date goes stale, so an unset end means up to now.
        let now = (self.now)().fixed_offset();
        let end = end.map_or(now, |end| end.min(now));

        let mut periods = Vec::new();
        for (window_start, window_end) in split_windows(start, end) {
            periods.extend(self.get_window(site.id, timezone, window_start, window_end)?);
        }
        Ok(periods.into_iter().unique_by(|period| period.start_time).collect())
    }
}

fn local_midnight(timezone: Tz, date: NaiveDate) -> Result<Timestamp> {
    midnight(timezone, date).ok_or_else(|| Error::Protocol(format!("midnight of {date} does not exist in {timezone}")))
}

/// Split the range into windows the API accepts, walking backwards from the end.
///
/// The windows are returned earliest-first.
fn split_windows(start: Timestamp, end: Timestamp) -> Vec<(Timestamp, Timestamp)> {
    if start >= end {
        return Vec::new();
    }
    let mut windows = Vec::new();
    let mut window_end = end;
    while window_end - start > TimeDelta::days(MAX_WINDOW_DAYS) {
        let window_start = window_end - TimeDelta::days(WINDOW_DAYS);
        windows.push((window_start, window_end));
        window_end = window_start;
    }
    windows.push((start, window_end));
    windows.reverse();
    windows
}
