//! Read-through cache of a remote source in the local database.

use chrono::{DateTime, Utc};

use crate::{
    core::{
        period::PowerPeriod,
        site::{Site, SiteId, TimeLimits},
        source::{Source, single_site_id},
        time::{Timestamp, normalize_bounds},
    },
    db::Db,
    prelude::*,
};

/// Serves everything from the local database, fetching only what is missing from the remote.
pub struct Hybrid<R> {
    local: Db,
    remote: R,
    now: fn() -> DateTime<Utc>,
}

impl<R: Source> Hybrid<R> {
    pub fn new(local: Db, remote: R) -> Self {
        Self { local, remote, now: Utc::now }
    }

    #[cfg(test)]
    fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Fetch the range from the remote and write it through.
    #[instrument(skip_all, fields(start = ?start, end = ?end))]
    fn fill(&self, site: &Site, start: Option<Timestamp>, end: Option<Timestamp>) -> Result {
        info!("filling the gap…");
        let periods = self.remote.get_site_power(site, start, end)?;
        if !periods.is_empty() {
            self.local.add_power(&periods)?;
        }
        Ok(())
    }
}

impl<R: Source> Source for Hybrid<R> {
    fn get_site_ids(&self) -> Result<Vec<SiteId>> {
        self.remote.get_site_ids()
    }

    #[instrument(skip_all, fields(site_id = ?site_id))]
    fn get_site(&self, site_id: Option<SiteId>) -> Result<Site> {
        let site_id = match site_id {
            Some(site_id) => site_id,
            None => single_site_id(&self.get_site_ids()?)?,
        };
        match self.local.get_cached_site(site_id) {
            Err(Error::SiteNotFound(_)) => {
                info!("not cached yet");
                let site = self.remote.get_site(Some(site_id))?;
                self.local.add_site(&site)?;
                Ok(site)
            }
            result => result,
        }
    }

    fn get_time_limits(&self, site_id: SiteId) -> Result<Option<TimeLimits>> {
        self.local.get_time_limits(site_id)
    }

    #[instrument(skip_all, fields(site_id = %site_id, start = ?start, end = ?end))]
    fn get_power(
        &self,
        site_id: SiteId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Vec<PowerPeriod>> {
        let limits = self.local.get_time_limits(site_id)?;

        if let (Some(limits), Some(start), Some(end)) = (limits, start, end)
            && limits.start < start
            && limits.end > end
        {
            debug!("fully cached");
            return self.local.get_power(site_id, Some(start), Some(end));
        }

        let site = self.get_site(Some(site_id))?;
        let (fill_start, fill_end) =
            normalize_bounds(start, end, (self.now)(), site.local_timezone());
        match limits {
            None => {
                self.fill(&site, fill_start, fill_end)?;
            }
            Some(TimeLimits { start: min_local, end: max_local }) => {
                if fill_start.is_none_or(|start| start < min_local) {
                    self.fill(&site, fill_start, Some(min_local))?;
                }
                if fill_end.is_none_or(|end| end > max_local) {
                    self.fill(&site, Some(max_local), fill_end)?;
                }
            }
        }

        self.local.get_power(site_id, start, end)
    }
}
