use crate::{
    core::{
        period::PowerPeriod,
        site::{Site, SiteId, TimeLimits},
        time::Timestamp,
    },
    prelude::*,
};

/// Anything which can provide sites and their power periods.
pub trait Source {
    /// Get the site identifiers in a stable order.
    fn get_site_ids(&self) -> Result<Vec<SiteId>>;

    /// Get the site details.
    ///
    /// Without an explicit identifier, succeeds only if exactly one site is available.
    fn get_site(&self, site_id: Option<SiteId>) -> Result<Site>;

    /// Get the data availability bounds, if there is any data.
    fn get_time_limits(&self, site_id: SiteId) -> Result<Option<TimeLimits>>;

    /// Get the periods covering the time range.
    ///
    /// Unset bounds mean the beginning and the end of record.
    fn get_power(
        &self,
        site_id: SiteId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Vec<PowerPeriod>>;

    /// Same as [`Source::get_power`] for the site already at hand.
    fn get_site_power(
        &self,
        site: &Site,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Vec<PowerPeriod>> {
        self.get_power(site.id, start, end)
    }

    #[instrument(skip_all)]
    fn get_sites(&self) -> Result<Vec<Site>> {
        self.get_site_ids()?.into_iter().map(|site_id| self.get_site(Some(site_id))).collect()
    }
}

/// Pick the only site identifier.
pub fn single_site_id(site_ids: &[SiteId]) -> Result<SiteId> {
    match site_ids {
        [site_id] => Ok(*site_id),
        _ => Err(Error::AmbiguousSite(site_ids.len())),
    }
}
