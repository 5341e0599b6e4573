use anyhow::Context;
use chrono::TimeDelta;
use clap::Parser;
use enumset::EnumSet;

use crate::{
    cli::{site::SiteSelectionArgs, solaredge::HybridArgs},
    core::{
        aggregate::{Combiner, aggregate, group_by_day},
        measurement::Measurement,
        period::PowerPeriod,
        site::Site,
        source::Source,
        time::{Timestamp, parse_timestamp},
    },
    prelude::*,
    tables::build_power_table,
};

#[derive(Parser)]
pub struct RangeArgs {
    #[clap(flatten)]
    selection: SiteSelectionArgs,

    /// Inclusive start, RFC 3339 with an offset. From the beginning of record by default.
    #[clap(long, value_parser = parse_timestamp)]
    since: Option<Timestamp>,

    /// Inclusive end, RFC 3339 with an offset. Up to the latest period by default.
    #[clap(long, value_parser = parse_timestamp)]
    until: Option<Timestamp>,
}

impl RangeArgs {
    fn fetch(&self, source: &impl Source) -> anyhow::Result<(Site, Vec<PowerPeriod>)> {
        let site = source.get_site(self.selection.site_id)?;
        let periods = source
            .get_site_power(&site, self.since, self.until)
            .with_context(|| format!("failed to get the power periods of site {}", site.id))?;
        info!(site_id = %site.id, n_periods = periods.len(), "fetched");
        Ok((site, periods))
    }
}

#[derive(Parser)]
pub struct PowerArgs {
    #[clap(flatten)]
    source: HybridArgs,

    #[clap(flatten)]
    range: RangeArgs,

    /// Resample into periods of this length, for example: `1h` or `1day`.
    #[clap(long)]
    period: Option<humantime::Duration>,

    #[clap(long, value_enum, default_value = "mean")]
    combiner: Combiner,

    /// Measurements to show, all by default.
    #[clap(long, value_enum, value_delimiter = ',', num_args = 1..)]
    measurements: Vec<Measurement>,
}

impl PowerArgs {
    fn measurements(&self) -> EnumSet<Measurement> {
        if self.measurements.is_empty() {
            EnumSet::all()
        } else {
            self.measurements.iter().copied().collect()
        }
    }

    #[instrument(skip_all)]
    pub fn run(self) -> anyhow::Result<()> {
        let (_, mut periods) = self.range.fetch(&self.source.open()?)?;
        if let Some(period) = self.period {
            let period_length = TimeDelta::from_std(period.into())?;
            periods = aggregate(periods, period_length, self.combiner)?;
        }
        println!("{}", build_power_table(&periods, self.measurements()));
        Ok(())
    }
}

#[derive(Parser)]
pub struct DailyArgs {
    #[clap(flatten)]
    source: HybridArgs,

    #[clap(flatten)]
    range: RangeArgs,
}

impl DailyArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> anyhow::Result<()> {
        let (site, periods) = self.range.fetch(&self.source.open()?)?;
        let groups = group_by_day(periods, site.local_timezone());
        if groups.n_dropped != 0 {
            warn!(groups.n_dropped, "some periods could not be merged into their day");
        }
        println!("{}", build_power_table(&groups.periods, EnumSet::all()));
        Ok(())
    }
}
