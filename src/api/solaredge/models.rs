//! SolarEdge monitoring API payloads.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::{
    core::{
        measurement::{Measurement, Measurements},
        period::PowerPeriod,
        site::{Site, SiteId},
    },
    prelude::*,
    quantity::{energy::WattHours, power::{Kilowatts, Watts}},
};

/// Format of the site-local timestamps, both in the requests and the responses.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Deserialize)]
pub struct SitesResponse {
    pub sites: Sites,
}

#[derive(Deserialize)]
pub struct Sites {
    pub site: Vec<SiteEntry>,
}

#[derive(Deserialize)]
pub struct SiteEntry {
    pub id: SiteId,
}

#[derive(Deserialize)]
pub struct DetailsResponse {
    pub details: Details,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub id: SiteId,
    pub name: String,

    /// Kilowatts.
    #[serde(default)]
    pub peak_power: f64,

    pub installation_date: String,

    /// Either a date or a date and time.
    pub last_update_time: String,

    #[serde(default)]
    pub location: Location,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub country: Option<String>,
    pub time_zone: Option<String>,
}

impl Details {
    pub fn into_site(self, lifetime_energy: Option<WattHours>) -> Result<Site> {
        let timezone = self
            .location
            .time_zone
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|error| Error::Protocol(format!("timezone `{name}`: {error}")))
            })
            .transpose()?;
        Ok(Site::builder()
            .id(self.id)
            .name(self.name)
            .start_date(parse_date(&self.installation_date)?)
            .end_date(parse_date(&self.last_update_time)?)
            .peak_power(Kilowatts(self.peak_power))
            .maybe_lifetime_energy(lifetime_energy)
            .maybe_country(self.location.country)
            .maybe_timezone(timezone)
            .build())
    }
}

/// Parse the leading date, ignoring the time if present.
fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_and_remainder(input, "%Y-%m-%d")
        .map(|(date, _)| date)
        .map_err(|error| Error::Protocol(format!("date `{input}`: {error}")))
}

#[derive(Deserialize)]
pub struct OverviewResponse {
    pub overview: Overview,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub life_time_data: Option<LifeTimeData>,
}

#[derive(Deserialize)]
pub struct LifeTimeData {
    /// Watt-hours.
    pub energy: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerDetailsResponse {
    pub power_details: PowerDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerDetails {
    pub time_unit: TimeUnit,
    pub unit: Unit,
    pub meters: Vec<Meter>,
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    QuarterOfAnHour,
    Hour,
}

impl TimeUnit {
    pub fn duration(self) -> TimeDelta {
        match self {
            Self::QuarterOfAnHour => TimeDelta::minutes(15),
            Self::Hour => TimeDelta::hours(1),
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub enum Unit {
    #[serde(rename = "W")]
    Watt,

    #[serde(rename = "kW")]
    Kilowatt,

    #[serde(rename = "MW")]
    Megawatt,
}

impl Unit {
    pub const fn to_watts(self, value: f64) -> Watts {
        match self {
            Self::Watt => Watts(value),
            Self::Kilowatt => Watts(value * 1_000.0),
            Self::Megawatt => Watts(value * 1_000_000.0),
        }
    }
}

#[derive(Deserialize)]
pub struct Meter {
    #[serde(rename = "type")]
    pub kind: MeterType,

    #[serde(default)]
    pub values: Vec<Reading>,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub enum MeterType {
    Consumption,
    FeedIn,
    Production,
    Purchased,
    SelfConsumption,
}

impl From<MeterType> for Measurement {
    fn from(meter_type: MeterType) -> Self {
        match meter_type {
            MeterType::Consumption => Self::Consumed,
            MeterType::FeedIn => Self::Exported,
            MeterType::Production => Self::Generated,
            MeterType::Purchased => Self::Imported,
            MeterType::SelfConsumption => Self::SelfConsumed,
        }
    }
}

#[derive(Deserialize)]
pub struct Reading {
    /// Site-local start time.
    pub date: String,

    /// Absent when zero.
    pub value: Option<f64>,
}

impl PowerDetails {
    /// Pivot the per-meter readings into chronological periods.
    ///
    /// A local time which does not exist in the timezone is skipped; an ambiguous one resolves to
    /// the earlier instant.
    #[instrument(skip_all, fields(site_id = %site_id, time_unit = ?self.time_unit, unit = ?self.unit))]
    pub fn into_periods(self, site_id: SiteId, timezone: Tz) -> Result<Vec<PowerPeriod>> {
        let duration = self.time_unit.duration();
        let mut meters: HashMap<Measurement, BTreeMap<NaiveDateTime, Watts>> = HashMap::new();
        for meter in self.meters {
            let readings = meters.entry(Measurement::from(meter.kind)).or_default();
            for reading in meter.values {
                let local_time = NaiveDateTime::parse_from_str(&reading.date, DATETIME_FORMAT)
                    .map_err(|error| Error::Protocol(format!("date `{}`: {error}", reading.date)))?;
                let power = reading.value.map_or(Watts::ZERO, |value| self.unit.to_watts(value));
                readings.insert(local_time, power);
            }
        }

        // A meter may omit its zero readings, but not be missing altogether.
        let meters = Measurements::try_from_fn(|measurement| meters.remove(&measurement))?;
        let local_times: BTreeSet<NaiveDateTime> = Measurement::all()
            .flat_map(|measurement| meters.get_ref(measurement).keys().copied())
            .collect();
        let readings = local_times.into_iter().map(|local_time| {
            let power = Measurements::from_fn(|measurement| {
                meters.get_ref(measurement).get(&local_time).copied().unwrap_or(Watts::ZERO)
            });
            (local_time, power)
        });

        let mut periods = Vec::new();
        for (local_time, power) in readings {
            let Some(start_time) = timezone.from_local_datetime(&local_time).earliest() else {
                warn!(%local_time, "skipped the non-existent local time");
                continue;
            };
            periods.push(PowerPeriod::try_new(site_id, start_time.fixed_offset(), duration, power)?);
        }
        debug!(n_periods = periods.len(), "parsed");
        Ok(periods)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn meter(kind: &str, values: serde_json::Value) -> serde_json::Value {
        json!({"type": kind, "values": values})
    }

    fn power_details(unit: &str, meters: &[serde_json::Value]) -> serde_json::Value {
        json!({"powerDetails": {"timeUnit": "QUARTER_OF_AN_HOUR", "unit": unit, "meters": meters}})
    }

    fn parse(payload: &serde_json::Value) -> Result<Vec<PowerPeriod>> {
        serde_json::from_value::<PowerDetailsResponse>(payload.clone())?
            .power_details
            .into_periods(SiteId(1), chrono_tz::Europe::Amsterdam)
    }

    #[test]
    fn test_into_periods() -> Result {
        let values = json!([
            {"date": "2024-03-01 00:15:00", "value": 2.0},
            {"date": "2024-03-01 00:00:00", "value": 1.5}
        ]);
        let payload = power_details(
            "kW",
            &[
                meter("Consumption", values.clone()),
                meter("FeedIn", json!([{"date": "2024-03-01 00:00:00"}])),
                meter("Production", values.clone()),
                meter("Purchased", values.clone()),
                meter("SelfConsumption", values),
            ],
        );
        let periods = parse(&payload)?;
        assert_eq!(periods.len(), 2);

        let first = &periods[0];
        assert_eq!(first.start_time, Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap());
        assert_eq!(first.duration(), TimeDelta::minutes(15));
        assert_abs_diff_eq!(first.get(Measurement::Consumed).0, 1500.0);
        assert_abs_diff_eq!(first.get(Measurement::Exported).0, 0.0);
        assert_abs_diff_eq!(periods[1].get(Measurement::Generated).0, 2000.0);

        // Missing from the `FeedIn` meter altogether.
        assert_abs_diff_eq!(periods[1].get(Measurement::Exported).0, 0.0);
        Ok(())
    }

    #[test]
    fn test_missing_meter() {
        let payload = power_details("W", &[meter("Consumption", json!([]))]);
        assert!(matches!(parse(&payload), Err(Error::MissingMeasurement(Measurement::Exported))));
    }

    #[test]
    fn test_unexpected_unit() {
        let payload = power_details("GW", &[]);
        assert!(matches!(parse(&payload), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_unexpected_meter() {
        let payload = power_details("W", &[meter("Storage", json!([]))]);
        assert!(matches!(parse(&payload), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_skips_non_existent_local_time() -> Result {
        let values = json!([
            {"date": "2024-03-31 02:15:00", "value": 1.0},
            {"date": "2024-03-31 03:00:00", "value": 1.0}
        ]);
        let meters = ["Consumption", "FeedIn", "Production", "Purchased", "SelfConsumption"]
            .map(|kind| meter(kind, values.clone()));
        let periods = parse(&power_details("W", &meters))?;
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].start_time, Utc.with_ymd_and_hms(2024, 3, 31, 1, 0, 0).unwrap());
        Ok(())
    }

    #[test]
    fn test_details_into_site() -> Result {
        let response: DetailsResponse = serde_json::from_value(json!({
            "details": {
                "id": 42,
                "name": "Home",
                "peakPower": 4.2,
                "installationDate": "2019-03-01",
                "lastUpdateTime": "2024-03-01 12:34:56",
                "location": {"country": "Netherlands", "timeZone": "Europe/Amsterdam"}
            }
        }))?;
        let site = response.details.into_site(Some(WattHours(1000.0)))?;
        assert_eq!(site.id, SiteId(42));
        assert_eq!(site.start_date, NaiveDate::from_ymd_opt(2019, 3, 1).unwrap());
        assert_eq!(site.end_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(site.timezone, Some(chrono_tz::Europe::Amsterdam));
        assert_eq!(site.lifetime_energy, Some(WattHours(1000.0)));
        Ok(())
    }
}
