use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::{
    core::time::Timestamp,
    quantity::{energy::WattHours, power::Kilowatts},
};

#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    derive_more::Display,
    derive_more::From,
    derive_more::FromStr,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(transparent)]
pub struct SiteId(pub u32);

/// Metered site snapshot.
#[must_use]
#[derive(Clone, Debug, PartialEq, bon::Builder)]
pub struct Site {
    pub id: SiteId,

    #[builder(into)]
    pub name: String,

    /// First day with data, inclusive.
    pub start_date: NaiveDate,

    /// Last day with data, inclusive.
    pub end_date: NaiveDate,

    #[builder(default = Kilowatts::ZERO)]
    pub peak_power: Kilowatts,

    pub lifetime_energy: Option<WattHours>,

    pub country: Option<String>,

    /// Timezone of the vendor's local timestamps.
    pub timezone: Option<Tz>,
}

impl Site {
    /// Timezone of the site's calendar days, UTC when unknown.
    pub fn local_timezone(&self) -> Tz {
        self.timezone.unwrap_or(Tz::UTC)
    }
}

/// Data availability bounds of a site.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimeLimits {
    /// Inclusive.
    pub start: Timestamp,

    /// Exclusive: the end of the latest period.
    pub end: Timestamp,
}
