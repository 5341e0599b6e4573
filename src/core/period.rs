use std::{
    cmp::Ordering,
    fmt::{Debug, Formatter},
};

use chrono::TimeDelta;

use crate::{
    core::{
        energy::Energy,
        measurement::{Measurement, Measurements},
        site::SiteId,
        time::Timestamp,
    },
    prelude::*,
    quantity::power::Watts,
};

/// Average power measured over a period of time.
#[must_use]
#[derive(Clone, Copy)]
pub struct PowerPeriod {
    pub site_id: SiteId,
    pub start_time: Timestamp,
    duration: TimeDelta,
    pub power: Measurements<Watts>,
}

/// Outcome of merging two periods.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Merged {
    pub period: PowerPeriod,

    /// Space between the earlier period's end and the later period's start, if any.
    pub gap: Option<TimeDelta>,
}

impl PowerPeriod {
    pub fn try_new(
        site_id: SiteId,
        start_time: Timestamp,
        duration: TimeDelta,
        power: Measurements<Watts>,
    ) -> Result<Self> {
        if duration <= TimeDelta::zero() {
            return Err(Error::InvalidDuration(duration));
        }
        Ok(Self { site_id, start_time, duration, power })
    }

    pub const fn duration(&self) -> TimeDelta {
        self.duration
    }

    /// Exclusive.
    pub fn end_time(&self) -> Timestamp {
        self.start_time + self.duration
    }

    pub fn get(&self, measurement: Measurement) -> Watts {
        self.power.get(measurement)
    }

    pub fn energy(&self) -> Energy {
        Energy::from(self.power.map(|power| power * self.duration))
    }

    /// Merge the adjacent period: the measurements are averaged.
    ///
    /// Summing would be wrong since the values are average power rather than energy.
    pub fn try_merge(&self, other: &Self) -> Result<Merged> {
        self.try_join(other, |lhs, rhs| (lhs + rhs) / 2.0)
    }

    /// Concatenate two periods of the same site in time, combining the measurements with `combine`.
    pub(crate) fn try_join(
        &self,
        other: &Self,
        combine: impl Fn(Watts, Watts) -> Watts,
    ) -> Result<Merged> {
        if self.site_id != other.site_id {
            return Err(Error::SiteMismatch(self.site_id, other.site_id));
        }
        if std::ptr::eq(self, other) {
            return Err(Error::SelfMerge);
        }
        if self.start_time == other.start_time {
            return Err(Error::DuplicateTime { site_id: self.site_id, start_time: self.start_time });
        }
        let (earlier, later) =
            if self.start_time < other.start_time { (self, other) } else { (other, self) };
        let gap = (earlier.end_time() != later.start_time)
            .then(|| later.start_time - earlier.end_time());
        let duration = match gap {
            None => earlier.duration + later.duration,
            Some(gap) => {
                warn!(
                    site_id = %self.site_id,
                    earlier = %earlier.start_time,
                    later = %later.start_time,
                    %gap,
                    "merging non-contiguous periods",
                );
                later.end_time() - earlier.start_time
            }
        };
        let period = Self {
            site_id: self.site_id,
            start_time: earlier.start_time,
            duration,
            power: earlier.power.zip_with(&later.power, combine),
        };
        Ok(Merged { period, gap })
    }

    pub(crate) fn with_power(mut self, power: Measurements<Watts>) -> Self {
        self.power = power;
        self
    }
}

impl Debug for PowerPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} from {} for {}>", self.site_id, self.start_time, self.duration)
    }
}

impl PartialEq for PowerPeriod {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PowerPeriod {}

impl PartialOrd for PowerPeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PowerPeriod {
    /// Chronological, then by the measurements in their canonical order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.start_time.cmp(&other.start_time).then_with(|| {
            self.power
                .iter()
                .zip(other.power.iter())
                .map(|((_, lhs), (_, rhs))| lhs.cmp(&rhs))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    }
}
