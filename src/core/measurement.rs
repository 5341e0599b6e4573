use enumset::{EnumSet, EnumSetType};

use crate::prelude::*;

/// Named average power quantity every period reports.
///
/// Variants are declared in alphabetical order of their names: the derived [`Ord`]
/// is the canonical tie-break order of the periods.
#[derive(Debug, Hash, PartialOrd, Ord, EnumSetType, derive_more::Display, clap::ValueEnum)]
pub enum Measurement {
    #[display("consumed")]
    Consumed,

    #[display("exported")]
    Exported,

    #[display("generated")]
    Generated,

    #[display("imported")]
    Imported,

    #[display("self_consumed")]
    SelfConsumed,
}

impl Measurement {
    /// All measurements in the canonical order.
    pub fn all() -> impl Iterator<Item = Self> {
        EnumSet::<Self>::all().iter()
    }
}

/// Complete measurement set.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, derive_more::Add)]
pub struct Measurements<V> {
    pub consumed: V,
    pub exported: V,
    pub generated: V,
    pub imported: V,
    pub self_consumed: V,
}

impl<V> Measurements<V> {
    pub const fn get_ref(&self, measurement: Measurement) -> &V {
        match measurement {
            Measurement::Consumed => &self.consumed,
            Measurement::Exported => &self.exported,
            Measurement::Generated => &self.generated,
            Measurement::Imported => &self.imported,
            Measurement::SelfConsumed => &self.self_consumed,
        }
    }

    /// Build the set, failing on the first measurement the function cannot provide.
    pub fn try_from_fn(mut f: impl FnMut(Measurement) -> Option<V>) -> Result<Self> {
        let mut get = |measurement| f(measurement).ok_or(Error::MissingMeasurement(measurement));
        Ok(Self {
            consumed: get(Measurement::Consumed)?,
            exported: get(Measurement::Exported)?,
            generated: get(Measurement::Generated)?,
            imported: get(Measurement::Imported)?,
            self_consumed: get(Measurement::SelfConsumed)?,
        })
    }
}

impl<V: Copy> Measurements<V> {
    pub const fn get(&self, measurement: Measurement) -> V {
        *self.get_ref(measurement)
    }

    pub fn from_fn(mut f: impl FnMut(Measurement) -> V) -> Self {
        Self {
            consumed: f(Measurement::Consumed),
            exported: f(Measurement::Exported),
            generated: f(Measurement::Generated),
            imported: f(Measurement::Imported),
            self_consumed: f(Measurement::SelfConsumed),
        }
    }

    /// Iterate the values in the canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Measurement, V)> + '_ {
        Measurement::all().map(|measurement| (measurement, self.get(measurement)))
    }

    pub fn map<T: Copy>(&self, f: impl Fn(V) -> T) -> Measurements<T> {
        Measurements::from_fn(|measurement| f(self.get(measurement)))
    }

    pub fn zip_with<R: Copy, T: Copy>(
        &self,
        rhs: &Measurements<R>,
        f: impl Fn(V, R) -> T,
    ) -> Measurements<T> {
        Measurements::from_fn(|measurement| f(self.get(measurement), rhs.get(measurement)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_canonical_order_is_alphabetical() {
        let names = Measurement::all().map(|measurement| measurement.to_string()).collect_vec();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_try_from_fn_missing() {
        let readings = HashMap::from([
            (Measurement::Consumed, 1.0),
            (Measurement::Exported, 2.0),
            (Measurement::Generated, 3.0),
            (Measurement::SelfConsumed, 4.0),
        ]);
        let result = Measurements::try_from_fn(|measurement| readings.get(&measurement).copied());
        assert!(matches!(result, Err(Error::MissingMeasurement(Measurement::Imported))));
    }

    #[test]
    fn test_zip_with() {
        let lhs = Measurements::from_fn(|_| 1.0);
        let rhs = Measurements::from_fn(|_| 3.0);
        let mean = lhs.zip_with(&rhs, |lhs, rhs| f64::midpoint(lhs, rhs));
        assert!(mean.iter().all(|(_, value)| (value - 2.0).abs() < f64::EPSILON));
    }
}
