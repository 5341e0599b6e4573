use std::{iter::Sum, ops::Add};

use crate::{
    core::measurement::{Measurement, Measurements},
    quantity::energy::WattHours,
};

/// Energy per measurement, derived from a period's average power.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, derive_more::From)]
pub struct Energy(Measurements<WattHours>);

impl Energy {
    pub const fn get(&self, measurement: Measurement) -> WattHours {
        self.0.get(measurement)
    }
}

impl Add for Energy {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Energy {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::core::period::tests::{at, period};

    #[test]
    fn test_sum() {
        let total: Energy = [period(1, at(0, 0), 15, 100.0), period(1, at(0, 15), 60, 10.0)]
            .iter()
            .map(|period| period.energy())
            .sum();
        assert_abs_diff_eq!(total.get(Measurement::SelfConsumed).0, 35.0);
    }
}
