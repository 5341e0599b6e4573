use std::ops::Mul;

use chrono::TimeDelta;

use crate::quantity::energy::WattHours;

quantity!(Watts, "W", 1);
quantity!(Kilowatts, "kW", 3);

impl Watts {
    pub const ZERO: Self = Self(0.0);
}

impl Kilowatts {
    pub const ZERO: Self = Self(0.0);
}

impl Mul<TimeDelta> for Watts {
    type Output = WattHours;

    fn mul(self, rhs: TimeDelta) -> Self::Output {
        WattHours(self.0 * rhs.as_seconds_f64() / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_watts_times_quarter_of_an_hour() {
        let energy = Watts(1000.0) * TimeDelta::minutes(15);
        assert_abs_diff_eq!(energy.0, 250.0);
    }

    #[test]
    fn test_ordering_with_nan() {
        assert!(Watts(f64::NAN) > Watts(1.0));
        assert_eq!(Watts(f64::NAN), Watts(f64::NAN));
    }
}
