quantity!(WattHours, "Wh", 0);
quantity!(KilowattHours, "kWh", 3);

impl From<WattHours> for KilowattHours {
    fn from(watt_hours: WattHours) -> Self {
        Self(watt_hours.0 / 1000.0)
    }
}
