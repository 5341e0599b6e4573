use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use enumset::EnumSet;

use crate::{
    core::{energy::Energy, measurement::Measurement, period::PowerPeriod, site::Site},
    quantity::energy::KilowattHours,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn optional(value: Option<impl ToString>) -> Cell {
    value.map_or_else(|| Cell::new("-").add_attribute(Attribute::Dim), |value| Cell::new(value.to_string()))
}

#[must_use]
pub fn build_sites_table(sites: &[Site]) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "ID", "Name", "Since", "Until", "Peak power", "Lifetime", "Country", "Timezone",
    ]);
    for site in sites {
        table.add_row(vec![
            Cell::new(site.id).fg(Color::Cyan),
            Cell::new(&site.name),
            Cell::new(site.start_date),
            Cell::new(site.end_date),
            Cell::new(site.peak_power).set_alignment(CellAlignment::Right),
            optional(site.lifetime_energy.map(KilowattHours::from)).set_alignment(CellAlignment::Right),
            optional(site.country.as_ref()),
            optional(site.timezone),
        ]);
    }
    table
}

/// Periods with the selected measurements, followed by the total energy.
#[must_use]
pub fn build_power_table(periods: &[PowerPeriod], measurements: EnumSet<Measurement>) -> Table {
    let mut table = new_table();
    let mut header = vec![Cell::new("Start"), Cell::new("Duration")];
    header.extend(measurements.iter().map(|measurement| Cell::new(measurement)));
    table.set_header(header);

    for period in periods {
        let mut row = vec![
            Cell::new(period.start_time.format("%Y-%m-%d %H:%M %:z")),
            Cell::new(humantime::format_duration(
                period.duration().to_std().unwrap_or_default(),
            ))
            .add_attribute(Attribute::Dim),
        ];
        row.extend(measurements.iter().map(|measurement| {
            let power = period.get(measurement);
            Cell::new(power).set_alignment(CellAlignment::Right).fg(if power.0 > 0.0 {
                Color::Reset
            } else {
                Color::DarkGrey
            })
        }));
        table.add_row(row);
    }

    let total: Energy = periods.iter().map(PowerPeriod::energy).sum();
    let mut footer = vec![Cell::new("Total").add_attribute(Attribute::Bold), Cell::new("")];
    footer.extend(measurements.iter().map(|measurement| {
        Cell::new(KilowattHours::from(total.get(measurement)))
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold)
    }));
    table.add_row(footer);
    table
}
