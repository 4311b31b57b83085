//! Tabular form of a many-to-many map: one row per group pin.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use netgroup_core::{
    GroupGlob, GroupMap, ManyToManyMap, Netlist, PinName,
    diagnostics::WithDiagnostics,
    map::many_to_many,
};

use crate::{ExportError, Result};

pub const HEADER: [&str; 5] = ["schematic", "group_path", "group_type", "pin_name", "other_pins"];

/// Render a persisted map. Only the many-to-many form has a table layout.
pub fn map_to_csv(map: &GroupMap) -> Result<String> {
    match map {
        GroupMap::ManyToMany(map) => many_to_many_csv(map),
        GroupMap::OneToMany(_) => Err(ExportError::OneToManyCsv),
    }
}

/// Build the many-to-many map of `netlist` and render it in one step.
pub fn netlist_to_csv(
    netlist: &Netlist,
    subject: Option<&GroupGlob>,
    simplify: &BTreeSet<PinName>,
    date: NaiveDateTime,
) -> Result<WithDiagnostics<String>> {
    let WithDiagnostics {
        diagnostics,
        output,
    } = many_to_many(netlist, subject, simplify, date)?;
    Ok(WithDiagnostics::new(many_to_many_csv(&output)?, diagnostics))
}

pub fn many_to_many_csv(map: &ManyToManyMap) -> Result<String> {
    let mut writer = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;

    let mut groups: Vec<_> = map.groups.values().collect();
    groups.sort_by_cached_key(|group| group.id.stringify());
    for group in groups {
        let mut pins: Vec<_> = group.pins.iter().collect();
        pins.sort_by(|a, b| pin_sort_key(a.0.as_str()).cmp(&pin_sort_key(b.0.as_str())));
        for (name, partners) in pins {
            let other_pins = partners
                .iter()
                .map(|p| format!("{}/{}", p.group.stringify(), p.pin))
                .collect::<Vec<_>>()
                .join("|");
            writer.write_record([
                group.id.schematic.as_str(),
                group.id.path.as_str(),
                group.id.group_type.as_str(),
                name.as_str(),
                other_pins.as_str(),
            ])?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Pins sort by the last number in their name (0 if there is none), then by
/// name, so `GPIO2` comes before `GPIO10`.
fn pin_sort_key(name: &str) -> (u64, &str) {
    let number = name
        .split(|c: char| !c.is_ascii_digit())
        .filter(|digits| !digits.is_empty())
        .last()
        .map_or(0, |digits| digits.parse().unwrap_or(u64::MAX));
    (number, name)
}
