//! Unit name normalization.
//!
//! Unit names in inventories come in many spellings (`M/S`, `Volts`,
//! `COUNTS`). Names are lower-cased unless they are one of the known names
//! whose canonical form mixes case. Unknown results are reported but kept.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use serde::Serialize;

use crate::binding::{BoundObject, Entry};
use crate::casting::Value;
use crate::diagnostics::Diagnostics;
use crate::schema::TypeId;

const TARGET: &str = "units";

/// Every unit name the normalizer considers canonical
pub const KNOWN_UNITS: &[&str] = &[
    "meter", "m", "m/s", "m/s**2", "centimeter", "cm", "cm/s", "cm/s**2", "millimeter", "mm",
    "mm/s", "mm/s**2", "mm/hour", "micrometer", "um", "um/s", "um/s**2", "nanometer", "nm",
    "nm/s", "nm/s**2", "second", "s", "millisecond", "ms", "microsecond", "us", "nanosecond",
    "ns", "minute", "min", "hour", "radian", "rad", "microradian", "urad", "nanoradian", "nrad",
    "rad/s", "rad/s**2", "degree", "deg", "kelvin", "K", "celsius", "degC", "candela", "cd",
    "pascal", "Pa", "kilopascal", "kPa", "hectopascal", "hPa", "bar", "millibar", "mbar",
    "ampere", "A", "milliamp", "mA", "volt", "V", "millivolt", "mV", "microvolt", "uV", "ohm",
    "hertz", "Hz", "newton", "N", "joule", "J", "tesla", "T", "nanotesla", "nT", "strain",
    "m/m", "m**3/m**3", "cm/cm", "mm/mm", "um/um", "nm/nm", "microstrain", "watt", "W",
    "milliwatt", "mW", "V/m", "W/m**2", "gap", "reboot", "byte", "bit", "bit/s", "percent", "%",
    "count", "counts", "number", "unitless",
];

fn known_units() -> &'static HashSet<&'static str> {
    static KNOWN: OnceLock<HashSet<&'static str>> = OnceLock::new();
    KNOWN.get_or_init(|| KNOWN_UNITS.iter().copied().collect())
}

/// Known names that are not all lower case
fn units_with_caps() -> &'static HashSet<&'static str> {
    static CAPS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    CAPS.get_or_init(|| {
        KNOWN_UNITS
            .iter()
            .copied()
            .filter(|name| name.chars().any(|c| c.is_ascii_uppercase()))
            .collect()
    })
}

pub fn is_known_unit(name: &str) -> bool {
    known_units().contains(name)
}

/// Canonical spelling of `name` and whether it differs from the input
pub fn normalize(name: &str) -> (String, bool) {
    if units_with_caps().contains(name) {
        return (name.to_string(), false);
    }
    let lower = name.to_lowercase();
    let changed = lower != name;
    (lower, changed)
}

/// Summary of a document-wide clean-up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitChanges {
    pub count: usize,
    /// Original name to normalized name
    pub changes: BTreeMap<String, String>,
    /// Normalized names that are not known units
    pub unknown: Vec<String>,
}

fn clean_units_object(units: &mut BoundObject, changes: &mut UnitChanges, diagnostics: &dyn Diagnostics) {
    let Some(name) = units.text("Name").map(str::to_string) else {
        return;
    };
    let (normalized, changed) = normalize(&name);
    if !is_known_unit(&normalized) {
        diagnostics.warn(TARGET, &format!("unknown unit: {}", normalized));
        if !changes.unknown.contains(&normalized) {
            changes.unknown.push(normalized.clone());
        }
    }
    if !changed {
        return;
    }
    diagnostics.debug(TARGET, &format!("{} -> {}", name, normalized));
    // Units has a text Name element, so this cannot fail
    if units.set("Name", Value::Text(normalized.clone())).is_ok() {
        changes.count += 1;
        changes.changes.insert(name, normalized);
    }
}

fn walk(obj: &mut BoundObject, changes: &mut UnitChanges, diagnostics: &dyn Diagnostics) {
    if obj.type_id() == TypeId::Units {
        clean_units_object(obj, changes, diagnostics);
        return;
    }
    for (_, slot) in obj.fields_mut() {
        for entry in slot.entries_mut() {
            if let Entry::Object(child) = entry {
                walk(child, changes, diagnostics);
            }
        }
    }
}

/// Normalize every `Units` object reachable from `root`
pub fn clean_unit_names(root: &mut BoundObject, diagnostics: &dyn Diagnostics) -> UnitChanges {
    let mut changes = UnitChanges::default();
    walk(root, &mut changes, diagnostics);
    log::info!("normalized {} unit names", changes.count);
    changes
}
