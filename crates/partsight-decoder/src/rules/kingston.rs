//! Kingston ValueRAM (`KVR<speed><form><CL>...`) and FURY (`KF<gen><speed><form><CL>...`)
//!
//! Capacity follows the `/` (`KVR16S11/4`) or, for kits, closes the part
//! number as a numeric segment (`KF548C38BBK2-32`). Bare 9-digit numbers are
//! Kingston's internal item codes: recognized, but they encode nothing.

use crate::module::{FormFactor, Generation, ModuleFields};

const VALUE_RAM: &str = "Kingston";
const FURY: &str = "Kingston FURY";

pub(super) const SAMPLES: &[&str] = &["KVR16S11/4", "KF432C16BB/16", "KVR24N17S8/8", "999301541"];

fn is_item_code(pn: &str) -> bool {
    pn.len() == 9 && pn.bytes().all(|b| b.is_ascii_digit())
}

fn has_digits(s: Option<&str>) -> bool {
    s.is_some_and(|s| s.bytes().all(|b| b.is_ascii_digit()))
}

pub(super) fn matches(pn: &str) -> bool {
    if is_item_code(pn) {
        return true;
    }
    if pn.starts_with("KVR") {
        return has_digits(pn.get(3..5));
    }
    if pn.starts_with("KF") {
        return has_digits(pn.get(2..5));
    }
    false
}

pub(super) fn extract(pn: &str) -> ModuleFields {
    if pn.starts_with("KVR") {
        let mut fields = ModuleFields::new(VALUE_RAM);
        if let Some(mts) = pn.get(3..5).and_then(speed) {
            fields.generation = generation_for(mts);
            fields.mts = Some(mts);
        }
        apply_tail(&mut fields, pn.get(5..).unwrap_or_default());
        fields.capacity_gb = capacity(pn);
        fields
    } else if pn.starts_with("KF") {
        let mut fields = ModuleFields::new(FURY);
        fields.generation = pn
            .get(2..3)
            .and_then(|d| d.chars().next())
            .and_then(Generation::from_digit);
        fields.mts = pn.get(3..5).and_then(speed);
        apply_tail(&mut fields, pn.get(5..).unwrap_or_default());
        fields.capacity_gb = capacity(pn);
        fields
    } else {
        ModuleFields::new(VALUE_RAM)
    }
}

/// Two-digit speed code (MT/s / 100, rounded down)
fn speed(code: &str) -> Option<u32> {
    match code {
        "13" => Some(1333),
        "16" => Some(1600),
        "18" => Some(1866),
        "21" => Some(2133),
        "24" => Some(2400),
        "26" => Some(2666),
        "29" => Some(2933),
        "32" => Some(3200),
        "36" => Some(3600),
        "48" => Some(4800),
        "52" => Some(5200),
        "56" => Some(5600),
        "60" => Some(6000),
        _ => None,
    }
}

fn generation_for(mts: u32) -> Option<Generation> {
    match mts {
        1333..=1866 => Some(Generation::Ddr3),
        2133..=3200 => Some(Generation::Ddr4),
        4800.. => Some(Generation::Ddr5),
        _ => None,
    }
}

/// Parse `[L]<form letter><CAS latency>` following the speed code
fn apply_tail(fields: &mut ModuleFields, tail: &str) {
    let mut tail = tail;
    if fields.generation == Some(Generation::Ddr3) {
        if let Some(rest) = tail.strip_prefix('L') {
            fields.voltage = Some("1.35V");
            tail = rest;
        }
    }

    let mut chars = tail.chars();
    fields.form_factor = Some(match chars.next() {
        Some('S') => FormFactor::SoDimm,
        Some('E') => FormFactor::EccUDimm,
        Some('R') => FormFactor::RDimm,
        _ => FormFactor::UDimm,
    });

    let cl: String = chars.take_while(|c| c.is_ascii_digit()).collect();
    fields.cas_latency = cl.parse().ok().filter(|cl| (4..=60).contains(cl));
}

fn capacity(pn: &str) -> Option<u32> {
    if let Some((_, after)) = pn.rsplit_once('/') {
        let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        return digits.parse().ok();
    }
    pn.rsplit_once('-')
        .map(|(_, last)| last)
        .filter(|last| !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|last| last.parse().ok())
}
