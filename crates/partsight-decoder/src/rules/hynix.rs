//! SK hynix: `HMT` (DDR3), `HMA` (DDR4), `HMCG`/`HMAG` (DDR5)
//!
//! DDR3/DDR4 layout after the prefix: density digit, two-character depth code,
//! module letter, then organisation and die revision; the speed code follows
//! the `-`. DDR5 puts a two-digit density code first and the module letter at
//! offset 5.

use crate::module::{FormFactor, Generation, ModuleFields};
use crate::normalize::split_suffix;

const MANUFACTURER: &str = "SK hynix";

pub(super) const SAMPLES: &[&str] = &["HMT451U6AFR8A-PB", "HMA81GS6CJR8N-XN", "HMCG78AGBSA092N"];

// Longest prefix first: HMAG must win over HMA.
const PREFIXES: [(&str, Generation); 4] = [
    ("HMCG", Generation::Ddr5),
    ("HMAG", Generation::Ddr5),
    ("HMA", Generation::Ddr4),
    ("HMT", Generation::Ddr3),
];

fn prefix(pn: &str) -> Option<(usize, Generation)> {
    PREFIXES
        .iter()
        .find(|(p, _)| pn.starts_with(p))
        .map(|(p, g)| (p.len(), *g))
}

pub(super) fn matches(pn: &str) -> bool {
    prefix(pn)
        .and_then(|(len, _)| pn[len..].chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

pub(super) fn extract(pn: &str) -> ModuleFields {
    let mut fields = ModuleFields::new(MANUFACTURER);
    let Some((prefix_len, generation)) = prefix(pn) else {
        return fields;
    };
    let (body, suffix) = split_suffix(pn);
    let rest = body.get(prefix_len..).unwrap_or_default();

    fields.generation = Some(generation);
    if generation == Generation::Ddr5 {
        fields.capacity_gb = rest.get(0..2).and_then(ddr5_density);
        fields.form_factor = rest.get(5..6).and_then(|c| module_letter(c, generation));
    } else {
        fields.capacity_gb = rest.get(1..3).and_then(depth);
        fields.form_factor = rest.get(3..4).and_then(|c| module_letter(c, generation));
    }
    fields.mts = suffix.and_then(|s| s.get(0..2)).and_then(|code| speed(code, generation));
    fields
}

fn depth(code: &str) -> Option<u32> {
    match code {
        "25" => Some(2),
        "51" => Some(4),
        "1G" => Some(8),
        "2G" => Some(16),
        "4G" => Some(32),
        _ => None,
    }
}

fn ddr5_density(code: &str) -> Option<u32> {
    match code {
        "66" => Some(8),
        "78" => Some(16),
        "88" => Some(32),
        "94" => Some(64),
        _ => None,
    }
}

fn module_letter(letter: &str, generation: Generation) -> Option<FormFactor> {
    match (letter, generation) {
        ("S" | "G", _) => Some(FormFactor::SoDimm),
        // DDR3 `U` parts ship as 204-pin SODIMMs
        ("U", Generation::Ddr3) => Some(FormFactor::SoDimm),
        ("U" | "A", _) => Some(FormFactor::UDimm),
        ("R", _) => Some(FormFactor::RDimm),
        ("E", _) => Some(FormFactor::EccUDimm),
        _ => None,
    }
}

fn speed(code: &str, generation: Generation) -> Option<u32> {
    match (generation, code) {
        (Generation::Ddr4, "XN") => Some(3200),
        (Generation::Ddr4, "WM") => Some(2933),
        (Generation::Ddr4, "JJ" | "VK") => Some(2666),
        (Generation::Ddr4, "DY" | "AF") => Some(2400),
        (Generation::Ddr4, "TF") => Some(2133),
        (Generation::Ddr3, "RD") => Some(1866),
        (Generation::Ddr3, "PB" | "SK" | "CK") => Some(1600),
        (Generation::Ddr3, "MR" | "H9") => Some(1333),
        (Generation::Ddr3, "MP" | "G7") => Some(1066),
        _ => None,
    }
}
