//! Samsung: `M<module code><generation letter><depth>...-<class><speed>`
//!
//! e.g. `M471A1K43DB1-CTD` is a DDR4 SODIMM, 8GB, commercial class, 2666 MT/s.

use crate::module::{FormFactor, Generation, ModuleFields};
use crate::normalize::split_suffix;

const MANUFACTURER: &str = "Samsung";

pub(super) const SAMPLES: &[&str] = &["M471A1K43DB1-CTD", "M378B5273CH0-CH9", "M393A2K40BB1-CRC"];

fn module_code(pn: &str) -> Option<FormFactor> {
    match pn.get(0..4)? {
        "M471" | "M473" | "M474" => Some(FormFactor::SoDimm),
        "M378" => Some(FormFactor::UDimm),
        "M391" => Some(FormFactor::EccUDimm),
        "M393" => Some(FormFactor::RDimm),
        _ => None,
    }
}

fn generation(letter: &str) -> Option<Generation> {
    match letter {
        "A" => Some(Generation::Ddr4),
        "B" => Some(Generation::Ddr3),
        "T" => Some(Generation::Ddr2),
        _ => None,
    }
}

pub(super) fn matches(pn: &str) -> bool {
    module_code(pn).is_some() && pn.get(4..5).is_some_and(|c| generation(c).is_some())
}

pub(super) fn extract(pn: &str) -> ModuleFields {
    let mut fields = ModuleFields::new(MANUFACTURER);
    fields.form_factor = module_code(pn);
    let Some(generation) = pn.get(4..5).and_then(generation) else {
        return fields;
    };
    fields.generation = Some(generation);

    let (body, suffix) = split_suffix(pn);
    fields.capacity_gb = body.get(5..7).and_then(depth);

    if let Some(suffix) = suffix {
        // `Y` marks the 1.35V low-voltage DDR3 parts
        if generation == Generation::Ddr3 && suffix.starts_with('Y') {
            fields.voltage = Some("1.35V");
        }
        fields.mts = suffix.get(1..3).and_then(|code| speed(code, generation));
    }
    fields
}

fn depth(code: &str) -> Option<u32> {
    match code {
        "57" => Some(2),
        "51" | "52" | "5K" | "5G" => Some(4),
        "1K" | "1G" => Some(8),
        "2K" | "2G" => Some(16),
        "4G" | "4K" => Some(32),
        _ => None,
    }
}

fn speed(code: &str, generation: Generation) -> Option<u32> {
    match (generation, code) {
        (Generation::Ddr4, "WE") => Some(3200),
        (Generation::Ddr4, "VF") => Some(2933),
        (Generation::Ddr4, "TD") => Some(2666),
        (Generation::Ddr4, "RC") => Some(2400),
        (Generation::Ddr4, "PB") => Some(2133),
        (Generation::Ddr3, "MA") => Some(1866),
        (Generation::Ddr3, "K0") => Some(1600),
        (Generation::Ddr3, "H9") => Some(1333),
        (Generation::Ddr3, "F8") => Some(1066),
        (Generation::Ddr2, "F7") => Some(800),
        (Generation::Ddr2, "E6") => Some(667),
        _ => None,
    }
}
