//! Micron modules: `MT[A|C]<chips><family><depth><width><form>-<speed>`
//!
//! `MTA8ATF1G64HZ-3G2R1`: 8 chips, DDR4 family `ATF`, 1G words deep, 64 bits
//! wide, `HZ` SODIMM, `3G2` = 3200 MT/s. `MTC` modules (DDR5) use a different
//! layout; only the generation is taken from the prefix.

use crate::module::{FormFactor, Generation, ModuleFields};
use crate::normalize::split_suffix;
use regex::Regex;
use std::sync::OnceLock;

const MANUFACTURER: &str = "Micron";

pub(super) const SAMPLES: &[&str] = &[
    "MTA8ATF1G64HZ-3G2R1",
    "MT16JTF51264AZ-1G6M1",
    "MT36HTF51272PZ-667C1",
];

static LAYOUT: OnceLock<Regex> = OnceLock::new();

fn layout() -> &'static Regex {
    LAYOUT.get_or_init(|| {
        Regex::new(r"^MT[AC]?\d{1,2}([A-Z]{3})(1G|2G|4G|8G|512|256|128)(64|72)([A-Z]{2})")
            .expect("micron layout regex must compile")
    })
}

pub(super) fn matches(pn: &str) -> bool {
    let after = pn
        .strip_prefix("MTA")
        .or_else(|| pn.strip_prefix("MTC"))
        .or_else(|| pn.strip_prefix("MT"));
    after
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

pub(super) fn extract(pn: &str) -> ModuleFields {
    let mut fields = ModuleFields::new(MANUFACTURER);
    if pn.starts_with("MTC") {
        fields.generation = Some(Generation::Ddr5);
        return fields;
    }

    let (body, suffix) = split_suffix(pn);
    let Some(caps) = layout().captures(body) else {
        return fields;
    };

    fields.generation = family(&caps[1]);
    fields.capacity_gb = depth_megawords(&caps[2]).map(|words| words * 8 / 1024);
    let ecc = &caps[3] == "72";
    fields.form_factor = form(&caps[4], ecc);
    fields.mts = suffix.and_then(|s| s.get(0..3)).and_then(speed);
    fields
}

fn family(code: &str) -> Option<Generation> {
    match code {
        "HTF" | "HSF" => Some(Generation::Ddr2),
        "JTF" | "JSF" | "JDF" | "KTF" | "KSF" => Some(Generation::Ddr3),
        "ATF" | "ASF" | "ADF" => Some(Generation::Ddr4),
        _ => None,
    }
}

fn depth_megawords(code: &str) -> Option<u32> {
    match code {
        "128" => Some(128),
        "256" => Some(256),
        "512" => Some(512),
        "1G" => Some(1024),
        "2G" => Some(2048),
        "4G" => Some(4096),
        "8G" => Some(8192),
        _ => None,
    }
}

fn form(code: &str, ecc: bool) -> Option<FormFactor> {
    match code {
        "HZ" | "HR" | "HY" => Some(FormFactor::SoDimm),
        "AZ" | "AY" if ecc => Some(FormFactor::EccUDimm),
        "AZ" | "AY" => Some(FormFactor::UDimm),
        "PZ" | "PF" | "PY" => Some(FormFactor::RDimm),
        "FY" => Some(FormFactor::FbDimm),
        _ => None,
    }
}

fn speed(code: &str) -> Option<u32> {
    match code {
        "5G6" => Some(5600),
        "4G8" => Some(4800),
        "3G2" => Some(3200),
        "2G9" => Some(2933),
        "2G6" => Some(2666),
        "2G4" | "2G3" => Some(2400),
        "2G1" => Some(2133),
        "1G9" => Some(1866),
        "1G6" => Some(1600),
        "1G4" | "1G3" => Some(1333),
        "1G1" => Some(1066),
        "80E" | "800" => Some(800),
        "667" => Some(667),
        "53E" => Some(533),
        _ => None,
    }
}
