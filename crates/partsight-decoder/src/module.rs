//! Memory module vocabulary shared by every manufacturer rule

use partsight_domain::{SpecField, SpecSheet};
use std::fmt;

/// DDR generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Generation {
    /// DDR2 SDRAM
    Ddr2,
    /// DDR3 SDRAM
    Ddr3,
    /// DDR4 SDRAM
    Ddr4,
    /// DDR5 SDRAM
    Ddr5,
}

impl Generation {
    /// Get the generation name as a string, e.g. `DDR4`
    pub fn as_str(&self) -> &'static str {
        match self {
            Generation::Ddr2 => "DDR2",
            Generation::Ddr3 => "DDR3",
            Generation::Ddr4 => "DDR4",
            Generation::Ddr5 => "DDR5",
        }
    }

    /// Generation from its digit (`2`..=`5`)
    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '2' => Some(Generation::Ddr2),
            '3' => Some(Generation::Ddr3),
            '4' => Some(Generation::Ddr4),
            '5' => Some(Generation::Ddr5),
            _ => None,
        }
    }

    fn digit(&self) -> u8 {
        match self {
            Generation::Ddr2 => 2,
            Generation::Ddr3 => 3,
            Generation::Ddr4 => 4,
            Generation::Ddr5 => 5,
        }
    }

    /// Standard supply voltage
    pub fn voltage(&self) -> &'static str {
        match self {
            Generation::Ddr2 => "1.8V",
            Generation::Ddr3 => "1.5V",
            Generation::Ddr4 => "1.2V",
            Generation::Ddr5 => "1.1V",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical module type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormFactor {
    /// Small-outline DIMM (laptops)
    SoDimm,
    /// Unbuffered DIMM (desktops)
    UDimm,
    /// Registered DIMM (servers)
    RDimm,
    /// Unbuffered DIMM with ECC
    EccUDimm,
    /// Fully buffered DIMM
    FbDimm,
}

impl FormFactor {
    /// Get the form factor name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FormFactor::SoDimm => "SODIMM",
            FormFactor::UDimm => "UDIMM",
            FormFactor::RDimm => "RDIMM",
            FormFactor::EccUDimm => "ECC UDIMM",
            FormFactor::FbDimm => "FB-DIMM",
        }
    }

    /// Edge connector pin count for this form factor in `generation`
    pub fn pin_count(&self, generation: Generation) -> u16 {
        match (self, generation) {
            (FormFactor::SoDimm, Generation::Ddr2) => 200,
            (FormFactor::SoDimm, Generation::Ddr3) => 204,
            (FormFactor::SoDimm, Generation::Ddr4) => 260,
            (FormFactor::SoDimm, Generation::Ddr5) => 262,
            (_, Generation::Ddr2) | (_, Generation::Ddr3) => 240,
            (_, Generation::Ddr4) | (_, Generation::Ddr5) => 288,
        }
    }
}

impl fmt::Display for FormFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transfer rate of a module in a given generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeedGrade {
    /// Generation the rate belongs to
    pub generation: Generation,

    /// Mega-transfers per second
    pub mts: u32,
}

impl SpeedGrade {
    /// Create a speed grade
    pub fn new(generation: Generation, mts: u32) -> Self {
        Self { generation, mts }
    }

    /// JEDEC data-rate name, e.g. `DDR3-1600`
    pub fn data_rate(&self) -> String {
        format!("{}-{}", self.generation, self.mts)
    }

    /// PC module rating, e.g. `PC3-12800`
    ///
    /// Peak bandwidth in MB/s (MT/s × 8 bytes) truncated to hundreds.
    pub fn pc_rating(&self) -> String {
        let bandwidth = self.mts * 8 / 100 * 100;
        format!("PC{}-{}", self.generation.digit(), bandwidth)
    }
}

/// Fields a rule managed to recover from a part number
///
/// Voltage and pin count are derived from generation and form factor unless
/// the part number encodes something more specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFields {
    /// Brand to report
    pub manufacturer: &'static str,
    /// Capacity in gigabytes
    pub capacity_gb: Option<u32>,
    /// DDR generation
    pub generation: Option<Generation>,
    /// Transfer rate in MT/s
    pub mts: Option<u32>,
    /// Module type
    pub form_factor: Option<FormFactor>,
    /// Voltage encoded by the part number itself (low-voltage variants)
    pub voltage: Option<&'static str>,
    /// CAS latency in clock cycles, when the part number encodes it
    pub cas_latency: Option<u32>,
}

impl ModuleFields {
    /// Start with only the manufacturer known
    pub fn new(manufacturer: &'static str) -> Self {
        Self {
            manufacturer,
            capacity_gb: None,
            generation: None,
            mts: None,
            form_factor: None,
            voltage: None,
            cas_latency: None,
        }
    }

    /// Speed grade, when both generation and rate are known
    pub fn speed(&self) -> Option<SpeedGrade> {
        Some(SpeedGrade::new(self.generation?, self.mts?))
    }

    /// Render into spec fields
    pub fn into_sheet(self) -> SpecSheet {
        let mut sheet = SpecSheet::new();
        sheet.set(SpecField::Manufacturer, self.manufacturer);
        if let Some(gb) = self.capacity_gb.filter(|gb| *gb > 0) {
            sheet.set(SpecField::Capacity, format!("{}GB", gb));
        }
        if let Some(generation) = self.generation {
            sheet.set(SpecField::Generation, generation.as_str());
        }
        if let Some(speed) = self.speed() {
            sheet.set(SpecField::Speed, speed.pc_rating());
            sheet.set(SpecField::DataRate, speed.data_rate());
        }
        if let Some(form) = self.form_factor {
            sheet.set(SpecField::FormFactor, form.as_str());
        }
        if let Some(voltage) = self.voltage.or(self.generation.map(|g| g.voltage())) {
            sheet.set(SpecField::Voltage, voltage);
        }
        if let (Some(form), Some(generation)) = (self.form_factor, self.generation) {
            sheet.set(
                SpecField::PinCount,
                format!("{}-pin", form.pin_count(generation)),
            );
        }
        if let Some(cl) = self.cas_latency {
            sheet.set(SpecField::CasLatency, format!("CL{}", cl));
        }
        sheet
    }
}
