//! Quantity module - number of identical physical units in a photo

use std::fmt;

/// Which signal a quantity estimate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantitySource {
    /// No usable signal; a single unit is assumed
    Default,

    /// The model's count of identical units in the image
    VisualCount,

    /// Repeated mentions of the part number in the label text
    PartNumberRepetition,
}

impl QuantitySource {
    /// Get the source name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantitySource::Default => "default",
            QuantitySource::VisualCount => "visual_count",
            QuantitySource::PartNumberRepetition => "part_number_repetition",
        }
    }
}

/// Number of identical units, never below 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantityEstimate {
    count: u32,
    source: QuantitySource,
}

impl QuantityEstimate {
    /// Create an estimate; counts below 1 are raised to 1
    pub fn new(count: u32, source: QuantitySource) -> Self {
        Self {
            count: count.max(1),
            source,
        }
    }

    /// A single unit with no supporting signal
    pub fn single() -> Self {
        Self::new(1, QuantitySource::Default)
    }

    /// The unit count (always at least 1)
    pub fn value(&self) -> u32 {
        self.count
    }

    /// Which signal the count came from
    pub fn source(&self) -> QuantitySource {
        self.source
    }

    /// True when more than one unit was detected
    pub fn is_multiple(&self) -> bool {
        self.count > 1
    }
}

impl Default for QuantityEstimate {
    fn default() -> Self {
        Self::single()
    }
}

impl fmt::Display for QuantityEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count)
    }
}
