//! Spec module - loosely typed spec sheets and model-proposed drafts

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical field names shared by the decoder, the pipeline and its callers
///
/// Models may return arbitrary extra keys; those are kept verbatim in a
/// [`SpecSheet`]. The variants here are the keys every component agrees on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecField {
    /// Brand printed on or decoded from the label
    Manufacturer,
    /// Manufacturer part number
    Model,
    /// Product category (RAM, SSD, ...)
    Category,
    /// Module capacity, e.g. `8GB`
    Capacity,
    /// Memory generation, e.g. `DDR4`
    Generation,
    /// PC transfer rating, e.g. `PC4-25600`
    Speed,
    /// Data rate, e.g. `DDR4-3200`
    DataRate,
    /// Module form factor, e.g. `SODIMM`
    FormFactor,
    /// Supply voltage, e.g. `1.2V`
    Voltage,
    /// Edge connector pin count, e.g. `260-pin`
    PinCount,
    /// CAS latency, e.g. `CL22`
    CasLatency,
    /// Rank organisation, e.g. `1Rx8`
    Ranks,
}

impl SpecField {
    /// Every canonical field, in display order
    pub const ALL: [SpecField; 12] = [
        SpecField::Manufacturer,
        SpecField::Model,
        SpecField::Category,
        SpecField::Capacity,
        SpecField::Generation,
        SpecField::Speed,
        SpecField::DataRate,
        SpecField::FormFactor,
        SpecField::Voltage,
        SpecField::PinCount,
        SpecField::CasLatency,
        SpecField::Ranks,
    ];

    /// Key under which the field is stored in a [`SpecSheet`]
    pub fn key(&self) -> &'static str {
        match self {
            SpecField::Manufacturer => "manufacturer",
            SpecField::Model => "model",
            SpecField::Category => "category",
            SpecField::Capacity => "capacity",
            SpecField::Generation => "generation",
            SpecField::Speed => "speed",
            SpecField::DataRate => "data_rate",
            SpecField::FormFactor => "form_factor",
            SpecField::Voltage => "voltage",
            SpecField::PinCount => "pin_count",
            SpecField::CasLatency => "cas_latency",
            SpecField::Ranks => "ranks",
        }
    }

    /// Parse a canonical field from a (normalized or raw) key
    pub fn parse(key: &str) -> Option<Self> {
        let key = normalize_key(key);
        Self::ALL.iter().copied().find(|f| f.key() == key)
    }
}

impl fmt::Display for SpecField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Normalize a field name: trimmed, lower-case, spaces and hyphens become `_`
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Ordered mapping of field name to value
///
/// Keys are normalized on insert and blank values are never stored, so "absent"
/// always means "no usable value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecSheet {
    fields: BTreeMap<String, String>,
}

impl SpecSheet {
    /// Create an empty sheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one
    ///
    /// Blank values are ignored and leave the sheet unchanged.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        self.fields.insert(normalize_key(key.as_ref()), value.to_string())
    }

    /// Insert a canonical field
    pub fn set(&mut self, field: SpecField, value: impl Into<String>) -> Option<String> {
        self.insert(field.key(), value)
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&normalize_key(key)).map(String::as_str)
    }

    /// Look up a canonical field
    pub fn field(&self, field: SpecField) -> Option<&str> {
        self.fields.get(field.key()).map(String::as_str)
    }

    /// True when the key holds a value
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(&normalize_key(key))
    }

    /// Remove a key, returning its value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(&normalize_key(key))
    }

    /// Copy every entry of `other` whose key is absent here
    pub fn fill_absent(&mut self, other: &SpecSheet) {
        for (key, value) in other.iter() {
            if !self.fields.contains_key(key) {
                self.fields.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Iterate over `(key, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field holds a value
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SpecSheet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut sheet = SpecSheet::new();
        for (k, v) in iter {
            sheet.insert(k, v);
        }
        sheet
    }
}

impl IntoIterator for SpecSheet {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Unstructured text transcribed from a label photo
///
/// No structure is guaranteed and the text may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLabelText(String);

impl RawLabelText {
    /// Wrap transcribed text
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the trimmed text has more than `min_chars` characters
    pub fn is_usable(&self, min_chars: usize) -> bool {
        self.0.trim().chars().count() > min_chars
    }

    /// Consume into the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RawLabelText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A spec proposed by a language model from label text (or, on the fallback
/// path, directly from the image)
///
/// Nothing in a draft is trusted: it is the raw material that decoding and
/// protection are applied to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftSpec {
    /// Proposed manufacturer
    pub manufacturer: Option<String>,

    /// Proposed model / part number
    pub model: Option<String>,

    /// Proposed product category
    pub category: Option<String>,

    /// How many identical units the model saw
    pub visual_count: Option<u32>,

    /// Free-text notes
    pub notes: Option<String>,

    /// Marketplace title suggested by the model
    pub suggested_title: Option<String>,

    /// Any further fields the model proposed
    pub fields: SpecSheet,
}

impl DraftSpec {
    /// The string to hand to the part decoder, if any
    ///
    /// Prefers `model`, then an `mpn` or `part_number` field.
    pub fn part_number_candidate(&self) -> Option<&str> {
        self.model
            .as_deref()
            .or_else(|| self.fields.get("mpn"))
            .or_else(|| self.fields.get("part_number"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Flatten the draft into a sheet, with identity fields under their
    /// canonical keys
    pub fn to_sheet(&self) -> SpecSheet {
        let mut sheet = self.fields.clone();
        if let Some(m) = &self.manufacturer {
            sheet.set(SpecField::Manufacturer, m.as_str());
        }
        if let Some(m) = &self.model {
            sheet.set(SpecField::Model, m.as_str());
        }
        if let Some(c) = &self.category {
            sheet.set(SpecField::Category, c.as_str());
        }
        sheet
    }
}
