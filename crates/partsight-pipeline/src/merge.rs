//! Protected merge of decoded, drafted and enriched fields
//!
//! Protection is enforced here, after every model call, as a pure function
//! of its inputs. Nothing a model returns can replace a decoded value.

use partsight_domain::{DecodedSpec, EnrichedSpec, SpecSheet};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Draft and decoded fields combined, before enrichment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedSpec {
    fields: SpecSheet,
    protected: BTreeSet<String>,
}

impl MergedSpec {
    /// Merge a draft sheet with an optional decode result
    ///
    /// Decoded values replace drafted ones and become protected.
    pub fn new(draft: &SpecSheet, decoded: Option<&DecodedSpec>) -> Self {
        let mut fields = draft.clone();
        let mut protected = BTreeSet::new();

        if let Some(decoded) = decoded {
            for (key, value) in decoded.fields.iter() {
                if let Some(previous) = fields.insert(key, value) {
                    if previous != value {
                        debug!(
                            key,
                            drafted = %previous,
                            decoded = value,
                            "Decoded value replaces drafted value"
                        );
                    }
                }
                protected.insert(key.to_string());
            }
        }

        Self { fields, protected }
    }

    /// Merged fields
    pub fn fields(&self) -> &SpecSheet {
        &self.fields
    }

    /// Keys that came from decoding
    pub fn protected_keys(&self) -> &BTreeSet<String> {
        &self.protected
    }

    /// Apply enrichment additions
    ///
    /// Additions only fill keys that are absent. An addition for a protected
    /// key is discarded; one for an unprotected key that already has a value
    /// loses to that value. Returns the final spec and the protected keys the
    /// model tried to change.
    pub fn enrich(&self, additions: &SpecSheet) -> (EnrichedSpec, Vec<String>) {
        let mut fields = self.fields.clone();
        let mut rejected = Vec::new();

        for (key, value) in additions.iter() {
            if self.protected.contains(key) {
                if self.fields.get(key) != Some(value) {
                    warn!(
                        key,
                        proposed = value,
                        kept = self.fields.get(key).unwrap_or_default(),
                        "Discarding model value for protected field"
                    );
                    rejected.push(key.to_string());
                }
                continue;
            }
            if fields.contains_key(key) {
                debug!(key, "Keeping existing value over enrichment");
                continue;
            }
            fields.insert(key, value);
        }

        (EnrichedSpec::new(fields, self.protected.clone()), rejected)
    }

    /// Finish without enrichment
    pub fn into_enriched(self) -> EnrichedSpec {
        EnrichedSpec::new(self.fields, self.protected)
    }
}
