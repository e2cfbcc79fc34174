//! Quantity detection from visual counts and part-number repetition

use partsight_decoder::normalize;
use partsight_domain::{QuantityEstimate, QuantitySource};
use tracing::{debug, warn};

/// Outcome of reconciling the two quantity signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The estimate handed to the result
    pub estimate: QuantityEstimate,

    /// Set when the signals disagreed enough to be worth recording
    pub discrepancy: Option<String>,
}

/// Number of times `part_number` occurs in `text` as a whole token
///
/// Both sides are normalized first, so `hmt451u6afr8a pb` in the text counts
/// as a mention of `HMT451U6AFR8A-PB`. A match running into more of a part
/// number (`KVR16S11/4` inside `KVR16S11/48`) is a different part.
pub fn count_mentions(text: &str, part_number: &str) -> u32 {
    let needle = normalize(part_number);
    if needle.is_empty() {
        return 0;
    }
    let haystack = normalize(text);
    let count = haystack
        .match_indices(needle.as_str())
        .filter(|(start, _)| {
            let before = haystack[..*start].chars().next_back();
            let after = haystack[start + needle.len()..].chars().next();
            !continues_token(before) && !continues_token(after)
        })
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn continues_token(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '/')
}

/// Reconciles the model's visual count with part-number repetition
#[derive(Debug, Clone, Copy)]
pub struct QuantityDetector {
    discrepancy_factor: u32,
}

impl QuantityDetector {
    /// Create a detector; signals further apart than `discrepancy_factor`
    /// disagree
    pub fn new(discrepancy_factor: u32) -> Self {
        Self {
            discrepancy_factor: discrepancy_factor.max(1),
        }
    }

    /// Estimate the unit count
    ///
    /// `visual` is the structuring stage's count. `text` and `part_number`
    /// feed the repetition signal when both are present.
    pub fn estimate(
        &self,
        visual: Option<u32>,
        text: Option<&str>,
        part_number: Option<&str>,
    ) -> Reconciliation {
        let mentions = match (text, part_number) {
            (Some(text), Some(pn)) => count_mentions(text, pn),
            _ => 0,
        };
        self.reconcile(visual, mentions)
    }

    /// Reconcile a visual count with a mention count
    ///
    /// A single mention is what any label shows, so repetition only counts
    /// from two mentions up. When both signals exist the larger wins, unless
    /// they differ by more than the discrepancy factor; then the text signal
    /// wins and the disagreement is reported.
    pub fn reconcile(&self, visual: Option<u32>, mentions: u32) -> Reconciliation {
        let visual_estimate = match visual {
            Some(count) => QuantityEstimate::new(count, QuantitySource::VisualCount),
            None => QuantityEstimate::single(),
        };

        if mentions < 2 {
            debug!(visual = ?visual, mentions, "Quantity from visual count");
            return Reconciliation {
                estimate: visual_estimate,
                discrepancy: None,
            };
        }

        let by_text = QuantityEstimate::new(mentions, QuantitySource::PartNumberRepetition);
        let Some(visual) = visual.filter(|v| *v > 0) else {
            return Reconciliation {
                estimate: by_text,
                discrepancy: None,
            };
        };

        let (low, high) = (visual.min(mentions), visual.max(mentions));
        if high <= low.saturating_mul(self.discrepancy_factor) {
            let estimate = if visual > mentions { visual_estimate } else { by_text };
            return Reconciliation {
                estimate,
                discrepancy: None,
            };
        }

        let note = format!(
            "quantity signals disagree: visual count {} vs {} part-number mentions; using {}",
            visual, mentions, mentions
        );
        warn!(visual, mentions, "Quantity signals disagree, preferring part-number mentions");
        Reconciliation {
            estimate: by_text,
            discrepancy: Some(note),
        }
    }
}

impl Default for QuantityDetector {
    fn default() -> Self {
        Self::new(2)
    }
}
