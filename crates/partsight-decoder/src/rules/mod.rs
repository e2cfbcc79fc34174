//! Manufacturer Rule Table
//!
//! One [`Rule`] variant per manufacturer family. Rules are tried in the order
//! of the table and the first structural match wins; a structural match that
//! recovers nothing is still final, later rules are not consulted.

mod crucial;
mod hynix;
mod kingston;
mod micron;
mod samsung;

use crate::error::DecoderError;
use crate::module::ModuleFields;
use std::fmt;

/// A manufacturer family's part-number rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// `HMT`, `HMA`, `HMCG`, `HMAG`
    SkHynix,
    /// `M471`, `M473`, `M474`, `M378`, `M391`, `M393`
    Samsung,
    /// `KVR`, `KF`, 9-digit item codes
    Kingston,
    /// `MT`, `MTA`, `MTC`
    Micron,
    /// `CT<n>G`
    Crucial,
}

impl Rule {
    /// Standard priority order
    pub const PRIORITY: [Rule; 5] = [
        Rule::SkHynix,
        Rule::Samsung,
        Rule::Kingston,
        Rule::Micron,
        Rule::Crucial,
    ];

    /// Family name used in logs and results
    pub fn family(&self) -> &'static str {
        match self {
            Rule::SkHynix => "SK hynix",
            Rule::Samsung => "Samsung",
            Rule::Kingston => "Kingston",
            Rule::Micron => "Micron",
            Rule::Crucial => "Crucial",
        }
    }

    /// True when the normalized part number has this family's structure
    pub fn matches(&self, part_number: &str) -> bool {
        match self {
            Rule::SkHynix => hynix::matches(part_number),
            Rule::Samsung => samsung::matches(part_number),
            Rule::Kingston => kingston::matches(part_number),
            Rule::Micron => micron::matches(part_number),
            Rule::Crucial => crucial::matches(part_number),
        }
    }

    /// Recover whatever fields the normalized part number encodes
    pub fn extract(&self, part_number: &str) -> ModuleFields {
        match self {
            Rule::SkHynix => hynix::extract(part_number),
            Rule::Samsung => samsung::extract(part_number),
            Rule::Kingston => kingston::extract(part_number),
            Rule::Micron => micron::extract(part_number),
            Rule::Crucial => crucial::extract(part_number),
        }
    }

    /// Known part numbers of this family, used to validate a table
    pub fn samples(&self) -> &'static [&'static str] {
        match self {
            Rule::SkHynix => hynix::SAMPLES,
            Rule::Samsung => samsung::SAMPLES,
            Rule::Kingston => kingston::SAMPLES,
            Rule::Micron => micron::SAMPLES,
            Rule::Crucial => crucial::SAMPLES,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family())
    }
}

/// Ordered, validated set of rules
///
/// Read-only after construction and safe to share between concurrent
/// identification runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Build a table, rejecting configurations where two rules could claim
    /// the same part number
    ///
    /// Every rule's sample part numbers must be claimed by that rule alone.
    pub fn new(rules: Vec<Rule>) -> Result<Self, DecoderError> {
        if rules.is_empty() {
            return Err(DecoderError::EmptyTable);
        }
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].contains(rule) {
                return Err(DecoderError::DuplicateRule(rule.family().to_string()));
            }
        }

        let table = Self { rules };
        for rule in &table.rules {
            for sample in rule.samples() {
                let claimants = table.claimants(sample);
                if claimants.len() > 1 {
                    return Err(DecoderError::AmbiguousRules {
                        part_number: sample.to_string(),
                        first: claimants[0].family().to_string(),
                        second: claimants[1].family().to_string(),
                    });
                }
            }
        }
        Ok(table)
    }

    /// All five families in standard priority order
    ///
    /// Debug builds run the same checks as [`RuleTable::new`].
    pub fn standard() -> Self {
        let table = Self {
            rules: Rule::PRIORITY.to_vec(),
        };
        debug_assert!(
            Self::new(table.rules.clone()).is_ok(),
            "standard rule table must pass RuleTable::new checks"
        );
        table
    }

    /// Rules in priority order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Every rule that structurally matches the normalized part number
    pub fn claimants(&self, part_number: &str) -> Vec<Rule> {
        self.rules
            .iter()
            .copied()
            .filter(|r| r.matches(part_number))
            .collect()
    }

    /// First rule, in priority order, that structurally matches
    pub fn first_match(&self, part_number: &str) -> Option<Rule> {
        self.rules.iter().copied().find(|r| r.matches(part_number))
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_is_unambiguous() {
        let table = RuleTable::new(Rule::PRIORITY.to_vec()).unwrap();
        assert_eq!(table, RuleTable::standard());
    }

    #[test]
    fn test_every_sample_is_claimed_by_its_own_rule() {
        let table = RuleTable::standard();
        for rule in Rule::PRIORITY {
            for sample in rule.samples() {
                assert_eq!(table.claimants(sample), vec![rule], "{}", sample);
            }
        }
    }

    #[test]
    fn test_empty_table_rejected() {
        assert_eq!(RuleTable::new(vec![]), Err(DecoderError::EmptyTable));
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let err = RuleTable::new(vec![Rule::Samsung, Rule::Crucial, Rule::Samsung]).unwrap_err();
        assert_eq!(err, DecoderError::DuplicateRule("Samsung".to_string()));
    }

    #[test]
    fn test_custom_order_is_respected() {
        let table = RuleTable::new(vec![Rule::Crucial, Rule::SkHynix]).unwrap();
        assert_eq!(table.rules(), &[Rule::Crucial, Rule::SkHynix]);
        assert_eq!(table.first_match("HMT451U6AFR8A-PB"), Some(Rule::SkHynix));
        assert_eq!(table.first_match("M471A1K43DB1-CTD"), None);
    }
}
