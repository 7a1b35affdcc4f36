//! Value transformation rules.
//!
//! Each identifier maps to an ordered list of rules applied left to right.
//! The chain stops as soon as the value becomes null, so rule order matters:
//! `[MultiplyBy100, NullZeros, Cut100]` turns `0` into null and never reaches
//! the clamp.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A single transformation step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TransformRule {
    /// Rescale a fraction to a percentage
    #[serde(rename = "multiplyBy100")]
    MultiplyBy100,
    /// Clamp to at most 100
    #[serde(rename = "cut100")]
    Cut100,
    /// Treat zero as no data
    NullZeros,
    /// Identity
    None,
}

impl TransformRule {
    /// Apply this rule to a non-null value.
    pub fn apply(self, value: f64) -> Option<f64> {
        match self {
            TransformRule::MultiplyBy100 => Some(value * 100.0),
            TransformRule::Cut100 => Some(value.min(100.0)),
            TransformRule::NullZeros => {
                if value == 0.0 {
                    None
                } else {
                    Some(value)
                }
            }
            TransformRule::None => Some(value),
        }
    }
}

const DEFAULT_CHAIN: &[TransformRule] = &[TransformRule::None];

/// Registry of rule chains keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct TransformationEngine {
    rules: HashMap<String, Vec<TransformRule>>,
}

impl TransformationEngine {
    /// Create an engine from an identifier -> rules table.
    pub fn new(rules: &BTreeMap<String, Vec<TransformRule>>) -> Self {
        Self {
            rules: rules.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Rule chain for `identifier`; unregistered identifiers get `[None]`.
    pub fn rules_for(&self, identifier: &str) -> &[TransformRule] {
        self.rules
            .get(identifier)
            .map(Vec::as_slice)
            .unwrap_or(DEFAULT_CHAIN)
    }

    /// Run the chain for `identifier` over `value`, halting on null.
    pub fn apply(&self, identifier: &str, value: Option<f64>) -> Option<f64> {
        self.rules_for(identifier)
            .iter()
            .try_fold(value?, |current, rule| rule.apply(current))
    }

    /// Register or replace a chain.
    pub fn register(&mut self, identifier: &str, rules: Vec<TransformRule>) {
        self.rules.insert(identifier.to_string(), rules);
    }
}
