//! Text vs numeric routing of data-point identifiers.

use std::collections::{BTreeSet, HashSet};

/// How a raw cell is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Numeric,
    Text,
}

/// Static partition of identifiers. Anything not listed as text is numeric.
///
/// A text field missing from the set is silently parsed as a number, so every
/// new text identifier needs a classification test.
#[derive(Debug, Clone, Default)]
pub struct ValueClassifier {
    text: HashSet<String>,
}

impl ValueClassifier {
    pub fn new(text_identifiers: &BTreeSet<String>) -> Self {
        Self {
            text: text_identifiers.iter().cloned().collect(),
        }
    }

    pub fn classify(&self, identifier: &str) -> ValueKind {
        if self.text.contains(identifier) {
            ValueKind::Text
        } else {
            ValueKind::Numeric
        }
    }

    pub fn is_text(&self, identifier: &str) -> bool {
        self.classify(identifier) == ValueKind::Text
    }
}
