//! Policy catalog entries and their interpreted results.

use serde::{Deserialize, Serialize};

/// Raw value assumed when a policy's yes/no identifier has no data.
pub const DEFAULT_POLICY_VALUE: &str = "N";

/// Label shown for raw values the interpretation does not recognise.
pub const UNRECOGNISED_POLICY_LABEL: &str = "-";

/// A hand-authored policy catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyDefinition {
    /// Intervention area (e.g. "Case management")
    pub intervention: String,
    /// Free-text strategy description
    pub strategy: String,
    /// Text identifier holding the adoption flag
    pub yes_no_identifier: String,
    /// Numeric identifier holding the adoption year
    pub year_adopted_identifier: String,
    /// First reporting year the entry applies to (inclusive)
    #[serde(default)]
    pub valid_from_year: Option<i32>,
    /// Last reporting year the entry applies to (inclusive)
    #[serde(default)]
    pub valid_until_year: Option<i32>,
    /// Position in the rendered table; unordered entries go last
    #[serde(default)]
    pub display_order: Option<i32>,
    /// How the raw value is turned into a label
    #[serde(default)]
    pub interpretation: PolicyInterpretation,
}

impl PolicyDefinition {
    /// Create a yes/no policy with no year window or display order.
    pub fn new(
        intervention: impl Into<String>,
        strategy: impl Into<String>,
        yes_no_identifier: impl Into<String>,
        year_adopted_identifier: impl Into<String>,
    ) -> Self {
        Self {
            intervention: intervention.into(),
            strategy: strategy.into(),
            yes_no_identifier: yes_no_identifier.into(),
            year_adopted_identifier: year_adopted_identifier.into(),
            valid_from_year: None,
            valid_until_year: None,
            display_order: None,
            interpretation: PolicyInterpretation::YesNo,
        }
    }

    pub fn valid_from(mut self, year: i32) -> Self {
        self.valid_from_year = Some(year);
        self
    }

    pub fn valid_until(mut self, year: i32) -> Self {
        self.valid_until_year = Some(year);
        self
    }

    pub fn ordered(mut self, display_order: i32) -> Self {
        self.display_order = Some(display_order);
        self
    }

    pub fn interpreted_as(mut self, interpretation: PolicyInterpretation) -> Self {
        self.interpretation = interpretation;
        self
    }

    /// Whether the entry applies to `reporting_year`. Both bounds are inclusive.
    pub fn is_valid_for(&self, reporting_year: i32) -> bool {
        self.valid_from_year.map_or(true, |from| reporting_year >= from)
            && self.valid_until_year.map_or(true, |until| reporting_year <= until)
    }

    /// True when both bounds are set and the window is empty.
    pub fn has_inverted_window(&self) -> bool {
        matches!(
            (self.valid_from_year, self.valid_until_year),
            (Some(from), Some(until)) if from > until
        )
    }
}

/// Interpretation of a policy's raw text value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyInterpretation {
    /// `Y` / `Y1` / `N` flags
    #[default]
    YesNo,
    /// Free text shown verbatim; implemented iff the trimmed value is one of `accepted`
    FreeText { accepted: Vec<String> },
}

impl PolicyInterpretation {
    /// Map a raw value to `(label, implemented)`. Total: unknown input is never an error.
    pub fn interpret(&self, raw: &str) -> (String, bool) {
        match self {
            PolicyInterpretation::YesNo => match raw {
                "Y" => ("Yes*".to_string(), true),
                "Y1" => ("Yes".to_string(), true),
                "N" => ("No".to_string(), false),
                _ => (UNRECOGNISED_POLICY_LABEL.to_string(), false),
            },
            PolicyInterpretation::FreeText { accepted } => {
                let trimmed = raw.trim();
                if accepted.iter().any(|a| a == trimmed) {
                    (trimmed.to_string(), true)
                } else {
                    (raw.to_string(), false)
                }
            }
        }
    }
}

/// An interpreted policy row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyResult {
    pub intervention: String,
    pub strategy: String,
    /// Display label ("Yes*", "Yes", "No", "-" or free text)
    pub policy_label: String,
    pub implemented: bool,
    pub year_adopted: Option<i32>,
}
