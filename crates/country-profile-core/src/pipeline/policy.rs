//! Policy resolution against the merged value maps.

use crate::models::{PolicyDefinition, PolicyResult, ValueMaps, DEFAULT_POLICY_VALUE};

/// Filters, orders and interprets the policy catalog for a reporting year.
#[derive(Debug, Clone, Default)]
pub struct PolicyResolver {
    catalog: Vec<PolicyDefinition>,
}

impl PolicyResolver {
    pub fn new(catalog: Vec<PolicyDefinition>) -> Self {
        Self { catalog }
    }

    /// Resolve every entry valid for `reporting_year`.
    ///
    /// Entries are stably sorted by display order; entries without one keep
    /// their catalog order after all ordered entries. A missing yes/no value
    /// reads as `"N"`. The adoption year is reported only when the numeric
    /// value is present and non-zero.
    pub fn resolve(&self, reporting_year: i32, values: &ValueMaps) -> Vec<PolicyResult> {
        let mut applicable: Vec<&PolicyDefinition> = self
            .catalog
            .iter()
            .filter(|p| p.is_valid_for(reporting_year))
            .collect();
        applicable.sort_by_key(|p| (p.display_order.is_none(), p.display_order));

        applicable
            .into_iter()
            .map(|policy| {
                let raw = values.text_or(&policy.yes_no_identifier, DEFAULT_POLICY_VALUE);
                let (policy_label, implemented) = policy.interpretation.interpret(raw);
                let year_adopted = values
                    .numeric(&policy.year_adopted_identifier)
                    .filter(|y| *y != 0.0 && !y.is_nan())
                    .map(|y| y.trunc() as i32);

                PolicyResult {
                    intervention: policy.intervention.clone(),
                    strategy: policy.strategy.clone(),
                    policy_label,
                    implemented,
                    year_adopted,
                }
            })
            .collect()
    }
}
