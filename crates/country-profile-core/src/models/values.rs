//! Merged lookup structures produced by the aggregation step.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Numeric and text values for one (scope, period) request.
///
/// A numeric entry of `None` means the value was transformed to null, which
/// is different from the identifier being absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValueMaps {
    numeric: HashMap<String, Option<f64>>,
    text: HashMap<String, String>,
}

impl ValueMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a numeric value, overwriting any earlier one.
    pub fn insert_numeric(&mut self, identifier: impl Into<String>, value: Option<f64>) {
        self.numeric.insert(identifier.into(), value);
    }

    /// Store a text value verbatim, overwriting any earlier one.
    pub fn insert_text(&mut self, identifier: impl Into<String>, value: impl Into<String>) {
        self.text.insert(identifier.into(), value.into());
    }

    /// Numeric value, with absent and null both reported as `None`.
    pub fn numeric(&self, identifier: &str) -> Option<f64> {
        self.numeric.get(identifier).copied().flatten()
    }

    /// Raw numeric entry: `None` if absent, `Some(None)` if stored as null.
    pub fn numeric_entry(&self, identifier: &str) -> Option<Option<f64>> {
        self.numeric.get(identifier).copied()
    }

    pub fn text(&self, identifier: &str) -> Option<&str> {
        self.text.get(identifier).map(String::as_str)
    }

    /// Text value or `default` when absent.
    pub fn text_or<'a>(&'a self, identifier: &str, default: &'a str) -> &'a str {
        self.text(identifier).unwrap_or(default)
    }

    pub fn numeric_len(&self) -> usize {
        self.numeric.len()
    }

    pub fn text_len(&self) -> usize {
        self.text.len()
    }
}

/// Numeric values per identifier and period, for multi-year charts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeriesMaps {
    values: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

impl SeriesMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, period: impl Into<String>, value: Option<f64>) {
        self.values
            .entry(identifier.into())
            .or_default()
            .insert(period.into(), value);
    }

    /// Value for one identifier and period; absent and null are both `None`.
    pub fn get(&self, identifier: &str, period: &str) -> Option<f64> {
        self.values
            .get(identifier)
            .and_then(|periods| periods.get(period))
            .copied()
            .flatten()
    }

    /// Values of `identifier` aligned to `periods`.
    pub fn points(&self, identifier: &str, periods: &[String]) -> Vec<Option<f64>> {
        periods.iter().map(|p| self.get(identifier, p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_distinct_from_absent() {
        let mut maps = ValueMaps::new();
        maps.insert_numeric("EST_CASES", None);

        assert_eq!(maps.numeric("EST_CASES"), None);
        assert_eq!(maps.numeric_entry("EST_CASES"), Some(None));
        assert_eq!(maps.numeric_entry("EST_DEATHS"), None);
    }

    #[test]
    fn test_later_insert_overwrites() {
        let mut maps = ValueMaps::new();
        maps.insert_text("RDT_TYPE", "Pf only");
        maps.insert_text("RDT_TYPE", "Pf/Pan");
        maps.insert_numeric("POP_TOTAL", Some(1.0));
        maps.insert_numeric("POP_TOTAL", Some(2.0));

        assert_eq!(maps.text("RDT_TYPE"), Some("Pf/Pan"));
        assert_eq!(maps.numeric("POP_TOTAL"), Some(2.0));
        assert_eq!(maps.text_or("FOOTNOTE_CASES", "-"), "-");
    }

    #[test]
    fn test_series_points_align_to_periods() {
        let mut series = SeriesMaps::new();
        series.insert("FUND_DOMESTIC", "2022", Some(1.25));
        series.insert("FUND_DOMESTIC", "2024", Some(3.5));

        let periods: Vec<String> = ["2022", "2023", "2024"].iter().map(|p| p.to_string()).collect();
        assert_eq!(series.points("FUND_DOMESTIC", &periods), vec![Some(1.25), None, Some(3.5)]);
        assert_eq!(series.points("FUND_OTHER", &periods), vec![None, None, None]);
    }
}
