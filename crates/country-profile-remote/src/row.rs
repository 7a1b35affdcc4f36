//! Request and row types exchanged with the analytics source.

use serde::{Deserialize, Serialize};

/// Delimiter used to join identifiers and periods on the wire.
pub const DIMENSION_DELIMITER: &str = ";";

/// One analytics cell, validated at the client boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataPointRow {
    /// Data-point identifier (data element / indicator)
    pub identifier: String,
    /// Organisational scope the value belongs to
    pub scope: String,
    /// Reporting period (e.g. "2024")
    pub period: String,
    /// Raw cell text as returned by the source
    pub raw_value: String,
}

impl DataPointRow {
    /// Create a row from its four fields.
    pub fn new(
        identifier: impl Into<String>,
        scope: impl Into<String>,
        period: impl Into<String>,
        raw_value: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            scope: scope.into(),
            period: period.into(),
            raw_value: raw_value.into(),
        }
    }
}

/// A grouped analytics query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    /// Identifiers fetched in one call
    pub identifiers: Vec<String>,
    /// Organisational scope
    pub scope: String,
    /// A single period or a `;`-joined period set
    pub period: String,
    /// Ask the source to skip its default rounding
    pub precise: bool,
}

impl QueryRequest {
    /// Create a query for a single period with default rounding.
    pub fn new(identifiers: Vec<String>, scope: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            identifiers,
            scope: scope.into(),
            period: period.into(),
            precise: false,
        }
    }

    /// Create a query over several periods.
    pub fn over_periods(identifiers: Vec<String>, scope: impl Into<String>, periods: &[String]) -> Self {
        Self::new(identifiers, scope, periods.join(DIMENSION_DELIMITER))
    }

    /// Request unrounded values.
    pub fn with_precision(mut self, precise: bool) -> Self {
        self.precise = precise;
        self
    }

    /// Identifiers as sent on the wire.
    pub fn identifier_dimension(&self) -> String {
        self.identifiers.join(DIMENSION_DELIMITER)
    }

    /// Individual periods covered by this query.
    pub fn periods(&self) -> impl Iterator<Item = &str> {
        self.period
            .split(DIMENSION_DELIMITER)
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Organisation unit metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScopeMetadata {
    /// Country code of the scope (ISO 3166-1 alpha-3 for country units)
    pub code: String,
    /// Code of the parent unit, if any
    pub parent_code: Option<String>,
}
