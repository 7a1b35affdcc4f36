//! Aggregation merge step.
//!
//! Issues one query per group concurrently, then folds every row, group by
//! group in declaration order, into [`ValueMaps`]. Text rows are stored
//! verbatim; numeric rows are parsed and run through the transformation
//! engine.

use std::collections::HashMap;

use country_profile_remote::{AnalyticsSource, DataPointRow, QueryRequest};
use futures::future::try_join_all;

use crate::config::{DuplicatePolicy, ProfileConfig, QueryGroup};
use crate::models::{SeriesMaps, ValueMaps};

use super::{PipelineError, PipelineResult, TransformationEngine, ValueClassifier, ValueKind};

/// Number substituted for empty or unparsable numeric cells.
///
/// Combined with `NullZeros` this makes "no data" and "reported zero"
/// indistinguishable downstream. That conflation is accepted.
pub const UNPARSABLE_NUMERIC_FILL: f64 = 0.0;

/// Result of parsing a raw numeric cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawNumber {
    Parsed(f64),
    Unparsable,
}

impl RawNumber {
    /// Parse a raw cell. Empty, non-numeric and non-finite cells are unparsable.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => RawNumber::Parsed(v),
            _ => RawNumber::Unparsable,
        }
    }

    /// The parsed value, or [`UNPARSABLE_NUMERIC_FILL`].
    pub fn or_fill(self) -> f64 {
        match self {
            RawNumber::Parsed(v) => v,
            RawNumber::Unparsable => UNPARSABLE_NUMERIC_FILL,
        }
    }
}

/// Find the first identifier declared in more than one group.
///
/// Returns `(identifier, first_group, second_group)`.
pub fn find_duplicate_identifier(groups: &[QueryGroup]) -> Option<(String, String, String)> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for group in groups {
        for identifier in &group.identifiers {
            if let Some(first) = seen.insert(identifier.as_str(), group.name.as_str()) {
                if first != group.name {
                    return Some((identifier.clone(), first.to_string(), group.name.clone()));
                }
            }
        }
    }
    None
}

/// Merges grouped query results into typed lookup maps.
#[derive(Debug, Clone)]
pub struct Aggregator {
    classifier: ValueClassifier,
    engine: TransformationEngine,
    duplicate_policy: DuplicatePolicy,
}

impl Aggregator {
    pub fn new(
        classifier: ValueClassifier,
        engine: TransformationEngine,
        duplicate_policy: DuplicatePolicy,
    ) -> Self {
        Self {
            classifier,
            engine,
            duplicate_policy,
        }
    }

    pub fn from_config(config: &ProfileConfig) -> Self {
        Self::new(config.classifier(), config.engine(), config.duplicate_policy)
    }

    /// Fetch every group for one scope and period and merge the rows.
    ///
    /// Any failing group fails the whole build.
    pub async fn build(
        &self,
        source: &dyn AnalyticsSource,
        groups: &[QueryGroup],
        scope: &str,
        period: &str,
    ) -> PipelineResult<ValueMaps> {
        self.check_duplicates(groups)?;

        let responses = self.fetch_all(source, groups, scope, period).await?;
        let maps = self.merge_rows(responses.iter().flatten());

        tracing::debug!(
            groups = groups.len(),
            numeric = maps.numeric_len(),
            text = maps.text_len(),
            "merged value maps"
        );
        Ok(maps)
    }

    /// Fetch multi-year series: one query per group over the `;`-joined periods.
    pub async fn build_series(
        &self,
        source: &dyn AnalyticsSource,
        groups: &[QueryGroup],
        scope: &str,
        periods: &[String],
    ) -> PipelineResult<SeriesMaps> {
        self.check_duplicates(groups)?;

        let period = periods.join(country_profile_remote::row::DIMENSION_DELIMITER);
        let responses = self.fetch_all(source, groups, scope, &period).await?;

        let mut series = SeriesMaps::new();
        for row in responses.iter().flatten() {
            if self.classifier.classify(&row.identifier) == ValueKind::Text {
                tracing::trace!(identifier = %row.identifier, "skipping text row in series");
                continue;
            }
            series.insert(row.identifier.clone(), row.period.clone(), self.numeric_value(row));
        }
        Ok(series)
    }

    /// Fold rows into maps in iteration order; later rows overwrite earlier ones.
    pub fn merge_rows<'a, I>(&self, rows: I) -> ValueMaps
    where
        I: IntoIterator<Item = &'a DataPointRow>,
    {
        let mut maps = ValueMaps::new();
        for row in rows {
            match self.classifier.classify(&row.identifier) {
                ValueKind::Text => maps.insert_text(row.identifier.clone(), row.raw_value.clone()),
                ValueKind::Numeric => maps.insert_numeric(row.identifier.clone(), self.numeric_value(row)),
            }
        }
        maps
    }

    /// Parse and transform a numeric row.
    fn numeric_value(&self, row: &DataPointRow) -> Option<f64> {
        let parsed = RawNumber::parse(&row.raw_value);
        if parsed == RawNumber::Unparsable {
            tracing::trace!(
                identifier = %row.identifier,
                period = %row.period,
                "unparsable numeric value, using fill"
            );
        }
        self.engine.apply(&row.identifier, Some(parsed.or_fill()))
    }

    fn check_duplicates(&self, groups: &[QueryGroup]) -> PipelineResult<()> {
        if let Some((identifier, first_group, second_group)) = find_duplicate_identifier(groups) {
            match self.duplicate_policy {
                DuplicatePolicy::Reject => {
                    return Err(PipelineError::DuplicateIdentifier {
                        identifier,
                        first_group,
                        second_group,
                    })
                }
                DuplicatePolicy::LastWriteWins => {
                    tracing::debug!(
                        identifier = %identifier,
                        first_group = %first_group,
                        second_group = %second_group,
                        "duplicate identifier, last group wins"
                    );
                }
            }
        }
        Ok(())
    }

    async fn fetch_all(
        &self,
        source: &dyn AnalyticsSource,
        groups: &[QueryGroup],
        scope: &str,
        period: &str,
    ) -> PipelineResult<Vec<Vec<DataPointRow>>> {
        let queries = groups.iter().map(|group| {
            let request = QueryRequest::new(group.identifiers.clone(), scope, period)
                .with_precision(group.precise);
            async move {
                tracing::debug!(
                    group = %group.name,
                    identifiers = request.identifiers.len(),
                    period = %request.period,
                    "querying group"
                );
                source
                    .query(&request)
                    .await
                    .map_err(|source| PipelineError::Source {
                        group: group.name.clone(),
                        source,
                    })
            }
        });

        try_join_all(queries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TransformRule;
    use country_profile_remote::StaticSource;
    use std::collections::{BTreeMap, BTreeSet};

    fn aggregator(text: &[&str], rules: &[(&str, Vec<TransformRule>)], policy: DuplicatePolicy) -> Aggregator {
        let text: BTreeSet<String> = text.iter().map(|s| s.to_string()).collect();
        let rules: BTreeMap<String, Vec<TransformRule>> = rules
            .iter()
            .map(|(id, r)| (id.to_string(), r.clone()))
            .collect();
        Aggregator::new(
            ValueClassifier::new(&text),
            TransformationEngine::new(&rules),
            policy,
        )
    }

    #[test]
    fn test_raw_number_parse() {
        assert_eq!(RawNumber::parse("0.5"), RawNumber::Parsed(0.5));
        assert_eq!(RawNumber::parse(" 12 "), RawNumber::Parsed(12.0));
        assert_eq!(RawNumber::parse(""), RawNumber::Unparsable);
        assert_eq!(RawNumber::parse("2016-2020"), RawNumber::Unparsable);
        assert_eq!(RawNumber::parse("NaN"), RawNumber::Unparsable);
        assert_eq!(RawNumber::Unparsable.or_fill(), UNPARSABLE_NUMERIC_FILL);
    }

    #[tokio::test]
    async fn test_multiply_by_100_end_to_end() {
        let source = StaticSource::new().with_row("X1", "ou1", "2024", "0.5");
        let agg = aggregator(&[], &[("X1", vec![TransformRule::MultiplyBy100])], DuplicatePolicy::Reject);

        let maps = agg
            .build(&source, &[QueryGroup::new("g", &["X1"])], "ou1", "2024")
            .await
            .unwrap();

        assert_eq!(maps.numeric("X1"), Some(50.0));
    }

    #[tokio::test]
    async fn test_text_values_are_stored_verbatim() {
        let source = StaticSource::new()
            .with_row("TES_1_YEARS", "ou1", "2024", "2016-2020")
            .with_row("RDT_TYPE", "ou1", "2024", "  Pf/Pan ");
        let agg = aggregator(&["TES_1_YEARS", "RDT_TYPE"], &[], DuplicatePolicy::Reject);

        let maps = agg
            .build(&source, &[QueryGroup::new("g", &["TES_1_YEARS", "RDT_TYPE"])], "ou1", "2024")
            .await
            .unwrap();

        assert_eq!(maps.text("TES_1_YEARS"), Some("2016-2020"));
        assert_eq!(maps.text("RDT_TYPE"), Some("  Pf/Pan "));
        assert_eq!(maps.numeric_entry("TES_1_YEARS"), None);
    }

    #[tokio::test]
    async fn test_empty_value_is_filled_then_transformed() {
        let source = StaticSource::new()
            .with_row("EST_CASES", "ou1", "2024", "")
            .with_row("POP_TOTAL", "ou1", "2024", "n/a");
        let agg = aggregator(&[], &[("EST_CASES", vec![TransformRule::NullZeros])], DuplicatePolicy::Reject);

        let maps = agg
            .build(&source, &[QueryGroup::new("g", &["EST_CASES", "POP_TOTAL"])], "ou1", "2024")
            .await
            .unwrap();

        // Null stored, not absent
        assert_eq!(maps.numeric_entry("EST_CASES"), Some(None));
        assert_eq!(maps.numeric("POP_TOTAL"), Some(0.0));
    }

    #[tokio::test]
    async fn test_grouping_does_not_affect_result() {
        let source = StaticSource::new()
            .with_row("A", "ou1", "2024", "1")
            .with_row("B", "ou1", "2024", "0.2")
            .with_row("C", "ou1", "2024", "Y1")
            .with_row("D", "ou1", "2024", "0");
        let agg = aggregator(
            &["C"],
            &[("B", vec![TransformRule::MultiplyBy100]), ("D", vec![TransformRule::NullZeros])],
            DuplicatePolicy::Reject,
        );

        let single = agg
            .build(&source, &[QueryGroup::new("all", &["A", "B", "C", "D"])], "ou1", "2024")
            .await
            .unwrap();
        let split = agg
            .build(
                &source,
                &[
                    QueryGroup::new("g1", &["D"]),
                    QueryGroup::new("g2", &["C", "A"]),
                    QueryGroup::new("g3", &["B"]),
                ],
                "ou1",
                "2024",
            )
            .await
            .unwrap();

        assert_eq!(single, split);
        assert_eq!(source.calls().queries.len(), 4);
    }

    #[tokio::test]
    async fn test_failing_group_fails_build() {
        let source = StaticSource::new()
            .with_row("A", "ou1", "2024", "1")
            .fail_on_identifier("B");
        let agg = aggregator(&[], &[], DuplicatePolicy::Reject);

        let result = agg
            .build(
                &source,
                &[QueryGroup::new("ok", &["A"]), QueryGroup::new("broken", &["B"])],
                "ou1",
                "2024",
            )
            .await;

        match result {
            Err(PipelineError::Source { group, .. }) => assert_eq!(group, "broken"),
            other => panic!("expected source error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_identifier_rejected_before_querying() {
        let source = StaticSource::new().with_row("A", "ou1", "2024", "1");
        let agg = aggregator(&[], &[], DuplicatePolicy::Reject);
        let groups = [QueryGroup::new("g1", &["A"]), QueryGroup::new("g2", &["A"])];

        let result = agg.build(&source, &groups, "ou1", "2024").await;

        assert!(matches!(result, Err(PipelineError::DuplicateIdentifier { .. })));
        assert!(source.calls().queries.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_identifier_allowed_with_last_write_wins() {
        let source = StaticSource::new().with_row("A", "ou1", "2024", "1");
        let agg = aggregator(&[], &[], DuplicatePolicy::LastWriteWins);
        let groups = [QueryGroup::new("g1", &["A"]), QueryGroup::new("g2", &["A"])];

        let maps = agg.build(&source, &groups, "ou1", "2024").await.unwrap();
        assert_eq!(maps.numeric("A"), Some(1.0));
    }

    #[test]
    fn test_merge_rows_last_row_wins() {
        let agg = aggregator(&["T"], &[], DuplicatePolicy::Reject);
        let rows = vec![
            DataPointRow::new("N", "ou1", "2024", "1"),
            DataPointRow::new("T", "ou1", "2024", "first"),
            DataPointRow::new("N", "ou1", "2024", "2"),
            DataPointRow::new("T", "ou1", "2024", "second"),
        ];

        let maps = agg.merge_rows(&rows);
        assert_eq!(maps.numeric("N"), Some(2.0));
        assert_eq!(maps.text("T"), Some("second"));
    }

    #[test]
    fn test_find_duplicate_identifier() {
        let groups = [
            QueryGroup::new("a", &["X", "Y"]),
            QueryGroup::new("b", &["Z", "Y"]),
        ];
        assert_eq!(
            find_duplicate_identifier(&groups),
            Some(("Y".to_string(), "a".to_string(), "b".to_string()))
        );
        assert_eq!(find_duplicate_identifier(&groups[..1]), None);
    }

    #[tokio::test]
    async fn test_build_series_keeps_periods_and_precision() {
        let source = StaticSource::new()
            .with_row("FUND_DOMESTIC", "ou1", "2023", "1.234567")
            .with_row("FUND_DOMESTIC", "ou1", "2024", "2.5")
            .with_row("FUND_NOTE", "ou1", "2024", "estimated");
        let agg = aggregator(&["FUND_NOTE"], &[], DuplicatePolicy::Reject);
        let periods = vec!["2023".to_string(), "2024".to_string()];

        let series = agg
            .build_series(
                &source,
                &[QueryGroup::new("funding", &["FUND_DOMESTIC", "FUND_NOTE"]).precise()],
                "ou1",
                &periods,
            )
            .await
            .unwrap();

        assert_eq!(series.points("FUND_DOMESTIC", &periods), vec![Some(1.234567), Some(2.5)]);
        assert_eq!(series.get("FUND_NOTE", "2024"), None);

        let calls = source.calls();
        assert_eq!(calls.queries.len(), 1);
        assert_eq!(calls.queries[0].period, "2023;2024");
        assert!(calls.queries[0].precise);
    }
}
