//! Profile assembly.
//!
//! One [`ProfileAssembler::assemble`] call is one logical workflow for a
//! (country, year) pair:
//!
//! ```text
//!   ┌── scope lookup ──────────┐
//!   ├── aggregation (groups) ──┼──▶ classification ─▶ species names ─▶ record
//!   └── chart series ──────────┘          │
//!                                 policy resolution
//! ```
//!
//! The three branches run concurrently. Only the scope lookup may fail
//! without failing the build.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use country_profile_remote::{AnalyticsSource, OptionLookup, ScopeLookup, UNKNOWN_OPTION};
use futures::future::try_join_all;
use uuid::Uuid;

use crate::config::{ChartDefinition, ProfileConfig};
use crate::ids;
use crate::models::{
    CaseBreakdown, CaseFigures, ChartSeries, CountryProfileRecord, DisplayMode, EfficacyRow,
    Estimates, ParasitesAndVectors, Population, ResistanceRow, SeriesLine, TreatmentRow,
    ValueMaps, MISSING_TEXT,
};

use super::{Aggregator, PolicyResolver, ProfileError, ProfileResult};

/// Builds [`CountryProfileRecord`]s from remote analytics.
pub struct ProfileAssembler {
    config: Arc<ProfileConfig>,
    aggregator: Aggregator,
    resolver: PolicyResolver,
    analytics: Arc<dyn AnalyticsSource>,
    options: Arc<dyn OptionLookup>,
    scopes: Arc<dyn ScopeLookup>,
    fingerprint: String,
}

impl std::fmt::Debug for ProfileAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileAssembler")
            .field("fingerprint", &self.fingerprint)
            .field("groups", &self.config.groups.len())
            .field("policies", &self.config.policies.len())
            .finish()
    }
}

impl ProfileAssembler {
    /// Create an assembler over separate collaborators. The configuration is validated.
    pub fn new(
        config: Arc<ProfileConfig>,
        analytics: Arc<dyn AnalyticsSource>,
        options: Arc<dyn OptionLookup>,
        scopes: Arc<dyn ScopeLookup>,
    ) -> ProfileResult<Self> {
        config.validate()?;
        let fingerprint = config.fingerprint()?;

        Ok(Self {
            aggregator: Aggregator::from_config(&config),
            resolver: PolicyResolver::new(config.policies.clone()),
            config,
            analytics,
            options,
            scopes,
            fingerprint,
        })
    }

    /// Create an assembler over one source implementing all three lookups.
    pub fn with_source<S>(config: Arc<ProfileConfig>, source: Arc<S>) -> ProfileResult<Self>
    where
        S: AnalyticsSource + OptionLookup + ScopeLookup + 'static,
    {
        Self::new(config, source.clone(), source.clone(), source)
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Fingerprint of the configuration every record is built with.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Build the profile for `scope_id` and `reporting_year`.
    ///
    /// The country code is looked up concurrently; a failed lookup is logged
    /// and leaves the code empty, which matches no country list.
    #[tracing::instrument(skip(self), fields(fingerprint = %self.fingerprint))]
    pub async fn assemble(
        &self,
        scope_id: &str,
        reporting_year: i32,
    ) -> ProfileResult<CountryProfileRecord> {
        let (country_code, values, charts) = tokio::join!(
            self.country_code(scope_id),
            self.aggregate(scope_id, reporting_year),
            self.build_charts(scope_id, reporting_year),
        );
        self.finish(scope_id, reporting_year, country_code, values?, charts?)
            .await
    }

    /// Build the profile with a known country code, skipping the scope lookup.
    #[tracing::instrument(skip(self), fields(fingerprint = %self.fingerprint))]
    pub async fn assemble_for_country(
        &self,
        scope_id: &str,
        reporting_year: i32,
        country_code: &str,
    ) -> ProfileResult<CountryProfileRecord> {
        let (values, charts) = tokio::join!(
            self.aggregate(scope_id, reporting_year),
            self.build_charts(scope_id, reporting_year),
        );
        self.finish(scope_id, reporting_year, country_code.to_string(), values?, charts?)
            .await
    }

    async fn country_code(&self, scope_id: &str) -> String {
        match self.scopes.resolve_scope(scope_id).await {
            Ok(metadata) => metadata.code,
            Err(e) => {
                tracing::warn!(scope = %scope_id, error = %e, "scope lookup failed, continuing without country code");
                String::new()
            }
        }
    }

    async fn aggregate(&self, scope_id: &str, reporting_year: i32) -> ProfileResult<ValueMaps> {
        let period = reporting_year.to_string();
        Ok(self
            .aggregator
            .build(self.analytics.as_ref(), &self.config.groups, scope_id, &period)
            .await?)
    }

    async fn build_charts(&self, scope_id: &str, reporting_year: i32) -> ProfileResult<Vec<ChartSeries>> {
        let charts = self
            .config
            .charts
            .iter()
            .map(|chart| self.build_chart(chart, scope_id, reporting_year));
        try_join_all(charts).await
    }

    async fn build_chart(
        &self,
        chart: &ChartDefinition,
        scope_id: &str,
        reporting_year: i32,
    ) -> ProfileResult<ChartSeries> {
        let periods = chart.periods(reporting_year);
        let series = self
            .aggregator
            .build_series(self.analytics.as_ref(), &[chart.query_group()], scope_id, &periods)
            .await?;

        let lines = chart
            .lines
            .iter()
            .map(|line| SeriesLine {
                identifier: line.identifier.clone(),
                label: line.label.clone(),
                points: series.points(&line.identifier, &periods),
            })
            .collect();

        Ok(ChartSeries {
            key: chart.key.clone(),
            title: chart.title.clone(),
            periods,
            lines,
        })
    }

    async fn finish(
        &self,
        scope_id: &str,
        reporting_year: i32,
        country_code: String,
        values: ValueMaps,
        charts: Vec<ChartSeries>,
    ) -> ProfileResult<CountryProfileRecord> {
        let classification = self.config.classify_country(&country_code);
        let display_mode = DisplayMode::from_flag(values.numeric(ids::DISPLAY_MODE));
        let show_estimates = classification.shows_estimates(display_mode);

        let parasites_and_vectors = self.parasites_and_vectors(&values).await?;
        let policies = self.resolver.resolve(reporting_year, &values);

        let record = CountryProfileRecord {
            build_id: Uuid::new_v4().to_string(),
            built_at: Utc::now().to_rfc3339(),
            config_fingerprint: self.fingerprint.clone(),
            scope_id: scope_id.to_string(),
            country_code,
            reporting_year,
            classification,
            display_mode,
            population: population(&values),
            parasites_and_vectors,
            cases: case_figures(&values, display_mode),
            estimates: show_estimates.then(|| estimates(&values)),
            show_estimates,
            policies,
            treatment: self.treatment_rows(&values),
            efficacy: self.efficacy_rows(&values),
            resistance: self.resistance_rows(&values),
            rdt_type: text_or_missing(&values, ids::RDT_TYPE),
            charts,
        };

        tracing::info!(
            build_id = %record.build_id,
            country = %record.country_code,
            display_mode = ?record.display_mode,
            policies = record.policies.len(),
            show_estimates = record.show_estimates,
            "profile assembled"
        );
        Ok(record)
    }

    async fn parasites_and_vectors(&self, values: &ValueMaps) -> ProfileResult<ParasitesAndVectors> {
        let species = &self.config.species;
        let parasite_code = values.text_or(&species.parasite, "");
        let vector_codes: Vec<&str> = species
            .vectors
            .iter()
            .map(|id| values.text_or(id, ""))
            .collect();

        let mut cache = OptionCache::new(self.options.as_ref(), &species.list_id);
        cache
            .prefetch(std::iter::once(parasite_code).chain(vector_codes.iter().copied()))
            .await?;

        Ok(ParasitesAndVectors {
            falciparum_pct: values.numeric(ids::PAR_FALCIPARUM_PCT),
            vivax_pct: values.numeric(ids::PAR_VIVAX_PCT),
            other_pct: values.numeric(ids::PAR_OTHER_PCT),
            major_parasite: cache.name(parasite_code),
            principal_vectors: vector_codes.iter().map(|code| cache.name(code)).collect(),
        })
    }

    fn treatment_rows(&self, values: &ValueMaps) -> Vec<TreatmentRow> {
        self.config
            .treatment
            .iter()
            .map(|slot| TreatmentRow {
                category: slot.category.clone(),
                medicine: text_or_missing(values, &slot.medicine),
            })
            .collect()
    }

    /// Slots without a reported medicine are left out.
    fn efficacy_rows(&self, values: &ValueMaps) -> Vec<EfficacyRow> {
        self.config
            .efficacy
            .iter()
            .filter(|slot| !values.text_or(&slot.medicine, "").trim().is_empty())
            .map(|slot| EfficacyRow {
                medicine: text_or_missing(values, &slot.medicine),
                follow_up: text_or_missing(values, &slot.follow_up),
                years: text_or_missing(values, &slot.years),
                studies: values.numeric(&slot.studies),
                min: values.numeric(&slot.min),
                median: values.numeric(&slot.median),
                max: values.numeric(&slot.max),
            })
            .collect()
    }

    fn resistance_rows(&self, values: &ValueMaps) -> Vec<ResistanceRow> {
        self.config
            .resistance
            .iter()
            .map(|slot| ResistanceRow {
                insecticide_class: slot.insecticide_class.clone(),
                sites_monitored: values.numeric(&slot.sites_monitored),
                confirmed_resistance_pct: values.numeric(&slot.confirmed_pct),
                vectors: text_or_missing(values, &slot.vectors),
                years: text_or_missing(values, &slot.years),
            })
            .collect()
    }
}

fn text_or_missing(values: &ValueMaps, identifier: &str) -> String {
    match values.text(identifier).map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => MISSING_TEXT.to_string(),
    }
}

fn population(values: &ValueMaps) -> Population {
    Population {
        total: values.numeric(ids::POP_TOTAL),
        high_transmission: values.numeric(ids::POP_HIGH_TRANSMISSION),
        low_transmission: values.numeric(ids::POP_LOW_TRANSMISSION),
        malaria_free: values.numeric(ids::POP_MALARIA_FREE),
    }
}

fn case_figures(values: &ValueMaps, mode: DisplayMode) -> CaseFigures {
    let breakdown = if mode.shows_indigenous_cases() {
        CaseBreakdown::Indigenous {
            total: values.numeric(ids::CASES_INDIGENOUS_TOTAL),
            falciparum: values.numeric(ids::CASES_INDIGENOUS_FALCIPARUM),
            vivax: values.numeric(ids::CASES_INDIGENOUS_VIVAX),
            imported: values.numeric(ids::CASES_IMPORTED),
        }
    } else {
        CaseBreakdown::Confirmed {
            total: values.numeric(ids::CASES_CONFIRMED_TOTAL),
            falciparum: values.numeric(ids::CASES_CONFIRMED_FALCIPARUM),
            vivax: values.numeric(ids::CASES_CONFIRMED_VIVAX),
            presumed: values.numeric(ids::CASES_PRESUMED),
        }
    };

    CaseFigures {
        breakdown,
        reported_deaths: values.numeric(ids::DEATHS_REPORTED),
        footnote: values
            .text(ids::FOOTNOTE_CASES)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}

fn estimates(values: &ValueMaps) -> Estimates {
    Estimates {
        cases: values.numeric(ids::EST_CASES),
        cases_lower: values.numeric(ids::EST_CASES_LOWER),
        cases_upper: values.numeric(ids::EST_CASES_UPPER),
        deaths: values.numeric(ids::EST_DEATHS),
        deaths_lower: values.numeric(ids::EST_DEATHS_LOWER),
        deaths_upper: values.numeric(ids::EST_DEATHS_UPPER),
    }
}

/// Option names resolved within one assemble call.
struct OptionCache<'a> {
    lookup: &'a dyn OptionLookup,
    list_id: &'a str,
    names: HashMap<String, String>,
}

impl<'a> OptionCache<'a> {
    fn new(lookup: &'a dyn OptionLookup, list_id: &'a str) -> Self {
        Self {
            lookup,
            list_id,
            names: HashMap::new(),
        }
    }

    /// Resolve each distinct non-empty code once, concurrently.
    async fn prefetch<'c, I>(&mut self, codes: I) -> ProfileResult<()>
    where
        I: IntoIterator<Item = &'c str>,
    {
        let pending: BTreeSet<&str> = codes
            .into_iter()
            .filter(|code| !code.is_empty() && !self.names.contains_key(*code))
            .collect();

        let lookup = self.lookup;
        let list_id = self.list_id;
        let resolved = try_join_all(pending.into_iter().map(|code| async move {
            lookup
                .resolve_option(list_id, code)
                .await
                .map(|name| (code.to_string(), name))
                .map_err(|source| ProfileError::OptionLookup {
                    list_id: list_id.to_string(),
                    code: code.to_string(),
                    source,
                })
        }))
        .await?;

        self.names.extend(resolved);
        Ok(())
    }

    fn name(&self, code: &str) -> String {
        self.names
            .get(code)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_OPTION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use country_profile_remote::StaticSource;

    #[tokio::test]
    async fn test_option_cache_skips_empty_and_repeated_codes() {
        let source = StaticSource::new()
            .with_option("L", "AN_GAM", "An. gambiae")
            .with_option("L", "PF", "P. falciparum");
        let mut cache = OptionCache::new(&source, "L");

        cache
            .prefetch(["PF", "", "AN_GAM", "PF", "AN_GAM", "UNKNOWN"])
            .await
            .unwrap();

        assert_eq!(cache.name("PF"), "P. falciparum");
        assert_eq!(cache.name("AN_GAM"), "An. gambiae");
        assert_eq!(cache.name("UNKNOWN"), "-");
        assert_eq!(cache.name(""), "-");
        assert_eq!(source.calls().option_lookups.len(), 3);
    }

    #[test]
    fn test_text_or_missing() {
        let mut values = ValueMaps::new();
        values.insert_text("A", "  ACT ");
        values.insert_text("B", "   ");

        assert_eq!(text_or_missing(&values, "A"), "ACT");
        assert_eq!(text_or_missing(&values, "B"), MISSING_TEXT);
        assert_eq!(text_or_missing(&values, "C"), MISSING_TEXT);
    }

    #[test]
    fn test_case_figures_follow_display_mode() {
        let mut values = ValueMaps::new();
        values.insert_numeric(ids::CASES_CONFIRMED_TOTAL, Some(100.0));
        values.insert_numeric(ids::CASES_INDIGENOUS_TOTAL, Some(4.0));
        values.insert_text(ids::FOOTNOTE_CASES, "");

        let confirmed = case_figures(&values, DisplayMode::Confirmed);
        assert!(matches!(confirmed.breakdown, CaseBreakdown::Confirmed { total: Some(t), .. } if t == 100.0));
        assert_eq!(confirmed.footnote, None);

        let indigenous = case_figures(&values, DisplayMode::PreventionOfReestablishment);
        assert!(matches!(indigenous.breakdown, CaseBreakdown::Indigenous { total: Some(t), .. } if t == 4.0));
    }
}
