//! End-to-end profile assembly over in-memory sources.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use country_profile_core::config::SPECIES_OPTION_LIST;
use country_profile_core::ids::*;
use country_profile_core::models::{CaseBreakdown, DisplayMode, MISSING_TEXT};
use country_profile_core::{
    AnalyticsSource, OptionLookup, PipelineError, ProfileAssembler, ProfileConfig, ProfileError,
    ProfileSession, ScopeLookup, StaticSource,
};
use country_profile_remote::{DataPointRow, QueryRequest, ScopeMetadata, SourceResult};

const SCOPE: &str = "ou_khm";
const YEAR: i32 = 2023;

fn khm_source() -> StaticSource {
    let year = YEAR.to_string();
    let row = |id: &str, value: &str| DataPointRow::new(id, SCOPE, year.as_str(), value);

    StaticSource::new()
        .with_scope(SCOPE, "KHM", Some("SEARO"))
        .with_option(SPECIES_OPTION_LIST, "PF", "P. falciparum")
        .with_option(SPECIES_OPTION_LIST, "AN_DIRUS", "An. dirus")
        .with_option(SPECIES_OPTION_LIST, "AN_MINIMUS", "An. minimus")
        .with_rows(vec![
            row(POP_TOTAL, "16000000"),
            row(PAR_FALCIPARUM_PCT, "0.5"),
            row(PAR_VIVAX_PCT, "0"),
            row(PAR_OTHER_PCT, "1.25"),
            row(SPECIES_MAJOR_PARASITE, "PF"),
            row(VECTOR_SPECIES_PRIMARY, "AN_DIRUS"),
            row(VECTOR_SPECIES_SECONDARY, "AN_MINIMUS"),
            row(VECTOR_SPECIES_TERTIARY, ""),
            row(DISPLAY_MODE, "2"),
            row(CASES_CONFIRMED_TOTAL, "9000"),
            row(CASES_INDIGENOUS_TOTAL, "4200"),
            row(CASES_IMPORTED, "35"),
            row(FOOTNOTE_CASES, "Includes private sector"),
            row(EST_CASES, "5100"),
            row(EST_DEATHS, "0"),
            row("POL_IRS_YN", "N"),
            row("POL_SMC_YN", "Y1"),
            row("POL_SMC_YEAR", "2015"),
            row("TES_1_MEDICINE", "AS-MQ"),
            row("TES_1_FOLLOW_UP", "42"),
            row("TES_1_YEARS", "2016-2020"),
            row("TES_1_STUDIES", "4"),
            row("TES_1_MEDIAN", "0.25"),
            row("TES_1_MAX", "1.5"),
            row("RES_PYR_CONFIRMED_PCT", "0.5"),
            row("RES_PYR_YEARS", "2010-2017"),
            row(RDT_TYPE, "Pf/Pv"),
            DataPointRow::new(FUND_DOMESTIC, SCOPE, "2022", "1.5"),
            DataPointRow::new(FUND_DOMESTIC, SCOPE, "2023", "2.25"),
        ])
}

fn assembler(source: StaticSource) -> (ProfileAssembler, Arc<StaticSource>) {
    let source = Arc::new(source);
    let assembler = ProfileAssembler::with_source(Arc::new(ProfileConfig::builtin()), source.clone())
        .expect("builtin config is valid");
    (assembler, source)
}

#[tokio::test]
async fn test_indigenous_profile_for_estimate_exception_country() {
    let (assembler, source) = assembler(khm_source());

    let record = assembler.assemble(SCOPE, YEAR).await.unwrap();

    assert_eq!(record.country_code, "KHM");
    assert_eq!(record.reporting_year, YEAR);
    assert_eq!(record.config_fingerprint, assembler.fingerprint());
    assert!(record.classification.indigenous_estimate_exception);
    assert_eq!(record.display_mode, DisplayMode::Indigenous);

    match &record.cases.breakdown {
        CaseBreakdown::Indigenous { total, imported, .. } => {
            assert_eq!(*total, Some(4200.0));
            assert_eq!(*imported, Some(35.0));
        }
        other => panic!("expected indigenous breakdown, got {:?}", other),
    }
    assert_eq!(record.cases.footnote.as_deref(), Some("Includes private sector"));

    assert!(record.show_estimates);
    let estimates = record.estimates.as_ref().unwrap();
    assert_eq!(estimates.cases, Some(5100.0));
    assert_eq!(estimates.deaths, None);

    let pv = &record.parasites_and_vectors;
    assert_eq!(pv.falciparum_pct, Some(50.0));
    assert_eq!(pv.vivax_pct, None);
    assert_eq!(pv.other_pct, Some(100.0));
    assert_eq!(pv.major_parasite, "P. falciparum");
    assert_eq!(pv.principal_vectors, vec!["An. dirus", "An. minimus", MISSING_TEXT]);

    assert_eq!(record.population.total, Some(16_000_000.0));
    assert_eq!(record.rdt_type, "Pf/Pv");

    // 12 queries: 10 groups plus 2 charts
    assert_eq!(source.calls().queries.len(), 12);
    assert_eq!(source.calls().scope_lookups, vec![SCOPE.to_string()]);
}

#[tokio::test]
async fn test_tables_and_policies() {
    let (assembler, _) = assembler(khm_source());

    let record = assembler.assemble(SCOPE, YEAR).await.unwrap();

    assert_eq!(record.efficacy.len(), 1);
    let tes = &record.efficacy[0];
    assert_eq!(tes.medicine, "AS-MQ");
    assert_eq!(tes.follow_up, "42");
    assert_eq!(tes.years, "2016-2020");
    assert_eq!(tes.studies, Some(4.0));
    assert_eq!(tes.median, Some(25.0));
    assert_eq!(tes.max, Some(100.0));
    // Missing numeric cells are absent, not zero
    assert_eq!(tes.min, None);

    let pyr = &record.resistance[0];
    assert_eq!(pyr.insecticide_class, "Pyrethroids");
    assert_eq!(pyr.confirmed_resistance_pct, Some(50.0));
    assert_eq!(pyr.years, "2010-2017");
    assert_eq!(pyr.vectors, MISSING_TEXT);
    assert_eq!(record.resistance.len(), 4);

    assert!(record.treatment.iter().all(|t| t.medicine == MISSING_TEXT));

    let smc = record
        .policies
        .iter()
        .find(|p| p.strategy.contains("(SMC)"))
        .unwrap();
    assert_eq!(smc.policy_label, "Yes");
    assert!(smc.implemented);
    assert_eq!(smc.year_adopted, Some(2015));

    let irs = record
        .policies
        .iter()
        .find(|p| p.strategy == "IRS is recommended")
        .unwrap();
    assert_eq!(irs.policy_label, "No");
    assert!(!irs.implemented);
}

#[tokio::test]
async fn test_chart_series_cover_trailing_years() {
    let (assembler, _) = assembler(khm_source());

    let record = assembler.assemble(SCOPE, YEAR).await.unwrap();
    let funding = record.charts.iter().find(|c| c.key == "funding").unwrap();

    assert_eq!(funding.periods.first().map(String::as_str), Some("2017"));
    assert_eq!(funding.periods.last().map(String::as_str), Some("2023"));
    let domestic = funding
        .lines
        .iter()
        .find(|l| l.identifier == FUND_DOMESTIC)
        .unwrap();
    assert_eq!(
        domestic.points,
        vec![None, None, None, None, None, Some(1.5), Some(2.25)]
    );
}

#[tokio::test]
async fn test_elimination_target_hides_estimates() {
    let source = StaticSource::new()
        .with_scope("ou_tha", "THA", None)
        .with_row(DISPLAY_MODE, "ou_tha", "2023", "1")
        .with_row(EST_CASES, "ou_tha", "2023", "800");
    let (assembler, _) = assembler(source);

    let record = assembler.assemble("ou_tha", YEAR).await.unwrap();

    assert!(record.classification.elimination_target);
    assert!(!record.show_estimates);
    assert!(record.estimates.is_none());
    assert!(matches!(record.cases.breakdown, CaseBreakdown::Confirmed { .. }));
}

#[tokio::test]
async fn test_scope_lookup_failure_degrades_to_empty_code() {
    let (assembler, _) = assembler(khm_source().fail_scope_lookup());

    let record = assembler.assemble(SCOPE, YEAR).await.unwrap();

    assert_eq!(record.country_code, "");
    assert!(!record.classification.indigenous_estimate_exception);
    // Indigenous mode without the exception
    assert!(!record.show_estimates);
    assert_eq!(record.population.total, Some(16_000_000.0));
}

#[tokio::test]
async fn test_known_country_skips_scope_lookup() {
    let (assembler, source) = assembler(khm_source().fail_scope_lookup());

    let record = assembler.assemble_for_country(SCOPE, YEAR, "KHM").await.unwrap();

    assert_eq!(record.country_code, "KHM");
    assert!(record.show_estimates);
    assert!(source.calls().scope_lookups.is_empty());
}

#[tokio::test]
async fn test_failing_group_fails_profile() {
    let (assembler, _) = assembler(khm_source().fail_on_identifier(RDT_TYPE));

    let result = assembler.assemble(SCOPE, YEAR).await;

    match result {
        Err(ProfileError::Pipeline(PipelineError::Source { group, .. })) => assert_eq!(group, "rdt"),
        other => panic!("expected rdt group failure, got {:?}", other.map(|r| r.build_id)),
    }
}

#[tokio::test]
async fn test_option_cache_is_scoped_to_one_call() {
    let (assembler, source) = assembler(khm_source());

    assembler.assemble(SCOPE, YEAR).await.unwrap();
    assert_eq!(source.calls().option_lookups.len(), 3);

    assembler.assemble(SCOPE, YEAR).await.unwrap();
    assert_eq!(source.calls().option_lookups.len(), 6);
}

#[tokio::test]
async fn test_each_build_gets_a_fresh_id() {
    let (assembler, _) = assembler(khm_source());

    let first = assembler.assemble(SCOPE, YEAR).await.unwrap();
    let second = assembler.assemble(SCOPE, YEAR).await.unwrap();

    assert_ne!(first.build_id, second.build_id);
    assert_eq!(first.policies, second.policies);
}

#[tokio::test]
async fn test_config_loaded_from_file_matches_builtin() {
    let builtin = ProfileConfig::builtin();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(builtin.to_json().unwrap().as_bytes()).unwrap();

    let loaded = ProfileConfig::from_path(file.path()).unwrap();
    assert_eq!(loaded, builtin);
    assert_eq!(loaded.fingerprint().unwrap(), builtin.fingerprint().unwrap());

    let source = Arc::new(khm_source());
    let assembler = ProfileAssembler::with_source(Arc::new(loaded), source).unwrap();
    let record = assembler.assemble(SCOPE, YEAR).await.unwrap();
    assert_eq!(record.country_code, "KHM");
}

/// Delays every analytics query for one scope.
struct DelayedSource {
    inner: StaticSource,
    slow_scope: &'static str,
    delay: Duration,
}

#[async_trait]
impl AnalyticsSource for DelayedSource {
    async fn query(&self, request: &QueryRequest) -> SourceResult<Vec<DataPointRow>> {
        if request.scope == self.slow_scope {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.query(request).await
    }
}

#[async_trait]
impl OptionLookup for DelayedSource {
    async fn resolve_option(&self, list_id: &str, code: &str) -> SourceResult<String> {
        self.inner.resolve_option(list_id, code).await
    }
}

#[async_trait]
impl ScopeLookup for DelayedSource {
    async fn resolve_scope(&self, scope_id: &str) -> SourceResult<ScopeMetadata> {
        self.inner.resolve_scope(scope_id).await
    }
}

#[tokio::test]
async fn test_stale_build_is_superseded() {
    let source = Arc::new(DelayedSource {
        inner: khm_source().with_scope("ou_slow", "LAO", None),
        slow_scope: "ou_slow",
        delay: Duration::from_millis(200),
    });
    let assembler = ProfileAssembler::with_source(Arc::new(ProfileConfig::builtin()), source).unwrap();
    let session = Arc::new(ProfileSession::new(Arc::new(assembler)));

    let slow = {
        let session = session.clone();
        tokio::spawn(async move { session.build("ou_slow", YEAR).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fresh = session.build(SCOPE, YEAR).await.unwrap();
    assert_eq!(fresh.country_code, "KHM");

    let stale = slow.await.unwrap();
    assert!(matches!(stale, Err(ProfileError::Superseded)));
}
