//! The assembled country profile.

use serde::{Deserialize, Serialize};

use super::policy::PolicyResult;

/// Placeholder for text fields with no data.
pub const MISSING_TEXT: &str = "-";

/// Display-ready profile for one country and reporting year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryProfileRecord {
    /// Unique ID of the build that produced this record
    pub build_id: String,
    /// Build completion timestamp (RFC 3339)
    pub built_at: String,
    /// SHA-256 of the configuration the numbers were produced with
    pub config_fingerprint: String,
    /// Organisational scope requested
    pub scope_id: String,
    /// Country code of the scope; empty when the lookup failed
    pub country_code: String,
    pub reporting_year: i32,
    pub classification: CountryClassification,
    pub display_mode: DisplayMode,
    pub population: Population,
    pub parasites_and_vectors: ParasitesAndVectors,
    pub cases: CaseFigures,
    /// Present iff `show_estimates`
    pub estimates: Option<Estimates>,
    pub show_estimates: bool,
    /// Policies valid for the reporting year, in display order
    pub policies: Vec<PolicyResult>,
    pub treatment: Vec<TreatmentRow>,
    pub efficacy: Vec<EfficacyRow>,
    pub resistance: Vec<ResistanceRow>,
    /// Free-text RDT type
    pub rdt_type: String,
    pub charts: Vec<ChartSeries>,
}

/// Country-classification flags derived from static country lists.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountryClassification {
    /// Country is on the elimination-target list
    pub elimination_target: bool,
    /// Indigenous display modes still show WHO estimates
    pub indigenous_estimate_exception: bool,
    /// Elimination-target country that still shows WHO estimates
    pub elimination_estimate_exception: bool,
}

impl CountryClassification {
    /// Whether WHO estimates are shown for this country in `mode`.
    pub fn shows_estimates(&self, mode: DisplayMode) -> bool {
        if self.elimination_target {
            self.elimination_estimate_exception
        } else if mode.shows_indigenous_cases() {
            self.indigenous_estimate_exception
        } else {
            true
        }
    }
}

/// Which case breakdown the profile shows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Mode 1: confirmed-case breakdown
    #[default]
    Confirmed,
    /// Mode 2: indigenous-case breakdown
    Indigenous,
    /// Mode 3: indigenous-case breakdown, prevention of re-establishment phase
    PreventionOfReestablishment,
}

impl DisplayMode {
    /// Decode the numeric flag. Absent or unknown values fall back to [`DisplayMode::Confirmed`].
    pub fn from_flag(value: Option<f64>) -> Self {
        match value {
            Some(v) if v == 2.0 => DisplayMode::Indigenous,
            Some(v) if v == 3.0 => DisplayMode::PreventionOfReestablishment,
            _ => DisplayMode::Confirmed,
        }
    }

    pub fn shows_indigenous_cases(&self) -> bool {
        !matches!(self, DisplayMode::Confirmed)
    }
}

/// Population at risk breakdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Population {
    pub total: Option<f64>,
    pub high_transmission: Option<f64>,
    pub low_transmission: Option<f64>,
    pub malaria_free: Option<f64>,
}

/// Parasite shares and vector species.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParasitesAndVectors {
    /// P. falciparum share of cases (percent)
    pub falciparum_pct: Option<f64>,
    /// P. vivax share of cases (percent)
    pub vivax_pct: Option<f64>,
    /// Other species share of cases (percent)
    pub other_pct: Option<f64>,
    /// Display name of the major parasite species
    pub major_parasite: String,
    /// Display names of the principal vectors
    pub principal_vectors: Vec<String>,
}

/// Reported case and death figures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseFigures {
    pub breakdown: CaseBreakdown,
    pub reported_deaths: Option<f64>,
    pub footnote: Option<String>,
}

/// Case breakdown; which variant is populated follows the display mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseBreakdown {
    Confirmed {
        total: Option<f64>,
        falciparum: Option<f64>,
        vivax: Option<f64>,
        presumed: Option<f64>,
    },
    Indigenous {
        total: Option<f64>,
        falciparum: Option<f64>,
        vivax: Option<f64>,
        imported: Option<f64>,
    },
}

/// WHO estimates with uncertainty bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Estimates {
    pub cases: Option<f64>,
    pub cases_lower: Option<f64>,
    pub cases_upper: Option<f64>,
    pub deaths: Option<f64>,
    pub deaths_lower: Option<f64>,
    pub deaths_upper: Option<f64>,
}

/// One line of the treatment regimen table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentRow {
    pub category: String,
    pub medicine: String,
}

/// One line of the therapeutic efficacy table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EfficacyRow {
    pub medicine: String,
    pub follow_up: String,
    /// Study years, e.g. "2016-2020"
    pub years: String,
    pub studies: Option<f64>,
    /// Treatment failure percentages
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
}

/// One line of the insecticide resistance table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResistanceRow {
    pub insecticide_class: String,
    pub sites_monitored: Option<f64>,
    pub confirmed_resistance_pct: Option<f64>,
    pub vectors: String,
    pub years: String,
}

/// A multi-year chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSeries {
    pub key: String,
    pub title: String,
    /// X axis, oldest first
    pub periods: Vec<String>,
    pub lines: Vec<SeriesLine>,
}

/// One line of a chart, aligned to the chart's periods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesLine {
    pub identifier: String,
    pub label: String,
    pub points: Vec<Option<f64>>,
}
