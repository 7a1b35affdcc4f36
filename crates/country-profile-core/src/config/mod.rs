//! Immutable pipeline configuration.
//!
//! Classification sets, transformation rules, the policy catalog, country
//! lists and query groups are plain data. A [`ProfileConfig`] is loaded once
//! (built in or from JSON) and handed to the pipeline components explicitly,
//! so tests can supply isolated fixtures.

mod builtin;

pub use builtin::{MONOTHERAPY_ACCEPTED, SPECIES_OPTION_LIST};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::ids;
use crate::models::{CountryClassification, PolicyDefinition};
use crate::pipeline::{find_duplicate_identifier, TransformRule, TransformationEngine, ValueClassifier};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything the pipeline needs to know about data points and how to present them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileConfig {
    /// Identifiers whose raw values are kept as text
    pub text_identifiers: BTreeSet<String>,
    /// Transformation chains per identifier
    #[serde(default)]
    pub transforms: BTreeMap<String, Vec<TransformRule>>,
    /// Query groups fetched for the reporting year
    pub groups: Vec<QueryGroup>,
    /// Policy catalog in declaration order
    pub policies: Vec<PolicyDefinition>,
    pub countries: CountryLists,
    pub species: SpeciesLookup,
    pub treatment: Vec<TreatmentSlot>,
    pub efficacy: Vec<EfficacySlot>,
    pub resistance: Vec<ResistanceSlot>,
    #[serde(default)]
    pub charts: Vec<ChartDefinition>,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

/// Identifiers fetched in one remote call. Groups only exist to keep
/// requests under the server's query-length limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryGroup {
    pub name: String,
    pub identifiers: Vec<String>,
    /// Ask the server to skip rounding
    #[serde(default)]
    pub precise: bool,
}

impl QueryGroup {
    pub fn new(name: impl Into<String>, identifiers: &[&str]) -> Self {
        Self {
            name: name.into(),
            identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
            precise: false,
        }
    }

    pub fn precise(mut self) -> Self {
        self.precise = true;
        self
    }
}

/// What to do when the same identifier appears in more than one group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the build before any query is issued
    #[default]
    Reject,
    /// Keep the value from the last declared group
    LastWriteWins,
}

/// Static country lists driving classification flags (ISO 3166-1 alpha-3).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CountryLists {
    pub elimination_targets: BTreeSet<String>,
    pub indigenous_estimate_exceptions: BTreeSet<String>,
    pub elimination_estimate_exceptions: BTreeSet<String>,
}

/// Species identifiers resolved through an option list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeciesLookup {
    pub list_id: String,
    pub parasite: String,
    pub vectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentSlot {
    pub category: String,
    pub medicine: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EfficacySlot {
    pub medicine: String,
    pub follow_up: String,
    pub years: String,
    pub studies: String,
    pub min: String,
    pub median: String,
    pub max: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResistanceSlot {
    pub insecticide_class: String,
    pub sites_monitored: String,
    pub confirmed_pct: String,
    pub vectors: String,
    pub years: String,
}

/// Longest chart span accepted by [`ProfileConfig::validate`].
pub const MAX_CHART_YEARS: u32 = 50;

/// A multi-year chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartDefinition {
    pub key: String,
    pub title: String,
    pub lines: Vec<ChartLine>,
    /// Number of years shown, ending at the reporting year
    pub years: u32,
    #[serde(default)]
    pub precise: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartLine {
    pub identifier: String,
    pub label: String,
}

impl ChartDefinition {
    /// Periods covered for `reporting_year`, oldest first.
    ///
    /// The span is clamped to `1..=MAX_CHART_YEARS` and stops at `i32::MIN`.
    pub fn periods(&self, reporting_year: i32) -> Vec<String> {
        let span = i32::try_from(self.years.clamp(1, MAX_CHART_YEARS)).unwrap_or(1);
        let first = reporting_year.checked_sub(span - 1).unwrap_or(i32::MIN);
        (first..=reporting_year).map(|y| y.to_string()).collect()
    }

    /// The single query group fetching this chart.
    pub fn query_group(&self) -> QueryGroup {
        QueryGroup {
            name: format!("chart:{}", self.key),
            identifiers: self.lines.iter().map(|l| l.identifier.clone()).collect(),
            precise: self.precise,
        }
    }
}

impl ProfileConfig {
    /// The built-in malaria country profile configuration.
    pub fn builtin() -> Self {
        builtin::builtin_config()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: ProfileConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject structurally broken configurations and log suspicious ones.
    pub fn validate(&self) -> ConfigResult<()> {
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(ConfigError::Invalid("query group with empty name".into()));
            }
            if group.identifiers.is_empty() {
                return Err(ConfigError::Invalid(format!("query group '{}' is empty", group.name)));
            }
        }

        for chart in &self.charts {
            if chart.lines.is_empty() {
                return Err(ConfigError::Invalid(format!("chart '{}' has no lines", chart.key)));
            }
            if chart.years == 0 || chart.years > MAX_CHART_YEARS {
                return Err(ConfigError::Invalid(format!(
                    "chart '{}' spans {} years, expected 1 to {}",
                    chart.key, chart.years, MAX_CHART_YEARS
                )));
            }
        }

        if self.duplicate_policy == DuplicatePolicy::Reject {
            if let Some((identifier, first, second)) = find_duplicate_identifier(&self.groups) {
                return Err(ConfigError::Invalid(format!(
                    "identifier '{}' appears in groups '{}' and '{}'",
                    identifier, first, second
                )));
            }
        }

        for def in self.policies.iter().filter(|d| d.has_inverted_window()) {
            tracing::warn!(
                strategy = %def.strategy,
                valid_from = ?def.valid_from_year,
                valid_until = ?def.valid_until_year,
                "policy window is inverted and will never be shown"
            );
        }

        for identifier in self.unclassified_text_fields() {
            tracing::warn!(identifier = %identifier, "text field is not classified as text");
        }

        Ok(())
    }

    /// Text fields read by the profile that the classifier would treat as numeric.
    pub fn unclassified_text_fields(&self) -> Vec<String> {
        self.text_fields()
            .into_iter()
            .filter(|id| !self.text_identifiers.contains(id))
            .collect()
    }

    /// Every identifier the profile reads as text.
    pub fn text_fields(&self) -> BTreeSet<String> {
        let mut fields: BTreeSet<String> = ids::ASSEMBLER_TEXT_IDENTIFIERS
            .iter()
            .map(|s| s.to_string())
            .collect();

        fields.insert(self.species.parasite.clone());
        fields.extend(self.species.vectors.iter().cloned());
        fields.extend(self.policies.iter().map(|p| p.yes_no_identifier.clone()));
        fields.extend(self.treatment.iter().map(|t| t.medicine.clone()));
        for slot in &self.efficacy {
            fields.insert(slot.medicine.clone());
            fields.insert(slot.follow_up.clone());
            fields.insert(slot.years.clone());
        }
        for slot in &self.resistance {
            fields.insert(slot.vectors.clone());
            fields.insert(slot.years.clone());
        }
        fields
    }

    /// SHA-256 (hex) of the canonical JSON form.
    pub fn fingerprint(&self) -> ConfigResult<String> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn classifier(&self) -> ValueClassifier {
        ValueClassifier::new(&self.text_identifiers)
    }

    pub fn engine(&self) -> TransformationEngine {
        TransformationEngine::new(&self.transforms)
    }

    /// Classification flags for `country_code`. An empty code matches nothing.
    pub fn classify_country(&self, country_code: &str) -> CountryClassification {
        let lists = &self.countries;
        CountryClassification {
            elimination_target: lists.elimination_targets.contains(country_code),
            indigenous_estimate_exception: lists.indigenous_estimate_exceptions.contains(country_code),
            elimination_estimate_exception: lists.elimination_estimate_exceptions.contains(country_code),
        }
    }
}
