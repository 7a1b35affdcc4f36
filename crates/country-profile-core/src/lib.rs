//! Country Profile Core Library
//!
//! Aggregates remote malaria analytics into per-country, per-year profiles.
//!
//! # Architecture
//!
//! ```text
//!   ProfileConfig (built in or JSON, immutable)
//!          │
//!          ▼
//!   ProfileAssembler::assemble(scope, year)
//!          │
//!          ├──▶ ScopeLookup ──────────────▶ country code (degrades to "")
//!          │
//!          ├──▶ Aggregator ──▶ N concurrent AnalyticsSource queries
//!          │        │
//!          │   classify ─▶ transform ─▶ merge ─▶ ValueMaps
//!          │                                       │
//!          │                      PolicyResolver ◀─┤
//!          │                                       │
//!          ├──▶ chart series (concurrent)          │
//!          │                                       ▼
//!          └──────────▶ OptionLookup ─▶ CountryProfileRecord
//! ```
//!
//! # Core Principle
//!
//! **A profile is built whole or not at all.** Any failed query fails the
//! build; only the country-code lookup may degrade.
//!
//! # Modules
//!
//! - [`config`]: immutable pipeline configuration and the built-in profile
//! - [`ids`]: data-point identifiers read by name
//! - [`logging`]: `tracing` subscriber setup
//! - [`models`]: value maps, policy catalog entries, profile records
//! - [`pipeline`]: classifier, transformation engine, aggregator, policy resolver, assembler, build session

pub mod config;
pub mod ids;
pub mod logging;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use config::{ConfigError, DuplicatePolicy, ProfileConfig, QueryGroup};
pub use country_profile_remote::{
    AnalyticsSource, HttpSource, OptionLookup, RemoteConfig, ScopeLookup, SourceError, StaticSource,
};
pub use models::{
    CountryProfileRecord, DisplayMode, PolicyDefinition, PolicyInterpretation, PolicyResult,
    SeriesMaps, ValueMaps,
};
pub use pipeline::{
    Aggregator, BuildSession, PipelineError, PolicyResolver, ProfileAssembler, ProfileError,
    ProfileSession, TransformRule, TransformationEngine, ValueClassifier,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

use country_profile_remote::RemoteConfigError;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ProfileServiceError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Remote error: {0}")]
    RemoteError(String),

    #[error("Profile error: {0}")]
    ProfileError(String),

    #[error("Superseded: {0}")]
    Superseded(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<ConfigError> for ProfileServiceError {
    fn from(e: ConfigError) -> Self {
        ProfileServiceError::ConfigurationError(e.to_string())
    }
}

impl From<RemoteConfigError> for ProfileServiceError {
    fn from(e: RemoteConfigError) -> Self {
        ProfileServiceError::RemoteError(e.to_string())
    }
}

impl From<ProfileError> for ProfileServiceError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::Config(inner) => inner.into(),
            superseded @ ProfileError::Superseded => {
                ProfileServiceError::Superseded(superseded.to_string())
            }
            remote @ (ProfileError::Pipeline(PipelineError::Source { .. })
            | ProfileError::OptionLookup { .. }) => ProfileServiceError::RemoteError(remote.to_string()),
            other => ProfileServiceError::ProfileError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ProfileServiceError {
    fn from(e: serde_json::Error) -> Self {
        ProfileServiceError::SerializationError(e.to_string())
    }
}

impl From<logging::LoggingError> for ProfileServiceError {
    fn from(e: logging::LoggingError) -> Self {
        ProfileServiceError::ConfigurationError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open a service against `base_url` using the built-in configuration.
#[uniffi::export]
pub fn open_profile_service(
    base_url: String,
    username: Option<String>,
    password: Option<String>,
) -> Result<Arc<ProfileService>, ProfileServiceError> {
    let remote = remote_config(base_url, username, password);
    ProfileService::open(&remote, ProfileConfig::builtin())
}

/// Open a service with a JSON configuration instead of the built-in one.
#[uniffi::export]
pub fn open_profile_service_with_config(
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    config_json: String,
) -> Result<Arc<ProfileService>, ProfileServiceError> {
    let remote = remote_config(base_url, username, password);
    let config = ProfileConfig::from_json_str(&config_json)?;
    ProfileService::open(&remote, config)
}

/// Open a service configured from `PROFILE_API_*` environment variables.
#[uniffi::export]
pub fn open_profile_service_from_env() -> Result<Arc<ProfileService>, ProfileServiceError> {
    let remote = RemoteConfig::from_env()?;
    ProfileService::open(&remote, ProfileConfig::builtin())
}

/// Install the global log subscriber (`level`: error, warn, info, debug or trace).
#[uniffi::export]
pub fn init_profile_logging(level: String, json: bool) -> Result<(), ProfileServiceError> {
    let format = if json {
        logging::LogFormat::Json
    } else {
        logging::LogFormat::Compact
    };
    let config = logging::LogConfig::from_level_str(&level)?.with_format(format);
    logging::init_logging(&config)?;
    Ok(())
}

fn remote_config(base_url: String, username: Option<String>, password: Option<String>) -> RemoteConfig {
    let remote = RemoteConfig::new(base_url);
    match (username, password) {
        (Some(user), Some(pass)) => remote.with_credentials(user, pass),
        _ => remote,
    }
}

// =========================================================================
// Main API Object
// =========================================================================

/// Profile builder shared across FFI calls.
#[derive(uniffi::Object)]
pub struct ProfileService {
    session: ProfileSession,
}

impl ProfileService {
    fn open(remote: &RemoteConfig, config: ProfileConfig) -> Result<Arc<Self>, ProfileServiceError> {
        let source = Arc::new(HttpSource::new(remote)?);
        let assembler = ProfileAssembler::with_source(Arc::new(config), source)?;
        Ok(Arc::new(Self::from_assembler(assembler)))
    }

    /// Wrap an assembler built over any collaborators.
    pub fn from_assembler(assembler: ProfileAssembler) -> Self {
        Self {
            session: ProfileSession::new(Arc::new(assembler)),
        }
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl ProfileService {
    /// Build a profile and return it as JSON.
    ///
    /// Fails with `Superseded` when another build was started on this
    /// service before this one finished.
    pub async fn build_profile_json(
        &self,
        scope_id: String,
        reporting_year: i32,
    ) -> Result<String, ProfileServiceError> {
        let record = self.session.build(&scope_id, reporting_year).await?;
        Ok(serde_json::to_string(&record)?)
    }

    /// SHA-256 of the active configuration.
    pub fn config_fingerprint(&self) -> String {
        self.session.assembler().fingerprint().to_string()
    }

    /// The active configuration as JSON.
    pub fn config_json(&self) -> Result<String, ProfileServiceError> {
        Ok(self.session.assembler().config().to_json()?)
    }
}
