//! Analytics aggregation and transformation pipeline.
//!
//! Pipeline: Grouped Queries → Classification → Transformation → Merge
//! → Policy Resolution → Profile Assembly

mod aggregator;
mod assembler;
mod classifier;
mod policy;
mod session;
mod transform;

pub use aggregator::*;
pub use assembler::*;
pub use classifier::*;
pub use policy::*;
pub use session::*;
pub use transform::*;

use country_profile_remote::SourceError;
use thiserror::Error;

/// Aggregation errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Query group '{group}' failed: {source}")]
    Source {
        group: String,
        #[source]
        source: SourceError,
    },

    #[error("Identifier '{identifier}' appears in groups '{first_group}' and '{second_group}'")]
    DuplicateIdentifier {
        identifier: String,
        first_group: String,
        second_group: String,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Profile build errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Option lookup failed for {list_id}/{code}: {source}")]
    OptionLookup {
        list_id: String,
        code: String,
        #[source]
        source: SourceError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Build superseded by a newer request")]
    Superseded,
}

pub type ProfileResult<T> = Result<T, ProfileError>;
