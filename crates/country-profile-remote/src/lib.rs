//! Remote collaborators for the country profile pipeline.
//!
//! This crate is the I/O boundary of the pipeline. It defines the three
//! lookups the pipeline consumes and an HTTP implementation of them against a
//! DHIS2-style analytics API:
//!
//! - [`AnalyticsSource`]: grouped data-point queries returning [`DataPointRow`]s
//! - [`OptionLookup`]: option-list code to display-name resolution
//! - [`ScopeLookup`]: organisation unit metadata (country code)
//!
//! Positional wire rows are validated into named [`DataPointRow`]s here and
//! nowhere else.

pub mod config;
pub mod error;
pub mod fixture;
pub mod http;
pub mod row;
pub mod source;
pub mod wire;

pub use config::RemoteConfig;
pub use error::{RemoteConfigError, SourceError, SourceResult};
pub use fixture::StaticSource;
pub use http::HttpSource;
pub use row::{DataPointRow, QueryRequest, ScopeMetadata};
pub use source::{AnalyticsSource, OptionLookup, ScopeLookup, UNKNOWN_OPTION};
