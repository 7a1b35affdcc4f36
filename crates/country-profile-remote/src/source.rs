//! Lookup traits consumed by the pipeline.

use async_trait::async_trait;

use crate::error::SourceResult;
use crate::row::{DataPointRow, QueryRequest, ScopeMetadata};

/// Display name returned for codes the option list does not know.
pub const UNKNOWN_OPTION: &str = "-";

/// Grouped analytics queries.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    /// Fetch every row for the requested identifiers, scope and period(s).
    async fn query(&self, request: &QueryRequest) -> SourceResult<Vec<DataPointRow>>;
}

/// Option-list code resolution.
#[async_trait]
pub trait OptionLookup: Send + Sync {
    /// Resolve `code` in option list `list_id` to its display name, or
    /// [`UNKNOWN_OPTION`] when the list has no such code.
    async fn resolve_option(&self, list_id: &str, code: &str) -> SourceResult<String>;
}

/// Organisation unit metadata.
#[async_trait]
pub trait ScopeLookup: Send + Sync {
    async fn resolve_scope(&self, scope_id: &str) -> SourceResult<ScopeMetadata>;
}
