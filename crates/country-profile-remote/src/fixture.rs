//! In-memory source for testing and offline use without a server.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{SourceError, SourceResult};
use crate::row::{DataPointRow, QueryRequest, ScopeMetadata};
use crate::source::{AnalyticsSource, OptionLookup, ScopeLookup, UNKNOWN_OPTION};

/// Serves canned rows, options and scopes, and records every call it receives.
#[derive(Debug, Default)]
pub struct StaticSource {
    rows: Vec<DataPointRow>,
    options: HashMap<(String, String), String>,
    scopes: HashMap<String, ScopeMetadata>,
    failing_identifiers: HashSet<String>,
    fail_scope_lookup: bool,
    calls: Mutex<CallLog>,
}

/// Calls received by a [`StaticSource`].
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    pub queries: Vec<QueryRequest>,
    pub option_lookups: Vec<(String, String)>,
    pub scope_lookups: Vec<String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one analytics row.
    pub fn with_row(mut self, identifier: &str, scope: &str, period: &str, raw_value: &str) -> Self {
        self.rows.push(DataPointRow::new(identifier, scope, period, raw_value));
        self
    }

    /// Add many analytics rows.
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = DataPointRow>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Register an option display name.
    pub fn with_option(mut self, list_id: &str, code: &str, name: &str) -> Self {
        self.options
            .insert((list_id.to_string(), code.to_string()), name.to_string());
        self
    }

    /// Register scope metadata.
    pub fn with_scope(mut self, scope_id: &str, code: &str, parent_code: Option<&str>) -> Self {
        self.scopes.insert(
            scope_id.to_string(),
            ScopeMetadata {
                code: code.to_string(),
                parent_code: parent_code.map(str::to_string),
            },
        );
        self
    }

    /// Fail any analytics query that requests `identifier`.
    pub fn fail_on_identifier(mut self, identifier: &str) -> Self {
        self.failing_identifiers.insert(identifier.to_string());
        self
    }

    /// Fail every scope lookup.
    pub fn fail_scope_lookup(mut self) -> Self {
        self.fail_scope_lookup = true;
        self
    }

    /// Snapshot of the calls received so far.
    pub fn calls(&self) -> CallLog {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record<F: FnOnce(&mut CallLog)>(&self, f: F) {
        if let Ok(mut calls) = self.calls.lock() {
            f(&mut calls);
        }
    }
}

#[async_trait]
impl AnalyticsSource for StaticSource {
    async fn query(&self, request: &QueryRequest) -> SourceResult<Vec<DataPointRow>> {
        self.record(|c| c.queries.push(request.clone()));

        if let Some(id) = request
            .identifiers
            .iter()
            .find(|id| self.failing_identifiers.contains(*id))
        {
            return Err(SourceError::Transport(format!("query for {} refused", id)));
        }

        let periods: HashSet<&str> = request.periods().collect();
        Ok(self
            .rows
            .iter()
            .filter(|r| {
                r.scope == request.scope
                    && periods.contains(r.period.as_str())
                    && request.identifiers.iter().any(|id| *id == r.identifier)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OptionLookup for StaticSource {
    async fn resolve_option(&self, list_id: &str, code: &str) -> SourceResult<String> {
        self.record(|c| c.option_lookups.push((list_id.to_string(), code.to_string())));
        Ok(self
            .options
            .get(&(list_id.to_string(), code.to_string()))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_OPTION.to_string()))
    }
}

#[async_trait]
impl ScopeLookup for StaticSource {
    async fn resolve_scope(&self, scope_id: &str) -> SourceResult<ScopeMetadata> {
        self.record(|c| c.scope_lookups.push(scope_id.to_string()));
        if self.fail_scope_lookup {
            return Err(SourceError::Transport("scope lookup refused".into()));
        }
        self.scopes
            .get(scope_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(scope_id.to_string()))
    }
}
