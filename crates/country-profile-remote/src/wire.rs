//! Wire formats of the analytics API.
//!
//! Analytics rows arrive as positional string arrays whose meaning is given
//! by the `headers` list. Columns are located by header name so a server
//! that reorders dimensions still maps cells to the right fields.

use serde::Deserialize;

use crate::error::{SourceError, SourceResult};
use crate::row::{DataPointRow, ScopeMetadata};
use crate::source::UNKNOWN_OPTION;

const IDENTIFIER_COLUMN: &str = "dx";
const SCOPE_COLUMN: &str = "ou";
const PERIOD_COLUMN: &str = "pe";
const VALUE_COLUMN: &str = "value";

/// Raw analytics response.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsResponse {
    #[serde(default)]
    pub headers: Vec<AnalyticsHeader>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

/// Column header of an analytics response.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsHeader {
    pub name: String,
}

/// Positions of the four columns a [`DataPointRow`] is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    identifier: usize,
    scope: usize,
    period: usize,
    value: usize,
}

impl ColumnLayout {
    fn from_headers(headers: &[AnalyticsHeader]) -> SourceResult<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.name == name)
                .ok_or_else(|| SourceError::MalformedResponse(format!("missing column '{}'", name)))
        };

        Ok(Self {
            identifier: find(IDENTIFIER_COLUMN)?,
            scope: find(SCOPE_COLUMN)?,
            period: find(PERIOD_COLUMN)?,
            value: find(VALUE_COLUMN)?,
        })
    }

    fn width(&self) -> usize {
        self.identifier
            .max(self.scope)
            .max(self.period)
            .max(self.value)
            + 1
    }
}

/// Parse an analytics JSON body into validated rows.
pub fn parse_analytics(body: &str) -> SourceResult<Vec<DataPointRow>> {
    let response: AnalyticsResponse = serde_json::from_str(body)?;
    rows_from_response(response)
}

/// Validate positional rows against the response headers.
pub fn rows_from_response(response: AnalyticsResponse) -> SourceResult<Vec<DataPointRow>> {
    if response.rows.is_empty() {
        return Ok(Vec::new());
    }

    let layout = ColumnLayout::from_headers(&response.headers)?;
    let width = layout.width();

    response
        .rows
        .into_iter()
        .enumerate()
        .map(|(index, mut cells)| {
            if cells.len() < width {
                return Err(SourceError::MalformedResponse(format!(
                    "row {} has {} cells, expected at least {}",
                    index,
                    cells.len(),
                    width
                )));
            }
            Ok(DataPointRow {
                identifier: std::mem::take(&mut cells[layout.identifier]),
                scope: std::mem::take(&mut cells[layout.scope]),
                period: std::mem::take(&mut cells[layout.period]),
                raw_value: std::mem::take(&mut cells[layout.value]),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OptionsResponse {
    #[serde(default)]
    options: Vec<OptionEntry>,
}

#[derive(Debug, Deserialize)]
struct OptionEntry {
    code: Option<String>,
    name: String,
}

/// Extract the display name of `code` from an option listing.
pub fn parse_option_name(body: &str, code: &str) -> SourceResult<String> {
    let response: OptionsResponse = serde_json::from_str(body)?;
    let name = response
        .options
        .into_iter()
        .find(|o| o.code.as_deref().map_or(true, |c| c == code))
        .map(|o| o.name)
        .unwrap_or_else(|| UNKNOWN_OPTION.to_string());
    Ok(name)
}

#[derive(Debug, Deserialize)]
struct ScopeResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    parent: Option<ParentRef>,
}

#[derive(Debug, Deserialize)]
struct ParentRef {
    #[serde(default)]
    code: Option<String>,
}

/// Parse organisation unit metadata. A unit without a code yields an empty code.
pub fn parse_scope(body: &str) -> SourceResult<ScopeMetadata> {
    let response: ScopeResponse = serde_json::from_str(body)?;
    Ok(ScopeMetadata {
        code: response.code.unwrap_or_default(),
        parent_code: response.parent.and_then(|p| p.code),
    })
}
