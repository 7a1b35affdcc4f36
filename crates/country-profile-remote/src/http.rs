//! HTTP implementation of the lookups.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;

use crate::config::{RemoteConfig, DEFAULT_USER_AGENT};
use crate::error::{RemoteConfigError, SourceError, SourceResult};
use crate::row::{DataPointRow, QueryRequest, ScopeMetadata};
use crate::source::{AnalyticsSource, OptionLookup, ScopeLookup, UNKNOWN_OPTION};
use crate::wire;

/// Client for a DHIS2-style analytics API.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    api_root: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpSource {
    /// Build a client from settings.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteConfigError> {
        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|_| RemoteConfigError::InvalidValue {
                name: "user_agent".to_string(),
                value: user_agent.to_string(),
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_root: config.api_root(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// GET `path` under the API root and return the body on success.
    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> SourceResult<String> {
        let url = format!("{}/{}", self.api_root, path);
        tracing::debug!(url = %url, params = query.len(), "GET");

        let mut request = self.client.get(&url).query(query);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await?;
        check_status(response.status(), url)?;

        Ok(response.text().await?)
    }
}

/// Map a response status to the error it represents, if any.
fn check_status(status: StatusCode, url: String) -> SourceResult<()> {
    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(url));
    }
    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            url,
        });
    }
    Ok(())
}

/// An option list the server does not know reads as an unknown option.
fn option_name_or_unknown(body: SourceResult<String>, code: &str) -> SourceResult<String> {
    match body {
        Ok(body) => wire::parse_option_name(&body, code),
        Err(SourceError::NotFound(_)) => Ok(UNKNOWN_OPTION.to_string()),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl AnalyticsSource for HttpSource {
    async fn query(&self, request: &QueryRequest) -> SourceResult<Vec<DataPointRow>> {
        if request.identifiers.is_empty() {
            return Ok(Vec::new());
        }

        let params = [
            ("dimension", format!("dx:{}", request.identifier_dimension())),
            ("dimension", format!("ou:{}", request.scope)),
            ("dimension", format!("pe:{}", request.period)),
            ("skipRounding", request.precise.to_string()),
        ];

        let body = self.get_text("analytics.json", &params).await?;
        let rows = wire::parse_analytics(&body)?;

        tracing::debug!(
            identifiers = request.identifiers.len(),
            rows = rows.len(),
            "analytics query complete"
        );
        Ok(rows)
    }
}

#[async_trait]
impl OptionLookup for HttpSource {
    async fn resolve_option(&self, list_id: &str, code: &str) -> SourceResult<String> {
        let path = format!("optionSets/{}/options.json", list_id);
        let params = [
            ("filter", format!("code:eq:{}", code)),
            ("fields", "code,name".to_string()),
        ];

        option_name_or_unknown(self.get_text(&path, &params).await, code)
    }
}

#[async_trait]
impl ScopeLookup for HttpSource {
    async fn resolve_scope(&self, scope_id: &str) -> SourceResult<ScopeMetadata> {
        let path = format!("organisationUnits/{}.json", scope_id);
        let params = [("fields", "code,parent[code]".to_string())];

        let body = self.get_text(&path, &params).await?;
        wire::parse_scope(&body)
    }
}
