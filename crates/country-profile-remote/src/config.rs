//! Connection settings for the HTTP source.

use serde::{Deserialize, Serialize};

use crate::error::RemoteConfigError;

/// Environment variable holding the API base URL.
pub const ENV_BASE_URL: &str = "PROFILE_API_URL";
/// Environment variable holding the API user name.
pub const ENV_USERNAME: &str = "PROFILE_API_USER";
/// Environment variable holding the API password.
pub const ENV_PASSWORD: &str = "PROFILE_API_PASSWORD";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "PROFILE_API_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("country-profile/", env!("CARGO_PKG_VERSION"));

/// Settings for [`crate::HttpSource`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    /// API root, without the trailing `/api`
    pub base_url: String,
    /// Basic auth user
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Overrides [`DEFAULT_USER_AGENT`]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RemoteConfig {
    /// Create settings for an unauthenticated API root.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: None,
            password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }

    /// Attach basic auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Read settings from `PROFILE_API_*` environment variables.
    pub fn from_env() -> Result<Self, RemoteConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RemoteConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| RemoteConfigError::MissingVariable(ENV_BASE_URL.to_string()))?;

        let timeout_secs = match lookup(ENV_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| RemoteConfigError::InvalidValue {
                name: ENV_TIMEOUT_SECS.to_string(),
                value: raw.clone(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            username: lookup(ENV_USERNAME),
            password: lookup(ENV_PASSWORD),
            timeout_secs,
            user_agent: None,
        })
    }

    /// `base_url` with the API path appended and trailing slashes removed.
    pub fn api_root(&self) -> String {
        format!("{}/api", self.base_url.trim_end_matches('/'))
    }
}
