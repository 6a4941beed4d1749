//! Connection options and their validation.

use std::fmt;
use std::time::Duration;

use sync_core::ConfigError;

/// Default REST API version.
pub const DEFAULT_API_VERSION: &str = "60.0";

/// Login host for production orgs.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";

/// Login host for sandbox orgs.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Unvalidated connection options (library type without clap).
#[derive(Clone, Default)]
pub struct ConnectionOptions {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub security_token: Option<String>,
    pub sandbox: bool,
    pub instance_url: Option<String>,
    pub api_version: Option<String>,
    pub tooling_api: bool,
    pub timeout: Option<Duration>,
}

/// Validated connection configuration.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub security_token: String,
    /// Host the OAuth token request is sent to
    pub login_url: String,
    pub api_version: String,
    pub tooling_api: bool,
    pub timeout: Duration,
}

impl ConnectionOptions {
    /// Check option combinations. Performs no I/O.
    pub fn validate(self) -> Result<ConnectionConfig, ConfigError> {
        if self.sandbox && self.instance_url.is_some() {
            return Err(ConfigError::InstanceUrlWithSandbox);
        }

        for (value, name) in [
            (&self.client_id, "client id"),
            (&self.client_secret, "client secret"),
            (&self.username, "username"),
            (&self.password, "password"),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingCredential(name.to_string()));
            }
        }

        let login_url = match (&self.instance_url, self.sandbox) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, true) => SANDBOX_LOGIN_URL.to_string(),
            (None, false) => PRODUCTION_LOGIN_URL.to_string(),
        };

        let api_version = self
            .api_version
            .map(|v| v.trim_start_matches(['v', 'V']).to_string())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(ConnectionConfig {
            client_id: self.client_id,
            client_secret: self.client_secret,
            username: self.username,
            password: self.password,
            security_token: self.security_token.unwrap_or_default(),
            login_url,
            api_version,
            tooling_api: self.tooling_api,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

const REDACTED: &str = "[redacted]";

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("security_token", &self.security_token.as_ref().map(|_| REDACTED))
            .field("sandbox", &self.sandbox)
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .field("tooling_api", &self.tooling_api)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("security_token", &REDACTED)
            .field("login_url", &self.login_url)
            .field("api_version", &self.api_version)
            .field("tooling_api", &self.tooling_api)
            .field("timeout", &self.timeout)
            .finish()
    }
}
