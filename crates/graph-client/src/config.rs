use std::{fs, path::Path, time::Duration};

use duration_str::deserialize_duration;
use reqwest::header::{self, HeaderMap, HeaderValue};
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::errors::ConfigError;

const DEFAULT_USER_AGENT: &str = concat!("graph-client/", env!("CARGO_PKG_VERSION"));

/// Client configuration, usually read from a TOML file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// The GraphQL endpoint requests are posted to
    pub endpoint: Url,
    /// Timeout of a whole request, e.g. `30s`
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Credentials for [`crate::GraphClient::login_with_credentials`]
    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive, e.g. `info,graph_client=debug`
    pub filter: String,
    pub style: LogStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            style: LogStyle::default(),
        }
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogStyle {
    /// Multi-line, human readable events
    Pretty,
    /// One line per event
    #[default]
    Text,
    /// JSON objects
    Json,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ClientConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            credentials: None,
            logging: LoggingConfig::default(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// An HTTP client without credentials.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        self.build_http_client(None)
    }

    /// An HTTP client sending `token` as a bearer token with every request.
    pub(crate) fn authenticated_http_client(&self, token: &str) -> Result<reqwest::Client, ConfigError> {
        self.build_http_client(Some(token))
    }

    fn build_http_client(&self, token: Option<&str>) -> Result<reqwest::Client, ConfigError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = token {
            let mut bearer_token = HeaderValue::from_str(&format!("Bearer {token}"))?;
            bearer_token.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, bearer_token);
        }

        reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(HeaderValue::from_str(&self.user_agent)?)
            .timeout(self.timeout)
            .build()
            .map_err(ConfigError::HttpClient)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn full_config() {
        let config = ClientConfig::from_toml_str(indoc! {r#"
            endpoint = "https://api.example.com/graphql"
            timeout = "1m"
            user_agent = "library-sync"

            [credentials]
            username = "alice"
            password = "hunter2"

            [logging]
            filter = "graph_client=debug"
            style = "json"
        "#})
        .unwrap();

        assert_eq!(config.endpoint.as_str(), "https://api.example.com/graphql");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "library-sync");

        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password.expose_secret(), "hunter2");

        assert_eq!(config.logging.filter, "graph_client=debug");
        assert_eq!(config.logging.style, LogStyle::Json);
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::from_toml_str(r#"endpoint = "http://localhost:4000/graphql""#).unwrap();

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("graph-client/"));
        assert!(config.credentials.is_none());
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.logging.style.to_string(), "text");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = ClientConfig::from_toml_str(indoc! {r#"
            endpoint = "http://localhost:4000/graphql"
            retries = 3
        "#})
        .unwrap_err();

        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");

        let error = ClientConfig::from_path(&path).unwrap_err();
        assert!(error.to_string().starts_with("could not read"));
    }

    #[test]
    fn from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        fs::write(&path, "endpoint = \"http://localhost:4000/graphql\"\ntimeout = \"500ms\"\n").unwrap();

        let config = ClientConfig::from_path(&path).unwrap();
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn invalid_token_header() {
        let config = ClientConfig::new("http://localhost:4000/graphql".parse().unwrap());

        assert!(matches!(
            config.authenticated_http_client("line\nbreak"),
            Err(ConfigError::InvalidHeader(_))
        ));
        assert!(config.authenticated_http_client("t1").is_ok());
    }
}
