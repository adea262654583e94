use std::{io, path::PathBuf};

use cynic::GraphQlError;
use graph_client_schema::{RequestPreparationError, ScalarError};
use thiserror::Error;
use url::Url;

/// A prepared request that could not be executed, or whose response could not be decoded.
#[derive(Error, Debug)]
pub enum RequestExecutionError {
    /// returned if a `&name` bind variable has no value
    #[error("the mandatory bind variable '{0}' has no value")]
    MissingBindVariable(String),

    /// returned if a bind value does not fit the scalar declared for its variable
    #[error("invalid value for the bind variable '{name}': {source}")]
    InvalidBindValue { name: String, source: ScalarError },

    /// returned if the endpoint could not be reached or did not answer in time
    #[error("could not reach the GraphQL endpoint\nCaused by: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("the request failed\nCaused by: {0}")]
    Http(#[source] reqwest::Error),

    /// returned if the server answered with a non-success status
    #[error("the server answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("the server returned errors: {}", messages(.0))]
    GraphQl(Vec<GraphQlError>),

    /// returned if a successful response carries no data for the requested field
    #[error("the response has no data")]
    MissingData,

    #[error("could not decode the response\nCaused by: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Scalar(#[from] ScalarError),
}

impl RequestExecutionError {
    pub(crate) fn from_send(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::Connection(error)
        } else {
            Self::Http(error)
        }
    }
}

fn messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// returned if a login for another user or endpoint is attempted while logged in
    #[error("already logged in as '{current}' on {current_url}, log out before logging in as '{requested}' on {requested_url}")]
    IdentitySwitch {
        current: String,
        current_url: Url,
        requested: String,
        requested_url: Url,
    },

    /// returned if the login request does not match the authentication schema
    #[error("the login request could not be prepared\nCaused by: {0}")]
    Configuration(#[from] RequestPreparationError),

    /// returned if the login request could not be sent
    #[error("could not reach the server to log in '{username}'")]
    Unreachable {
        username: String,
        #[source]
        source: RequestExecutionError,
    },

    /// returned if the server answered the login request with an error
    #[error("the server rejected the login of '{username}'")]
    Rejected {
        username: String,
        #[source]
        source: RequestExecutionError,
    },

    /// returned if the HTTP client could not be rebuilt with or without the session token
    #[error("could not rebuild the HTTP client\nCaused by: {0}")]
    HttpClient(#[source] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    /// returned if the configuration file could not be read
    #[error("could not read '{}'\nCaused by: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// returned if the configuration is not valid TOML or has unknown keys
    #[error("invalid configuration\nCaused by: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid header value\nCaused by: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("could not build the HTTP client\nCaused by: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// returned if the runtime of a blocking client could not be started
    #[error("could not start the runtime\nCaused by: {0}")]
    Runtime(#[source] io::Error),

    #[error("invalid log filter\nCaused by: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),

    /// returned if a global log subscriber is already installed
    #[error("could not install the log subscriber\nCaused by: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}
