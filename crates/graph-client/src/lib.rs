//! A typed client for GraphQL-over-HTTP APIs.
//!
//! Requests are prepared once against the schema's field table, which checks every selected
//! field, argument and directive, and can then be executed any number of times with
//! different bind values. Custom scalars in responses are normalised by their codecs before
//! being deserialised into the caller's types.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod auth;
pub mod blocking;
mod client;
mod config;
mod errors;
mod executor;
pub mod logging;
mod request;

pub use auth::{Authenticator, UserProfile};
pub use client::GraphClient;
pub use config::{ClientConfig, CredentialsConfig, LogStyle, LoggingConfig};
pub use errors::{AuthError, ConfigError, RequestExecutionError};
pub use executor::{BlockingExecutor, Executor, GraphQlResponse, SharedHttpClient};
pub use graph_client_schema as schema;
pub use graph_client_schema::{OperationKind, RequestPreparationError};
pub use request::{BindValues, BindVariable, PreparedRequest, RequestContext, ResponseShape};
pub use secrecy::SecretString;
