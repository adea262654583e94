//! A blocking client, for callers without an async runtime.
//!
//! Every call blocks the current thread on a private single-threaded runtime, so none of
//! these methods may be called from within an async context.

use graph_client_schema::{OperationKind, RequestPreparationError, TypeTable};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use url::Url;

pub use crate::executor::BlockingExecutor;
use crate::{
    auth::UserProfile,
    config::ClientConfig,
    errors::{AuthError, ConfigError, RequestExecutionError},
    executor::GraphQlResponse,
    request::{BindValues, PreparedRequest, RequestContext},
};

#[derive(Debug)]
pub struct GraphClient {
    runtime: tokio::runtime::Runtime,
    inner: crate::GraphClient,
}

impl GraphClient {
    pub fn new(config: ClientConfig, types: TypeTable) -> Result<Self, ConfigError> {
        Self::with_context(config, RequestContext::new(types))
    }

    pub fn with_context(config: ClientConfig, context: RequestContext) -> Result<Self, ConfigError> {
        Self::from_async(crate::GraphClient::with_context(config, context)?).map_err(ConfigError::Runtime)
    }

    /// Wraps an async client. Fails if the runtime cannot be created.
    pub fn from_async(inner: crate::GraphClient) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        Ok(Self { runtime, inner })
    }

    pub fn prepare(
        &self,
        operation: OperationKind,
        field: &str,
        partial: &str,
    ) -> Result<PreparedRequest, RequestPreparationError> {
        self.inner.prepare(operation, field, partial)
    }

    pub fn prepare_query(&self, field: &str, partial: &str) -> Result<PreparedRequest, RequestPreparationError> {
        self.inner.prepare_query(field, partial)
    }

    pub fn prepare_mutation(&self, field: &str, partial: &str) -> Result<PreparedRequest, RequestPreparationError> {
        self.inner.prepare_mutation(field, partial)
    }

    pub fn prepare_document(&self, document: &str) -> Result<PreparedRequest, RequestPreparationError> {
        self.inner.prepare_document(document)
    }

    pub fn execute<T: DeserializeOwned>(
        &self,
        request: &PreparedRequest,
        bind: &BindValues,
    ) -> Result<T, RequestExecutionError> {
        self.runtime.block_on(self.inner.execute(request, bind))
    }

    pub fn execute_response<T: DeserializeOwned>(
        &self,
        request: &PreparedRequest,
        bind: &BindValues,
    ) -> Result<GraphQlResponse<T>, RequestExecutionError> {
        self.runtime.block_on(self.inner.execute_response(request, bind))
    }

    pub fn login(&self, url: Option<Url>, username: &str, password: &SecretString) -> Result<bool, AuthError> {
        self.runtime.block_on(self.inner.login(url, username, password))
    }

    pub fn login_with_credentials(&self) -> Result<bool, AuthError> {
        self.runtime.block_on(self.inner.login_with_credentials())
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.runtime.block_on(self.inner.logout())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.is_authenticated()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.user()
    }

    /// The async client this one wraps.
    pub fn get_ref(&self) -> &crate::GraphClient {
        &self.inner
    }
}
