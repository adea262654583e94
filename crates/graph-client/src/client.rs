use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use graph_client_schema::{OperationKind, RequestPreparationError, TypeTable};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    auth::{Authenticator, UserProfile},
    config::ClientConfig,
    errors::{AuthError, ConfigError, RequestExecutionError},
    executor::{Executor, GraphQlResponse, SharedHttpClient},
    request::{BindValues, PreparedRequest, RequestContext},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Partial {
        operation: OperationKind,
        field: String,
        partial: String,
    },
    Full(String),
}

/// Everything needed to talk to one GraphQL API: schema metadata, the shared HTTP client,
/// the session and a cache of prepared requests.
#[derive(Debug)]
pub struct GraphClient {
    config: Arc<ClientConfig>,
    context: RequestContext,
    executor: Executor,
    authenticator: Authenticator,
    prepared: RwLock<HashMap<CacheKey, PreparedRequest>>,
}

impl GraphClient {
    /// A client using the built-in scalars and directives.
    pub fn new(config: ClientConfig, types: TypeTable) -> Result<Self, ConfigError> {
        Self::with_context(config, RequestContext::new(types))
    }

    pub fn with_context(config: ClientConfig, context: RequestContext) -> Result<Self, ConfigError> {
        let config = Arc::new(config);
        let http = SharedHttpClient::new(config.endpoint.clone(), config.http_client()?);

        let executor = Executor::new(http.clone(), context.scalars.clone());
        let authenticator = Authenticator::new(
            config.clone(),
            http,
            context.scalars.clone(),
            context.directives.clone(),
        );

        Ok(Self {
            config,
            context,
            executor,
            authenticator,
            prepared: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Prepares, or takes from the cache, a request for one root field.
    pub fn prepare(
        &self,
        operation: OperationKind,
        field: &str,
        partial: &str,
    ) -> Result<PreparedRequest, RequestPreparationError> {
        let key = CacheKey::Partial {
            operation,
            field: field.to_string(),
            partial: partial.to_string(),
        };

        self.cached(key, || PreparedRequest::partial(&self.context, operation, field, partial))
    }

    pub fn prepare_query(&self, field: &str, partial: &str) -> Result<PreparedRequest, RequestPreparationError> {
        self.prepare(OperationKind::Query, field, partial)
    }

    pub fn prepare_mutation(&self, field: &str, partial: &str) -> Result<PreparedRequest, RequestPreparationError> {
        self.prepare(OperationKind::Mutation, field, partial)
    }

    /// Prepares, or takes from the cache, a complete document.
    pub fn prepare_document(&self, document: &str) -> Result<PreparedRequest, RequestPreparationError> {
        self.cached(CacheKey::Full(document.to_string()), || {
            PreparedRequest::full(&self.context, document)
        })
    }

    fn cached(
        &self,
        key: CacheKey,
        prepare: impl FnOnce() -> Result<PreparedRequest, RequestPreparationError>,
    ) -> Result<PreparedRequest, RequestPreparationError> {
        if let Some(request) = self.prepared.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(request.clone());
        }

        let request = prepare()?;

        self.prepared
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, request.clone());

        Ok(request)
    }

    /// Number of cached prepared requests.
    pub fn prepared_requests(&self) -> usize {
        self.prepared.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &PreparedRequest,
        bind: &BindValues,
    ) -> Result<T, RequestExecutionError> {
        self.executor.execute(request, bind).await
    }

    pub async fn execute_response<T: DeserializeOwned>(
        &self,
        request: &PreparedRequest,
        bind: &BindValues,
    ) -> Result<GraphQlResponse<T>, RequestExecutionError> {
        self.executor.execute_response(request, bind).await
    }

    pub async fn login(&self, url: Option<Url>, username: &str, password: &SecretString) -> Result<bool, AuthError> {
        self.authenticator.login(url, username, password).await
    }

    /// Logs in on the configured endpoint with the configured credentials. Returns `false`
    /// when no credentials are configured.
    pub async fn login_with_credentials(&self) -> Result<bool, AuthError> {
        let Some(credentials) = &self.config.credentials else {
            tracing::debug!("no credentials configured");
            return Ok(false);
        };

        self.authenticator
            .login(None, &credentials.username, &credentials.password)
            .await
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.authenticator.logout().await
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticator.is_authenticated()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.authenticator.user()
    }
}

#[cfg(test)]
mod tests {
    use graph_client_schema::FieldDescriptor;

    use super::*;

    fn client() -> GraphClient {
        let types = TypeTable::builder()
            .object("Book")
            .field(FieldDescriptor::scalar("title", "String"))
            .done()
            .root("Query", OperationKind::Query)
            .method(FieldDescriptor::object("books", "Book").list())
            .build()
            .unwrap();

        GraphClient::new(ClientConfig::new("http://localhost:4000/graphql".parse().unwrap()), types).unwrap()
    }

    #[test]
    fn prepared_requests_are_cached() {
        let client = client();

        let first = client.prepare_query("books", "{ title }").unwrap();
        let second = client.prepare_query("books", "{ title }").unwrap();
        assert_eq!(first, second);
        assert_eq!(client.prepared_requests(), 1);

        client.prepare_document("{ books { title } }").unwrap();
        assert_eq!(client.prepared_requests(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let client = client();

        assert!(client.prepare_query("books", "{ pages }").is_err());
        assert!(client.prepare_mutation("books", "{ title }").is_err());
        assert_eq!(client.prepared_requests(), 0);
    }
}
