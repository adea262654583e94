use std::sync::{Arc, PoisonError, RwLock};

use cynic::GraphQlError;
use graph_client_schema::ScalarRegistry;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::{
    errors::RequestExecutionError,
    request::{BindValues, PreparedRequest},
};

#[derive(Debug)]
struct Target {
    endpoint: Url,
    client: reqwest::Client,
}

/// The endpoint and HTTP client every executor sends requests with.
///
/// Logging in or out replaces both, so that all executors sharing the slot follow the
/// session's endpoint and pick up or drop the bearer token with their next request.
#[derive(Debug, Clone)]
pub struct SharedHttpClient(Arc<RwLock<Target>>);

impl SharedHttpClient {
    pub fn new(endpoint: Url, client: reqwest::Client) -> Self {
        Self(Arc::new(RwLock::new(Target { endpoint, client })))
    }

    pub fn endpoint(&self) -> Url {
        self.0.read().unwrap_or_else(PoisonError::into_inner).endpoint.clone()
    }

    pub fn current(&self) -> (Url, reqwest::Client) {
        let target = self.0.read().unwrap_or_else(PoisonError::into_inner);
        (target.endpoint.clone(), target.client.clone())
    }

    pub fn replace(&self, endpoint: Url, client: reqwest::Client) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Target { endpoint, client };
    }
}

/// The response envelope of a GraphQL server.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Serialize)]
struct RequestBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    variables: serde_json::Map<String, serde_json::Value>,
}

/// Executes prepared requests against the endpoint of its [`SharedHttpClient`].
#[derive(Debug, Clone)]
pub struct Executor {
    http: SharedHttpClient,
    scalars: Arc<ScalarRegistry>,
}

impl Executor {
    pub fn new(http: SharedHttpClient, scalars: Arc<ScalarRegistry>) -> Self {
        Self { http, scalars }
    }

    /// The endpoint the next request goes to.
    pub fn endpoint(&self) -> Url {
        self.http.endpoint()
    }

    /// Runs `request` and decodes its result: the value of the root field for partial
    /// requests, the whole `data` object otherwise.
    ///
    /// Fails if the server reports any error.
    #[tracing::instrument(skip_all, fields(operation = request.operation().keyword(), root_field = request.root_field()))]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &PreparedRequest,
        bind: &BindValues,
    ) -> Result<T, RequestExecutionError> {
        let response = self.send(request, bind).await?;

        if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
            tracing::debug!(errors = errors.len(), "server returned errors");
            return Err(RequestExecutionError::GraphQl(errors));
        }

        let data = response.data.ok_or(RequestExecutionError::MissingData)?;

        self.decode(request, data)
    }

    /// Runs `request` and returns the whole response envelope. Errors reported by the server
    /// are returned alongside the data instead of failing the call.
    #[tracing::instrument(skip_all, fields(operation = request.operation().keyword(), root_field = request.root_field()))]
    pub async fn execute_response<T: DeserializeOwned>(
        &self,
        request: &PreparedRequest,
        bind: &BindValues,
    ) -> Result<GraphQlResponse<T>, RequestExecutionError> {
        let response = self.send(request, bind).await?;

        let data = match response.data {
            Some(data) if !data.is_null() => Some(self.decode(request, data)?),
            _ => None,
        };

        Ok(GraphQlResponse {
            data,
            errors: response.errors,
            extensions: response.extensions,
        })
    }

    async fn send(
        &self,
        request: &PreparedRequest,
        bind: &BindValues,
    ) -> Result<GraphQlResponse<serde_json::Value>, RequestExecutionError> {
        let body = RequestBody {
            query: request.document(),
            variables: request.encode_variables(bind, &self.scalars)?,
        };

        let (endpoint, client) = self.http.current();

        let response = client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(RequestExecutionError::from_send)?;

        let status = response.status();
        let text = response.text().await.map_err(RequestExecutionError::Http)?;

        if !status.is_success() {
            return Err(RequestExecutionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(RequestExecutionError::Decode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        request: &PreparedRequest,
        mut data: serde_json::Value,
    ) -> Result<T, RequestExecutionError> {
        request.shape().normalize(&mut data, &self.scalars)?;

        let value = match request.root_field() {
            Some(field) => match data {
                serde_json::Value::Object(mut object) => {
                    object.remove(field).ok_or(RequestExecutionError::MissingData)?
                }
                _ => return Err(RequestExecutionError::MissingData),
            },
            None => data,
        };

        serde_json::from_value(value).map_err(RequestExecutionError::Decode)
    }
}

/// Runs an [`Executor`] on a private single-threaded runtime.
///
/// Must not be used from within an async runtime.
#[derive(Debug)]
pub struct BlockingExecutor {
    runtime: tokio::runtime::Runtime,
    inner: Executor,
}

impl BlockingExecutor {
    pub fn new(inner: Executor) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        Ok(Self { runtime, inner })
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

    pub fn executor(&self) -> &Executor {
        &self.inner
    }
}
