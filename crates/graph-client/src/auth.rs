use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use graph_client_schema::{DirectiveRegistry, OperationKind, ScalarRegistry, TypeTable};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::{
    config::ClientConfig,
    errors::{AuthError, RequestExecutionError},
    executor::{Executor, SharedHttpClient},
    request::{BindValues, PreparedRequest, RequestContext},
};

const AUTH_SCHEMA: &str = include_str!("auth.graphql");

const LOGIN_SELECTION: &str =
    "{ token user { id username firstName lastName authorities(aggregation: ALL, format: SHORT) } }";

/// The user a session belongs to, as returned by the login mutation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Short names of every authority granted to the user, directly or through groups
    pub authorities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    token: Option<String>,
    user: Option<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    url: Url,
    username: String,
}

#[derive(Debug, Default)]
struct Session {
    identity: Option<Identity>,
    token: Option<SecretString>,
    user: Option<UserProfile>,
}

/// Logs in with the login mutation and keeps the resulting bearer token, and the endpoint it
/// is valid for, on the shared HTTP client.
///
/// Holds at most one session. Logging in again with the same endpoint and username is a
/// no-op; switching to another identity requires a logout first.
#[derive(Debug)]
pub struct Authenticator {
    config: Arc<ClientConfig>,
    http: SharedHttpClient,
    scalars: Arc<ScalarRegistry>,
    directives: Arc<DirectiveRegistry>,
    session: RwLock<Session>,
    transitions: tokio::sync::Mutex<()>,
    login_request: OnceLock<PreparedRequest>,
}

impl Authenticator {
    pub fn new(
        config: Arc<ClientConfig>,
        http: SharedHttpClient,
        scalars: Arc<ScalarRegistry>,
        directives: Arc<DirectiveRegistry>,
    ) -> Self {
        Self {
            config,
            http,
            scalars,
            directives,
            session: RwLock::new(Session::default()),
            transitions: tokio::sync::Mutex::new(()),
            login_request: OnceLock::new(),
        }
    }

    /// Logs `username` in on `url`, or on the configured endpoint.
    ///
    /// Returns whether the server issued a token.
    #[tracing::instrument(skip(self, url, password), fields(endpoint))]
    pub async fn login(&self, url: Option<Url>, username: &str, password: &SecretString) -> Result<bool, AuthError> {
        let _transition = self.transitions.lock().await;

        let url = url.unwrap_or_else(|| self.config.endpoint.clone());
        tracing::Span::current().record("endpoint", tracing::field::display(&url));

        if let Some(current) = self.current_identity() {
            if current.url == url && current.username == username {
                tracing::debug!("already logged in");
                return Ok(true);
            }

            return Err(AuthError::IdentitySwitch {
                current: current.username,
                current_url: current.url,
                requested: username.to_string(),
                requested_url: url,
            });
        }

        let request = self.login_request()?;
        let bind = BindValues::new()
            .with("username", username)
            .with("password", password.expose_secret().as_str());

        let (_, client) = self.http.current();
        let executor = Executor::new(SharedHttpClient::new(url.clone(), client), self.scalars.clone());
        let payload = executor
            .execute::<Option<AuthPayload>>(request, &bind)
            .await
            .map_err(|error| login_failure(username, error))?;

        let Some(AuthPayload { token: Some(token), user }) = payload else {
            tracing::warn!("the server issued no token");
            return Ok(false);
        };

        let client = self
            .config
            .authenticated_http_client(&token)
            .map_err(AuthError::HttpClient)?;
        self.http.replace(url.clone(), client);

        *self.session_mut() = Session {
            identity: Some(Identity {
                url,
                username: username.to_string(),
            }),
            token: Some(SecretString::new(token)),
            user,
        };

        tracing::info!("logged in");

        Ok(true)
    }

    /// Drops the session and the bearer token. Does nothing when logged out.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        let _transition = self.transitions.lock().await;

        if !self.is_authenticated() {
            tracing::debug!("not logged in, nothing to do");
            return Ok(());
        }

        let client = self.config.http_client().map_err(AuthError::HttpClient)?;
        self.http.replace(self.config.endpoint.clone(), client);

        *self.session_mut() = Session::default();

        tracing::info!("logged out");

        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().token.is_some()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.session().user.clone()
    }

    /// The username of the current session.
    pub fn username(&self) -> Option<String> {
        self.current_identity().map(|identity| identity.username)
    }

    fn current_identity(&self) -> Option<Identity> {
        let session = self.session();
        session.token.as_ref().and(session.identity.clone())
    }

    fn login_request(&self) -> Result<&PreparedRequest, AuthError> {
        if let Some(request) = self.login_request.get() {
            return Ok(request);
        }

        let types = TypeTable::from_sdl(AUTH_SCHEMA, &self.scalars)?;
        let ctx = RequestContext::with_registries(types, self.scalars.clone(), self.directives.clone());
        let request = PreparedRequest::partial(&ctx, OperationKind::Mutation, "login", LOGIN_SELECTION)?;

        Ok(self.login_request.get_or_init(|| request))
    }

    fn session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_mut(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn login_failure(username: &str, error: RequestExecutionError) -> AuthError {
    let username = username.to_string();

    match error {
        RequestExecutionError::Connection(_) | RequestExecutionError::Http(_) => AuthError::Unreachable {
            username,
            source: error,
        },
        source => AuthError::Rejected { username, source },
    }
}
