//! The gateway service.
//!
//! [`Gateway`] exposes the four operations the HTTP boundary calls: `login`,
//! `logout`, `validate_session` and `api_proxy`. Each one reads the session
//! named by the client's token, decides, and writes the result back while
//! holding a [`SessionLease`](crate::session::SessionLease) for its whole
//! duration. The returned [`SessionBound`] tells the boundary which token
//! and lifetime the client should hold afterwards.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ReqwestUpstream, UpstreamClient};
use crate::auth::{AuthManager, AuthOutcome, Credentials, DirectoryModule, LocalFileModule};
use crate::config::{GatewayConfig, StoreConfig};
use crate::error::{GatewayError, Result};
use crate::routes::RouteTable;
use crate::session::{
    FileSessionStore, LockMode, MemorySessionStore, SessionLocks, SessionRecord, SessionStatus,
    SessionStore, SessionValidator,
};

/// Message of every accepted login, whichever path accepted it.
pub const LOGIN_SUCCESS: &str = "Success";

/// The token and lifetime a client should hold after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    pub token: String,
    pub max_age: i64,
}

impl SessionTicket {
    fn of(record: &SessionRecord) -> Self {
        Self {
            token: record.token.clone(),
            max_age: record.max_age,
        }
    }

    /// The client should drop its token.
    pub fn is_terminated(&self) -> bool {
        self.max_age < 0
    }
}

/// An operation's result plus the session state to hand back to the client.
/// `session` is `None` when the operation left the client's session alone.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionBound<T> {
    pub value: T,
    pub session: Option<SessionTicket>,
}

impl<T> SessionBound<T> {
    fn saved(value: T, record: &SessionRecord) -> Self {
        Self {
            value,
            session: Some(SessionTicket::of(record)),
        }
    }

    fn untouched(value: T) -> Self {
        Self { value, session: None }
    }
}

/// Body of the login and validate responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginReply {
    pub authenticated: bool,
    pub message: String,
    pub username: String,
}

impl LoginReply {
    fn from_outcome(outcome: AuthOutcome, username: Option<&str>) -> Self {
        Self {
            authenticated: outcome.authenticated,
            message: outcome.message,
            username: username.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyReply {
    /// Body of a 200 answer from the backend.
    Forwarded(Vec<u8>),
    /// The session is not authenticated and the route is not public.
    Unauthenticated,
}

/// One inbound API call to be proxied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl GatewayRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: None,
            body: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

pub struct Gateway {
    store: Arc<dyn SessionStore>,
    auth: AuthManager,
    validator: SessionValidator,
    routes: RouteTable,
    upstream: Arc<dyn UpstreamClient>,
    locks: SessionLocks,
}

impl Gateway {
    pub fn new(
        store: Arc<dyn SessionStore>,
        auth: AuthManager,
        validator: SessionValidator,
        routes: RouteTable,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            store,
            auth,
            validator,
            routes,
            upstream,
            locks: SessionLocks::new(LockMode::default()),
        }
    }

    pub fn with_lock_mode(mut self, mode: LockMode) -> Self {
        self.locks = SessionLocks::new(mode);
        self
    }

    /// Build a gateway from configuration, loading the route and credential
    /// files once.
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let max_age = config.session.max_age_secs;
        let store: Arc<dyn SessionStore> = match &config.session.store {
            StoreConfig::Memory => Arc::new(MemorySessionStore::new(max_age)),
            StoreConfig::File { dir } => Arc::new(
                FileSessionStore::new(dir.clone(), max_age)
                    .with_context(|| format!("Failed to open session directory: {}", dir.display()))?,
            ),
        };

        let mut auth = AuthManager::default();
        if config.directory.enabled {
            auth.push(Arc::new(DirectoryModule::new(&config.directory)));
        }
        auth.push(Arc::new(LocalFileModule::from_file(&config.local_auth_file)?));

        let routes = RouteTable::from_file(&config.routes_file)?;
        let upstream = Arc::new(ReqwestUpstream::new(config.upstream_timeout())?);

        info!(
            modules = ?auth.module_names(),
            routes = routes.len(),
            lock_mode = ?config.session.lock_mode,
            "Gateway configured"
        );

        Ok(Self::new(
            store,
            auth,
            SessionValidator::from_minutes(config.session.timeout_minutes),
            routes,
            upstream,
        )
        .with_lock_mode(config.session.lock_mode))
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn lock_mode(&self) -> LockMode {
        self.locks.mode()
    }

    /// Authenticate, or confirm an already valid session.
    ///
    /// A valid session keeps its stored identity and only has its login time
    /// refreshed; otherwise the credentials go through the module chain. A
    /// rejected login terminates the session.
    pub async fn login(
        &self,
        token: Option<&str>,
        credentials: &Credentials,
    ) -> Result<SessionBound<LoginReply>> {
        let _lease = self.locks.acquire(token).await;
        let (mut session, status) = self.open(token).await?;

        let reply = match status {
            SessionStatus::Valid { username } => {
                debug!(session = session.log_id(), username = %username, "Login on valid session");
                session.touch(Utc::now());
                LoginReply::from_outcome(AuthOutcome::success(LOGIN_SUCCESS), Some(&username))
            }
            _ => {
                let outcome = self.auth.authenticate(credentials).await?;
                if outcome.authenticated && !credentials.username.is_empty() {
                    session.mark_authenticated(&credentials.username, Utc::now());
                    info!(username = %credentials.username, session = session.log_id(), "Login succeeded");
                    LoginReply::from_outcome(AuthOutcome::success(LOGIN_SUCCESS), Some(&credentials.username))
                } else {
                    info!(username = %credentials.username, "Login rejected");
                    session.terminate();
                    LoginReply::from_outcome(AuthOutcome::invalid_credentials(), None)
                }
            }
        };

        self.store.save(&session).await?;
        Ok(SessionBound::saved(reply, &session))
    }

    /// Terminate the session. Logging out twice is not an error.
    pub async fn logout(&self, token: Option<&str>) -> Result<SessionBound<()>> {
        let _lease = self.locks.acquire(token).await;
        let mut session = self.store.get(token).await?;

        if let Some(username) = session.username() {
            info!(username = %username, session = session.log_id(), "Logout");
        }
        session.terminate();
        self.store.save(&session).await?;
        Ok(SessionBound::saved((), &session))
    }

    pub async fn validate_session(&self, token: Option<&str>) -> Result<SessionBound<LoginReply>> {
        let _lease = self.locks.acquire(token).await;
        let (mut session, status) = self.open(token).await?;

        let reply = LoginReply::from_outcome(status.outcome(), status.username());
        if status.is_valid() {
            session.touch(Utc::now());
        } else {
            debug!(session = session.log_id(), status = ?status, "Session not valid");
            session.terminate();
        }

        self.store.save(&session).await?;
        Ok(SessionBound::saved(reply, &session))
    }

    /// Forward an API call for the session.
    ///
    /// Authenticated sessions are refreshed once the backend answered 200.
    /// Public routes are reachable without a session; a stored session that
    /// is no longer valid is terminated whichever route it calls.
    pub async fn api_proxy(
        &self,
        token: Option<&str>,
        request: &GatewayRequest,
    ) -> Result<SessionBound<ProxyReply>> {
        let _lease = self.locks.acquire(token).await;
        let (mut session, status) = self.open(token).await?;

        if status.is_valid() {
            let body = self.dispatch(request).await?;
            session.touch(Utc::now());
            self.store.save(&session).await?;
            return Ok(SessionBound::saved(ProxyReply::Forwarded(body), &session));
        }

        if self.is_public(request) {
            debug!(path = %request.path, method = %request.method, "Forwarding public route");
            if status == SessionStatus::New {
                let body = self.dispatch(request).await?;
                return Ok(SessionBound::untouched(ProxyReply::Forwarded(body)));
            }
            // A stale session still ends here, even though the route is open
            session.terminate();
            self.store.save(&session).await?;
            let body = self.dispatch(request).await?;
            return Ok(SessionBound::saved(ProxyReply::Forwarded(body), &session));
        }

        debug!(
            path = %request.path,
            session = session.log_id(),
            status = ?status,
            "Rejecting unauthenticated API call"
        );
        session.terminate();
        self.store.save(&session).await?;
        Ok(SessionBound::saved(ProxyReply::Unauthenticated, &session))
    }

    /// Resolve the route, call the backend and map its status.
    pub async fn dispatch(&self, request: &GatewayRequest) -> Result<Vec<u8>> {
        let route = self
            .routes
            .resolve(&request.path, request.query.as_deref(), &request.method)?;
        let body = if route.method.carries_body() {
            request.body.clone()
        } else {
            None
        };

        let response = self.upstream.call(route.method, &route.url, body).await?;
        let status = response.status;
        ApiError::from_status(status, response.body).map_err(|err| {
            warn!(url = %route.url, status = status, error = %err, "Upstream call failed");
            GatewayError::from(err)
        })
    }

    fn is_public(&self, request: &GatewayRequest) -> bool {
        matches!(
            self.routes.resolve(&request.path, request.query.as_deref(), &request.method),
            Ok(route) if !route.rule.authorization_required
        )
    }

    /// Load the session and decide its status. A corrupt session is removed
    /// before the error is returned.
    async fn open(&self, token: Option<&str>) -> Result<(SessionRecord, SessionStatus)> {
        let mut session = self.store.get(token).await?;
        match self.validator.validate(&session) {
            Ok(status) => Ok((session, status)),
            Err(err) => {
                warn!(session = session.log_id(), error = %err, "Terminating corrupt session");
                session.terminate();
                self.store.save(&session).await?;
                Err(err)
            }
        }
    }
}
