//! Command execution context
//!
//! Loads configuration, restores the session and wires the authenticated
//! client so handlers don't repeat that boilerplate.

use std::sync::Arc;

use crate::cli::{GlobalOptions, OutputFormat};
use crate::client::{CatatanClient, HttpRefresher, RequestGateway};
use crate::config::Config;
use crate::error::{Result, SessionError};
use crate::session::{FileStorage, SessionStore};

/// Context for command execution containing config, session and client.
pub struct CommandContext {
    /// Loaded configuration with environment overrides applied
    pub config: Config,
    /// Session restored from disk; also told about refreshes and expiry
    pub session: Arc<SessionStore>,
    /// API client sharing the session's bearer token
    pub client: Arc<CatatanClient>,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Build the context without requiring a session.
    pub async fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?;
        let storage = Arc::new(FileStorage::new(config.session_path()?));
        let session = Arc::new(SessionStore::init(storage));

        let endpoints = config.endpoints();
        let http = RequestGateway::http_client(config.timeout())?;
        let refresher = Arc::new(HttpRefresher::new(http.clone(), &endpoints.auth_api_url));
        let gateway = RequestGateway::new(http, endpoints.api_url.clone(), refresher)
            .with_listener(session.clone());
        gateway.set_token(session.token()).await;

        let client = Arc::new(CatatanClient::new(Arc::new(gateway), &endpoints));

        Ok(Self {
            config,
            session,
            client,
            format: opts.format,
        })
    }

    /// Build the context, failing when nobody is logged in.
    pub async fn authenticated(opts: &GlobalOptions) -> Result<Self> {
        let ctx = Self::new(opts).await?;
        ctx.require_session()?;
        Ok(ctx)
    }

    pub fn require_session(&self) -> Result<()> {
        if self.session.token().is_none() {
            return Err(SessionError::NotLoggedIn.into());
        }
        Ok(())
    }
}
