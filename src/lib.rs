//! Glowbook core - client library for the Glowbook salon booking app.
//!
//! This crate owns the session/token subsystem and the shared API client:
//! secure credential storage, transparent access-token refresh, and the
//! process-wide session lifecycle. Screens and view code live in the app
//! layers above and only see `SessionContext` and `ApiClient`.
//!
//! Typical wiring at process start:
//!
//! ```rust,no_run
//! # async fn start() -> anyhow::Result<()> {
//! use glowbook_core::{Config, Glowbook};
//!
//! let config = Config::load()?;
//! let core = Glowbook::new(&config)?;
//! core.session.initialize().await?;
//!
//! if core.session.is_authenticated() {
//!     let user = core.api.fetch_current_user().await?;
//!     core.session.set_user(user).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

use std::sync::Arc;

use anyhow::Result;

pub use api::{ApiClient, ApiError, RefreshClient, TokenRefresher};
pub use auth::{AuthLink, CredentialStore, KeyringStore, MemoryStore, SessionContext, SessionState, TokenPair};
pub use config::Config;
pub use models::UserProfile;

/// Process-wide handles, wired once at startup and shared by reference.
pub struct Glowbook {
    pub session: Arc<SessionContext>,
    pub api: ApiClient,
}

impl Glowbook {
    /// Wire the production stack: keychain-backed store, bare refresh
    /// transport, auth link, session context, shared API client.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_store(config, Arc::new(KeyringStore::new()))
    }

    /// Same wiring with a caller-supplied store (tests, ephemeral sessions).
    pub fn with_store(config: &Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let refresher: Arc<dyn TokenRefresher> = Arc::new(RefreshClient::new(config)?);
        let link = Arc::new(AuthLink::new(store.clone(), refresher.clone()));
        let session = Arc::new(SessionContext::new(store, refresher));
        let api = ApiClient::new(config, link)?;
        Ok(Self { session, api })
    }
}
