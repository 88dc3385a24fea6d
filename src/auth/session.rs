//! Process-wide session state and lifecycle.
//!
//! `SessionContext` owns the in-memory mirror of the persisted credentials
//! and profile. It is created once at process start, `initialize`d to settle
//! the Loading state, and then shared by reference with every consumer.
//! Snapshot reads are synchronous; only the lifecycle operations touch
//! storage or the network.

use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::TokenRefresher;
use crate::models::UserProfile;

use super::store::{CredentialKey, CredentialStore};
use super::tokens::SessionState;

struct SessionInner {
    state: SessionState,
    user: Option<UserProfile>,
}

pub struct SessionContext {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    inner: RwLock<SessionInner>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            inner: RwLock::new(SessionInner {
                state: SessionState::Loading,
                user: None,
            }),
        }
    }

    /// Settle the startup Loading state from persisted credentials.
    ///
    /// A persisted access token authenticates directly. With only a refresh
    /// token, one refresh round-trip decides: success persists the new pair
    /// and authenticates, failure clears both tokens and lands on Anonymous.
    pub async fn initialize(&self) -> Result<SessionState> {
        let state = self.rehydrate().await?;
        if state == SessionState::Authenticated {
            // Cold-start rehydration of the cached profile; staleness is
            // acceptable, the next profile fetch overwrites it wholesale.
            let user = self.load_cached_user().await?;
            let mut inner = self.inner.write().unwrap();
            inner.state = state;
            inner.user = user;
        } else {
            self.inner.write().unwrap().state = state;
        }
        info!(state = %state, "Session initialized");
        Ok(state)
    }

    async fn rehydrate(&self) -> Result<SessionState> {
        if self
            .store
            .get(CredentialKey::AccessToken)
            .await?
            .is_some()
        {
            return Ok(SessionState::Authenticated);
        }

        let Some(refresh) = self.store.get(CredentialKey::RefreshToken).await? else {
            return Ok(SessionState::Anonymous);
        };

        match self.refresher.refresh(&refresh).await {
            Ok(pair) if pair.is_complete() => {
                self.store
                    .set(
                        CredentialKey::AccessToken,
                        pair.access_token.as_deref().unwrap_or_default(),
                    )
                    .await?;
                self.store
                    .set(
                        CredentialKey::RefreshToken,
                        pair.refresh_token.as_deref().unwrap_or_default(),
                    )
                    .await?;
                debug!("Startup refresh succeeded");
                Ok(SessionState::Authenticated)
            }
            Ok(_) | Err(_) => {
                warn!("Startup refresh failed, starting anonymous");
                self.store.delete(CredentialKey::AccessToken).await?;
                self.store.delete(CredentialKey::RefreshToken).await?;
                Ok(SessionState::Anonymous)
            }
        }
    }

    /// Persist the issued tokens and profile, then commit them in memory.
    ///
    /// If any persistence step fails the in-memory state is left untouched
    /// and the error propagates; the caller never observes a half-updated
    /// session snapshot.
    pub async fn login(
        &self,
        access_token: &str,
        refresh_token: &str,
        user: UserProfile,
    ) -> Result<()> {
        self.store
            .set(CredentialKey::AccessToken, access_token)
            .await?;
        self.store
            .set(CredentialKey::RefreshToken, refresh_token)
            .await?;
        let serialized =
            serde_json::to_string(&user).context("Failed to serialize user profile")?;
        self.store
            .set(CredentialKey::CurrentUser, &serialized)
            .await?;

        let mut inner = self.inner.write().unwrap();
        inner.state = SessionState::Authenticated;
        inner.user = Some(user);
        info!("Login committed");
        Ok(())
    }

    /// Clear the session. Idempotent, purely local, no server round-trip.
    pub async fn logout(&self) -> Result<()> {
        {
            let mut inner = self.inner.write().unwrap();
            inner.state = SessionState::Anonymous;
            inner.user = None;
        }

        self.store.delete(CredentialKey::AccessToken).await?;
        self.store.delete(CredentialKey::RefreshToken).await?;
        self.store.delete(CredentialKey::CurrentUser).await?;
        info!("Logged out");
        Ok(())
    }

    /// Overwrite the profile snapshot wholesale. Token state is untouched.
    pub async fn set_user(&self, user: UserProfile) -> Result<()> {
        let serialized =
            serde_json::to_string(&user).context("Failed to serialize user profile")?;
        self.store
            .set(CredentialKey::CurrentUser, &serialized)
            .await?;
        self.inner.write().unwrap().user = Some(user);
        Ok(())
    }

    /// Rehydrate the profile from the persisted cache.
    ///
    /// Returns `None` if no profile was ever cached. Does not touch the
    /// Authenticated/Anonymous classification.
    pub async fn refresh_user(&self) -> Result<Option<UserProfile>> {
        let user = self.load_cached_user().await?;
        if let Some(ref u) = user {
            self.inner.write().unwrap().user = Some(u.clone());
        }
        Ok(user)
    }

    /// Read the cached profile. Storage failures propagate; an unparseable
    /// cache entry counts as never populated, so a corrupt cache cannot
    /// wedge startup in the Loading state. The next successful profile
    /// fetch overwrites it wholesale anyway.
    async fn load_cached_user(&self) -> Result<Option<UserProfile>> {
        match self.store.get(CredentialKey::CurrentUser).await? {
            Some(serialized) => match serde_json::from_str(&serialized) {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    warn!(error = %e, "Ignoring unparseable cached user profile");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    // ===== Snapshot reads (synchronous, no I/O) =====

    pub fn state(&self) -> SessionState {
        self.inner.read().unwrap().state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.read().unwrap().user.clone()
    }
}
