//! Pre-request bearer resolution.
//!
//! `AuthLink` runs before every outgoing authenticated request and decides
//! what `Authorization` header (if any) the request carries. A cached access
//! token is used as-is; with only a refresh token cached, the link performs a
//! refresh round-trip through the bare transport and the request waits for
//! its outcome. A failed refresh clears both tokens and lets the request go
//! out unauthenticated, so the server answers with its normal auth error.

use std::sync::Arc;

use anyhow::Result;
use reqwest::header;
use tracing::{debug, warn};

use crate::api::TokenRefresher;

use super::store::{CredentialKey, CredentialStore};

pub struct AuthLink {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
}

impl AuthLink {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self { store, refresher }
    }

    /// Resolve the bearer token for one outgoing request.
    ///
    /// Returns `Ok(None)` when the request should proceed unauthenticated.
    /// Only storage-access failures surface as errors; refresh failures are
    /// absorbed here after clearing both tokens.
    pub async fn bearer(&self) -> Result<Option<String>> {
        if let Some(access) = self.store.get(CredentialKey::AccessToken).await? {
            return Ok(Some(access));
        }

        let Some(refresh) = self.store.get(CredentialKey::RefreshToken).await? else {
            debug!("No cached tokens, request proceeds unauthenticated");
            return Ok(None);
        };

        // Concurrent requests that all miss the access token each run their
        // own refresh round-trip; the last pair written wins.
        match self.refresher.refresh(&refresh).await {
            Ok(pair) => {
                let (Some(access), Some(new_refresh)) = (pair.access_token, pair.refresh_token)
                else {
                    // The refresher validates completeness; treat a partial
                    // pair the same as a failed refresh.
                    self.clear_tokens().await?;
                    return Ok(None);
                };

                self.store.set(CredentialKey::AccessToken, &access).await?;
                self.store
                    .set(CredentialKey::RefreshToken, &new_refresh)
                    .await?;
                debug!("Refreshed access token before request");
                Ok(Some(access))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing credentials");
                self.clear_tokens().await?;
                Ok(None)
            }
        }
    }

    /// Build the header map for one outgoing request, refreshing if needed.
    pub async fn headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.bearer().await? {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    async fn clear_tokens(&self) -> Result<()> {
        self.store.delete(CredentialKey::AccessToken).await?;
        self.store.delete(CredentialKey::RefreshToken).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::api::ApiError;
    use crate::auth::store::MemoryStore;
    use crate::auth::TokenPair;

    use super::*;

    /// Records every refresh call; answers with a fixed pair or a failure.
    struct FakeRefresher {
        response: Option<TokenPair>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRefresher {
        fn succeeding(access: &str, refresh: &str) -> Self {
            Self {
                response: Some(TokenPair::new(access, refresh)),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                response: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenRefresher for FakeRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
            self.calls.lock().unwrap().push(refresh_token.to_string());
            self.response
                .clone()
                .ok_or_else(|| ApiError::Graphql("refresh token revoked".to_string()))
        }
    }

    async fn store_with(access: Option<&str>, refresh: Option<&str>) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        if let Some(a) = access {
            store.set(CredentialKey::AccessToken, a).await.unwrap();
        }
        if let Some(r) = refresh {
            store.set(CredentialKey::RefreshToken, r).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_cached_access_token_attached_without_refresh() {
        let store = store_with(Some("A1"), Some("R1")).await;
        let refresher = Arc::new(FakeRefresher::succeeding("A9", "R9"));
        let link = AuthLink::new(store.clone(), refresher.clone());

        let headers = link.headers().await.unwrap();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            &header::HeaderValue::from_static("Bearer A1")
        );
        assert!(refresher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_on_missing_access_token() {
        let store = store_with(None, Some("R1")).await;
        let refresher = Arc::new(FakeRefresher::succeeding("A2", "R2"));
        let link = AuthLink::new(store.clone(), refresher.clone());

        let headers = link.headers().await.unwrap();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            &header::HeaderValue::from_static("Bearer A2")
        );

        // Both tokens persisted before the original request goes out
        assert_eq!(
            store.get(CredentialKey::AccessToken).await.unwrap(),
            Some("A2".to_string())
        );
        assert_eq!(
            store.get(CredentialKey::RefreshToken).await.unwrap(),
            Some("R2".to_string())
        );
        assert_eq!(refresher.calls(), vec!["R1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_tokens_and_degrades() {
        let store = store_with(None, Some("R0")).await;
        let refresher = Arc::new(FakeRefresher::failing());
        let link = AuthLink::new(store.clone(), refresher.clone());

        let headers = link.headers().await.unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
        assert_eq!(store.get(CredentialKey::AccessToken).await.unwrap(), None);
        assert_eq!(store.get(CredentialKey::RefreshToken).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_tokens_no_refresh_attempt() {
        let store = store_with(None, None).await;
        let refresher = Arc::new(FakeRefresher::succeeding("A2", "R2"));
        let link = AuthLink::new(store.clone(), refresher.clone());

        let headers = link.headers().await.unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
        assert!(refresher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresher_only_ever_sees_the_refresh_token() {
        // The refresh transport receives nothing but the refresh-token
        // string; in particular no bearer token crosses the seam.
        let store = store_with(None, Some("R1")).await;
        let refresher = Arc::new(FakeRefresher::succeeding("A2", "R2"));
        let link = AuthLink::new(store.clone(), refresher.clone());

        link.bearer().await.unwrap();

        assert_eq!(refresher.calls(), vec!["R1".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_misses_each_refresh() {
        // No single-flight: two concurrent requests with no cached access
        // token each run their own round-trip and both end up usable.
        let store = store_with(None, Some("R1")).await;
        let refresher = Arc::new(FakeRefresher::succeeding("A2", "R2"));
        let link = Arc::new(AuthLink::new(store.clone(), refresher.clone()));

        let (a, b) = tokio::join!(link.bearer(), link.bearer());
        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a.as_deref(), Some("A2"));
        assert!(b.is_some());
        assert!(!refresher.calls().is_empty());
    }
}
