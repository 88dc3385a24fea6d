//! Credential refresh over a bare, unauthenticated transport.
//!
//! The refresh round-trip must never carry an `Authorization` header: if it
//! went through the authenticated client it would be intercepted, find no
//! access token, and trigger another refresh. `RefreshClient` therefore owns
//! its own `reqwest::Client` and knows nothing about the auth link; the only
//! credential it ever sees is the refresh-token string passed in.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::auth::TokenPair;
use crate::config::Config;

use super::ApiError;

/// HTTP request timeout in seconds for the refresh round-trip.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const REFRESH_MUTATION: &str = "\
mutation RefreshToken($refreshToken: String!) {
  refreshToken(refreshToken: $refreshToken) {
    accessToken
    refreshToken
  }
}";

/// Exchanges a refresh token for a new access/refresh pair.
///
/// The seam exists so the auth link and session context can be exercised
/// without a network; `RefreshClient` is the production implementation.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
}

#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
    data: Option<RefreshData>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    #[serde(rename = "refreshToken")]
    refresh_token: Option<TokenPair>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

/// Bare HTTP transport for the refresh mutation.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RefreshClient {
    client: Client,
    endpoint: String,
}

impl RefreshClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl TokenRefresher for RefreshClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let body = serde_json::json!({
            "operationName": "RefreshToken",
            "query": REFRESH_MUTATION,
            "variables": { "refreshToken": refresh_token },
        });

        debug!("Sending token refresh request");

        // Deliberately no Authorization header on this request.
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &text));
        }

        let envelope: RefreshEnvelope = response.json().await?;

        if let Some(err) = envelope.errors.first() {
            return Err(ApiError::Graphql(err.message.clone()));
        }

        let pair = envelope
            .data
            .and_then(|d| d.refresh_token)
            .ok_or_else(|| {
                ApiError::InvalidResponse("Refresh response missing token pair".to_string())
            })?;

        if !pair.is_complete() {
            return Err(ApiError::InvalidResponse(
                "Refresh response returned a partial token pair".to_string(),
            ));
        }

        debug!("Token refresh succeeded");
        Ok(pair)
    }
}
