//! API client for the Glowbook GraphQL endpoint.
//!
//! All operations go over a single HTTP POST transport carrying the usual
//! `query`/`operationName`/`variables` envelope. Before each dispatch the
//! client asks the auth link for a bearer token, which may suspend the
//! request on a refresh round-trip; the request is never sent while that
//! refresh is outstanding.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::auth::AuthLink;
use crate::config::Config;
use crate::models::UserProfile;

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const CURRENT_USER_QUERY: &str = "\
query CurrentUser {
  currentUser {
    id
    firstName
    lastName
    email
    phone
    avatarUrl
    city
    country
    loyaltyPoints
    favoriteSalonIds
    bookingIds
    reviewIds
    memberSince
  }
}";

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CurrentUserData {
    #[serde(rename = "currentUser")]
    current_user: UserProfile,
}

/// Shared client for all authenticated API traffic.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: String,
    link: Arc<AuthLink>,
}

impl ApiClient {
    /// Create the client. Done once at process start; consumers share clones.
    pub fn new(config: &Config, link: Arc<AuthLink>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_url.clone(),
            link,
        })
    }

    /// Execute a query operation, decoding `data` into `T`.
    pub async fn query<T, V>(&self, operation_name: &str, query: &str, variables: &V) -> Result<T>
    where
        T: DeserializeOwned,
        V: Serialize + ?Sized,
    {
        self.execute(operation_name, query, variables).await
    }

    /// Execute a mutation operation, decoding `data` into `T`.
    pub async fn mutate<T, V>(&self, operation_name: &str, query: &str, variables: &V) -> Result<T>
    where
        T: DeserializeOwned,
        V: Serialize + ?Sized,
    {
        self.execute(operation_name, query, variables).await
    }

    async fn execute<T, V>(&self, operation_name: &str, query: &str, variables: &V) -> Result<T>
    where
        T: DeserializeOwned,
        V: Serialize + ?Sized,
    {
        // Bearer resolution happens first and the request waits for it,
        // including any refresh round-trip behind it.
        let headers = self.link.headers().await?;

        let body = serde_json::json!({
            "operationName": operation_name,
            "query": query,
            "variables": variables,
        });

        debug!(operation = operation_name, "Dispatching API operation");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send operation {}", operation_name))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &text).into());
        }

        let envelope: GraphqlEnvelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response for {}", operation_name))?;

        Self::unwrap_envelope(envelope, operation_name)
    }

    fn unwrap_envelope<T>(envelope: GraphqlEnvelope<T>, operation_name: &str) -> Result<T> {
        if let Some(err) = envelope.errors.first() {
            return Err(ApiError::Graphql(err.message.clone()).into());
        }
        envelope.data.ok_or_else(|| {
            ApiError::InvalidResponse(format!("Operation {} returned no data", operation_name))
                .into()
        })
    }

    /// Fetch the authenticated user's profile snapshot.
    /// Callers hand the result to `SessionContext::set_user`.
    pub async fn fetch_current_user(&self) -> Result<UserProfile> {
        let data: CurrentUserData = self
            .query("CurrentUser", CURRENT_USER_QUERY, &serde_json::json!({}))
            .await?;
        Ok(data.current_user)
    }
}
