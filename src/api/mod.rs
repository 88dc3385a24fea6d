//! GraphQL-over-HTTP client module for the Glowbook API.
//!
//! Two transports live here and must stay separate:
//! - `ApiClient`: the shared authenticated client; every dispatch resolves a
//!   bearer token through the auth link first.
//! - `RefreshClient`: a bare client used only for the credential refresh
//!   mutation. It never attaches an Authorization header and has no path to
//!   the auth link, which is what keeps the refresh from intercepting itself.

pub mod client;
pub mod error;
pub mod refresh;

pub use client::ApiClient;
pub use error::ApiError;
pub use refresh::{RefreshClient, TokenRefresher};
