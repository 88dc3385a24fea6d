//! Authentication module for managing the user session and credentials.
//!
//! This module provides:
//! - `CredentialStore`: secure key-value persistence for tokens and the
//!   cached profile (`KeyringStore` in production, `MemoryStore` for tests)
//! - `AuthLink`: per-request bearer attachment with transparent refresh
//! - `SessionContext`: the process-wide session lifecycle and snapshot
//!
//! Tokens are opaque bearer credentials; only their presence is inspected.

pub mod link;
pub mod session;
pub mod store;
pub mod tokens;

pub use link::AuthLink;
pub use session::SessionContext;
pub use store::{CredentialKey, CredentialStore, KeyringStore, MemoryStore};
pub use tokens::{SessionState, TokenPair};
