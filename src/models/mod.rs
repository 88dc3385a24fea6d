//! Data models shared across the client core.
//!
//! Currently this is just `UserProfile`, the denormalized snapshot of the
//! authenticated user that the session context owns and caches.

pub mod user;

pub use user::UserProfile;
