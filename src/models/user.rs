use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Denormalized snapshot of the authenticated user.
///
/// This mirrors the shape returned by the API's `currentUser` query. It is
/// overwritten wholesale on every successful profile fetch, never merged
/// field-by-field, so the cached copy in the credential store may lag the
/// server but is always internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "loyaltyPoints", default)]
    pub loyalty_points: i64,
    #[serde(rename = "favoriteSalonIds", default)]
    pub favorite_salon_ids: Vec<String>,
    #[serde(rename = "bookingIds", default)]
    pub booking_ids: Vec<String>,
    #[serde(rename = "reviewIds", default)]
    pub review_ids: Vec<String>,
    #[serde(rename = "memberSince")]
    pub member_since: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
