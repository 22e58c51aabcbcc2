use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::UserId;

/// Account owned by the identity side; the ledger only reads its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub onboarding_completed_at: Option<DateTime<Utc>>,
}
