//! Type aliases for entity IDs. All are UUIDs; validation happens at parse boundaries (e.g. Uuid::parse_str).

use uuid::Uuid;

pub type UserId = Uuid;
pub type WalletId = Uuid;
pub type TransactionId = Uuid;
pub type PlanId = Uuid;
pub type SubscriptionId = Uuid;
pub type NotificationId = Uuid;

/// Parse a string into a UUID or return an error message. Use at API boundaries.
pub fn parse_uuid(id: &str, name: &str) -> Result<Uuid, String> {
    Uuid::parse_str(id.trim()).map_err(|e| format!("Invalid {}: {}", name, e))
}
