use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TransactionId, UserId, WalletId};

/// Per-user balance of AI-usage credits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance: i64,
    pub lifetime_added: i64,
    pub lifetime_spent: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Fresh wallet with every counter at zero, as created at signup.
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: WalletId::new_v4(),
            user_id,
            balance: 0,
            lifetime_added: 0,
            lifetime_spent: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditTransactionType {
    /// Credits granted by a plan (trial or renewal).
    Subscription,
    Purchase,
    /// Credits consumed by AI usage. Always a negative amount.
    Usage,
    Bonus,
    Refund,
}

impl CreditTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditTransactionType::Subscription => "SUBSCRIPTION",
            CreditTransactionType::Purchase => "PURCHASE",
            CreditTransactionType::Usage => "USAGE",
            CreditTransactionType::Bonus => "BONUS",
            CreditTransactionType::Refund => "REFUND",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUBSCRIPTION" => Some(CreditTransactionType::Subscription),
            "PURCHASE" => Some(CreditTransactionType::Purchase),
            "USAGE" => Some(CreditTransactionType::Usage),
            "BONUS" => Some(CreditTransactionType::Bonus),
            "REFUND" => Some(CreditTransactionType::Refund),
            _ => None,
        }
    }
}

impl std::fmt::Display for CreditTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable ledger entry. `balance_after` is the wallet balance right after `amount` was applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    pub id: TransactionId,
    pub wallet_id: WalletId,
    pub amount: i64,
    pub balance_after: i64,
    #[serde(rename = "type")]
    pub kind: CreditTransactionType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// What a successful wallet mutation hands back to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditReceipt {
    pub wallet_id: WalletId,
    pub transaction_id: TransactionId,
    pub new_balance: i64,
}
