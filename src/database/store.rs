//! Persistence seam for the ledger core.
//!
//! Handlers and services only ever see `&dyn LedgerStore`. Every method is a single unit of
//! work: backends must apply the writes of one call atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    CreditReceipt, CreditTransaction, CreditTransactionType, Notification, NotificationId,
    NotificationType, PlanId, Subscription, SubscriptionPlan, SubscriptionStatus, User,
    UserId, UserProfile, Wallet, WalletId,
};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt row: {0}")]
    Decode(String),

    #[error("{0} would overflow")]
    Overflow(&'static str),
}

pub type DbResult<T> = Result<T, DbError>;

#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// Fields left as `None` keep their stored value.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct NewPlan {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub included_ai_credits: i64,
}

#[derive(Clone, Debug)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub trial_ends_at: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
}

/// Outcome of a guarded balance decrement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebitResult {
    Applied(CreditReceipt),
    NoWallet,
    Insufficient { balance: i64 },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>>;

    /// Create the user and its zeroed wallet together. Duplicate email is `DbError::Conflict`.
    async fn create_user_with_wallet(&self, user: NewUser) -> DbResult<(User, Wallet)>;

    /// `DbError::NotFound` when the user does not exist.
    async fn upsert_profile(&self, user_id: UserId, update: ProfileUpdate) -> DbResult<UserProfile>;

    async fn find_wallet(&self, user_id: UserId) -> DbResult<Option<Wallet>>;

    /// Newest first.
    async fn list_transactions(&self, wallet_id: WalletId, limit: i64) -> DbResult<Vec<CreditTransaction>>;

    /// Increment balance and `lifetime_added` by `amount` and append the ledger entry.
    /// `None` when the user has no wallet; nothing is written then. A counter that would
    /// overflow is `DbError::Overflow` and leaves the wallet unchanged.
    async fn credit_wallet(
        &self,
        user_id: UserId,
        amount: i64,
        kind: CreditTransactionType,
        description: String,
    ) -> DbResult<Option<CreditReceipt>>;

    /// Decrement balance by `amount` (> 0) only if it stays non-negative, bump
    /// `lifetime_spent` and append a ledger entry of `-amount`.
    async fn debit_wallet(
        &self,
        user_id: UserId,
        amount: i64,
        kind: CreditTransactionType,
        description: String,
    ) -> DbResult<DebitResult>;

    /// Active plans, cheapest first.
    async fn list_plans(&self) -> DbResult<Vec<SubscriptionPlan>>;

    async fn find_plan_by_slug(&self, slug: &str) -> DbResult<Option<SubscriptionPlan>>;

    async fn count_plans(&self) -> DbResult<i64>;

    async fn insert_plan(&self, plan: NewPlan) -> DbResult<SubscriptionPlan>;

    async fn create_subscription(&self, subscription: NewSubscription) -> DbResult<Subscription>;

    /// Newest first.
    async fn list_subscriptions(&self, user_id: UserId) -> DbResult<Vec<Subscription>>;

    /// Move TRIALING subscriptions whose trial ended at or before `now` to ACTIVE.
    async fn end_expired_trials(&self, now: DateTime<Utc>) -> DbResult<u64>;

    async fn create_notification(&self, notification: NewNotification) -> DbResult<Notification>;

    /// Newest first.
    async fn list_notifications(&self, user_id: UserId) -> DbResult<Vec<Notification>>;

    /// `false` when no such notification exists.
    async fn mark_notification_read(&self, id: NotificationId) -> DbResult<bool>;

    /// Release connections. Called once at shutdown.
    async fn close(&self);
}
