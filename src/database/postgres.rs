use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::store::{
    DbError, DbResult, DebitResult, LedgerStore, NewNotification, NewPlan, NewSubscription,
    NewUser, ProfileUpdate,
};
use crate::models::{
    CreditReceipt, CreditTransaction, CreditTransactionType, Notification, NotificationId,
    NotificationType, Subscription, SubscriptionPlan, SubscriptionStatus, User, UserId,
    UserProfile, Wallet, WalletId,
};

/// Postgres-backed store. Multi-row writes run inside one sqlx transaction.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode_error(what: &str, value: &str) -> sqlx::Error {
    sqlx::Error::Decode(format!("unknown {} '{}'", what, value).into())
}

impl<'r> sqlx::FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for UserProfile {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            company_name: row.try_get("company_name")?,
            industry: row.try_get("industry")?,
            onboarding_completed_at: row.try_get("onboarding_completed_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Wallet {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            balance: row.try_get("balance")?,
            lifetime_added: row.try_get("lifetime_added")?,
            lifetime_spent: row.try_get("lifetime_spent")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for CreditTransaction {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("type")?;
        Ok(Self {
            id: row.try_get("id")?,
            wallet_id: row.try_get("wallet_id")?,
            amount: row.try_get("amount")?,
            balance_after: row.try_get("balance_after")?,
            kind: CreditTransactionType::from_str(&kind)
                .ok_or_else(|| decode_error("transaction type", &kind))?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for SubscriptionPlan {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price_cents: row.try_get("price_cents")?,
            included_ai_credits: row.try_get("included_ai_credits")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Subscription {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            plan_id: row.try_get("plan_id")?,
            status: SubscriptionStatus::from_str(&status)
                .ok_or_else(|| decode_error("subscription status", &status))?,
            trial_ends_at: row.try_get("trial_ends_at")?,
            current_period_end: row.try_get("current_period_end")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Notification {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("type")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: NotificationType::from_str(&kind)
                .ok_or_else(|| decode_error("notification type", &kind))?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

const WALLET_COLUMNS: &str = "id, user_id, balance, lifetime_added, lifetime_spent, created_at, updated_at";
const PLAN_COLUMNS: &str = "id, slug, name, description, price_cents, included_ai_credits, is_active";
const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, plan_id, status, trial_ends_at, current_period_end, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, type, title, message, is_read, created_at";

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user_with_wallet(&self, user: NewUser) -> DbResult<(User, Wallet)> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(created) = created else {
            tx.rollback().await?;
            return Err(DbError::Conflict(format!("email {} is already registered", user.email)));
        };

        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            r#"
            INSERT INTO wallets (id, user_id, balance, lifetime_added, lifetime_spent, created_at, updated_at)
            VALUES ($1, $2, 0, 0, 0, NOW(), NOW())
            RETURNING {}
            "#,
            WALLET_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(created.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created, wallet))
    }

    async fn upsert_profile(&self, user_id: UserId, update: ProfileUpdate) -> DbResult<UserProfile> {
        let user_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        if !user_exists {
            return Err(DbError::NotFound("user"));
        }

        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, company_name, industry, onboarding_completed_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                company_name = COALESCE(EXCLUDED.company_name, user_profiles.company_name),
                industry = COALESCE(EXCLUDED.industry, user_profiles.industry),
                onboarding_completed_at = COALESCE(EXCLUDED.onboarding_completed_at, user_profiles.onboarding_completed_at),
                updated_at = NOW()
            RETURNING user_id, company_name, industry, onboarding_completed_at
            "#,
        )
        .bind(user_id)
        .bind(&update.company_name)
        .bind(&update.industry)
        .bind(update.completed_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn find_wallet(&self, user_id: UserId) -> DbResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {} FROM wallets WHERE user_id = $1",
            WALLET_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(wallet)
    }

    async fn list_transactions(&self, wallet_id: WalletId, limit: i64) -> DbResult<Vec<CreditTransaction>> {
        let rows = sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT id, wallet_id, amount, balance_after, type, description, created_at
            FROM credit_transactions
            WHERE wallet_id = $1
            ORDER BY seq DESC
            LIMIT $2
            "#,
        )
        .bind(wallet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn credit_wallet(
        &self,
        user_id: UserId,
        amount: i64,
        kind: CreditTransactionType,
        description: String,
    ) -> DbResult<Option<CreditReceipt>> {
        let mut tx = self.pool.begin().await?;

        // In-place increment: concurrent credits serialize on the row lock instead of overwriting.
        let updated = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance + $1,
                lifetime_added = lifetime_added + $1,
                updated_at = NOW()
            WHERE user_id = $2
            RETURNING id, balance
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };
        let wallet_id: WalletId = row.try_get("id")?;
        let new_balance: i64 = row.try_get("balance")?;

        let transaction_id = insert_transaction(&mut tx, wallet_id, amount, new_balance, kind, &description).await?;

        tx.commit().await?;
        Ok(Some(CreditReceipt {
            wallet_id,
            transaction_id,
            new_balance,
        }))
    }

    async fn debit_wallet(
        &self,
        user_id: UserId,
        amount: i64,
        kind: CreditTransactionType,
        description: String,
    ) -> DbResult<DebitResult> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance - $1,
                lifetime_spent = lifetime_spent + $1,
                updated_at = NOW()
            WHERE user_id = $2 AND balance >= $1
            RETURNING id, balance
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            let balance = sqlx::query_scalar::<_, i64>("SELECT balance FROM wallets WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Ok(match balance {
                Some(balance) => DebitResult::Insufficient { balance },
                None => DebitResult::NoWallet,
            });
        };
        let wallet_id: WalletId = row.try_get("id")?;
        let new_balance: i64 = row.try_get("balance")?;

        let transaction_id = insert_transaction(&mut tx, wallet_id, -amount, new_balance, kind, &description).await?;

        tx.commit().await?;
        Ok(DebitResult::Applied(CreditReceipt {
            wallet_id,
            transaction_id,
            new_balance,
        }))
    }

    async fn list_plans(&self) -> DbResult<Vec<SubscriptionPlan>> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(&format!(
            "SELECT {} FROM subscription_plans WHERE is_active = true ORDER BY price_cents ASC, slug ASC",
            PLAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    async fn find_plan_by_slug(&self, slug: &str) -> DbResult<Option<SubscriptionPlan>> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(&format!(
            "SELECT {} FROM subscription_plans WHERE slug = $1",
            PLAN_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    async fn count_plans(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscription_plans")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_plan(&self, plan: NewPlan) -> DbResult<SubscriptionPlan> {
        let created = sqlx::query_as::<_, SubscriptionPlan>(&format!(
            r#"
            INSERT INTO subscription_plans (id, slug, name, description, price_cents, included_ai_credits, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, true)
            ON CONFLICT (slug) DO NOTHING
            RETURNING {}
            "#,
            PLAN_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&plan.slug)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.price_cents)
        .bind(plan.included_ai_credits)
        .fetch_optional(&self.pool)
        .await?;
        created.ok_or_else(|| DbError::Conflict(format!("plan slug {} already exists", plan.slug)))
    }

    async fn create_subscription(&self, subscription: NewSubscription) -> DbResult<Subscription> {
        let created = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (id, user_id, plan_id, status, trial_ends_at, current_period_end, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(subscription.user_id)
        .bind(subscription.plan_id)
        .bind(subscription.status.as_str())
        .bind(subscription.trial_ends_at)
        .bind(subscription.current_period_end)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_subscriptions(&self, user_id: UserId) -> DbResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn end_expired_trials(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $1, updated_at = NOW()
            WHERE status = $2 AND trial_ends_at <= $3
            "#,
        )
        .bind(SubscriptionStatus::Active.as_str())
        .bind(SubscriptionStatus::Trialing.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn create_notification(&self, notification: NewNotification) -> DbResult<Notification> {
        let created = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (id, user_id, type, title, message, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, false, NOW())
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_notifications(&self, user_id: UserId) -> DbResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_notification_read(&self, id: NotificationId) -> DbResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs after the wallet row is locked, so `seq` follows the order balances were applied in.
async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    wallet_id: WalletId,
    amount: i64,
    balance_after: i64,
    kind: CreditTransactionType,
    description: &str,
) -> DbResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO credit_transactions (id, wallet_id, amount, balance_after, type, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, clock_timestamp())
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(wallet_id)
    .bind(amount)
    .bind(balance_after)
    .bind(kind.as_str())
    .bind(description)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}
