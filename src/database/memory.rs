use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::{
    DbError, DbResult, DebitResult, LedgerStore, NewNotification, NewPlan, NewSubscription,
    NewUser, ProfileUpdate,
};
use crate::models::{
    CreditReceipt, CreditTransaction, CreditTransactionType, Notification, NotificationId,
    Subscription, SubscriptionPlan, SubscriptionStatus, User, UserId, UserProfile, Wallet,
    WalletId,
};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    profiles: HashMap<UserId, UserProfile>,
    wallets: HashMap<UserId, Wallet>,
    // Insertion order is ledger order.
    transactions: Vec<CreditTransaction>,
    plans: Vec<SubscriptionPlan>,
    subscriptions: Vec<Subscription>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn append_transaction(
        &mut self,
        wallet_id: WalletId,
        amount: i64,
        balance_after: i64,
        kind: CreditTransactionType,
        description: String,
        now: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.transactions.push(CreditTransaction {
            id,
            wallet_id,
            amount,
            balance_after,
            kind,
            description,
            created_at: now,
        });
        id
    }
}

/// Process-local store. A single lock covers every table, so each call is atomic.
#[derive(Default)]
pub struct MemoryLedgerStore {
    tables: Mutex<Tables>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every ledger entry across all wallets, oldest first.
    pub async fn all_transactions(&self) -> Vec<CreditTransaction> {
        self.tables.lock().await.transactions.clone()
    }

    pub async fn all_subscriptions(&self) -> Vec<Subscription> {
        self.tables.lock().await.subscriptions.clone()
    }

    pub async fn all_notifications(&self) -> Vec<Notification> {
        self.tables.lock().await.notifications.clone()
    }

    pub async fn profile(&self, user_id: UserId) -> Option<UserProfile> {
        self.tables.lock().await.profiles.get(&user_id).cloned()
    }

    /// Insert a user with no wallet, for exercising the missing-wallet paths.
    pub async fn insert_user_without_wallet(&self, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            password_hash: String::new(),
            created_at: Utc::now(),
        };
        self.tables.lock().await.users.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user_with_wallet(&self, user: NewUser) -> DbResult<(User, Wallet)> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DbError::Conflict(format!("email {} is already registered", user.email)));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now,
        };
        let wallet = Wallet::empty(created.id, now);
        tables.users.insert(created.id, created.clone());
        tables.wallets.insert(created.id, wallet.clone());
        Ok((created, wallet))
    }

    async fn upsert_profile(&self, user_id: UserId, update: ProfileUpdate) -> DbResult<UserProfile> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user_id) {
            return Err(DbError::NotFound("user"));
        }

        let profile = tables.profiles.entry(user_id).or_insert_with(|| UserProfile {
            user_id,
            ..UserProfile::default()
        });
        if update.company_name.is_some() {
            profile.company_name = update.company_name;
        }
        if update.industry.is_some() {
            profile.industry = update.industry;
        }
        if update.completed_at.is_some() {
            profile.onboarding_completed_at = update.completed_at;
        }
        Ok(profile.clone())
    }

    async fn find_wallet(&self, user_id: UserId) -> DbResult<Option<Wallet>> {
        Ok(self.tables.lock().await.wallets.get(&user_id).cloned())
    }

    async fn list_transactions(&self, wallet_id: WalletId, limit: i64) -> DbResult<Vec<CreditTransaction>> {
        let tables = self.tables.lock().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(tables
            .transactions
            .iter()
            .rev()
            .filter(|t| t.wallet_id == wallet_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn credit_wallet(
        &self,
        user_id: UserId,
        amount: i64,
        kind: CreditTransactionType,
        description: String,
    ) -> DbResult<Option<CreditReceipt>> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let Some(wallet) = tables.wallets.get_mut(&user_id) else {
            return Ok(None);
        };
        let balance = wallet.balance.checked_add(amount).ok_or(DbError::Overflow("wallet balance"))?;
        let lifetime_added = wallet
            .lifetime_added
            .checked_add(amount)
            .ok_or(DbError::Overflow("lifetime credits added"))?;
        wallet.balance = balance;
        wallet.lifetime_added = lifetime_added;
        wallet.updated_at = now;
        let (wallet_id, new_balance) = (wallet.id, wallet.balance);

        let transaction_id = tables.append_transaction(wallet_id, amount, new_balance, kind, description, now);
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
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let Some(wallet) = tables.wallets.get_mut(&user_id) else {
            return Ok(DebitResult::NoWallet);
        };
        if wallet.balance < amount {
            return Ok(DebitResult::Insufficient { balance: wallet.balance });
        }
        let lifetime_spent = wallet
            .lifetime_spent
            .checked_add(amount)
            .ok_or(DbError::Overflow("lifetime credits spent"))?;
        wallet.balance -= amount;
        wallet.lifetime_spent = lifetime_spent;
        wallet.updated_at = now;
        let (wallet_id, new_balance) = (wallet.id, wallet.balance);

        let transaction_id = tables.append_transaction(wallet_id, -amount, new_balance, kind, description, now);
        Ok(DebitResult::Applied(CreditReceipt {
            wallet_id,
            transaction_id,
            new_balance,
        }))
    }

    async fn list_plans(&self) -> DbResult<Vec<SubscriptionPlan>> {
        let tables = self.tables.lock().await;
        let mut plans: Vec<SubscriptionPlan> = tables.plans.iter().filter(|p| p.is_active).cloned().collect();
        plans.sort_by(|a, b| a.price_cents.cmp(&b.price_cents).then_with(|| a.slug.cmp(&b.slug)));
        Ok(plans)
    }

    async fn find_plan_by_slug(&self, slug: &str) -> DbResult<Option<SubscriptionPlan>> {
        let tables = self.tables.lock().await;
        Ok(tables.plans.iter().find(|p| p.slug == slug).cloned())
    }

    async fn count_plans(&self) -> DbResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.plans.len() as i64)
    }

    async fn insert_plan(&self, plan: NewPlan) -> DbResult<SubscriptionPlan> {
        let mut tables = self.tables.lock().await;
        if tables.plans.iter().any(|p| p.slug == plan.slug) {
            return Err(DbError::Conflict(format!("plan slug {} already exists", plan.slug)));
        }
        let created = SubscriptionPlan {
            id: Uuid::new_v4(),
            slug: plan.slug,
            name: plan.name,
            description: plan.description,
            price_cents: plan.price_cents,
            included_ai_credits: plan.included_ai_credits,
            is_active: true,
        };
        tables.plans.push(created.clone());
        Ok(created)
    }

    async fn create_subscription(&self, subscription: NewSubscription) -> DbResult<Subscription> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let created = Subscription {
            id: Uuid::new_v4(),
            user_id: subscription.user_id,
            plan_id: subscription.plan_id,
            status: subscription.status,
            trial_ends_at: subscription.trial_ends_at,
            current_period_end: subscription.current_period_end,
            created_at: now,
            updated_at: now,
        };
        tables.subscriptions.push(created.clone());
        Ok(created)
    }

    async fn list_subscriptions(&self, user_id: UserId) -> DbResult<Vec<Subscription>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn end_expired_trials(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut ended = 0;
        for subscription in tables
            .subscriptions
            .iter_mut()
            .filter(|s| s.status == SubscriptionStatus::Trialing && s.trial_ends_at <= now)
        {
            subscription.status = SubscriptionStatus::Active;
            subscription.updated_at = now;
            ended += 1;
        }
        Ok(ended)
    }

    async fn create_notification(&self, notification: NewNotification) -> DbResult<Notification> {
        let mut tables = self.tables.lock().await;
        let created = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            is_read: false,
            created_at: Utc::now(),
        };
        tables.notifications.push(created.clone());
        Ok(created)
    }

    async fn list_notifications(&self, user_id: UserId) -> DbResult<Vec<Notification>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: NotificationId) -> DbResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user() -> (MemoryLedgerStore, UserId) {
        let store = MemoryLedgerStore::new();
        let (user, _) = store
            .create_user_with_wallet(NewUser {
                email: "ada@example.com".to_string(),
                name: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let (store, _) = store_with_user().await;
        let err = store
            .create_user_with_wallet(NewUser {
                email: "ADA@example.com".to_string(),
                name: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn profile_update_keeps_fields_not_supplied() {
        let (store, user_id) = store_with_user().await;
        store
            .upsert_profile(user_id, ProfileUpdate {
                company_name: Some("Acme".to_string()),
                industry: Some("Retail".to_string()),
                completed_at: None,
            })
            .await
            .unwrap();
        let profile = store
            .upsert_profile(user_id, ProfileUpdate {
                industry: Some("Logistics".to_string()),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(profile.company_name.as_deref(), Some("Acme"));
        assert_eq!(profile.industry.as_deref(), Some("Logistics"));
    }

    #[tokio::test]
    async fn profile_update_for_unknown_user_is_not_found() {
        let store = MemoryLedgerStore::new();
        let err = store.upsert_profile(Uuid::new_v4(), ProfileUpdate::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound("user")));
    }

    #[tokio::test]
    async fn debit_never_overdraws() {
        let (store, user_id) = store_with_user().await;
        store
            .credit_wallet(user_id, 10, CreditTransactionType::Bonus, "seed".to_string())
            .await
            .unwrap();
        let result = store
            .debit_wallet(user_id, 11, CreditTransactionType::Usage, "too much".to_string())
            .await
            .unwrap();
        assert_eq!(result, DebitResult::Insufficient { balance: 10 });
        assert_eq!(store.all_transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn credit_past_i64_max_is_rejected_without_writing() {
        let (store, user_id) = store_with_user().await;
        store
            .credit_wallet(user_id, i64::MAX, CreditTransactionType::Bonus, "max".to_string())
            .await
            .unwrap();

        let err = store
            .credit_wallet(user_id, 1, CreditTransactionType::Bonus, "one more".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Overflow(_)));

        let wallet = store.find_wallet(user_id).await.unwrap().unwrap();
        assert_eq!((wallet.balance, wallet.lifetime_added), (i64::MAX, i64::MAX));
        assert_eq!(store.all_transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn transactions_are_listed_newest_first() {
        let (store, user_id) = store_with_user().await;
        for amount in [1, 2, 3] {
            store
                .credit_wallet(user_id, amount, CreditTransactionType::Bonus, format!("grant {}", amount))
                .await
                .unwrap();
        }
        let wallet = store.find_wallet(user_id).await.unwrap().unwrap();
        let listed = store.list_transactions(wallet.id, 2).await.unwrap();
        let amounts: Vec<i64> = listed.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![3, 2]);
        assert_eq!(listed[0].balance_after, 6);
    }
}
