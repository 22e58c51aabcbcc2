//! Domain records shared by the store, the services and the HTTP layer.
//! Wire names are camelCase; enum values are persisted and serialized in upper case.

pub mod billing;
pub mod ids;
pub mod ledger;
pub mod notification;
pub mod user;

pub use billing::{Subscription, SubscriptionPlan, SubscriptionStatus};
pub use ids::{NotificationId, PlanId, SubscriptionId, TransactionId, UserId, WalletId};
pub use ledger::{CreditReceipt, CreditTransaction, CreditTransactionType, Wallet};
pub use notification::{Notification, NotificationType};
pub use user::{User, UserProfile};
