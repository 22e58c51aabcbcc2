//! Ledger core: wallet mutations, subscription activation and the onboarding sequence.
//! Services take the store as `&dyn LedgerStore` and never hold state of their own.

pub mod onboarding_service;
pub mod seed_data;
pub mod subscription_service;
pub mod wallet_service;
