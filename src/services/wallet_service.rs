use crate::database::{DebitResult, LedgerStore};
use crate::error::ServiceError;
use crate::models::{CreditReceipt, CreditTransactionType, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreditOutcome {
    Credited(CreditReceipt),
    /// The user has no wallet. Nothing was written.
    NoWallet,
}

/// Add `amount` credits to the user's wallet and append the matching ledger entry.
///
/// Balance, `lifetime_added` and the ledger row change together or not at all.
pub async fn credit_wallet(
    store: &dyn LedgerStore,
    user_id: UserId,
    amount: i64,
    kind: CreditTransactionType,
    description: &str,
) -> Result<CreditOutcome, ServiceError> {
    if amount < 0 {
        return Err(ServiceError::InvalidAmount(amount));
    }

    match store.credit_wallet(user_id, amount, kind, description.to_string()).await? {
        Some(receipt) => {
            tracing::info!(
                %user_id,
                amount,
                kind = %kind,
                new_balance = receipt.new_balance,
                transaction_id = %receipt.transaction_id,
                "Wallet credited"
            );
            Ok(CreditOutcome::Credited(receipt))
        }
        None => {
            tracing::warn!(%user_id, amount, "No wallet to credit; skipping");
            Ok(CreditOutcome::NoWallet)
        }
    }
}

/// Consume `amount` credits for AI usage. The balance never drops below zero.
pub async fn spend_credits(
    store: &dyn LedgerStore,
    user_id: UserId,
    amount: i64,
    description: &str,
) -> Result<CreditReceipt, ServiceError> {
    if amount <= 0 {
        return Err(ServiceError::InvalidAmount(amount));
    }

    match store
        .debit_wallet(user_id, amount, CreditTransactionType::Usage, description.to_string())
        .await?
    {
        DebitResult::Applied(receipt) => {
            tracing::info!(%user_id, amount, new_balance = receipt.new_balance, "Credits spent");
            Ok(receipt)
        }
        DebitResult::NoWallet => Err(ServiceError::WalletNotFound(user_id)),
        DebitResult::Insufficient { balance } => Err(ServiceError::InsufficientCredits {
            balance,
            requested: amount,
        }),
    }
}
