// Operator utility: grant credits to a user's wallet outside the subscription flow.
// Usage: cargo run --bin grant_credits -- --user-id <uuid> --amount 250 --reason "Support goodwill"

use clap::{Parser, ValueEnum};

use credit_ledger_api::config::Config;
use credit_ledger_api::database::{self, PgLedgerStore};
use credit_ledger_api::models::CreditTransactionType;
use credit_ledger_api::services::wallet_service::{self, CreditOutcome};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GrantKind {
    Bonus,
    Purchase,
    Refund,
}

impl From<GrantKind> for CreditTransactionType {
    fn from(kind: GrantKind) -> Self {
        match kind {
            GrantKind::Bonus => CreditTransactionType::Bonus,
            GrantKind::Purchase => CreditTransactionType::Purchase,
            GrantKind::Refund => CreditTransactionType::Refund,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "grant_credits", about = "Credit a user's AI wallet and record the ledger entry")]
struct Args {
    #[arg(long)]
    user_id: uuid::Uuid,

    #[arg(long)]
    amount: i64,

    #[arg(long, default_value = "Manual credit grant")]
    reason: String,

    #[arg(long = "type", value_enum, default_value_t = GrantKind::Bonus)]
    kind: GrantKind,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.amount <= 0 {
        eprintln!("Error: amount must be a positive number of credits");
        std::process::exit(1);
    }

    // Load environment variables
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    let pool = database::create_pool(&config.database_url, 1).await?;
    let store = PgLedgerStore::new(pool);

    let outcome = wallet_service::credit_wallet(
        &store,
        args.user_id,
        args.amount,
        args.kind.into(),
        &args.reason,
    )
    .await?;

    match outcome {
        CreditOutcome::Credited(receipt) => {
            println!("Credited {} to user {}", args.amount, args.user_id);
            println!("New balance: {}", receipt.new_balance);
            println!("Transaction: {}", receipt.transaction_id);
        }
        CreditOutcome::NoWallet => {
            eprintln!("Error: user {} has no wallet", args.user_id);
            std::process::exit(1);
        }
    }

    store.pool().close().await;
    Ok(())
}
