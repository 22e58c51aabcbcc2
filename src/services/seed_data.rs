use crate::database::{LedgerStore, NewPlan};
use crate::error::ServiceError;

/// Catalog installed into an empty store.
pub fn default_plans() -> Vec<NewPlan> {
    vec![
        NewPlan {
            slug: "starter".to_string(),
            name: "Starter".to_string(),
            description: Some("Try the assistant with a small monthly credit grant".to_string()),
            price_cents: 0,
            included_ai_credits: 100,
        },
        NewPlan {
            slug: "pro".to_string(),
            name: "Pro".to_string(),
            description: Some("For individuals who rely on AI every day".to_string()),
            price_cents: 2900,
            included_ai_credits: 500,
        },
        NewPlan {
            slug: "business".to_string(),
            name: "Business".to_string(),
            description: Some("Shared credits for small teams".to_string()),
            price_cents: 9900,
            included_ai_credits: 2000,
        },
    ]
}

/// Insert the default catalog unless some plan already exists. Returns how many were inserted.
pub async fn seed_default_plans(store: &dyn LedgerStore) -> Result<usize, ServiceError> {
    let count = store.count_plans().await?;

    if count > 0 {
        tracing::info!(count, "Plan catalog already populated, skipping seed");
        return Ok(0);
    }

    let plans = default_plans();
    let inserted = plans.len();
    for plan in plans {
        tracing::info!(slug = %plan.slug, "Seeding plan");
        store.insert_plan(plan).await?;
    }
    Ok(inserted)
}
