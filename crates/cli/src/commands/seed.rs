//! Seed the database with demo data for local development.
//!
//! Creates a demo store with a category schema (color required, size
//! optional), one customer, and a customer-bound shopping session whose id
//! is logged so it can be passed in the `X-Session-Id` header.
//!
//! Re-running against an already-seeded database is a no-op.

use uuid::Uuid;

use super::{CommandError, connect};

const DEMO_STORE: &str = "Demo Store";
const DEMO_CUSTOMER: &str = "demo@example.com";

/// Seed a demo store.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or an insert fails.
pub async fn demo_store() -> Result<(), CommandError> {
    let pool = connect().await?;

    let mut tx = pool.begin().await?;

    if let Some(existing) =
        sqlx::query_scalar::<_, i64>("SELECT id FROM store WHERE name = $1")
            .bind(DEMO_STORE)
            .fetch_optional(&mut *tx)
            .await?
    {
        tracing::info!(store_id = existing, "Demo store already seeded, nothing to do");
        return Ok(());
    }

    let store_id =
        sqlx::query_scalar::<_, i64>("INSERT INTO store (name) VALUES ($1) RETURNING id")
            .bind(DEMO_STORE)
            .fetch_one(&mut *tx)
            .await?;

    let category_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO category (store_id, name) VALUES ($1, 'T-Shirts') RETURNING id",
    )
    .bind(store_id)
    .fetch_one(&mut *tx)
    .await?;

    for (name, required) in [("color", true), ("size", false)] {
        sqlx::query("INSERT INTO attribute (category_id, name, is_required) VALUES ($1, $2, $3)")
            .bind(category_id)
            .bind(name)
            .bind(required)
            .execute(&mut *tx)
            .await?;
    }

    let customer_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO customer (store_id, email) VALUES ($1, $2) RETURNING id",
    )
    .bind(store_id)
    .bind(DEMO_CUSTOMER)
    .fetch_one(&mut *tx)
    .await?;

    let session_id = Uuid::new_v4();
    sqlx::query("INSERT INTO customer_session (id, store_id, customer_id) VALUES ($1, $2, $3)")
        .bind(session_id)
        .bind(store_id)
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(store_id, category_id, customer_id, "Demo store seeded");
    tracing::info!(%session_id, "Use this value as the X-Session-Id header");

    Ok(())
}
