//! Cart repository.
//!
//! One active cart per (store, session), created lazily on first item add.
//! Checkout and item mutation run in transactions owned by the services, so
//! the write-path functions take `&mut PgConnection`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use vendora_core::{CartId, CartItemId, CustomerId, ProductId, StoreId, VariantId};

use super::RepositoryError;
use crate::models::cart::CartItemView;

const CART_COLUMNS: &str = "id, store_id, session_id, customer_id, created_at, updated_at";

/// A cart row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cart {
    pub id: CartId,
    pub store_id: StoreId,
    pub session_id: Uuid,
    pub customer_id: Option<CustomerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A session row, as seen by the session resolver collaborator.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub store_id: StoreId,
    pub customer_id: Option<CustomerId>,
}

/// A cart item locked together with its backing variant stock row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedCartItem {
    pub cart_item_id: CartItemId,
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub available_stock: i32,
}

/// Repository for cart read operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The active cart for a (store, session), if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_cart(
        &self,
        store_id: StoreId,
        session_id: Uuid,
    ) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            "SELECT {CART_COLUMNS} FROM cart WHERE store_id = $1 AND session_id = $2"
        ))
        .bind(store_id)
        .bind(session_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(cart)
    }

    /// Items of a cart joined with product/variant display fields, ordered
    /// by insertion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItemView>, RepositoryError> {
        let items = sqlx::query_as::<_, CartItemView>(
            "SELECT ci.id AS cart_item_id, ci.variant_id, pv.product_id,
                    p.name AS product_name, pv.sku,
                    pv.primary_image_url AS image_url,
                    ci.unit_price, ci.quantity,
                    (ci.unit_price * ci.quantity) AS subtotal
             FROM cart_item ci
             JOIN product_variant pv ON pv.id = ci.variant_id
             JOIN product p ON p.id = pv.product_id
             WHERE ci.cart_id = $1
             ORDER BY ci.id",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Sum of line subtotals for a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cart_total(&self, cart_id: CartId) -> Result<Decimal, RepositoryError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(unit_price * quantity), 0) FROM cart_item WHERE cart_id = $1",
        )
        .bind(cart_id)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }
}

/// Resolve a session for a store.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn resolve_session(
    conn: &mut PgConnection,
    store_id: StoreId,
    session_id: Uuid,
) -> Result<Option<Session>, RepositoryError> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT id, store_id, customer_id FROM customer_session WHERE id = $1 AND store_id = $2",
    )
    .bind(session_id)
    .bind(store_id)
    .fetch_optional(conn)
    .await?;

    Ok(session)
}

/// Fetch and lock the cart row for a (store, session).
///
/// The lock serializes concurrent checkouts and item mutations on the same
/// cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_cart_for_session(
    conn: &mut PgConnection,
    store_id: StoreId,
    session_id: Uuid,
) -> Result<Option<Cart>, RepositoryError> {
    let cart = sqlx::query_as::<_, Cart>(&format!(
        "SELECT {CART_COLUMNS} FROM cart WHERE store_id = $1 AND session_id = $2 FOR UPDATE"
    ))
    .bind(store_id)
    .bind(session_id)
    .fetch_optional(conn)
    .await?;

    Ok(cart)
}

/// Create the cart for a session (first item add).
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a concurrent add already created
/// it. Returns `RepositoryError::Database` for other database errors.
pub async fn create_cart(
    conn: &mut PgConnection,
    store_id: StoreId,
    session_id: Uuid,
    customer_id: Option<CustomerId>,
) -> Result<Cart, RepositoryError> {
    let cart = sqlx::query_as::<_, Cart>(&format!(
        "INSERT INTO cart (store_id, session_id, customer_id)
         VALUES ($1, $2, $3)
         RETURNING {CART_COLUMNS}"
    ))
    .bind(store_id)
    .bind(session_id)
    .bind(customer_id)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict("cart already exists for session".to_owned());
        }
        RepositoryError::Database(e)
    })?;

    Ok(cart)
}

/// Price and stock of a variant, scoped to the store, for add-to-cart
/// validation.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_variant_for_cart(
    conn: &mut PgConnection,
    store_id: StoreId,
    variant_id: VariantId,
) -> Result<Option<(Decimal, i32)>, RepositoryError> {
    let row = sqlx::query_as::<_, (Decimal, i32)>(
        "SELECT price, stock_quantity FROM product_variant WHERE id = $1 AND store_id = $2",
    )
    .bind(variant_id)
    .bind(store_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Insert or accumulate a cart line. The unit price snapshots at first add.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert_cart_item(
    conn: &mut PgConnection,
    cart_id: CartId,
    variant_id: VariantId,
    quantity: i32,
    unit_price: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO cart_item (cart_id, variant_id, quantity, unit_price)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (cart_id, variant_id)
         DO UPDATE SET quantity = cart_item.quantity + EXCLUDED.quantity",
    )
    .bind(cart_id)
    .bind(variant_id)
    .bind(quantity)
    .bind(unit_price)
    .execute(conn)
    .await?;

    Ok(())
}

/// Bump the cart's `updated_at` after a mutation.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn touch_cart(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE cart SET updated_at = now() WHERE id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Lock a cart's items together with their backing variant stock rows.
///
/// `FOR UPDATE OF ci, pv` pins both the lines and the stock, so the
/// sufficiency check, total computation, and stock deduction all observe the
/// same snapshot; concurrent checkouts or stock-adjusting writes on the same
/// variants serialize against this transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_items_with_stock(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<Vec<LockedCartItem>, RepositoryError> {
    let items = sqlx::query_as::<_, LockedCartItem>(
        "SELECT ci.id AS cart_item_id, ci.variant_id, pv.product_id,
                ci.quantity, ci.unit_price, pv.stock_quantity AS available_stock
         FROM cart_item ci
         JOIN product_variant pv ON pv.id = ci.variant_id
         WHERE ci.cart_id = $1
         ORDER BY ci.id
         FOR UPDATE OF ci, pv",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;

    Ok(items)
}

/// Remove every item from a cart (successful checkout).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear_cart(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM cart_item WHERE cart_id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;

    Ok(())
}
