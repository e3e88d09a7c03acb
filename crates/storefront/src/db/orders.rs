//! Order repository: checkout write path plus order reads.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use vendora_core::{CustomerId, OrderId, OrderStatus, PaymentStatus, StoreId, VariantId};

use super::RepositoryError;
use crate::models::order::{Order, OrderItem, Payment};

const ORDER_COLUMNS: &str = "id, store_id, customer_id, status, total, created_at, updated_at";

/// Repository for order read operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by id, scoped to its store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        store_id: StoreId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE store_id = $1 AND id = $2"
        ))
        .bind(store_id)
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Items of an order, id ascending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, variant_id, quantity, unit_price, subtotal
             FROM order_item WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Payments recorded against an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_payments(&self, order_id: OrderId) -> Result<Vec<Payment>, RepositoryError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT id, order_id, amount, method, status, transaction_ref, created_at
             FROM payment WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(payments)
    }
}

/// Insert a pending order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    store_id: StoreId,
    customer_id: CustomerId,
    total: Decimal,
) -> Result<OrderId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderId>(
        "INSERT INTO orders (store_id, customer_id, status, total)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(store_id)
    .bind(customer_id)
    .bind(OrderStatus::Pending.as_str())
    .bind(total)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// Insert one order item snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_order_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    variant_id: VariantId,
    quantity: i32,
    unit_price: Decimal,
    subtotal: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO order_item (order_id, variant_id, quantity, unit_price, subtotal)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(order_id)
    .bind(variant_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(subtotal)
    .execute(conn)
    .await?;

    Ok(())
}

/// Record the (simulated) captured payment for an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_payment(
    conn: &mut PgConnection,
    order_id: OrderId,
    amount: Decimal,
    method: &str,
    transaction_ref: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO payment (order_id, amount, method, status, transaction_ref)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(order_id)
    .bind(amount)
    .bind(method)
    .bind(PaymentStatus::Captured.as_str())
    .bind(transaction_ref)
    .execute(conn)
    .await?;

    Ok(())
}

/// Deduct checked-out quantity from a variant's stock.
///
/// The `stock_quantity >= $2` guard is a safety net; the checkout engine
/// already validated sufficiency under the same row lock.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if stock would go negative.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn deduct_variant_stock(
    conn: &mut PgConnection,
    variant_id: VariantId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE product_variant SET stock_quantity = stock_quantity - $2
         WHERE id = $1 AND stock_quantity >= $2",
    )
    .bind(variant_id)
    .bind(quantity)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "stock underflow on variant {variant_id}"
        )));
    }

    Ok(())
}

/// Transition an order to `completed` after stock deduction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn mark_order_completed(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2")
        .bind(OrderStatus::Completed.as_str())
        .bind(order_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}
