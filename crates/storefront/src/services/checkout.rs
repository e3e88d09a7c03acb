//! Checkout engine: the cart -> order state transition.
//!
//! `Cart(active) --checkout--> Order(pending) --stock deducted-->
//! Order(completed) --> Cart(cleared)`, all inside one database
//! transaction. No partial or retry state is ever persisted: any failure
//! between session resolution and cart clearing rolls everything back, so
//! the cart, stock, and order tables are left exactly as before the
//! attempt. This is pure atomicity, not a saga.

use std::collections::BTreeSet;

use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use vendora_core::{OrderId, StoreId, VariantId};

use crate::db::carts::{clear_cart, lock_cart_for_session, lock_items_with_stock, resolve_session};
use crate::db::catalog::refresh_product_stock;
use crate::db::orders::{
    deduct_variant_stock, insert_order, insert_order_item, insert_payment, mark_order_completed,
};
use crate::db::RepositoryError;

/// Length of the generated payment transaction reference suffix.
const TRANSACTION_REF_LEN: usize = 20;

/// Checkout failures. All abort the transaction without side effects.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Session unknown, or not associated with a customer (anonymous carts
    /// cannot check out).
    #[error("invalid session")]
    InvalidSession,

    /// No cart exists for this (store, session).
    #[error("cart not found")]
    CartNotFound,

    /// The cart has zero items.
    #[error("cart is empty")]
    CartEmpty,

    /// A line's requested quantity exceeds its locked available stock.
    #[error("insufficient stock for variant {0}")]
    OutOfStock(VariantId),

    /// Repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Convert the session's cart into a completed order.
    ///
    /// Pessimistic row locks on the cart and on every line's variant stock
    /// row guarantee that the sufficiency check, the total computation, and
    /// the stock deduction all observe the same snapshot; concurrent
    /// checkouts sharing a variant serialize at the database.
    ///
    /// The order total is the sum of locked line subtotals, computed here
    /// and never taken from the client. Payment is simulated synchronously
    /// (a real gateway is an external collaborator) with a generated
    /// transaction reference.
    ///
    /// Returns the created order id; HTTP callers report only success and
    /// query the order separately.
    ///
    /// # Errors
    ///
    /// `InvalidSession`, `CartNotFound`, `CartEmpty`, `OutOfStock` per the
    /// state machine above; `Repository` for database failures. Every error
    /// rolls the whole transaction back.
    pub async fn checkout(
        &self,
        store_id: StoreId,
        session_id: Uuid,
        payment_method: &str,
    ) -> Result<OrderId, CheckoutError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let customer_id = resolve_session(&mut *tx, store_id, session_id)
            .await?
            .and_then(|s| s.customer_id)
            .ok_or(CheckoutError::InvalidSession)?;

        let cart = lock_cart_for_session(&mut *tx, store_id, session_id)
            .await?
            .ok_or(CheckoutError::CartNotFound)?;

        let items = lock_items_with_stock(&mut *tx, cart.id).await?;
        if items.is_empty() {
            return Err(CheckoutError::CartEmpty);
        }

        // Fail on the first insufficient line; no partial order is created.
        for item in &items {
            if item.available_stock < item.quantity {
                return Err(CheckoutError::OutOfStock(item.variant_id));
            }
        }

        let total: Decimal = items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();

        let order_id = insert_order(&mut *tx, store_id, customer_id, total).await?;

        for item in &items {
            let subtotal = item.unit_price * Decimal::from(item.quantity);
            insert_order_item(
                &mut *tx,
                order_id,
                item.variant_id,
                item.quantity,
                item.unit_price,
                subtotal,
            )
            .await?;
        }

        let transaction_ref = generate_transaction_ref();
        insert_payment(&mut *tx, order_id, total, payment_method, &transaction_ref).await?;

        for item in &items {
            deduct_variant_stock(&mut *tx, item.variant_id, item.quantity).await?;
        }

        // Keep the denormalized product aggregates in step with the
        // deducted variant stock.
        let products: BTreeSet<_> = items.iter().map(|item| item.product_id).collect();
        for product_id in products {
            refresh_product_stock(&mut *tx, product_id).await?;
        }

        mark_order_completed(&mut *tx, order_id).await?;
        clear_cart(&mut *tx, cart.id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(%store_id, %order_id, %total, "checkout completed");

        Ok(order_id)
    }
}

/// Random alphanumeric reference for the simulated payment.
fn generate_transaction_ref() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TRANSACTION_REF_LEN)
        .map(char::from)
        .collect();
    format!("TXN-{suffix}")
}
