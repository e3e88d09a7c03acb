//! Cart service: lazy cart creation and price-snapshot item adds.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use vendora_core::{StoreId, VariantId};

use crate::db::carts::{
    create_cart, get_variant_for_cart, lock_cart_for_session, resolve_session, touch_cart,
    upsert_cart_item,
};
use crate::db::{CartRepository, RepositoryError};
use crate::models::cart::CartView;

/// Cart mutation errors.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity must be positive.
    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    /// Session unknown for this store.
    #[error("invalid session")]
    InvalidSession,

    /// Variant unknown (or belongs to another store).
    #[error("variant not found")]
    VariantNotFound,

    /// Requested quantity exceeds available stock.
    #[error("insufficient stock for variant {0}")]
    InsufficientStock(VariantId),

    /// Repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart service.
pub struct CartService<'a> {
    pool: &'a PgPool,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The cart view for a (store, session).
    ///
    /// A session with no cart yet gets an empty view, not an error.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn get_cart(
        &self,
        store_id: StoreId,
        session_id: Uuid,
    ) -> Result<CartView, CartError> {
        let repo = CartRepository::new(self.pool);

        let Some(cart) = repo.get_cart(store_id, session_id).await? else {
            return Ok(CartView::empty(store_id));
        };

        let items = repo.list_items(cart.id).await?;
        let total: Decimal = repo.cart_total(cart.id).await?;

        Ok(CartView {
            cart_id: Some(cart.id),
            store_id: cart.store_id,
            items,
            total,
            updated_at: Some(cart.updated_at),
        })
    }

    /// Add a variant to the session's cart, creating the cart lazily.
    ///
    /// The line's unit price snapshots the variant price at add time;
    /// re-adding the same variant accumulates quantity. The cart timestamp
    /// is touched on every mutation.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for `qty <= 0`, `InvalidSession` when the session
    /// is unknown, `VariantNotFound`/`InsufficientStock` for bad lines,
    /// `Repository` for database failures. Any error rolls the transaction
    /// back.
    pub async fn add_item(
        &self,
        store_id: StoreId,
        session_id: Uuid,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<(), CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let session = resolve_session(&mut *tx, store_id, session_id)
            .await?
            .ok_or(CartError::InvalidSession)?;

        let cart = match lock_cart_for_session(&mut *tx, store_id, session_id).await? {
            Some(cart) => cart,
            None => create_cart(&mut *tx, store_id, session_id, session.customer_id).await?,
        };

        let (price, stock) = get_variant_for_cart(&mut *tx, store_id, variant_id)
            .await?
            .ok_or(CartError::VariantNotFound)?;

        if stock < quantity {
            return Err(CartError::InsufficientStock(variant_id));
        }

        upsert_cart_item(&mut *tx, cart.id, variant_id, quantity, price).await?;
        touch_cart(&mut *tx, cart.id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(())
    }
}
