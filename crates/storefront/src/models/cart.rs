//! Cart models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use vendora_core::{CartId, CartItemId, ProductId, StoreId, VariantId};

/// One line in a cart, joined with its variant and product for display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItemView {
    pub cart_item_id: CartItemId,
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// A cart with its items, ordered by insertion.
///
/// A session with no cart yet is represented as an empty view (`cart_id`
/// `None`, zero total), not an error.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: Option<CartId>,
    pub store_id: StoreId,
    pub items: Vec<CartItemView>,
    pub total: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartView {
    /// The empty cart for a session that has not added anything yet.
    #[must_use]
    pub const fn empty(store_id: StoreId) -> Self {
        Self {
            cart_id: None,
            store_id,
            items: Vec::new(),
            total: Decimal::ZERO,
            updated_at: None,
        }
    }
}
