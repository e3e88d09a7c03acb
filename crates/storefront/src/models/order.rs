//! Order models.
//!
//! Order items are an immutable snapshot of cart items at the moment of
//! checkout; later cart or price changes never retroactively affect a
//! placed order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use vendora_core::{CustomerId, OrderId, OrderItemId, PaymentId, StoreId, VariantId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub status: String,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub variant_id: VariantId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub method: String,
    pub status: String,
    pub transaction_ref: String,
    pub created_at: DateTime<Utc>,
}
