//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use vendora_core::{OrderId, StoreId};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::models::order::{Order, OrderItem, Payment};
use crate::state::AppState;

/// Full order view: the order row, its lines, and its payments.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

/// Order detail, scoped to its store.
pub async fn show(
    State(state): State<AppState>,
    Path((store_id, order_id)): Path<(StoreId, OrderId)>,
) -> Result<Json<OrderDetail>> {
    let repo = OrderRepository::new(state.pool());

    let order = repo
        .get(store_id, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    let items = repo.list_items(order_id).await?;
    let payments = repo.list_payments(order_id).await?;

    Ok(Json(OrderDetail {
        order,
        items,
        payments,
    }))
}
