//! Cart route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;

use vendora_core::{StoreId, VariantId};

use crate::error::Result;
use crate::models::cart::CartView;
use crate::routes::session_id;
use crate::services::CartService;
use crate::state::AppState;

/// Request body for adding a cart line.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub variant_id: VariantId,
    pub quantity: i32,
}

/// The session's cart. A session with no cart yet gets an empty view.
pub async fn show(
    State(state): State<AppState>,
    Path(store_id): Path<StoreId>,
    headers: HeaderMap,
) -> Result<Json<CartView>> {
    let session = session_id(&headers)?;

    let cart = CartService::new(state.pool())
        .get_cart(store_id, session)
        .await?;

    Ok(Json(cart))
}

/// Add a variant to the session's cart, then return the updated view.
pub async fn add_item(
    State(state): State<AppState>,
    Path(store_id): Path<StoreId>,
    headers: HeaderMap,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let session = session_id(&headers)?;

    let service = CartService::new(state.pool());
    service
        .add_item(store_id, session, body.variant_id, body.quantity)
        .await?;

    let cart = service.get_cart(store_id, session).await?;
    Ok(Json(cart))
}
