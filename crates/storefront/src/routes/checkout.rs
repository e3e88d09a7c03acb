//! Checkout route handler.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;

use vendora_core::StoreId;

use crate::error::Result;
use crate::routes::session_id;
use crate::services::CheckoutService;
use crate::state::AppState;

/// Request body for checkout.
#[derive(Debug, Deserialize, Default)]
pub struct CheckoutRequest {
    /// Payment method label recorded on the payment row.
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

fn default_payment_method() -> String {
    "card".to_owned()
}

/// Convert the session's cart into a completed order.
///
/// Responds `201 Created` with an empty body; the order is queried
/// separately via the orders endpoint.
pub async fn checkout(
    State(state): State<AppState>,
    Path(store_id): Path<StoreId>,
    headers: HeaderMap,
    body: Option<Json<CheckoutRequest>>,
) -> Result<StatusCode> {
    let session = session_id(&headers)?;
    let request = body.map(|Json(r)| r).unwrap_or_default();

    CheckoutService::new(state.pool())
        .checkout(store_id, session, &request.payment_method)
        .await?;

    Ok(StatusCode::CREATED)
}
