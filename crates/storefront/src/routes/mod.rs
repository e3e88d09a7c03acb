//! HTTP route handlers for the storefront engine.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness check
//! GET  /health/ready                            - Readiness check (pings the database)
//!
//! # Catalog
//! GET  /stores/{store_id}/products              - Product listing (faceted)
//! POST /stores/{store_id}/products              - Create product + first variant (multipart)
//! GET  /stores/{store_id}/products/{id}         - Product detail
//! POST /stores/{store_id}/products/{id}/variants - Add variant (multipart)
//!
//! # Cart (session via X-Session-Id header)
//! GET  /stores/{store_id}/cart                  - Cart view
//! POST /stores/{store_id}/cart/items            - Add item to cart
//!
//! # Checkout
//! POST /stores/{store_id}/checkout              - Convert cart to order
//! GET  /stores/{store_id}/orders/{id}           - Order detail
//! ```
//!
//! Handlers are deliberately thin: decode inputs, delegate to services,
//! serialize the result. All business rules live in `crate::services`.

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::{
    Router,
    routing::{get, post},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::media::MAX_IMAGE_SIZE;
use crate::state::AppState;

/// Header carrying the shopping session identifier.
pub const SESSION_HEADER: &str = "x-session-id";

/// Extract and parse the session id from request headers.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the header is missing or not a UUID.
pub fn session_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| AppError::BadRequest(format!("missing or invalid {SESSION_HEADER} header")))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/{product_id}", get(products::show))
        .route("/{product_id}/variants", post(products::add_variant))
        // Multipart bodies carry the image payload; leave headroom above the
        // image cap for the JSON part.
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + 64 * 1024))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", post(cart::add_item))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/stores/{store_id}/products", product_routes())
        .nest("/stores/{store_id}/cart", cart_routes())
        .route("/stores/{store_id}/checkout", post(checkout::checkout))
        .route("/stores/{store_id}/orders/{order_id}", get(orders::show))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_header_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            SESSION_HEADER,
            "3f2e6a18-9a1a-4b57-a9f4-0a6d2f8a7b11".parse().expect("value"),
        );
        let id = session_id(&headers).expect("valid");
        assert_eq!(id.to_string(), "3f2e6a18-9a1a-4b57-a9f4-0a6d2f8a7b11");
    }

    #[test]
    fn missing_or_garbage_session_header_is_bad_request() {
        assert!(session_id(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, "not-a-uuid".parse().expect("value"));
        assert!(session_id(&headers).is_err());
    }
}
