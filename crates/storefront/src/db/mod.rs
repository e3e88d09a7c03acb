//! Database operations for the storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `store`, `category`, `attribute` - tenant catalog schema
//! - `product`, `product_variant`, `variant_attribute` - catalog
//! - `customer`, `customer_session` - session resolver backing store
//! - `cart`, `cart_item` - active carts
//! - `orders`, `order_item`, `payment` - placed orders
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p vendora-cli -- migrate
//! ```
//!
//! # Query style
//!
//! Queries are runtime-checked (`sqlx::query_as` + `FromRow`), not the
//! compile-time macros: the listing statement is assembled dynamically and
//! the workspace must build without a live database. Write-path functions
//! take `&mut PgConnection` so the owning service controls the transaction
//! boundary; read-path repositories borrow the pool.

pub mod carts;
pub mod catalog;
pub mod listing;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use catalog::CatalogRepository;
pub use listing::{ListingFilters, ListingQuery};
pub use orders::OrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate variant identity).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
