//! Service layer: one module per engine concern.
//!
//! Services own transaction boundaries; repositories never begin or commit
//! on their own in the write paths.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod listing;
pub mod media;

pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService};
pub use checkout::{CheckoutError, CheckoutService};
pub use listing::{ListingParams, ListingService};
