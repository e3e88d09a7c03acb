//! Domain models for the storefront engine.

pub mod cart;
pub mod catalog;
pub mod order;

pub use cart::{CartItemView, CartView};
pub use catalog::{
    AttributePair, CategoryAttribute, CreateProductInput, Product, ProductDetail, ProductListing,
    Variant, VariantAttributeValue, VariantDetail, VariantInput,
};
pub use order::{Order, OrderItem, Payment};
