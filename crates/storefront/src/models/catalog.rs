//! Catalog models: products, variants, attributes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vendora_core::{AttributeId, CategoryId, ProductId, StoreId, VariantId};

/// A product row.
///
/// `stock_quantity` is the denormalized sum across variants, maintained by
/// the catalog writer inside the same transaction as any variant stock
/// change. `default_variant_id`, once set, only changes when the product was
/// previously unsellable and a catalog write makes it sellable again.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub brand: String,
    pub default_variant_id: Option<VariantId>,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sellable configuration of a product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub sku: String,
    pub attribute_hash: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub primary_image_url: Option<String>,
}

/// One (attribute, value) pair in a variant submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributePair {
    pub attribute_id: AttributeId,
    pub value: String,
}

/// An attribute declared on a category's schema.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryAttribute {
    pub id: AttributeId,
    pub name: String,
    pub is_required: bool,
}

/// Variant payload for `create_product` / `add_variant`.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    pub sku: String,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub attributes: Vec<AttributePair>,
}

/// Product payload for `create_product`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub brand: String,
    pub variant: VariantInput,
}

/// Flat projection returned by the product listing query.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductListing {
    pub product_id: ProductId,
    pub name: String,
    pub slug: Option<String>,
    pub brand: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub total_stock: i32,
    pub variant_stock: Option<i32>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

/// A resolved (attribute id, name, value) triple on a variant.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VariantAttributeValue {
    pub attribute_id: AttributeId,
    pub attribute_name: String,
    pub value: String,
}

/// A variant with its resolved attributes, for the product detail view.
#[derive(Debug, Clone, Serialize)]
pub struct VariantDetail {
    pub variant_id: VariantId,
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub image_url: Option<String>,
    pub attributes: Vec<VariantAttributeValue>,
}

/// Full product detail: base row, default variant, remaining variants.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub brand: String,
    pub category_id: CategoryId,
    pub total_stock: i32,
    pub in_stock: bool,
    pub default_variant: Option<VariantDetail>,
    pub variants: Vec<VariantDetail>,
}
