//! Catalog repository: products, variants, attribute schema.
//!
//! Read paths hang off [`CatalogRepository`]. Write paths are free functions
//! over `&mut PgConnection` because the catalog writer composes them inside
//! one transaction it owns.

use sqlx::{PgConnection, PgPool};

use vendora_core::{AttributeId, CategoryId, ProductId, StoreId, VariantId};

use super::RepositoryError;
use crate::models::catalog::{
    AttributePair, CategoryAttribute, CreateProductInput, Product, Variant, VariantAttributeValue,
};

const PRODUCT_COLUMNS: &str = "id, store_id, category_id, name, slug, description, brand, \
     default_variant_id, stock_quantity, created_at, updated_at";

const VARIANT_COLUMNS: &str =
    "id, product_id, store_id, sku, attribute_hash, price, stock_quantity, primary_image_url";

/// Repository for catalog read operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by id, scoped to its store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE store_id = $1 AND id = $2"
        ))
        .bind(store_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// All variants of a product, id ascending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_variants(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Variant>, RepositoryError> {
        let variants = sqlx::query_as::<_, Variant>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variant WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(variants)
    }

    /// Resolved (id, name, value) attribute triples for a variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_variant_attributes(
        &self,
        variant_id: VariantId,
    ) -> Result<Vec<VariantAttributeValue>, RepositoryError> {
        let attributes = sqlx::query_as::<_, VariantAttributeValue>(
            "SELECT va.attribute_id, a.name AS attribute_name, va.value
             FROM variant_attribute va
             JOIN attribute a ON a.id = va.attribute_id
             WHERE va.variant_id = $1
             ORDER BY va.attribute_id",
        )
        .bind(variant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(attributes)
    }

    /// Resolve facet attribute names to ids for one store.
    ///
    /// Unknown names are simply absent from the result; the caller decides
    /// whether that is an error (for listing filters it is not).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve_attribute_ids(
        &self,
        store_id: StoreId,
        names: &[String],
    ) -> Result<Vec<(String, AttributeId)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, AttributeId)>(
            "SELECT a.name, a.id
             FROM attribute a
             JOIN category c ON c.id = a.category_id
             WHERE c.store_id = $1 AND a.name = ANY($2)",
        )
        .bind(store_id)
        .bind(names)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Persist the primary image URL on a variant.
    ///
    /// Runs pool-level: this is the post-commit media step, deliberately
    /// outside the catalog transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_primary_image(
        &self,
        variant_id: VariantId,
        url: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE product_variant SET primary_image_url = $1 WHERE id = $2")
                .bind(url)
                .bind(variant_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

/// The attribute schema of a category: what is allowed, what is required.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_category_attributes(
    conn: &mut PgConnection,
    category_id: CategoryId,
) -> Result<Vec<CategoryAttribute>, RepositoryError> {
    let attributes = sqlx::query_as::<_, CategoryAttribute>(
        "SELECT id, name, is_required FROM attribute WHERE category_id = $1 ORDER BY id",
    )
    .bind(category_id)
    .fetch_all(conn)
    .await?;

    Ok(attributes)
}

/// Find a product by its identity tuple (store, category, name, brand).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_product_by_identity(
    conn: &mut PgConnection,
    store_id: StoreId,
    category_id: CategoryId,
    name: &str,
    brand: &str,
) -> Result<Option<Product>, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM product
         WHERE store_id = $1 AND category_id = $2 AND name = $3 AND brand = $4"
    ))
    .bind(store_id)
    .bind(category_id)
    .bind(name)
    .bind(brand)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// Insert a new product from a create request.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the identity tuple already exists
/// (a concurrent writer won the find-or-create race).
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert_product(
    conn: &mut PgConnection,
    store_id: StoreId,
    input: &CreateProductInput,
) -> Result<Product, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO product (store_id, category_id, name, slug, description, brand)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(store_id)
    .bind(input.category_id)
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.description)
    .bind(&input.brand)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict("product identity already exists".to_owned());
        }
        RepositoryError::Database(e)
    })?;

    Ok(product)
}

/// Lock a product row `FOR UPDATE` and return it.
///
/// Serializes concurrent catalog writes against the same product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_product(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1 FOR UPDATE"
    ))
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// Find a variant of a product by its attribute identity hash.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_variant_by_hash(
    conn: &mut PgConnection,
    product_id: ProductId,
    attribute_hash: &str,
) -> Result<Option<Variant>, RepositoryError> {
    let variant = sqlx::query_as::<_, Variant>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM product_variant
         WHERE product_id = $1 AND attribute_hash = $2
         FOR UPDATE"
    ))
    .bind(product_id)
    .bind(attribute_hash)
    .fetch_optional(conn)
    .await?;

    Ok(variant)
}

/// Insert a new variant.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a variant with the same identity
/// hash already exists on the product.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert_variant(
    conn: &mut PgConnection,
    product_id: ProductId,
    store_id: StoreId,
    sku: &str,
    attribute_hash: &str,
    price: rust_decimal::Decimal,
    stock: i32,
) -> Result<Variant, RepositoryError> {
    let variant = sqlx::query_as::<_, Variant>(&format!(
        "INSERT INTO product_variant (product_id, store_id, sku, attribute_hash, price, stock_quantity)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {VARIANT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(store_id)
    .bind(sku)
    .bind(attribute_hash)
    .bind(price)
    .bind(stock)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict("variant identity already exists".to_owned());
        }
        RepositoryError::Database(e)
    })?;

    Ok(variant)
}

/// Add stock to an existing variant and return the updated row.
///
/// Price is deliberately untouched: a re-submission of the same attribute
/// set only accumulates stock.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the variant doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn increase_variant_stock(
    conn: &mut PgConnection,
    variant_id: VariantId,
    by: i32,
) -> Result<Variant, RepositoryError> {
    let variant = sqlx::query_as::<_, Variant>(&format!(
        "UPDATE product_variant SET stock_quantity = stock_quantity + $1
         WHERE id = $2
         RETURNING {VARIANT_COLUMNS}"
    ))
    .bind(by)
    .bind(variant_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(variant)
}

/// Insert the attribute rows of a newly created variant.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any insert fails.
pub async fn insert_variant_attributes(
    conn: &mut PgConnection,
    variant_id: VariantId,
    product_id: ProductId,
    attributes: &[AttributePair],
) -> Result<(), RepositoryError> {
    for attr in attributes {
        sqlx::query(
            "INSERT INTO variant_attribute (variant_id, product_id, attribute_id, value)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(variant_id)
        .bind(product_id)
        .bind(attr.attribute_id)
        .bind(&attr.value)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Promote a variant to the product's default.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn set_default_variant(
    conn: &mut PgConnection,
    product_id: ProductId,
    variant_id: VariantId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE product SET default_variant_id = $1, updated_at = now() WHERE id = $2")
        .bind(variant_id)
        .bind(product_id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Recompute a product's aggregate stock as the sum across its variants.
///
/// Invariant after every catalog write and checkout:
/// `product.stock_quantity == SUM(variant.stock_quantity)`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn refresh_product_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<i32, RepositoryError> {
    let stock = sqlx::query_scalar::<_, i32>(
        "UPDATE product
         SET stock_quantity = COALESCE(
                 (SELECT SUM(stock_quantity)::int FROM product_variant WHERE product_id = $1), 0),
             updated_at = now()
         WHERE id = $1
         RETURNING stock_quantity",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(stock)
}
