//! Catalog writer: find-or-create products and variants.
//!
//! `create_product` and `add_variant` each run one database transaction
//! covering attribute validation, product/variant find-or-create,
//! default-variant promotion, and the aggregate stock recompute. Image
//! upload deliberately happens **after** commit (see
//! [`crate::services::media`]): the catalog rows are the source of truth and
//! must exist independent of whether the image succeeds.

use std::collections::BTreeSet;

use sqlx::PgPool;
use thiserror::Error;

use vendora_core::{
    AttributeId, CategoryId, ProductId, StoreId, variant_identity_hash,
};

use crate::db::catalog::{
    find_product_by_identity, find_variant_by_hash, increase_variant_stock, insert_product,
    insert_variant, insert_variant_attributes, list_category_attributes, lock_product,
    refresh_product_stock, set_default_variant,
};
use crate::db::{CatalogRepository, RepositoryError};
use crate::models::catalog::{
    AttributePair, CategoryAttribute, CreateProductInput, Product, ProductDetail, Variant,
    VariantDetail, VariantInput,
};
use crate::services::media;
use crate::storage::ObjectStore;

/// Catalog writer errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Submitted attribute is not in the category's allowed set.
    #[error("attribute {attribute_id} is not allowed for category {category_id}")]
    AttributeNotAllowed {
        attribute_id: AttributeId,
        category_id: CategoryId,
    },

    /// Required category attributes are missing from the submission.
    #[error("missing required attributes: {}", format_ids(.0))]
    MissingRequiredAttributes(Vec<AttributeId>),

    /// The same attribute id appears more than once in the submission.
    #[error("duplicate attribute {0} in variant submission")]
    DuplicateAttribute(AttributeId),

    /// Stock quantity must be positive.
    #[error("stock quantity must be greater than zero")]
    InvalidQuantity,

    /// Price must not be negative.
    #[error("price must not be negative")]
    InvalidPrice,

    /// Product does not exist (or belongs to another store).
    #[error("product not found")]
    ProductNotFound,

    /// Repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn format_ids(ids: &[AttributeId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of a catalog write: the final rows, post-commit.
#[derive(Debug)]
pub struct CatalogWrite {
    pub product: Product,
    pub variant: Variant,
}

/// Catalog service over a pool and an object storage collaborator.
pub struct CatalogService<'a, S> {
    pool: &'a PgPool,
    storage: &'a S,
}

impl<'a, S: ObjectStore> CatalogService<'a, S> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, storage: &'a S) -> Self {
        Self { pool, storage }
    }

    /// Create or update a product and one variant in a single transaction,
    /// then best-effort attach the image.
    ///
    /// Re-submitting an existing product identity finds the product;
    /// re-submitting an existing attribute set finds the variant and adds
    /// the submitted stock to it (price is never overwritten on a match).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` validation variants before any write, and
    /// `CatalogError::Repository` for database failures (the transaction is
    /// rolled back).
    pub async fn create_product(
        &self,
        store_id: StoreId,
        input: &CreateProductInput,
        image: Option<Vec<u8>>,
    ) -> Result<CatalogWrite, CatalogError> {
        validate_variant_input(&input.variant)?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let allowed = list_category_attributes(&mut *tx, input.category_id).await?;
        validate_variant_attributes(input.category_id, &allowed, &input.variant.attributes)?;

        let (product, was_out_of_stock) = match find_product_by_identity(
            &mut *tx,
            store_id,
            input.category_id,
            &input.name,
            &input.brand,
        )
        .await?
        {
            Some(existing) => {
                let out_of_stock = existing.stock_quantity == 0;
                (existing, out_of_stock)
            }
            // A brand-new product is by definition unsellable so far.
            None => (insert_product(&mut *tx, store_id, input).await?, true),
        };

        let variant =
            find_or_create_variant(&mut *tx, store_id, product.id, &input.variant).await?;

        if was_out_of_stock {
            set_default_variant(&mut *tx, product.id, variant.id).await?;
        }

        refresh_product_stock(&mut *tx, product.id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        self.finish_write(store_id, product.id, variant, image).await
    }

    /// Add (or re-submit) a variant on an existing product.
    ///
    /// Locks the product row for the duration of the transaction so
    /// concurrent writes against the same product serialize.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product doesn't exist
    /// or belongs to a different store; validation variants before any
    /// write; `CatalogError::Repository` for database failures.
    pub async fn add_variant(
        &self,
        store_id: StoreId,
        product_id: ProductId,
        input: &VariantInput,
        image: Option<Vec<u8>>,
    ) -> Result<CatalogWrite, CatalogError> {
        validate_variant_input(input)?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let product = lock_product(&mut *tx, product_id)
            .await?
            .filter(|p| p.store_id == store_id)
            .ok_or(CatalogError::ProductNotFound)?;

        let was_out_of_stock = product.stock_quantity == 0;

        let allowed = list_category_attributes(&mut *tx, product.category_id).await?;
        validate_variant_attributes(product.category_id, &allowed, &input.attributes)?;

        let variant = find_or_create_variant(&mut *tx, store_id, product.id, input).await?;

        if was_out_of_stock {
            set_default_variant(&mut *tx, product.id, variant.id).await?;
        }

        refresh_product_stock(&mut *tx, product.id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        self.finish_write(store_id, product.id, variant, image).await
    }

    /// Full product detail: base row, default variant, remaining variants.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product doesn't exist
    /// in this store.
    pub async fn get_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<ProductDetail, CatalogError> {
        let repo = CatalogRepository::new(self.pool);

        let product = repo
            .get_product(store_id, product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;

        let mut default_variant = None;
        let mut variants = Vec::new();

        for (i, v) in repo.list_variants(product_id).await?.into_iter().enumerate() {
            let attributes = repo.list_variant_attributes(v.id).await?;
            let detail = VariantDetail {
                variant_id: v.id,
                sku: v.sku,
                price: v.price,
                stock_quantity: v.stock_quantity,
                image_url: v.primary_image_url,
                attributes,
            };

            let is_default = match product.default_variant_id {
                Some(default_id) => detail.variant_id == default_id,
                // Fall-over: no default set, treat the first variant as it.
                None => i == 0,
            };

            if is_default && default_variant.is_none() {
                default_variant = Some(detail);
            } else {
                variants.push(detail);
            }
        }

        Ok(ProductDetail {
            product_id: product.id,
            store_id: product.store_id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            brand: product.brand,
            category_id: product.category_id,
            total_stock: product.stock_quantity,
            in_stock: product.stock_quantity > 0,
            default_variant,
            variants,
        })
    }

    /// Post-commit tail shared by both write paths: attach the image (if
    /// any, and only when the variant has none yet) and re-read the product
    /// so the caller sees the promoted default and refreshed stock.
    async fn finish_write(
        &self,
        store_id: StoreId,
        product_id: ProductId,
        mut variant: Variant,
        image: Option<Vec<u8>>,
    ) -> Result<CatalogWrite, CatalogError> {
        let repo = CatalogRepository::new(self.pool);

        if let Some(bytes) = image
            && variant.primary_image_url.is_none()
            && let Some(url) =
                media::attach_primary_image(self.storage, &repo, store_id, variant.id, bytes).await
        {
            variant.primary_image_url = Some(url);
        }

        let product = repo
            .get_product(store_id, product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;

        Ok(CatalogWrite { product, variant })
    }
}

/// Reject bad quantity/price before touching the database.
fn validate_variant_input(input: &VariantInput) -> Result<(), CatalogError> {
    if input.stock <= 0 {
        return Err(CatalogError::InvalidQuantity);
    }
    if input.price.is_sign_negative() {
        return Err(CatalogError::InvalidPrice);
    }
    Ok(())
}

/// Validate a submitted attribute set against the category schema.
///
/// Every submitted attribute must be allowed, no attribute may repeat, and
/// every required attribute must be present.
fn validate_variant_attributes(
    category_id: CategoryId,
    allowed: &[CategoryAttribute],
    submitted: &[AttributePair],
) -> Result<(), CatalogError> {
    let allowed_ids: BTreeSet<AttributeId> = allowed.iter().map(|a| a.id).collect();
    let mut required: BTreeSet<AttributeId> = allowed
        .iter()
        .filter(|a| a.is_required)
        .map(|a| a.id)
        .collect();

    let mut seen = BTreeSet::new();
    for pair in submitted {
        if !allowed_ids.contains(&pair.attribute_id) {
            return Err(CatalogError::AttributeNotAllowed {
                attribute_id: pair.attribute_id,
                category_id,
            });
        }
        if !seen.insert(pair.attribute_id) {
            return Err(CatalogError::DuplicateAttribute(pair.attribute_id));
        }
        required.remove(&pair.attribute_id);
    }

    if !required.is_empty() {
        return Err(CatalogError::MissingRequiredAttributes(
            required.into_iter().collect(),
        ));
    }

    Ok(())
}

/// Find a variant by its recomputed identity hash, or create it.
///
/// On a match the submitted stock accumulates onto the existing variant; on
/// a miss the variant and its attribute rows are inserted.
async fn find_or_create_variant(
    tx: &mut sqlx::PgConnection,
    store_id: StoreId,
    product_id: ProductId,
    input: &VariantInput,
) -> Result<Variant, CatalogError> {
    // Always recomputed from the payload; never trusted from the client.
    let pairs: Vec<(AttributeId, String)> = input
        .attributes
        .iter()
        .map(|a| (a.attribute_id, a.value.clone()))
        .collect();
    let hash = variant_identity_hash(&pairs);

    if let Some(existing) = find_variant_by_hash(tx, product_id, &hash).await? {
        return Ok(increase_variant_stock(tx, existing.id, input.stock).await?);
    }

    let variant = insert_variant(
        tx,
        product_id,
        store_id,
        &input.sku,
        &hash,
        input.price,
        input.stock,
    )
    .await?;

    insert_variant_attributes(tx, variant.id, product_id, &input.attributes).await?;

    Ok(variant)
}
