//! Listing service: facet-name resolution in front of the query assembler.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;

use vendora_core::CategoryId;
use vendora_core::StoreId;

use crate::db::{CatalogRepository, ListingFilters, ListingQuery, RepositoryError};
use crate::db::listing::AttributeFilter;
use crate::models::catalog::ProductListing;

/// Decoded listing parameters, facets still keyed by attribute name.
#[derive(Debug, Clone, Default)]
pub struct ListingParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub brand: Option<String>,
    /// Facet name -> requested values (OR within a name, AND across names).
    pub attributes: Vec<(String, Vec<String>)>,
}

/// Listing service.
pub struct ListingService<'a> {
    pool: &'a PgPool,
}

impl<'a> ListingService<'a> {
    /// Create a new listing service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve facet names and run the assembled listing query.
    ///
    /// Names that don't match an attribute of this store's categories are
    /// dropped silently: a stale or mistyped facet narrows nothing instead
    /// of failing the whole listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        store_id: StoreId,
        params: ListingParams,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let attributes = self.resolve_facets(store_id, &params.attributes).await?;

        let filters = ListingFilters {
            page: params.page,
            limit: params.limit,
            category_id: params.category_id,
            min_price: params.min_price,
            max_price: params.max_price,
            brand: params.brand,
            attributes,
        };

        ListingQuery::build(store_id, &filters).fetch(self.pool).await
    }

    async fn resolve_facets(
        &self,
        store_id: StoreId,
        requested: &[(String, Vec<String>)],
    ) -> Result<Vec<AttributeFilter>, RepositoryError> {
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = requested.iter().map(|(name, _)| name.clone()).collect();
        let resolved: HashMap<String, _> = CatalogRepository::new(self.pool)
            .resolve_attribute_ids(store_id, &names)
            .await?
            .into_iter()
            .collect();

        let filters = requested
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .filter_map(|(name, values)| {
                resolved.get(name).map(|&attribute_id| AttributeFilter {
                    attribute_id,
                    values: values.clone(),
                })
            })
            .collect();

        Ok(filters)
    }
}
