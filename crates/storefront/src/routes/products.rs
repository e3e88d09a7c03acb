//! Product route handlers: faceted listing, detail, catalog writes.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Serialize;

use vendora_core::{CategoryId, ProductId, StoreId};

use crate::error::{AppError, Result};
use crate::models::catalog::{
    CreateProductInput, Product, ProductDetail, ProductListing, Variant, VariantInput,
};
use crate::services::{CatalogService, ListingParams, ListingService};
use crate::state::AppState;

/// Response body for catalog writes.
#[derive(Debug, Serialize)]
pub struct CatalogWriteResponse {
    pub product: Product,
    pub variant: Variant,
}

/// Product listing with facet filters.
///
/// Reserved keys (`page`, `limit`, `category_id`, `min_price`, `max_price`,
/// `brand`) configure the query; any other key is an attribute facet and may
/// repeat (`?color=red&color=blue&size=L`). Unparseable numeric values are
/// ignored rather than rejected.
pub async fn index(
    State(state): State<AppState>,
    Path(store_id): Path<StoreId>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ProductListing>>> {
    let params = listing_params(&pairs);

    let products = ListingService::new(state.pool())
        .list(store_id, params)
        .await?;

    Ok(Json(products))
}

/// Product detail: base row, default variant, remaining variants.
pub async fn show(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(StoreId, ProductId)>,
) -> Result<Json<ProductDetail>> {
    let detail = CatalogService::new(state.pool(), state.media())
        .get_product(store_id, product_id)
        .await?;

    Ok(Json(detail))
}

/// Create a product and its first variant.
///
/// Multipart body: a `payload` part holding the JSON [`CreateProductInput`]
/// and an optional `image` part with the variant image bytes.
pub async fn create(
    State(state): State<AppState>,
    Path(store_id): Path<StoreId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CatalogWriteResponse>)> {
    let (payload, image) = read_multipart(multipart).await?;
    let input: CreateProductInput = serde_json::from_slice(&payload)
        .map_err(|e| AppError::BadRequest(format!("invalid payload: {e}")))?;

    let write = CatalogService::new(state.pool(), state.media())
        .create_product(store_id, &input, image)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CatalogWriteResponse {
            product: write.product,
            variant: write.variant,
        }),
    ))
}

/// Add (or re-submit) a variant on an existing product.
///
/// Multipart body: a `payload` part holding the JSON [`VariantInput`] and an
/// optional `image` part.
pub async fn add_variant(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(StoreId, ProductId)>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CatalogWriteResponse>)> {
    let (payload, image) = read_multipart(multipart).await?;
    let input: VariantInput = serde_json::from_slice(&payload)
        .map_err(|e| AppError::BadRequest(format!("invalid payload: {e}")))?;

    let write = CatalogService::new(state.pool(), state.media())
        .add_variant(store_id, product_id, &input, image)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CatalogWriteResponse {
            product: write.product,
            variant: write.variant,
        }),
    ))
}

/// Pull the `payload` and optional `image` parts out of a multipart body.
async fn read_multipart(mut multipart: Multipart) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
    let mut payload = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?;

        match name.as_str() {
            "payload" => payload = Some(bytes.to_vec()),
            "image" => image = Some(bytes.to_vec()),
            // Unknown parts are ignored.
            _ => {}
        }
    }

    let payload = payload.ok_or_else(|| AppError::BadRequest("missing payload part".to_owned()))?;
    Ok((payload, image))
}

/// Fold raw query pairs into listing parameters.
///
/// Repeated facet keys accumulate values under one name, preserving the
/// order in which names first appear.
fn listing_params(pairs: &[(String, String)]) -> ListingParams {
    let mut params = ListingParams::default();

    for (key, value) in pairs {
        match key.as_str() {
            "page" => params.page = value.parse::<i64>().ok(),
            "limit" => params.limit = value.parse::<i64>().ok(),
            "category_id" => {
                params.category_id = value.parse::<i64>().ok().map(CategoryId::new);
            }
            "min_price" => params.min_price = value.parse::<Decimal>().ok(),
            "max_price" => params.max_price = value.parse::<Decimal>().ok(),
            "brand" => params.brand = Some(value.clone()),
            facet => {
                match params.attributes.iter_mut().find(|(name, _)| name == facet) {
                    Some((_, values)) => values.push(value.clone()),
                    None => params.attributes.push((facet.to_owned(), vec![value.clone()])),
                }
            }
        }
    }

    params
}
