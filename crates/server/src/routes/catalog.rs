//! Catalog API routes.
//!
//! Read-only views over the variant documents: the storefront listing
//! with effective prices, and the cached per-variant stock snapshot the
//! product page polls.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::Serialize;

use limoda_checkout::inventory::Availability;
use limoda_checkout::model::ProductVariant;
use limoda_checkout::store::StoreError;
use limoda_core::{Money, VariantId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// One catalog entry: the variant document plus the price in effect now.
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub variant: ProductVariant,
    /// Promo price while a promotion is active, base price otherwise.
    pub effective_price: Money,
}

/// List active variants with their effective prices.
///
/// GET /api/catalog
///
/// Inactive variants stay out of the listing entirely.
///
/// # Errors
///
/// Returns `AppError` if the store read fails.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<CatalogEntry>>> {
    let now = Utc::now();
    let variants = state.store().list_variants().await?;

    let entries = variants
        .into_iter()
        .filter(|variant| variant.doc.active)
        .map(|variant| {
            let effective_price = variant.doc.effective_price(now);
            CatalogEntry {
                variant: variant.doc,
                effective_price,
            }
        })
        .collect();

    Ok(Json(entries))
}

/// Cached stock snapshot for one variant.
///
/// GET /api/variants/{id}/availability
///
/// Snapshots are advisory and may lag a committed order by up to the
/// cache TTL; only the commit path decides whether stock suffices.
///
/// # Errors
///
/// Returns 404 if the variant does not exist.
pub async fn availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Availability>> {
    let variant_id = VariantId::new(id);
    let snapshot = state
        .availability()
        .check(&variant_id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound { .. } => AppError::NotFound(format!("variant {variant_id}")),
            other => AppError::from(other),
        })?;
    Ok(Json(snapshot))
}
