//! Startup seed data loaded from a JSON file.
//!
//! The store is in-memory, so a fresh process starts with an empty
//! catalog. Pointing `LIMODA_SEED_FILE` at a JSON document restores the
//! catalog (and optionally returning customers) before the server
//! accepts traffic.

use std::path::Path;

use limoda_checkout::model::{CustomerAggregate, ProductVariant};
use limoda_checkout::store::{CommerceStore, StoreError};
use serde::Deserialize;
use tracing::info;

/// Error loading seed data.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to insert seed document: {0}")]
    Store(#[from] StoreError),
}

/// Shape of the seed file: a catalog plus optional returning customers.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub customers: Vec<CustomerAggregate>,
}

/// Read the seed file and insert every document into the store.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// store rejects a document (duplicate ids included).
pub async fn load(store: &dyn CommerceStore, path: &Path) -> Result<(), SeedError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_json::from_str(&raw)?;

    let variant_count = seed.variants.len();
    let customer_count = seed.customers.len();

    for variant in seed.variants {
        store.insert_variant(variant).await?;
    }
    for customer in seed.customers {
        store.insert_customer(customer).await?;
    }

    info!(
        variants = variant_count,
        customers = customer_count,
        "seed data loaded"
    );
    Ok(())
}
