//! Application state shared across handlers.

use std::sync::Arc;

use limoda_checkout::clients::{
    LookupError, PagBankClient, PaymentError, PaymentGateway, PostalLookup, ViaCepClient,
};
use limoda_checkout::coupon::CouponLedger;
use limoda_checkout::inventory::AvailabilityCache;
use limoda_checkout::orchestrator::CheckoutService;
use limoda_checkout::store::{CommerceStore, MemoryStore};

use crate::config::ServerConfig;

/// Error building the shared clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("postal client error: {0}")]
    Postal(#[from] LookupError),
    #[error("payment client error: {0}")]
    Payment(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the document store, the checkout pipeline, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn CommerceStore>,
    checkout: CheckoutService,
    coupons: CouponLedger,
    availability: AvailabilityCache,
}

impl AppState {
    /// Create the application state with real outbound clients.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client fails to build (for the
    /// gateway that includes an unusable bearer token).
    pub fn new(config: ServerConfig) -> Result<Self, StateError> {
        let postal: Arc<dyn PostalLookup> = match &config.viacep_base_url {
            Some(base) => Arc::new(ViaCepClient::with_base_url(base.clone())?),
            None => Arc::new(ViaCepClient::new()?),
        };
        let gateway: Arc<dyn PaymentGateway> = match &config.pagbank.base_url {
            Some(base) => Arc::new(PagBankClient::with_base_url(
                &config.pagbank.token,
                config.pagbank.notification_url.clone(),
                base.clone(),
            )?),
            None => Arc::new(PagBankClient::new(
                &config.pagbank.token,
                config.pagbank.notification_url.clone(),
            )?),
        };
        let store: Arc<dyn CommerceStore> = Arc::new(MemoryStore::new());

        Ok(Self::with_components(config, store, postal, gateway))
    }

    /// Create the application state from pre-built components.
    ///
    /// Integration tests use this to swap the outbound clients for stubs
    /// while keeping the rest of the pipeline real.
    #[must_use]
    pub fn with_components(
        config: ServerConfig,
        store: Arc<dyn CommerceStore>,
        postal: Arc<dyn PostalLookup>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let checkout = CheckoutService::new(Arc::clone(&store), postal, gateway);
        let coupons = CouponLedger::new(Arc::clone(&store));
        let availability = AvailabilityCache::new(Arc::clone(&store));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                checkout,
                coupons,
                availability,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CommerceStore> {
        &self.inner.store
    }

    /// Get a reference to the checkout pipeline.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Get a reference to the coupon ledger.
    #[must_use]
    pub fn coupons(&self) -> &CouponLedger {
        &self.inner.coupons
    }

    /// Get a reference to the availability cache.
    #[must_use]
    pub fn availability(&self) -> &AvailabilityCache {
        &self.inner.availability
    }
}
