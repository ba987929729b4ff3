//! ViaCEP postal code lookup client.

use std::time::Duration;

use async_trait::async_trait;
use limoda_core::CepCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{LookupError, PostalLookup, ResolvedAddress};

/// Public ViaCEP endpoint.
const DEFAULT_BASE_URL: &str = "https://viacep.com.br";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// ViaCEP API client.
#[derive(Clone)]
pub struct ViaCepClient {
    client: reqwest::Client,
    base_url: String,
}

impl ViaCepClient {
    /// Create a client against the public ViaCEP endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new() -> Result<Self, LookupError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PostalLookup for ViaCepClient {
    #[instrument(skip(self), fields(cep = %cep))]
    async fn resolve(&self, cep: &CepCode) -> Result<ResolvedAddress, LookupError> {
        let url = format!("{}/ws/{}/json/", self.base_url, cep.as_str());

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LookupError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let payload: ViaCepPayload = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;

        // Unknown postal codes come back 200 with an error flag.
        if payload.erro {
            return Err(LookupError::NotFound(cep.clone()));
        }

        debug!(city = %payload.localidade, "postal code resolved");
        Ok(ResolvedAddress {
            street: payload.logradouro,
            neighborhood: payload.bairro,
            city: payload.localidade,
            state: payload.uf,
        })
    }
}

/// Response body from `/ws/{cep}/json/`.
#[derive(Debug, Deserialize)]
struct ViaCepPayload {
    #[serde(default)]
    erro: bool,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}
