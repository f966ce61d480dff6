use std::time::Duration;

use async_trait::async_trait;
use pixelmint_config::PaymentsConfig;
use pixelmint_core::InvoiceId;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ProviderError;
use crate::provider::{CreateInvoice, PaymentProvider, ProviderInvoice};

/// Authentication header expected by Crypto Pay
const TOKEN_HEADER: &str = "Crypto-Pay-API-Token";

/// Response envelope wrapping every Crypto Pay result
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct InvoiceList {
    #[serde(default)]
    items: Vec<ProviderInvoice>,
}

/// Async HTTP client for the Crypto Pay API
#[derive(Clone)]
pub struct CryptoPayClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
}

impl CryptoPayClient {
    /// Create a new Crypto Pay client
    ///
    /// `base_url` must end with a slash (e.g. `https://pay.crypt.bot/api/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(base_url: Url, token: SecretString, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProviderError::Request)?;

        Ok(Self { http, base_url, token })
    }

    /// Create a client from the `[payments]` section
    pub fn from_config(config: &PaymentsConfig) -> Result<Self, ProviderError> {
        Self::new(
            config.api_base_url(),
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Issue an invoice
    ///
    /// POST `/createInvoice`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or Crypto Pay returns an error
    pub async fn create_invoice(&self, request: &CreateInvoice) -> Result<ProviderInvoice, ProviderError> {
        let url = self.endpoint("createInvoice")?;

        let response = self
            .http
            .post(url)
            .header(TOKEN_HEADER, self.token.expose_secret())
            .json(request)
            .send()
            .await?;

        Self::unwrap_envelope(response).await
    }

    /// Fetch invoices by id
    ///
    /// GET `/getInvoices?invoice_ids=1,2,3`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or Crypto Pay returns an error
    pub async fn get_invoices(&self, invoice_ids: &[InvoiceId]) -> Result<Vec<ProviderInvoice>, ProviderError> {
        let url = self.endpoint("getInvoices")?;
        let ids = invoice_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");

        let response = self
            .http
            .get(url)
            .header(TOKEN_HEADER, self.token.expose_secret())
            .query(&[("invoice_ids", ids)])
            .send()
            .await?;

        let list: InvoiceList = Self::unwrap_envelope(response).await?;
        Ok(list.items)
    }

    fn endpoint(&self, method: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(method)
            .map_err(|e| ProviderError::InvalidUrl(format!("{method}: {e}")))
    }

    async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Crypto Pay returned error status");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = response.json().await?;

        match envelope {
            Envelope {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            Envelope { error: Some(error), .. } => Err(ProviderError::Api {
                status: error.code,
                message: error.name,
            }),
            Envelope { .. } => Err(ProviderError::Api {
                status: status.as_u16(),
                message: "response carried neither result nor error".to_owned(),
            }),
        }
    }
}

#[async_trait]
impl PaymentProvider for CryptoPayClient {
    async fn create_invoice(&self, request: &CreateInvoice) -> Result<ProviderInvoice, ProviderError> {
        Self::create_invoice(self, request).await
    }

    async fn get_invoice(&self, invoice_id: InvoiceId) -> Result<Option<ProviderInvoice>, ProviderError> {
        let invoices = self.get_invoices(&[invoice_id]).await?;
        Ok(invoices.into_iter().find(|i| i.invoice_id == invoice_id))
    }
}

impl std::fmt::Debug for CryptoPayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoPayClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
