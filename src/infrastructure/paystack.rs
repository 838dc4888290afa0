//! Paystack HTTP client.

use crate::domain::payment::{PaymentProviderKind, ProviderStatus};
use crate::domain::ports::{Checkout, CheckoutRequest, PaymentProvider};
use crate::error::{AcademyError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error};
use uuid::Uuid;

pub const PAYSTACK_API_BASE: &str = "https://api.paystack.co";

/// Envelope wrapping every Paystack response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: ProviderStatus,
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    /// In kobo.
    amount: i64,
    callback_url: &'a str,
    metadata: Metadata<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Metadata<'a> {
    plan: &'a str,
    user_id: Uuid,
}

pub struct PaystackClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    async fn read_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
        operation: &str,
    ) -> Result<T> {
        let http_status = resp.status();
        let envelope: Envelope<T> = resp.json().await.map_err(|e| {
            AcademyError::ProviderError(format!("unreadable {operation} response: {e}"))
        })?;

        if !http_status.is_success() || !envelope.status {
            error!(%http_status, message = %envelope.message, "Paystack {operation} rejected");
            let message = if envelope.message.is_empty() {
                format!("Paystack {operation} failed")
            } else {
                envelope.message
            };
            return Err(AcademyError::ProviderError(message));
        }

        envelope
            .data
            .ok_or_else(|| AcademyError::ProviderError(format!("{operation} response had no data")))
    }
}

#[async_trait]
impl PaymentProvider for PaystackClient {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Paystack
    }

    async fn initialize(&self, request: &CheckoutRequest) -> Result<Checkout> {
        let url = format!("{}/transaction/initialize", self.base_url);
        let body = InitializeBody {
            email: request.email.as_str(),
            amount: request.amount.minor_units()?,
            callback_url: &request.callback_url,
            metadata: Metadata {
                plan: request.plan.as_str(),
                user_id: request.user_id,
            },
        };

        let started = Instant::now();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(elapsed_ms = started.elapsed().as_millis() as u64, "Paystack unreachable: {e}");
                AcademyError::ProviderError("Failed to reach payment provider".to_string())
            })?;
        debug!(
            status = %resp.status(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Paystack initialize responded"
        );

        let data: InitializeData = Self::read_envelope(resp, "initialize").await?;
        Ok(Checkout {
            authorization_url: data.authorization_url,
            reference: data.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<ProviderStatus> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                error!("Paystack unreachable: {e}");
                AcademyError::ProviderError("Failed to reach payment provider".to_string())
            })?;

        let data: VerifyData = Self::read_envelope(resp, "verify").await?;
        Ok(data.status)
    }
}
