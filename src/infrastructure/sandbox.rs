use crate::domain::payment::{PaymentProviderKind, ProviderStatus};
use crate::domain::ports::{Checkout, CheckoutRequest, PaymentProvider};
use crate::error::{AcademyError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// An offline stand-in for the payment gateway.
///
/// Checkouts are issued `sbx_` references; verification reports whatever
/// outcome was settled for the reference, falling back to the default
/// outcome. `set_available(false)` simulates a gateway outage.
#[derive(Clone)]
pub struct SandboxProvider {
    checkout_base: String,
    default_outcome: ProviderStatus,
    outcomes: Arc<RwLock<HashMap<String, ProviderStatus>>>,
    checkouts: Arc<RwLock<Vec<CheckoutRequest>>>,
    available: Arc<AtomicBool>,
}

impl SandboxProvider {
    pub fn new(checkout_base: impl Into<String>, default_outcome: ProviderStatus) -> Self {
        Self {
            checkout_base: checkout_base.into(),
            default_outcome,
            outcomes: Arc::default(),
            checkouts: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Fixes the outcome `verify` reports for `reference`.
    pub async fn settle(&self, reference: &str, outcome: ProviderStatus) {
        self.outcomes
            .write()
            .await
            .insert(reference.to_string(), outcome);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Every checkout requested so far, oldest first.
    pub async fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.checkouts.read().await.clone()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AcademyError::ProviderError(
                "Sandbox provider is unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl PaymentProvider for SandboxProvider {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Sandbox
    }

    async fn initialize(&self, request: &CheckoutRequest) -> Result<Checkout> {
        self.ensure_available()?;
        let reference = format!("sbx_{}", Uuid::new_v4().simple());
        info!(%reference, email = %request.email, "sandbox checkout created");
        self.checkouts.write().await.push(request.clone());
        Ok(Checkout {
            authorization_url: format!(
                "{}/sandbox/checkout/{}",
                self.checkout_base.trim_end_matches('/'),
                reference
            ),
            reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<ProviderStatus> {
        self.ensure_available()?;
        let outcomes = self.outcomes.read().await;
        Ok(outcomes
            .get(reference)
            .copied()
            .unwrap_or(self.default_outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Plan;
    use crate::domain::user::Email;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            email: Email::parse("a@x.com").unwrap(),
            amount: Plan::Full.price(),
            callback_url: "http://localhost/dashboard".to_string(),
            plan: Plan::Full,
            user_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_sandbox_checkout_and_settle() {
        let provider = SandboxProvider::new("http://localhost:3000/", ProviderStatus::Pending);
        let checkout = provider.initialize(&request()).await.unwrap();

        assert!(checkout.reference.starts_with("sbx_"));
        assert_eq!(
            checkout.authorization_url,
            format!("http://localhost:3000/sandbox/checkout/{}", checkout.reference)
        );
        assert_eq!(
            provider.verify(&checkout.reference).await.unwrap(),
            ProviderStatus::Pending
        );

        provider
            .settle(&checkout.reference, ProviderStatus::Success)
            .await;
        assert_eq!(
            provider.verify(&checkout.reference).await.unwrap(),
            ProviderStatus::Success
        );
        assert_eq!(provider.checkouts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sandbox_outage() {
        let provider = SandboxProvider::new("http://localhost", ProviderStatus::Success);
        provider.set_available(false);
        assert!(matches!(
            provider.verify("sbx_1").await,
            Err(AcademyError::ProviderError(_))
        ));
        assert!(matches!(
            provider.initialize(&request()).await,
            Err(AcademyError::ProviderError(_))
        ));
    }
}
