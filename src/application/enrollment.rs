use crate::application::auth::Caller;
use crate::domain::payment::{Amount, Payment, PaymentStatus, Plan, ProviderStatus};
use crate::domain::ports::{CheckoutRequest, Enrollment, ProviderRef, StoreRef};
use crate::domain::profile::StudentProfile;
use crate::domain::user::{Email, Role, User};
use crate::error::{AcademyError, Result};
use crate::infrastructure::tokens::{TokenPair, TokenService};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Who is starting a checkout.
#[derive(Debug, Clone)]
pub enum Initiator {
    /// A signed-in account; the plan decides the price.
    Authenticated(Uuid),
    /// Anyone with an e-mail address; the account is created on first use.
    Public {
        email: Email,
        name: String,
        phone_number: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
    pub plan: Plan,
    /// Honoured for public checkouts only.
    pub amount: Option<Amount>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStarted {
    pub authorization_url: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub status: PaymentStatus,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkPaidOutcome {
    pub ok: bool,
    pub email: String,
    pub role: Role,
    pub reference: String,
}

/// A provider notification, as delivered to the webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChargeData {
    reference: String,
    #[serde(default)]
    receipt_url: Option<String>,
}

/// Payment-gated enrollment: checkout, confirmation and manual settlement.
///
/// Both confirmation paths (`verify` polled by clients, `handle_webhook`
/// pushed by the provider) end in [`PaymentStore::reconcile`], which owns
/// the idempotency guard.
///
/// [`PaymentStore::reconcile`]: crate::domain::ports::PaymentStore::reconcile
pub struct EnrollmentService {
    store: StoreRef,
    provider: ProviderRef,
    tokens: TokenService,
    default_callback_url: String,
}

impl EnrollmentService {
    pub fn new(
        store: StoreRef,
        provider: ProviderRef,
        tokens: TokenService,
        default_callback_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            tokens,
            default_callback_url: default_callback_url.into(),
        }
    }

    /// Opens a checkout with the provider and records a pending payment.
    ///
    /// Nothing is persisted unless the provider accepted the checkout. The
    /// account (public flow) and its student profile are written together
    /// with the payment.
    pub async fn initialize(
        &self,
        initiator: Initiator,
        options: CheckoutOptions,
    ) -> Result<CheckoutStarted> {
        let (user, new_user, amount) = match initiator {
            Initiator::Authenticated(id) => {
                let user = self
                    .store
                    .get_user(id)
                    .await?
                    .ok_or_else(|| AcademyError::Unauthorized("User not found".to_string()))?;
                (user, false, options.plan.price())
            }
            Initiator::Public {
                email,
                name,
                phone_number,
            } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(AcademyError::ValidationError(
                        "Email and Name are required".to_string(),
                    ));
                }
                let amount = options.amount.unwrap_or_else(|| options.plan.price());
                match self.store.find_user_by_email(&email).await? {
                    Some(user) => (user, false, amount),
                    None => (User::new(email, name, phone_number), true, amount),
                }
            }
        };

        match user.role {
            Role::Student => {
                return Err(AcademyError::ValidationError(
                    "User is already a student".to_string(),
                ));
            }
            Role::Applicant | Role::Admin => {}
        }

        let (profile_id, new_profile) = self.profile_for(user.id, new_user).await?;

        let checkout = self
            .provider
            .initialize(&CheckoutRequest {
                email: user.email.clone(),
                amount,
                callback_url: options
                    .callback_url
                    .unwrap_or_else(|| self.default_callback_url.clone()),
                plan: options.plan,
                user_id: user.id,
            })
            .await?;

        let payment = Payment::pending(
            profile_id,
            amount,
            self.provider.kind(),
            checkout.reference.clone(),
        );
        let user_id = user.id;
        self.store
            .commit_enrollment(Enrollment {
                user_id,
                new_user: new_user.then_some(user),
                new_profile,
                payment,
            })
            .await?;

        info!(
            %user_id,
            reference = %checkout.reference,
            plan = options.plan.as_str(),
            "checkout initialized"
        );
        Ok(CheckoutStarted {
            authorization_url: checkout.authorization_url,
            reference: checkout.reference,
        })
    }

    /// Polls the provider for `reference` and applies its answer.
    ///
    /// Anonymous callers act as the payment's owner. Fresh tokens are
    /// returned once the payment is paid and the subject is a student, since
    /// any token they hold may predate the upgrade. An anonymous caller only
    /// gets tokens for an owner without a password; everyone else signs in.
    pub async fn verify(&self, caller: Option<&Caller>, reference: &str) -> Result<VerifyOutcome> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AcademyError::ValidationError(
                "Reference is required".to_string(),
            ));
        }

        let payment = self
            .store
            .get_payment(reference)
            .await?
            .ok_or_else(|| AcademyError::NotFound("Payment not found".to_string()))?;
        let owner_id = self.owner_id(&payment).await?;

        if let Some(caller) = caller {
            match caller.role {
                Role::Admin => {}
                Role::Applicant | Role::Student if caller.id == owner_id => {}
                Role::Applicant | Role::Student => {
                    return Err(AcademyError::Forbidden("Forbidden".to_string()));
                }
            }
        }

        let reported = self.provider.verify(reference).await?;
        let reconciliation = self
            .store
            .reconcile(reference, reported, None)
            .await?
            .ok_or_else(|| AcademyError::NotFound("Payment not found".to_string()))?;

        if reconciliation.applied {
            info!(
                reference,
                status = ?reconciliation.payment.status,
                role = %reconciliation.owner.role,
                "payment reconciled by verification"
            );
        }

        let tokens = if reconciliation.payment.status == PaymentStatus::Paid {
            let subject = match caller {
                Some(caller) if caller.id != reconciliation.owner.id => {
                    self.store.get_user(caller.id).await?
                }
                Some(_) => Some(reconciliation.owner.clone()),
                None if reconciliation.owner.has_password() => None,
                None => Some(reconciliation.owner.clone()),
            };
            match subject {
                Some(user) if user.role == Role::Student => {
                    Some(self.tokens.issue_pair(user.id, user.role)?)
                }
                _ => None,
            }
        } else {
            None
        };

        Ok(VerifyOutcome {
            status: reconciliation.payment.status,
            reference: reconciliation.payment.reference,
            tokens,
        })
    }

    /// Applies an authenticated provider notification.
    ///
    /// Unknown references and unrelated events are acknowledged silently.
    pub async fn handle_webhook(&self, event: WebhookEvent) -> Result<()> {
        match event.event.as_str() {
            "charge.success" => {
                let data: ChargeData = serde_json::from_value(event.data).map_err(|e| {
                    AcademyError::ValidationError(format!("Malformed charge event: {e}"))
                })?;
                match self
                    .store
                    .reconcile(&data.reference, ProviderStatus::Success, data.receipt_url)
                    .await?
                {
                    Some(reconciliation) if reconciliation.applied => info!(
                        reference = %data.reference,
                        role = %reconciliation.owner.role,
                        "payment reconciled by webhook"
                    ),
                    Some(_) => debug!(reference = %data.reference, "webhook for settled payment"),
                    None => warn!(reference = %data.reference, "webhook for unknown reference"),
                }
            }
            other => debug!(event = other, "webhook event ignored"),
        }
        Ok(())
    }

    /// Records an out-of-band payment for an existing account and promotes it.
    pub async fn mark_paid(&self, email: &Email, amount: Option<Amount>) -> Result<MarkPaidOutcome> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AcademyError::NotFound("User not found".to_string()))?;
        let (profile_id, new_profile) = self.profile_for(user.id, false).await?;

        let mut payment = Payment::pending(
            profile_id,
            amount.unwrap_or_else(|| Plan::Full.price()),
            self.provider.kind(),
            format!("manual-{}", Utc::now().timestamp_millis()),
        );
        payment.status = PaymentStatus::Paid;

        let enrolled = self
            .store
            .commit_enrollment(Enrollment {
                user_id: user.id,
                new_user: None,
                new_profile,
                payment,
            })
            .await?;

        info!(user_id = %user.id, reference = %enrolled.payment.reference, "payment marked paid");
        Ok(MarkPaidOutcome {
            ok: true,
            email: enrolled.owner.email.to_string(),
            role: enrolled.owner.role,
            reference: enrolled.payment.reference,
        })
    }

    async fn profile_for(
        &self,
        user_id: Uuid,
        new_user: bool,
    ) -> Result<(Uuid, Option<StudentProfile>)> {
        let existing = if new_user {
            None
        } else {
            self.store.find_profile_by_user(user_id).await?
        };
        Ok(match existing {
            Some(profile) => (profile.id, None),
            None => {
                let profile = StudentProfile::new(user_id);
                (profile.id, Some(profile))
            }
        })
    }

    async fn owner_id(&self, payment: &Payment) -> Result<Uuid> {
        self.store
            .get_profile(payment.profile_id)
            .await?
            .map(|profile| profile.user_id)
            .ok_or_else(|| {
                AcademyError::internal(format!("payment {} has no profile", payment.reference))
            })
    }
}
