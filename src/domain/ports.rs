use super::cohort::{Cohort, CohortChanges};
use super::payment::{Amount, Payment, PaymentProviderKind, Plan, ProviderStatus};
use super::profile::StudentProfile;
use super::user::{Email, PasswordReset, User, UserChanges};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the e-mail is already registered.
    async fn insert_user(&self, user: User) -> Result<()>;
    /// Replaces only the password hash. Fails with `NotFound` when the user
    /// does not exist.
    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> Result<()>;
    /// Applies `changes` to the stored account. Fails with `NotFound` when
    /// the user does not exist.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>>;

    /// Replaces any reset previously issued to the same user.
    async fn save_password_reset(&self, reset: PasswordReset) -> Result<()>;
    /// Consumes the reset stored under `token_digest` and, unless it expired
    /// before `now`, sets the owner's password hash in the same write.
    /// Returns the owner's id, or `None` for an unknown or expired token.
    async fn redeem_password_reset(
        &self,
        token_digest: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fails with `Conflict` when the user already has a profile.
    async fn insert_profile(&self, profile: StudentProfile) -> Result<()>;
    async fn get_profile(&self, id: Uuid) -> Result<Option<StudentProfile>>;
    async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<StudentProfile>>;
    /// Moves the user's profile into `cohort_id`. Fails with `NotFound` when
    /// either the profile or the cohort is missing.
    async fn assign_cohort(&self, user_id: Uuid, cohort_id: Uuid) -> Result<StudentProfile>;
    async fn count_profiles_in_cohort(&self, cohort_id: Uuid) -> Result<usize>;
}

#[async_trait]
pub trait CohortStore: Send + Sync {
    /// Fails with `Conflict` when another cohort has the same name.
    async fn insert_cohort(&self, cohort: Cohort) -> Result<()>;
    /// Applies `changes` under the same name-uniqueness rule. Fails with
    /// `NotFound` for an unknown id.
    async fn update_cohort(&self, id: Uuid, changes: CohortChanges) -> Result<Cohort>;
    async fn get_cohort(&self, id: Uuid) -> Result<Option<Cohort>>;
    /// Latest start date first.
    async fn list_cohorts(&self) -> Result<Vec<Cohort>>;
}

/// Everything written when a payment is recorded.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub user_id: Uuid,
    /// Account to create; `None` when `user_id` is already stored.
    pub new_user: Option<User>,
    /// Created only if the user has no profile yet; if one appeared in the
    /// meantime the payment is attached to it instead.
    pub new_profile: Option<StudentProfile>,
    /// A payment committed as `Paid` promotes its owner in the same write.
    pub payment: Payment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enrolled {
    pub payment: Payment,
    pub owner: User,
}

/// Outcome of applying a provider report to a stored payment.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub payment: Payment,
    pub owner: User,
    /// `true` only for the caller whose commit changed the payment.
    pub applied: bool,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get_payment(&self, reference: &str) -> Result<Option<Payment>>;
    async fn payments_for_profile(&self, profile_id: Uuid) -> Result<Vec<Payment>>;

    /// Writes user, profile and payment in one transaction. Fails with
    /// `Conflict` on a duplicate reference or an e-mail that is already
    /// registered, and with `NotFound` when an existing `user_id` is missing.
    async fn commit_enrollment(&self, enrollment: Enrollment) -> Result<Enrolled>;

    /// Applies `reported` to the payment and its owner in one transaction,
    /// using [`apply_provider_status`](super::payment::apply_provider_status)
    /// as the only guard. Returns `None` for an unknown reference.
    async fn reconcile(
        &self,
        reference: &str,
        reported: ProviderStatus,
        receipt_url: Option<String>,
    ) -> Result<Option<Reconciliation>>;
}

/// A single backend serving every table, so enrollment and reconciliation
/// can span users and payments atomically.
pub trait Store: UserStore + ProfileStore + CohortStore + PaymentStore {}

impl<T: UserStore + ProfileStore + CohortStore + PaymentStore> Store for T {}

pub type StoreRef = Arc<dyn Store>;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub email: Email,
    pub amount: Amount,
    pub callback_url: String,
    pub plan: Plan,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    pub authorization_url: String,
    pub reference: String,
}

/// The external payment gateway.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn kind(&self) -> PaymentProviderKind;
    async fn initialize(&self, request: &CheckoutRequest) -> Result<Checkout>;
    async fn verify(&self, reference: &str) -> Result<ProviderStatus>;
}

pub type ProviderRef = Arc<dyn PaymentProvider>;
