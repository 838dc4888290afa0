use crate::domain::cohort::{Cohort, CohortChanges};
use crate::domain::payment::{Payment, PaymentStatus, ProviderStatus, apply_provider_status};
use crate::domain::ports::{
    CohortStore, Enrolled, Enrollment, PaymentStore, ProfileStore, Reconciliation, UserStore,
};
use crate::domain::profile::StudentProfile;
use crate::domain::user::{Email, PasswordReset, User, UserChanges};
use crate::error::{AcademyError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    user_emails: HashMap<Email, Uuid>,
    profiles: HashMap<Uuid, StudentProfile>,
    profile_by_user: HashMap<Uuid, Uuid>,
    cohorts: HashMap<Uuid, Cohort>,
    cohort_names: HashMap<String, Uuid>,
    payments: HashMap<String, Payment>,
    password_resets: HashMap<String, PasswordReset>,
    reset_by_user: HashMap<Uuid, String>,
}

impl Tables {
    fn check_email_free(&self, email: &Email) -> Result<()> {
        if self.user_emails.contains_key(email) {
            return Err(AcademyError::Conflict(format!("Email already taken: {email}")));
        }
        Ok(())
    }

    fn put_user(&mut self, user: User) {
        self.user_emails.insert(user.email.clone(), user.id);
        self.users.insert(user.id, user);
    }

    fn put_profile(&mut self, profile: StudentProfile) {
        self.profile_by_user.insert(profile.user_id, profile.id);
        self.profiles.insert(profile.id, profile);
    }

    /// `except` is the cohort being renamed, which may keep its own name.
    fn check_cohort_name_free(&self, name: &str, except: Option<Uuid>) -> Result<()> {
        match self.cohort_names.get(name) {
            Some(id) if Some(*id) != except => Err(AcademyError::Conflict(format!(
                "Cohort with this name already exists: {name}"
            ))),
            _ => Ok(()),
        }
    }

    fn put_cohort(&mut self, cohort: Cohort) {
        self.cohort_names.insert(cohort.name.clone(), cohort.id);
        self.cohorts.insert(cohort.id, cohort);
    }

    fn owner_of(&self, payment: &Payment) -> Result<&User> {
        self.profiles
            .get(&payment.profile_id)
            .and_then(|profile| self.users.get(&profile.user_id))
            .ok_or_else(|| {
                AcademyError::internal(format!(
                    "payment {} has no owning account",
                    payment.reference
                ))
            })
    }
}

/// A thread-safe in-memory store for every table.
///
/// All tables sit behind one `RwLock`, so holding the write guard is the
/// transaction boundary for enrollment and reconciliation.
/// Used for tests, local development and whenever no database path is given.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: User) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_email_free(&user.email)?;
        tables.put_user(user);
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> Result<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AcademyError::NotFound("User not found".to_string()))?;
        user.password_hash = Some(password_hash);
        Ok(())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AcademyError::NotFound("User not found".to_string()))?;
        user.apply(changes)?;
        Ok(user.clone())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .user_emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn save_password_reset(&self, reset: PasswordReset) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(previous) = tables
            .reset_by_user
            .insert(reset.user_id, reset.token_digest.clone())
        {
            tables.password_resets.remove(&previous);
        }
        tables
            .password_resets
            .insert(reset.token_digest.clone(), reset);
        Ok(())
    }

    async fn redeem_password_reset(
        &self,
        token_digest: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let mut tables = self.tables.write().await;
        let Some(reset) = tables.password_resets.remove(token_digest) else {
            return Ok(None);
        };
        tables.reset_by_user.remove(&reset.user_id);
        if reset.expires_at <= now {
            return Ok(None);
        }
        match tables.users.get_mut(&reset.user_id) {
            Some(user) => {
                user.password_hash = Some(password_hash);
                Ok(Some(reset.user_id))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn insert_profile(&self, profile: StudentProfile) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.profile_by_user.contains_key(&profile.user_id) {
            return Err(AcademyError::Conflict(
                "User already has a student profile".to_string(),
            ));
        }
        tables.put_profile(profile);
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<StudentProfile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&id).cloned())
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<StudentProfile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profile_by_user
            .get(&user_id)
            .and_then(|id| tables.profiles.get(id))
            .cloned())
    }

    async fn assign_cohort(&self, user_id: Uuid, cohort_id: Uuid) -> Result<StudentProfile> {
        let mut tables = self.tables.write().await;
        if !tables.cohorts.contains_key(&cohort_id) {
            return Err(AcademyError::NotFound("Cohort not found".to_string()));
        }
        let profile_id = tables.profile_by_user.get(&user_id).copied();
        let profile = profile_id
            .and_then(|id| tables.profiles.get_mut(&id))
            .ok_or_else(|| AcademyError::NotFound("Student profile not found".to_string()))?;
        profile.cohort_id = Some(cohort_id);
        Ok(profile.clone())
    }

    async fn count_profiles_in_cohort(&self, cohort_id: Uuid) -> Result<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .filter(|profile| profile.cohort_id == Some(cohort_id))
            .count())
    }
}

#[async_trait]
impl CohortStore for InMemoryStore {
    async fn insert_cohort(&self, cohort: Cohort) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_cohort_name_free(&cohort.name, None)?;
        tables.put_cohort(cohort);
        Ok(())
    }

    async fn update_cohort(&self, id: Uuid, changes: CohortChanges) -> Result<Cohort> {
        let mut tables = self.tables.write().await;
        let mut cohort = tables
            .cohorts
            .get(&id)
            .cloned()
            .ok_or_else(|| AcademyError::NotFound("Cohort not found".to_string()))?;
        let previous_name = cohort.name.clone();
        cohort.apply(changes)?;
        tables.check_cohort_name_free(&cohort.name, Some(id))?;

        tables.cohort_names.remove(&previous_name);
        tables.put_cohort(cohort.clone());
        Ok(cohort)
    }

    async fn get_cohort(&self, id: Uuid) -> Result<Option<Cohort>> {
        let tables = self.tables.read().await;
        Ok(tables.cohorts.get(&id).cloned())
    }

    async fn list_cohorts(&self) -> Result<Vec<Cohort>> {
        let tables = self.tables.read().await;
        let mut cohorts: Vec<Cohort> = tables.cohorts.values().cloned().collect();
        cohorts.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(cohorts)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn get_payment(&self, reference: &str) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(reference).cloned())
    }

    async fn payments_for_profile(&self, profile_id: Uuid) -> Result<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .values()
            .filter(|payment| payment.profile_id == profile_id)
            .cloned()
            .collect();
        payments.sort_by_key(|payment| payment.created_at);
        Ok(payments)
    }

    async fn commit_enrollment(&self, enrollment: Enrollment) -> Result<Enrolled> {
        let Enrollment {
            user_id,
            new_user,
            new_profile,
            mut payment,
        } = enrollment;

        let mut tables = self.tables.write().await;
        if tables.payments.contains_key(&payment.reference) {
            return Err(AcademyError::Conflict(format!(
                "Duplicate payment reference: {}",
                payment.reference
            )));
        }
        let mut owner = match new_user {
            Some(user) => {
                tables.check_email_free(&user.email)?;
                user
            }
            None => tables
                .users
                .get(&user_id)
                .cloned()
                .ok_or_else(|| AcademyError::NotFound("User not found".to_string()))?,
        };

        match tables.profile_by_user.get(&owner.id).copied() {
            Some(existing) => payment.profile_id = existing,
            None => {
                let profile = new_profile.ok_or_else(|| {
                    AcademyError::internal("enrollment without a student profile")
                })?;
                payment.profile_id = profile.id;
                tables.put_profile(profile);
            }
        }

        if payment.status == PaymentStatus::Paid {
            owner.role = owner.role.on_payment();
        }
        tables.put_user(owner.clone());
        tables
            .payments
            .insert(payment.reference.clone(), payment.clone());
        Ok(Enrolled { payment, owner })
    }

    async fn reconcile(
        &self,
        reference: &str,
        reported: ProviderStatus,
        receipt_url: Option<String>,
    ) -> Result<Option<Reconciliation>> {
        let mut tables = self.tables.write().await;
        let Some(mut payment) = tables.payments.get(reference).cloned() else {
            return Ok(None);
        };
        let mut owner = tables.owner_of(&payment)?.clone();

        let Some(transition) = apply_provider_status(payment.status, owner.role, reported) else {
            return Ok(Some(Reconciliation {
                payment,
                owner,
                applied: false,
            }));
        };

        payment.status = transition.status;
        payment.updated_at = Utc::now();
        if receipt_url.is_some() {
            payment.receipt_url = receipt_url;
        }
        owner.role = transition.role;

        tables
            .payments
            .insert(payment.reference.clone(), payment.clone());
        tables.put_user(owner.clone());

        Ok(Some(Reconciliation {
            payment,
            owner,
            applied: true,
        }))
    }
}
