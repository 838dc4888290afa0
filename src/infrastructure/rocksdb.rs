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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for user records, keyed by user id.
pub const CF_USERS: &str = "users";
/// Column Family mapping normalized e-mail to user id.
pub const CF_USER_EMAILS: &str = "user_emails";
/// Column Family for student profiles, keyed by profile id.
pub const CF_PROFILES: &str = "profiles";
/// Column Family mapping user id to profile id.
pub const CF_PROFILE_BY_USER: &str = "profile_by_user";
/// Column Family for cohorts, keyed by cohort id.
pub const CF_COHORTS: &str = "cohorts";
/// Column Family mapping cohort name to cohort id.
pub const CF_COHORT_NAMES: &str = "cohort_names";
/// Column Family for payments, keyed by provider reference.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for outstanding password resets, keyed by token digest.
pub const CF_PASSWORD_RESETS: &str = "password_resets";
/// Column Family mapping user id to the digest of their current reset.
pub const CF_RESET_BY_USER: &str = "reset_by_user";

const COLUMN_FAMILIES: [&str; 9] = [
    CF_USERS,
    CF_USER_EMAILS,
    CF_PROFILES,
    CF_PROFILE_BY_USER,
    CF_COHORTS,
    CF_COHORT_NAMES,
    CF_PAYMENTS,
    CF_PASSWORD_RESETS,
    CF_RESET_BY_USER,
];

/// A persistent store implementation using RocksDB.
///
/// Every multi-record write goes through a single `WriteBatch`, and writers
/// are serialized by `write_lock` so the read-check-write sequences of
/// enrollment and reconciliation cannot interleave.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| AcademyError::internal(format!("{name} column family not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: impl AsRef<[u8]>) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_id(&self, cf_name: &str, key: impl AsRef<[u8]>) -> Result<Option<Uuid>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Uuid::from_slice(&bytes)
                .map(Some)
                .map_err(|e| AcademyError::internal(format!("corrupt id in {cf_name}: {e}"))),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn check_email_free(&self, email: &Email) -> Result<()> {
        if self.read_id(CF_USER_EMAILS, email.as_str())?.is_some() {
            return Err(AcademyError::Conflict(format!("Email already taken: {email}")));
        }
        Ok(())
    }

    fn stage_user(&self, batch: &mut WriteBatch, user: &User) -> Result<()> {
        batch.put_cf(
            self.cf(CF_USER_EMAILS)?,
            user.email.as_str(),
            user.id.as_bytes(),
        );
        self.put_json(batch, CF_USERS, user.id.as_bytes(), user)
    }

    fn stage_profile(&self, batch: &mut WriteBatch, profile: &StudentProfile) -> Result<()> {
        batch.put_cf(
            self.cf(CF_PROFILE_BY_USER)?,
            profile.user_id.as_bytes(),
            profile.id.as_bytes(),
        );
        self.put_json(batch, CF_PROFILES, profile.id.as_bytes(), profile)
    }

    fn check_cohort_name_free(&self, name: &str, except: Option<Uuid>) -> Result<()> {
        match self.read_id(CF_COHORT_NAMES, name)? {
            Some(id) if Some(id) != except => Err(AcademyError::Conflict(format!(
                "Cohort with this name already exists: {name}"
            ))),
            _ => Ok(()),
        }
    }

    fn stage_cohort(&self, batch: &mut WriteBatch, cohort: &Cohort) -> Result<()> {
        batch.put_cf(
            self.cf(CF_COHORT_NAMES)?,
            cohort.name.as_str(),
            cohort.id.as_bytes(),
        );
        self.put_json(batch, CF_COHORTS, cohort.id.as_bytes(), cohort)
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn owner_of(&self, payment: &Payment) -> Result<User> {
        let profile: StudentProfile = self
            .read(CF_PROFILES, payment.profile_id.as_bytes())?
            .ok_or_else(|| {
                AcademyError::internal(format!("payment {} has no profile", payment.reference))
            })?;
        self.read(CF_USERS, profile.user_id.as_bytes())?
            .ok_or_else(|| {
                AcademyError::internal(format!("payment {} has no owner", payment.reference))
            })
    }
}

#[async_trait]
impl UserStore for RocksDBStore {
    async fn insert_user(&self, user: User) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.check_email_free(&user.email)?;
        let mut batch = WriteBatch::default();
        self.stage_user(&mut batch, &user)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut user: User = self
            .read(CF_USERS, id.as_bytes())?
            .ok_or_else(|| AcademyError::NotFound("User not found".to_string()))?;
        user.password_hash = Some(password_hash);
        self.db
            .put_cf(self.cf(CF_USERS)?, id.as_bytes(), serde_json::to_vec(&user)?)?;
        Ok(())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User> {
        let _guard = self.write_lock.lock().await;
        let mut user: User = self
            .read(CF_USERS, id.as_bytes())?
            .ok_or_else(|| AcademyError::NotFound("User not found".to_string()))?;
        user.apply(changes)?;
        self.db
            .put_cf(self.cf(CF_USERS)?, id.as_bytes(), serde_json::to_vec(&user)?)?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.read(CF_USERS, id.as_bytes())
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>> {
        match self.read_id(CF_USER_EMAILS, email.as_str())? {
            Some(id) => self.read(CF_USERS, id.as_bytes()),
            None => Ok(None),
        }
    }

    async fn save_password_reset(&self, reset: PasswordReset) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let by_user = self.cf(CF_RESET_BY_USER)?;
        let resets = self.cf(CF_PASSWORD_RESETS)?;

        let mut batch = WriteBatch::default();
        if let Some(previous) = self.db.get_pinned_cf(by_user, reset.user_id.as_bytes())? {
            batch.delete_cf(resets, &*previous);
        }
        batch.put_cf(by_user, reset.user_id.as_bytes(), reset.token_digest.as_bytes());
        self.put_json(&mut batch, CF_PASSWORD_RESETS, &reset.token_digest, &reset)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn redeem_password_reset(
        &self,
        token_digest: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let _guard = self.write_lock.lock().await;
        let Some(reset) = self.read::<PasswordReset>(CF_PASSWORD_RESETS, token_digest)? else {
            return Ok(None);
        };

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_PASSWORD_RESETS)?, token_digest);
        batch.delete_cf(self.cf(CF_RESET_BY_USER)?, reset.user_id.as_bytes());

        let owner = if reset.expires_at > now {
            self.read::<User>(CF_USERS, reset.user_id.as_bytes())?
        } else {
            None
        };
        let redeemed = match owner {
            Some(mut user) => {
                user.password_hash = Some(password_hash);
                self.put_json(&mut batch, CF_USERS, user.id.as_bytes(), &user)?;
                Some(user.id)
            }
            None => None,
        };
        self.db.write(batch)?;
        Ok(redeemed)
    }
}

#[async_trait]
impl ProfileStore for RocksDBStore {
    async fn insert_profile(&self, profile: StudentProfile) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self
            .read_id(CF_PROFILE_BY_USER, profile.user_id.as_bytes())?
            .is_some()
        {
            return Err(AcademyError::Conflict(
                "User already has a student profile".to_string(),
            ));
        }
        let mut batch = WriteBatch::default();
        self.stage_profile(&mut batch, &profile)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<StudentProfile>> {
        self.read(CF_PROFILES, id.as_bytes())
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<StudentProfile>> {
        match self.read_id(CF_PROFILE_BY_USER, user_id.as_bytes())? {
            Some(id) => self.read(CF_PROFILES, id.as_bytes()),
            None => Ok(None),
        }
    }

    async fn assign_cohort(&self, user_id: Uuid, cohort_id: Uuid) -> Result<StudentProfile> {
        let _guard = self.write_lock.lock().await;
        if self.read::<Cohort>(CF_COHORTS, cohort_id.as_bytes())?.is_none() {
            return Err(AcademyError::NotFound("Cohort not found".to_string()));
        }
        let not_found = || AcademyError::NotFound("Student profile not found".to_string());
        let profile_id = self
            .read_id(CF_PROFILE_BY_USER, user_id.as_bytes())?
            .ok_or_else(not_found)?;
        let mut profile: StudentProfile = self
            .read(CF_PROFILES, profile_id.as_bytes())?
            .ok_or_else(not_found)?;

        profile.cohort_id = Some(cohort_id);
        self.db.put_cf(
            self.cf(CF_PROFILES)?,
            profile.id.as_bytes(),
            serde_json::to_vec(&profile)?,
        )?;
        Ok(profile)
    }

    async fn count_profiles_in_cohort(&self, cohort_id: Uuid) -> Result<usize> {
        let profiles: Vec<StudentProfile> = self.scan(CF_PROFILES)?;
        Ok(profiles
            .iter()
            .filter(|profile| profile.cohort_id == Some(cohort_id))
            .count())
    }
}

#[async_trait]
impl CohortStore for RocksDBStore {
    async fn insert_cohort(&self, cohort: Cohort) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.check_cohort_name_free(&cohort.name, None)?;
        let mut batch = WriteBatch::default();
        self.stage_cohort(&mut batch, &cohort)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn update_cohort(&self, id: Uuid, changes: CohortChanges) -> Result<Cohort> {
        let _guard = self.write_lock.lock().await;
        let mut cohort: Cohort = self
            .read(CF_COHORTS, id.as_bytes())?
            .ok_or_else(|| AcademyError::NotFound("Cohort not found".to_string()))?;
        let previous_name = cohort.name.clone();
        cohort.apply(changes)?;
        self.check_cohort_name_free(&cohort.name, Some(id))?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_COHORT_NAMES)?, previous_name.as_str());
        self.stage_cohort(&mut batch, &cohort)?;
        self.db.write(batch)?;
        Ok(cohort)
    }

    async fn get_cohort(&self, id: Uuid) -> Result<Option<Cohort>> {
        self.read(CF_COHORTS, id.as_bytes())
    }

    async fn list_cohorts(&self) -> Result<Vec<Cohort>> {
        let mut cohorts: Vec<Cohort> = self.scan(CF_COHORTS)?;
        cohorts.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(cohorts)
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn get_payment(&self, reference: &str) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, reference)
    }

    async fn payments_for_profile(&self, profile_id: Uuid) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self.scan(CF_PAYMENTS)?;
        payments.retain(|payment| payment.profile_id == profile_id);
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

        let _guard = self.write_lock.lock().await;
        if self.read::<Payment>(CF_PAYMENTS, &payment.reference)?.is_some() {
            return Err(AcademyError::Conflict(format!(
                "Duplicate payment reference: {}",
                payment.reference
            )));
        }
        let mut owner = match new_user {
            Some(user) => {
                self.check_email_free(&user.email)?;
                user
            }
            None => self
                .read::<User>(CF_USERS, user_id.as_bytes())?
                .ok_or_else(|| AcademyError::NotFound("User not found".to_string()))?,
        };

        let mut batch = WriteBatch::default();
        match self.read_id(CF_PROFILE_BY_USER, owner.id.as_bytes())? {
            Some(existing) => payment.profile_id = existing,
            None => {
                let profile = new_profile.ok_or_else(|| {
                    AcademyError::internal("enrollment without a student profile")
                })?;
                payment.profile_id = profile.id;
                self.stage_profile(&mut batch, &profile)?;
            }
        }
        if payment.status == PaymentStatus::Paid {
            owner.role = owner.role.on_payment();
        }
        self.stage_user(&mut batch, &owner)?;
        self.put_json(&mut batch, CF_PAYMENTS, &payment.reference, &payment)?;
        self.db.write(batch)?;

        Ok(Enrolled { payment, owner })
    }

    async fn reconcile(
        &self,
        reference: &str,
        reported: ProviderStatus,
        receipt_url: Option<String>,
    ) -> Result<Option<Reconciliation>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut payment) = self.read::<Payment>(CF_PAYMENTS, reference)? else {
            return Ok(None);
        };
        let mut owner = self.owner_of(&payment)?;

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

        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_PAYMENTS, &payment.reference, &payment)?;
        self.stage_user(&mut batch, &owner)?;
        self.db.write(batch)?;

        Ok(Some(Reconciliation {
            payment,
            owner,
            applied: true,
        }))
    }
}
