use crate::domain::cohort::{Cohort, CohortChanges, CohortStatus};
use crate::domain::ports::StoreRef;
use crate::domain::profile::StudentProfile;
use crate::domain::user::{Role, UserChanges, UserView};
use crate::error::{AcademyError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCohort {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub status: CohortStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CohortFilter {
    /// Case-insensitive name search.
    pub q: Option<String>,
    pub status: Option<CohortStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortDetail {
    #[serde(flatten)]
    pub cohort: Cohort,
    pub student_count: usize,
}

/// Admin edits to a student: contact details and cohort placement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentChanges {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub cohort_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    #[serde(flatten)]
    pub user: UserView,
    pub profile: Option<StudentProfile>,
}

/// Cohorts and the placement of students in them.
pub struct CohortService {
    store: StoreRef,
}

impl CohortService {
    pub fn new(store: StoreRef) -> Self {
        Self { store }
    }

    pub async fn create(&self, new: NewCohort) -> Result<Cohort> {
        let cohort = Cohort::new(&new.name, new.start_date, new.end_date, new.status)?;
        self.store.insert_cohort(cohort.clone()).await?;
        info!(cohort_id = %cohort.id, name = %cohort.name, "cohort created");
        Ok(cohort)
    }

    pub async fn list(&self, filter: &CohortFilter) -> Result<Vec<Cohort>> {
        let query = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let mut cohorts = self.store.list_cohorts().await?;
        cohorts.retain(|cohort| {
            filter.status.is_none_or(|status| cohort.status == status)
                && query.is_none_or(|q| cohort.matches(q))
        });
        Ok(cohorts)
    }

    pub async fn get(&self, id: Uuid) -> Result<CohortDetail> {
        let cohort = self
            .store
            .get_cohort(id)
            .await?
            .ok_or_else(|| AcademyError::NotFound("Cohort not found".to_string()))?;
        Ok(CohortDetail {
            student_count: self.store.count_profiles_in_cohort(id).await?,
            cohort,
        })
    }

    pub async fn update(&self, id: Uuid, changes: CohortChanges) -> Result<Cohort> {
        let cohort = self.store.update_cohort(id, changes).await?;
        info!(cohort_id = %id, "cohort updated");
        Ok(cohort)
    }

    /// Only accounts holding the STUDENT role can be edited here.
    ///
    /// Every check runs before the first write, so a rejected request leaves
    /// the student as it was.
    pub async fn update_student(&self, user_id: Uuid, changes: StudentChanges) -> Result<Student> {
        let not_found = || AcademyError::NotFound("Student not found".to_string());
        let mut user = self
            .store
            .get_user(user_id)
            .await?
            .filter(|user| user.role == Role::Student)
            .ok_or_else(not_found)?;

        let details = UserChanges {
            name: changes.name,
            phone_number: changes.phone_number,
        };
        user.apply(details.clone())?;

        if let Some(cohort_id) = changes.cohort_id {
            self.store.assign_cohort(user_id, cohort_id).await?;
            info!(%user_id, %cohort_id, "student assigned to cohort");
        }
        if details != UserChanges::default() {
            user = self.store.update_user(user_id, details).await?;
        }

        Ok(Student {
            user: UserView::from(&user),
            profile: self.store.find_profile_by_user(user_id).await?,
        })
    }
}
