use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Student record attached one-to-one to a user.
///
/// Having a profile does not make an account a student; applicants get one
/// as soon as they register or start paying.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub student_id_code: String,
    pub progress: u8,
    pub cohort_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl StudentProfile {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            student_id_code: generate_student_id_code(&mut rand::thread_rng()),
            progress: 0,
            cohort_id: None,
            created_at: Utc::now(),
        }
    }
}

/// `STD-` followed by six digits.
pub fn generate_student_id_code<R: Rng>(rng: &mut R) -> String {
    format!("STD-{}", rng.gen_range(100_000..1_000_000))
}
