use crate::error::{AcademyError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CohortStatus {
    #[default]
    Planned,
    Active,
    Completed,
}

/// An intake of students taught together. Names are unique.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
    pub id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CohortStatus,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a cohort; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CohortChanges {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<CohortStatus>,
}

fn cohort_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AcademyError::ValidationError(
            "Cohort name is required".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn check_dates(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end < start {
        return Err(AcademyError::ValidationError(
            "Cohort cannot end before it starts".to_string(),
        ));
    }
    Ok(())
}

impl Cohort {
    pub fn new(
        name: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        status: CohortStatus,
    ) -> Result<Self> {
        let name = cohort_name(name)?;
        check_dates(start_date, end_date)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            start_date,
            end_date,
            status,
            created_at: Utc::now(),
        })
    }

    /// Applies `changes`, leaving `self` untouched if the result is invalid.
    pub fn apply(&mut self, changes: CohortChanges) -> Result<()> {
        let name = match changes.name {
            Some(name) => cohort_name(&name)?,
            None => self.name.clone(),
        };
        let start_date = changes.start_date.unwrap_or(self.start_date);
        let end_date = changes.end_date.unwrap_or(self.end_date);
        check_dates(start_date, end_date)?;

        self.name = name;
        self.start_date = start_date;
        self.end_date = end_date;
        if let Some(status) = changes.status {
            self.status = status;
        }
        Ok(())
    }

    /// Case-insensitive substring match on the name.
    pub fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_new_cohort_validation() {
        let cohort = Cohort::new("  Spring 2025 ", date(1), date(30), CohortStatus::default())
            .unwrap();
        assert_eq!(cohort.name, "Spring 2025");
        assert_eq!(cohort.status, CohortStatus::Planned);

        assert!(matches!(
            Cohort::new(" ", date(1), date(30), CohortStatus::Planned),
            Err(AcademyError::ValidationError(_))
        ));
        assert!(matches!(
            Cohort::new("Backwards", date(30), date(1), CohortStatus::Planned),
            Err(AcademyError::ValidationError(_))
        ));
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut cohort = Cohort::new("Spring", date(1), date(30), CohortStatus::Planned).unwrap();
        let before = cohort.clone();

        let bad = CohortChanges {
            name: Some("Renamed".to_string()),
            start_date: Some(date(31)),
            ..Default::default()
        };
        assert!(cohort.apply(bad).is_err());
        assert_eq!(cohort, before);

        cohort
            .apply(CohortChanges {
                name: Some("Renamed".to_string()),
                status: Some(CohortStatus::Active),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cohort.name, "Renamed");
        assert_eq!(cohort.status, CohortStatus::Active);
        assert_eq!(cohort.end_date, before.end_date);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&CohortStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let changes: CohortChanges =
            serde_json::from_str(r#"{"startDate":"2025-03-01T09:00:00Z"}"#).unwrap();
        assert_eq!(changes.start_date, Some(date(1)));
        assert!(changes.name.is_none());
    }

    #[test]
    fn test_name_search() {
        let cohort = Cohort::new("Spring Evening", date(1), date(2), CohortStatus::Planned)
            .unwrap();
        assert!(cohort.matches("evening"));
        assert!(!cohort.matches("autumn"));
    }
}
