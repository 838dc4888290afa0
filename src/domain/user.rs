use crate::error::{AcademyError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access level of an account.
///
/// Payment logic only ever moves a role forward: an applicant becomes a
/// student once a payment settles, nobody is demoted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Applicant,
    Student,
    Admin,
}

impl Role {
    /// Role the account holds once one of its payments is confirmed.
    pub fn on_payment(self) -> Role {
        match self {
            Role::Applicant => Role::Student,
            Role::Student => Role::Student,
            Role::Admin => Role::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Applicant => "APPLICANT",
            Role::Student => "STUDENT",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized (trimmed, lower-cased) e-mail address.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Hash)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self> {
        let candidate = raw.trim().to_lowercase();
        let valid = match candidate.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && domain.contains('.')
                    && !candidate.contains(char::is_whitespace)
                    && !domain.contains('@')
            }
            None => false,
        };
        if valid {
            Ok(Self(candidate))
        } else {
            Err(AcademyError::ValidationError(format!(
                "Invalid email address: {raw}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: Email,
    pub name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    /// `None` until the account owner chooses a password. Accounts opened by
    /// the public payment flow start without one.
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: Email, name: impl Into<String>, phone_number: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name: name.into(),
            phone_number,
            role: Role::Applicant,
            password_hash: None,
            created_at: Utc::now(),
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Applies `changes`; a blank name is rejected and leaves `self` as is.
    pub fn apply(&mut self, changes: UserChanges) -> Result<()> {
        if let Some(name) = changes.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AcademyError::ValidationError(
                    "Name cannot be blank".to_string(),
                ));
            }
            self.name = name.to_string();
        }
        if let Some(phone_number) = changes.phone_number {
            self.phone_number = Some(phone_number);
        }
        Ok(())
    }
}

/// Profile fields an account owner or an admin may edit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserChanges {
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

/// An outstanding password reset, at most one per user. Only the digest of
/// the token handed to the user is kept.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PasswordReset {
    pub user_id: Uuid,
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
}

/// The public view of a user; never carries the password hash.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.to_string(),
            name: user.name.clone(),
            phone_number: user.phone_number.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}
