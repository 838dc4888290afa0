use crate::domain::ports::StoreRef;
use crate::domain::profile::StudentProfile;
use crate::domain::user::{Email, PasswordReset, Role, User, UserChanges, UserView};
use crate::error::{AcademyError, Result};
use crate::infrastructure::password::{
    hash_password, new_reset_token, reset_token_digest, validate_password, verify_password,
};
use crate::infrastructure::tokens::{TokenPair, TokenService};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// How long a password reset token stays redeemable.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// The authenticated principal of a request, with the role as currently
/// stored (never the role baked into the token).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: UserView,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct Me {
    pub user: UserView,
    pub profile: Option<StudentProfile>,
}

fn invalid_credentials() -> AcademyError {
    AcademyError::Unauthorized("Invalid credentials".to_string())
}

/// Accounts, credentials and sessions.
pub struct AuthService {
    store: StoreRef,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(store: StoreRef, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    /// Creates an applicant account with a student profile and signs it in.
    pub async fn register(&self, registration: Registration) -> Result<Session> {
        let email = Email::parse(&registration.email)?;
        let name = registration.name.trim();
        if name.is_empty() {
            return Err(AcademyError::ValidationError(
                "Name is required".to_string(),
            ));
        }
        validate_password(&registration.password)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AcademyError::Conflict("Email already taken".to_string()));
        }

        let mut user = User::new(email, name, registration.phone_number);
        user.password_hash = Some(hash_password(registration.password).await?);
        self.store.insert_user(user.clone()).await?;
        self.store.insert_profile(StudentProfile::new(user.id)).await?;

        info!(user_id = %user.id, "account registered");
        Ok(Session {
            tokens: self.tokens.issue_pair(user.id, user.role)?,
            user: UserView::from(&user),
        })
    }

    /// Unknown accounts, accounts without a password and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: String) -> Result<TokenPair> {
        let email = Email::parse(email)?;
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;
        let Some(hash) = user.password_hash.clone() else {
            return Err(invalid_credentials());
        };
        if !verify_password(password, hash).await? {
            return Err(invalid_credentials());
        }
        self.tokens.issue_pair(user.id, user.role)
    }

    /// Rotates a refresh token: the presented one is revoked and a new pair
    /// reflecting the stored role is issued.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.tokens.verify_refresh(refresh_token).await?;
        let user = self
            .store
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AcademyError::Unauthorized("Unauthorized".to_string()))?;
        let pair = self.tokens.issue_pair(user.id, user.role)?;
        self.tokens.revoke(&claims).await;
        Ok(pair)
    }

    /// Revokes the refresh token if it is valid; anything else is a no-op.
    pub async fn logout(&self, refresh_token: Option<&str>) {
        if let Some(token) = refresh_token
            && let Ok(claims) = self.tokens.verify_refresh(token).await
        {
            self.tokens.revoke(&claims).await;
        }
    }

    /// Resolves a bearer access token to its account.
    pub async fn authenticate(&self, access_token: &str) -> Result<Caller> {
        let claims = self.tokens.verify_access(access_token)?;
        let user = self
            .store
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AcademyError::Unauthorized("Unauthorized".to_string()))?;
        Ok(Caller {
            id: user.id,
            role: user.role,
        })
    }

    pub async fn me(&self, user_id: Uuid) -> Result<Me> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AcademyError::NotFound("User not found".to_string()))?;
        let profile = self.store.find_profile_by_user(user_id).await?;
        Ok(Me {
            user: UserView::from(&user),
            profile,
        })
    }

    /// Edits the caller's own name or phone number.
    pub async fn update_me(&self, user_id: Uuid, changes: UserChanges) -> Result<UserView> {
        let user = self.store.update_user(user_id, changes).await?;
        info!(%user_id, "profile updated");
        Ok(UserView::from(&user))
    }

    /// Issues a reset token for `email` and returns it, or `None` when no
    /// such account exists. Callers must not reveal which one happened.
    ///
    /// There is no mail transport; the token is only written to the debug
    /// log.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>> {
        let email = Email::parse(email)?;
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            debug!(%email, "password reset requested for unknown account");
            return Ok(None);
        };

        let (token, token_digest) = new_reset_token();
        self.store
            .save_password_reset(PasswordReset {
                user_id: user.id,
                token_digest,
                expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
            })
            .await?;
        info!(user_id = %user.id, "password reset issued");
        debug!(user_id = %user.id, %token, "password reset token");
        Ok(Some(token))
    }

    /// Redeems a reset token, setting a new password. Each token works once.
    pub async fn confirm_password_reset(&self, token: &str, new_password: String) -> Result<()> {
        validate_password(&new_password)?;
        let hash = hash_password(new_password).await?;
        let redeemed = self
            .store
            .redeem_password_reset(&reset_token_digest(token), hash, Utc::now())
            .await?;
        match redeemed {
            Some(user_id) => {
                info!(%user_id, "password reset completed");
                Ok(())
            }
            None => Err(AcademyError::ValidationError(
                "Invalid or expired token".to_string(),
            )),
        }
    }

    /// Sets or changes the password.
    ///
    /// Accounts created through a public checkout have no password; they may
    /// set one without `current`. Everyone else must present the current one.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current: Option<String>,
        new_password: String,
    ) -> Result<()> {
        validate_password(&new_password)?;
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AcademyError::NotFound("User not found".to_string()))?;

        match (current, user.password_hash) {
            (None, None) => {}
            (None, Some(_)) => {
                return Err(AcademyError::ValidationError(
                    "Current password is required".to_string(),
                ));
            }
            (Some(_), None) => return Err(invalid_credentials()),
            (Some(current), Some(hash)) => {
                if !verify_password(current, hash).await? {
                    return Err(invalid_credentials());
                }
            }
        }

        let hash = hash_password(new_password).await?;
        self.store.set_password_hash(user_id, hash).await?;
        info!(%user_id, "password updated");
        Ok(())
    }
}
