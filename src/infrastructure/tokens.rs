//! Signed bearer tokens (HS256 JWTs) and refresh-token revocation.

use crate::domain::user::Role;
use crate::error::{AcademyError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub typ: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct Key {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Key {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// Issues and checks access/refresh tokens.
///
/// Access tokens live 24 hours, refresh tokens 7 days; each kind is signed
/// with its own secret. Revoked refresh `jti`s are remembered until the
/// token would have expired anyway.
#[derive(Clone)]
pub struct TokenService {
    access: Arc<Key>,
    refresh: Arc<Key>,
    validation: Arc<Validation>,
    revoked: Arc<RwLock<HashMap<Uuid, DateTime<Utc>>>>,
}

impl TokenService {
    pub fn new(access_secret: impl AsRef<[u8]>, refresh_secret: impl AsRef<[u8]>) -> Self {
        Self::with_ttls(
            access_secret,
            refresh_secret,
            Duration::hours(24),
            Duration::days(7),
        )
    }

    pub fn with_ttls(
        access_secret: impl AsRef<[u8]>,
        refresh_secret: impl AsRef<[u8]>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        // No grace period: a token is dead the second its `exp` passes.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            access: Arc::new(Key::new(access_secret.as_ref(), access_ttl)),
            refresh: Arc::new(Key::new(refresh_secret.as_ref(), refresh_ttl)),
            validation: Arc::new(validation),
            revoked: Arc::default(),
        }
    }

    fn key(&self, kind: TokenKind) -> &Key {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Mints a fresh access/refresh pair carrying the account's current role.
    pub fn issue_pair(&self, user_id: Uuid, role: Role) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign(user_id, role, TokenKind::Access)?,
            refresh_token: self.sign(user_id, role, TokenKind::Refresh)?,
        })
    }

    fn sign(&self, sub: Uuid, role: Role, typ: TokenKind) -> Result<String> {
        let key = self.key(typ);
        let now = Utc::now();
        let claims = Claims {
            sub,
            role,
            typ,
            jti: (typ == TokenKind::Refresh).then(Uuid::new_v4),
            iat: now.timestamp(),
            exp: (now + key.ttl).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &key.encoding,
        )?)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        self.verify(token, TokenKind::Access)
    }

    /// Verifies a refresh token, including that it has not been revoked.
    pub async fn verify_refresh(&self, token: &str) -> Result<Claims> {
        let claims = self.verify(token, TokenKind::Refresh)?;
        if let Some(jti) = claims.jti
            && self.revoked.read().await.contains_key(&jti)
        {
            return Err(AcademyError::Unauthorized(
                "Refresh token revoked".to_string(),
            ));
        }
        Ok(claims)
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let unauthorized = || AcademyError::Unauthorized("Unauthorized".to_string());

        let claims = jsonwebtoken::decode::<Claims>(
            token,
            &self.key(expected).decoding,
            &self.validation,
        )
        .map_err(|_| unauthorized())?
        .claims;

        if claims.typ != expected {
            return Err(unauthorized());
        }
        Ok(claims)
    }

    /// Remembers the refresh token's `jti` as revoked until it expires.
    pub async fn revoke(&self, claims: &Claims) {
        let Some(jti) = claims.jti else {
            return;
        };
        let until = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        let now = Utc::now();

        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(jti, until);
    }
}
