use ambulette_shared::AdminClaims;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use std::fmt;

/// Bearer token obtained from `POST /api/admin/login`, held in memory only
#[derive(Clone)]
pub struct AdminSession {
    token: String,
    username: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AdminSession {
    /// Reads `exp` from the token payload. The signature is the backend's
    /// business, so it is not checked here. Opaque tokens never expire locally.
    pub fn from_token(username: &str, token: String) -> Self {
        let expires_at = read_expiry(&token);
        if expires_at.is_none() {
            tracing::debug!("admin token carries no readable exp claim");
        }
        Self {
            token,
            username: username.to_string(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |exp| now >= exp)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSession")
            .field("username", &self.username)
            .field("expires_at", &self.expires_at)
            .field("token", &"********")
            .finish()
    }
}

fn read_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::new();

    let data = decode::<AdminClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    DateTime::<Utc>::from_timestamp(data.claims.exp as i64, 0)
}
