//! Self-contained signed sessions. No server-side list: validity is
//! signature plus embedded expiry, so logout is client-side token discard.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use quaddash_types::api::Claims;

const SESSION_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid token")]
    InvalidToken,

    #[error("session expired")]
    Expired,

    #[error("token encoding failed")]
    Encoding,
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a 7-day session for a verified email.
    pub fn issue(&self, email: &str) -> Result<String, SessionError> {
        self.issue_at(email, Utc::now())
    }

    pub fn issue_at(&self, email: &str, now: DateTime<Utc>) -> Result<String, SessionError> {
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::days(SESSION_DAYS)).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| SessionError::Encoding)
    }

    /// Returns the embedded email if the signature checks out and the
    /// session has not passed its 7-day expiry.
    pub fn validate(&self, token: &str) -> Result<String, SessionError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::InvalidToken,
            }
        })?;
        Ok(data.claims.sub)
    }
}
