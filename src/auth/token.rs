use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{crypto, decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject of the token, the user's unique identifier.
    pub sub: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Why a presented token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("MalformedToken")]
    MalformedToken,
    #[error("BadSignature")]
    BadSignature,
    #[error("Expired")]
    Expired,
}

impl AuthError {
    /// Stable category reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "MalformedToken",
            AuthError::BadSignature => "BadSignature",
            AuthError::Expired => "Expired",
        }
    }
}

/// Source of the current time, in seconds since the epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Issues and verifies HS256 session tokens signed with a single secret.
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCodec")
            .field("algorithm", &ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        // The validity window is checked against `clock` in `verify`.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            clock,
        }
    }

    pub fn with_system_clock(secret: &[u8]) -> Self {
        Self::new(secret, Arc::new(SystemClock))
    }

    /// Creates a token for `subject` valid from now until `now + ttl` inclusive.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, AppError> {
        if ttl <= Duration::zero() {
            return Err(AppError::InternalServerError(
                "Session ttl must be positive".into(),
            ));
        }

        let now = self.clock.now();
        let exp = now.checked_add(ttl.num_seconds()).ok_or_else(|| {
            AppError::InternalServerError("Session expiry is out of range".into())
        })?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp,
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Checks structure (three non-empty segments), then signature, then the validity window
    /// `iat <= now <= exp`.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let (message, signature) = split_token(token)?;

        let signature_ok = crypto::verify(signature, message.as_bytes(), &self.decoding_key, ALGORITHM)
            .map_err(|_| AuthError::MalformedToken)?;
        if !signature_ok {
            return Err(AuthError::BadSignature);
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Signed token failed to decode: {}", e);
                AuthError::MalformedToken
            })?;

        let now = self.clock.now();
        if now < claims.iat || now > claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }
}

/// Splits `header.payload.signature` into the signed message and the signature.
fn split_token(token: &str) -> Result<(&str, &str), AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(AuthError::MalformedToken);
    }

    let signature_start = token.len() - segments[2].len();
    Ok((&token[..signature_start - 1], segments[2]))
}
