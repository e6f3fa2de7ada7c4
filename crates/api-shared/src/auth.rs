//! Session tokens.
//!
//! Sessions are HS256 JWTs carrying the user id, role and e-mail. Clients present them either as
//! `Authorization: Bearer <token>` or in the `token` cookie set at login.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const TOKEN_COOKIE: &str = "token";
pub const DEFAULT_TOKEN_LIFETIME_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingSecret,
    #[error("You are not logged in. Please log in to get access")]
    MissingToken,
    #[error("Your token has expired. Please log in again")]
    ExpiredToken,
    #[error("Invalid token. Please log in again")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign token: {0}")]
    TokenCreation(#[source] jsonwebtoken::errors::Error),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub role: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenKeys {
    /// # Errors
    ///
    /// Returns [`AuthError::MissingSecret`] if `secret` is empty or whitespace.
    pub fn new(secret: &str, lifetime_days: i64) -> AuthResult<Self> {
        if secret.trim().is_empty() {
            return Err(AuthError::MissingSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::days(lifetime_days),
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Signs a token for the given account, valid from `now` for the configured lifetime.
    pub fn issue(&self, id: &str, role: &str, email: &str, now: DateTime<Utc>) -> AuthResult<String> {
        let claims = Claims {
            id: id.to_string(),
            role: role.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenCreation)
    }

    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e),
            })
    }
}

/// Picks the session token from the request headers.
///
/// A bearer `Authorization` header wins over the cookie.
pub fn extract_token<'a>(authorization: Option<&'a str>, cookie: Option<&'a str>) -> Option<&'a str> {
    let bearer = authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        cookie?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == TOKEN_COOKIE)
            .map(|(_, value)| value.trim())
            .filter(|token| !token.is_empty())
    })
}
