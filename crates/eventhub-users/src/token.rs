use chrono::{Duration, Utc};
use eventhub_core::types::{Caller, Role};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, UserError};

/// JWT claims: the bearer identity plus standard timing fields.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub id: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Sign a token for `caller`, valid for the configured TTL.
    pub fn issue(&self, caller: &Caller) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: caller.id.clone(),
            id: caller.id.clone(),
            email: caller.email.clone(),
            role: caller.role,
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| UserError::Hashing(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded identity.
    pub fn verify(&self, token: &str) -> Result<Caller> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                UserError::InvalidToken
            })?;
        Ok(Caller {
            id: data.claims.id,
            email: data.claims.email,
            role: data.claims.role,
        })
    }

    /// Verify the value of an `Authorization` header.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Caller> {
        let token = extract_bearer(header).ok_or(UserError::MissingToken)?;
        self.verify(token)
    }
}

/// Pull the token out of `Bearer <token>`. Anything else yields `None`.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let mut parts = header?.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}
