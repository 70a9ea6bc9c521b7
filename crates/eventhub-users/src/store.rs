use std::sync::{Arc, Mutex};

use chrono::Utc;
use eventhub_core::mail::{deliver, Mailer, OutboundEmail};
use eventhub_core::types::{new_id, Caller, Role};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{Result, UserError};
use crate::password::{hash_password, verify_password};
use crate::token::TokenService;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Body returned by both signup and login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub token: String,
}

/// Account registry: signup, login and identity lookups.
///
/// Shares its SQLite connection with the event store so lookups and joins see
/// the same database.
pub struct UserStore {
    db: Arc<Mutex<Connection>>,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
}

impl UserStore {
    pub fn new(db: Arc<Mutex<Connection>>, tokens: TokenService, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, tokens, mailer }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create an account and return a signed token for it.
    ///
    /// Role defaults to ATTENDEE. A welcome email is sent fire-and-forget.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub fn signup(&self, req: SignupRequest) -> Result<AuthResponse> {
        let email = req.email.trim().to_string();
        if email.is_empty() || req.password.is_empty() {
            return Err(UserError::Validation("Email and password are required".into()));
        }
        if !email.contains('@') {
            return Err(UserError::Validation("Invalid email address".into()));
        }
        if req.password.len() < MIN_PASSWORD_LEN {
            return Err(UserError::Validation(
                "Password must be at least 6 characters".into(),
            ));
        }

        // hash before taking the lock; argon2 is deliberately slow
        let hash = hash_password(&req.password)?;
        let role = req.role.unwrap_or_default();
        let id = new_id();
        let now = Utc::now().to_rfc3339();

        {
            let db = self.db.lock().unwrap();
            let exists: Option<String> = db
                .query_row("SELECT id FROM users WHERE email = ?1", params![email], |r| r.get(0))
                .optional()?;
            if exists.is_some() {
                return Err(UserError::AlreadyExists);
            }
            db.execute(
                "INSERT INTO users (id, email, password_hash, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![id, email, hash, role.to_string(), now],
            )
            .map_err(map_unique_violation)?;
        }
        info!(user_id = %id, %role, "user signed up");

        deliver(self.mailer.as_ref(), OutboundEmail::welcome(&email, &id));

        self.respond(Caller { id, email, role })
    }

    /// Check credentials and return a fresh token.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        if req.email.is_empty() || req.password.is_empty() {
            return Err(UserError::Validation("Email and password are required".into()));
        }

        let row: Option<(String, String, String, Role)> = {
            let db = self.db.lock().unwrap();
            db.query_row(
                "SELECT id, email, password_hash, role FROM users WHERE email = ?1",
                params![req.email.trim()],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, parse_role(r, 3)?)),
            )
            .optional()?
        };

        let (id, email, hash, role) = row.ok_or(UserError::InvalidCredentials)?;
        if !verify_password(&req.password, &hash) {
            return Err(UserError::InvalidCredentials);
        }
        self.respond(Caller { id, email, role })
    }

    fn respond(&self, caller: Caller) -> Result<AuthResponse> {
        let token = self.tokens.issue(&caller)?;
        Ok(AuthResponse {
            id: caller.id,
            email: caller.email,
            role: caller.role,
            token,
        })
    }
}

/// A stored role outside the known set is corruption, not a reason to
/// downgrade the account.
fn parse_role(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Role> {
    let raw: String = row.get(idx)?;
    raw.parse::<Role>().map_err(|e| {
        warn!(role = %raw, "unknown role stored for user");
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

/// A concurrent signup can slip past the SELECT; the UNIQUE index catches it.
fn map_unique_violation(e: rusqlite::Error) -> UserError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            UserError::AlreadyExists
        }
        other => UserError::DatabaseError(other),
    }
}
