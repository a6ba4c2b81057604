use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::{distributions::Alphanumeric, Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const TOKEN_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedSession {
    pub token: String,
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

struct UserRecord {
    user: SessionUser,
    salt: String,
    password_hash: Vec<u8>,
}

struct SessionRecord {
    user: SessionUser,
    expires_at: DateTime<Utc>,
}

/// In-process identity boundary: registered users plus opaque bearer tokens.
pub struct SessionStore {
    users: RwLock<HashMap<String, UserRecord>>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
    ttl: Duration,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(salt: &str, password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn new_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

fn new_token() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(TOKEN_LEN).map(char::from).collect()
}

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    require("email", email)?;
    if !email.contains('@') {
        return Err(AppError::Validation("email is invalid".to_string()));
    }
    Ok(())
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { users: RwLock::default(), sessions: RwLock::default(), ttl }
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> AppResult<IssuedSession> {
        validate_email(email)?;
        require("password", password)?;
        let key = normalize_email(email);
        let name = match name.trim() {
            "" => key.split('@').next().unwrap_or_default().to_string(),
            n => n.to_string(),
        };

        let user = {
            let mut users = self.users.write();
            if users.contains_key(&key) {
                return Err(AppError::Conflict("email already registered".to_string()));
            }
            let salt = new_salt();
            let record = UserRecord {
                user: SessionUser { id: Uuid::new_v4(), name, email: key.clone() },
                password_hash: hash_password(&salt, password),
                salt,
            };
            let user = record.user.clone();
            users.insert(key, record);
            user
        };

        info!("👤 Registered {}", user.email);
        Ok(self.issue(user))
    }

    pub fn login(&self, email: &str, password: &str) -> AppResult<IssuedSession> {
        validate_email(email)?;
        require("password", password)?;
        let key = normalize_email(email);

        let user = {
            let users = self.users.read();
            let record = users.get(&key).ok_or(AppError::Unauthorized)?;
            let candidate = hash_password(&record.salt, password);
            if !bool::from(candidate.as_slice().ct_eq(record.password_hash.as_slice())) {
                return Err(AppError::Unauthorized);
            }
            record.user.clone()
        };

        info!("🔑 Login for {}", user.email);
        Ok(self.issue(user))
    }

    fn issue(&self, user: SessionUser) -> IssuedSession {
        self.issue_at(user, Utc::now())
    }

    /// Expired sessions are swept on every issue, so the map stays bounded by
    /// the tokens still inside their TTL.
    fn issue_at(&self, user: SessionUser, now: DateTime<Utc>) -> IssuedSession {
        let token = new_token();
        let expires_at = now + self.ttl;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        if sessions.len() < before {
            debug!("🧹 Pruned {} expired sessions", before - sessions.len());
        }
        sessions.insert(token.clone(), SessionRecord { user: user.clone(), expires_at });
        IssuedSession { token, user, expires_at }
    }

    /// Looks up a live session; expired tokens are dropped on sight.
    pub fn resolve(&self, token: &str) -> AppResult<SessionUser> {
        self.resolve_at(token, Utc::now())
    }

    fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> AppResult<SessionUser> {
        {
            let sessions = self.sessions.read();
            match sessions.get(token) {
                None => return Err(AppError::Unauthorized),
                Some(s) if s.expires_at > now => return Ok(s.user.clone()),
                Some(_) => {}
            }
        }
        self.sessions.write().remove(token);
        Err(AppError::Unauthorized)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }
}
