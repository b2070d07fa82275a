//! Accounts and bearer sessions.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::RngCore;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::domain::aggregates::{normalize_email, LoginUserPayload, NewUser, RegisterUserPayload, Session, User};
use crate::domain::events::DomainEvent;
use crate::publisher::EventPublisher;
use crate::store::{SessionStore, StoreError, UserStore};
use crate::{EcommerceError, Result};

const SESSION_TOKEN_BYTES: usize = 32;

/// Hashes a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| EcommerceError::Internal(format!("password hashing failed: {err}")))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

pub fn generate_token() -> String {
    let mut bytes = [0_u8; SESSION_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    session_ttl: Duration,
    events: EventPublisher,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionStore>, session_ttl: Duration, events: EventPublisher) -> Self {
        Self { users, sessions, session_ttl, events }
    }

    #[instrument(skip_all)]
    pub async fn register(&self, payload: RegisterUserPayload) -> Result<User> {
        payload.validate()?;
        let email = normalize_email(&payload.email);

        if self.users.get_user_by_email(&email).await?.is_some() {
            return Err(EcommerceError::EmailTaken(email));
        }

        let password_hash = hash_password(&payload.password)?;
        let new_user = NewUser { first_name: payload.first_name.trim().to_string(), last_name: payload.last_name.trim().to_string(), email: email.clone(), password_hash };
        let user = match self.users.create_user(new_user).await {
            Ok(user) => user,
            // lost a race with a concurrent registration
            Err(StoreError::Conflict) => return Err(EcommerceError::EmailTaken(email)),
            Err(err) => return Err(err.into()),
        };

        info!(user_id = %user.id, "user registered");
        self.events.publish(&DomainEvent::UserRegistered { user_id: user.id, email: user.email.clone() }).await;
        Ok(user)
    }

    /// Verifies credentials and issues a new session.
    #[instrument(skip_all)]
    pub async fn login(&self, payload: LoginUserPayload) -> Result<Session> {
        payload.validate().map_err(|_| EcommerceError::InvalidCredentials)?;
        let email = normalize_email(&payload.email);

        let user = self.users.get_user_by_email(&email).await?.ok_or(EcommerceError::InvalidCredentials)?;
        if !verify_password(&payload.password, &user.password_hash) {
            warn!(user_id = %user.id, "login rejected");
            return Err(EcommerceError::InvalidCredentials);
        }

        let now = Utc::now();
        match self.sessions.delete_expired_sessions(user.id, now).await {
            Ok(0) => {}
            Ok(purged) => info!(user_id = %user.id, purged, "expired sessions removed"),
            Err(err) => warn!(user_id = %user.id, error = %err, "failed to remove expired sessions"),
        }

        let session = Session { token: generate_token(), user_id: user.id, expires_at: now + self.session_ttl };
        self.sessions.create_session(session.clone()).await?;
        info!(user_id = %user.id, "session issued");
        Ok(session)
    }

    /// Resolves a bearer token to its user. Unknown, expired and orphaned
    /// tokens are all rejected the same way.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        if token.is_empty() { return Err(EcommerceError::Unauthorized); }

        let session = self.sessions.find_session(token).await?.ok_or(EcommerceError::Unauthorized)?;
        if session.is_expired_at(Utc::now()) { return Err(EcommerceError::Unauthorized); }

        self.users.get_user_by_id(session.user_id).await?.ok_or(EcommerceError::Unauthorized)
    }
}
