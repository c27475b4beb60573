//! Credential Store
//!
//! Persists user identity and answers existence/verification queries.
//! Passwords are argon2-hashed on the way in and verified against the
//! stored hash; the plaintext never touches the database.

use anyhow::{Context, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use thiserror::Error;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use crate::database::connection::DatabaseConnection;
use crate::database::models::{FromRow, User};

#[derive(Debug, Error)]
pub enum CreateUserError {
    /// Unique-email constraint tripped; exactly one of N concurrent
    /// registrations for the same address wins.
    #[error("email already registered")]
    EmailTaken,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// User lookup and creation against the PostgreSQL pool
#[derive(Clone)]
pub struct CredentialStore {
    db: DatabaseConnection,
}

impl CredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetch a user by email. Emails are compared exactly as received.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self
            .db
            .pool()
            .get()
            .await
            .context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
                &[&email],
            )
            .await
            .context("Failed to query user by email")?;
        row.map(|r| User::from_row(&r).context("Failed to decode user row"))
            .transpose()
    }

    /// Create a user, hashing the supplied password. The unique constraint
    /// on email arbitrates concurrent duplicate registrations.
    pub async fn create(&self, email: &str, password: &str) -> Result<User, CreateUserError> {
        let password_hash = hash_password(password).map_err(CreateUserError::Store)?;
        let user_id = Uuid::new_v4();

        let client = self
            .db
            .pool()
            .get()
            .await
            .context("Failed to get DB connection")?;
        let row = client
            .query_one(
                "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) \
                 RETURNING id, email, password_hash, created_at",
                &[&user_id, &email, &password_hash],
            )
            .await
            .map_err(|err| {
                if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    CreateUserError::EmailTaken
                } else {
                    CreateUserError::Store(
                        anyhow::Error::new(err).context("Failed to insert user"),
                    )
                }
            })?;

        User::from_row(&row)
            .context("Failed to decode inserted user row")
            .map_err(CreateUserError::Store)
    }
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2 hash
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_original_and_rejects_others() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
