//! Authentication port.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nuel_store_core::{Email, EmailError, UserId};

use super::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// A required sign-up or profile field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Backend error.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// The identity the auth provider reports for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider-assigned user id.
    pub uid: UserId,
    /// Sign-in email.
    pub email: Email,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Optional avatar URL.
    pub photo_url: Option<String>,
}

/// Profile fields to change. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    /// Drop blank fields so they keep their current value.
    #[must_use]
    pub fn without_blanks(self) -> Self {
        let keep = |v: Option<String>| {
            v.map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
        };
        Self {
            display_name: keep(self.display_name),
            photo_url: keep(self.photo_url),
        }
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }
}

/// Authentication port.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account and return the new user.
    async fn sign_up(&self, email: &Email, password: &SecretString)
    -> Result<AuthUser, AuthError>;

    /// Verify credentials and return the user.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<AuthUser, AuthError>;

    /// Change profile fields and return the updated user.
    async fn update_profile(
        &self,
        uid: &UserId,
        update: ProfileUpdate,
    ) -> Result<AuthUser, AuthError>;

    /// Look up a user by id.
    async fn user(&self, uid: &UserId) -> Result<Option<AuthUser>, AuthError>;
}
