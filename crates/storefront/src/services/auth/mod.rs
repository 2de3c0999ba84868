//! Authentication service.
//!
//! Validates sign-up and sign-in input, delegates account handling to the
//! [`AuthProvider`] port and writes the per-user `users/{uid}` document that
//! carries the user's role.

mod client;

pub use client::AuthClient;

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use nuel_store_core::{Email, Role, UserId};

use crate::baas::collections::USERS;
use crate::baas::{AuthError, AuthProvider, AuthUser, BackendError, DocumentStore, ProfileUpdate};
use crate::models::{UserRecord, to_document};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Sign-up form fields.
#[derive(Debug)]
pub struct SignUp {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    docs: Arc<dyn DocumentStore>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>, docs: Arc<dyn DocumentStore>) -> Self {
        Self { provider, docs }
    }

    /// Register a new user and create their `users/{uid}` document with the
    /// `user` role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if the username is blank or the
    /// passwords differ, `AuthError::InvalidEmail` for a malformed email,
    /// `AuthError::WeakPassword` if the password is too short and
    /// `AuthError::UserAlreadyExists` if the email is taken.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn sign_up(&self, form: SignUp) -> Result<AuthUser, AuthError> {
        let username = form.username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidInput("username is required".to_owned()));
        }
        let email = Email::parse(&form.email)?;
        validate_password(form.password.expose_secret())?;
        if form.password.expose_secret() != form.confirm_password.expose_secret() {
            return Err(AuthError::InvalidInput("passwords do not match".to_owned()));
        }

        let user = self.provider.sign_up(&email, &form.password).await?;

        let record = UserRecord {
            username: username.to_owned(),
            email,
            role: Role::User,
            created_at: Utc::now(),
        };
        let data = to_document(&record).map_err(BackendError::from)?;
        self.docs.set(USERS, user.uid.as_str(), data).await?;

        tracing::info!(uid = %user.uid, "user signed up");
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email or password is
    /// wrong.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;
        self.provider.sign_in(&email, password).await
    }

    /// Update the display name and/or photo URL. Blank fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if nothing would change and
    /// `AuthError::UserNotFound` if the account is gone.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        uid: &UserId,
        update: ProfileUpdate,
    ) -> Result<AuthUser, AuthError> {
        let update = update.without_blanks();
        if update.is_empty() {
            return Err(AuthError::InvalidInput("nothing to update".to_owned()));
        }
        self.provider.update_profile(uid, update).await
    }

    /// The provider's current view of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be queried.
    pub async fn user(&self, uid: &UserId) -> Result<Option<AuthUser>, AuthError> {
        self.provider.user(uid).await
    }
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
