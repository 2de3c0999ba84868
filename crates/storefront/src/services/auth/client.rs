//! Per-client auth handle.
//!
//! Wraps [`AuthService`] with the "current user" of one client and
//! broadcasts every sign-in, sign-up, sign-out and profile change on a
//! `watch` channel. A [`SessionGate`](crate::services::session::SessionGate)
//! can follow that channel.

use secrecy::SecretString;
use tokio::sync::watch;

use crate::baas::{AuthError, AuthUser, ProfileUpdate};

use super::{AuthService, SignUp};

/// One client's view of the auth provider.
pub struct AuthClient {
    service: AuthService,
    current: watch::Sender<Option<AuthUser>>,
}

impl AuthClient {
    /// A signed-out client.
    #[must_use]
    pub fn new(service: AuthService) -> Self {
        Self::restore(service, None)
    }

    /// A client resuming with a previously signed-in user.
    #[must_use]
    pub fn restore(service: AuthService, user: Option<AuthUser>) -> Self {
        let (current, _) = watch::channel(user);
        Self { service, current }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    /// Receive every change of the signed-in user.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }

    /// Register and sign in.
    ///
    /// # Errors
    ///
    /// See [`AuthService::sign_up`].
    pub async fn sign_up(&self, form: SignUp) -> Result<AuthUser, AuthError> {
        let user = self.service.sign_up(form).await?;
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Sign in.
    ///
    /// # Errors
    ///
    /// See [`AuthService::sign_in`].
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<AuthUser, AuthError> {
        let user = self.service.sign_in(email, password).await?;
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Sign out. A no-op when nobody is signed in.
    pub fn sign_out(&self) {
        self.current.send_if_modified(|user| user.take().is_some());
    }

    /// Update the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when nobody is signed in, and
    /// the errors of [`AuthService::update_profile`].
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<AuthUser, AuthError> {
        let uid = self
            .current_user()
            .map(|u| u.uid)
            .ok_or(AuthError::InvalidCredentials)?;
        let user = self.service.update_profile(&uid, update).await?;
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }
}
