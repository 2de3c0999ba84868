//! Password accounts stored as documents.
//!
//! Implements the [`AuthProvider`] port on top of any [`DocumentStore`].
//! Each account is one document in the `accounts` collection holding the
//! email, an Argon2id password hash and the profile fields. The document id
//! is the user's uid.
//!
//! Emails are matched case-insensitively. A sign-up first claims the
//! lowercased address in `accountEmails` with an insert-if-absent write, so
//! concurrent sign-ups for one address cannot both succeed.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::instrument;

use nuel_store_core::{Email, UserId};
use uuid::Uuid;

use super::collections::{ACCOUNT_EMAILS, ACCOUNTS};
use super::{AuthError, AuthProvider, AuthUser, BackendError, Document, DocumentStore, ProfileUpdate};

const EMAIL: &str = "email";
const PASSWORD_HASH: &str = "passwordHash";
const DISPLAY_NAME: &str = "displayName";
const PHOTO_URL: &str = "photoURL";
const UID: &str = "uid";

/// [`AuthProvider`] keeping accounts in a [`DocumentStore`].
#[derive(Clone)]
pub struct AccountsAuth {
    docs: Arc<dyn DocumentStore>,
}

impl AccountsAuth {
    /// Create a provider over the given document store.
    #[must_use]
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<(String, Document)>, AuthError> {
        let Some(claim) = self.docs.get(ACCOUNT_EMAILS, &email_key(email)).await? else {
            return Ok(None);
        };
        let Some(uid) = claim.get(UID).and_then(Value::as_str) else {
            return Ok(None);
        };
        Ok(self
            .docs
            .get(ACCOUNTS, uid)
            .await?
            .map(|data| (uid.to_owned(), data)))
    }
}

/// Lookup key for an address: the whole address lowercased.
fn email_key(email: &Email) -> String {
    email.as_str().to_lowercase()
}

fn account_to_user(uid: &str, data: &Document) -> Result<AuthUser, AuthError> {
    let email = data
        .get(EMAIL)
        .and_then(Value::as_str)
        .ok_or_else(|| BackendError::NotFound(format!("{ACCOUNTS}/{uid}.{EMAIL}")))?;
    let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_owned);

    Ok(AuthUser {
        uid: UserId::new(uid),
        email: Email::parse(email)?,
        display_name: text(DISPLAY_NAME),
        photo_url: text(PHOTO_URL),
    })
}

#[async_trait]
impl AuthProvider for AccountsAuth {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, AuthError> {
        let hash = hash_password(password.expose_secret())?;
        let uid = Uuid::new_v4().simple().to_string();
        let key = email_key(email);

        let mut claim = Document::new();
        claim.insert(UID.to_owned(), json!(uid));
        self.docs
            .create(ACCOUNT_EMAILS, &key, claim)
            .await
            .map_err(|e| match e {
                BackendError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Backend(other),
            })?;

        let mut data = Document::new();
        data.insert(EMAIL.to_owned(), json!(email.as_str()));
        data.insert(PASSWORD_HASH.to_owned(), json!(hash));
        if let Err(e) = self.docs.set(ACCOUNTS, &uid, data).await {
            if let Err(release) = self.docs.delete(ACCOUNT_EMAILS, &key).await {
                tracing::warn!(error = %release, "failed to release email claim");
            }
            return Err(e.into());
        }
        tracing::info!(uid = %uid, "account created");

        Ok(AuthUser {
            uid: UserId::new(uid),
            email: email.clone(),
            display_name: None,
            photo_url: None,
        })
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, AuthError> {
        let (uid, data) = self
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = data
            .get(PASSWORD_HASH)
            .and_then(Value::as_str)
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password.expose_secret(), hash)?;

        account_to_user(&uid, &data)
    }

    #[instrument(skip(self, update))]
    async fn update_profile(
        &self,
        uid: &UserId,
        update: ProfileUpdate,
    ) -> Result<AuthUser, AuthError> {
        let mut patch = Document::new();
        if let Some(name) = update.display_name {
            patch.insert(DISPLAY_NAME.to_owned(), json!(name));
        }
        if let Some(url) = update.photo_url {
            patch.insert(PHOTO_URL.to_owned(), json!(url));
        }

        self.docs
            .update(ACCOUNTS, uid.as_str(), patch)
            .await
            .map_err(|e| match e {
                BackendError::NotFound(_) => AuthError::UserNotFound,
                other => AuthError::Backend(other),
            })?;

        self.user(uid).await?.ok_or(AuthError::UserNotFound)
    }

    async fn user(&self, uid: &UserId) -> Result<Option<AuthUser>, AuthError> {
        self.docs
            .get(ACCOUNTS, uid.as_str())
            .await?
            .map(|data| account_to_user(uid.as_str(), &data))
            .transpose()
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::baas::memory::MemoryDocumentStore;

    fn provider() -> AccountsAuth {
        AccountsAuth::new(Arc::new(MemoryDocumentStore::new()))
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = provider();
        let email = Email::parse("buyer@example.com").unwrap();

        let created = auth.sign_up(&email, &secret("hunter22!")).await.unwrap();
        let signed_in = auth.sign_in(&email, &secret("hunter22!")).await.unwrap();
        assert_eq!(created.uid, signed_in.uid);
        assert_eq!(signed_in.email, email);
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_rejected() {
        let auth = provider();
        let email = Email::parse("buyer@example.com").unwrap();
        auth.sign_up(&email, &secret("hunter22!")).await.unwrap();

        let err = auth.sign_up(&email, &secret("other-pass")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_sign_up_admits_one() {
        let auth = provider();
        let email = Email::parse("buyer@example.com").unwrap();
        let shouted = Email::parse("BUYER@example.com").unwrap();

        let first_pw = secret("hunter22!");
        let second_pw = secret("other-pass");
        let (a, b) = tokio::join!(
            auth.sign_up(&email, &first_pw),
            auth.sign_up(&shouted, &second_pw),
        );
        let winner = match (a, b) {
            (Ok(user), Err(AuthError::UserAlreadyExists))
            | (Err(AuthError::UserAlreadyExists), Ok(user)) => user,
            other => panic!("expected exactly one account, got {other:?}"),
        };

        let accounts = auth.docs.list(ACCOUNTS).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts.first().unwrap().id, winner.uid.as_str());
    }

    #[tokio::test]
    async fn test_email_matching_ignores_case() {
        let auth = provider();
        let email = Email::parse("Buyer@example.com").unwrap();
        let created = auth.sign_up(&email, &secret("hunter22!")).await.unwrap();

        let lower = Email::parse("buyer@EXAMPLE.com").unwrap();
        let signed_in = auth.sign_in(&lower, &secret("hunter22!")).await.unwrap();
        assert_eq!(signed_in.uid, created.uid);
        assert_eq!(signed_in.email, email);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let auth = provider();
        let email = Email::parse("buyer@example.com").unwrap();
        auth.sign_up(&email, &secret("hunter22!")).await.unwrap();

        assert!(matches!(
            auth.sign_in(&email, &secret("wrong-pass")).await,
            Err(AuthError::InvalidCredentials)
        ));
        let stranger = Email::parse("nobody@example.com").unwrap();
        assert!(matches!(
            auth.sign_in(&stranger, &secret("hunter22!")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let auth = provider();
        let email = Email::parse("buyer@example.com").unwrap();
        let user = auth.sign_up(&email, &secret("hunter22!")).await.unwrap();

        let updated = auth
            .update_profile(
                &user.uid,
                ProfileUpdate {
                    display_name: Some("Nuel".to_owned()),
                    photo_url: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Nuel"));
        assert_eq!(updated.photo_url, None);

        let missing = auth
            .update_profile(&UserId::new("ghost"), ProfileUpdate::default())
            .await;
        assert!(matches!(missing, Err(AuthError::UserNotFound)));
    }
}
