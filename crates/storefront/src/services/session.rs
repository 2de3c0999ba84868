//! Session and role gate.
//!
//! Turns auth-provider callbacks into an explicit [`SessionState`]. The
//! admin flag comes from the `role` field of the remote `users/{uid}`
//! document; any doubt about it (missing document, unknown role, slow or
//! failing backend) resolves to a non-admin session.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use nuel_store_core::{Email, Role, UserId};

use crate::baas::collections::USERS;
use crate::baas::{AuthUser, DocumentStore};

/// A signed-in user as seen by the rest of the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub uid: UserId,
    pub email: Email,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

/// Where a client's session stands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionState {
    /// No auth callback has been observed yet.
    #[default]
    Unknown,
    /// The provider reported no signed-in user.
    Anonymous,
    /// A user is signed in.
    Authenticated(SessionUser),
}

impl SessionState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Authenticated(user) if user.is_admin)
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&SessionUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unknown | Self::Anonymous => None,
        }
    }
}

/// Resolves session state from auth changes.
pub struct SessionGate {
    docs: Arc<dyn DocumentStore>,
    role_timeout: Duration,
    state: watch::Sender<SessionState>,
}

impl SessionGate {
    /// Create a gate in the [`SessionState::Unknown`] state.
    #[must_use]
    pub fn new(docs: Arc<dyn DocumentStore>, role_timeout: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            docs,
            role_timeout,
            state,
        }
    }

    /// Apply one auth callback and return the resulting state.
    #[instrument(skip_all, fields(signed_in = user.is_some()))]
    pub async fn observe(&self, user: Option<AuthUser>) -> SessionState {
        let next = match user {
            None => SessionState::Anonymous,
            Some(user) => {
                let is_admin = self.lookup_admin(&user.uid).await;
                SessionState::Authenticated(SessionUser {
                    uid: user.uid,
                    email: user.email,
                    display_name: user.display_name,
                    is_admin,
                })
            }
        };
        self.state.send_replace(next.clone());
        next
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Drive the gate from an auth-change stream until the sender goes away.
    pub async fn follow(&self, mut changes: watch::Receiver<Option<AuthUser>>) {
        let current = changes.borrow_and_update().clone();
        self.observe(current).await;
        while changes.changed().await.is_ok() {
            let user = changes.borrow_and_update().clone();
            self.observe(user).await;
        }
        debug!("auth change stream closed");
    }

    async fn lookup_admin(&self, uid: &UserId) -> bool {
        match tokio::time::timeout(self.role_timeout, self.docs.get(USERS, uid.as_str())).await {
            Ok(Ok(Some(doc))) => Role::from_field(doc.get(Role::FIELD)) == Role::Admin,
            Ok(Ok(None)) => false,
            Ok(Err(e)) => {
                warn!(uid = %uid, error = %e, "role lookup failed, treating as non-admin");
                false
            }
            Err(_) => {
                warn!(
                    uid = %uid,
                    timeout_ms = self.role_timeout.as_millis(),
                    "role lookup timed out, treating as non-admin"
                );
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::baas::memory::MemoryDocumentStore;
    use crate::baas::{BackendError, Document, StoredDocument};

    fn user(uid: &str) -> AuthUser {
        AuthUser {
            uid: UserId::new(uid),
            email: Email::parse(&format!("{uid}@example.com")).unwrap(),
            display_name: None,
            photo_url: None,
        }
    }

    async fn docs_with_role(uid: &str, role: &str) -> Arc<MemoryDocumentStore> {
        let docs = Arc::new(MemoryDocumentStore::new());
        let data = json!({"username": uid, "role": role});
        docs.set(USERS, uid, data.as_object().cloned().unwrap())
            .await
            .unwrap();
        docs
    }

    /// Document store whose reads never finish in time or always fail.
    struct Unreliable {
        hang: bool,
    }

    #[async_trait]
    impl DocumentStore for Unreliable {
        async fn get(&self, _: &str, _: &str) -> Result<Option<Document>, BackendError> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Err(BackendError::Unavailable("offline".to_owned()))
        }
        async fn list(&self, _: &str) -> Result<Vec<StoredDocument>, BackendError> {
            Ok(Vec::new())
        }
        async fn add(&self, _: &str, _: Document) -> Result<String, BackendError> {
            Err(BackendError::Unavailable("offline".to_owned()))
        }
        async fn create(&self, _: &str, _: &str, _: Document) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("offline".to_owned()))
        }
        async fn set(&self, _: &str, _: &str, _: Document) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("offline".to_owned()))
        }
        async fn update(&self, _: &str, _: &str, _: Document) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("offline".to_owned()))
        }
        async fn delete(&self, _: &str, _: &str) -> Result<bool, BackendError> {
            Ok(false)
        }
        async fn query_where(
            &self,
            _: &str,
            _: &str,
            _: &Value,
        ) -> Result<Vec<StoredDocument>, BackendError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_starts_unknown_then_anonymous() {
        let gate = SessionGate::new(Arc::new(MemoryDocumentStore::new()), Duration::from_secs(1));
        assert_eq!(gate.state(), SessionState::Unknown);

        let state = gate.observe(None).await;
        assert_eq!(state, SessionState::Anonymous);
        assert!(!state.is_authenticated());
        assert!(!state.is_admin());
    }

    #[tokio::test]
    async fn test_admin_role_from_users_document() {
        let gate = SessionGate::new(docs_with_role("a1", "admin").await, Duration::from_secs(1));
        let state = gate.observe(Some(user("a1"))).await;
        assert!(state.is_authenticated());
        assert!(state.is_admin());
    }

    #[tokio::test]
    async fn test_missing_or_unknown_role_is_not_admin() {
        let gate = SessionGate::new(docs_with_role("u1", "superuser").await, Duration::from_secs(1));
        assert!(!gate.observe(Some(user("u1"))).await.is_admin());

        let state = gate.observe(Some(user("nobody"))).await;
        assert!(state.is_authenticated());
        assert!(!state.is_admin());
    }

    #[tokio::test]
    async fn test_role_lookup_fails_closed() {
        let failing = SessionGate::new(Arc::new(Unreliable { hang: false }), Duration::from_secs(1));
        let state = failing.observe(Some(user("u1"))).await;
        assert!(state.is_authenticated());
        assert!(!state.is_admin());

        let slow = SessionGate::new(Arc::new(Unreliable { hang: true }), Duration::from_millis(20));
        let state = slow.observe(Some(user("u1"))).await;
        assert!(state.is_authenticated());
        assert!(!state.is_admin());
    }

    #[tokio::test]
    async fn test_follow_tracks_auth_changes() {
        let gate = Arc::new(SessionGate::new(
            docs_with_role("a1", "admin").await,
            Duration::from_secs(1),
        ));
        let mut states = gate.subscribe();
        let (auth_tx, auth_rx) = watch::channel(None);

        let follower = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move { gate.follow(auth_rx).await }
        });

        states.changed().await.unwrap();
        assert_eq!(*states.borrow_and_update(), SessionState::Anonymous);

        auth_tx.send_replace(Some(user("a1")));
        states.changed().await.unwrap();
        assert!(states.borrow_and_update().is_admin());

        drop(auth_tx);
        follower.await.unwrap();
    }
}
