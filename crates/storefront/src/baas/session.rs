//! Device storage kept in the HTTP session.
//!
//! For browser clients the session cookie identifies the device, so the
//! session record is the natural home for the cart's local storage. Values
//! are stored under a `device:` prefix to keep them apart from auth keys.

use async_trait::async_trait;
use tower_sessions::Session;

use super::{BackendError, DeviceStorage};

const KEY_PREFIX: &str = "device:";

/// [`DeviceStorage`] over a `tower-sessions` session.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    session: Session,
}

impl SessionStorage {
    /// Wrap the current request's session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

fn session_error(err: &tower_sessions::session::Error) -> BackendError {
    BackendError::Unavailable(format!("session store: {err}"))
}

#[async_trait]
impl DeviceStorage for SessionStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.session
            .get::<String>(&format!("{KEY_PREFIX}{key}"))
            .await
            .map_err(|e| session_error(&e))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), BackendError> {
        self.session
            .insert(&format!("{KEY_PREFIX}{key}"), value)
            .await
            .map_err(|e| session_error(&e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_values_round_trip_through_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let storage = SessionStorage::new(session.clone());

        assert_eq!(storage.get("quantities").await.unwrap(), None);
        storage.set("quantities", "[]".to_owned()).await.unwrap();
        assert_eq!(storage.get("quantities").await.unwrap().as_deref(), Some("[]"));

        let raw: Option<String> = session.get("device:quantities").await.unwrap();
        assert_eq!(raw.as_deref(), Some("[]"));
    }
}
