//! Per-user documents in the `users` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nuel_store_core::{Email, Role};

/// The `users/{uid}` document written at sign-up.
///
/// The role field is what the session gate reads to decide admin access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
