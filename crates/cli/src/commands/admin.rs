//! Admin role management.
//!
//! The role lives on the `users/{uid}` document written at sign-up. These
//! commands find that document by email and rewrite its `role` field.

use serde_json::json;

use nuel_store_core::{Email, Role};
use nuel_store_storefront::baas::postgres::PgDocumentStore;
use nuel_store_storefront::baas::{Document, DocumentStore, collections::USERS};

use super::{CliError, connect};

/// Set the role of every user document with this email.
///
/// # Errors
///
/// Returns `InvalidEmail` for a malformed address, `UnknownUser` if no user document has this email, and a database
/// error if the lookup or update fails.
pub async fn set_role(email: &str, role: Role) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let store = PgDocumentStore::new(connect().await?);
    let updated = apply_role(&store, &email, role).await?;

    tracing::info!(email = %email, role = %role, users = updated, "Role updated");
    Ok(())
}

/// Rewrite the role on the matching user documents, returning how many.
///
/// # Errors
///
/// Returns `UnknownUser` if nothing matches and `Backend` if a read or
/// write fails.
pub async fn apply_role(
    store: &dyn DocumentStore,
    email: &Email,
    role: Role,
) -> Result<usize, CliError> {
    let users = store
        .query_where(USERS, "email", &json!(email.as_str()))
        .await?;
    if users.is_empty() {
        return Err(CliError::UnknownUser(email.to_string()));
    }

    for user in &users {
        let mut patch = Document::new();
        patch.insert(Role::FIELD.to_owned(), json!(role.as_str()));
        store.update(USERS, &user.id, patch).await?;
    }
    Ok(users.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nuel_store_storefront::baas::memory::MemoryDocumentStore;

    use super::*;

    #[tokio::test]
    async fn test_grant_and_revoke() {
        let store = MemoryDocumentStore::new();
        let data = json!({"username": "ada", "email": "ada@example.com", "role": "user"});
        store
            .set(USERS, "u1", data.as_object().cloned().unwrap())
            .await
            .unwrap();
        let email = Email::parse("ada@example.com").unwrap();

        assert_eq!(apply_role(&store, &email, Role::Admin).await.unwrap(), 1);
        let doc = store.get(USERS, "u1").await.unwrap().unwrap();
        assert_eq!(Role::from_field(doc.get(Role::FIELD)), Role::Admin);
        assert_eq!(doc.get("username"), Some(&json!("ada")));

        apply_role(&store, &email, Role::User).await.unwrap();
        let doc = store.get(USERS, "u1").await.unwrap().unwrap();
        assert_eq!(Role::from_field(doc.get(Role::FIELD)), Role::User);
    }

    #[tokio::test]
    async fn test_unknown_email() {
        let store = MemoryDocumentStore::new();
        let email = Email::parse("nobody@example.com").unwrap();
        let err = apply_role(&store, &email, Role::Admin).await.unwrap_err();
        assert!(matches!(err, CliError::UnknownUser(_)));
    }
}
