//! `PostgreSQL` document store.
//!
//! Every collection lives in one table, `storefront.documents`, with a JSONB
//! body. See `crates/storefront/migrations/` for the schema; migrations run
//! via `nuel-cli migrate`, never on startup.
//!
//! Queries use the runtime `sqlx::query` API because the collection and
//! field names are dynamic values, bound as parameters.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{BackendError, Document, DocumentStore, StoredDocument};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// [`DocumentStore`] backed by a JSONB table.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<StoredDocument, BackendError> {
    let id: String = row.try_get("id")?;
    let Json(data): Json<Document> = row.try_get("data")?;
    Ok(StoredDocument { id, data })
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        let row = sqlx::query(
            "SELECT data FROM storefront.documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_get::<Json<Document>, _>("data").map(|Json(d)| d))
            .transpose()
            .map_err(BackendError::from)
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, BackendError> {
        let rows = sqlx::query(
            r"
            SELECT id, data FROM storefront.documents
            WHERE collection = $1
            ORDER BY created_at, id
            ",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, BackendError> {
        let id = Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO storefront.documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&data))
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn create(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> Result<(), BackendError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&data))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BackendError::Conflict(format!("{collection}/{id}")));
        }
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), BackendError> {
        sqlx::query(
            r"
            INSERT INTO storefront.documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&data))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> Result<(), BackendError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.documents
            SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&data))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound(format!("{collection}/{id}")));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, BackendError> {
        let result =
            sqlx::query("DELETE FROM storefront.documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        let rows = sqlx::query(
            r"
            SELECT id, data FROM storefront.documents
            WHERE collection = $1 AND data -> $2 = $3
            ORDER BY created_at, id
            ",
        )
        .bind(collection)
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn store() -> PgDocumentStore {
        let url = std::env::var("STOREFRONT_DATABASE_URL").unwrap();
        let pool = create_pool(&SecretString::from(url)).await.unwrap();
        PgDocumentStore::new(pool)
    }

    #[tokio::test]
    #[ignore = "Requires a migrated PostgreSQL database (STOREFRONT_DATABASE_URL)"]
    async fn test_round_trip_and_query() {
        let store = store().await;
        let collection = format!("test-{}", Uuid::new_v4().simple());

        let mut data = Document::new();
        data.insert("userId".to_owned(), json!("u1"));
        let id = store.add(&collection, data).await.unwrap();

        let mut patch = Document::new();
        patch.insert("quantity".to_owned(), json!(2));
        store.update(&collection, &id, patch).await.unwrap();

        let hits = store
            .query_where(&collection, "userId", &json!("u1"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().unwrap().data.get("quantity"), Some(&json!(2)));

        assert!(store.delete(&collection, &id).await.unwrap());
        assert!(store.get(&collection, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "Requires a migrated PostgreSQL database (STOREFRONT_DATABASE_URL)"]
    async fn test_concurrent_create_admits_one() {
        let store = store().await;
        let collection = format!("test-{}", Uuid::new_v4().simple());

        let (a, b) = tokio::join!(
            store.create(&collection, "key", Document::new()),
            store.create(&collection, "key", Document::new()),
        );
        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        assert!(matches!(a.or(b), Ok(())));
    }
}
