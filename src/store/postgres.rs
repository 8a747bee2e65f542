use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::sync::Arc;

use crate::error::StoreError;
use crate::model::ETag;
use crate::store::iterator::DocumentIterator;
use crate::store::traits::{
    DocumentKey, DocumentKind, DocumentStore, Page, PageSource, Precondition, RawDocument,
};

const CREATE_DOCUMENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        partition_key TEXT NOT NULL,
        id TEXT NOT NULL,
        kind TEXT NOT NULL,
        resource_path TEXT NOT NULL,
        etag TEXT NOT NULL,
        body JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (partition_key, id)
    )
"#;

const CREATE_SCOPE_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS documents_scope_idx
        ON documents (partition_key, kind, resource_path)
"#;

/// Document store backed by a single PostgreSQL JSONB table.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the documents table and its scope index if missing
    pub async fn migrate(&self) -> Result<()> {
        for statement in [CREATE_DOCUMENTS_TABLE, CREATE_SCOPE_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run database migrations")?;
        }
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Sort sqlx failures into transient and permanent store errors.
fn classify(err: sqlx::Error, key: &str) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound(key.to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => {
            StoreError::Retryable(format!("{key}: {err}"))
        }
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // serialization_failure, deadlock_detected, too_many_connections,
            // admin_shutdown, cannot_connect_now
            Some("40001" | "40P01" | "53300" | "57P01" | "57P03") => {
                StoreError::Retryable(format!("{key}: {db}"))
            }
            Some("23505") => StoreError::Conflict(key.to_string()),
            _ => StoreError::Backend(format!("{key}: {db}")),
        },
        other => StoreError::Backend(format!("{key}: {other}")),
    }
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<RawDocument, StoreError> {
    let partition_key: String = row.try_get("partition_key").map_err(|e| classify(e, "row"))?;
    let id: String = row.try_get("id").map_err(|e| classify(e, "row"))?;
    let key = DocumentKey::new(partition_key, id);
    let kind: String = row.try_get("kind").map_err(|e| classify(e, &key.to_string()))?;
    let kind = DocumentKind::parse(&kind)
        .ok_or_else(|| StoreError::Backend(format!("{key}: unknown document kind '{kind}'")))?;

    Ok(RawDocument {
        kind,
        resource_path: row
            .try_get("resource_path")
            .map_err(|e| classify(e, &key.to_string()))?,
        etag: Some(ETag::new(
            row.try_get::<String, _>("etag")
                .map_err(|e| classify(e, &key.to_string()))?,
        )),
        body: row
            .try_get("body")
            .map_err(|e| classify(e, &key.to_string()))?,
        key,
    })
}

#[async_trait::async_trait]
impl DocumentStore for PostgresStore {
    async fn read(&self, key: &DocumentKey) -> Result<RawDocument, StoreError> {
        key.validate()?;
        let row = sqlx::query(
            "SELECT partition_key, id, kind, resource_path, etag, body FROM documents WHERE partition_key = $1 AND id = $2",
        )
        .bind(&key.partition_key)
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, &key.to_string()))?;

        match row {
            Some(row) => row_to_document(&row),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    async fn write(
        &self,
        mut doc: RawDocument,
        precondition: Precondition,
    ) -> Result<RawDocument, StoreError> {
        doc.key.validate()?;
        let key = doc.key.to_string();
        let etag = ETag::generate();

        let result = match &precondition {
            Precondition::None => sqlx::query(
                r#"
                INSERT INTO documents (partition_key, id, kind, resource_path, etag, body)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (partition_key, id) DO UPDATE SET
                    kind = EXCLUDED.kind,
                    resource_path = EXCLUDED.resource_path,
                    etag = EXCLUDED.etag,
                    body = EXCLUDED.body,
                    updated_at = NOW()
                "#,
            ),
            Precondition::IfNoneMatch => sqlx::query(
                r#"
                INSERT INTO documents (partition_key, id, kind, resource_path, etag, body)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (partition_key, id) DO NOTHING
                "#,
            ),
            Precondition::IfMatch(_) => sqlx::query(
                r#"
                UPDATE documents SET
                    kind = $3,
                    resource_path = $4,
                    etag = $5,
                    body = $6,
                    updated_at = NOW()
                WHERE partition_key = $1 AND id = $2 AND etag = $7
                "#,
            ),
        }
        .bind(&doc.key.partition_key)
        .bind(&doc.key.id)
        .bind(doc.kind.as_str())
        .bind(&doc.resource_path)
        .bind(etag.as_str())
        .bind(&doc.body);

        let result = match &precondition {
            Precondition::IfMatch(expected) => result.bind(expected.as_str()),
            _ => result,
        }
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, &key))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(key));
        }

        doc.etag = Some(etag);
        Ok(doc)
    }

    async fn remove(
        &self,
        key: &DocumentKey,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        key.validate()?;
        let result = match &precondition {
            Precondition::IfMatch(expected) => {
                sqlx::query(
                    "DELETE FROM documents WHERE partition_key = $1 AND id = $2 AND etag = $3",
                )
                    .bind(&key.partition_key)
                    .bind(&key.id)
                    .bind(expected.as_str())
                    .execute(&self.pool)
                    .await
            }
            Precondition::None | Precondition::IfNoneMatch => {
                sqlx::query("DELETE FROM documents WHERE partition_key = $1 AND id = $2")
                    .bind(&key.partition_key)
                    .bind(&key.id)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(|e| classify(e, &key.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(match precondition {
                Precondition::IfMatch(_) => StoreError::Conflict(key.to_string()),
                _ => StoreError::NotFound(key.to_string()),
            });
        }
        Ok(())
    }

    fn query(
        &self,
        partition_key: &str,
        kind: DocumentKind,
        scope: Option<&str>,
    ) -> DocumentIterator<RawDocument> {
        DocumentIterator::new(Arc::new(PostgresQuery {
            pool: self.pool.clone(),
            partition_key: partition_key.to_string(),
            kind,
            scope: scope.map(str::to_string),
        }))
    }
}

/// Keyset-paginated listing ordered by document id.
struct PostgresQuery {
    pool: PgPool,
    partition_key: String,
    kind: DocumentKind,
    scope: Option<String>,
}

#[async_trait::async_trait]
impl PageSource for PostgresQuery {
    async fn fetch_page(
        &self,
        continuation: Option<&str>,
        limit: usize,
    ) -> Result<Page, StoreError> {
        let nested = self.scope.as_ref().map(|scope| format!("{scope}/"));
        let rows = sqlx::query(
            r#"
            SELECT partition_key, id, kind, resource_path, etag, body
            FROM documents
            WHERE partition_key = $1
              AND kind = $2
              AND ($3::TEXT IS NULL OR resource_path = $3 OR starts_with(resource_path, $4))
              AND ($5::TEXT IS NULL OR id > $5)
            ORDER BY id
            LIMIT $6
            "#,
        )
        .bind(&self.partition_key)
        .bind(self.kind.as_str())
        .bind(self.scope.as_deref())
        .bind(nested.as_deref())
        .bind(continuation)
        .bind(limit as i64 + 1)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, &self.partition_key))?;

        let has_more = rows.len() > limit;
        let documents = rows
            .iter()
            .take(limit)
            .map(row_to_document)
            .collect::<Result<Vec<_>, _>>()?;
        let continuation = if has_more {
            documents.last().map(|doc| doc.key.id.clone())
        } else {
            None
        };

        Ok(Page {
            documents,
            continuation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_sqlx_errors_are_retryable() {
        assert!(classify(sqlx::Error::PoolTimedOut, "k").is_retryable());
        assert!(classify(sqlx::Error::RowNotFound, "k").is_not_found());
        assert!(!classify(sqlx::Error::ColumnNotFound("body".into()), "k").is_retryable());
    }

    // Requires DATABASE_URL pointing at a disposable database.
    #[tokio::test]
    #[ignore]
    async fn conditional_writes_against_postgres() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let store = PostgresStore::new(&url, 2).await.unwrap();
        store.migrate().await.unwrap();

        let key = DocumentKey::new("test-partition", crate::model::generate_id());
        let doc = RawDocument {
            key: key.clone(),
            kind: DocumentKind::Resource,
            resource_path: "/subscriptions/test-partition/r".into(),
            etag: None,
            body: serde_json::json!({"n": 1}),
        };
        let first = store.write(doc.clone(), Precondition::IfNoneMatch).await.unwrap();
        assert!(store
            .write(doc.clone(), Precondition::IfNoneMatch)
            .await
            .unwrap_err()
            .is_conflict());

        let etag = first.etag.clone().unwrap();
        store
            .write(doc.clone(), Precondition::IfMatch(etag.clone()))
            .await
            .unwrap();
        assert!(store
            .write(doc, Precondition::IfMatch(etag))
            .await
            .unwrap_err()
            .is_conflict());

        store.remove(&key, Precondition::None).await.unwrap();
    }
}
