//! Documents in a PostgreSQL table through SeaORM.

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use serde_json::Value;
use tracing::log::LevelFilter;

use super::DocumentStore;
use crate::error::Result;

const CREATE_TABLE: &str = r#"
CREATE SCHEMA IF NOT EXISTS app;
CREATE TABLE IF NOT EXISTS app.kv_documents (
    key TEXT PRIMARY KEY,
    value JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

const SELECT_DOCUMENT: &str = "SELECT value::text AS value FROM app.kv_documents WHERE key = $1";

const UPSERT_DOCUMENT: &str = r#"
INSERT INTO app.kv_documents (key, value, updated_at)
VALUES ($1, $2::jsonb, now())
ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
"#;

/// Document store backed by `app.kv_documents`.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    /// Connect with pool settings suited to short batch runs.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let mut opt = ConnectOptions::new(database_url);
        opt.max_connections(5)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(true)
            .sqlx_logging_level(LevelFilter::Debug);

        let db = Database::connect(opt).await?;
        Ok(Self { db })
    }

    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create the schema and table if missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.db.execute_unprepared(CREATE_TABLE).await?;
        Ok(())
    }
}

impl DocumentStore for PgStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                SELECT_DOCUMENT,
                [key.into()],
            ))
            .await?;

        match row {
            Some(row) => {
                let text: String = row.try_get("", "value")?;
                Ok(Some(serde_json::from_str(&text)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, document: Value) -> Result<()> {
        let text = serde_json::to_string(&document)?;
        self.db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                UPSERT_DOCUMENT,
                [key.into(), text.into()],
            ))
            .await?;
        Ok(())
    }
}
