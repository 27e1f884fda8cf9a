use crate::{
    app::{APP, APPID, ORG, QUALIFIER},
    models::{history::OperationRecord, operation_status::OperationStatus},
};
use anyhow::{anyhow, Result};
use sqlx::{
    migrate::MigrateDatabase, prelude::*, sqlite::Sqlite, sqlite::SqlitePoolOptions, SqlitePool,
};
use std::path::Path;

const DB_PATH: &str = constcat::concat!(APPID, "-history", ".sqlite");

#[derive(Debug, Clone)]
pub struct HistoryDatabase {
    conn: SqlitePool,
}

impl HistoryDatabase {
    pub async fn create() -> Result<Self> {
        let directories = directories::ProjectDirs::from(QUALIFIER, ORG, APP)
            .ok_or(anyhow!("can't determine the home directory"))?;
        std::fs::create_dir_all(directories.cache_dir())?;
        Self::ensure_db_exists(directories.cache_dir()).await
    }

    async fn ensure_db_exists(db_dir: &Path) -> Result<Self> {
        let db_path = db_dir.join(DB_PATH);
        let db_path = db_path
            .to_str()
            .ok_or(anyhow!("can't convert path to str"))?;

        if !Sqlite::database_exists(db_path).await? {
            Sqlite::create_database(db_path).await?;
        }
        Self::open(db_path).await
    }

    /// Opens any SQLite URL and applies migrations. In-memory databases are
    /// limited to one connection so every query sees the same data.
    pub async fn open(url: &str) -> Result<Self> {
        let mut options = SqlitePoolOptions::new().max_connections(4);
        if url.contains(":memory:") {
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let conn = options.connect(url).await?;
        sqlx::migrate!("./migrations").run(&conn).await?;
        Ok(HistoryDatabase { conn })
    }

    pub async fn record(&self, record: &OperationRecord) -> Result<i64> {
        let query: &str = r"
            INSERT INTO OperationHistory (
                title,
                description,
                status,
                error_message,
                started_at,
                finished_at)
                VALUES ($1, $2, $3, $4, $5, $6);";
        let result = sqlx::query(query)
            .bind(&record.title)
            .bind(&record.description)
            .bind(record.status.to_string())
            .bind(&record.error_message)
            .bind(record.started_at)
            .bind(record.finished_at)
            .execute(&self.conn)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<OperationRecord>> {
        let query: &str = "SELECT * FROM OperationHistory ORDER BY finished_at DESC, id DESC LIMIT $1;";
        let rows = sqlx::query(query)
            .bind(limit)
            .fetch_all(&self.conn)
            .await?;

        let records: Vec<OperationRecord> = rows
            .iter()
            .map(|row| OperationRecord {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                status: OperationStatus::from_str(row.get("status")),
                error_message: row.get("error_message"),
                started_at: row.get("started_at"),
                finished_at: row.get("finished_at"),
            })
            .collect();
        Ok(records)
    }

    pub async fn count(&self) -> Result<usize> {
        let query: &str = "SELECT COUNT(*) FROM OperationHistory;";
        let result: i64 = sqlx::query_scalar(query).fetch_one(&self.conn).await?;
        Ok(usize::try_from(result)?)
    }

    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM OperationHistory;")
            .execute(&self.conn)
            .await?;
        Ok(())
    }
}
