use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tasking_config::DatabaseConfig;
use tasking_errors::TaskingResult;
use tracing::{debug, info};

use super::sqlite::SqliteDocumentStore;

/// SQLite 连接池管理
///
/// 内存数据库只在单个连接内可见，因此强制使用一个常驻连接。
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> TaskingResult<Self> {
        let in_memory = config.url.contains(":memory:");
        let connect_options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds));
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .max_lifetime(Duration::from_secs(1800))
        };

        let pool = pool_options.connect_with(connect_options).await?;
        info!("数据库连接成功: {}", config.url);

        let manager = Self { pool };
        manager.migrate().await?;
        Ok(manager)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> TaskingResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                collection TEXT NOT NULL,
                body TEXT NOT NULL CHECK (json_valid(body)),
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection, seq)",
        )
        .execute(&self.pool)
        .await?;

        // 任务类型名称在集合内唯一
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_task_types_name
            ON documents (json_extract(body, '$.name'))
            WHERE collection = 'task_types'
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("数据库表结构已就绪");
        Ok(())
    }

    pub async fn health_check(&self) -> TaskingResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn document_store(&self) -> SqliteDocumentStore {
        SqliteDocumentStore::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn test_memory_database_manager() {
        let manager = DatabaseManager::new(&memory_config()).await.unwrap();
        assert!(manager.health_check().await.is_ok());

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
        )
        .fetch_one(manager.pool())
        .await
        .unwrap();
        assert_eq!(tables, 1);

        manager.close().await;
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let manager = DatabaseManager::new(&memory_config()).await.unwrap();
        assert!(manager.migrate().await.is_ok());
        assert!(manager.migrate().await.is_ok());
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("tasking.db").display()),
            ..DatabaseConfig::default()
        };

        let manager = DatabaseManager::new(&config).await.unwrap();
        assert!(manager.health_check().await.is_ok());
        manager.close().await;

        assert!(dir.path().join("tasking.db").exists());
    }
}
