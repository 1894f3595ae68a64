//! Startup check that the schema the server depends on is in place.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

/// Tables every route reads or writes.
pub const REQUIRED_TABLES: &[&str] = &[
    "users",
    "problem_categories",
    "problems",
    "affirmations",
    "sessions",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database not initialized: {0}")]
    NotInitialized(String),
}

pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inspect migration state, required tables and seeded categories.
    pub async fn validate(&self) -> Result<ValidationResult, DatabaseValidationError> {
        let migrations_table_exists = self.table_exists("_sqlx_migrations").await?;
        if !migrations_table_exists {
            warn!("Database not initialized - _sqlx_migrations table does not exist");
            return Ok(ValidationResult {
                is_initialized: false,
                migrations_applied: 0,
                latest_migration: None,
                missing_tables: REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
                category_count: 0,
            });
        }

        let migrations_applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        let latest_migration = self.latest_migration().await?;
        let missing_tables = self.missing_tables(REQUIRED_TABLES).await?;

        let category_count = if missing_tables.iter().any(|t| t == "problem_categories") {
            0
        } else {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM problem_categories")
                .fetch_one(&self.pool)
                .await?
        };

        let result = ValidationResult {
            is_initialized: true,
            migrations_applied: migrations_applied as usize,
            latest_migration,
            missing_tables,
            category_count: category_count as usize,
        };

        if result.is_ok() {
            info!(
                migrations_applied = result.migrations_applied,
                latest = ?result.latest_migration,
                categories = result.category_count,
                "Database validation complete"
            );
        } else {
            warn!(summary = %result.summary(), "Database validation found problems");
        }
        Ok(result)
    }

    /// Same as [`validate`](Self::validate) but turns any finding into an error.
    pub async fn ensure_ready(&self) -> Result<ValidationResult, DatabaseValidationError> {
        let result = self.validate().await?;
        if result.is_ok() {
            Ok(result)
        } else {
            Err(DatabaseValidationError::NotInitialized(result.summary()))
        }
    }

    async fn table_exists(&self, table: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=$1",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn missing_tables(
        &self,
        required_tables: &[&str],
    ) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing = Vec::new();
        for table in required_tables {
            if !self.table_exists(table).await? {
                missing.push(table.to_string());
            }
        }
        Ok(missing)
    }

    async fn latest_migration(&self) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_initialized: bool,
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
    pub category_count: usize,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.missing_tables.is_empty() && self.category_count > 0
    }

    pub fn summary(&self) -> String {
        if !self.is_initialized {
            "Database not initialized - migrations need to be run".to_string()
        } else if !self.missing_tables.is_empty() {
            format!("Missing tables: {}", self.missing_tables.join(", "))
        } else if self.category_count == 0 {
            "No problem categories seeded".to_string()
        } else {
            format!(
                "Database OK - {} migrations applied, {} categories",
                self.migrations_applied, self.category_count
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    #[tokio::test]
    async fn migrated_database_passes() {
        let db = DBService::new_in_memory().await.unwrap();
        let result = DatabaseValidator::new(db.pool.clone())
            .ensure_ready()
            .await
            .unwrap();
        assert!(result.migrations_applied >= 2);
        assert_eq!(result.category_count, 8);
        assert!(result.missing_tables.is_empty());
    }

    #[tokio::test]
    async fn empty_database_is_not_initialized() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let validator = DatabaseValidator::new(pool);

        let result = validator.validate().await.unwrap();
        assert!(!result.is_initialized);
        assert_eq!(result.missing_tables.len(), REQUIRED_TABLES.len());
        assert!(matches!(
            validator.ensure_ready().await,
            Err(DatabaseValidationError::NotInitialized(_))
        ));
    }

    #[tokio::test]
    async fn dropped_table_is_reported() {
        let db = DBService::new_in_memory().await.unwrap();
        sqlx::query("DROP TABLE sessions")
            .execute(&db.pool)
            .await
            .unwrap();

        let result = DatabaseValidator::new(db.pool.clone()).validate().await.unwrap();
        assert_eq!(result.missing_tables, vec!["sessions".to_string()]);
        assert!(result.summary().contains("sessions"));
    }
}
