use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Profile row mirroring an account held by the external auth platform.
/// The id is the platform's user id, never generated locally.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        email: &str,
        full_name: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, email, full_name)
               VALUES ($1, $2, $3)
               RETURNING id, email, full_name, avatar_url, created_at, updated_at"#,
        )
        .bind(id)
        .bind(email)
        .bind(full_name)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, email, full_name, avatar_url, created_at, updated_at
               FROM users
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fields left as `None` keep their stored value.
    pub async fn update_profile(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET full_name  = COALESCE($2, full_name),
                   avatar_url = COALESCE($3, avatar_url),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, email, full_name, avatar_url, created_at, updated_at"#,
        )
        .bind(id)
        .bind(data.full_name.as_deref())
        .bind(data.avatar_url.as_deref())
        .fetch_optional(pool)
        .await
    }
}
