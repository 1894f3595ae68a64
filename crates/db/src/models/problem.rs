use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::affirmation::Affirmation;

pub const DEFAULT_SEVERITY: i32 = 5;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Problem {
    pub id: Uuid,
    pub user_id: Uuid,     // Foreign key to User
    pub category_id: Uuid, // Foreign key to ProblemCategory
    pub title: String,
    pub description: String,
    pub severity: i32, // 1-10
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category fields embedded alongside a problem.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CategorySummary {
    #[sqlx(rename = "category_name")]
    pub name: String,
    #[sqlx(rename = "category_description")]
    pub description: Option<String>,
    #[sqlx(rename = "category_icon")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProblemWithCategory {
    #[serde(flatten)]
    #[ts(flatten)]
    #[sqlx(flatten)]
    pub problem: Problem,
    #[sqlx(flatten)]
    pub problem_categories: CategorySummary,
}

impl std::ops::Deref for ProblemWithCategory {
    type Target = Problem;
    fn deref(&self) -> &Self::Target {
        &self.problem
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProblemWithDetails {
    #[serde(flatten)]
    #[ts(flatten)]
    pub problem: ProblemWithCategory,
    pub affirmations: Vec<Affirmation>,
}

/// Validated input for inserting a problem.
#[derive(Debug, Clone)]
pub struct NewProblem {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub severity: i32,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateProblem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<i32>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Copy)]
pub struct ProblemFilter {
    pub category_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ProblemFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            limit: 20,
            offset: 0,
        }
    }
}

const WITH_CATEGORY_SELECT: &str = r#"SELECT
    p.id          AS id,
    p.user_id     AS user_id,
    p.category_id AS category_id,
    p.title       AS title,
    p.description AS description,
    p.severity    AS severity,
    p.is_public   AS is_public,
    p.created_at  AS created_at,
    p.updated_at  AS updated_at,
    c.name        AS category_name,
    c.description AS category_description,
    c.icon        AS category_icon
FROM problems p
JOIN problem_categories c ON c.id = p.category_id"#;

impl Problem {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        data: &NewProblem,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Problem>(
            r#"INSERT INTO problems (id, user_id, category_id, title, description, severity, is_public)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, user_id, category_id, title, description, severity, is_public, created_at, updated_at"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.category_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.severity)
        .bind(data.is_public)
        .fetch_one(pool)
        .await
    }

    /// Ownership-checked lookup: `None` when the problem is missing or belongs to someone else.
    pub async fn find_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Problem>(
            r#"SELECT id, user_id, category_id, title, description, severity, is_public, created_at, updated_at
               FROM problems
               WHERE id = $1 AND user_id = $2"#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Problem>(
            r#"SELECT id, user_id, category_id, title, description, severity, is_public, created_at, updated_at
               FROM problems
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        data: &UpdateProblem,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Problem>(
            r#"UPDATE problems
               SET title       = COALESCE($3, title),
                   description = COALESCE($4, description),
                   severity    = COALESCE($5, severity),
                   is_public   = COALESCE($6, is_public),
                   updated_at  = datetime('now', 'subsec')
               WHERE id = $1 AND user_id = $2
               RETURNING id, user_id, category_id, title, description, severity, is_public, created_at, updated_at"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.title.as_deref())
        .bind(data.description.as_deref())
        .bind(data.severity)
        .bind(data.is_public)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM problems WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl ProblemWithCategory {
    pub async fn find_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{WITH_CATEGORY_SELECT}\nWHERE p.id = $1 AND p.user_id = $2");
        sqlx::query_as::<_, ProblemWithCategory>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Newest first, optionally narrowed to one category.
    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: Uuid,
        filter: ProblemFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "{WITH_CATEGORY_SELECT}
WHERE p.user_id = $1
  AND ($2 IS NULL OR p.category_id = $2)
ORDER BY p.created_at DESC
LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, ProblemWithCategory>(&query)
            .bind(user_id)
            .bind(filter.category_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }
}

impl ProblemWithDetails {
    pub async fn load(
        pool: &SqlitePool,
        problem: ProblemWithCategory,
    ) -> Result<Self, sqlx::Error> {
        let affirmations = Affirmation::find_by_problem_id(pool, problem.id).await?;
        Ok(Self {
            problem,
            affirmations,
        })
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        match ProblemWithCategory::find_for_user(pool, id, user_id).await? {
            Some(problem) => Ok(Some(Self::load(pool, problem).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: Uuid,
        filter: ProblemFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let problems = ProblemWithCategory::find_by_user(pool, user_id, filter).await?;
        let mut detailed = Vec::with_capacity(problems.len());
        for problem in problems {
            detailed.push(Self::load(pool, problem).await?);
        }
        Ok(detailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::{problem_category::ProblemCategory, user::User},
    };

    async fn setup() -> (DBService, Uuid, Uuid) {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = Uuid::new_v4();
        User::create(&db.pool, user_id, "owner@example.com", None)
            .await
            .unwrap();
        let category = ProblemCategory::find_by_name(&db.pool, "Work Stress")
            .await
            .unwrap()
            .unwrap();
        (db, user_id, category.id)
    }

    fn new_problem(category_id: Uuid, title: &str) -> NewProblem {
        NewProblem {
            category_id,
            title: title.to_string(),
            description: "Too many things due on Friday".to_string(),
            severity: 7,
            is_public: false,
        }
    }

    #[tokio::test]
    async fn other_users_cannot_see_or_change_a_problem() {
        let (db, owner, category_id) = setup().await;
        let intruder = Uuid::new_v4();
        let problem = Problem::create(&db.pool, Uuid::new_v4(), owner, &new_problem(category_id, "Deadline"))
            .await
            .unwrap();

        assert!(Problem::find_for_user(&db.pool, problem.id, intruder).await.unwrap().is_none());
        assert!(
            Problem::update(&db.pool, problem.id, intruder, &UpdateProblem::default())
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(Problem::delete(&db.pool, problem.id, intruder).await.unwrap(), 0);
        assert_eq!(Problem::delete(&db.pool, problem.id, owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let (db, owner, category_id) = setup().await;
        let problem = Problem::create(&db.pool, Uuid::new_v4(), owner, &new_problem(category_id, "Deadline"))
            .await
            .unwrap();

        let updated = Problem::update(
            &db.pool,
            problem.id,
            owner,
            &UpdateProblem {
                severity: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.severity, 3);
        assert_eq!(updated.title, "Deadline");
        assert_eq!(updated.description, problem.description);
    }

    #[tokio::test]
    async fn listing_embeds_category_and_honours_filter() {
        let (db, owner, category_id) = setup().await;
        let other_category = ProblemCategory::find_by_name(&db.pool, "Anxiety")
            .await
            .unwrap()
            .unwrap();

        Problem::create(&db.pool, Uuid::new_v4(), owner, &new_problem(category_id, "Deadline"))
            .await
            .unwrap();
        Problem::create(&db.pool, Uuid::new_v4(), owner, &new_problem(other_category.id, "Worry"))
            .await
            .unwrap();

        let all = ProblemWithDetails::find_by_user(&db.pool, owner, ProblemFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let filtered = ProblemWithDetails::find_by_user(
            &db.pool,
            owner,
            ProblemFilter {
                category_id: Some(other_category.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].problem.title, "Worry");
        assert_eq!(filtered[0].problem.problem_categories.name, "Anxiety");
        assert!(filtered[0].affirmations.is_empty());
    }
}
