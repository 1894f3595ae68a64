use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "affirmation_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AffirmationType {
    #[default]
    Positive,
    Solution,
    Motivational,
}

/// Whether the text came from the language model or from the canned fallback content.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "affirmation_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AffirmationSource {
    #[default]
    Model,
    Fallback,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Affirmation {
    pub id: Uuid,
    pub problem_id: Uuid, // Foreign key to Problem
    pub content: String,
    #[serde(rename = "type")]
    pub affirmation_type: AffirmationType,
    pub source: AffirmationSource,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
}

/// Favourite affirmation joined with the problem it belongs to.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct FavoriteAffirmation {
    #[serde(flatten)]
    #[ts(flatten)]
    #[sqlx(flatten)]
    pub affirmation: Affirmation,
    pub problem_title: String,
    pub category_name: String,
    pub category_icon: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateAffirmation {
    pub problem_id: Uuid,
    pub content: String,
    pub affirmation_type: AffirmationType,
    pub source: AffirmationSource,
}

impl Affirmation {
    pub async fn create(pool: &SqlitePool, data: &CreateAffirmation) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Affirmation>(
            r#"INSERT INTO affirmations (id, problem_id, content, affirmation_type, source)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, problem_id, content, affirmation_type, source, is_favorite, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(data.problem_id)
        .bind(&data.content)
        .bind(data.affirmation_type)
        .bind(data.source)
        .fetch_one(pool)
        .await
    }

    /// Inserts every row or none. All rows share one `created_at` so a batch
    /// reads back in insertion order.
    pub async fn create_many(
        pool: &SqlitePool,
        rows: &[CreateAffirmation],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let created_at: String = sqlx::query_scalar("SELECT datetime('now', 'subsec')")
            .fetch_one(&mut *tx)
            .await?;

        let mut created = Vec::with_capacity(rows.len());
        for data in rows {
            let affirmation = sqlx::query_as::<_, Affirmation>(
                r#"INSERT INTO affirmations (id, problem_id, content, affirmation_type, source, created_at)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   RETURNING id, problem_id, content, affirmation_type, source, is_favorite, created_at"#,
            )
            .bind(Uuid::new_v4())
            .bind(data.problem_id)
            .bind(&data.content)
            .bind(data.affirmation_type)
            .bind(data.source)
            .bind(&created_at)
            .fetch_one(&mut *tx)
            .await?;
            created.push(affirmation);
        }
        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Affirmation>(
            r#"SELECT id, problem_id, content, affirmation_type, source, is_favorite, created_at
               FROM affirmations
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first; rows inserted together keep their insertion order.
    pub async fn find_by_problem_id(
        pool: &SqlitePool,
        problem_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Affirmation>(
            r#"SELECT id, problem_id, content, affirmation_type, source, is_favorite, created_at
               FROM affirmations
               WHERE problem_id = $1
               ORDER BY created_at DESC, rowid ASC"#,
        )
        .bind(problem_id)
        .fetch_all(pool)
        .await
    }

    pub async fn set_favorite(
        pool: &SqlitePool,
        id: Uuid,
        is_favorite: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Affirmation>(
            r#"UPDATE affirmations
               SET is_favorite = $2
               WHERE id = $1
               RETURNING id, problem_id, content, affirmation_type, source, is_favorite, created_at"#,
        )
        .bind(id)
        .bind(is_favorite)
        .fetch_one(pool)
        .await
    }
}

impl FavoriteAffirmation {
    pub async fn find_by_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FavoriteAffirmation>(
            r#"SELECT
                a.id               AS id,
                a.problem_id       AS problem_id,
                a.content          AS content,
                a.affirmation_type AS affirmation_type,
                a.source           AS source,
                a.is_favorite      AS is_favorite,
                a.created_at       AS created_at,
                p.title            AS problem_title,
                c.name             AS category_name,
                c.icon             AS category_icon
            FROM affirmations a
            JOIN problems p           ON p.id = a.problem_id
            JOIN problem_categories c ON c.id = p.category_id
            WHERE a.is_favorite = 1
              AND p.user_id = $1
            ORDER BY a.created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::{
            problem::{NewProblem, Problem},
            problem_category::ProblemCategory,
            user::User,
        },
    };

    async fn problem_for_new_user(db: &DBService, email: &str) -> (Uuid, Problem) {
        let user_id = Uuid::new_v4();
        User::create(&db.pool, user_id, email, None).await.unwrap();
        let category = ProblemCategory::find_by_name(&db.pool, "Anxiety")
            .await
            .unwrap()
            .unwrap();
        let problem = Problem::create(
            &db.pool,
            Uuid::new_v4(),
            user_id,
            &NewProblem {
                category_id: category.id,
                title: "Presentations".to_string(),
                description: "Freezing up when presenting".to_string(),
                severity: 6,
                is_public: false,
            },
        )
        .await
        .unwrap();
        (user_id, problem)
    }

    fn row(problem_id: Uuid, content: &str, affirmation_type: AffirmationType) -> CreateAffirmation {
        CreateAffirmation {
            problem_id,
            content: content.to_string(),
            affirmation_type,
            source: AffirmationSource::Model,
        }
    }

    #[tokio::test]
    async fn create_many_keeps_types_and_order() {
        let db = DBService::new_in_memory().await.unwrap();
        let (_, problem) = problem_for_new_user(&db, "a@example.com").await;

        let created = Affirmation::create_many(
            &db.pool,
            &[
                row(problem.id, "I speak with calm", AffirmationType::Positive),
                row(problem.id, "Rehearse twice", AffirmationType::Solution),
                row(problem.id, "You have got this", AffirmationType::Motivational),
            ],
        )
        .await
        .unwrap();
        assert_eq!(created.len(), 3);

        let stored = Affirmation::find_by_problem_id(&db.pool, problem.id).await.unwrap();
        let types: Vec<_> = stored.iter().map(|a| a.affirmation_type).collect();
        assert_eq!(
            types,
            vec![
                AffirmationType::Positive,
                AffirmationType::Solution,
                AffirmationType::Motivational
            ]
        );
        assert!(stored.iter().all(|a| !a.is_favorite));
    }

    #[tokio::test]
    async fn favourites_are_scoped_to_the_owner() {
        let db = DBService::new_in_memory().await.unwrap();
        let (owner, problem) = problem_for_new_user(&db, "owner@example.com").await;
        let (stranger, _) = problem_for_new_user(&db, "stranger@example.com").await;

        let affirmation = Affirmation::create(
            &db.pool,
            &row(problem.id, "I am steady", AffirmationType::Positive),
        )
        .await
        .unwrap();
        let toggled = Affirmation::set_favorite(&db.pool, affirmation.id, true)
            .await
            .unwrap();
        assert!(toggled.is_favorite);

        let mine = FavoriteAffirmation::find_by_user(&db.pool, owner).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].problem_title, "Presentations");
        assert_eq!(mine[0].category_name, "Anxiety");

        let theirs = FavoriteAffirmation::find_by_user(&db.pool, stranger).await.unwrap();
        assert!(theirs.is_empty());
    }

    #[test]
    fn type_serializes_lowercase() {
        assert_eq!(AffirmationType::Motivational.to_string(), "motivational");
        assert_eq!(
            serde_json::to_string(&AffirmationSource::Fallback).unwrap(),
            "\"fallback\""
        );
    }
}
