use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// A logged practice interval for one problem.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    #[ts(type = "Array<string>")]
    pub affirmations_practiced: Json<Vec<String>>,
    pub duration_minutes: i32,
    pub mood_before: Option<i32>,
    pub mood_after: Option<i32>,
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct SessionWithProblem {
    #[serde(flatten)]
    #[ts(flatten)]
    #[sqlx(flatten)]
    pub session: Session,
    pub problem_title: String,
    pub category_name: String,
    pub category_icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateSession {
    pub problem_id: Uuid,
    #[serde(default)]
    pub affirmations_practiced: Vec<String>,
    #[serde(default)]
    pub duration_minutes: i32,
    pub mood_before: Option<i32>,
    pub mood_after: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateSession {
    pub duration_minutes: Option<i32>,
    pub mood_after: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionFilter {
    pub problem_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for SessionFilter {
    fn default() -> Self {
        Self {
            problem_id: None,
            limit: 20,
            offset: 0,
        }
    }
}

/// The subset of a session that statistics are computed from.
#[derive(Debug, Clone, FromRow)]
pub struct SessionSample {
    pub duration_minutes: i32,
    pub mood_before: Option<i32>,
    pub mood_after: Option<i32>,
    pub completed_at: DateTime<Utc>,
}

const WITH_PROBLEM_SELECT: &str = r#"SELECT
    s.id                     AS id,
    s.user_id                AS user_id,
    s.problem_id             AS problem_id,
    s.affirmations_practiced AS affirmations_practiced,
    s.duration_minutes       AS duration_minutes,
    s.mood_before            AS mood_before,
    s.mood_after             AS mood_after,
    s.notes                  AS notes,
    s.completed_at           AS completed_at,
    s.created_at             AS created_at,
    s.updated_at             AS updated_at,
    p.title                  AS problem_title,
    c.name                   AS category_name,
    c.icon                   AS category_icon
FROM sessions s
JOIN problems p           ON p.id = s.problem_id
JOIN problem_categories c ON c.id = p.category_id"#;

impl SessionWithProblem {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        data: &CreateSession,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO sessions (id, user_id, problem_id, affirmations_practiced, duration_minutes, mood_before, mood_after, notes)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.problem_id)
        .bind(Json(&data.affirmations_practiced))
        .bind(data.duration_minutes)
        .bind(data.mood_before)
        .bind(data.mood_after)
        .bind(data.notes.as_deref())
        .execute(pool)
        .await?;

        Self::find_for_user(pool, id, user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{WITH_PROBLEM_SELECT}\nWHERE s.id = $1 AND s.user_id = $2");
        sqlx::query_as::<_, SessionWithProblem>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Most recently completed first, optionally narrowed to one problem.
    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: Uuid,
        filter: SessionFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "{WITH_PROBLEM_SELECT}
WHERE s.user_id = $1
  AND ($2 IS NULL OR s.problem_id = $2)
ORDER BY s.completed_at DESC
LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, SessionWithProblem>(&query)
            .bind(user_id)
            .bind(filter.problem_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        data: &UpdateSession,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE sessions
               SET duration_minutes = COALESCE($3, duration_minutes),
                   mood_after       = COALESCE($4, mood_after),
                   notes            = COALESCE($5, notes),
                   updated_at       = datetime('now', 'subsec')
               WHERE id = $1 AND user_id = $2"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.duration_minutes)
        .bind(data.mood_after)
        .bind(data.notes.as_deref())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_for_user(pool, id, user_id).await
    }
}

impl SessionSample {
    /// Sessions the user completed within the last `days` days.
    pub async fn find_recent(
        pool: &SqlitePool,
        user_id: Uuid,
        days: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let window = format!("-{} days", days);
        sqlx::query_as::<_, SessionSample>(
            r#"SELECT duration_minutes, mood_before, mood_after, completed_at
               FROM sessions
               WHERE user_id = $1
                 AND datetime(completed_at) >= datetime('now', $2)
               ORDER BY completed_at ASC"#,
        )
        .bind(user_id)
        .bind(window)
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

    async fn setup() -> (DBService, Uuid, Problem) {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = Uuid::new_v4();
        User::create(&db.pool, user_id, "practice@example.com", None)
            .await
            .unwrap();
        let category = ProblemCategory::find_by_name(&db.pool, "Self-Confidence")
            .await
            .unwrap()
            .unwrap();
        let problem = Problem::create(
            &db.pool,
            Uuid::new_v4(),
            user_id,
            &NewProblem {
                category_id: category.id,
                title: "Speaking up".to_string(),
                description: "I stay quiet in meetings".to_string(),
                severity: 4,
                is_public: false,
            },
        )
        .await
        .unwrap();
        (db, user_id, problem)
    }

    #[tokio::test]
    async fn create_returns_problem_context() {
        let (db, user_id, problem) = setup().await;
        let session = SessionWithProblem::create(
            &db.pool,
            Uuid::new_v4(),
            user_id,
            &CreateSession {
                problem_id: problem.id,
                affirmations_practiced: vec!["I speak with confidence".to_string()],
                duration_minutes: 10,
                mood_before: Some(4),
                mood_after: Some(7),
                notes: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(session.problem_title, "Speaking up");
        assert_eq!(session.category_name, "Self-Confidence");
        assert_eq!(session.session.affirmations_practiced.0.len(), 1);
        assert_eq!(session.session.duration_minutes, 10);
    }

    #[tokio::test]
    async fn update_is_owner_only_and_partial() {
        let (db, user_id, problem) = setup().await;
        let id = Uuid::new_v4();
        SessionWithProblem::create(
            &db.pool,
            id,
            user_id,
            &CreateSession {
                problem_id: problem.id,
                affirmations_practiced: vec![],
                duration_minutes: 5,
                mood_before: Some(3),
                mood_after: None,
                notes: Some("rough day".to_string()),
            },
        )
        .await
        .unwrap();

        let update = UpdateSession {
            mood_after: Some(6),
            ..Default::default()
        };
        assert!(
            SessionWithProblem::update(&db.pool, id, Uuid::new_v4(), &update)
                .await
                .unwrap()
                .is_none()
        );

        let updated = SessionWithProblem::update(&db.pool, id, user_id, &update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.session.mood_after, Some(6));
        assert_eq!(updated.session.duration_minutes, 5);
        assert_eq!(updated.session.notes.as_deref(), Some("rough day"));
    }

    #[tokio::test]
    async fn recent_samples_exclude_old_sessions() {
        let (db, user_id, problem) = setup().await;
        for _ in 0..2 {
            SessionWithProblem::create(
                &db.pool,
                Uuid::new_v4(),
                user_id,
                &CreateSession {
                    problem_id: problem.id,
                    affirmations_practiced: vec![],
                    duration_minutes: 15,
                    mood_before: None,
                    mood_after: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        }
        sqlx::query(
            "UPDATE sessions SET completed_at = datetime('now', '-40 days') WHERE rowid = (SELECT MIN(rowid) FROM sessions)",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let samples = SessionSample::find_recent(&db.pool, user_id, 30).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].duration_minutes, 15);
    }
}
