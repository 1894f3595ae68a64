//! Practice statistics over a trailing window of days.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use db::models::session::SessionSample;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use ts_rs::TS;
use uuid::Uuid;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
/// SQLite date arithmetic yields NULL outside years 0000-9999, which would
/// silently empty the window.
pub const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: usize,
    pub total_minutes: i64,
    pub avg_mood_before: f64,
    pub avg_mood_after: f64,
    pub mood_improvement: f64,
    pub chart_data: Vec<DailyPractice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct DailyPractice {
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub sessions: usize,
    pub minutes: i64,
}

/// Round half up to one decimal place, the way the web client displays it.
fn round_tenth(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

impl SessionStats {
    /// Aggregate samples. A missing mood counts as zero in the averages.
    pub fn compute(samples: &[SessionSample]) -> Self {
        let total_sessions = samples.len();
        let total_minutes = samples
            .iter()
            .map(|s| i64::from(s.duration_minutes))
            .sum();

        let (avg_before, avg_after) = if total_sessions == 0 {
            (0.0, 0.0)
        } else {
            let n = total_sessions as f64;
            let before: i64 = samples.iter().map(|s| i64::from(s.mood_before.unwrap_or(0))).sum();
            let after: i64 = samples.iter().map(|s| i64::from(s.mood_after.unwrap_or(0))).sum();
            (before as f64 / n, after as f64 / n)
        };

        let mut by_day: BTreeMap<NaiveDate, (usize, i64)> = BTreeMap::new();
        for sample in samples {
            let entry = by_day.entry(sample.completed_at.date_naive()).or_default();
            entry.0 += 1;
            entry.1 += i64::from(sample.duration_minutes);
        }

        Self {
            total_sessions,
            total_minutes,
            avg_mood_before: round_tenth(avg_before),
            avg_mood_after: round_tenth(avg_after),
            mood_improvement: round_tenth(avg_after - avg_before),
            chart_data: by_day
                .into_iter()
                .map(|(date, (sessions, minutes))| DailyPractice {
                    date,
                    sessions,
                    minutes,
                })
                .collect(),
        }
    }

    /// `days` is clamped to `0..=MAX_WINDOW_DAYS`.
    pub async fn load(pool: &SqlitePool, user_id: Uuid, days: i64) -> Result<Self, sqlx::Error> {
        let samples =
            SessionSample::find_recent(pool, user_id, days.clamp(0, MAX_WINDOW_DAYS)).await?;
        Ok(Self::compute(&samples))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use db::{
        DBService,
        models::{
            problem::{NewProblem, Problem},
            problem_category::ProblemCategory,
            session::{CreateSession, SessionWithProblem},
            user::User,
        },
    };

    use super::*;

    fn sample(day: u32, hour: u32, minutes: i32, before: Option<i32>, after: Option<i32>) -> SessionSample {
        SessionSample {
            duration_minutes: minutes,
            mood_before: before,
            mood_after: after,
            completed_at: Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_window_is_all_zero() {
        let stats = SessionStats::compute(&[]);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.total_minutes, 0);
        assert_eq!(stats.avg_mood_before, 0.0);
        assert_eq!(stats.mood_improvement, 0.0);
        assert!(stats.chart_data.is_empty());
    }

    #[test]
    fn groups_by_utc_day_in_ascending_order() {
        let stats = SessionStats::compute(&[
            sample(3, 9, 10, Some(4), Some(7)),
            sample(1, 23, 5, Some(3), Some(5)),
            sample(3, 18, 20, Some(5), Some(8)),
        ]);

        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_minutes, 35);
        let days: Vec<_> = stats
            .chart_data
            .iter()
            .map(|d| (d.date.to_string(), d.sessions, d.minutes))
            .collect();
        assert_eq!(
            days,
            vec![
                ("2025-06-01".to_string(), 1, 5),
                ("2025-06-03".to_string(), 2, 30),
            ]
        );
    }

    #[test]
    fn averages_round_to_one_decimal() {
        let stats = SessionStats::compute(&[
            sample(1, 8, 10, Some(3), Some(6)),
            sample(1, 9, 10, Some(4), Some(6)),
            sample(1, 10, 10, Some(4), Some(7)),
        ]);
        // 11/3 = 3.666.., 19/3 = 6.333..
        assert_eq!(stats.avg_mood_before, 3.7);
        assert_eq!(stats.avg_mood_after, 6.3);
        assert_eq!(stats.mood_improvement, 2.7);
    }

    #[test]
    fn missing_moods_count_as_zero() {
        let stats = SessionStats::compute(&[
            sample(2, 8, 10, Some(6), None),
            sample(2, 9, 10, None, None),
        ]);
        assert_eq!(stats.avg_mood_before, 3.0);
        assert_eq!(stats.avg_mood_after, 0.0);
        assert_eq!(stats.mood_improvement, -3.0);
    }

    #[test]
    fn negative_halves_round_up() {
        assert_eq!(round_tenth(-0.25), -0.2);
        assert_eq!(round_tenth(0.25), 0.3);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(SessionStats::compute(&[sample(5, 12, 15, Some(2), Some(4))])).unwrap();
        assert_eq!(json["totalSessions"], 1);
        assert_eq!(json["totalMinutes"], 15);
        assert_eq!(json["moodImprovement"], 2.0);
        assert_eq!(json["chartData"][0]["date"], "2025-06-05");
    }

    #[tokio::test]
    async fn huge_window_is_clamped_instead_of_emptied() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = Uuid::new_v4();
        User::create(&db.pool, user_id, "window@example.com", None)
            .await
            .unwrap();
        let category = ProblemCategory::find_by_name(&db.pool, "Finances")
            .await
            .unwrap()
            .unwrap();
        let problem = Problem::create(
            &db.pool,
            Uuid::new_v4(),
            user_id,
            &NewProblem {
                category_id: category.id,
                title: "Budget".to_string(),
                description: "Bills pile up".to_string(),
                severity: 6,
                is_public: false,
            },
        )
        .await
        .unwrap();
        SessionWithProblem::create(
            &db.pool,
            Uuid::new_v4(),
            user_id,
            &CreateSession {
                problem_id: problem.id,
                affirmations_practiced: vec![],
                duration_minutes: 12,
                mood_before: Some(4),
                mood_after: Some(6),
                notes: None,
            },
        )
        .await
        .unwrap();

        let stats = SessionStats::load(&db.pool, user_id, 100_000_000).await.unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_minutes, 12);

        let stats = SessionStats::load(&db.pool, user_id, -5).await.unwrap();
        assert_eq!(stats.total_sessions, 0);
    }
}
