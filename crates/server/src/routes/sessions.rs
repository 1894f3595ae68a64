use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::{
    problem::Problem,
    session::{CreateSession, SessionFilter, SessionWithProblem, UpdateSession},
};
use serde::Deserialize;
use services::services::session_stats::{DEFAULT_WINDOW_DAYS, SessionStats};
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{
    error::ApiError,
    extract::{Json, Path, Query},
    middleware::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Deserialize, TS)]
pub struct CreateSessionRequest {
    pub problem_id: Option<Uuid>,
    #[serde(default)]
    pub affirmations_practiced: Vec<String>,
    #[serde(default)]
    pub duration_minutes: i32,
    pub mood_before: Option<i32>,
    pub mood_after: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub problem_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<SessionWithProblem>>), ApiError> {
    let problem_id = payload
        .problem_id
        .ok_or_else(|| ApiError::BadRequest("Problem ID is required".to_string()))?;

    let pool = &state.db().pool;
    Problem::find_for_user(pool, problem_id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    let data = CreateSession {
        problem_id,
        affirmations_practiced: payload.affirmations_practiced,
        duration_minutes: payload.duration_minutes,
        mood_before: payload.mood_before,
        mood_after: payload.mood_after,
        notes: payload.notes,
    };
    let session = SessionWithProblem::create(pool, Uuid::new_v4(), user.id, &data).await?;

    info!(
        session_id = %session.session.id,
        problem_id = %problem_id,
        duration_minutes = data.duration_minutes,
        "Recorded practice session"
    );
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(session)),
    ))
}

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListSessionsQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<SessionWithProblem>>>, ApiError> {
    let defaults = SessionFilter::default();
    let filter = SessionFilter {
        problem_id: query.problem_id,
        limit: query.limit.unwrap_or(defaults.limit).max(0),
        offset: query.offset.unwrap_or(defaults.offset).max(0),
    };
    let sessions = SessionWithProblem::find_by_user(&state.db().pool, user.id, filter).await?;
    Ok(ResponseJson(ApiResponse::success(sessions)))
}

/// GET /api/sessions/stats
pub async fn get_session_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<ResponseJson<ApiResponse<SessionStats>>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    let stats = SessionStats::load(&state.db().pool, user.id, days).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

/// PUT /api/sessions/{id}
pub async fn update_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSession>,
) -> Result<ResponseJson<ApiResponse<SessionWithProblem>>, ApiError> {
    let session = SessionWithProblem::update(&state.db().pool, id, user.id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/sessions",
        Router::new()
            .route("/", get(list_sessions).post(create_session))
            .route("/stats", get(get_session_stats))
            .route("/{id}", put(update_session)),
    )
}
