use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    problem::{
        DEFAULT_SEVERITY, NewProblem, Problem, ProblemFilter, ProblemWithCategory,
        ProblemWithDetails, UpdateProblem,
    },
    problem_category::ProblemCategory,
};
use serde::Deserialize;
use services::services::problems::CreatedProblem;
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

const SEVERITY_RANGE: std::ops::RangeInclusive<i32> = 1..=10;

#[derive(Debug, Deserialize, TS)]
pub struct CreateProblemRequest {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<i32>,
    pub is_public: Option<bool>,
}

impl CreateProblemRequest {
    fn validate(self) -> Result<NewProblem, ApiError> {
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let (Some(category_id), Some(title), Some(description)) =
            (self.category_id, title, description)
        else {
            return Err(ApiError::BadRequest(
                "Category, title, and description are required".to_string(),
            ));
        };

        let severity = self.severity.unwrap_or(DEFAULT_SEVERITY);
        check_severity(severity)?;

        Ok(NewProblem {
            category_id,
            title,
            description,
            severity,
            is_public: self.is_public.unwrap_or(false),
        })
    }
}

fn check_severity(severity: i32) -> Result<(), ApiError> {
    if SEVERITY_RANGE.contains(&severity) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Severity must be between 1 and 10".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct ListProblemsQuery {
    pub category_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ListProblemsQuery> for ProblemFilter {
    fn from(query: ListProblemsQuery) -> Self {
        let defaults = ProblemFilter::default();
        ProblemFilter {
            category_id: query.category_id,
            limit: query.limit.unwrap_or(defaults.limit).max(0),
            offset: query.offset.unwrap_or(defaults.offset).max(0),
        }
    }
}

/// GET /api/problems/categories
pub async fn get_categories(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<ProblemCategory>>>, ApiError> {
    let categories = ProblemCategory::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(categories)))
}

/// POST /api/problems
/// Create a problem and generate its affirmations
pub async fn create_problem(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProblemRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<CreatedProblem>>), ApiError> {
    let data = payload.validate()?;
    let created = state
        .problem_service()
        .create_with_affirmations(user.id, data)
        .await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(created)),
    ))
}

/// GET /api/problems
pub async fn list_problems(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListProblemsQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ProblemWithDetails>>>, ApiError> {
    let problems =
        ProblemWithDetails::find_by_user(&state.db().pool, user.id, query.into()).await?;
    Ok(ResponseJson(ApiResponse::success(problems)))
}

/// GET /api/problems/{id}
pub async fn get_problem(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProblemWithDetails>>, ApiError> {
    let problem = ProblemWithDetails::find_for_user(&state.db().pool, id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(problem)))
}

/// PUT /api/problems/{id}
pub async fn update_problem(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProblem>,
) -> Result<ResponseJson<ApiResponse<ProblemWithCategory>>, ApiError> {
    if let Some(severity) = payload.severity {
        check_severity(severity)?;
    }

    let pool = &state.db().pool;
    Problem::update(pool, id, user.id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;
    let problem = ProblemWithCategory::find_for_user(pool, id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    Ok(ResponseJson(ApiResponse::success(problem)))
}

/// DELETE /api/problems/{id}
/// Affirmations and sessions of the problem go with it
pub async fn delete_problem(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Problem::delete(&state.db().pool, id, user.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Problem not found".to_string()));
    }

    info!(problem_id = %id, user_id = %user.id, "Deleted problem");
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Problem deleted successfully",
    )))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/problems",
        Router::new()
            .route("/", get(list_problems).post(create_problem))
            .route("/categories", get(get_categories))
            .route(
                "/{id}",
                get(get_problem).put(update_problem).delete(delete_problem),
            ),
    )
}
