use axum::{
    Router,
    body::Bytes,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    affirmation::{Affirmation, FavoriteAffirmation},
    problem::Problem,
};
use serde::Deserialize;
use services::services::affirmations::PersonalizationPreferences;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{
    error::ApiError,
    extract::Path,
    middleware::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Default, Deserialize, TS)]
pub struct GenerateAffirmationRequest {
    #[serde(default)]
    pub preferences: PersonalizationPreferences,
}

impl GenerateAffirmationRequest {
    /// The body is optional; an empty one means default preferences.
    fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let axum::Json(request) = axum::Json::<Self>::from_bytes(body)?;
        Ok(request)
    }
}

async fn owned_problem(state: &AppState, problem_id: Uuid, user_id: Uuid) -> Result<Problem, ApiError> {
    Problem::find_for_user(&state.db().pool, problem_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))
}

/// GET /api/affirmations/problem/{problem_id}
pub async fn get_problem_affirmations(
    State(state): State<AppState>,
    user: AuthUser,
    Path(problem_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Affirmation>>>, ApiError> {
    owned_problem(&state, problem_id, user.id).await?;
    let affirmations = Affirmation::find_by_problem_id(&state.db().pool, problem_id).await?;
    Ok(ResponseJson(ApiResponse::success(affirmations)))
}

/// GET /api/affirmations/favorites
pub async fn get_favorites(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<FavoriteAffirmation>>>, ApiError> {
    let favorites = FavoriteAffirmation::find_by_user(&state.db().pool, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(favorites)))
}

/// PUT /api/affirmations/{id}/favorite
pub async fn toggle_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Affirmation>>, ApiError> {
    let pool = &state.db().pool;
    let affirmation = Affirmation::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Affirmation not found".to_string()))?;

    let problem = Problem::find_by_id(pool, affirmation.problem_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Affirmation not found".to_string()))?;
    if problem.user_id != user.id {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    let updated = Affirmation::set_favorite(pool, id, !affirmation.is_favorite).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// POST /api/affirmations/problem/{problem_id}/generate
/// Generate one more affirmation in the requested tone and length
pub async fn generate_affirmation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(problem_id): Path<Uuid>,
    body: Bytes,
) -> Result<ResponseJson<ApiResponse<Affirmation>>, ApiError> {
    let request = GenerateAffirmationRequest::from_body(&body)?;

    let affirmation = state
        .problem_service()
        .generate_personalized(user.id, problem_id, &request.preferences)
        .await?;

    info!(
        problem_id = %problem_id,
        user_id = %user.id,
        tone = %request.preferences.tone,
        length = %request.preferences.length,
        "Generated personalized affirmation"
    );
    Ok(ResponseJson(ApiResponse::success(affirmation)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/affirmations",
        Router::new()
            .route("/favorites", get(get_favorites))
            .route("/problem/{problem_id}", get(get_problem_affirmations))
            .route("/problem/{problem_id}/generate", post(generate_affirmation))
            .route("/{id}/favorite", put(toggle_favorite)),
    )
}
