use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{UpdateProfile, User};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use ts_rs::TS;
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{
    error::ApiError,
    extract::Json,
    middleware::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Deserialize, TS)]
pub struct SignUpRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize, TS)]
pub struct SignUpResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, TS)]
pub struct SignInResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
}

fn credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String), ApiError> {
    let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
    let password = password.filter(|p| !p.is_empty());
    match (email, password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        )),
    }
}

/// POST /api/auth/signup
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<SignUpResponse>>), ApiError> {
    let (email, password) = credentials(payload.email, payload.password)?;
    let full_name = payload.full_name.filter(|n| !n.trim().is_empty());

    let account = state
        .auth()
        .create_user(&email, &password, full_name.as_deref())
        .await?;

    // The account exists on the platform either way; a missing profile row is recoverable.
    if let Err(e) = User::create(&state.db().pool, account.id, &email, full_name.as_deref()).await {
        error!(user_id = %account.id, error = %e, "Failed to create user profile");
    }

    info!(user_id = %account.id, "User signed up");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success_with_message(
            SignUpResponse {
                id: account.id,
                email,
                full_name,
            },
            "User created successfully",
        )),
    ))
}

/// POST /api/auth/signin
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<ResponseJson<ApiResponse<SignInResponse>>, ApiError> {
    let (email, password) = credentials(payload.email, payload.password)?;
    let session = state.auth().sign_in_with_password(&email, &password).await?;

    Ok(ResponseJson(ApiResponse::success(SignInResponse {
        id: session.user.id,
        email: session.user.email,
        access_token: session.access_token,
        refresh_token: session.refresh_token,
    })))
}

/// GET /api/auth/profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let profile = User::find_by_id(&state.db().pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfile>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let profile = User::update_profile(&state.db().pool, user.id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

/// POST /api/auth/signout
///
/// Tokens are held by the client and expire on their own; nothing is revoked here.
pub async fn sign_out(user: AuthUser) -> ResponseJson<ApiResponse<()>> {
    info!(user_id = %user.id, "User signed out");
    ResponseJson(ApiResponse::success_with_message(
        (),
        "Signed out successfully",
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/signup", post(sign_up))
            .route("/signin", post(sign_in))
            .route("/signout", post(sign_out))
            .route("/profile", get(get_profile).put(update_profile)),
    )
}
