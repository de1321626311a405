use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    errors::ServiceError,
    services::users::{RegisterUserRequest, ResetPasswordRequest, UserProfile},
    session::Session,
    ApiResponse, AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Registered email or phone number.
    #[validate(length(min = 1, message = "Email or phone is required"))]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Send back in the `x-session-token` header.
    pub token: String,
    pub user: UserProfile,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid input or email already registered", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ServiceError> {
    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 404, description = "Invalid login credentials", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ServiceError> {
    request.validate()?;
    let user = state
        .services
        .users
        .authenticate(&request.identifier, &request.password)
        .await?;
    let session = state.sessions.create(user);
    Ok(Json(ApiResponse::success(LoginResponse {
        token: session.token,
        user: session.user,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, Session(session): Session) -> StatusCode {
    state.sessions.remove(&session.token);
    info!(user_id = %session.user.id, "Session closed");
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = ApiResponse<String>),
        (status = 400, description = "Passwords do not match or are too short", body = crate::errors::ErrorResponse),
        (status = 404, description = "Email is not registered", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<String>>, ServiceError> {
    state.services.users.reset_password(request).await?;
    Ok(Json(ApiResponse::success(
        "Password updated successfully".to_string(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Profile of the logged-in user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Json<ApiResponse<UserProfile>>, ServiceError> {
    let user = state.services.users.get_user(session.user.id).await?;
    Ok(Json(ApiResponse::success(user)))
}
