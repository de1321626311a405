use axum::{extract::State, Json};

use crate::{
    errors::ServiceError, services::archival::HistoryResponse, session::Session, ApiResponse,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/history",
    responses(
        (status = 200, description = "Paid and archived orders, most recent first", body = ApiResponse<Vec<HistoryResponse>>),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse),
    ),
    tag = "history"
)]
pub async fn list_history(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Json<ApiResponse<Vec<HistoryResponse>>>, ServiceError> {
    let rows = state.services.history.list_history(session.user.id).await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(HistoryResponse::from).collect(),
    )))
}
