use axum::{extract::State, Json};

use crate::{catalog::Product, ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/catalog",
    responses(
        (status = 200, description = "Menu sorted by product name", body = ApiResponse<Vec<Product>>),
    ),
    tag = "catalog"
)]
pub async fn list_products(State(state): State<AppState>) -> Json<ApiResponse<Vec<Product>>> {
    Json(ApiResponse::success(state.catalog.products()))
}
