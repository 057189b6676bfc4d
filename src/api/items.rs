use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ActiveItemsResponse, ApiError, ApiResponse, AppState};
use crate::domain::UserContext;

/// `GET /api/items/active`
pub async fn list_active_items(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<ApiResponse<ActiveItemsResponse>>, ApiError> {
    let items = state.shared.wishlists.list_active_items(&user).await?;
    let total = items.len();
    Ok(Json(ApiResponse::success(ActiveItemsResponse {
        items,
        total,
    })))
}
