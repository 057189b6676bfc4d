use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::domain::UserContext;
use crate::services::MaintenanceRun;

/// `POST /api/maintenance/refresh`
///
/// Re-checks the caller's stale saved items inline. The batch cap keeps the
/// request bounded, so this does not go through the job queue.
pub async fn refresh_now(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<ApiResponse<MaintenanceRun>>, ApiError> {
    let run = state.shared.freshness.refresh_user(&user).await?;
    Ok(Json(ApiResponse::success(run)))
}
