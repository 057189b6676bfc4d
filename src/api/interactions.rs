use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, InteractionReceipt};
use crate::domain::UserContext;
use crate::services::InteractionBatch;

/// `POST /api/interactions`
///
/// Records a batch of swipes and returns how many were stored.
pub async fn record_interactions(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(batch): Json<InteractionBatch>,
) -> Result<Json<ApiResponse<InteractionReceipt>>, ApiError> {
    let recorded = state.shared.interactions.record_batch(&user, batch).await?;
    Ok(Json(ApiResponse::success(InteractionReceipt { recorded })))
}
