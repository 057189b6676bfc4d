use axum::{
    Extension, Json,
    extract::{Query, State},
};
use std::sync::Arc;

use super::observability::FeedServed;
use super::{ApiError, ApiResponse, AppState, FeedQuery};
use crate::domain::UserContext;
use crate::services::FeedPage;

/// `GET /api/feed`
///
/// Serves a slice of the upstream page the user's session points at.
/// `advance=true` serves the next upstream page and moves the session there once
/// that page has items.
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Query(query): Query<FeedQuery>,
) -> Result<(Extension<FeedServed>, Json<ApiResponse<FeedPage>>), ApiError> {
    let page = state.shared.feed.search(&user, query.into()).await?;
    let served = FeedServed {
        session_id: page.session_id,
        from_cache: page.from_cache,
    };
    Ok((Extension(served), Json(ApiResponse::success(page))))
}
