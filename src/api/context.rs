use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::ApiError;
use super::validation::validate_user_id;
use crate::domain::UserContext;

/// Header carrying the identity asserted by the authentication proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing user identity".to_string()))?
            .to_str()
            .map_err(|_| ApiError::validation("User id header is not valid text"))?;

        let user_id = validate_user_id(raw)?;
        tracing::Span::current().record("user_id", user_id);

        Ok(Self::new(user_id))
    }
}
