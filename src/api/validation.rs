use super::ApiError;

const MAX_USER_ID_LENGTH: usize = 128;

/// Checks the identity forwarded by the authentication layer.
pub fn validate_user_id(raw: &str) -> Result<&str, ApiError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ApiError::Unauthorized("Missing user identity".to_string()));
    }

    if trimmed.len() > MAX_USER_ID_LENGTH {
        return Err(ApiError::validation(format!(
            "User id must be {MAX_USER_ID_LENGTH} characters or less"
        )));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '|'))
    {
        return Err(ApiError::validation("User id contains invalid characters"));
    }

    Ok(trimmed)
}
