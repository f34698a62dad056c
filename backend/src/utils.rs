use rocket::serde::json::{self, Json};
use uuid::Uuid;
use crate::error::ApiError;

pub fn parse_user_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::Validation("Invalid user ID".into()))
}

/// Unwraps a JSON body, turning malformed input into a 400 instead of Rocket's 422.
pub fn parse_json<T>(body: Result<Json<T>, json::Error<'_>>) -> Result<T, ApiError> {
    body.map(Json::into_inner)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_user_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_user_id("not-a-uuid"), Err(ApiError::Validation(_))));
    }
}
