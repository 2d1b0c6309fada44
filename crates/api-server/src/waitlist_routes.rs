//! Waitlist signup.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{ApiError, AppState};

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
}

pub fn waitlist_routes() -> Router<AppState> {
    Router::new().route("/api/waitlist", post(signup))
}

fn validate_email(email: &Option<String>) -> Result<String, ApiError> {
    let email = email.as_deref().map(str::trim).unwrap_or("").to_lowercase();
    let well_formed = email.len() >= 3
        && email.contains('@')
        && !email.starts_with('@')
        && !email.ends_with('@');
    if well_formed {
        Ok(email)
    } else {
        Err(ApiError::BadRequest("a valid email is required".to_string()))
    }
}

async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = validate_email(&request.email)?;
    let created = state.waitlist.add(&email).await?;
    Ok(Json(json!({ "email": email, "created": created })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert_eq!(
            validate_email(&Some(" User@Example.com ".to_string())).unwrap(),
            "user@example.com"
        );
        assert!(validate_email(&Some("@example.com".to_string())).is_err());
        assert!(validate_email(&Some("no-at-sign".to_string())).is_err());
        assert!(validate_email(&None).is_err());
    }
}
