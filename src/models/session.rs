use crate::models::user::UserResponse;
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub session_token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Successful login: the user plus a fresh bearer token.
#[derive(Debug, Serialize, JsonSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SessionUserResponse {
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VerifySessionRequest {
    #[serde(default)]
    pub token: Option<String>,
}
