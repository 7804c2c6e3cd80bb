use crate::models::identity::Provider;
use chrono::{DateTime, Utc};
use rocket::serde::Serialize;
use schemars::JsonSchema;

/// Stored user row. `(auth_provider, provider_user_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub auth_provider: String,
    pub provider_user_id: String,
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn provider(&self) -> Option<Provider> {
        self.auth_provider.parse().ok()
    }
}

/// Public projection of a user returned to API clients.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar_url.clone(),
        }
    }
}
