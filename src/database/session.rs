use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::session::Session;
use crate::models::user::User;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

pub const SESSION_TOKEN_BYTES: usize = 32;
pub const SESSION_TTL_DAYS: i64 = 30;

/// Generates an opaque bearer token: 32 CSPRNG bytes, base64url without padding.
pub fn generate_session_token() -> String {
    let mut token_bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut token_bytes);
    URL_SAFE_NO_PAD.encode(token_bytes)
}

pub fn session_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(SESSION_TTL_DAYS)
}

#[async_trait::async_trait]
pub trait SessionStore {
    async fn create_session(&self, user_id: i64, token: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<Session, AppError>;
    /// Resolves a token to its owner if the session is still live at `now`.
    async fn get_session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>, AppError>;
    async fn delete_session_if_expired(&self, token: &str, now: DateTime<Utc>) -> Result<(), AppError>;
    async fn delete_expired_sessions_for_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<(), AppError>;
}

#[async_trait::async_trait]
impl SessionStore for PostgresRepository {
    async fn create_session(&self, user_id: i64, token: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<Session, AppError> {
        self.delete_expired_sessions_for_user(user_id, now).await?;

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO user_sessions (user_id, session_token, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING session_token, user_id, expires_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::store("Failed to create session", e))?;

        Ok(session)
    }

    async fn get_session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.name, u.avatar_url, u.auth_provider, u.provider_user_id, u.last_login, u.created_at
            FROM user_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.session_token = $1
              AND s.expires_at > $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::store("Failed to look up session", e))?;

        Ok(user)
    }

    async fn delete_session_if_expired(&self, token: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_sessions WHERE session_token = $1 AND expires_at <= $2")
            .bind(token)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store("Failed to purge expired session", e))?;

        Ok(())
    }

    async fn delete_expired_sessions_for_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_sessions WHERE user_id = $1 AND expires_at <= $2")
            .bind(user_id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store("Failed to purge expired sessions", e))?;

        Ok(())
    }
}
