use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::identity::CanonicalIdentity;
use crate::models::user::User;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait IdentityStore {
    /// Inserts the identity or, when `(provider, provider_user_id)` already
    /// exists, refreshes name, avatar and last login. Email and id never change.
    async fn upsert_user(&self, identity: &CanonicalIdentity, now: DateTime<Utc>) -> Result<User, AppError>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
}

#[async_trait::async_trait]
impl IdentityStore for PostgresRepository {
    async fn upsert_user(&self, identity: &CanonicalIdentity, now: DateTime<Utc>) -> Result<User, AppError> {
        // The unique constraint arbitrates concurrent first logins.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, avatar_url, auth_provider, provider_user_id, last_login, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (auth_provider, provider_user_id) DO UPDATE
            SET name = EXCLUDED.name,
                avatar_url = EXCLUDED.avatar_url,
                last_login = EXCLUDED.last_login
            RETURNING id, email, name, avatar_url, auth_provider, provider_user_id, last_login, created_at
            "#,
        )
        .bind(&identity.email)
        .bind(&identity.name)
        .bind(&identity.avatar_url)
        .bind(identity.provider.as_str())
        .bind(&identity.provider_user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::store("Failed to upsert user", e))?;

        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, avatar_url, auth_provider, provider_user_id, last_login, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::store("Failed to fetch user", e))?;

        Ok(user)
    }
}
