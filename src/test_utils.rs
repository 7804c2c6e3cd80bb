use crate::config::{AuthConfig, Config};
use crate::database::session::SessionStore;
use crate::database::user::IdentityStore;
use crate::error::app_error::AppError;
use crate::models::identity::{CanonicalIdentity, Provider, TelegramLoginRequest};
use crate::models::session::Session;
use crate::models::user::User;
use crate::service::telegram::data_check_string;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rocket::local::asynchronous::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub const TEST_BOT_TOKEN: &str = "test-bot-token";

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        telegram_bot_token: Some(TEST_BOT_TOKEN.to_string()),
        telegram_max_auth_age_secs: None,
    }
}

pub fn identity(provider: Provider, provider_user_id: &str, name: &str) -> CanonicalIdentity {
    CanonicalIdentity {
        provider,
        provider_user_id: provider_user_id.to_string(),
        email: String::new(),
        name: name.to_string(),
        avatar_url: String::new(),
    }
}

/// Hex HMAC the Telegram widget would attach to `fields` (which must not contain `hash`).
pub fn sign_telegram_fields(fields: &TelegramLoginRequest, bot_token: &str) -> String {
    let check_string = data_check_string(fields).expect("scalar fields");
    let secret_key = Sha256::digest(bot_token.as_bytes());
    let mut mac = Hmac::<Sha256>::new_from_slice(&secret_key).expect("hmac accepts any key length");
    mac.update(check_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn signed_telegram_payload(fields: &[(&str, Value)], bot_token: &str) -> TelegramLoginRequest {
    let mut payload: TelegramLoginRequest = fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    let hash = sign_telegram_fields(&payload, bot_token);
    payload.insert("hash".to_string(), Value::String(hash));
    payload
}

#[derive(Default)]
struct Tables {
    next_user_id: i64,
    users: Vec<User>,
    sessions: HashMap<String, Session>,
}

/// Store used by service tests. The mutex plays the role of the database's
/// row locking and unique constraints.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl InMemoryRepository {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("test store poisoned")
    }

    pub fn user_count(&self) -> usize {
        self.tables().users.len()
    }

    pub fn session_count(&self) -> usize {
        self.tables().sessions.len()
    }

    pub fn has_session(&self, token: &str) -> bool {
        self.tables().sessions.contains_key(token)
    }
}

#[async_trait::async_trait]
impl IdentityStore for InMemoryRepository {
    async fn upsert_user(&self, identity: &CanonicalIdentity, now: DateTime<Utc>) -> Result<User, AppError> {
        let mut tables = self.tables();
        let provider = identity.provider.as_str();

        if let Some(user) = tables
            .users
            .iter_mut()
            .find(|u| u.auth_provider == provider && u.provider_user_id == identity.provider_user_id)
        {
            user.name = identity.name.clone();
            user.avatar_url = identity.avatar_url.clone();
            user.last_login = now;
            return Ok(user.clone());
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            email: identity.email.clone(),
            name: identity.name.clone(),
            avatar_url: identity.avatar_url.clone(),
            auth_provider: provider.to_string(),
            provider_user_id: identity.provider_user_id.clone(),
            last_login: now,
            created_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemoryRepository {
    async fn create_session(&self, user_id: i64, token: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<Session, AppError> {
        self.delete_expired_sessions_for_user(user_id, now).await?;

        let mut tables = self.tables();
        if tables.sessions.contains_key(token) {
            return Err(AppError::store_message("duplicate session token"));
        }
        let session = Session {
            session_token: token.to_string(),
            user_id,
            expires_at,
        };
        tables.sessions.insert(token.to_string(), session.clone());
        Ok(session)
    }

    async fn get_session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>, AppError> {
        let tables = self.tables();
        let user = tables
            .sessions
            .get(token)
            .filter(|s| s.expires_at > now)
            .and_then(|s| tables.users.iter().find(|u| u.id == s.user_id))
            .cloned();
        Ok(user)
    }

    async fn delete_session_if_expired(&self, token: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut tables = self.tables();
        if tables.sessions.get(token).is_some_and(|s| s.expires_at <= now) {
            tables.sessions.remove(token);
        }
        Ok(())
    }

    async fn delete_expired_sessions_for_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<(), AppError> {
        self.tables().sessions.retain(|_, s| s.user_id != user_id || s.expires_at > now);
        Ok(())
    }
}

/// Local client over the full route table with a lazily connected pool, so
/// routes that never reach the store can be exercised without PostgreSQL.
pub async fn test_client(bot_token: Option<&str>) -> Client {
    let mut config = Config::default();
    config.auth.telegram_bot_token = bot_token.map(str::to_string);

    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database.url.clone());
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(&url)
        .expect("valid database url");

    let rocket = crate::assemble(config).expect("valid rocket config").manage(pool);
    Client::tracked(rocket).await.expect("valid rocket instance")
}
