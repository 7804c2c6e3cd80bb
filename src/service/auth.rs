use crate::config::AuthConfig;
use crate::database::session::{SessionStore, generate_session_token, session_expiry};
use crate::database::user::IdentityStore;
use crate::error::app_error::AppError;
use crate::models::session::{AuthResponse, Session};
use crate::models::user::User;
use crate::service::credential::Credential;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Login and session checks over any store implementing both store traits.
pub struct AuthService<'a, R> {
    pub repo: &'a R,
    pub config: &'a AuthConfig,
}

impl<'a, R> AuthService<'a, R>
where
    R: IdentityStore + SessionStore + Sync,
{
    pub fn new(repo: &'a R, config: &'a AuthConfig) -> Self {
        Self { repo, config }
    }

    pub async fn login(&self, credential: &Credential) -> Result<AuthResponse, AppError> {
        self.login_at(credential, Utc::now()).await
    }

    /// Verifies the credential, reconciles the user and issues a session.
    /// Nothing is written when verification fails.
    pub async fn login_at(&self, credential: &Credential, now: DateTime<Utc>) -> Result<AuthResponse, AppError> {
        let identity = credential.verify(self.config, now).inspect_err(|e| {
            warn!(provider = %credential.provider(), code = e.code(), "credential rejected");
        })?;

        let user = self.repo.upsert_user(&identity, now).await?;
        let session = self.issue_session(user.id, now).await?;

        info!(user_id = user.id, provider = %identity.provider, expires_at = %session.expires_at, "login succeeded");

        Ok(AuthResponse {
            user: (&user).into(),
            token: session.session_token,
        })
    }

    pub async fn issue_session(&self, user_id: i64, now: DateTime<Utc>) -> Result<Session, AppError> {
        let token = generate_session_token();
        self.repo.create_session(user_id, &token, session_expiry(now), now).await
    }

    pub async fn verify_session(&self, token: Option<&str>) -> Result<User, AppError> {
        self.verify_session_at(token, Utc::now()).await
    }

    /// Resolves a bearer token to its user. An absent token and an unknown or
    /// expired one are reported as different errors.
    pub async fn verify_session_at(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<User, AppError> {
        let token = token.filter(|t| !t.trim().is_empty()).ok_or(AppError::MissingToken)?;

        match self.repo.get_session_user(token, now).await? {
            Some(user) => Ok(user),
            None => {
                if let Err(e) = self.repo.delete_session_if_expired(token, now).await {
                    warn!(error = ?e, "failed to purge expired session");
                }
                Err(AppError::SessionNotFound)
            }
        }
    }
}
