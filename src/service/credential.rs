use crate::config::AuthConfig;
use crate::error::app_error::AppError;
use crate::models::identity::{CanonicalIdentity, GoogleClaims, GoogleLoginRequest, Provider, TelegramLoginRequest, VkLoginRequest};
use crate::service::telegram;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// An inbound proof of identity, one variant per provider.
#[derive(Debug, Clone)]
pub enum Credential {
    Telegram(TelegramLoginRequest),
    Google(GoogleLoginRequest),
    Vk(VkLoginRequest),
}

impl Credential {
    pub fn provider(&self) -> Provider {
        match self {
            Credential::Telegram(_) => Provider::Telegram,
            Credential::Google(_) => Provider::Google,
            Credential::Vk(_) => Provider::Vk,
        }
    }

    /// Interprets a raw JSON body as the credential of `provider`.
    pub fn from_json(provider: Provider, body: Value) -> Result<Self, AppError> {
        let invalid = |e: serde_json::Error| AppError::malformed(format!("Invalid {} payload: {}", provider, e));
        Ok(match provider {
            Provider::Telegram => Credential::Telegram(serde_json::from_value(body).map_err(invalid)?),
            Provider::Google => Credential::Google(serde_json::from_value(body).map_err(invalid)?),
            Provider::Vk => Credential::Vk(serde_json::from_value(body).map_err(invalid)?),
        })
    }

    pub fn verify(&self, config: &AuthConfig, now: DateTime<Utc>) -> Result<CanonicalIdentity, AppError> {
        match self {
            Credential::Telegram(fields) => telegram::verify(fields, config, now),
            Credential::Google(request) => verify_google(request),
            Credential::Vk(request) => verify_vk(request),
        }
    }
}

/// Reads the claims of a Google ID token.
///
/// Only the payload segment is decoded. The signature, `aud`, `iss` and `exp`
/// are NOT checked against Google's published keys, so this flow trusts
/// whoever delivered the token.
fn verify_google(request: &GoogleLoginRequest) -> Result<CanonicalIdentity, AppError> {
    let segments: Vec<&str> = request.credential.trim().split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(AppError::malformed("Google credential must have three segments"));
    };

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| AppError::malformed("Google credential payload is not base64url"))?;
    let claims: GoogleClaims =
        serde_json::from_slice(&decoded).map_err(|e| AppError::malformed(format!("Google credential payload is not valid JSON: {}", e)))?;

    let sub = claims
        .sub
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| AppError::malformed("Missing sub claim"))?;

    Ok(CanonicalIdentity {
        provider: Provider::Google,
        provider_user_id: sub,
        email: claims.email.unwrap_or_default(),
        name: claims.name.unwrap_or_default(),
        avatar_url: claims.picture.unwrap_or_default(),
    })
}

// No integrity check: the VK payload is trusted as delivered.
fn verify_vk(request: &VkLoginRequest) -> Result<CanonicalIdentity, AppError> {
    let provider_user_id = numeric_id(&request.uid).ok_or_else(|| AppError::malformed("VK uid must be numeric"))?;

    Ok(CanonicalIdentity {
        provider: Provider::Vk,
        provider_user_id,
        email: String::new(),
        name: display_name(request.first_name.as_deref(), request.last_name.as_deref()),
        avatar_url: request.photo.clone().unwrap_or_default(),
    })
}

/// Renders an integer id, accepting both JSON numbers and digit strings.
pub(crate) fn numeric_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => Some(s.clone()),
        _ => None,
    }
}

pub(crate) fn display_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default()).trim().to_string()
}
