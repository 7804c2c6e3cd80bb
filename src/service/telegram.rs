use crate::config::AuthConfig;
use crate::error::app_error::AppError;
use crate::models::identity::{CanonicalIdentity, Provider, TelegramLoginRequest};
use crate::service::credential::{display_name, numeric_id};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const HASH_FIELD: &str = "hash";

/// Checks a Telegram login widget payload and extracts the identity.
///
/// The widget signs every field except `hash` with
/// `HMAC-SHA256(key = SHA256(bot_token), data = data_check_string)`.
/// Without a configured bot token every attempt is rejected.
pub fn verify(fields: &TelegramLoginRequest, config: &AuthConfig, now: DateTime<Utc>) -> Result<CanonicalIdentity, AppError> {
    let bot_token = config
        .telegram_bot_token()
        .ok_or_else(|| AppError::ConfigurationMissing("Telegram bot token".to_string()))?;

    let mut fields = fields.clone();
    let supplied_hash = match fields.remove(HASH_FIELD) {
        Some(Value::String(hash)) => hash,
        Some(_) => return Err(AppError::malformed("Telegram hash must be a string")),
        None => return Err(AppError::malformed("Missing Telegram hash")),
    };

    let check_string = data_check_string(&fields)?;
    check_hash(&check_string, &supplied_hash, bot_token)?;

    if let Some(max_age) = config.telegram_max_auth_age_secs {
        check_auth_date(&fields, max_age, now)?;
    }

    let provider_user_id = fields
        .get("id")
        .and_then(numeric_id)
        .ok_or_else(|| AppError::malformed("Missing Telegram user id"))?;

    Ok(CanonicalIdentity {
        provider: Provider::Telegram,
        provider_user_id,
        email: String::new(),
        name: display_name(str_field(&fields, "first_name"), str_field(&fields, "last_name")),
        avatar_url: str_field(&fields, "photo_url").unwrap_or_default().to_string(),
    })
}

/// Sorted `key=value` lines joined by `\n`. Null fields are left out, the way
/// the widget omits absent profile fields.
pub(crate) fn data_check_string(fields: &TelegramLoginRequest) -> Result<String, AppError> {
    let mut lines = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        // The widget only sends strings and integers; booleans render as `true`/`false`.
        let rendered = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(AppError::malformed(format!("Telegram field '{}' must be a scalar", key)));
            }
        };
        lines.push(format!("{}={}", key, rendered));
    }
    Ok(lines.join("\n"))
}

fn check_hash(check_string: &str, supplied_hash: &str, bot_token: &str) -> Result<(), AppError> {
    let rejected = || AppError::verification("Invalid Telegram auth data");

    // Hex case and surrounding whitespace are normalized away; the decoded
    // digest bytes are what gets compared.
    let expected = hex::decode(supplied_hash.trim()).map_err(|_| rejected())?;
    let secret_key = Sha256::digest(bot_token.as_bytes());
    let mut mac = HmacSha256::new_from_slice(&secret_key).map_err(|_| rejected())?;
    mac.update(check_string.as_bytes());

    // verify_slice compares in constant time
    mac.verify_slice(&expected).map_err(|_| {
        debug!("Telegram hash mismatch");
        rejected()
    })
}

fn check_auth_date(fields: &TelegramLoginRequest, max_age_secs: u64, now: DateTime<Utc>) -> Result<(), AppError> {
    let auth_date = fields
        .get("auth_date")
        .and_then(numeric_id)
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| AppError::malformed("Missing Telegram auth_date"))?;

    let skew = now.timestamp().saturating_sub(auth_date).unsigned_abs();
    if skew > max_age_secs {
        return Err(AppError::verification("Telegram auth data expired"));
    }
    Ok(())
}

fn str_field<'a>(fields: &'a TelegramLoginRequest, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}
