use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// External identity provider. The string tag is what gets stored in
/// `users.auth_provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Telegram,
    Google,
    Vk,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Telegram, Provider::Google, Provider::Vk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Telegram => "telegram",
            Provider::Google => "google",
            Provider::Vk => "vk",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider '{}'", self.0)
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// Normalized identity produced by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalIdentity {
    pub provider: Provider,
    pub provider_user_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
}

/// Fields posted by the Telegram login widget, `hash` included.
pub type TelegramLoginRequest = BTreeMap<String, Value>;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GoogleLoginRequest {
    /// Compact ID token (`header.payload.signature`).
    pub credential: String,
}

/// Profile fields posted by the VK Open API widget.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VkLoginRequest {
    #[serde(alias = "id")]
    pub uid: Value,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

/// Claims read from a Google ID token payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_tags_round_trip() {
        for provider in Provider::ALL {
            assert_eq!(provider.as_str().parse::<Provider>(), Ok(provider));
        }
    }

    #[test]
    fn provider_parse_ignores_case() {
        assert_eq!("Telegram".parse::<Provider>(), Ok(Provider::Telegram));
        assert_eq!("VK".parse::<Provider>(), Ok(Provider::Vk));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert_eq!("github".parse::<Provider>(), Err(UnknownProvider("github".to_string())));
    }

    #[test]
    fn vk_request_accepts_id_alias() {
        let request: VkLoginRequest = serde_json::from_str(r#"{"id": 7, "first_name": "Ivan"}"#).unwrap();
        assert_eq!(request.uid, Value::from(7));
        assert_eq!(request.first_name.as_deref(), Some("Ivan"));
        assert!(request.photo.is_none());
    }
}
