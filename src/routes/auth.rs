use crate::auth::CurrentUser;
use crate::config::Config;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::identity::{GoogleLoginRequest, Provider, TelegramLoginRequest, VkLoginRequest};
use crate::models::session::{AuthResponse, SessionUserResponse, VerifySessionRequest};
use crate::service::auth::AuthService;
use crate::service::credential::Credential;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

const VERIFY_ACTION: &str = "verify";

async fn login(pool: &PgPool, config: &Config, credential: Credential) -> Result<AuthResponse, AppError> {
    let repo = PostgresRepository { pool: pool.clone() };
    AuthService::new(&repo, &config.auth).login(&credential).await
}

async fn check_session(pool: &PgPool, config: &Config, token: Option<&str>) -> Result<SessionUserResponse, AppError> {
    let repo = PostgresRepository { pool: pool.clone() };
    let user = AuthService::new(&repo, &config.auth).verify_session(token).await?;
    Ok(SessionUserResponse { user: (&user).into() })
}

/// Log in with Telegram login widget data
///
/// The body is the flat field set posted by the widget, including `hash`.
#[openapi(tag = "Authentication")]
#[post("/telegram", data = "<payload>")]
pub async fn post_telegram(pool: &State<PgPool>, config: &State<Config>, payload: JsonBody<TelegramLoginRequest>) -> Result<Json<AuthResponse>, AppError> {
    login(pool, config, Credential::Telegram(payload.into_inner())).await.map(Json)
}

/// Log in with a Google ID token
#[openapi(tag = "Authentication")]
#[post("/google", data = "<payload>")]
pub async fn post_google(pool: &State<PgPool>, config: &State<Config>, payload: JsonBody<GoogleLoginRequest>) -> Result<Json<AuthResponse>, AppError> {
    login(pool, config, Credential::Google(payload.into_inner())).await.map(Json)
}

/// Log in with a VK profile
#[openapi(tag = "Authentication")]
#[post("/vk", data = "<payload>")]
pub async fn post_vk(pool: &State<PgPool>, config: &State<Config>, payload: JsonBody<VkLoginRequest>) -> Result<Json<AuthResponse>, AppError> {
    login(pool, config, Credential::Vk(payload.into_inner())).await.map(Json)
}

/// Resolve a session token to its user
#[openapi(tag = "Authentication")]
#[post("/verify", data = "<payload>")]
pub async fn post_verify(
    pool: &State<PgPool>,
    config: &State<Config>,
    payload: JsonBody<VerifySessionRequest>,
) -> Result<Json<SessionUserResponse>, AppError> {
    check_session(pool, config, payload.token.as_deref()).await.map(Json)
}

/// Current user for the bearer token in the Authorization header
#[openapi(tag = "Authentication")]
#[get("/me")]
pub async fn get_me(current_user: CurrentUser) -> Json<SessionUserResponse> {
    Json(SessionUserResponse {
        user: (&current_user).into(),
    })
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum ActionResponse {
    Login(AuthResponse),
    Session(SessionUserResponse),
}

/// Single entry point selecting the flow by `action`
///
/// `action` is a provider name or `verify`; the body is what the matching
/// dedicated route expects.
#[openapi(tag = "Authentication")]
#[post("/?<action>", data = "<payload>")]
pub async fn post_action(
    pool: &State<PgPool>,
    config: &State<Config>,
    action: Option<String>,
    payload: JsonBody<Value>,
) -> Result<Json<ActionResponse>, AppError> {
    let action = action.unwrap_or_default();

    if action.eq_ignore_ascii_case(VERIFY_ACTION) {
        let token = payload.get("token").and_then(Value::as_str);
        return check_session(pool, config, token).await.map(|r| Json(ActionResponse::Session(r)));
    }

    let provider: Provider = action.parse().map_err(|_| AppError::UnknownAction(action.clone()))?;
    let credential = Credential::from_json(provider, payload.into_inner())?;
    login(pool, config, credential).await.map(|r| Json(ActionResponse::Login(r)))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![post_telegram, post_google, post_vk, post_verify, get_me, post_action]
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{TEST_BOT_TOKEN, test_client};
    use rocket::http::{ContentType, Header, Status};
    use serde_json::{Value, json};

    async fn post_json(path: &str, body: Value, bot_token: Option<&str>) -> (Status, Value) {
        let client = test_client(bot_token).await;
        let response = client.post(path).header(ContentType::JSON).body(body.to_string()).dispatch().await;
        let status = response.status();
        let body = response.into_json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    #[rocket::async_test]
    async fn verify_without_token_is_bad_request() {
        let (status, body) = post_json("/api/auth/verify", json!({}), None).await;
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["code"], "missing_token");
        assert!(body.get("user").is_none());
    }

    #[rocket::async_test]
    async fn telegram_without_bot_token_is_configuration_error() {
        let payload = json!({"id": 42, "first_name": "Ada", "hash": "00"});
        let (status, body) = post_json("/api/auth/telegram", payload, None).await;
        assert_eq!(status, Status::InternalServerError);
        assert_eq!(body["code"], "configuration_missing");
        assert!(body.get("token").is_none());
    }

    #[rocket::async_test]
    async fn telegram_with_bad_hash_is_unauthorized() {
        let payload = json!({"id": 42, "first_name": "Ada", "hash": "00"});
        let (status, body) = post_json("/api/auth/telegram", payload, Some(TEST_BOT_TOKEN)).await;
        assert_eq!(status, Status::Unauthorized);
        assert_eq!(body["code"], "verification_failed");
        assert!(body.get("token").is_none());
    }

    #[rocket::async_test]
    async fn google_with_malformed_credential_is_bad_request() {
        let (status, body) = post_json("/api/auth/google", json!({"credential": "not-a-jwt"}), None).await;
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["code"], "malformed_input");
    }

    #[rocket::async_test]
    async fn unparseable_body_is_malformed_input() {
        let client = test_client(None).await;
        let response = client.post("/api/auth/vk").header(ContentType::JSON).body("{not json").dispatch().await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body = response.into_json::<Value>().await.unwrap();
        assert_eq!(body["code"], "malformed_input");
    }

    #[rocket::async_test]
    async fn unknown_action_is_not_found() {
        let (status, body) = post_json("/api/auth?action=github", json!({}), None).await;
        assert_eq!(status, Status::NotFound);
        assert_eq!(body["code"], "unknown_action");
    }

    #[rocket::async_test]
    async fn action_verify_without_token_is_bad_request() {
        let (status, body) = post_json("/api/auth?action=verify", json!({"token": ""}), None).await;
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["code"], "missing_token");
    }

    #[rocket::async_test]
    async fn me_without_authorization_is_unauthorized() {
        let client = test_client(None).await;
        let response = client.get("/api/auth/me").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
        let body = response.into_json::<Value>().await.unwrap();
        assert_eq!(body["error"], "Authentication required");
        assert_eq!(body["code"], "unauthorized");
    }

    #[rocket::async_test]
    async fn me_with_wrong_scheme_is_unauthorized() {
        let client = test_client(None).await;
        let response = client.get("/api/auth/me").header(Header::new("Authorization", "Basic abc")).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    #[ignore = "requires database"]
    async fn verify_unknown_token_is_unauthorized() {
        // Requires a running PostgreSQL at DATABASE_URL
        let (status, body) = post_json("/api/auth/verify", json!({"token": "unknown"}), None).await;
        assert_eq!(status, Status::Unauthorized);
        assert_eq!(body["code"], "not_found");
        assert!(body.get("user").is_none());
    }
}
