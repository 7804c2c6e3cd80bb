mod auth;
mod config;
mod database;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod service;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use database::postgres_repository::PostgresRepository;
pub use database::session::{SessionStore, generate_session_token};
pub use database::user::IdentityStore;
pub use error::app_error::AppError;
pub use models::identity::{CanonicalIdentity, Provider};
pub use models::session::AuthResponse;
pub use models::user::{User, UserResponse};
pub use service::auth::AuthService;
pub use service::credential::Credential;

use crate::db::stage_db;
use crate::middleware::RequestLogger;
use crate::routes as app_routes;
use rocket::{Build, Rocket, catchers, http::Method};
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid CORS configuration: {0}")]
    InvalidCors(String),
    #[error("Failed to create CORS fairing: {0}")]
    Cors(#[from] rocket_cors::Error),
    #[error("Could not merge OpenAPI spec: {0}")]
    OpenApi(String),
}

fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG overrides the configured level, e.g.
    //   RUST_LOG=identity_gateway::service=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    let result = if json_format { subscriber.json().try_init() } else { subscriber.try_init() };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn build_cors(cors_config: &config::CorsConfig) -> Result<CorsOptions, BuildError> {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        return Err(BuildError::InvalidCors(
            "wildcard origins (*) cannot be combined with credentials".to_string(),
        ));
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    Ok(CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Post, Method::Options].into_iter().map(From::from).collect(),
        allowed_headers: AllowedHeaders::some(&["Content-Type", "Authorization"]),
        allow_credentials: cors_config.allow_credentials,
        max_age: Some(86400),
        ..Default::default()
    })
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return config::DEFAULT_API_BASE_PATH.to_string();
    }

    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn mount_api_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Result<Rocket<Build>, BuildError> {
    let (auth_routes, auth_openapi) = app_routes::auth::routes();
    let (health_routes, health_openapi) = app_routes::health::routes();
    let route_specs = [("/auth", auth_routes, auth_openapi), ("/health", health_routes, health_openapi)];

    let mut openapi_list = Vec::new();
    for (path, routes, openapi) in route_specs {
        rocket = rocket.mount(format!("{}{}", base_path, path), routes);
        openapi_list.push((path, openapi));
    }

    if enable_swagger {
        let openapi_docs = marge_spec_list(&openapi_list).map_err(|e| BuildError::OpenApi(e.to_string()))?;
        let settings = rocket_okapi::settings::OpenApiSettings::default();
        rocket = rocket
            .mount(base_path, vec![get_openapi_route(openapi_docs, &settings)])
            .mount(
                format!("{}/docs", base_path),
                make_swagger_ui(&SwaggerUIConfig {
                    url: format!("{}/openapi.json", base_path),
                    ..Default::default()
                }),
            );
    }

    Ok(rocket)
}

/// Everything except the database pool, which `build_rocket` stages on ignite.
fn assemble(config: Config) -> Result<Rocket<Build>, BuildError> {
    let cors = build_cors(&config.cors)?.to_cors()?;
    let base_path = normalize_base_path(&config.api.base_path);

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    let rocket = rocket::custom(figment).attach(cors).attach(RequestLogger);
    let rocket = mount_api_routes(rocket, &base_path, config.api.enable_swagger)?;

    Ok(rocket
        .register(
            base_path.as_str(),
            catchers![
                app_routes::error::bad_request,
                app_routes::error::unauthorized,
                app_routes::error::not_found,
                app_routes::error::payload_too_large,
                app_routes::error::unprocessable_entity,
                app_routes::error::internal_error
            ],
        )
        .manage(config))
}

pub fn build_rocket(config: Config) -> Result<Rocket<Build>, BuildError> {
    init_tracing(&config.logging.level, config.logging.json_format);

    if config.auth.telegram_bot_token().is_none() {
        tracing::warn!("Telegram bot token not configured; Telegram logins will be rejected");
    }

    let database = config.database.clone();
    Ok(assemble(config)?.attach(stage_db(database)))
}
