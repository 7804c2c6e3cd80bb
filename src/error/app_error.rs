use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::{Request, Response};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use schemars::JsonSchema;
use serde::Serialize;
use std::io::Cursor;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not configured")]
    ConfigurationMissing(String),
    #[error("{0}")]
    VerificationFailed(String),
    #[error("{0}")]
    MalformedInput(String),
    #[error("Token required")]
    MissingToken,
    #[error("Invalid or expired session")]
    SessionNotFound,
    #[error("Unknown action '{0}'")]
    UnknownAction(String),
    #[error("Internal server error")]
    StoreFailure {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl AppError {
    pub fn store(message: impl Into<String>, source: sqlx::Error) -> Self {
        Self::StoreFailure {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn store_message(message: impl Into<String>) -> Self {
        Self::StoreFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::VerificationFailed(message.into())
    }

    /// Stable machine-readable classification.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ConfigurationMissing(_) => "configuration_missing",
            AppError::VerificationFailed(_) => "verification_failed",
            AppError::MalformedInput(_) => "malformed_input",
            AppError::MissingToken => "missing_token",
            AppError::SessionNotFound => "not_found",
            AppError::UnknownAction(_) => "unknown_action",
            AppError::StoreFailure { .. } => "store_failure",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            code: self.code(),
        }
    }
}

impl From<&AppError> for Status {
    fn from(e: &AppError) -> Self {
        match e {
            AppError::ConfigurationMissing(_) => Status::InternalServerError,
            AppError::VerificationFailed(_) => Status::Unauthorized,
            AppError::MalformedInput(_) => Status::BadRequest,
            AppError::MissingToken => Status::BadRequest,
            AppError::SessionNotFound => Status::Unauthorized,
            AppError::UnknownAction(_) => Status::NotFound,
            AppError::StoreFailure { .. } => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &Request<'_>) -> rocket::response::Result<'static> {
        let request_id = req
            .local_cache(|| None::<crate::middleware::RequestId>)
            .as_ref()
            .map(|r| r.0.as_str())
            .unwrap_or("unknown");

        let user_id = req
            .local_cache(|| None::<crate::auth::CurrentUser>)
            .as_ref()
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        let status = Status::from(&self);
        if status.class().is_server_error() {
            error!(
                error = ?self,
                request_id = %request_id,
                user_id = %user_id,
                method = %req.method(),
                uri = %req.uri(),
                "request failed"
            );
        } else {
            warn!(
                error = %self,
                code = self.code(),
                request_id = %request_id,
                user_id = %user_id,
                method = %req.method(),
                uri = %req.uri(),
                "request rejected"
            );
        }

        let body = serde_json::to_string(&self.body()).unwrap_or_else(|_| r#"{"error":"Internal server error","code":"store_failure"}"#.to_string());

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse};
        let mut responses = Responses::default();
        for (code, description) in [
            ("400", "Malformed input or missing token"),
            ("401", "Credential rejected or session invalid"),
            ("404", "Unknown action"),
            ("500", "Configuration or store failure"),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::store("Database error", e)
    }
}
