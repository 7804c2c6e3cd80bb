use crate::error::app_error::ErrorBody;
use rocket::serde::json::Json;
use rocket::{Request, catch};

fn error(message: &str, code: &'static str) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: message.to_string(),
        code,
    })
}

#[catch(400)]
pub fn bad_request(_: &Request) -> Json<ErrorBody> {
    error("Bad request", "malformed_input")
}

#[catch(401)]
pub fn unauthorized(_: &Request) -> Json<ErrorBody> {
    error("Authentication required", "unauthorized")
}

#[catch(404)]
pub fn not_found(_: &Request) -> Json<ErrorBody> {
    error("Not found", "not_found")
}

#[catch(413)]
pub fn payload_too_large(_: &Request) -> Json<ErrorBody> {
    error("Payload too large", "malformed_input")
}

#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Json<ErrorBody> {
    error("Request body is not valid JSON for this endpoint", "malformed_input")
}

#[catch(500)]
pub fn internal_error(_: &Request) -> Json<ErrorBody> {
    error("Internal server error", "store_failure")
}
