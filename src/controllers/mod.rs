use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::error::ServiceError;

pub mod home_controller;
pub mod prices_controller;
pub mod alerts_controller;
pub mod crops_controller;
pub mod markets_controller;
pub mod admin_controller;

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub(crate) fn service_error(e: ServiceError) -> Response {
    match e {
        ServiceError::Validation(m) | ServiceError::Conflict(m) => error_response(StatusCode::BAD_REQUEST, m),
        ServiceError::NotFound(m) => error_response(StatusCode::NOT_FOUND, m),
        ServiceError::Forbidden(m) => error_response(StatusCode::FORBIDDEN, m),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store error while handling request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<ObjectId, Response> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, format!("invalid {what} id")))
}
