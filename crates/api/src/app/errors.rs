use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tally_core::DomainError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "account not found"),
        DomainError::Unsupported(msg) => {
            json_error(StatusCode::METHOD_NOT_ALLOWED, "unsupported", msg)
        }
        DomainError::CapacityExhausted => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "capacity_exhausted",
            "no account ids left",
        ),
    }
}

/// A well-formed request the ledger declined (insufficient funds,
/// non-positive amount, self-transfer).
pub fn rejected(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", message)
}

pub fn internal(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
