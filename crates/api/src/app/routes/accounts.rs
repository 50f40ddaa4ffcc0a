use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.create_account() {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services.list_accounts();
    (StatusCode::OK, Json(dto::AccountList { items })).into_response()
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(account_id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_account_id("accountId", &account_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_account(id) {
        Some(account) => (StatusCode::OK, Json(account)).into_response(),
        None => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("account with id {id} is not found"),
        ),
    }
}

/// Accounts are never removed; this always answers `405 unsupported`.
pub async fn remove_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(account_id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_account_id("accountId", &account_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.remove_account(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
