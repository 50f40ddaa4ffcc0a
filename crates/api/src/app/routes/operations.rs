use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::services::{AppServices, Movement};
use crate::app::{dto, errors};

pub async fn debit(
    Extension(services): Extension<Arc<AppServices>>,
    Path((account_id, amount)): Path<(String, String)>,
) -> axum::response::Response {
    let (id, amount) = match (
        dto::parse_account_id("accountId", &account_id),
        dto::parse_amount(&amount),
    ) {
        (Ok(id), Ok(amount)) => (id, amount),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services.credit(id, amount) {
        Ok(movement) => movement_to_response(movement),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Path((account_id, amount)): Path<(String, String)>,
) -> axum::response::Response {
    let (id, amount) = match (
        dto::parse_account_id("accountId", &account_id),
        dto::parse_amount(&amount),
    ) {
        (Ok(id), Ok(amount)) => (id, amount),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services.withdraw(id, amount) {
        Ok(movement) => movement_to_response(movement),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Path((from_id, to_id, amount)): Path<(String, String, String)>,
) -> axum::response::Response {
    let from = match dto::parse_account_id("fromAccountId", &from_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let to = match dto::parse_account_id("toAccountId", &to_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let amount = match dto::parse_amount(&amount) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // The try-lock strategy may sleep between attempts; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || services.transfer(from, to, amount)).await;

    match result {
        Ok(Ok(movement)) => movement_to_response(movement),
        Ok(Err(e)) => errors::domain_error_to_response(e),
        Err(e) => errors::internal(format!("transfer task failed: {e}")),
    }
}

fn movement_to_response(movement: Movement) -> axum::response::Response {
    match movement {
        Movement::Applied(account) => (StatusCode::OK, Json(account)).into_response(),
        Movement::Rejected(reason) => errors::rejected(reason),
        Movement::TimedOut => errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "lock_timeout",
            "accounts are busy, retry the transfer",
        ),
    }
}
