use axum::http::StatusCode;
use serde::Serialize;

use tally_core::{AccountId, DomainError};
use tally_ledger::AccountSnapshot;

use crate::app::errors;

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AccountList {
    pub items: Vec<AccountSnapshot>,
}

// -------------------------
// Path parameter parsing
// -------------------------

pub fn parse_account_id(name: &str, raw: &str) -> Result<AccountId, axum::response::Response> {
    raw.parse::<AccountId>().map_err(|_| {
        errors::domain_error_to_response(DomainError::invalid_id(format!(
            "{name} must be an unsigned integer, got '{raw}'"
        )))
    })
}

/// Amounts are signed on purpose: a negative or zero amount is well-formed
/// and is turned down by the ledger as a business-rule failure.
pub fn parse_amount(raw: &str) -> Result<i64, axum::response::Response> {
    raw.parse::<i64>().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("amount must be an integer, got '{raw}'"),
        )
    })
}
