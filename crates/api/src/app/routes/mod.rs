use axum::{
    routing::{get, put},
    Router,
};

pub mod accounts;
pub mod operations;
pub mod system;

/// Router for all account and money-movement endpoints.
pub fn router() -> Router {
    Router::new()
        .route(
            "/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/accounts/:account_id",
            get(accounts::get_account).delete(accounts::remove_account),
        )
        .route("/accounts/:account_id/debit/:amount", put(operations::debit))
        .route("/accounts/:account_id/withdraw/:amount", put(operations::withdraw))
        .route(
            "/transfers/from/:from_id/to/:to_id/amount/:amount",
            put(operations::transfer).post(operations::transfer),
        )
}
