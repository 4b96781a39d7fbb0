use actix_web::{web, HttpResponse};
use ledger_watch_domain::model::{Address, Transaction};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

use super::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub address: Address,
    pub transactions: Vec<Transaction>,
}

/// Unknown and never-matched addresses both yield an empty list.
pub async fn transactions_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let address = Address::parse(&path.into_inner()).inspect_err(|_| {
        counter!("api_requests_total", 1, "endpoint" => "transactions", "status" => "invalid");
    })?;

    let transactions = state
        .monitor()
        .transactions_for(&address)
        .await
        .inspect_err(|_| {
            counter!("api_requests_total", 1, "endpoint" => "transactions", "status" => "error");
        })?;
    counter!("api_requests_total", 1, "endpoint" => "transactions", "status" => "ok");

    Ok(HttpResponse::Ok().json(TransactionsResponse {
        address,
        transactions,
    }))
}
