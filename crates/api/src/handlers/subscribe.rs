use actix_web::{web, HttpResponse};
use ledger_watch_domain::model::{Address, SubscribeOutcome};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

use super::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub address: Address,
    pub status: SubscribeOutcome,
}

pub async fn subscribe_handler(
    state: web::Data<AppState>,
    payload: web::Json<SubscribeRequest>,
) -> Result<HttpResponse, ApiError> {
    let address = Address::parse(&payload.address).inspect_err(|_| {
        counter!("api_requests_total", 1, "endpoint" => "subscribe", "status" => "invalid");
    })?;

    let status = state.monitor().subscribe(&address);
    let status_tag = status.as_ref().to_owned();
    counter!("api_requests_total", 1, "endpoint" => "subscribe", "status" => status_tag);

    Ok(HttpResponse::Ok().json(SubscribeResponse { address, status }))
}
