use actix_web::{web, HttpResponse};
use ledger_watch_domain::model::BlockNumber;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentBlockResponse {
    pub block: BlockNumber,
}

pub async fn current_block_handler(state: web::Data<AppState>) -> HttpResponse {
    counter!("api_requests_total", 1, "endpoint" => "block", "status" => "ok");
    HttpResponse::Ok().json(CurrentBlockResponse {
        block: state.monitor().current_block(),
    })
}
