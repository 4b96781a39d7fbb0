use actix_web::{web::Data, HttpResponse};
use metrics::counter;

use crate::state::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Prometheus text exposition of every counter, gauge and histogram the
/// process has recorded.
pub async fn metrics_handler(state: Data<AppState>) -> HttpResponse {
    counter!("api_requests_total", 1, "endpoint" => "metrics", "status" => "ok");
    HttpResponse::Ok()
        .content_type(PROMETHEUS_CONTENT_TYPE)
        .body(state.telemetry().render_metrics())
}
