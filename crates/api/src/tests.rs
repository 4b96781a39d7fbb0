use std::sync::Arc;

use actix_web::{body::to_bytes, http::StatusCode, test, web, App};
use async_trait::async_trait;
use ledger_watch_domain::model::{Address, SubscribeOutcome, Transaction};
use ledger_watch_domain::services::{
    init_telemetry, SubscriptionRegistry, TelemetryConfig, TelemetryGuard,
};
use ledger_watch_domain::storage::{
    SharedTransactionStore, StorageError, StorageResult, TransactionStore,
};
use ledger_watch_monitor::{MonitorHandle, ProcessedCursor};
use ledger_watch_storage::MemoryStorage;

use crate::application::routes;
use crate::handlers::{
    block::CurrentBlockResponse,
    subscribe::{SubscribeRequest, SubscribeResponse},
    transactions::TransactionsResponse,
};
use crate::state::AppState;

const WATCHED: &str = "0x22a7a914cf352f7361c199188a23da94fe71b277";

fn telemetry() -> TelemetryGuard {
    let config = TelemetryConfig::from_env("API_TEST");
    init_telemetry(&config).expect("telemetry inits")
}

struct Fixture {
    state: AppState,
    cursor: Arc<ProcessedCursor>,
    registry: Arc<SubscriptionRegistry>,
}

fn fixture(store: SharedTransactionStore) -> Fixture {
    let registry = Arc::new(SubscriptionRegistry::new());
    let cursor = Arc::new(ProcessedCursor::default());
    let handle = MonitorHandle::new(Arc::clone(&registry), Arc::clone(&cursor), store);
    Fixture {
        state: AppState::new(handle, telemetry()),
        cursor,
        registry,
    }
}

/// Every call fails, to exercise the 500 path.
struct BrokenStore;

#[async_trait]
impl TransactionStore for BrokenStore {
    async fn append_transactions(
        &self,
        _address: &Address,
        _transactions: Vec<Transaction>,
    ) -> StorageResult<()> {
        Err(StorageError::Database("connection reset".into()))
    }

    async fn list_transactions(&self, _address: &Address) -> StorageResult<Vec<Transaction>> {
        Err(StorageError::Database("connection reset".into()))
    }
}

#[actix_web::test]
async fn reports_processed_block() {
    let fixture = fixture(Arc::new(MemoryStorage::default()));
    fixture.cursor.advance(21_543_920);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(fixture.state))
            .configure(routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/block").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: CurrentBlockResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.block, 21_543_920);
}

#[actix_web::test]
async fn subscribe_is_idempotent_and_case_insensitive() {
    let fixture = fixture(Arc::new(MemoryStorage::default()));
    let registry = Arc::clone(&fixture.registry);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(fixture.state))
            .configure(routes),
    )
    .await;

    let mut statuses = Vec::new();
    for address in [WATCHED.to_ascii_uppercase().replace("0X", "0x"), WATCHED.to_owned()] {
        let req = test::TestRequest::post()
            .uri("/api/v1/subscribe")
            .set_json(&SubscribeRequest { address })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let parsed: SubscribeResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.address.as_str(), WATCHED);
        statuses.push(parsed.status);
    }

    assert_eq!(
        statuses,
        vec![SubscribeOutcome::Subscribed, SubscribeOutcome::AlreadySubscribed]
    );
    assert!(registry.contains(&Address::new(WATCHED)));
    assert_eq!(registry.len(), 1);
}

#[actix_web::test]
async fn subscribe_rejects_malformed_address() {
    let fixture = fixture(Arc::new(MemoryStorage::default()));
    let registry = Arc::clone(&fixture.registry);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(fixture.state))
            .configure(routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/subscribe")
        .set_json(&SubscribeRequest {
            address: "0x1234".into(),
        })
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(parsed["error"].as_str().unwrap().contains("invalid address"));
    assert!(registry.is_empty());
}

#[actix_web::test]
async fn unknown_address_has_no_transactions() {
    let fixture = fixture(Arc::new(MemoryStorage::default()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(fixture.state))
            .configure(routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/transactions/{WATCHED}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: TransactionsResponse = serde_json::from_slice(&body).unwrap();
    assert!(parsed.transactions.is_empty());
}

#[actix_web::test]
async fn lists_recorded_transactions() {
    let store = Arc::new(MemoryStorage::default());
    let address = Address::new(WATCHED);
    store
        .append_transactions(
            &address,
            vec![Transaction {
                hash: "0xa095ab2eadeb8451e5eadc2329c8dbcabfae81bfd0b05d2f7c7fa635889b959b".into(),
                from: address.clone(),
                to: Some(Address::new("0xfe556e4f848c82093d0a33cc41761d18f67099ca")),
                timestamp: 1_736_268_843,
            }],
        )
        .await
        .unwrap();
    let fixture = fixture(store);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(fixture.state))
            .configure(routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/transactions/{}", WATCHED.to_ascii_uppercase().replace("0X", "0x")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: TransactionsResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.address, address);
    assert_eq!(parsed.transactions.len(), 1);
    assert_eq!(parsed.transactions[0].timestamp, 1_736_268_843);
}

#[actix_web::test]
async fn transactions_rejects_malformed_address() {
    let fixture = fixture(Arc::new(MemoryStorage::default()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(fixture.state))
            .configure(routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/transactions/not-an-address")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn storage_failure_is_internal_error() {
    let fixture = fixture(Arc::new(BrokenStore));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(fixture.state))
            .configure(routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/transactions/{WATCHED}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn exposes_prometheus_metrics() {
    let fixture = fixture(Arc::new(MemoryStorage::default()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(fixture.state))
            .configure(routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/block").to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(content_type.starts_with("text/plain"));
}
