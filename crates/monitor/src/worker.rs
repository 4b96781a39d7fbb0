use std::sync::Arc;

use ledger_watch_domain::{
    config::{ConfigError, MonitorConfig},
    model::{Address, BlockNumber, SubscribeOutcome, Transaction},
    services::SubscriptionRegistry,
    storage::{SharedTransactionStore, StorageError, StorageResult},
};
use metrics::counter;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    discovery::BlockDiscovery,
    processor::{BlockProcessor, ProcessedCursor},
    resolver::ReceiptResolverPool,
    rpc::{JsonRpcLedgerSource, LedgerSource},
};

/// Discovery may run at most this many block numbers ahead of the processor.
const RELAY_CAPACITY: usize = 1;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
    #[error("rpc method `{0}` returned no result")]
    MissingResult(String),
    #[error("block {0} not found")]
    BlockNotFound(BlockNumber),
    #[error("block relay closed")]
    ChannelClosed,
}

impl From<reqwest::Error> for MonitorError {
    fn from(value: reqwest::Error) -> Self {
        Self::Rpc(value.to_string())
    }
}

/// Builds the production ledger source from config.
pub fn build_rpc_source(config: &MonitorConfig) -> Result<JsonRpcLedgerSource, MonitorError> {
    JsonRpcLedgerSource::from_config(config)
}

/// Accessors handed to the request-handling layer. Cheap to clone; none of
/// the calls has pipeline side effects beyond registering an address.
#[derive(Clone)]
pub struct MonitorHandle {
    registry: Arc<SubscriptionRegistry>,
    cursor: Arc<ProcessedCursor>,
    store: SharedTransactionStore,
}

impl MonitorHandle {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        cursor: Arc<ProcessedCursor>,
        store: SharedTransactionStore,
    ) -> Self {
        Self {
            registry,
            cursor,
            store,
        }
    }

    /// Last block whose transactions were fully accounted for.
    pub fn current_block(&self) -> BlockNumber {
        self.cursor.get()
    }

    pub fn subscribe(&self, address: &Address) -> SubscribeOutcome {
        let outcome = self.registry.subscribe(address);
        counter!("monitor_subscriptions_total", 1, "status" => outcome.as_ref().to_owned());
        if outcome.newly_added() {
            info!(%address, watched = self.registry.len(), "address subscribed");
        }
        outcome
    }

    /// Reads through to the store; an address with nothing recorded yields an
    /// empty list.
    pub async fn transactions_for(&self, address: &Address) -> StorageResult<Vec<Transaction>> {
        match self.store.list_transactions(address).await {
            Ok(transactions) => Ok(transactions),
            Err(StorageError::NotFound(_)) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}

/// Owns the shared pipeline state and runs discovery and processing as two
/// independent tasks joined by a single-slot relay.
pub struct Monitor<S: ?Sized> {
    config: MonitorConfig,
    source: Arc<S>,
    registry: Arc<SubscriptionRegistry>,
    cursor: Arc<ProcessedCursor>,
    store: SharedTransactionStore,
}

impl<S> Monitor<S>
where
    S: LedgerSource + ?Sized + 'static,
{
    pub fn new(config: MonitorConfig, source: Arc<S>, store: SharedTransactionStore) -> Self {
        Self {
            config,
            source,
            registry: Arc::new(SubscriptionRegistry::new()),
            cursor: Arc::new(ProcessedCursor::default()),
            store,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.cursor),
            Arc::clone(&self.store),
        )
    }

    /// Runs until `cancel` fires and both tasks have wound down. A panic in
    /// one task cancels the other.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            poll_interval_ms = self.config.poll_interval().as_millis() as u64,
            start_block = self.config.start_block(),
            resolver_workers = self.config.resolver_workers(),
            "starting ledger pipeline"
        );

        let (blocks_tx, blocks_rx) = mpsc::channel::<BlockNumber>(RELAY_CAPACITY);

        let discovery = BlockDiscovery::new(
            Arc::clone(&self.source),
            self.config.poll_interval(),
            self.config.start_block(),
            blocks_tx,
            cancel.clone(),
        );
        let processor = BlockProcessor::new(
            Arc::clone(&self.source),
            ReceiptResolverPool::new(Arc::clone(&self.source), self.config.resolver_workers()),
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.cursor),
        );

        let mut tasks = JoinSet::new();
        tasks.spawn(discovery.run());
        let processor_cancel = cancel.clone();
        tasks.spawn(async move { processor.run(blocks_rx, processor_cancel).await });

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(?err, "pipeline task failed, cancelling the pipeline");
                cancel.cancel();
            }
        }

        info!(last_block = self.cursor.get(), "ledger pipeline stopped");
    }
}

/// Convenience entry point: builds the pipeline, hands its accessor handle to
/// `on_ready`, then runs until cancelled.
pub async fn run_monitor<S, F>(
    config: MonitorConfig,
    source: Arc<S>,
    store: SharedTransactionStore,
    cancel: CancellationToken,
    on_ready: F,
) where
    S: LedgerSource + ?Sized + 'static,
    F: FnOnce(MonitorHandle),
{
    let monitor = Monitor::new(config, source, store);
    on_ready(monitor.handle());
    monitor.run(cancel).await;
}
