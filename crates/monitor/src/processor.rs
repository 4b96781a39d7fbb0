use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ledger_watch_domain::model::{Address, BlockNumber};
use ledger_watch_domain::services::SubscriptionRegistry;
use ledger_watch_domain::storage::SharedTransactionStore;
use metrics::{gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::pipeline::{persist_matches, Classification, MatchedTransactions};
use crate::resolver::ReceiptResolverPool;
use crate::rpc::LedgerSource;
use crate::worker::MonitorError;

/// Last fully accounted-for block. Written by the processor only, read from
/// anywhere without locking. Never decreases.
#[derive(Debug, Default)]
pub struct ProcessedCursor(AtomicU64);

impl ProcessedCursor {
    pub fn get(&self) -> BlockNumber {
        self.0.load(Ordering::Acquire)
    }

    pub fn advance(&self, number: BlockNumber) {
        self.0.fetch_max(number, Ordering::AcqRel);
    }
}

/// Per-block accounting returned by [`BlockProcessor::process_block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: BlockNumber,
    pub transactions: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub matched: usize,
    pub persisted_addresses: Vec<Address>,
    pub failed_addresses: Vec<Address>,
}

impl BlockSummary {
    fn empty(number: BlockNumber, transactions: usize) -> Self {
        Self {
            number,
            transactions,
            resolved: 0,
            unresolved: 0,
            matched: 0,
            persisted_addresses: Vec::new(),
            failed_addresses: Vec::new(),
        }
    }
}

pub struct BlockProcessor<S: ?Sized> {
    source: Arc<S>,
    resolvers: ReceiptResolverPool<S>,
    registry: Arc<SubscriptionRegistry>,
    store: SharedTransactionStore,
    cursor: Arc<ProcessedCursor>,
}

impl<S> BlockProcessor<S>
where
    S: LedgerSource + ?Sized + 'static,
{
    pub fn new(
        source: Arc<S>,
        resolvers: ReceiptResolverPool<S>,
        registry: Arc<SubscriptionRegistry>,
        store: SharedTransactionStore,
        cursor: Arc<ProcessedCursor>,
    ) -> Self {
        Self {
            source,
            resolvers,
            registry,
            store,
            cursor,
        }
    }

    /// Consumes block numbers in arrival order until the relay closes or
    /// `cancel` fires. A block already in progress always runs to completion.
    pub async fn run(self, mut blocks: mpsc::Receiver<BlockNumber>, cancel: CancellationToken) {
        loop {
            let number = tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                received = blocks.recv() => match received {
                    Some(number) => number,
                    None => {
                        info!("block relay closed");
                        break;
                    }
                },
            };
            if cancel.is_cancelled() {
                break;
            }

            if let Err(err) = self.process_block(number).await {
                error!(block = number, error = %err, "skipping block");
            }
        }
        info!(last_block = self.cursor.get(), "block processor stopped");
    }

    /// Resolves, classifies and persists one block, then advances the cursor.
    /// A header failure returns early and leaves the cursor untouched.
    pub async fn process_block(&self, number: BlockNumber) -> Result<BlockSummary, MonitorError> {
        let started = Instant::now();
        let header = self.source.block_header(number).await?;

        let mut summary = BlockSummary::empty(number, header.transaction_hashes.len());
        let mut matches = MatchedTransactions::new();
        let mut round = self.resolvers.start(header.transaction_hashes);

        for _ in 0..round.expected() {
            let Some(outcome) = round.next().await else {
                warn!(
                    block = number,
                    expected = round.expected(),
                    received = summary.resolved + summary.unresolved,
                    "resolver outcomes ended early"
                );
                break;
            };
            match matches.classify(&self.registry, outcome, header.timestamp) {
                Classification::Unresolved => summary.unresolved += 1,
                Classification::Matched(_) => {
                    summary.resolved += 1;
                    summary.matched += 1;
                }
                Classification::Unmatched | Classification::Failed => summary.resolved += 1,
            }
        }
        round.finish().await;

        if !matches.is_empty() {
            let report = persist_matches(self.store.as_ref(), matches).await;
            summary.persisted_addresses = report.persisted;
            summary.failed_addresses = report.failed;
        }

        self.cursor.advance(number);
        let elapsed = started.elapsed();
        gauge!("monitor_processed_block", number as f64);
        histogram!("monitor_block_duration_ms", elapsed.as_secs_f64() * 1_000.0);
        info!(
            block = number,
            transactions = summary.transactions,
            unresolved = summary.unresolved,
            matched = summary.matched,
            elapsed_ms = elapsed.as_millis() as u64,
            "processed block"
        );

        Ok(summary)
    }
}
