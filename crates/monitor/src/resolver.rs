//! Fixed-width pool that turns transaction hashes into receipt outcomes.

use std::sync::Arc;

use ledger_watch_domain::model::ReceiptOutcome;
use metrics::counter;
use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, warn};

use crate::rpc::LedgerSource;

/// Outcome channel capacity; workers hand results over one at a time.
const OUTCOME_CAPACITY: usize = 1;

pub struct ReceiptResolverPool<S: ?Sized> {
    source: Arc<S>,
    width: usize,
}

impl<S> ReceiptResolverPool<S>
where
    S: LedgerSource + ?Sized + 'static,
{
    pub fn new(source: Arc<S>, width: usize) -> Self {
        Self {
            source,
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Spawns `width` workers plus a feeder for one block's hashes. The hash
    /// queue holds at most `width` entries, so at most `width` receipt fetches
    /// run at once.
    pub fn start(&self, hashes: Vec<String>) -> ResolutionRound {
        let expected = hashes.len();
        let (hash_tx, hash_rx) = async_channel::bounded::<String>(self.width);
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_CAPACITY);

        let mut tasks = JoinSet::new();
        for worker in 0..self.width {
            tasks.spawn(resolve_hashes(
                worker,
                Arc::clone(&self.source),
                hash_rx.clone(),
                outcome_tx.clone(),
            ));
        }
        // workers own the only remaining ends
        drop(hash_rx);
        drop(outcome_tx);

        tasks.spawn(async move {
            for hash in hashes {
                if hash_tx.send(hash).await.is_err() {
                    break;
                }
            }
        });

        ResolutionRound {
            expected,
            outcomes: outcome_rx,
            tasks,
        }
    }
}

/// One block's in-flight resolution. Yields exactly `expected()` outcomes
/// unless a worker dies.
pub struct ResolutionRound {
    expected: usize,
    outcomes: mpsc::Receiver<ReceiptOutcome>,
    tasks: JoinSet<()>,
}

impl ResolutionRound {
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// `None` once every worker has exited.
    pub async fn next(&mut self) -> Option<ReceiptOutcome> {
        self.outcomes.recv().await
    }

    /// Closes the outcome channel and waits for the feeder and workers. Any
    /// hashes still queued are abandoned.
    pub async fn finish(mut self) {
        self.outcomes.close();
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                warn!(?err, "resolver task failed");
            }
        }
    }
}

async fn resolve_hashes<S>(
    worker: usize,
    source: Arc<S>,
    hashes: async_channel::Receiver<String>,
    outcomes: mpsc::Sender<ReceiptOutcome>,
) where
    S: LedgerSource + ?Sized,
{
    while let Ok(hash) = hashes.recv().await {
        let outcome = match source.transaction_receipt(&hash).await {
            Ok(receipt) => {
                counter!("monitor_receipts_total", 1, "result" => "resolved");
                ReceiptOutcome::Resolved(receipt)
            }
            Err(err) => {
                counter!("monitor_receipts_total", 1, "result" => "failed");
                warn!(worker, %hash, error = %err, "failed to resolve transaction receipt");
                ReceiptOutcome::ResolutionFailed { hash }
            }
        };

        if outcomes.send(outcome).await.is_err() {
            debug!(worker, "outcome receiver gone, resolver exiting");
            break;
        }
    }
}
