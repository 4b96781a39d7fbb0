use std::collections::BTreeMap;

use ledger_watch_domain::model::{Address, ReceiptOutcome, Transaction};
use ledger_watch_domain::services::SubscriptionRegistry;
use ledger_watch_domain::storage::TransactionStore;
use metrics::counter;
use tracing::warn;

/// What happened to one receipt outcome during classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Bucketed under this watched address.
    Matched(Address),
    Unmatched,
    /// Resolved, but the transaction failed on chain.
    Failed,
    /// The receipt could not be fetched.
    Unresolved,
}

impl Classification {
    /// Metric label for the `result` dimension.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Matched(_) => "matched",
            Classification::Unmatched => "unmatched",
            Classification::Failed => "failed",
            Classification::Unresolved => "unresolved",
        }
    }
}

/// Per-block buckets of transactions keyed by the watched address they were
/// attributed to. Each transaction lands in at most one bucket.
#[derive(Debug, Default)]
pub struct MatchedTransactions {
    buckets: BTreeMap<Address, Vec<Transaction>>,
}

impl MatchedTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buckets a successful receipt by `from` when it is watched, otherwise by
    /// `to`. Everything else is dropped.
    pub fn classify(
        &mut self,
        registry: &SubscriptionRegistry,
        outcome: ReceiptOutcome,
        block_timestamp: i64,
    ) -> Classification {
        let receipt = match outcome {
            ReceiptOutcome::Resolved(receipt) => receipt,
            ReceiptOutcome::ResolutionFailed { .. } => return record(Classification::Unresolved),
        };
        if !receipt.succeeded() {
            return record(Classification::Failed);
        }

        let owner = if registry.contains(&receipt.from) {
            Some(receipt.from.clone())
        } else {
            receipt
                .to
                .as_ref()
                .filter(|to| registry.contains(to))
                .cloned()
        };

        let Some(owner) = owner else {
            return record(Classification::Unmatched);
        };
        self.buckets
            .entry(owner.clone())
            .or_default()
            .push(Transaction::from_receipt(&receipt, block_timestamp));
        record(Classification::Matched(owner))
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of matched transactions across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn get(&self, address: &Address) -> Option<&[Transaction]> {
        self.buckets.get(address).map(Vec::as_slice)
    }

    pub fn into_buckets(self) -> BTreeMap<Address, Vec<Transaction>> {
        self.buckets
    }
}

fn record(classification: Classification) -> Classification {
    counter!("monitor_transactions_classified_total", 1, "result" => classification.label());
    classification
}

/// Outcome of writing one block's buckets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PersistReport {
    pub persisted: Vec<Address>,
    pub failed: Vec<Address>,
}

/// Appends every bucket to the store. A failing address is logged and
/// skipped; the remaining addresses are still written.
pub async fn persist_matches<S>(store: &S, matches: MatchedTransactions) -> PersistReport
where
    S: TransactionStore + ?Sized,
{
    let mut report = PersistReport::default();
    for (address, transactions) in matches.into_buckets() {
        let count = transactions.len();
        match store.append_transactions(&address, transactions).await {
            Ok(()) => {
                counter!("monitor_persist_total", 1, "result" => "ok");
                report.persisted.push(address);
            }
            Err(err) => {
                counter!("monitor_persist_total", 1, "result" => "error");
                warn!(%address, count, error = %err, "failed to persist matched transactions");
                report.failed.push(address);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use ledger_watch_domain::model::{ReceiptStatus, TransactionReceipt};
    use ledger_watch_domain::storage::{StorageError, StorageResult};

    const A: &str = "0x000000000000000000000000000000000000000a";
    const B: &str = "0x000000000000000000000000000000000000000b";
    const C: &str = "0x000000000000000000000000000000000000000c";

    fn receipt(hash: &str, from: &str, to: Option<&str>, status: ReceiptStatus) -> ReceiptOutcome {
        ReceiptOutcome::Resolved(TransactionReceipt {
            status,
            hash: hash.into(),
            from: Address::new(from),
            to: to.map(Address::new),
        })
    }

    fn registry(addresses: &[&str]) -> SubscriptionRegistry {
        let registry = SubscriptionRegistry::new();
        for address in addresses {
            registry.add(&Address::new(*address));
        }
        registry
    }

    #[test]
    fn from_wins_when_both_sides_are_watched() {
        let registry = registry(&[A, B]);
        let mut matches = MatchedTransactions::new();

        let result = matches.classify(
            &registry,
            receipt("0x01", A, Some(B), ReceiptStatus::Success),
            42,
        );

        assert_eq!(result, Classification::Matched(Address::new(A)));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches.get(&Address::new(A)).unwrap()[0].timestamp, 42);
        assert!(matches.get(&Address::new(B)).is_none());
    }

    #[test]
    fn watched_recipient_is_matched() {
        let registry = registry(&[B]);
        let mut matches = MatchedTransactions::new();
        let result = matches.classify(
            &registry,
            receipt("0x01", C, Some(B), ReceiptStatus::Success),
            1,
        );
        assert_eq!(result, Classification::Matched(Address::new(B)));
    }

    #[test]
    fn unmatched_failed_and_unresolved_are_dropped() {
        let registry = registry(&[A]);
        let mut matches = MatchedTransactions::new();

        assert_eq!(
            matches.classify(&registry, receipt("0x01", C, Some(B), ReceiptStatus::Success), 1),
            Classification::Unmatched
        );
        assert_eq!(
            matches.classify(&registry, receipt("0x02", C, None, ReceiptStatus::Success), 1),
            Classification::Unmatched
        );
        assert_eq!(
            matches.classify(&registry, receipt("0x03", A, None, ReceiptStatus::Failure), 1),
            Classification::Failed
        );
        assert_eq!(
            matches.classify(
                &registry,
                ReceiptOutcome::ResolutionFailed {
                    hash: "0x04".into()
                },
                1
            ),
            Classification::Unresolved
        );
        assert!(matches.is_empty());
    }

    #[test]
    fn every_classification_has_a_distinct_label() {
        let labels = [
            Classification::Matched(Address::new(A)).label(),
            Classification::Unmatched.label(),
            Classification::Failed.label(),
            Classification::Unresolved.label(),
        ];
        assert_eq!(labels, ["matched", "unmatched", "failed", "unresolved"]);

        let registry = registry(&[A]);
        let mut matches = MatchedTransactions::new();
        let result = matches.classify(
            &registry,
            receipt("0x01", A, None, ReceiptStatus::Success),
            1,
        );
        assert_eq!(result.label(), "matched");
    }

    #[test]
    fn contract_creation_from_watched_sender_is_kept() {
        let registry = registry(&[A]);
        let mut matches = MatchedTransactions::new();
        matches.classify(&registry, receipt("0x01", A, None, ReceiptStatus::Success), 9);
        let stored = matches.get(&Address::new(A)).unwrap();
        assert!(stored[0].to.is_none());
    }

    /// Fails appends for one address, counts the rest.
    struct FlakyStore {
        broken: Address,
        appended: AtomicUsize,
    }

    #[async_trait]
    impl TransactionStore for FlakyStore {
        async fn append_transactions(
            &self,
            address: &Address,
            transactions: Vec<Transaction>,
        ) -> StorageResult<()> {
            if *address == self.broken {
                return Err(StorageError::Database("disk full".into()));
            }
            self.appended.fetch_add(transactions.len(), Ordering::SeqCst);
            Ok(())
        }

        async fn list_transactions(&self, address: &Address) -> StorageResult<Vec<Transaction>> {
            Err(StorageError::NotFound(address.clone()))
        }
    }

    #[tokio::test]
    async fn persistence_failure_is_isolated_per_address() {
        let registry = registry(&[A, B, C]);
        let mut matches = MatchedTransactions::new();
        matches.classify(&registry, receipt("0x01", A, None, ReceiptStatus::Success), 1);
        matches.classify(&registry, receipt("0x02", B, None, ReceiptStatus::Success), 1);
        matches.classify(&registry, receipt("0x03", C, None, ReceiptStatus::Success), 1);
        matches.classify(&registry, receipt("0x04", C, None, ReceiptStatus::Success), 1);

        let store = FlakyStore {
            broken: Address::new(B),
            appended: AtomicUsize::new(0),
        };
        let report = persist_matches(&store, matches).await;

        assert_eq!(report.failed, vec![Address::new(B)]);
        assert_eq!(report.persisted, vec![Address::new(A), Address::new(C)]);
        assert_eq!(store.appended.load(Ordering::SeqCst), 3);
    }
}
