//! Block discovery and transaction resolution pipeline for a remote ledger.
//! Embedded in the API process, which drives it through [`MonitorHandle`].

pub mod client;
pub mod discovery;
pub mod pipeline;
pub mod processor;
pub mod resolver;
pub mod rpc;
pub mod worker;

pub use client::JsonRpcClient;
pub use discovery::BlockDiscovery;
pub use pipeline::{persist_matches, Classification, MatchedTransactions, PersistReport};
pub use processor::{BlockProcessor, BlockSummary, ProcessedCursor};
pub use resolver::{ReceiptResolverPool, ResolutionRound};
pub use rpc::{JsonRpcLedgerSource, LedgerSource};
pub use worker::{build_rpc_source, run_monitor, Monitor, MonitorError, MonitorHandle};
