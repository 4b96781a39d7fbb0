use async_trait::async_trait;
use ledger_watch_domain::config::MonitorConfig;
use ledger_watch_domain::model::{BlockHeader, BlockNumber, TransactionReceipt};
use metrics::counter;

use crate::client::JsonRpcClient;
use crate::worker::MonitorError;

mod types;

pub use types::{format_quantity, parse_quantity, RpcBlock, RpcReceipt};

const BLOCK_NUMBER_METHOD: &str = "eth_blockNumber";
const BLOCK_BY_NUMBER_METHOD: &str = "eth_getBlockByNumber";
const TRANSACTION_RECEIPT_METHOD: &str = "eth_getTransactionReceipt";

/// The remote ledger as seen by the pipeline. Implementations may wrap one
/// another (rate limiting, caching) without the pipeline noticing.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn current_block_number(&self) -> Result<BlockNumber, MonitorError>;
    async fn block_header(&self, number: BlockNumber) -> Result<BlockHeader, MonitorError>;
    async fn transaction_receipt(&self, hash: &str) -> Result<TransactionReceipt, MonitorError>;
}

/// Ethereum-style JSON-RPC node.
#[derive(Debug)]
pub struct JsonRpcLedgerSource {
    client: JsonRpcClient,
}

impl JsonRpcLedgerSource {
    pub fn new(client: JsonRpcClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, MonitorError> {
        let client = JsonRpcClient::new(config.rpc_url(), config.rpc_timeout())?;
        Ok(Self::new(client))
    }

    pub fn endpoint(&self) -> &str {
        self.client.url()
    }
}

#[async_trait]
impl LedgerSource for JsonRpcLedgerSource {
    async fn current_block_number(&self) -> Result<BlockNumber, MonitorError> {
        let raw: String = self
            .client
            .call(BLOCK_NUMBER_METHOD, Vec::<()>::new())
            .await
            .inspect_err(|_| record_call(BLOCK_NUMBER_METHOD, "error"))?;
        record_call(BLOCK_NUMBER_METHOD, "ok");
        parse_quantity(&raw)
    }

    async fn block_header(&self, number: BlockNumber) -> Result<BlockHeader, MonitorError> {
        // `false`: hashes only, no transaction bodies
        let block: RpcBlock = self
            .client
            .call(BLOCK_BY_NUMBER_METHOD, (format_quantity(number), false))
            .await
            .map_err(|err| match err {
                MonitorError::MissingResult(_) => MonitorError::BlockNotFound(number),
                other => other,
            })
            .inspect_err(|_| record_call(BLOCK_BY_NUMBER_METHOD, "error"))?;
        record_call(BLOCK_BY_NUMBER_METHOD, "ok");
        BlockHeader::try_from(block)
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<TransactionReceipt, MonitorError> {
        let receipt: RpcReceipt = self
            .client
            .call(TRANSACTION_RECEIPT_METHOD, [hash])
            .await
            .inspect_err(|_| record_call(TRANSACTION_RECEIPT_METHOD, "error"))?;
        record_call(TRANSACTION_RECEIPT_METHOD, "ok");
        TransactionReceipt::try_from(receipt)
    }
}

fn record_call(method: &'static str, result: &'static str) {
    counter!("monitor_rpc_calls_total", 1, "method" => method, "result" => result);
}
