//! Wire shapes returned by the node and their conversion into domain types.
//! Only the fields the pipeline uses are modelled.

use ledger_watch_domain::model::{Address, BlockHeader, ReceiptStatus, TransactionReceipt};
use serde::Deserialize;

use crate::worker::MonitorError;

/// `eth_getBlockByNumber` result with `false` for full transactions, so
/// `transactions` holds hashes only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub number: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub transactions: Vec<String>,
    pub timestamp: String,
}

/// `eth_getTransactionReceipt` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    /// `0x1` success, `0x0` failure. Absent on pre-Byzantium receipts.
    #[serde(default)]
    pub status: Option<String>,
    pub transaction_hash: String,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
}

impl TryFrom<RpcBlock> for BlockHeader {
    type Error = MonitorError;

    fn try_from(block: RpcBlock) -> Result<Self, Self::Error> {
        let number = parse_quantity(&block.number)?;
        let timestamp = i64::try_from(parse_quantity(&block.timestamp)?)
            .map_err(|_| MonitorError::InvalidResponse("block timestamp overflow".into()))?;

        Ok(BlockHeader {
            number,
            hash: block.hash.unwrap_or_default(),
            transaction_hashes: block.transactions,
            timestamp,
        })
    }
}

impl TryFrom<RpcReceipt> for TransactionReceipt {
    type Error = MonitorError;

    fn try_from(receipt: RpcReceipt) -> Result<Self, Self::Error> {
        let status = match receipt.status.as_deref() {
            Some(raw) if parse_quantity(raw)? == 1 => ReceiptStatus::Success,
            _ => ReceiptStatus::Failure,
        };

        Ok(TransactionReceipt {
            status,
            hash: receipt.transaction_hash,
            from: Address::new(receipt.from),
            to: receipt.to.map(Address::new),
        })
    }
}

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u64, MonitorError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| MonitorError::InvalidResponse(format!("quantity `{raw}` lacks 0x prefix")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|err| MonitorError::InvalidResponse(format!("quantity `{raw}`: {err}")))
}

pub fn format_quantity(value: u64) -> String {
    format!("0x{value:x}")
}
