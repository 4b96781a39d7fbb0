//! Data structures and helpers shared across the API and monitor crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use thiserror::Error;

/// Ledger block height.
pub type BlockNumber = u64;

/// Required number of hex characters after the `0x` prefix of an address.
pub const ADDRESS_HEX_LENGTH: usize = 40;

/// Errors emitted when user-supplied addresses fail validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressFormatError {
    #[error("address must start with `0x`")]
    MissingPrefix,
    #[error("address must have exactly {ADDRESS_HEX_LENGTH} hex characters after `0x`")]
    WrongLength,
    #[error("address contains non-hex characters")]
    NonHex,
}

/// Validates the `0x` + 40 hex-character address contract. Letter case is
/// irrelevant.
pub fn validate_address(address: &str) -> Result<(), AddressFormatError> {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or(AddressFormatError::MissingPrefix)?;

    if digits.len() != ADDRESS_HEX_LENGTH {
        return Err(AddressFormatError::WrongLength);
    }

    hex::decode(digits).map_err(|_| AddressFormatError::NonHex)?;
    Ok(())
}

/// Account address, always held in canonical lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Canonicalizes without validating. Used for values that come back from
    /// the ledger node.
    pub fn new(value: impl Into<String>) -> Self {
        let mut owned = value.into();
        owned.make_ascii_lowercase();
        Self(owned)
    }

    pub fn parse(address: &str) -> Result<Self, AddressFormatError> {
        let trimmed = address.trim();
        validate_address(trimmed)?;
        Ok(Self::new(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Block header with transaction hashes only (no transaction bodies).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: BlockNumber,
    pub hash: String,
    pub transaction_hashes: Vec<String>,
    /// Unix seconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub status: ReceiptStatus,
    pub hash: String,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// What a resolver worker produced for one transaction hash.
///
/// `ResolutionFailed` means the receipt could not be fetched at all; it is
/// deliberately distinct from a resolved receipt whose on-chain status is
/// [`ReceiptStatus::Failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Resolved(TransactionReceipt),
    ResolutionFailed { hash: String },
}

/// Persisted record for a transaction touching a watched address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub from: Address,
    pub to: Option<Address>,
    /// Timestamp of the block that included the transaction.
    pub timestamp: i64,
}

impl Transaction {
    pub fn from_receipt(receipt: &TransactionReceipt, block_timestamp: i64) -> Self {
        Self {
            hash: receipt.hash.clone(),
            from: receipt.from.clone(),
            to: receipt.to.clone(),
            timestamp: block_timestamp,
        }
    }
}

/// Result of registering a watched address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

impl SubscribeOutcome {
    pub fn newly_added(self) -> bool {
        matches!(self, SubscribeOutcome::Subscribed)
    }
}
