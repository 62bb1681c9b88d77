//! Wallet capability interfaces and provider error normalization.
//!
//! The signing wallets are user-controlled external providers: the bridge
//! never sees keys, only asks a provider to sign and broadcast a built
//! payload. Both ledgers' wallets are modeled as constructor-injected
//! traits so the orchestrator can be exercised against fakes that simulate
//! rejection, absence and failure deterministically.

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::L1Address;

pub mod remote;

pub use remote::{RemoteL1Wallet, RemoteL2Wallet};

/// Provider error code for a user-rejected request (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// Connection state reported by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStatus {
    pub connected: bool,
    #[serde(default)]
    pub address: Option<String>,
}

/// Normalized wallet failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// No provider is installed or reachable.
    #[error("wallet provider not available")]
    NotAvailable,
    /// The user declined the request in the wallet. Terminal and silent.
    #[error("request rejected in wallet")]
    Rejected,
    #[error("insufficient funds for transfer")]
    InsufficientFunds,
    /// Any other provider-reported failure, message preserved verbatim.
    #[error("wallet provider error: {message}")]
    Provider { code: Option<i64>, message: String },
    #[error("wallet transport error: {0}")]
    Transport(String),
}

impl WalletError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::NotAvailable => "not_available",
            WalletError::Rejected => "rejected",
            WalletError::InsufficientFunds => "insufficient_funds",
            WalletError::Provider { .. } => "provider",
            WalletError::Transport(_) => "transport",
        }
    }
}

/// Fold a provider-specific exception into the normalized taxonomy.
///
/// Providers disagree on how rejection is reported: some use the numeric
/// EIP-1193 code, some only a message. Matching is on lowercased phrases,
/// so no raw provider string ever needs to be interpreted downstream.
pub fn normalize_provider_error(code: Option<i64>, message: &str) -> WalletError {
    if code == Some(USER_REJECTED_CODE) {
        return WalletError::Rejected;
    }

    let message_lower = message.to_lowercase();

    if message_lower.contains("reject")
        || message_lower.contains("denied")
        || message_lower.contains("declined")
        || message_lower.contains("cancelled by user")
        || message_lower.contains("canceled by user")
    {
        return WalletError::Rejected;
    }

    if message_lower.contains("not installed")
        || message_lower.contains("not detected")
        || message_lower.contains("no provider")
    {
        return WalletError::NotAvailable;
    }

    if message_lower.contains("insufficient") {
        return WalletError::InsufficientFunds;
    }

    WalletError::Provider {
        code,
        message: message.to_string(),
    }
}

/// Capability of the L1 wallet provider.
#[async_trait]
pub trait L1Wallet: Send + Sync {
    async fn status(&self) -> Result<WalletStatus, WalletError>;

    /// Spendable balance in L1 native units.
    async fn balance(&self) -> Result<u64, WalletError>;

    /// Sign and broadcast a native payment; returns the transaction id.
    async fn send(&self, to: &L1Address, amount: u64) -> Result<String, WalletError>;
}

/// A generic L2 transaction submission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct L2TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

/// Capability of the L2 wallet provider.
#[async_trait]
pub trait L2Wallet: Send + Sync {
    async fn status(&self) -> Result<WalletStatus, WalletError>;

    /// Spendable balance: native when `token` is absent, otherwise the
    /// token's base-unit balance.
    async fn balance(&self, token: Option<Address>) -> Result<U256, WalletError>;

    /// Sign and broadcast a transaction; returns the transaction hash.
    async fn submit(&self, tx: &L2TransactionRequest) -> Result<String, WalletError>;
}
