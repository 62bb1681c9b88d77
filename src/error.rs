//! Bridge error taxonomy.
//!
//! Every collaborator failure is normalized into [`BridgeError`] at the
//! orchestrator boundary; no raw provider or transport error reaches the
//! presentation layer unmodified.

use thiserror::Error;

use crate::types::Network;

/// Input problems caught before any collaborator is called.
///
/// Always locally recoverable by correcting the input; never the result of
/// a network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("amount is required")]
    MissingAmount,
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("minimum bridge amount is {min} KAS")]
    BelowMinimum { min: String },
    #[error("amount has more precision than the ledger supports: {0}")]
    InvalidAmount(String),
    #[error("amount exceeds the available balance")]
    InsufficientBalance,
    #[error("{network} wallet is not connected")]
    WalletNotConnected { network: Network },
    #[error("recipient address is required")]
    MissingRecipient,
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("token transfers are only available when bridging from L2")]
    TokenNotAllowed,
    #[error("a bridge attempt is already in progress")]
    AttemptInProgress,
}

/// Normalized failure of a bridge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Wallet-reported user rejection. Silent: the orchestrator converts
    /// this into a non-error cancelled outcome before it can surface.
    #[error("transfer cancelled in wallet")]
    UserCancelled,

    /// The relay (or the record backend, before anything was broadcast)
    /// errored or returned a non-success payload. Retrying is safe.
    #[error("bridge relay unavailable: {0}")]
    RelayUnavailable(String),

    /// The source-ledger transaction was broadcast but the deposit record
    /// could not be updated with its identifier. The broadcast is never
    /// rolled back; the divergence is logged for manual reconciliation.
    #[error("transaction sent but the deposit record could not be updated: {0}")]
    RelayUpdateFailed(String),

    /// Any wallet failure other than user rejection, carrying the
    /// provider's message. Direction-agnostic.
    #[error("wallet submission failed: {0}")]
    WalletSubmissionFailed(String),
}

impl BridgeError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Validation(_) => "validation",
            BridgeError::UserCancelled => "user_cancelled",
            BridgeError::RelayUnavailable(_) => "relay_unavailable",
            BridgeError::RelayUpdateFailed(_) => "relay_update_failed",
            BridgeError::WalletSubmissionFailed(_) => "wallet_submission_failed",
        }
    }

    /// Whether the caller can simply retry the attempt from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::RelayUnavailable(_))
    }
}
