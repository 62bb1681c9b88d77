//! Common types for the bridge: networks, directions, token metadata,
//! record status and the per-attempt phase machine.

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy::primitives::Address as L2Address;

// ============================================================================
// Networks and direction
// ============================================================================

/// The two ledgers a transfer can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    /// The base ledger (8-decimal native unit).
    L1,
    /// The secondary execution layer (18-decimal native unit).
    L2,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::L1 => "L1",
            Network::L2 => "L2",
        }
    }

    /// The other ledger.
    pub fn opposite(&self) -> Network {
        match self {
            Network::L1 => Network::L2,
            Network::L2 => Network::L1,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transfer direction. Ephemeral orchestration state, never persisted:
/// the persisted record stores the derived `from_network`/`to_network` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    L1ToL2,
    L2ToL1,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::L1ToL2 => "L1_TO_L2",
            Direction::L2ToL1 => "L2_TO_L1",
        }
    }

    pub fn source(&self) -> Network {
        match self {
            Direction::L1ToL2 => Network::L1,
            Direction::L2ToL1 => Network::L2,
        }
    }

    pub fn destination(&self) -> Network {
        self.source().opposite()
    }

    pub fn toggled(&self) -> Direction {
        match self {
            Direction::L1ToL2 => Direction::L2ToL1,
            Direction::L2ToL1 => Direction::L1ToL2,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// What kind of asset a record moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// The ledger's native asset (KAS on both legs).
    Native,
    /// An L2 contract token; `token_address`/`token_symbol` must be set.
    FungibleToken,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Native => "native",
            TokenKind::FungibleToken => "fungible_token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for an L2 fungible token, as declared by the token contract.
///
/// `decimals` always comes from this metadata; amount scaling must never
/// assume the 18-decimal native convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: L2Address,
    pub symbol: String,
    pub decimals: u8,
}

// ============================================================================
// L1 addresses
// ============================================================================

/// A bech32-encoded L1 address, validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct L1Address(String);

impl L1Address {
    /// Parse and checksum-validate a bech32 L1 address.
    pub fn parse(s: &str) -> Result<Self> {
        let (hrp, data, _variant) =
            bech32::decode(s).map_err(|e| eyre!("invalid L1 address {s:?}: {e}"))?;
        if hrp.is_empty() {
            return Err(eyre!("invalid L1 address {s:?}: missing prefix"));
        }
        if data.is_empty() {
            return Err(eyre!("invalid L1 address {s:?}: empty payload"));
        }
        Ok(L1Address(s.to_string()))
    }

    /// The human-readable prefix (the part before the bech32 separator).
    pub fn prefix(&self) -> &str {
        match self.0.rfind('1') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for L1Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Persisted record status
// ============================================================================

/// Status of a persisted bridge transaction record.
///
/// Transitions are monotonic: a status only ever moves forward along
/// `pending -> processing -> completed`, with `failed` reachable from
/// either non-terminal state. Regressions are rejected before any store
/// update is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Processing => "processing",
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Completed | TxStatus::Failed)
    }

    /// Whether moving to `next` follows the forward-only graph.
    pub fn can_transition_to(&self, next: TxStatus) -> bool {
        use TxStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Failed) | (Processing, Completed) | (Processing, Failed)
        )
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Attempt phase machine
// ============================================================================

/// Phase of a single bridge attempt.
///
/// `Idle` is the only re-entrant phase: a new attempt may begin only from
/// it. Within an attempt, movement is forward-only; after a terminal phase
/// the tracker is explicitly reset to `Idle` (a reset, not a graph edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgePhase {
    Idle,
    Submitting,
    /// L1->L2 only: deposit record created and custodial address known,
    /// funding transaction not yet broadcast.
    AwaitingRelayDeposit,
    Confirmed,
    Cancelled,
    Failed,
}

impl BridgePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgePhase::Idle => "IDLE",
            BridgePhase::Submitting => "SUBMITTING",
            BridgePhase::AwaitingRelayDeposit => "AWAITING_RELAY_DEPOSIT",
            BridgePhase::Confirmed => "CONFIRMED",
            BridgePhase::Cancelled => "CANCELLED",
            BridgePhase::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BridgePhase::Confirmed | BridgePhase::Cancelled | BridgePhase::Failed
        )
    }

    /// Forward edges of the attempt graph.
    pub fn can_advance(&self, next: BridgePhase) -> bool {
        use BridgePhase::*;
        matches!(
            (self, next),
            (Idle, Submitting)
                | (Submitting, AwaitingRelayDeposit)
                | (Submitting, Confirmed)
                | (Submitting, Cancelled)
                | (Submitting, Failed)
                | (AwaitingRelayDeposit, Confirmed)
                | (AwaitingRelayDeposit, Cancelled)
                | (AwaitingRelayDeposit, Failed)
        )
    }
}

impl fmt::Display for BridgePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
