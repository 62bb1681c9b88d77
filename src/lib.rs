//! Cross-ledger bridge orchestrator for KAS.
//!
//! This crate drives a single user-initiated transfer of KAS (or an L2
//! fungible token) between the L1 ledger and the L2 execution layer:
//!
//! - **Units & quoting** - exact decimal conversion into each ledger's
//!   native integer unit and a fee/settlement-time quote.
//! - **Payload building** - the ledger-specific transfer instruction,
//!   including manual ERC-20 `transfer` calldata for L2 token withdrawals.
//! - **Capability clients** - the custodial deposit relay, the transaction
//!   record store and the wallet providers, all reached over HTTP and all
//!   injectable behind traits for deterministic tests.
//! - **Orchestration** - the phase machine that sequences relay, wallet
//!   and record-store calls per direction and normalizes every
//!   collaborator failure into one error taxonomy.

pub mod api;
pub mod config;
pub mod error;
pub mod estimate;
pub mod form;
pub mod metrics;
pub mod orchestrator;
pub mod payload;
pub mod relay;
pub mod store;
pub mod testing;
pub mod types;
pub mod units;
pub mod wallet;

pub use error::{BridgeError, ValidationError};
pub use estimate::{estimate, BridgeQuote};
pub use orchestrator::{BridgeOrchestrator, BridgeOutcome, BridgeRequest, BridgeSettings};
pub use types::{BridgePhase, Direction, L1Address, Network, TokenInfo, TokenKind, TxStatus};
