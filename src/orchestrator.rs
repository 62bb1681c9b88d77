//! Bridge orchestrator.
//!
//! Drives one transfer attempt at a time: validates input against wallet
//! state, quotes fee and settlement time, selects the per-direction flow,
//! sequences relay / wallet / record-store calls and normalizes every
//! collaborator failure into the bridge error taxonomy.
//!
//! Two flows exist, selected by [`Direction`]:
//!
//! - L1->L2 runs through the custodial relay: deposit record first, then
//!   the funding payment from the user's L1 wallet, then the broadcast
//!   identifier is attached back to the deposit record. If the payment is
//!   never broadcast the deposit record is deliberately left in place for
//!   the relayer and operators; it is not rolled back here.
//! - L2->L1 is direct: a native or token transfer to the bridge endpoint
//!   on L2, with the record created only once the wallet has accepted the
//!   transaction.

use alloy::primitives::Address;
use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::error::{BridgeError, ValidationError};
use crate::estimate::{self, BridgeQuote};
use crate::metrics;
use crate::payload;
use crate::relay::DepositRelay;
use crate::store::{
    ensure_monotonic, BridgeTransaction, BridgeTransactionPatch, NewBridgeTransaction,
    TransactionStore,
};
use crate::types::{BridgePhase, Direction, L1Address, Network, TokenInfo, TokenKind, TxStatus};
use crate::wallet::{L1Wallet, L2Wallet, WalletError, WalletStatus};

/// Orchestrator tunables, fixed at construction.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Smallest transferable display amount, enforced before any
    /// collaborator call.
    pub min_amount: BigDecimal,
    /// Required prefix of L1 recipient addresses.
    pub l1_address_prefix: String,
    /// Bridge endpoint on L2 that receives withdrawals.
    pub l2_bridge_address: Address,
    /// Total tries for attaching the broadcast hash to a deposit record.
    pub attach_attempts: u32,
    pub attach_retry_delay: Duration,
}

impl BridgeSettings {
    pub fn new(l2_bridge_address: Address) -> Self {
        BridgeSettings {
            // 0.01 display units
            min_amount: BigDecimal::new(1.into(), 2),
            l1_address_prefix: "kas".to_string(),
            l2_bridge_address,
            attach_attempts: 3,
            attach_retry_delay: Duration::from_secs(2),
        }
    }
}

/// A user-submitted bridge request, as it arrives from the presentation
/// layer. Optional fields stay optional so validation can report exactly
/// what is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub direction: Direction,
    pub amount: Option<BigDecimal>,
    /// Final recipient on the destination ledger.
    pub recipient: Option<String>,
    /// L2->L1 only: the token to withdraw; absent means native KAS.
    pub token: Option<TokenInfo>,
}

/// Result of a finished attempt. Cancellation is a non-error outcome:
/// nothing is surfaced to the user for it.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeOutcome {
    Submitted(BridgeTransaction),
    Cancelled,
}

pub struct BridgeOrchestrator {
    l1_wallet: Arc<dyn L1Wallet>,
    l2_wallet: Arc<dyn L2Wallet>,
    relay: Arc<dyn DepositRelay>,
    store: Arc<dyn TransactionStore>,
    settings: BridgeSettings,
    phase: Mutex<BridgePhase>,
}

impl BridgeOrchestrator {
    pub fn new(
        l1_wallet: Arc<dyn L1Wallet>,
        l2_wallet: Arc<dyn L2Wallet>,
        relay: Arc<dyn DepositRelay>,
        store: Arc<dyn TransactionStore>,
        settings: BridgeSettings,
    ) -> Self {
        BridgeOrchestrator {
            l1_wallet,
            l2_wallet,
            relay,
            store,
            settings,
            phase: Mutex::new(BridgePhase::Idle),
        }
    }

    /// Current attempt phase; readable concurrently with a running attempt.
    pub fn phase(&self) -> BridgePhase {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Execute one bridge attempt end to end.
    ///
    /// Re-entrancy is refused while an attempt is in flight: `IDLE` is the
    /// only phase a new attempt may begin from.
    pub async fn execute_bridge(
        &self,
        request: BridgeRequest,
    ) -> Result<BridgeOutcome, BridgeError> {
        self.begin_attempt()?;
        let direction = request.direction;
        metrics::record_bridge_attempt(direction.as_str());
        let started = Instant::now();

        let result = match self.run_attempt(request).await {
            // Rejection anywhere in the attempt is a silent cancellation.
            Err(BridgeError::UserCancelled) => Ok(BridgeOutcome::Cancelled),
            other => other,
        };

        match &result {
            Ok(BridgeOutcome::Submitted(tx)) => {
                self.finish_attempt(BridgePhase::Confirmed);
                metrics::record_bridge_completed(direction.as_str(), started.elapsed().as_secs_f64());
                metrics::record_volume(direction.as_str(), tx.amount.to_f64().unwrap_or(0.0));
                info!(
                    direction = %direction,
                    record_id = %tx.id,
                    tx_hash = ?tx.tx_hash,
                    "Bridge attempt confirmed"
                );
            }
            Ok(BridgeOutcome::Cancelled) => {
                self.finish_attempt(BridgePhase::Cancelled);
                metrics::record_bridge_cancelled(direction.as_str());
                info!(direction = %direction, "Bridge attempt cancelled in wallet");
            }
            Err(e) => {
                self.finish_attempt(BridgePhase::Failed);
                metrics::record_bridge_failed(direction.as_str(), e.kind());
                warn!(direction = %direction, kind = e.kind(), error = %e, "Bridge attempt failed");
            }
        }

        result
    }

    async fn run_attempt(&self, request: BridgeRequest) -> Result<BridgeOutcome, BridgeError> {
        let quote = estimate::estimate(request.direction, request.amount.as_ref());
        let flow = self.validate(request).await?;
        flow.run(self, &quote).await
    }

    // ------------------------------------------------------------------
    // Phase tracking
    // ------------------------------------------------------------------

    fn begin_attempt(&self) -> Result<(), BridgeError> {
        let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());
        if *phase != BridgePhase::Idle {
            return Err(ValidationError::AttemptInProgress.into());
        }
        *phase = BridgePhase::Submitting;
        Ok(())
    }

    fn advance_phase(&self, next: BridgePhase) {
        let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());
        if phase.can_advance(next) {
            *phase = next;
        } else {
            error!(from = %*phase, to = %next, "Illegal bridge phase transition ignored");
            debug_assert!(false, "illegal bridge phase transition");
        }
    }

    /// Close the attempt on `terminal` and reset the tracker to idle.
    fn finish_attempt(&self, terminal: BridgePhase) {
        let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());
        if *phase != terminal {
            if phase.can_advance(terminal) {
                *phase = terminal;
            } else {
                error!(from = %*phase, to = %terminal, "Illegal bridge phase transition ignored");
                debug_assert!(false, "illegal bridge phase transition");
            }
        }
        *phase = BridgePhase::Idle;
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Validate the request against wallet state and return the flow that
    /// will execute it. Nothing leaves the process before this passes.
    async fn validate(
        &self,
        request: BridgeRequest,
    ) -> Result<Box<dyn TransferFlow>, BridgeError> {
        let amount = request
            .amount
            .clone()
            .ok_or(ValidationError::MissingAmount)?;
        if amount <= BigDecimal::from(0) {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        if amount < self.settings.min_amount {
            return Err(ValidationError::BelowMinimum {
                min: self.settings.min_amount.to_string(),
            }
            .into());
        }

        if request.token.is_some() && request.direction == Direction::L1ToL2 {
            return Err(ValidationError::TokenNotAllowed.into());
        }

        // Both wallets must report a connected, authorized state; a status
        // probe failure counts as disconnected.
        let l1_status = self.wallet_status_l1().await;
        let l2_status = self.wallet_status_l2().await;
        if !l1_status.connected {
            return Err(ValidationError::WalletNotConnected {
                network: Network::L1,
            }
            .into());
        }
        if !l2_status.connected {
            return Err(ValidationError::WalletNotConnected {
                network: Network::L2,
            }
            .into());
        }

        let recipient = request
            .recipient
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingRecipient)?;

        match request.direction {
            Direction::L1ToL2 => {
                let to = Address::from_str(recipient)
                    .map_err(|e| ValidationError::InvalidRecipient(e.to_string()))?;
                let from_address = l1_status.address.ok_or(ValidationError::WalletNotConnected {
                    network: Network::L1,
                })?;

                let needed = crate::units::to_l1_units(&amount)
                    .map_err(|e| ValidationError::InvalidAmount(e.to_string()))?;
                let available = self
                    .l1_wallet
                    .balance()
                    .await
                    .map_err(|e| self.map_wallet_error(Network::L1, e))?;
                if needed > available {
                    return Err(ValidationError::InsufficientBalance.into());
                }

                Ok(Box::new(RelayDepositFlow {
                    amount,
                    from_address,
                    to,
                }))
            }
            Direction::L2ToL1 => {
                let to = L1Address::parse(recipient)
                    .map_err(|e| ValidationError::InvalidRecipient(e.to_string()))?;
                if to.prefix() != self.settings.l1_address_prefix {
                    return Err(ValidationError::InvalidRecipient(format!(
                        "expected a {}-prefixed L1 address",
                        self.settings.l1_address_prefix
                    ))
                    .into());
                }

                let from_address = l2_status.address.ok_or(ValidationError::WalletNotConnected {
                    network: Network::L2,
                })?;
                let from = Address::from_str(&from_address).map_err(|e| {
                    BridgeError::WalletSubmissionFailed(format!(
                        "L2 wallet reported an invalid address: {e}"
                    ))
                })?;

                let token = request.token.clone();
                let needed = match &token {
                    None => crate::units::to_l2_units(&amount),
                    Some(t) => crate::units::to_scaled_units(&amount, t.decimals),
                }
                .map_err(|e| ValidationError::InvalidAmount(e.to_string()))?;
                let available = self
                    .l2_wallet
                    .balance(token.as_ref().map(|t| t.address))
                    .await
                    .map_err(|e| self.map_wallet_error(Network::L2, e))?;
                if needed > available {
                    return Err(ValidationError::InsufficientBalance.into());
                }

                Ok(Box::new(DirectWithdrawFlow {
                    amount,
                    from,
                    from_address,
                    to,
                    token,
                }))
            }
        }
    }

    async fn wallet_status_l1(&self) -> WalletStatus {
        self.l1_wallet.status().await.unwrap_or(WalletStatus {
            connected: false,
            address: None,
        })
    }

    async fn wallet_status_l2(&self) -> WalletStatus {
        self.l2_wallet.status().await.unwrap_or(WalletStatus {
            connected: false,
            address: None,
        })
    }

    // ------------------------------------------------------------------
    // Collaborator error normalization
    // ------------------------------------------------------------------

    fn map_wallet_error(&self, network: Network, err: WalletError) -> BridgeError {
        metrics::record_wallet_error(network.as_str(), err.kind());
        match err {
            WalletError::Rejected => BridgeError::UserCancelled,
            other => BridgeError::WalletSubmissionFailed(other.to_string()),
        }
    }

    /// Attach the broadcast hash to the deposit record, retrying a bounded
    /// number of times. On exhaustion the divergence between on-chain and
    /// recorded state is logged for manual reconciliation; the broadcast
    /// transaction is never rolled back.
    async fn attach_with_retry(
        &self,
        deposit_id: &str,
        tx_hash: &str,
        record_id: &str,
    ) -> Result<(), BridgeError> {
        let mut attempt = 0u32;
        loop {
            match self.relay.attach_tx_hash(deposit_id, tx_hash).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempt += 1;
                    if attempt < self.settings.attach_attempts {
                        warn!(
                            deposit_id,
                            tx_hash,
                            attempt,
                            error = %err,
                            "Attaching transaction hash failed, retrying"
                        );
                        tokio::time::sleep(self.settings.attach_retry_delay).await;
                        continue;
                    }
                    error!(
                        deposit_id,
                        tx_hash,
                        record_id,
                        error = %err,
                        "Funding transaction broadcast but the deposit record could not be \
                         linked to it; manual reconciliation required"
                    );
                    return Err(err);
                }
            }
        }
    }
}

// ============================================================================
// Per-direction flows
// ============================================================================

/// One transfer protocol path, selected by direction at validation time.
#[async_trait]
trait TransferFlow: Send + Sync {
    async fn run(
        &self,
        orch: &BridgeOrchestrator,
        quote: &BridgeQuote,
    ) -> Result<BridgeOutcome, BridgeError>;
}

/// L1->L2: custodial deposit through the relay.
struct RelayDepositFlow {
    amount: BigDecimal,
    from_address: String,
    to: Address,
}

#[async_trait]
impl TransferFlow for RelayDepositFlow {
    async fn run(
        &self,
        orch: &BridgeOrchestrator,
        quote: &BridgeQuote,
    ) -> Result<BridgeOutcome, BridgeError> {
        let grant = orch.relay.create_deposit(&self.amount, self.to).await?;
        orch.advance_phase(BridgePhase::AwaitingRelayDeposit);

        // The relay hands out the custodial address the user must fund; it
        // must be a spendable L1 address or nothing can proceed.
        let custodial = L1Address::parse(&grant.bridge_wallet).map_err(|e| {
            BridgeError::RelayUnavailable(format!("relay returned an invalid custodial address: {e}"))
        })?;

        let record = NewBridgeTransaction {
            from_network: Network::L1,
            to_network: Network::L2,
            from_address: self.from_address.clone(),
            to_address: self.to.to_string(),
            amount: self.amount.clone(),
            token_type: TokenKind::Native,
            token_address: None,
            token_symbol: None,
            status: TxStatus::Pending,
            tx_hash: None,
            fee: quote.fee.clone(),
            estimated_minutes: quote.eta_minutes,
            deposit_id: Some(grant.deposit_id.clone()),
            bridge_wallet: Some(grant.bridge_wallet.clone()),
        };
        // Nothing is on chain yet: a store failure here aborts the attempt
        // as a retryable backend error. The relay-side deposit record stays
        // behind for the relayer and operators.
        let stored = orch.store.create(&record).await.map_err(|e| {
            warn!(deposit_id = %grant.deposit_id, error = %e, "Record creation failed before broadcast");
            BridgeError::RelayUnavailable(e.to_string())
        })?;

        let payment = payload::build_l1_payment(custodial, &self.amount)
            .map_err(|e| BridgeError::Validation(ValidationError::InvalidAmount(e.to_string())))?;
        let tx_hash = orch
            .l1_wallet
            .send(&payment.to, payment.amount)
            .await
            .map_err(|e| orch.map_wallet_error(Network::L1, e))?;

        // Our record first, then the relayer's linkage: the hash must not
        // be lost even if the relay update fails.
        ensure_monotonic(stored.status, TxStatus::Processing)
            .map_err(|e| BridgeError::RelayUpdateFailed(e.to_string()))?;
        let patch = BridgeTransactionPatch {
            status: Some(TxStatus::Processing),
            tx_hash: Some(tx_hash.clone()),
        };
        let updated = orch.store.update(&stored.id, &patch).await.map_err(|e| {
            error!(
                deposit_id = %grant.deposit_id,
                tx_hash = %tx_hash,
                record_id = %stored.id,
                error = %e,
                "Funding transaction broadcast but the record update failed; \
                 manual reconciliation required"
            );
            BridgeError::RelayUpdateFailed(e.to_string())
        })?;

        orch.attach_with_retry(&grant.deposit_id, &tx_hash, &stored.id)
            .await?;

        Ok(BridgeOutcome::Submitted(updated))
    }
}

/// L2->L1: direct transfer to the bridge endpoint, no relay step.
struct DirectWithdrawFlow {
    amount: BigDecimal,
    from: Address,
    from_address: String,
    to: L1Address,
    token: Option<TokenInfo>,
}

#[async_trait]
impl TransferFlow for DirectWithdrawFlow {
    async fn run(
        &self,
        orch: &BridgeOrchestrator,
        quote: &BridgeQuote,
    ) -> Result<BridgeOutcome, BridgeError> {
        let payload = payload::build_l2_payload(
            orch.settings.l2_bridge_address,
            self.token.as_ref(),
            &self.amount,
        )
        .map_err(|e| BridgeError::Validation(ValidationError::InvalidAmount(e.to_string())))?;

        // A rejection here leaves nothing behind: no record is ever created
        // for a withdrawal the wallet did not accept.
        let tx_hash = orch
            .l2_wallet
            .submit(&payload.to_request(self.from))
            .await
            .map_err(|e| orch.map_wallet_error(Network::L2, e))?;

        let (token_type, token_address, token_symbol) = match &self.token {
            Some(t) => (
                TokenKind::FungibleToken,
                Some(t.address.to_string()),
                Some(t.symbol.clone()),
            ),
            None => (TokenKind::Native, None, None),
        };
        let record = NewBridgeTransaction {
            from_network: Network::L2,
            to_network: Network::L1,
            from_address: self.from_address.clone(),
            to_address: self.to.as_str().to_string(),
            amount: self.amount.clone(),
            token_type,
            token_address,
            token_symbol,
            status: TxStatus::Processing,
            tx_hash: Some(tx_hash.clone()),
            fee: quote.fee.clone(),
            estimated_minutes: quote.eta_minutes,
            deposit_id: None,
            bridge_wallet: None,
        };
        // The transaction is already on chain; a store failure here is the
        // out-of-sync case, not a rollback.
        let stored = orch.store.create(&record).await.map_err(|e| {
            error!(
                tx_hash = %tx_hash,
                error = %e,
                "Withdrawal broadcast but the record could not be created; \
                 manual reconciliation required"
            );
            BridgeError::RelayUpdateFailed(e.to_string())
        })?;

        Ok(BridgeOutcome::Submitted(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{l1_test_address, MemoryStore, MockDepositRelay, MockL1Wallet, MockL2Wallet};

    fn settings() -> BridgeSettings {
        BridgeSettings::new(
            Address::from_str("0x1000000000000000000000000000000000000001").unwrap(),
        )
    }

    fn orchestrator_with(
        l1: MockL1Wallet,
        l2: MockL2Wallet,
        relay: MockDepositRelay,
        store: MemoryStore,
    ) -> BridgeOrchestrator {
        BridgeOrchestrator::new(
            Arc::new(l1),
            Arc::new(l2),
            Arc::new(relay),
            Arc::new(store),
            settings(),
        )
    }

    fn deposit_request(amount: &str) -> BridgeRequest {
        BridgeRequest {
            direction: Direction::L1ToL2,
            amount: Some(BigDecimal::from_str(amount).unwrap()),
            recipient: Some("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string()),
            token: None,
        }
    }

    #[tokio::test]
    async fn test_missing_amount_is_rejected_locally() {
        let orch = orchestrator_with(
            MockL1Wallet::funded(10_000_000_000),
            MockL2Wallet::funded_native("100"),
            MockDepositRelay::granting("d1"),
            MemoryStore::new(),
        );
        let mut request = deposit_request("1");
        request.amount = None;
        let err = orch.execute_bridge(request).await.unwrap_err();
        assert_eq!(err, BridgeError::Validation(ValidationError::MissingAmount));
        assert_eq!(orch.phase(), BridgePhase::Idle);
    }

    #[tokio::test]
    async fn test_token_on_deposit_path_is_rejected() {
        let orch = orchestrator_with(
            MockL1Wallet::funded(10_000_000_000),
            MockL2Wallet::funded_native("100"),
            MockDepositRelay::granting("d1"),
            MemoryStore::new(),
        );
        let mut request = deposit_request("1");
        request.token = Some(TokenInfo {
            address: Address::ZERO,
            symbol: "USDT".to_string(),
            decimals: 6,
        });
        let err = orch.execute_bridge(request).await.unwrap_err();
        assert_eq!(err, BridgeError::Validation(ValidationError::TokenNotAllowed));
    }

    #[tokio::test]
    async fn test_disconnected_wallet_is_rejected_before_any_call() {
        let relay = MockDepositRelay::granting("d1");
        let orch = orchestrator_with(
            MockL1Wallet::disconnected(),
            MockL2Wallet::funded_native("100"),
            relay.clone(),
            MemoryStore::new(),
        );
        let err = orch.execute_bridge(deposit_request("1")).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::Validation(ValidationError::WalletNotConnected {
                network: Network::L1
            })
        );
        assert_eq!(relay.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_balance_is_rejected() {
        // 0.5 KAS available, 1 requested.
        let orch = orchestrator_with(
            MockL1Wallet::funded(50_000_000),
            MockL2Wallet::funded_native("100"),
            MockDepositRelay::granting("d1"),
            MemoryStore::new(),
        );
        let err = orch.execute_bridge(deposit_request("1")).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::Validation(ValidationError::InsufficientBalance)
        );
    }

    #[tokio::test]
    async fn test_withdraw_recipient_must_be_l1_address() {
        let orch = orchestrator_with(
            MockL1Wallet::funded(10_000_000_000),
            MockL2Wallet::funded_native("100"),
            MockDepositRelay::granting("d1"),
            MemoryStore::new(),
        );
        let request = BridgeRequest {
            direction: Direction::L2ToL1,
            amount: Some(BigDecimal::from_str("1").unwrap()),
            recipient: Some("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string()),
            token: None,
        };
        let err = orch.execute_bridge(request).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn test_withdraw_recipient_prefix_must_match() {
        let orch = orchestrator_with(
            MockL1Wallet::funded(10_000_000_000),
            MockL2Wallet::funded_native("100"),
            MockDepositRelay::granting("d1"),
            MemoryStore::new(),
        );
        // Valid bech32 but a foreign prefix.
        let foreign = {
            use bech32::{ToBase32, Variant};
            bech32::encode("ltc", [3u8; 20].to_base32(), Variant::Bech32).unwrap()
        };
        let request = BridgeRequest {
            direction: Direction::L2ToL1,
            amount: Some(BigDecimal::from_str("1").unwrap()),
            recipient: Some(foreign),
            token: None,
        };
        let err = orch.execute_bridge(request).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn test_custodial_address_from_relay_is_validated() {
        let relay = MockDepositRelay::granting_with_wallet("d1", "not-a-bech32-address");
        let store = MemoryStore::new();
        let orch = orchestrator_with(
            MockL1Wallet::funded(10_000_000_000),
            MockL2Wallet::funded_native("100"),
            relay,
            store,
        );
        let err = orch.execute_bridge(deposit_request("1")).await.unwrap_err();
        assert!(matches!(err, BridgeError::RelayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_l1_test_address_parses() {
        assert!(L1Address::parse(&l1_test_address("kas", 1)).is_ok());
    }
}
