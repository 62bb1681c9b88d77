//! Test support: scripted mock collaborators.
//!
//! Hand-rolled fakes for the wallet, relay and record-store capabilities.
//! Each mock shares its interior state across clones so tests can keep a
//! handle for assertions after moving a clone into the orchestrator.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::BridgeError;
use crate::relay::{DepositGrant, DepositRelay};
use crate::store::{
    BridgeTransaction, BridgeTransactionPatch, NewBridgeTransaction, StoreError, TransactionStore,
};
use crate::types::L1Address;
use crate::wallet::{L1Wallet, L2TransactionRequest, L2Wallet, WalletError, WalletStatus};

/// A deterministic, checksum-valid bech32 address for tests.
pub fn l1_test_address(prefix: &str, seed: u8) -> String {
    use bech32::{ToBase32, Variant};
    bech32::encode(prefix, [seed; 20].to_base32(), Variant::Bech32)
        .expect("test address encodes")
}

// ============================================================================
// Wallets
// ============================================================================

#[derive(Clone)]
pub struct MockL1Wallet {
    connected: bool,
    address: String,
    balance: u64,
    send_result: Result<String, WalletError>,
    sent: Arc<Mutex<Vec<(L1Address, u64)>>>,
}

impl MockL1Wallet {
    pub fn funded(balance: u64) -> Self {
        MockL1Wallet {
            connected: true,
            address: l1_test_address("kas", 1),
            balance,
            send_result: Ok("0xabc".to_string()),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn disconnected() -> Self {
        let mut wallet = Self::funded(0);
        wallet.connected = false;
        wallet
    }

    /// The user declines every signing prompt.
    pub fn rejecting(mut self) -> Self {
        self.send_result = Err(WalletError::Rejected);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.send_result = Err(WalletError::Provider {
            code: None,
            message: message.to_string(),
        });
        self
    }

    pub fn returning_tx(mut self, tx_id: &str) -> Self {
        self.send_result = Ok(tx_id.to_string());
        self
    }

    /// Payments the wallet was asked to sign and broadcast.
    pub fn sent(&self) -> Vec<(L1Address, u64)> {
        self.sent.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl L1Wallet for MockL1Wallet {
    async fn status(&self) -> Result<WalletStatus, WalletError> {
        Ok(WalletStatus {
            connected: self.connected,
            address: self.connected.then(|| self.address.clone()),
        })
    }

    async fn balance(&self) -> Result<u64, WalletError> {
        Ok(self.balance)
    }

    async fn send(&self, to: &L1Address, amount: u64) -> Result<String, WalletError> {
        self.sent.lock().expect("mock lock").push((to.clone(), amount));
        self.send_result.clone()
    }
}

#[derive(Clone)]
pub struct MockL2Wallet {
    connected: bool,
    address: String,
    balance: U256,
    submit_result: Result<String, WalletError>,
    submit_delay: Option<Duration>,
    submitted: Arc<Mutex<Vec<L2TransactionRequest>>>,
}

impl MockL2Wallet {
    /// Connected wallet holding `kas` display units of native balance.
    pub fn funded_native(kas: &str) -> Self {
        let amount = BigDecimal::from_str(kas).expect("test amount parses");
        MockL2Wallet {
            connected: true,
            address: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
            balance: crate::units::to_l2_units(&amount).expect("test amount converts"),
            submit_result: Ok("0xdef".to_string()),
            submit_delay: None,
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Connected wallet holding `balance` base units (token tests).
    pub fn funded_units(balance: U256) -> Self {
        let mut wallet = Self::funded_native("0");
        wallet.balance = balance;
        wallet
    }

    pub fn disconnected() -> Self {
        let mut wallet = Self::funded_native("0");
        wallet.connected = false;
        wallet
    }

    pub fn rejecting(mut self) -> Self {
        self.submit_result = Err(WalletError::Rejected);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.submit_result = Err(WalletError::Provider {
            code: None,
            message: message.to_string(),
        });
        self
    }

    pub fn returning_hash(mut self, hash: &str) -> Self {
        self.submit_result = Ok(hash.to_string());
        self
    }

    /// Hold every submit call open for `delay` (re-entrancy tests).
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn submitted(&self) -> Vec<L2TransactionRequest> {
        self.submitted.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl L2Wallet for MockL2Wallet {
    async fn status(&self) -> Result<WalletStatus, WalletError> {
        Ok(WalletStatus {
            connected: self.connected,
            address: self.connected.then(|| self.address.clone()),
        })
    }

    async fn balance(&self, _token: Option<Address>) -> Result<U256, WalletError> {
        Ok(self.balance)
    }

    async fn submit(&self, tx: &L2TransactionRequest) -> Result<String, WalletError> {
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        self.submitted.lock().expect("mock lock").push(tx.clone());
        self.submit_result.clone()
    }
}

// ============================================================================
// Relay
// ============================================================================

#[derive(Clone)]
pub struct MockDepositRelay {
    create_result: Result<DepositGrant, BridgeError>,
    /// Scripted attach outcomes, consumed in order; empty means success.
    attach_script: Arc<Mutex<Vec<Result<(), BridgeError>>>>,
    create_calls: Arc<Mutex<u32>>,
    attach_calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockDepositRelay {
    pub fn granting(deposit_id: &str) -> Self {
        Self::granting_with_wallet(deposit_id, &l1_test_address("kas", 9))
    }

    pub fn granting_with_wallet(deposit_id: &str, bridge_wallet: &str) -> Self {
        MockDepositRelay {
            create_result: Ok(DepositGrant {
                deposit_id: deposit_id.to_string(),
                bridge_wallet: bridge_wallet.to_string(),
            }),
            attach_script: Arc::new(Mutex::new(Vec::new())),
            create_calls: Arc::new(Mutex::new(0)),
            attach_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn unavailable(message: &str) -> Self {
        let mut relay = Self::granting("unused");
        relay.create_result = Err(BridgeError::RelayUnavailable(message.to_string()));
        relay
    }

    /// Queue attach outcomes; once drained, further attaches succeed.
    pub fn with_attach_script(self, script: Vec<Result<(), BridgeError>>) -> Self {
        *self.attach_script.lock().expect("mock lock") = script;
        self
    }

    pub fn create_calls(&self) -> u32 {
        *self.create_calls.lock().expect("mock lock")
    }

    pub fn attach_calls(&self) -> Vec<(String, String)> {
        self.attach_calls.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl DepositRelay for MockDepositRelay {
    async fn create_deposit(
        &self,
        _amount: &BigDecimal,
        _l2_recipient: Address,
    ) -> Result<DepositGrant, BridgeError> {
        *self.create_calls.lock().expect("mock lock") += 1;
        self.create_result.clone()
    }

    async fn attach_tx_hash(&self, deposit_id: &str, tx_hash: &str) -> Result<(), BridgeError> {
        self.attach_calls
            .lock()
            .expect("mock lock")
            .push((deposit_id.to_string(), tx_hash.to_string()));
        let mut script = self.attach_script.lock().expect("mock lock");
        if script.is_empty() {
            Ok(())
        } else {
            script.remove(0)
        }
    }
}

// ============================================================================
// Record store
// ============================================================================

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<BridgeTransaction>>>,
    fail_create: Arc<Mutex<bool>>,
    fail_update: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create(self) -> Self {
        *self.fail_create.lock().expect("mock lock") = true;
        self
    }

    pub fn failing_update(self) -> Self {
        *self.fail_update.lock().expect("mock lock") = true;
        self
    }

    pub fn records(&self) -> Vec<BridgeTransaction> {
        self.records.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn create(&self, tx: &NewBridgeTransaction) -> Result<BridgeTransaction, StoreError> {
        if *self.fail_create.lock().expect("mock lock") {
            return Err(StoreError::Transport("record backend is down".to_string()));
        }
        tx.validate().map_err(|e| StoreError::Rejected(e.to_string()))?;
        let mut records = self.records.lock().expect("mock lock");
        let now = Utc::now();
        let record = BridgeTransaction {
            id: format!("rec-{}", records.len() + 1),
            from_network: tx.from_network,
            to_network: tx.to_network,
            from_address: tx.from_address.clone(),
            to_address: tx.to_address.clone(),
            amount: tx.amount.clone(),
            token_type: tx.token_type,
            token_address: tx.token_address.clone(),
            token_symbol: tx.token_symbol.clone(),
            status: tx.status,
            tx_hash: tx.tx_hash.clone(),
            fee: tx.fee.clone(),
            estimated_minutes: tx.estimated_minutes,
            deposit_id: tx.deposit_id.clone(),
            bridge_wallet: tx.bridge_wallet.clone(),
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        patch: &BridgeTransactionPatch,
    ) -> Result<BridgeTransaction, StoreError> {
        if *self.fail_update.lock().expect("mock lock") {
            return Err(StoreError::Transport("record backend is down".to_string()));
        }
        let mut records = self.records.lock().expect("mock lock");
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::Rejected(format!("no record with id {id}")))?;
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(tx_hash) = &patch.tx_hash {
            record.tx_hash = Some(tx_hash.clone());
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}
