//! Persistent bridge transaction records and the store client.
//!
//! The record store is an external managed backend reached over HTTP; this
//! module owns the record shapes and the client, not the persistence
//! itself. Records are single-writer (the orchestrator) and multi-reader
//! (status pages elsewhere poll them), so the only coordination needed is
//! that a status never moves backwards; [`ensure_monotonic`] is checked
//! before any update is issued.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::{Network, TokenKind, TxStatus};

/// A persisted bridge transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeTransaction {
    pub id: String,
    pub from_network: Network,
    pub to_network: Network,
    /// Source wallet address on the source ledger.
    pub from_address: String,
    /// Final recipient on the destination ledger, never the custodial
    /// relay address.
    pub to_address: String,
    /// Display-unit amount, always positive.
    pub amount: BigDecimal,
    pub token_type: TokenKind,
    pub token_address: Option<String>,
    pub token_symbol: Option<String>,
    pub status: TxStatus,
    /// Source-ledger transaction identifier; absent until the wallet
    /// submission succeeds.
    pub tx_hash: Option<String>,
    /// Fee snapshot taken at submission time, never recomputed.
    pub fee: BigDecimal,
    /// Settlement-time snapshot in minutes, taken at submission time.
    pub estimated_minutes: u32,
    /// L1->L2 only: relay-side deposit record identifier.
    pub deposit_id: Option<String>,
    /// L1->L2 only: custodial address assigned by the relay.
    pub bridge_wallet: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For creating new records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBridgeTransaction {
    pub from_network: Network,
    pub to_network: Network,
    pub from_address: String,
    pub to_address: String,
    pub amount: BigDecimal,
    pub token_type: TokenKind,
    pub token_address: Option<String>,
    pub token_symbol: Option<String>,
    pub status: TxStatus,
    pub tx_hash: Option<String>,
    pub fee: BigDecimal,
    pub estimated_minutes: u32,
    pub deposit_id: Option<String>,
    pub bridge_wallet: Option<String>,
}

impl NewBridgeTransaction {
    /// Check the record invariants before it leaves the process.
    pub fn validate(&self) -> Result<()> {
        if self.from_network == self.to_network {
            return Err(eyre!("from_network and to_network must differ"));
        }
        if self.amount <= BigDecimal::from(0) {
            return Err(eyre!("amount must be positive"));
        }
        match self.token_type {
            TokenKind::FungibleToken => {
                if self.token_address.is_none() || self.token_symbol.is_none() {
                    return Err(eyre!(
                        "fungible-token records require token_address and token_symbol"
                    ));
                }
            }
            TokenKind::Native => {
                if self.token_address.is_some() || self.token_symbol.is_some() {
                    return Err(eyre!("native records must not carry token metadata"));
                }
            }
        }
        Ok(())
    }
}

/// Partial update applied to an existing record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BridgeTransactionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TxStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// Reject a status change that would move a record backwards.
pub fn ensure_monotonic(current: TxStatus, next: TxStatus) -> Result<(), StoreError> {
    if current == next || current.can_transition_to(next) {
        Ok(())
    } else {
        Err(StoreError::StatusRegression {
            from: current,
            to: next,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record store request failed: {0}")]
    Transport(String),
    #[error("record store rejected the request: {0}")]
    Rejected(String),
    #[error("illegal status transition: {from} -> {to}")]
    StatusRegression { from: TxStatus, to: TxStatus },
}

/// Capability interface over the external record store.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(&self, tx: &NewBridgeTransaction) -> Result<BridgeTransaction, StoreError>;
    async fn update(
        &self,
        id: &str,
        patch: &BridgeTransactionPatch,
    ) -> Result<BridgeTransaction, StoreError>;
}

/// HTTP client for the managed record backend.
pub struct HttpTransactionStore {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

/// Custom Debug that redacts the API key.
impl fmt::Debug for HttpTransactionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransactionStore")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpTransactionStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .wrap_err("Failed to create record store HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn read_record(
        response: reqwest::Response,
    ) -> Result<BridgeTransaction, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected(format!("{status}: {text}")));
        }
        response
            .json::<BridgeTransaction>()
            .await
            .map_err(|e| StoreError::Rejected(format!("malformed record payload: {e}")))
    }
}

#[async_trait]
impl TransactionStore for HttpTransactionStore {
    async fn create(&self, tx: &NewBridgeTransaction) -> Result<BridgeTransaction, StoreError> {
        tx.validate().map_err(|e| StoreError::Rejected(e.to_string()))?;
        debug!(
            from = %tx.from_network,
            to = %tx.to_network,
            amount = %tx.amount,
            "Creating bridge transaction record"
        );
        let url = format!("{}/records", self.base_url);
        let response = self
            .request(self.client.post(&url).json(tx))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Self::read_record(response).await
    }

    async fn update(
        &self,
        id: &str,
        patch: &BridgeTransactionPatch,
    ) -> Result<BridgeTransaction, StoreError> {
        debug!(id, ?patch, "Updating bridge transaction record");
        let url = format!("{}/records/{}", self.base_url, id);
        let response = self
            .request(self.client.patch(&url).json(patch))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Self::read_record(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn new_record() -> NewBridgeTransaction {
        NewBridgeTransaction {
            from_network: Network::L1,
            to_network: Network::L2,
            from_address: "kas1source".to_string(),
            to_address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
            amount: dec("5"),
            token_type: TokenKind::Native,
            token_address: None,
            token_symbol: None,
            status: TxStatus::Pending,
            tx_hash: None,
            fee: dec("0.005"),
            estimated_minutes: 3,
            deposit_id: Some("d1".to_string()),
            bridge_wallet: Some("kas1custodial".to_string()),
        }
    }

    #[test]
    fn test_validate_networks_and_amount() {
        assert!(new_record().validate().is_ok());

        let mut same = new_record();
        same.to_network = Network::L1;
        assert!(same.validate().is_err());

        let mut zero = new_record();
        zero.amount = dec("0");
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_validate_token_metadata_pairing() {
        let mut token = new_record();
        token.token_type = TokenKind::FungibleToken;
        assert!(token.validate().is_err());
        token.token_address = Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string());
        token.token_symbol = Some("USDT".to_string());
        assert!(token.validate().is_ok());

        let mut native = new_record();
        native.token_symbol = Some("KAS".to_string());
        assert!(native.validate().is_err());
    }

    #[test]
    fn test_ensure_monotonic() {
        assert!(ensure_monotonic(TxStatus::Pending, TxStatus::Processing).is_ok());
        assert!(ensure_monotonic(TxStatus::Processing, TxStatus::Processing).is_ok());
        let err = ensure_monotonic(TxStatus::Completed, TxStatus::Processing).unwrap_err();
        assert_eq!(
            err,
            StoreError::StatusRegression {
                from: TxStatus::Completed,
                to: TxStatus::Processing,
            }
        );
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let patch = BridgeTransactionPatch {
            status: Some(TxStatus::Processing),
            tx_hash: None,
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"status":"processing"}"#);
    }

    #[tokio::test]
    async fn test_http_store_create_and_update() {
        let mut server = mockito::Server::new_async().await;
        let created = server
            .mock("POST", "/records")
            .match_header("authorization", "Bearer secret")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "id": "rec-1",
                    "from_network": "L1",
                    "to_network": "L2",
                    "from_address": "kas1source",
                    "to_address": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
                    "amount": "5",
                    "token_type": "native",
                    "token_address": null,
                    "token_symbol": null,
                    "status": "pending",
                    "tx_hash": null,
                    "fee": "0.005",
                    "estimated_minutes": 3,
                    "deposit_id": "d1",
                    "bridge_wallet": "kas1custodial",
                    "created_at": "2024-05-01T12:00:00Z",
                    "updated_at": "2024-05-01T12:00:00Z",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = HttpTransactionStore::new(&server.url(), Some("secret".to_string())).unwrap();
        let record = store.create(&new_record()).await.unwrap();
        assert_eq!(record.id, "rec-1");
        assert_eq!(record.status, TxStatus::Pending);
        created.assert_async().await;

        let updated = server
            .mock("PATCH", "/records/rec-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "id": "rec-1",
                    "from_network": "L1",
                    "to_network": "L2",
                    "from_address": "kas1source",
                    "to_address": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
                    "amount": "5",
                    "token_type": "native",
                    "token_address": null,
                    "token_symbol": null,
                    "status": "processing",
                    "tx_hash": "0xabc",
                    "fee": "0.005",
                    "estimated_minutes": 3,
                    "deposit_id": "d1",
                    "bridge_wallet": "kas1custodial",
                    "created_at": "2024-05-01T12:00:00Z",
                    "updated_at": "2024-05-01T12:00:30Z",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let patch = BridgeTransactionPatch {
            status: Some(TxStatus::Processing),
            tx_hash: Some("0xabc".to_string()),
        };
        let record = store.update("rec-1", &patch).await.unwrap();
        assert_eq!(record.status, TxStatus::Processing);
        assert_eq!(record.tx_hash.as_deref(), Some("0xabc"));
        updated.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_store_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/records")
            .with_status(422)
            .with_body("invalid record")
            .create_async()
            .await;

        let store = HttpTransactionStore::new(&server.url(), None).unwrap();
        let err = store.create(&new_record()).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }
}
