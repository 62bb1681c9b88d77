//! Deposit relay client.
//!
//! The relay is the custodial service that receives L1 deposits and
//! credits the equivalent value on L2. For the L1->L2 path the
//! orchestrator first asks it for a deposit record and an assigned
//! custodial address, then attaches the funding transaction identifier
//! after broadcast. Calls are pure network round trips to a trusted
//! service and run under a short timeout so a dead relay surfaces
//! immediately instead of hanging the caller.

use alloy::primitives::Address;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use eyre::{Result, WrapErr};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::metrics;
use crate::types::Direction;

/// Identifiers returned by the relay for a newly created deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositGrant {
    /// Relay-side record identifier.
    pub deposit_id: String,
    /// Custodial address the user must fund on L1. Never the final
    /// recipient; that stays the user's own L2 address.
    pub bridge_wallet: String,
}

/// Capability interface for the deposit relay, injectable for tests.
#[async_trait]
pub trait DepositRelay: Send + Sync {
    /// Create a deposit record for `amount` destined for `l2_recipient`.
    ///
    /// Fails with [`BridgeError::RelayUnavailable`] when the call errors
    /// or the relay returns a non-success payload.
    async fn create_deposit(
        &self,
        amount: &BigDecimal,
        l2_recipient: Address,
    ) -> Result<DepositGrant, BridgeError>;

    /// Attach the broadcast transaction identifier to a deposit record.
    ///
    /// Fails with [`BridgeError::RelayUpdateFailed`]. The already
    /// broadcast transaction is never rolled back on this failure.
    async fn attach_tx_hash(&self, deposit_id: &str, tx_hash: &str) -> Result<(), BridgeError>;
}

/// Wire response of the relay's action endpoint.
#[derive(Debug, Clone, Deserialize)]
struct RelayResponse {
    success: bool,
    #[serde(default)]
    deposit_id: Option<String>,
    #[serde(default)]
    bridge_wallet: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the relay's single action-tagged endpoint.
pub struct HttpDepositRelay {
    endpoint: String,
    client: Client,
}

impl HttpDepositRelay {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("Failed to create relay HTTP client")?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }

    async fn post_action(
        &self,
        body: serde_json::Value,
    ) -> Result<RelayResponse, String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("relay request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("relay returned {status}: {text}"));
        }

        response
            .json::<RelayResponse>()
            .await
            .map_err(|e| format!("relay returned a malformed payload: {e}"))
    }
}

#[async_trait]
impl DepositRelay for HttpDepositRelay {
    async fn create_deposit(
        &self,
        amount: &BigDecimal,
        l2_recipient: Address,
    ) -> Result<DepositGrant, BridgeError> {
        debug!(%amount, recipient = %l2_recipient, "Requesting deposit record from relay");

        let body = serde_json::json!({
            "action": "createDeposit",
            "amount": amount.to_string(),
            "l2_address": l2_recipient.to_string(),
            "direction": Direction::L1ToL2,
        });

        let response = self.post_action(body).await.map_err(|e| {
            metrics::record_relay_error("create_deposit");
            BridgeError::RelayUnavailable(e)
        })?;

        if !response.success {
            metrics::record_relay_error("create_deposit");
            return Err(BridgeError::RelayUnavailable(
                response
                    .error
                    .unwrap_or_else(|| "relay rejected the deposit request".to_string()),
            ));
        }

        match (response.deposit_id, response.bridge_wallet) {
            (Some(deposit_id), Some(bridge_wallet)) => {
                info!(deposit_id = %deposit_id, "Deposit record created");
                Ok(DepositGrant {
                    deposit_id,
                    bridge_wallet,
                })
            }
            _ => {
                metrics::record_relay_error("create_deposit");
                Err(BridgeError::RelayUnavailable(
                    "relay response is missing deposit_id or bridge_wallet".to_string(),
                ))
            }
        }
    }

    async fn attach_tx_hash(&self, deposit_id: &str, tx_hash: &str) -> Result<(), BridgeError> {
        debug!(deposit_id, tx_hash, "Attaching transaction hash to deposit record");

        let body = serde_json::json!({
            "action": "attachTxHash",
            "deposit_id": deposit_id,
            "tx_hash": tx_hash,
        });

        let response = self.post_action(body).await.map_err(|e| {
            metrics::record_relay_error("attach_tx_hash");
            BridgeError::RelayUpdateFailed(e)
        })?;

        if !response.success {
            metrics::record_relay_error("attach_tx_hash");
            return Err(BridgeError::RelayUpdateFailed(
                response
                    .error
                    .unwrap_or_else(|| "relay rejected the record update".to_string()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn recipient() -> Address {
        Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
    }

    #[tokio::test]
    async fn test_create_deposit_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "action": "createDeposit",
                "amount": "5",
                "direction": "L1_TO_L2",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"deposit_id":"d1","bridge_wallet":"kas1custodial"}"#)
            .create_async()
            .await;

        let relay = HttpDepositRelay::new(&server.url(), Duration::from_secs(2)).unwrap();
        let grant = relay.create_deposit(&dec("5"), recipient()).await.unwrap();
        assert_eq!(grant.deposit_id, "d1");
        assert_eq!(grant.bridge_wallet, "kas1custodial");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_deposit_non_success_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"error":"deposit quota exceeded"}"#)
            .create_async()
            .await;

        let relay = HttpDepositRelay::new(&server.url(), Duration::from_secs(2)).unwrap();
        let err = relay
            .create_deposit(&dec("5"), recipient())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::RelayUnavailable("deposit quota exceeded".to_string())
        );
    }

    #[tokio::test]
    async fn test_create_deposit_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(503)
            .create_async()
            .await;

        let relay = HttpDepositRelay::new(&server.url(), Duration::from_secs(2)).unwrap();
        let err = relay
            .create_deposit(&dec("5"), recipient())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::RelayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_create_deposit_network_error_is_unavailable() {
        // Nothing is listening on this port.
        let relay =
            HttpDepositRelay::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let err = relay
            .create_deposit(&dec("5"), recipient())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::RelayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_attach_tx_hash_success_and_failure() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("POST", "/")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "action": "attachTxHash",
                "deposit_id": "d1",
                "tx_hash": "0xabc",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let relay = HttpDepositRelay::new(&server.url(), Duration::from_secs(2)).unwrap();
        relay.attach_tx_hash("d1", "0xabc").await.unwrap();
        ok.assert_async().await;

        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"error":"unknown deposit"}"#)
            .create_async()
            .await;
        let err = relay.attach_tx_hash("d2", "0xdef").await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::RelayUpdateFailed("unknown deposit".to_string())
        );
    }
}
