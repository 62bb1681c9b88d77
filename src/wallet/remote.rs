//! HTTP-backed wallet providers.
//!
//! The signing wallets live outside this process; these clients speak to
//! their local provider endpoints and translate every provider failure
//! through [`normalize_provider_error`] so callers only ever see the
//! normalized taxonomy.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use reqwest::Client;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{
    normalize_provider_error, L1Wallet, L2TransactionRequest, L2Wallet, WalletError, WalletStatus,
};
use crate::types::L1Address;

/// Wire shape of a provider-reported failure.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

fn transport_error(e: reqwest::Error) -> WalletError {
    if e.is_connect() || e.is_timeout() {
        WalletError::NotAvailable
    } else {
        WalletError::Transport(e.to_string())
    }
}

async fn error_from_response(response: reqwest::Response) -> WalletError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ProviderErrorBody>(&text) {
        Ok(body) => {
            let message = body.message.unwrap_or_else(|| text.clone());
            normalize_provider_error(body.code, &message)
        }
        Err(_) if !text.is_empty() => normalize_provider_error(None, &text),
        Err(_) => normalize_provider_error(None, status.as_str()),
    }
}

// No overall request timeout: a signing request stays open for as long as
// the user takes to approve or reject in their wallet. Only the connection
// attempt itself is bounded.
fn build_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .wrap_err("Failed to create wallet provider HTTP client")
}

// ============================================================================
// L1 provider
// ============================================================================

#[derive(Debug, Deserialize)]
struct L1BalanceResponse {
    balance: u64,
}

#[derive(Debug, Deserialize)]
struct L1SendResponse {
    tx_id: String,
}

/// Client for the L1 wallet provider endpoint.
pub struct RemoteL1Wallet {
    base_url: String,
    client: Client,
}

impl RemoteL1Wallet {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client()?,
        })
    }
}

#[async_trait]
impl L1Wallet for RemoteL1Wallet {
    async fn status(&self) -> Result<WalletStatus, WalletError> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json::<WalletStatus>()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))
    }

    async fn balance(&self) -> Result<u64, WalletError> {
        let response = self
            .client
            .get(format!("{}/balance", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body: L1BalanceResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        Ok(body.balance)
    }

    async fn send(&self, to: &L1Address, amount: u64) -> Result<String, WalletError> {
        debug!(to = %to, amount, "Requesting L1 payment from wallet provider");
        let response = self
            .client
            .post(format!("{}/send", self.base_url))
            .json(&serde_json::json!({
                "to": to.as_str(),
                "amount": amount,
            }))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body: L1SendResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        Ok(body.tx_id)
    }
}

// ============================================================================
// L2 provider
// ============================================================================

#[derive(Debug, Deserialize)]
struct L2BalanceResponse {
    /// Decimal base-unit balance as a string; U256 exceeds JSON numbers.
    balance: String,
}

#[derive(Debug, Deserialize)]
struct L2SubmitResponse {
    hash: String,
}

/// Client for the L2 wallet provider endpoint.
pub struct RemoteL2Wallet {
    base_url: String,
    client: Client,
}

impl RemoteL2Wallet {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client()?,
        })
    }
}

#[async_trait]
impl L2Wallet for RemoteL2Wallet {
    async fn status(&self) -> Result<WalletStatus, WalletError> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json::<WalletStatus>()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))
    }

    async fn balance(&self, token: Option<Address>) -> Result<U256, WalletError> {
        let mut request = self.client.get(format!("{}/balance", self.base_url));
        if let Some(token) = token {
            request = request.query(&[("token", token.to_string())]);
        }
        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body: L2BalanceResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        U256::from_str(&body.balance)
            .map_err(|e| WalletError::Transport(format!("invalid balance payload: {e}")))
    }

    async fn submit(&self, tx: &L2TransactionRequest) -> Result<String, WalletError> {
        debug!(from = %tx.from, to = %tx.to, "Requesting L2 transaction from wallet provider");
        let response = self
            .client
            .post(format!("{}/transactions", self.base_url))
            .json(tx)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body: L2SubmitResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        Ok(body.hash)
    }
}
