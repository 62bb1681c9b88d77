//! HTTP surface for the bridge.
//!
//! Endpoints:
//! - GET  /health        - liveness check
//! - GET  /metrics       - Prometheus metrics
//! - GET  /estimate      - fee and settlement-time quote
//! - POST /bridge        - execute a bridge attempt
//! - GET  /form          - current form state and submit label
//! - PUT  /form          - update amount / recipient / token
//! - POST /form/toggle   - flip the transfer direction
//! - POST /form/submit   - execute the attempt described by the form

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bigdecimal::BigDecimal;
use eyre::Result;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::BridgeError;
use crate::estimate::{self, BridgeQuote};
use crate::form::BridgeForm;
use crate::orchestrator::{BridgeOrchestrator, BridgeOutcome, BridgeRequest};
use crate::store::BridgeTransaction;
use crate::types::{Direction, TokenInfo};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BridgeOrchestrator>,
    pub form: Arc<RwLock<BridgeForm>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<BridgeOrchestrator>) -> Self {
        AppState {
            orchestrator,
            form: Arc::new(RwLock::new(BridgeForm::new())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/estimate", get(quote))
        .route("/bridge", post(execute))
        .route("/form", get(form_view).put(form_update))
        .route("/form/toggle", post(form_toggle))
        .route("/form/submit", post(form_submit))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "API server started");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ============================================================================
// Error mapping
// ============================================================================

/// HTTP rendering of a bridge failure. Cancellation never reaches this
/// type: it is a non-error outcome.
struct ApiError(BridgeError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retryable) = match &self.0 {
            BridgeError::Validation(_) => (StatusCode::BAD_REQUEST, false),
            BridgeError::RelayUnavailable(_) => (StatusCode::BAD_GATEWAY, true),
            BridgeError::RelayUpdateFailed(_) => (StatusCode::BAD_GATEWAY, false),
            BridgeError::WalletSubmissionFailed(_) => (StatusCode::BAD_GATEWAY, false),
            // Converted to an Ok outcome by the orchestrator; kept total.
            BridgeError::UserCancelled => {
                return (StatusCode::OK, Json(serde_json::json!({ "status": "cancelled" })))
                    .into_response()
            }
        };
        let body = serde_json::json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
            "retryable": retryable,
        });
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "OK"
}

async fn metrics_text() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "encoding failed").into_response();
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct QuoteParams {
    direction: Direction,
    #[serde(default)]
    amount: Option<String>,
}

async fn quote(Query(params): Query<QuoteParams>) -> Result<Json<BridgeQuote>, ApiError> {
    let amount = parse_amount(params.amount.as_deref())?;
    Ok(Json(estimate::estimate(params.direction, amount.as_ref())))
}

#[derive(Debug, Deserialize)]
struct BridgeBody {
    direction: Direction,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    recipient: Option<String>,
    #[serde(default)]
    token: Option<TokenInfo>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum BridgeResponse {
    Submitted { transaction: BridgeTransaction },
    Cancelled,
}

async fn execute(
    State(state): State<AppState>,
    Json(body): Json<BridgeBody>,
) -> Result<Json<BridgeResponse>, ApiError> {
    let request = BridgeRequest {
        direction: body.direction,
        amount: parse_amount(body.amount.as_deref())?,
        recipient: body.recipient,
        token: body.token,
    };
    let outcome = state.orchestrator.execute_bridge(request).await.map_err(ApiError)?;
    Ok(Json(match outcome {
        BridgeOutcome::Submitted(transaction) => BridgeResponse::Submitted { transaction },
        BridgeOutcome::Cancelled => BridgeResponse::Cancelled,
    }))
}

#[derive(Debug, Serialize)]
struct FormView {
    #[serde(flatten)]
    form: BridgeForm,
    submit_label: String,
}

async fn form_view(State(state): State<AppState>) -> Json<FormView> {
    let form = state.form.read().await;
    Json(FormView {
        submit_label: form.submit_label(),
        form: form.clone(),
    })
}

#[derive(Debug, Deserialize)]
struct FormUpdate {
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    recipient: Option<String>,
    #[serde(default)]
    token: Option<TokenInfo>,
}

async fn form_update(
    State(state): State<AppState>,
    Json(update): Json<FormUpdate>,
) -> Result<Json<FormView>, ApiError> {
    let mut form = state.form.write().await;
    if update.amount.is_some() {
        form.set_amount(parse_amount(update.amount.as_deref())?);
    }
    if update.recipient.is_some() {
        form.set_recipient(update.recipient);
    }
    if update.token.is_some() {
        form.select_token(update.token)
            .map_err(|e| ApiError(e.into()))?;
    }
    Ok(Json(FormView {
        submit_label: form.submit_label(),
        form: form.clone(),
    }))
}

async fn form_toggle(State(state): State<AppState>) -> Json<FormView> {
    let mut form = state.form.write().await;
    form.toggle_direction();
    Json(FormView {
        submit_label: form.submit_label(),
        form: form.clone(),
    })
}

async fn form_submit(
    State(state): State<AppState>,
) -> Result<Json<BridgeResponse>, ApiError> {
    let request = state.form.read().await.to_request();
    match state.orchestrator.execute_bridge(request).await {
        Ok(BridgeOutcome::Submitted(transaction)) => {
            state.form.write().await.reset_after_submit();
            Ok(Json(BridgeResponse::Submitted { transaction }))
        }
        Ok(BridgeOutcome::Cancelled) => Ok(Json(BridgeResponse::Cancelled)),
        Err(err) => {
            state.form.write().await.set_error(err.to_string());
            Err(ApiError(err))
        }
    }
}

fn parse_amount(raw: Option<&str>) -> Result<Option<BigDecimal>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => BigDecimal::from_str(s.trim())
            .map(Some)
            .map_err(|e| {
                ApiError(BridgeError::Validation(
                    crate::error::ValidationError::InvalidAmount(e.to_string()),
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::BridgeSettings;
    use crate::testing::{l1_test_address, MemoryStore, MockDepositRelay, MockL1Wallet, MockL2Wallet};
    use alloy::primitives::Address;
    use std::future::IntoFuture;

    async fn spawn_api(orchestrator: BridgeOrchestrator) -> String {
        let state = AppState::new(Arc::new(orchestrator));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, router(state)).into_future());
        format!("http://{addr}")
    }

    fn orchestrator() -> BridgeOrchestrator {
        BridgeOrchestrator::new(
            Arc::new(MockL1Wallet::funded(10_000_000_000)),
            Arc::new(MockL2Wallet::funded_native("100")),
            Arc::new(MockDepositRelay::granting("d1")),
            Arc::new(MemoryStore::new()),
            BridgeSettings::new(
                Address::from_str("0x1000000000000000000000000000000000000001").unwrap(),
            ),
        )
    }

    #[tokio::test]
    async fn test_health_and_estimate() {
        let base = spawn_api(orchestrator()).await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(health.status(), 200);
        assert_eq!(health.text().await.unwrap(), "OK");

        let quote: serde_json::Value = client
            .get(format!("{base}/estimate"))
            .query(&[("direction", "L1_TO_L2"), ("amount", "5")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(quote["fee"], "0.005");
        assert_eq!(quote["net_receive"], "4.995");
        assert_eq!(quote["eta_minutes"], 3);
    }

    #[tokio::test]
    async fn test_bridge_endpoint_happy_path() {
        let base = spawn_api(orchestrator()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/bridge"))
            .json(&serde_json::json!({
                "direction": "L1_TO_L2",
                "amount": "5",
                "recipient": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "submitted");
        assert_eq!(body["transaction"]["deposit_id"], "d1");
        assert_eq!(body["transaction"]["status"], "processing");
    }

    #[tokio::test]
    async fn test_bridge_endpoint_validation_is_400() {
        let base = spawn_api(orchestrator()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/bridge"))
            .json(&serde_json::json!({
                "direction": "L1_TO_L2",
                "amount": "0.005",
                "recipient": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn test_form_toggle_resets_state() {
        let base = spawn_api(orchestrator()).await;
        let client = reqwest::Client::new();

        let view: serde_json::Value = client
            .put(format!("{base}/form"))
            .json(&serde_json::json!({ "amount": "10" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(view["submit_label"], "Bridge 10 KAS");

        let toggled: serde_json::Value = client
            .post(format!("{base}/form/toggle"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(toggled["direction"], "L2_TO_L1");
        assert!(toggled["amount"].is_null());
        assert_eq!(toggled["submit_label"], "Bridge");
    }

    #[tokio::test]
    async fn test_form_submit_records_error() {
        let orchestrator = BridgeOrchestrator::new(
            Arc::new(MockL1Wallet::funded(10_000_000_000)),
            Arc::new(MockL2Wallet::funded_native("100")),
            Arc::new(MockDepositRelay::unavailable("relay offline")),
            Arc::new(MemoryStore::new()),
            BridgeSettings::new(
                Address::from_str("0x1000000000000000000000000000000000000001").unwrap(),
            ),
        );
        let base = spawn_api(orchestrator).await;
        let client = reqwest::Client::new();

        client
            .put(format!("{base}/form"))
            .json(&serde_json::json!({
                "amount": "5",
                "recipient": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            }))
            .send()
            .await
            .unwrap();

        let response = client
            .post(format!("{base}/form/submit"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 502);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "relay_unavailable");
        assert_eq!(body["retryable"], true);

        let view: serde_json::Value = client
            .get(format!("{base}/form"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(view["error"].as_str().unwrap().contains("relay offline"));
    }

    #[test]
    fn test_l1_test_address_helper_prefix() {
        assert!(l1_test_address("kas", 3).starts_with("kas1"));
    }
}
