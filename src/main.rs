use std::sync::Arc;
use std::time::Duration;

use kas_bridge::api::{self, AppState};
use kas_bridge::config::Config;
use kas_bridge::metrics;
use kas_bridge::orchestrator::BridgeOrchestrator;
use kas_bridge::relay::HttpDepositRelay;
use kas_bridge::store::HttpTransactionStore;
use kas_bridge::wallet::{RemoteL1Wallet, RemoteL2Wallet};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    tracing::info!("Starting KAS bridge orchestrator");

    let config = Config::load()?;
    tracing::info!(
        api_bind = %config.api.bind,
        relay = %config.relay.endpoint,
        l2_bridge = %config.bridge.l2_bridge_address,
        "Configuration loaded"
    );

    let relay = Arc::new(HttpDepositRelay::new(
        &config.relay.endpoint,
        Duration::from_millis(config.relay.timeout_ms),
    )?);
    let store = Arc::new(HttpTransactionStore::new(
        &config.store.base_url,
        config.store.api_key.clone(),
    )?);
    let l1_wallet = Arc::new(RemoteL1Wallet::new(&config.wallets.l1_url)?);
    let l2_wallet = Arc::new(RemoteL2Wallet::new(&config.wallets.l2_url)?);

    let orchestrator = Arc::new(BridgeOrchestrator::new(
        l1_wallet,
        l2_wallet,
        relay,
        store,
        config.bridge.settings(),
    ));
    tracing::info!("Orchestrator initialized");

    metrics::UP.set(1.0);

    let state = AppState::new(orchestrator);
    api::serve(config.api.bind, state, wait_for_shutdown_signal()).await?;

    metrics::UP.set(0.0);
    tracing::info!("KAS bridge orchestrator stopped");
    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kas_bridge=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
