use anyhow::Context;
use ses_rs::api::ApiServer;
use ses_rs::config::{Config, LogFormat, LoggingConfig};
use ses_rs::dispatch::Dispatcher;
use ses_rs::storage::Stores;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable naming the config file when no argument is given
const CONFIG_ENV: &str = "SES_CONFIG";

fn init_logging(config: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ses_rs={0},tower_http={0}", config.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .map(PathBuf::from);

    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    init_logging(&config.logging);

    info!("Starting ses-rs v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded");
    info!("  Listening on: {}", config.server.listen_addr);
    info!("  Storage backend: {:?}", config.storage.backend);
    info!(
        "  Quota: {} sends per {}h",
        config.quota.max_sends, config.quota.tracking_hours
    );
    info!("  Sandbox: {}", config.sandbox.enabled);
    if config.failure.enabled {
        info!(
            "  Synthetic failures: {}%",
            config.failure.effective_percentage()
        );
    }

    let stores = Stores::open(&config.storage)
        .await
        .context("Failed to open storage")?;
    let dispatcher = Arc::new(Dispatcher::from_config(&config, &stores));

    let server = ApiServer::new(
        dispatcher,
        config.server.request_timeout(),
        config.server.listen_addr.clone(),
    );
    server.run(shutdown_signal()).await?;

    info!("ses-rs stopped");
    Ok(())
}
