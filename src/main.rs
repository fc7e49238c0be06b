use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wardgate::{
    AppState,
    config::AppConfig,
    directory::MemoryDirectory,
    federation::FederationGateway,
    routes,
    session::MemorySessionStore,
    store::MemoryConnectionStore,
};

#[derive(Parser)]
#[command(name = "wardgate", about = "Enterprise SSO connection broker for ward-ops")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "wardgate.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wardgate=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    let gateway = FederationGateway::shared(&config.federation).await?;

    let directory = Arc::new(MemoryDirectory::new());
    let state = AppState::new(
        gateway,
        Arc::new(MemoryConnectionStore::new()),
        directory.clone(),
        directory,
        Arc::new(MemorySessionStore::new()),
        config.session.clone(),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "wardgate listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
