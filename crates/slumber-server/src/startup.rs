//! Server startup utilities.

use slumber_config::AppConfig;
use tokio::signal;
use tracing::{error, info};

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
         __                    __
   _____/ /_  ______ ___  ____/ /_  ___  _____
  / ___/ / / / / __ `__ \/ __  / _ \/ ___/
 (__  ) / /_/ / / / / / / /_/ /  __/ /
/____/_/\__,_/_/ /_/ /_/_.___/\___/_/
    "#);
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig, models: usize) {
    let separator = "=".repeat(60);
    let base = format!("http://{}", config.server.addr());
    info!("{}", separator);
    info!("Applications: {}{} ({} models)", base, config.server.root, models);
    info!("Health:       {}/health", base);
    if config.authentication.enabled {
        info!(
            "Remote users: header {} via service '{}'",
            config.authentication.header, config.authentication.service
        );
    }
    info!("{}", separator);
}

/// Resolves when the process receives Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
