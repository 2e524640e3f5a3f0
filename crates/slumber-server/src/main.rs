//! # Slumber Server
//!
//! Serves the sample models over the Slumber protocol.

use slumber_config::ConfigLoader;
use slumber_core::{init_tracing, SlumberResult, TracingConfig};
use slumber_server::{demo::demo_app, startup::print_banner};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let _ = init_tracing(&TracingConfig::default());
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> SlumberResult<()> {
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get();

    init_tracing(&config.observability.tracing())?;
    print_banner();
    info!("Starting Slumber Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);

    demo_app(config).serve().await
}
