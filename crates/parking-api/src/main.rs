//! Parking API Service
//!
//! REST API for parking lot occupancy, history and statistics

use anyhow::{Context, Result};
use parking_api::{create_router, AppState, Config, Store};
use parking_core::{ParkingLot, SystemClock};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "parking_api=debug,parking_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Parking API Service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Storage backend: {:?}", config.storage);
    info!(
        "Lot: {} spaces, fees {:?}, occupy policy {:?}",
        config.lot.spot_count, config.lot.fees, config.lot.occupy_policy
    );

    // Initialize storage
    let store = Store::connect(&config)
        .await
        .context("Failed to initialize storage")?;

    let lot = ParkingLot::new(store, Arc::new(SystemClock), config.lot);
    lot.initialize()
        .await
        .context("Failed to initialize parking spaces")?;

    // Create router
    let app = create_router(AppState { lot });

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Parking API running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
