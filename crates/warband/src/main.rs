//! Warband battle server binary.
//!
//! Configuration comes from the environment:
//! - `WARBAND_ADDR` — listen address (default `127.0.0.1:8080`)
//! - `WARBAND_DATA_DIR` — persistence directory (default `data`)
//! - `WARBAND_IDLE_TIMEOUT_SECS` — drop connections silent this long
//!   (default 60)
//! - `RUST_LOG` — log filter (default `info`)

use std::time::Duration;

use warband::{WarbandError, WarbandServer};

#[tokio::main]
async fn main() -> Result<(), WarbandError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let addr = std::env::var("WARBAND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let data_dir = std::env::var("WARBAND_DATA_DIR")
        .unwrap_or_else(|_| "data".to_string());

    tracing::info!(%addr, %data_dir, "starting warband");
    let mut builder = WarbandServer::builder().bind(&addr).data_dir(&data_dir);
    if let Some(secs) = std::env::var("WARBAND_IDLE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        builder = builder.idle_timeout(Duration::from_secs(secs));
    }
    let server = builder.build().await?;

    server.run().await
}
