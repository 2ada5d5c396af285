//! Runnable swap-handshake coordinator.
//!
//! Configuration comes from the environment:
//! - `PORT`     — HTTP surface (session create/lookup), default 6000
//! - `WS_PORT`  — WebSocket transport, default 6001
//! - `RUST_LOG` — tracing filter, default `info`

use accord::prelude::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), AccordError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let http_port =
        std::env::var("PORT").unwrap_or_else(|_| "6000".to_string());
    let ws_port =
        std::env::var("WS_PORT").unwrap_or_else(|_| "6001".to_string());

    let server = AccordServerBuilder::new()
        .http_bind(&format!("0.0.0.0:{http_port}"))
        .bind(&format!("0.0.0.0:{ws_port}"))
        .build(MemoryStore::new())
        .await?;

    tracing::info!(%http_port, %ws_port, "swap server starting");
    server.run().await
}
