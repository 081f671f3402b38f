//! Liveness probe for uptime monitors.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::{error, info};

async fn alive() -> &'static str {
    "Bot is running!\n"
}

pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

/// Bind the probe and serve it in the background.
pub async fn spawn(port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind liveness probe on port {}", port))?;
    info!("HTTP server listening on port {}", port);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router()).await {
            error!("Liveness probe stopped: {}", e);
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_alive() {
        assert_eq!(alive().await, "Bot is running!\n");
    }

    #[tokio::test]
    async fn test_serves_on_ephemeral_port() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });

        let body = reqwest::get(format!("http://{}/", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "Bot is running!\n");
    }
}
