//! Accept loop (spec component C6, ambient): one task per connection, no
//! state shared across connections (spec §5).

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::time::{Duration, interval};
use tracing::{error, info};

use crate::config::Config;
use crate::connection;
use crate::error::Result;
use crate::handler::Handler;

/// Bind `config.address` and serve connections with `handler` until the
/// process is killed. The accept call is raced against a periodic tick so
/// a future shutdown signal can be layered on without blocking forever
/// inside `accept()` (same `tokio::select!` shape the teacher uses for its
/// ping loop).
pub async fn serve<H: Handler>(config: Config, handler: H) -> Result<()> {
    let listener = TcpListener::bind(&config.address).await?;
    info!(address = %config.address, "websocket server listening");

    let handler = Arc::new(handler);
    let config = Arc::new(config);
    let mut tick = interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                let handler = Arc::clone(&handler);
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    if let Err(e) = connection::run(socket, handler, &config).await {
                        error!(?peer, error = %e, "connection ended with error");
                    }
                });
            }
        }
    }
}
