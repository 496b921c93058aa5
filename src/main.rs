use ws_core::{Action, Config, ConnectionView, Handler};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Echoes text frames back prefixed with "Echo: " and binary frames back
/// unchanged, the same demo behavior the teacher's `websocket::mod` ran
/// inline inside its connection loop.
struct EchoHandler;

impl Handler for EchoHandler {
    type State = ();

    async fn init(&self, view: &ConnectionView) -> ws_core::Result<()> {
        info!(peer = ?view.peer_addr, path = %view.path, "connection open");
        Ok(())
    }

    async fn handle_text(&self, _view: &ConnectionView, text: String, state: ()) -> Action<()> {
        Action::Reply(format!("Echo: {text}").into_bytes(), state)
    }

    async fn handle_binary(&self, _view: &ConnectionView, data: Vec<u8>, state: ()) -> Action<()> {
        Action::Reply(data, state)
    }

    async fn terminate(&self, view: &ConnectionView, reason: (u16, String), _state: ()) {
        info!(peer = ?view.peer_addr, code = reason.0, reason = %reason.1, "connection closed");
    }
}

#[tokio::main]
async fn main() -> ws_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::default();
    ws_core::server::serve(config, EchoHandler).await
}
