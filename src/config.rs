use std::time::Duration;

/// Server-tunable limits and bind address. Constructed with [`Default`] and
/// overridden by the embedding binary (see `src/main.rs`).
#[derive(Debug, Clone)]
pub struct Config {
    pub address: String,
    /// Reject the handshake if the request line + headers exceed this many
    /// bytes without a terminating blank line (prevents header bombs).
    pub max_handshake_bytes: usize,
    /// Per-frame payload ceiling enforced by the decoder. Spec §9: "a
    /// prudent implementation imposes a configurable ceiling".
    pub max_frame_payload: u64,
    /// Suggested interval for keepalive pings. The connection itself has no
    /// idle timeout and never originates ping traffic on its own (spec §5:
    /// keepalive is the handler's responsibility) — this value is exposed
    /// for a handler that wants to drive its own keepalive schedule.
    pub ping_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            max_handshake_bytes: 16 * 1024,
            max_frame_payload: 16 * 1024 * 1024,
            ping_interval: Duration::from_secs(30),
        }
    }
}
