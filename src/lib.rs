pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod handler;
pub mod handshake;
pub mod server;

pub use config::Config;
pub use error::{FrameError, HandshakeError, Result, ServerError};
pub use handler::{Action, ConnectionError, ConnectionView, ErrorAction, Handler};
