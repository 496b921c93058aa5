use thiserror::Error;

/// Failures from the incremental HTTP upgrade-request parser and its
/// validation pass (spec §7 "Handshake parse" / "Handshake validation").
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("request method is not GET")]
    InvalidMethod,
    #[error("request-target does not begin with '/'")]
    InvalidPath,
    #[error("HTTP version is not HTTP/1.1")]
    InvalidHttpVersion,
    #[error("header line is missing ':'")]
    InvalidHeaderSyntax,
    #[error("Upgrade header does not contain \"websocket\"")]
    InvalidHeaderUpgrade,
    #[error("Connection header does not contain \"Upgrade\"")]
    InvalidHeaderConnection,
    #[error("Sec-WebSocket-Key is missing or empty")]
    InvalidHeaderSecWebSocketKey,
    #[error("Sec-WebSocket-Version is not \"13\"")]
    InvalidHeaderSecWebSocketVersion,
    #[error("a required header is missing")]
    InvalidHeaderNotEnough,
}

/// Failures from the frame codec (spec §7 "Frame decode" / "Frame encode").
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("opcode {0:#04x} is reserved or unassigned")]
    InvalidOpcode(u8),
    #[error("a reserved bit (RSV1/2/3) is set")]
    UseOfReserved,
    #[error("payload exceeds the configured maximum")]
    PayloadTooLarge,
    #[error("client-origin frame is not masked")]
    UnmaskedClientFrame,
}

/// Crate-wide error type. Transport failures and the two protocol-layer
/// error families convert into this via `?` and `#[from]`.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("transport closed")]
    TransportClosed,
}

pub type Result<T> = std::result::Result<T, ServerError>;
