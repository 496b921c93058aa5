//! Incremental HTTP upgrade-request parser and validator (spec component
//! C2), plus accept-key derivation (C3, in [`accept`]).

pub mod accept;

use crate::error::HandshakeError;
use bytes::BytesMut;
use std::collections::HashMap;

/// A parsed (but not yet validated) upgrade request. Header names are
/// lowercased at parse time; values are comma-split and trimmed, preserving
/// arrival order across repeated headers (spec §3 "Handshake request").
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    pub path: String,
    headers: HashMap<String, Vec<String>>,
}

impl HandshakeRequest {
    /// The ordered, comma-split values for a lowercased header name.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers.get(name).map(|v| v.as_slice())
    }

    /// True if any value of `name` equals `want` case-insensitively.
    fn header_contains_ci(&self, name: &str, want: &str) -> bool {
        self.header(name)
            .is_some_and(|values| values.iter().any(|v| v.eq_ignore_ascii_case(want)))
    }
}

#[derive(Debug)]
pub enum ParseOutcome {
    Ok(HandshakeRequest, BytesMut),
    More(BytesMut),
    Error(HandshakeError),
}

/// Parse one HTTP/1.1 upgrade request out of the front of `buf`. Never
/// reads past the terminating blank CRLF; anything after it is returned
/// untouched so the connection can hand it straight to the frame decoder.
pub fn parse(mut buf: BytesMut) -> ParseOutcome {
    let Some(header_end) = find_header_terminator(&buf) else {
        return ParseOutcome::More(buf);
    };

    let rest = buf.split_off(header_end);
    let header_bytes = buf;

    let Ok(text) = std::str::from_utf8(&header_bytes) else {
        return ParseOutcome::Error(HandshakeError::InvalidHeaderSyntax);
    };

    let mut lines = text.split("\r\n");
    let Some(request_line) = lines.next() else {
        return ParseOutcome::Error(HandshakeError::InvalidHttpVersion);
    };

    let mut parts = request_line.splitn(3, ' ');
    let method = parts.next().unwrap_or("");
    let target = parts.next();
    let version = parts.next();

    if method != "GET" {
        return ParseOutcome::Error(HandshakeError::InvalidMethod);
    }
    let Some(target) = target else {
        return ParseOutcome::Error(HandshakeError::InvalidPath);
    };
    if !target.starts_with('/') {
        return ParseOutcome::Error(HandshakeError::InvalidPath);
    }
    if version != Some("HTTP/1.1") {
        return ParseOutcome::Error(HandshakeError::InvalidHttpVersion);
    }

    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some(colon) = line.find(':') else {
            return ParseOutcome::Error(HandshakeError::InvalidHeaderSyntax);
        };
        let name = line[..colon].trim().to_ascii_lowercase();
        let values: Vec<String> = line[colon + 1..]
            .split(',')
            .map(|v| v.trim().to_string())
            .collect();
        headers.entry(name).or_default().extend(values);
    }

    ParseOutcome::Ok(
        HandshakeRequest {
            path: target.to_string(),
            headers,
        },
        rest,
    )
}

/// Index just past the first `\r\n\r\n` in `buf`, if any.
fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Validate a parsed request. Error kinds surface in the deterministic
/// order spec §4.2 mandates.
pub fn validate(req: &HandshakeRequest) -> Result<(), HandshakeError> {
    if !req.header_contains_ci("upgrade", "websocket") {
        return Err(HandshakeError::InvalidHeaderUpgrade);
    }
    if !req.header_contains_ci("connection", "upgrade") {
        return Err(HandshakeError::InvalidHeaderConnection);
    }
    let key_present = req
        .header("sec-websocket-key")
        .is_some_and(|values| values.iter().any(|v| !v.is_empty()));
    if !key_present {
        return Err(HandshakeError::InvalidHeaderSecWebSocketKey);
    }
    if req.header("sec-websocket-version") != Some(&["13".to_string()][..]) {
        return Err(HandshakeError::InvalidHeaderSecWebSocketVersion);
    }
    if req.header("host").is_none() {
        return Err(HandshakeError::InvalidHeaderNotEnough);
    }
    Ok(())
}

/// The `101 Switching Protocols` response for an accepted request.
pub fn accept_response(req: &HandshakeRequest) -> Vec<u8> {
    let key = req
        .header("sec-websocket-key")
        .and_then(|v| v.first())
        .map(String::as_str)
        .unwrap_or_default();
    let accept = accept::compute_accept_key(key);
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\r\n"
    )
    .into_bytes()
}

/// The canned rejection response for a given error kind (spec §4.2).
pub fn reject_response(err: HandshakeError) -> Vec<u8> {
    match err {
        HandshakeError::InvalidPath => b"HTTP/1.1 404 Not Found\r\n\r\n".to_vec(),
        _ => b"HTTP/1.1 400 Bad Request\r\n\r\n".to_vec(),
    }
}
