//! Accept-key derivation (spec component C3).

use base64::{Engine as _, engine::general_purpose};
use sha1::{Digest, Sha1};

const WEBSOCKET_MAGIC_STRING: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// `base64(SHA1(client_key ∥ GUID))`. The client key is used verbatim, as
/// the opaque ASCII token RFC 6455 treats it as — never base64-decoded
/// first (spec §9 "Accept-key: base64-decode the client key?" — no).
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_MAGIC_STRING.as_bytes());
    let digest = hasher.finalize();
    general_purpose::STANDARD.encode(digest)
}
