use bytes::BytesMut;
use ws_core::handshake::{self, ParseOutcome};

// E1: handshake happy path, RFC 6455 sample key.
#[test]
fn handshake_happy_path() {
    let request = b"GET /chat HTTP/1.1\r\n\
                     Host: server.example.com\r\n\
                     Upgrade: websocket\r\n\
                     Connection: Upgrade\r\n\
                     Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
                     Sec-WebSocket-Version: 13\r\n\r\n";

    let ParseOutcome::Ok(req, rest) = handshake::parse(BytesMut::from(&request[..])) else {
        panic!("expected a fully parsed request");
    };
    assert!(rest.is_empty());
    assert_eq!(req.path, "/chat");

    handshake::validate(&req).expect("request should validate");

    let response = handshake::accept_response(&req);
    let response = String::from_utf8(response).unwrap();
    assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
    assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
}

#[test]
fn rejected_path_returns_404() {
    let request = b"GET relative HTTP/1.1\r\nHost: x\r\n\r\n";
    let ParseOutcome::Error(e) = handshake::parse(BytesMut::from(&request[..])) else {
        panic!("expected parse error");
    };
    let response = handshake::reject_response(e);
    assert_eq!(response, b"HTTP/1.1 404 Not Found\r\n\r\n");
}

#[test]
fn bytes_after_handshake_are_preserved_as_rest() {
    let request = b"GET / HTTP/1.1\r\n\
                     Host: x\r\n\
                     Upgrade: websocket\r\n\
                     Connection: Upgrade\r\n\
                     Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
                     Sec-WebSocket-Version: 13\r\n\r\n\x81\x00";

    let ParseOutcome::Ok(_, rest) = handshake::parse(BytesMut::from(&request[..])) else {
        panic!("expected a fully parsed request");
    };
    assert_eq!(&rest[..], &[0x81, 0x00][..]);
}
