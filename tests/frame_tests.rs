use bytes::BytesMut;
use ws_core::frame::{OpCode, ParseOutcome, decode, encode, encode_close};

// E2: Ping/Pong round trip.
#[test]
fn ping_pong_round_trip() {
    let ping = encode(OpCode::Ping, b"Are you there?").unwrap();
    match decode(BytesMut::from(&ping[..]), u64::MAX) {
        ParseOutcome::Frames(frames, rest) => {
            assert!(rest.is_empty());
            assert_eq!(frames[0].opcode, OpCode::Ping);
            assert_eq!(&frames[0].payload[..], b"Are you there?");
        }
        other => panic!("expected Frames, got {other:?}"),
    }

    let pong = encode(OpCode::Pong, b"Are you there?").unwrap();
    match decode(BytesMut::from(&pong[..]), u64::MAX) {
        ParseOutcome::Frames(frames, rest) => {
            assert!(rest.is_empty());
            assert_eq!(frames[0].opcode, OpCode::Pong);
            assert_eq!(&frames[0].payload[..], b"Are you there?");
        }
        other => panic!("expected Frames, got {other:?}"),
    }
}

// E3: close round trip.
#[test]
fn close_round_trip() {
    let bytes = encode_close(Some((1000, b"Normal closure"))).unwrap();
    match decode(BytesMut::from(&bytes[..]), u64::MAX) {
        ParseOutcome::Frames(frames, rest) => {
            assert!(rest.is_empty());
            assert_eq!(frames[0].opcode, OpCode::Close);
            assert_eq!(frames[0].close_code, Some(1000));
            assert_eq!(&frames[0].payload[..], b"Normal closure");
        }
        other => panic!("expected Frames, got {other:?}"),
    }
}

// E4: a masked client text frame built by hand.
#[test]
fn masked_client_frame() {
    let key = [0x12u8, 0x34, 0x56, 0x78];
    let text = b"Client message";
    let mut raw = vec![0x81u8, 0x80 | text.len() as u8];
    raw.extend_from_slice(&key);
    raw.extend(text.iter().enumerate().map(|(i, b)| b ^ key[i % 4]));

    match decode(BytesMut::from(&raw[..]), u64::MAX) {
        ParseOutcome::Frames(frames, rest) => {
            assert!(rest.is_empty());
            assert_eq!(frames[0].opcode, OpCode::Text);
            assert!(frames[0].masked);
            assert_eq!(frames[0].masking_key, Some(key));
            assert_eq!(&frames[0].payload[..], &text[..]);
        }
        other => panic!("expected Frames, got {other:?}"),
    }
}

// E5: two concatenated frames decode in one pass with an empty rest.
#[test]
fn concatenated_frames() {
    let mut combined = encode(OpCode::Text, b"Hello").unwrap();
    combined.extend(encode(OpCode::Text, b"World").unwrap());

    match decode(BytesMut::from(&combined[..]), u64::MAX) {
        ParseOutcome::Frames(frames, rest) => {
            assert_eq!(frames.len(), 2);
            assert!(rest.is_empty());
            assert_eq!(&frames[0].payload[..], b"Hello");
            assert_eq!(&frames[1].payload[..], b"World");
        }
        other => panic!("expected Frames, got {other:?}"),
    }
}

// E6: a frame split mid-payload across two reads.
#[test]
fn split_across_segments() {
    let full = encode(OpCode::Binary, b"Hello").unwrap();
    assert_eq!(full, vec![0x82, 0x05, b'H', b'e', b'l', b'l', b'o']);

    let first = BytesMut::from(&full[..5]);
    match decode(first.clone(), u64::MAX) {
        ParseOutcome::More(buf) => assert_eq!(buf, first),
        other => panic!("expected More, got {other:?}"),
    }

    let mut second = first;
    second.extend_from_slice(&full[5..]);
    match decode(second, u64::MAX) {
        ParseOutcome::Frames(frames, rest) => {
            assert_eq!(frames.len(), 1);
            assert!(rest.is_empty());
            assert_eq!(&frames[0].payload[..], b"Hello");
        }
        other => panic!("expected Frames, got {other:?}"),
    }
}
