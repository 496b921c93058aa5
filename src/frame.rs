//! RFC 6455 frame codec (spec component C1): encode one frame, decode
//! zero-or-more frames out of a byte buffer, unmask client payloads.

use crate::error::FrameError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    fn from_nibble(byte: u8) -> Result<Self, FrameError> {
        match byte & 0x0F {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            other => Err(FrameError::InvalidOpcode(other)),
        }
    }

    fn as_nibble(self) -> u8 {
        match self {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

/// A fully decoded frame. For `Close`, `payload` holds the reason bytes
/// (never the two code bytes) and `close_code` holds the parsed code.
#[derive(Debug, Clone)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub masked: bool,
    pub masking_key: Option<[u8; 4]>,
    pub payload: Bytes,
    pub close_code: Option<u16>,
}

/// Outcome of decoding as many frames as currently sit in the buffer.
#[derive(Debug)]
pub enum ParseOutcome {
    /// Zero or more frames were decoded; `rest` is whatever is left over
    /// (empty if the buffer ended on an exact frame boundary).
    Frames(Vec<Frame>, BytesMut),
    /// No complete frame yet; retry once more bytes arrive.
    More(BytesMut),
    /// The next frame header is malformed and no frame had been decoded
    /// yet in this call.
    Error(FrameError),
}

/// Decode as many complete frames as `buf` holds. See spec §4.1: on a
/// malformed header that only shows up after some frames were already
/// decoded this call, those frames are still returned (with the malformed
/// bytes as `rest`) rather than discarded — the caller will see the error
/// on its next call once it tries to decode `rest` on its own.
pub fn decode(mut buf: BytesMut, max_frame_payload: u64) -> ParseOutcome {
    let mut frames = Vec::new();

    loop {
        match decode_one(&buf, max_frame_payload) {
            Ok(Some((frame, consumed))) => {
                buf.advance(consumed);
                frames.push(frame);
                if buf.is_empty() {
                    return ParseOutcome::Frames(frames, buf);
                }
            }
            Ok(None) => {
                return if frames.is_empty() {
                    ParseOutcome::More(buf)
                } else {
                    ParseOutcome::Frames(frames, buf)
                };
            }
            Err(e) => {
                return if frames.is_empty() {
                    ParseOutcome::Error(e)
                } else {
                    ParseOutcome::Frames(frames, buf)
                };
            }
        }
    }
}

/// Try to decode a single frame from the front of `data`. Returns
/// `Ok(None)` when `data` is a strict prefix of a valid frame.
fn decode_one(data: &[u8], max_frame_payload: u64) -> Result<Option<(Frame, usize)>, FrameError> {
    if data.len() < 2 {
        return Ok(None);
    }

    let first = data[0];
    let fin = first & 0x80 != 0;
    let rsv = first & 0x70;
    if rsv != 0 {
        return Err(FrameError::UseOfReserved);
    }
    let opcode = OpCode::from_nibble(first)?;

    let second = data[1];
    let masked = second & 0x80 != 0;
    let len7 = second & 0x7F;

    let mut pos = 2usize;
    let length: u64 = if len7 == 126 {
        if data.len() < pos + 2 {
            return Ok(None);
        }
        let n = u16::from_be_bytes([data[pos], data[pos + 1]]) as u64;
        pos += 2;
        n
    } else if len7 == 127 {
        if data.len() < pos + 8 {
            return Ok(None);
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&data[pos..pos + 8]);
        pos += 8;
        u64::from_be_bytes(bytes)
    } else {
        len7 as u64
    };

    if length > max_frame_payload {
        return Err(FrameError::PayloadTooLarge);
    }

    let masking_key = if masked {
        if data.len() < pos + 4 {
            return Ok(None);
        }
        let mut key = [0u8; 4];
        key.copy_from_slice(&data[pos..pos + 4]);
        pos += 4;
        Some(key)
    } else {
        None
    };

    let length = length as usize;
    if data.len() < pos + length {
        return Ok(None);
    }

    let mut payload = data[pos..pos + length].to_vec();
    pos += length;

    if let Some(key) = masking_key {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= key[i % 4];
        }
    }

    let (payload, close_code) = if opcode == OpCode::Close {
        if payload.len() >= 2 {
            let code = u16::from_be_bytes([payload[0], payload[1]]);
            (payload.split_off(2), Some(code))
        } else {
            (Vec::new(), None)
        }
    } else {
        (payload, None)
    };

    let frame = Frame {
        fin,
        opcode,
        masked,
        masking_key,
        payload: Bytes::from(payload),
        close_code,
    };

    Ok(Some((frame, pos)))
}

/// Encode a non-close frame. Server-to-client frames are always FIN=1,
/// RSV=0, MASK=0 per RFC 6455.
pub fn encode(opcode: OpCode, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    debug_assert_ne!(opcode, OpCode::Close, "use encode_close for close frames");
    let mut out = BytesMut::with_capacity(payload.len() + 10);
    write_header(&mut out, opcode, payload.len() as u64)?;
    out.extend_from_slice(payload);
    Ok(out.to_vec())
}

/// Encode a close frame. `code_reason` of `None` produces an empty-payload
/// close frame; `Some((code, reason))` produces the code followed by the
/// (UTF-8) reason bytes.
pub fn encode_close(code_reason: Option<(u16, &[u8])>) -> Result<Vec<u8>, FrameError> {
    let effective_len: u64 = match code_reason {
        Some((_, reason)) => 2u64
            .checked_add(reason.len() as u64)
            .ok_or(FrameError::PayloadTooLarge)?,
        None => 0,
    };

    let mut out = BytesMut::with_capacity(effective_len as usize + 10);
    write_header(&mut out, OpCode::Close, effective_len)?;
    if let Some((code, reason)) = code_reason {
        out.put_u16(code);
        out.extend_from_slice(reason);
    }
    Ok(out.to_vec())
}

fn write_header(out: &mut BytesMut, opcode: OpCode, len: u64) -> Result<(), FrameError> {
    out.put_u8(0x80 | opcode.as_nibble());
    if len <= 125 {
        out.put_u8(len as u8);
    } else if len <= u16::MAX as u64 {
        out.put_u8(126);
        out.put_u16(len as u16);
    } else {
        out.put_u8(127);
        out.put_u64(len);
    }
    Ok(())
}
