//! Per-connection state machine (spec component C4): drives a socket
//! through Handshake -> Open -> Closed, dispatching decoded frames to a
//! [`Handler`] while auto-answering ping/close, per spec §4.4.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{FrameError, Result, ServerError};
use crate::frame::{self, Frame, OpCode, ParseOutcome};
use crate::handler::{Action, ConnectionError, ConnectionView, ErrorAction, Handler};
use crate::handshake::{self, ParseOutcome as HandshakeOutcome};

const READ_CHUNK: usize = 4096;

enum Outbound {
    Bytes(Vec<u8>),
    Close(u16, String),
}

/// A cloneable outbound-only handle to a running connection actor. Sends
/// enqueue onto the actor's mailbox so writes never interleave with
/// inbound frame processing, regardless of which task calls them (spec §5
/// "Outbound interface").
#[derive(Clone)]
pub struct ConnectionHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        let bytes = frame::encode(OpCode::Text, text.into().as_bytes())?;
        self.enqueue(Outbound::Bytes(bytes))
    }

    pub fn send_binary(&self, data: Vec<u8>) -> Result<()> {
        let bytes = frame::encode(OpCode::Binary, &data)?;
        self.enqueue(Outbound::Bytes(bytes))
    }

    pub fn close(&self) -> Result<()> {
        self.close_with(1000, "Normal Closure")
    }

    pub fn close_with(&self, code: u16, reason: impl Into<String>) -> Result<()> {
        self.enqueue(Outbound::Close(code, reason.into()))
    }

    fn enqueue(&self, msg: Outbound) -> Result<()> {
        self.tx.send(msg).map_err(|_| ServerError::TransportClosed)
    }
}

enum FrameStep<S> {
    Continue(S),
    Closed(S, (u16, String)),
}

/// Drive one accepted socket through its whole lifecycle: handshake, the
/// open message loop, and the transition to closed. Returns once the
/// transport is done with (peer closed, protocol error, or I/O failure).
pub async fn run<H: Handler>(mut socket: TcpStream, handler: Arc<H>, config: &Config) -> Result<()> {
    let peer_addr = socket.peer_addr().ok();
    let mut buffer = BytesMut::with_capacity(4096);

    let (path, query, mut buffer) = 'handshake: loop {
        if buffer.len() > config.max_handshake_bytes {
            warn!(?peer_addr, "handshake request exceeded size limit");
            let _ = socket
                .write_all(&handshake::reject_response(
                    crate::error::HandshakeError::InvalidHeaderSyntax,
                ))
                .await;
            return Ok(());
        }

        match handshake::parse(std::mem::take(&mut buffer)) {
            HandshakeOutcome::More(carried) => {
                buffer = carried;
                let mut tmp = [0u8; READ_CHUNK];
                match socket.read(&mut tmp).await {
                    Ok(0) => {
                        info!(?peer_addr, "connection closed during handshake");
                        return Ok(());
                    }
                    Ok(n) => buffer.extend_from_slice(&tmp[..n]),
                    Err(e) => return Err(e.into()),
                }
            }
            HandshakeOutcome::Error(e) => {
                warn!(?peer_addr, error = %e, "handshake rejected");
                let _ = socket.write_all(&handshake::reject_response(e)).await;
                return Ok(());
            }
            HandshakeOutcome::Ok(req, rest) => {
                if let Err(e) = handshake::validate(&req) {
                    warn!(?peer_addr, error = %e, "handshake failed validation");
                    let _ = socket.write_all(&handshake::reject_response(e)).await;
                    return Ok(());
                }
                let response = handshake::accept_response(&req);
                socket.write_all(&response).await?;
                info!(?peer_addr, path = %req.path, "websocket handshake accepted");
                let (path, query) = split_path_and_query(&req.path);
                break 'handshake (path, query, rest);
            }
        }
    };

    let (tx, mut outbound_rx) = mpsc::unbounded_channel();
    let view = ConnectionView {
        peer_addr,
        path: Arc::from(path),
        query: Arc::new(query),
        handle: ConnectionHandle { tx },
    };

    let mut handler_state = handler.init(&view).await?;
    let mut tmp = [0u8; READ_CHUNK];

    // The handshake may have left a pipelined data frame in `buffer`
    // already (client wrote its upgrade request and first frame in the
    // same segment); decode and dispatch whatever is already sitting there
    // before waiting on the socket for more bytes, or a pipelined frame
    // would sit unprocessed until the peer happened to send something else.
    let mut close_reason = match drain_buffer(buffer, config, &handler, &view, handler_state, &mut socket).await? {
        DrainOutcome::Open(rest, s) => {
            buffer = rest;
            handler_state = s;
            None
        }
        DrainOutcome::Closed(s, reason) => {
            handler_state = s;
            Some(reason)
        }
    };

    if close_reason.is_none() {
        close_reason = 'open: loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(Outbound::Bytes(bytes)) => {
                            if let Err(e) = socket.write_all(&bytes).await {
                                error!(?peer_addr, error = %e, "write failed");
                                break 'open None;
                            }
                        }
                        Some(Outbound::Close(code, reason)) => {
                            let bytes = frame::encode_close(Some((code, reason.as_bytes())))?;
                            let _ = socket.write_all(&bytes).await;
                            break 'open Some((code, reason));
                        }
                        None => {}
                    }
                }
                read_result = socket.read(&mut tmp) => {
                    match read_result {
                        Ok(0) => break 'open Some((1000, "Normal Closure".to_string())),
                        Ok(n) => {
                            buffer.extend_from_slice(&tmp[..n]);
                            let chunk = std::mem::take(&mut buffer);
                            match drain_buffer(chunk, config, &handler, &view, handler_state, &mut socket).await? {
                                DrainOutcome::Open(rest, s) => {
                                    buffer = rest;
                                    handler_state = s;
                                }
                                DrainOutcome::Closed(s, reason) => {
                                    handler_state = s;
                                    break 'open Some(reason);
                                }
                            }
                        }
                        Err(e) => {
                            error!(?peer_addr, error = %e, "transport read error");
                            break 'open None;
                        }
                    }
                }
            }
        };
    }

    if let Some(reason) = close_reason {
        info!(?peer_addr, code = reason.0, "connection closing");
        handler.terminate(&view, reason, handler_state).await;
    }

    let _ = socket.shutdown().await;
    Ok(())
}

enum DrainOutcome<S> {
    Open(BytesMut, S),
    Closed(S, (u16, String)),
}

/// Decode as many frames as `buffer` currently holds and dispatch each one,
/// stopping early on a decode error or a handler/control-frame close. Used
/// both to drain bytes the handshake left pipelined in `buffer` and, on
/// every subsequent socket read, to drain newly arrived bytes — so a
/// complete frame is always processed as soon as it is fully buffered,
/// never only on the next `socket.read` wakeup.
async fn drain_buffer<H: Handler>(
    buffer: BytesMut,
    config: &Config,
    handler: &Arc<H>,
    view: &ConnectionView,
    mut state: H::State,
    socket: &mut TcpStream,
) -> Result<DrainOutcome<H::State>> {
    let peer_addr = view.peer_addr;
    match frame::decode(buffer, config.max_frame_payload) {
        ParseOutcome::More(carried) => Ok(DrainOutcome::Open(carried, state)),
        ParseOutcome::Error(e) => {
            warn!(?peer_addr, error = %e, "frame decode error");
            state = match handler.handle_error(view, ConnectionError(e), state).await {
                ErrorAction::Continue(s) | ErrorAction::Close(s) => s,
            };
            let (code, reason) = close_for_frame_error(e);
            let bytes = frame::encode_close(Some((code, reason.as_bytes())))?;
            let _ = socket.write_all(&bytes).await;
            Ok(DrainOutcome::Closed(state, (code, reason)))
        }
        ParseOutcome::Frames(frames, rest) => {
            for decoded in frames {
                match process_frame(decoded, handler, view, state, socket).await? {
                    FrameStep::Continue(s) => state = s,
                    FrameStep::Closed(s, reason) => return Ok(DrainOutcome::Closed(s, reason)),
                }
            }
            Ok(DrainOutcome::Open(rest, state))
        }
    }
}

/// Close code and reason for a decode-level [`FrameError`], per spec §6's
/// registry: payload-size rejections close 1009 ("message too big"),
/// everything else is a generic protocol error (1002).
fn close_for_frame_error(e: FrameError) -> (u16, String) {
    match e {
        FrameError::PayloadTooLarge => (1009, "Message too big".to_string()),
        _ => (1002, "Protocol error".to_string()),
    }
}

/// Process one already-decoded frame: auto-answer control frames, dispatch
/// data frames to the handler, and translate the handler's returned
/// [`Action`] into outbound bytes (spec §4.4 "Per-frame processing").
async fn process_frame<H: Handler>(
    frame: Frame,
    handler: &Arc<H>,
    view: &ConnectionView,
    state: H::State,
    socket: &mut TcpStream,
) -> Result<FrameStep<H::State>> {
    // RFC 6455 §5.3: every frame sent by a client MUST be masked. This is
    // connection policy, not codec policy (spec §3), so it is enforced here
    // rather than in `frame::decode`.
    if !frame.masked {
        warn!(peer_addr = ?view.peer_addr, opcode = ?frame.opcode, "rejected unmasked client frame");
        let next_state = match handler
            .handle_error(view, ConnectionError(FrameError::UnmaskedClientFrame), state)
            .await
        {
            ErrorAction::Continue(s) | ErrorAction::Close(s) => s,
        };
        let bytes = frame::encode_close(Some((1002, b"client frame must be masked")))?;
        socket.write_all(&bytes).await?;
        return Ok(FrameStep::Closed(
            next_state,
            (1002, "client frame must be masked".to_string()),
        ));
    }

    match frame.opcode {
        OpCode::Ping => {
            let bytes = frame::encode(OpCode::Pong, &frame.payload)?;
            socket.write_all(&bytes).await?;
            Ok(FrameStep::Continue(state))
        }
        OpCode::Pong => Ok(FrameStep::Continue(state)),
        OpCode::Close => {
            let echo = match frame.close_code {
                Some(code) => frame::encode_close(Some((code, b"")))?,
                None => frame::encode_close(None)?,
            };
            socket.write_all(&echo).await?;
            Ok(FrameStep::Closed(state, (frame.close_code.unwrap_or(0), String::new())))
        }
        OpCode::Text => {
            let text = String::from_utf8_lossy(&frame.payload).into_owned();
            let action = handler.handle_text(view, text, state).await;
            apply_action(socket, OpCode::Text, action).await
        }
        // Continuation frames carry no opcode of their own; without full
        // fragment reassembly (spec §9, left as an open redesign item)
        // they are delivered as binary data, same as a non-final Binary
        // frame.
        OpCode::Binary | OpCode::Continuation => {
            let action = handler.handle_binary(view, frame.payload.to_vec(), state).await;
            apply_action(socket, OpCode::Binary, action).await
        }
    }
}

async fn apply_action<S>(
    socket: &mut TcpStream,
    reply_opcode: OpCode,
    action: Action<S>,
) -> Result<FrameStep<S>> {
    match action {
        Action::Continue(s) => Ok(FrameStep::Continue(s)),
        Action::Reply(payload, s) => {
            let bytes = frame::encode(reply_opcode, &payload)?;
            socket.write_all(&bytes).await?;
            Ok(FrameStep::Continue(s))
        }
        Action::Close(s) => {
            let bytes = frame::encode_close(Some((1000, b"Normal Closure")))?;
            socket.write_all(&bytes).await?;
            Ok(FrameStep::Closed(s, (1000, "Normal Closure".to_string())))
        }
        Action::CloseWith((code, reason), s) => {
            let bytes = frame::encode_close(Some((code, reason.as_bytes())))?;
            socket.write_all(&bytes).await?;
            Ok(FrameStep::Closed(s, (code, reason)))
        }
    }
}

fn split_path_and_query(target: &str) -> (String, HashMap<String, String>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (target.to_string(), HashMap::new()),
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}
