//! Handler contract (spec component C5): the capability set the connection
//! state machine invokes on lifecycle events and inbound messages.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::connection::ConnectionHandle;
use crate::error::FrameError;

/// Read-only snapshot of connection identity and metadata, passed to every
/// handler callback. Carries the outbound handle so the handler can also
/// send/close from a task it spawns off (spec §5 "Shared-resource policy":
/// the handler never touches the transport directly).
#[derive(Clone)]
pub struct ConnectionView {
    pub peer_addr: Option<SocketAddr>,
    pub path: Arc<str>,
    pub query: Arc<HashMap<String, String>>,
    pub handle: ConnectionHandle,
}

/// What the handler wants the connection to do next after processing one
/// frame (spec §4.4 "Handler return shapes and actions").
pub enum Action<S> {
    Continue(S),
    Reply(Vec<u8>, S),
    Close(S),
    CloseWith((u16, String), S),
}

/// Informational error surfaced to a handler that opts into
/// [`Handler::handle_error`]; the connection performs its mandated
/// protocol action regardless of what the handler returns (spec §7).
///
/// Handshake-parse errors (spec §7 "Handshake parse"/"Handshake
/// validation") are not represented here: they happen before
/// [`Handler::init`] runs, so there is no handler state yet to hand back.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionError(pub FrameError);

/// What a `handle_error` callback may ask for. The connection still always
/// performs its own mandated reaction (reject response / close 1002); this
/// only controls whether the handler's state is still considered usable.
pub enum ErrorAction<S> {
    Continue(S),
    Close(S),
}

/// The capability set a WebSocket endpoint implementation must provide
/// (spec §4.5). `State` is the handler's own per-connection data, owned by
/// the connection actor and threaded through by value on every callback.
pub trait Handler: Send + Sync + 'static {
    type State: Send;

    fn init(
        &self,
        view: &ConnectionView,
    ) -> impl Future<Output = crate::error::Result<Self::State>> + Send;

    fn handle_text(
        &self,
        view: &ConnectionView,
        text: String,
        state: Self::State,
    ) -> impl Future<Output = Action<Self::State>> + Send;

    fn handle_binary(
        &self,
        view: &ConnectionView,
        data: Vec<u8>,
        state: Self::State,
    ) -> impl Future<Output = Action<Self::State>> + Send;

    /// Called once, right before the connection transitions to `Closed`.
    /// Default is a no-op.
    fn terminate(
        &self,
        _view: &ConnectionView,
        _reason: (u16, String),
        _state: Self::State,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Informational hook for parse/codec errors. Default continues with
    /// the handler's state untouched; the connection's mandated reaction
    /// happens either way.
    fn handle_error(
        &self,
        _view: &ConnectionView,
        _error: ConnectionError,
        state: Self::State,
    ) -> impl Future<Output = ErrorAction<Self::State>> + Send {
        async { ErrorAction::Continue(state) }
    }
}
