//! Per-stream state (RFC 7540 §5.1) and flow-control accounting.

use http::HeaderMap;

/// Client-side stream states. The typical request path is
/// idle → open → half-closed(local) → closed; half-closed(remote) is
/// reached when the peer ends first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StreamState {
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

/// One multiplexed request/response exchange.
pub(crate) struct Stream {
    pub(crate) state: StreamState,
    /// Parsed response head once HEADERS arrived; taken by the reader.
    pub(crate) head: Option<crate::proto::h1::ResponseHead>,
    /// A response head has been decoded, so later HEADERS are trailers.
    pub(crate) saw_head: bool,
    /// Buffered DATA not yet handed to the reader.
    pub(crate) data: Vec<u8>,
    /// Trailers from a trailing HEADERS frame.
    pub(crate) trailers: Option<HeaderMap>,
    /// END_STREAM seen.
    pub(crate) remote_end: bool,
    /// RST_STREAM code, if the peer reset us.
    pub(crate) reset: Option<u32>,
    /// Peer-directed send window for this stream.
    pub(crate) send_window: i64,
    /// Bytes received and consumed since the last WINDOW_UPDATE we sent.
    pub(crate) recv_consumed: u64,
}

impl Stream {
    pub(crate) fn new(local_end: bool, peer_initial_window: i64) -> Stream {
        Stream {
            state: if local_end {
                StreamState::HalfClosedLocal
            } else {
                StreamState::Open
            },
            head: None,
            saw_head: false,
            data: Vec::new(),
            trailers: None,
            remote_end: false,
            reset: None,
            send_window: peer_initial_window,
            recv_consumed: 0,
        }
    }

    pub(crate) fn close_local(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote | StreamState::Closed => StreamState::Closed,
            StreamState::HalfClosedLocal => StreamState::HalfClosedLocal,
        };
    }

    pub(crate) fn close_remote(&mut self) {
        self.remote_end = true;
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal | StreamState::Closed => StreamState::Closed,
            StreamState::HalfClosedRemote => StreamState::HalfClosedRemote,
        };
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state == StreamState::Closed || self.reset.is_some()
    }
}
