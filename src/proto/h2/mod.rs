//! HTTP/2 connection: preface, frame demultiplexing and stream
//! multiplexing over one TLS connection.
//!
//! The connection is shared across request threads. All I/O lives behind
//! one mutex; whichever thread needs frames takes a demux turn bounded by a
//! short socket timeout, so a waiting stream never parks the lock for more
//! than one tick and writers interleave between turns. The ordering rules
//! this preserves: a stream's HEADERS precede its DATA precede its
//! end-of-stream, and frame-level write order is serialized by the lock.

pub(crate) mod frame;
pub(crate) mod hpack;
pub(crate) mod stream;

use std::{
    collections::HashMap,
    io::{Read, Write},
    sync::Mutex,
    time::{Duration, Instant},
};

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};

use self::{
    frame::{error_code, flags, frame_type, FrameHead, FRAME_HEADER_LEN},
    stream::Stream,
};
use crate::{
    emulation::Http2Settings,
    error::Error,
    proto::h1::ResponseHead,
    tls::{set_io_deadline, TlsStream},
};

/// How long one demux turn may sit in a blocking read while other threads
/// wait for the connection lock.
const DEMUX_TICK: Duration = Duration::from_millis(50);

const DEFAULT_WINDOW: i64 = 65_535;
const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;

/// A request to be sent over an HTTP/2 stream.
pub(crate) struct H2Request<'a> {
    pub(crate) method: &'a Method,
    pub(crate) scheme: &'a str,
    pub(crate) authority: &'a str,
    pub(crate) path: &'a str,
    pub(crate) headers: &'a [(HeaderName, HeaderValue)],
    pub(crate) body: Option<&'a [u8]>,
}

pub(crate) struct Http2Conn {
    shared: Mutex<Shared>,
    settings: Http2Settings,
}

struct Shared {
    io: TlsStream,
    /// Inbound bytes not yet parsed into frames.
    partial: Vec<u8>,
    decoder: hpack::Decoder,
    streams: HashMap<u32, Stream>,
    next_stream_id: u32,
    conn_send_window: i64,
    peer_initial_window: i64,
    peer_max_frame_size: u32,
    peer_max_concurrent: Option<u32>,
    conn_recv_consumed: u64,
    conn_recv_limit: u64,
    stream_recv_limit: u64,
    goaway: Option<(u32, u32)>,
    poisoned: Option<String>,
    settings_received: bool,
    /// In-flight header block split over CONTINUATION frames:
    /// (stream id, block bytes, END_STREAM flag).
    continuation: Option<(u32, Vec<u8>, bool)>,
}

impl Http2Conn {
    /// Send the connection preface — magic, the profile's SETTINGS pairs in
    /// the profile's order, and the profile's WINDOW_UPDATE — then wait for
    /// the server's SETTINGS.
    pub(crate) fn handshake(
        mut io: TlsStream,
        settings: &Http2Settings,
        deadline: Option<Instant>,
    ) -> crate::Result<Http2Conn> {
        set_io_deadline(io.get_ref(), deadline)?;

        let mut preface = Vec::with_capacity(frame::PREFACE.len() + 64);
        preface.extend_from_slice(frame::PREFACE);
        frame::settings(&settings.settings_pairs(), &mut preface);
        frame::window_update(0, settings.connection_window_update, &mut preface);
        io.write_all(&preface).map_err(Error::from_io)?;
        io.flush().map_err(Error::from_io)?;

        let stream_recv_limit = settings.initial_stream_window_size.unwrap_or(65_535) as u64;
        let conn = Http2Conn {
            shared: Mutex::new(Shared {
                io,
                partial: Vec::with_capacity(16_384),
                decoder: hpack::Decoder::new(
                    settings.header_table_size.unwrap_or(4096) as usize
                ),
                streams: HashMap::new(),
                next_stream_id: 1,
                conn_send_window: DEFAULT_WINDOW,
                peer_initial_window: DEFAULT_WINDOW,
                peer_max_frame_size: DEFAULT_MAX_FRAME_SIZE,
                peer_max_concurrent: None,
                conn_recv_consumed: 0,
                conn_recv_limit: DEFAULT_WINDOW as u64
                    + settings.connection_window_update as u64,
                stream_recv_limit,
                goaway: None,
                poisoned: None,
                settings_received: false,
                continuation: None,
            }),
            settings: settings.clone(),
        };

        conn.wait_until(deadline, |shared| {
            Ok(shared.settings_received.then_some(()))
        })?;

        Ok(conn)
    }

    /// True when the pool may hand this connection to another request.
    pub(crate) fn is_reusable(&self) -> bool {
        let shared = self.shared.lock().unwrap();
        shared.poisoned.is_none() && shared.goaway.is_none()
    }

    /// Number of streams still exchanging frames.
    pub(crate) fn active_streams(&self) -> usize {
        let shared = self.shared.lock().unwrap();
        shared.streams.values().filter(|s| !s.is_closed()).count()
    }

    /// Open a stream, send HEADERS (+DATA) and return the stream id.
    pub(crate) fn send_request(
        &self,
        req: H2Request<'_>,
        deadline: Option<Instant>,
    ) -> crate::Result<u32> {
        // Respect the peer's MAX_CONCURRENT_STREAMS before opening.
        self.wait_until(deadline, |shared| {
            shared.check_alive()?;
            let active = shared.streams.values().filter(|s| !s.is_closed()).count();
            let allowed = match shared.peer_max_concurrent {
                Some(max) => (active as u32) < max,
                None => true,
            };
            Ok(allowed.then_some(()))
        })?;

        let stream_id = {
            let mut shared = self.shared.lock().unwrap();
            shared.check_alive()?;

            let stream_id = shared.next_stream_id;
            shared.next_stream_id += 2;

            let block = self.encode_block(&req);
            let end_stream = req.body.is_none();

            let mut out = Vec::with_capacity(block.len() + 32);
            frame::headers(
                stream_id,
                &block,
                self.settings.headers_priority,
                end_stream,
                shared.peer_max_frame_size,
                &mut out,
            );

            set_io_deadline(shared.io.get_ref(), deadline)?;
            shared.io.write_all(&out).map_err(Error::from_io)?;
            shared.io.flush().map_err(Error::from_io)?;

            let peer_window = shared.peer_initial_window;
            shared
                .streams
                .insert(stream_id, Stream::new(end_stream, peer_window));
            stream_id
        };

        if let Some(body) = req.body {
            self.send_body(stream_id, body, deadline)?;
        }

        log::trace!("h2 stream {stream_id} opened");
        Ok(stream_id)
    }

    fn send_body(
        &self,
        stream_id: u32,
        body: &[u8],
        deadline: Option<Instant>,
    ) -> crate::Result<()> {
        let mut offset = 0;

        while offset < body.len() {
            let remaining = body.len() - offset;

            // Wait for send-window credit on both levels, then write one
            // DATA frame inside the same lock acquisition.
            let sent = self.wait_until(deadline, |shared| {
                shared.check_alive()?;
                if let Some(stream) = shared.streams.get(&stream_id) {
                    if let Some(code) = stream.reset {
                        return Err(stream_reset_error(code));
                    }
                }

                let stream_window = shared
                    .streams
                    .get(&stream_id)
                    .map(|s| s.send_window)
                    .unwrap_or(0);
                let budget = shared
                    .conn_send_window
                    .min(stream_window)
                    .min(shared.peer_max_frame_size as i64);
                if budget <= 0 {
                    return Ok(None);
                }

                let take = remaining.min(budget as usize);
                let end_stream = offset + take == body.len();

                let mut out = Vec::with_capacity(take + FRAME_HEADER_LEN);
                frame::data(stream_id, &body[offset..offset + take], end_stream, &mut out);
                set_io_deadline(shared.io.get_ref(), deadline)?;
                shared.io.write_all(&out).map_err(Error::from_io)?;
                shared.io.flush().map_err(Error::from_io)?;

                shared.conn_send_window -= take as i64;
                if let Some(stream) = shared.streams.get_mut(&stream_id) {
                    stream.send_window -= take as i64;
                    if end_stream {
                        stream.close_local();
                    }
                }
                Ok(Some(take))
            });
            let taken = sent?;
            offset += taken;
        }

        Ok(())
    }

    /// Block until the stream's response HEADERS arrive.
    pub(crate) fn read_response_head(
        &self,
        stream_id: u32,
        deadline: Option<Instant>,
    ) -> crate::Result<ResponseHead> {
        self.wait_until(deadline, |shared| {
            let stream = shared
                .streams
                .get_mut(&stream_id)
                .ok_or_else(|| Error::request("h2 stream vanished"))?;
            if let Some(code) = stream.reset {
                return Err(stream_reset_error(code));
            }
            if stream.head.is_some() {
                return Ok(stream.head.take());
            }
            shared.check_alive()?;
            Ok(None)
        })
    }

    /// Take the next chunk of body data; `None` once the stream ended.
    pub(crate) fn read_body_chunk(
        &self,
        stream_id: u32,
        deadline: Option<Instant>,
    ) -> crate::Result<Option<Vec<u8>>> {
        self.wait_until(deadline, |shared| {
            let stream = shared
                .streams
                .get_mut(&stream_id)
                .ok_or_else(|| Error::request("h2 stream vanished"))?;
            if let Some(code) = stream.reset {
                return Err(stream_reset_error(code));
            }
            if !stream.data.is_empty() {
                let data = std::mem::take(&mut stream.data);
                return Ok(Some(Some(data)));
            }
            if stream.remote_end {
                return Ok(Some(None));
            }
            shared.check_alive()?;
            Ok(None)
        })
    }

    /// Trailer headers, once the stream has ended.
    pub(crate) fn take_trailers(&self, stream_id: u32) -> Option<HeaderMap> {
        let mut shared = self.shared.lock().unwrap();
        shared
            .streams
            .get_mut(&stream_id)
            .and_then(|s| s.trailers.take())
    }

    /// Drop the stream's bookkeeping after the response is consumed.
    pub(crate) fn finish_stream(&self, stream_id: u32) {
        let mut shared = self.shared.lock().unwrap();
        shared.streams.remove(&stream_id);
    }

    /// Abort a stream. The connection itself stays usable, which is the
    /// point of per-stream cancellation on h2.
    pub(crate) fn cancel_stream(&self, stream_id: u32) {
        let mut shared = self.shared.lock().unwrap();
        if shared.streams.remove(&stream_id).is_some() {
            let mut out = Vec::with_capacity(FRAME_HEADER_LEN + 4);
            frame::rst_stream(stream_id, error_code::CANCEL, &mut out);
            let _ = shared.io.write_all(&out);
            let _ = shared.io.flush();
        }
    }

    /// Send GOAWAY and close down; used on drop from the pool.
    pub(crate) fn close(&self) {
        let mut shared = self.shared.lock().unwrap();
        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + 8);
        frame::goaway(0, error_code::NO_ERROR, &mut out);
        let _ = shared.io.write_all(&out);
        let _ = shared.io.flush();
        shared.io.shutdown();
    }

    fn encode_block(&self, req: &H2Request<'_>) -> Vec<u8> {
        use crate::emulation::PseudoId;

        let method = req.method.as_str();
        let mut fields: Vec<hpack::EncodeField<'_>> = Vec::with_capacity(req.headers.len() + 4);

        // Pseudo-headers first, in the profile's order.
        for pseudo in &self.settings.headers_pseudo_order {
            let (name, value): (&[u8], &[u8]) = match pseudo {
                PseudoId::Method => (b":method", method.as_bytes()),
                PseudoId::Scheme => (b":scheme", req.scheme.as_bytes()),
                PseudoId::Authority => (b":authority", req.authority.as_bytes()),
                PseudoId::Path => (b":path", req.path.as_bytes()),
            };
            fields.push(hpack::EncodeField {
                name,
                value,
                sensitive: false,
            });
        }

        for (name, value) in req.headers {
            // Connection-specific headers never travel on h2 (RFC 7540 §8.1.2.2).
            if name == http::header::HOST
                || name == http::header::CONNECTION
                || name == http::header::TRANSFER_ENCODING
            {
                continue;
            }
            fields.push(hpack::EncodeField {
                name: name.as_str().as_bytes(),
                value: value.as_bytes(),
                sensitive: is_sensitive(name),
            });
        }

        let mut block = Vec::with_capacity(256);
        hpack::Encoder::encode(&fields, &mut block);
        block
    }

    /// Run `ready` under the connection lock; while it reports not-ready,
    /// take demux turns bounded by [`DEMUX_TICK`]. The lock is released
    /// between turns, so concurrent streams interleave their reads and
    /// writers get in between ticks.
    fn wait_until<T>(
        &self,
        deadline: Option<Instant>,
        mut ready: impl FnMut(&mut Shared) -> crate::Result<Option<T>>,
    ) -> crate::Result<T> {
        loop {
            let mut shared = self.shared.lock().unwrap();
            match ready(&mut shared) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => return Err(e),
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(Error::timeout());
                }
            }

            if let Err(e) = shared.demux_once(deadline) {
                let msg = e.to_string();
                shared.poison(&msg);
                return Err(e);
            }
        }
    }
}

fn is_sensitive(name: &HeaderName) -> bool {
    name == http::header::AUTHORIZATION
        || name == http::header::COOKIE
        || name == http::header::PROXY_AUTHORIZATION
}

fn stream_reset_error(code: u32) -> Error {
    Error::request(format!("stream reset ({})", error_code::name(code)))
}

impl Shared {
    fn check_alive(&self) -> crate::Result<()> {
        if let Some(msg) = &self.poisoned {
            return Err(Error::request(format!("h2 connection unusable: {msg}")));
        }
        Ok(())
    }

    fn poison(&mut self, msg: &str) {
        if self.poisoned.is_none() {
            self.poisoned = Some(msg.to_owned());
        }
    }

    /// One bounded read plus frame processing. `Ok(())` covers the
    /// no-progress case (socket timeout tick).
    fn demux_once(&mut self, deadline: Option<Instant>) -> crate::Result<()> {
        let tick = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if deadline <= now {
                    return Ok(());
                }
                DEMUX_TICK.min(deadline - now)
            }
            None => DEMUX_TICK,
        };
        self.io
            .get_ref()
            .set_read_timeout(Some(crate::tls::clamp_timeout(tick)))
            .map_err(Error::connect)?;

        let mut buf = [0u8; 16_384];
        match self.io.read(&mut buf) {
            Ok(0) => return Err(Error::connect("h2 connection closed by peer")),
            Ok(n) => self.partial.extend_from_slice(&buf[..n]),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                return Ok(());
            }
            Err(e) => return Err(Error::from_io(e)),
        }

        self.process_frames()
    }

    fn process_frames(&mut self) -> crate::Result<()> {
        loop {
            if self.partial.len() < FRAME_HEADER_LEN {
                return Ok(());
            }
            let head = FrameHead::parse(&self.partial);
            if head.length > (1 << 24) - 1 {
                return Err(Error::decode("h2 frame exceeds maximum length"));
            }
            let total = FRAME_HEADER_LEN + head.length as usize;
            if self.partial.len() < total {
                return Ok(());
            }

            let payload: Vec<u8> = self.partial[FRAME_HEADER_LEN..total].to_vec();
            self.partial.drain(..total);

            self.handle_frame(head, payload)?;
        }
    }

    fn handle_frame(&mut self, head: FrameHead, payload: Vec<u8>) -> crate::Result<()> {
        if let Some((cont_id, _, _)) = self.continuation {
            if head.kind != frame_type::CONTINUATION || head.stream_id != cont_id {
                return Err(Error::decode("expected CONTINUATION frame"));
            }
        }

        match head.kind {
            frame_type::DATA => self.on_data(head, payload),
            frame_type::HEADERS => self.on_headers(head, payload),
            frame_type::CONTINUATION => self.on_continuation(head, payload),
            frame_type::SETTINGS => self.on_settings(head, payload),
            frame_type::PING => self.on_ping(head, payload),
            frame_type::GOAWAY => self.on_goaway(payload),
            frame_type::WINDOW_UPDATE => self.on_window_update(head, payload),
            frame_type::RST_STREAM => self.on_rst_stream(head, payload),
            frame_type::PUSH_PROMISE => {
                // ENABLE_PUSH=0 makes any PUSH_PROMISE a connection error.
                let mut out = Vec::new();
                frame::goaway(0, error_code::PROTOCOL_ERROR, &mut out);
                let _ = self.io.write_all(&out);
                Err(Error::decode("server pushed despite ENABLE_PUSH=0"))
            }
            frame_type::PRIORITY => Ok(()),
            _ => Ok(()), // unknown frame types are ignored per RFC 7540 §4.1
        }
    }

    fn on_data(&mut self, head: FrameHead, payload: Vec<u8>) -> crate::Result<()> {
        let data = strip_padding(head.flags, &payload)?;
        let flow_len = head.length as u64;

        if let Some(stream) = self.streams.get_mut(&head.stream_id) {
            stream.data.extend_from_slice(data);
            stream.recv_consumed += flow_len;
            if head.flags & flags::END_STREAM != 0 {
                stream.close_remote();
            }

            // Replenish the stream window at half consumption.
            if stream.recv_consumed * 2 >= self.stream_recv_limit && !stream.remote_end {
                let increment = stream.recv_consumed as u32;
                stream.recv_consumed = 0;
                let mut out = Vec::with_capacity(FRAME_HEADER_LEN + 4);
                frame::window_update(head.stream_id, increment, &mut out);
                self.io.write_all(&out).map_err(Error::from_io)?;
            }
        }

        self.conn_recv_consumed += flow_len;
        if self.conn_recv_consumed * 2 >= self.conn_recv_limit {
            let increment = self.conn_recv_consumed as u32;
            self.conn_recv_consumed = 0;
            let mut out = Vec::with_capacity(FRAME_HEADER_LEN + 4);
            frame::window_update(0, increment, &mut out);
            self.io.write_all(&out).map_err(Error::from_io)?;
        }

        Ok(())
    }

    fn on_headers(&mut self, head: FrameHead, payload: Vec<u8>) -> crate::Result<()> {
        let mut block = strip_padding(head.flags, &payload)?;
        if head.flags & flags::PRIORITY != 0 {
            if block.len() < 5 {
                return Err(Error::decode("truncated HEADERS priority block"));
            }
            block = &block[5..];
        }
        let end_stream = head.flags & flags::END_STREAM != 0;

        if head.flags & flags::END_HEADERS != 0 {
            let block = block.to_vec();
            self.finish_header_block(head.stream_id, &block, end_stream)
        } else {
            self.continuation = Some((head.stream_id, block.to_vec(), end_stream));
            Ok(())
        }
    }

    fn on_continuation(&mut self, head: FrameHead, payload: Vec<u8>) -> crate::Result<()> {
        let Some((stream_id, mut block, end_stream)) = self.continuation.take() else {
            return Err(Error::decode("CONTINUATION without open header block"));
        };
        block.extend_from_slice(&payload);

        if head.flags & flags::END_HEADERS != 0 {
            self.finish_header_block(stream_id, &block, end_stream)
        } else {
            self.continuation = Some((stream_id, block, end_stream));
            Ok(())
        }
    }

    fn finish_header_block(
        &mut self,
        stream_id: u32,
        block: &[u8],
        end_stream: bool,
    ) -> crate::Result<()> {
        let decoded = self.decoder.decode(block)?;

        let Some(stream) = self.streams.get_mut(&stream_id) else {
            // Headers for a stream we already abandoned: HPACK state is
            // synchronized above; nothing else to do.
            return Ok(());
        };

        if !stream.saw_head {
            let mut status = None;
            let mut headers = HeaderMap::new();
            for (name, value) in &decoded {
                if name.as_slice() == b":status" {
                    status = std::str::from_utf8(value)
                        .ok()
                        .and_then(|s| s.parse::<u16>().ok())
                        .and_then(|code| StatusCode::from_u16(code).ok());
                } else if !name.starts_with(b":") {
                    let name = HeaderName::from_bytes(name).map_err(Error::decode)?;
                    let value = HeaderValue::from_bytes(value).map_err(Error::decode)?;
                    headers.append(name, value);
                }
            }
            let status = status.ok_or_else(|| Error::decode("response without :status"))?;
            stream.saw_head = true;
            stream.head = Some(ResponseHead {
                version: Version::HTTP_2,
                status,
                reason: None,
                headers,
            });
        } else {
            let mut trailers = stream.trailers.take().unwrap_or_default();
            for (name, value) in &decoded {
                if name.starts_with(b":") {
                    continue;
                }
                let name = HeaderName::from_bytes(name).map_err(Error::decode)?;
                let value = HeaderValue::from_bytes(value).map_err(Error::decode)?;
                trailers.append(name, value);
            }
            stream.trailers = Some(trailers);
        }

        if end_stream {
            stream.close_remote();
        }
        Ok(())
    }

    fn on_settings(&mut self, head: FrameHead, payload: Vec<u8>) -> crate::Result<()> {
        if head.flags & flags::ACK != 0 {
            return Ok(());
        }
        if payload.len() % 6 != 0 {
            return Err(Error::decode("malformed SETTINGS payload"));
        }

        for pair in payload.chunks_exact(6) {
            let id = u16::from_be_bytes([pair[0], pair[1]]);
            let value = u32::from_be_bytes([pair[2], pair[3], pair[4], pair[5]]);
            match id {
                0x3 => self.peer_max_concurrent = Some(value),
                0x4 => {
                    let delta = value as i64 - self.peer_initial_window;
                    self.peer_initial_window = value as i64;
                    for stream in self.streams.values_mut() {
                        stream.send_window += delta;
                    }
                }
                0x5 => self.peer_max_frame_size = value.clamp(16_384, (1 << 24) - 1),
                _ => {}
            }
        }

        let mut out = Vec::with_capacity(FRAME_HEADER_LEN);
        frame::settings_ack(&mut out);
        self.io.write_all(&out).map_err(Error::from_io)?;
        self.io.flush().map_err(Error::from_io)?;
        self.settings_received = true;
        Ok(())
    }

    fn on_ping(&mut self, head: FrameHead, payload: Vec<u8>) -> crate::Result<()> {
        if head.flags & flags::ACK != 0 || payload.len() != 8 {
            return Ok(());
        }
        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + 8);
        frame::ping_ack(&payload, &mut out);
        self.io.write_all(&out).map_err(Error::from_io)?;
        self.io.flush().map_err(Error::from_io)
    }

    fn on_goaway(&mut self, payload: Vec<u8>) -> crate::Result<()> {
        if payload.len() < 8 {
            return Err(Error::decode("malformed GOAWAY payload"));
        }
        let last_stream_id =
            u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & 0x7fff_ffff;
        let code = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
        self.goaway = Some((last_stream_id, code));

        // Streams the server will not process are surfaced as resets.
        for (id, stream) in self.streams.iter_mut() {
            if *id > last_stream_id && !stream.is_closed() {
                stream.reset = Some(error_code::REFUSED_STREAM);
            }
        }

        if code != error_code::NO_ERROR {
            log::debug!("h2 GOAWAY with {}", error_code::name(code));
            self.poison(&format!("GOAWAY ({})", error_code::name(code)));
        }
        Ok(())
    }

    fn on_window_update(&mut self, head: FrameHead, payload: Vec<u8>) -> crate::Result<()> {
        if payload.len() != 4 {
            return Err(Error::decode("malformed WINDOW_UPDATE payload"));
        }
        let increment =
            (u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & 0x7fff_ffff)
                as i64;

        if head.stream_id == 0 {
            self.conn_send_window = self
                .conn_send_window
                .checked_add(increment)
                .ok_or_else(|| Error::decode("connection window overflow"))?;
        } else if let Some(stream) = self.streams.get_mut(&head.stream_id) {
            stream.send_window += increment;
        }
        Ok(())
    }

    fn on_rst_stream(&mut self, head: FrameHead, payload: Vec<u8>) -> crate::Result<()> {
        if payload.len() != 4 {
            return Err(Error::decode("malformed RST_STREAM payload"));
        }
        let code = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        if let Some(stream) = self.streams.get_mut(&head.stream_id) {
            stream.reset = Some(code);
            stream.state = stream::StreamState::Closed;
        }
        Ok(())
    }
}

fn strip_padding(frame_flags: u8, payload: &[u8]) -> crate::Result<&[u8]> {
    if frame_flags & flags::PADDED == 0 {
        return Ok(payload);
    }
    let pad_len = *payload
        .first()
        .ok_or_else(|| Error::decode("padded frame without pad length"))? as usize;
    let body = &payload[1..];
    if pad_len > body.len() {
        return Err(Error::decode("padding longer than frame payload"));
    }
    Ok(&body[..body.len() - pad_len])
}
