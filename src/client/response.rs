//! A Response to a submitted `Request`.

use std::{
    io::{self, Read},
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use url::Url;

#[cfg(feature = "charset")]
use encoding_rs::{Encoding, UTF_8};
#[cfg(feature = "charset")]
use mime::Mime;

use crate::{
    error::Error,
    pool::{Conn, Pool},
    proto::h1::chunked::ChunkedDecoder,
    proto::h2::Http2Conn,
    tls::TlsInfo,
};

/// Phase timings of the request, in microseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timings {
    pub connect_us: u64,
    pub tls_us: u64,
    pub first_byte_us: u64,
    pub total_us: u64,
}

/// A Response to a submitted `Request`.
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) url: Url,
    pub(crate) body: BodySource,
    pub(crate) history: Vec<Response>,
    pub(crate) tls_info: Option<TlsInfo>,
    pub(crate) timings: Timings,
    pub(crate) request_headers: HeaderMap,
}

pub(crate) enum BodySource {
    Full(Bytes),
    Stream(Box<dyn Read + Send>),
}

impl Response {
    /// Get the `StatusCode` of this `Response`.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// True iff the status code is in `200..400` — success or redirect.
    pub fn ok(&self) -> bool {
        let code = self.status.as_u16();
        (200..400).contains(&code)
    }

    /// Whether this response carries a redirect status.
    pub fn is_redirect(&self) -> bool {
        crate::redirect::is_redirect_status(self.status)
    }

    /// Get the HTTP `Version` of this `Response`.
    pub fn version(&self) -> Version {
        self.version
    }

    /// The protocol version as the conventional short string:
    /// `"1.0"`, `"1.1"` or `"2.0"`.
    pub fn http_version(&self) -> &'static str {
        match self.version {
            Version::HTTP_10 => "1.0",
            Version::HTTP_2 => "2.0",
            _ => "1.1",
        }
    }

    /// Get the `Headers` of this `Response`.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the `Headers` of this `Response`.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The final `Url` of this `Response`, after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Intermediate redirect responses, in the order they were followed.
    pub fn history(&self) -> &[Response] {
        &self.history
    }

    /// TLS session facts, for HTTPS responses.
    pub fn tls_info(&self) -> Option<&TlsInfo> {
        self.tls_info.as_ref()
    }

    /// Negotiated TLS version, e.g. `TLSv1.3`.
    pub fn tls_version(&self) -> Option<&str> {
        self.tls_info.as_ref().and_then(TlsInfo::tls_version)
    }

    /// Negotiated TLS cipher suite.
    pub fn tls_cipher(&self) -> Option<&str> {
        self.tls_info.as_ref().and_then(TlsInfo::cipher)
    }

    /// The JA3 hash of the ClientHello this connection sent.
    pub fn ja3_fingerprint(&self) -> Option<&str> {
        self.tls_info.as_ref().map(TlsInfo::ja3_hash)
    }

    /// Phase timings in microseconds.
    pub fn timings(&self) -> Timings {
        self.timings
    }

    /// The request headers exactly as sent on the final hop.
    pub fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    /// The response body size, when declared by the server.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }

    /// The cookies set by this response. Invalid `Set-Cookie` headers are
    /// ignored.
    #[cfg(feature = "cookies")]
    pub fn cookies(&self) -> impl Iterator<Item = crate::cookie::Cookie<'_>> {
        self.headers
            .get_all(http::header::SET_COOKIE)
            .iter()
            .map(crate::cookie::Cookie::parse)
            .filter_map(Result::ok)
    }

    /// Turn a response into an error if the server returned a 4xx or 5xx.
    pub fn error_for_status(self) -> crate::Result<Response> {
        if self.status.is_client_error() || self.status.is_server_error() {
            Err(Error::status_code(self.url.clone(), self.status))
        } else {
            Ok(self)
        }
    }

    /// Like [`error_for_status`](Response::error_for_status) without
    /// consuming the response.
    pub fn error_for_status_ref(&self) -> crate::Result<&Response> {
        if self.status.is_client_error() || self.status.is_server_error() {
            Err(Error::status_code(self.url.clone(), self.status))
        } else {
            Ok(self)
        }
    }

    /// The full response body as bytes, draining the stream if one was
    /// requested.
    pub fn bytes(self) -> crate::Result<Bytes> {
        match self.body {
            BodySource::Full(bytes) => Ok(bytes),
            BodySource::Stream(mut reader) => {
                let mut out = Vec::new();
                reader
                    .read_to_end(&mut out)
                    .map_err(|e| body_error(e))?;
                Ok(Bytes::from(out))
            }
        }
    }

    /// Get the full response text.
    ///
    /// The charset comes from the `Content-Type` header's `charset`
    /// parameter and defaults to UTF-8, with malformed sequences replaced.
    pub fn text(self) -> crate::Result<String> {
        #[cfg(feature = "charset")]
        {
            self.text_with_charset("utf-8")
        }

        #[cfg(not(feature = "charset"))]
        {
            let full = self.bytes()?;
            Ok(String::from_utf8_lossy(&full).into_owned())
        }
    }

    /// Get the full response text, decoding with `default_encoding` when
    /// the `Content-Type` header names no charset.
    #[cfg(feature = "charset")]
    pub fn text_with_charset(self, default_encoding: &str) -> crate::Result<String> {
        let content_type = self
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Mime>().ok());
        let encoding_name = content_type
            .as_ref()
            .and_then(|mime| mime.get_param("charset").map(|charset| charset.as_str()))
            .unwrap_or(default_encoding);
        let encoding = Encoding::for_label(encoding_name.as_bytes()).unwrap_or(UTF_8);

        let full = self.bytes()?;
        let (text, _, _) = encoding.decode(&full);
        Ok(text.into_owned())
    }

    /// Deserialize the response body as JSON.
    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(self) -> crate::Result<T> {
        let full = self.bytes()?;
        serde_json::from_slice(&full).map_err(Error::decode)
    }

    /// Iterate the body in chunks of at most `chunk_size` bytes.
    pub fn chunks(self, chunk_size: usize) -> Chunks {
        Chunks {
            reader: self.into_reader(),
            chunk_size: chunk_size.max(1),
            done: false,
        }
    }

    /// Iterate the body split on `\n`, stripping the delimiter and any
    /// preceding `\r`.
    pub fn lines(self) -> Lines {
        self.lines_delimited(b'\n')
    }

    /// Iterate the body split on an arbitrary delimiter byte.
    pub fn lines_delimited(self, delimiter: u8) -> Lines {
        Lines {
            reader: self.into_reader(),
            delimiter,
            buf: Vec::new(),
            done: false,
        }
    }

    fn into_reader(self) -> Box<dyn Read + Send> {
        match self.body {
            BodySource::Full(bytes) => Box::new(io::Cursor::new(bytes.to_vec())),
            BodySource::Stream(reader) => reader,
        }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}

fn body_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::timeout(),
        io::ErrorKind::InvalidData => Error::decode(e),
        _ => Error::body(e),
    }
}

/// Chunked iteration over a response body.
pub struct Chunks {
    reader: Box<dyn Read + Send>,
    chunk_size: usize,
    done: bool,
}

impl Iterator for Chunks {
    type Item = crate::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(body_error(e)));
                }
            }
        }

        if filled == 0 {
            None
        } else {
            buf.truncate(filled);
            Some(Ok(Bytes::from(buf)))
        }
    }
}

/// Line-by-line iteration over a response body.
pub struct Lines {
    reader: Box<dyn Read + Send>,
    delimiter: u8,
    buf: Vec<u8>,
    done: bool,
}

impl Iterator for Lines {
    type Item = crate::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(idx) = self.buf.iter().position(|&b| b == self.delimiter) {
                let mut line: Vec<u8> = self.buf.drain(..=idx).collect();
                line.pop();
                if self.delimiter == b'\n' && line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Some(Ok(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.done {
                if self.buf.is_empty() {
                    return None;
                }
                let line = std::mem::take(&mut self.buf);
                return Some(Ok(String::from_utf8_lossy(&line).into_owned()));
            }

            let mut chunk = [0u8; 8 * 1024];
            match self.reader.read(&mut chunk) {
                Ok(0) => self.done = true,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    self.done = true;
                    return Some(Err(body_error(e)));
                }
            }
        }
    }
}

// ===== streaming body readers =====

pub(crate) enum H1Framing {
    Length(u64),
    Chunked(ChunkedDecoder),
    Close,
    Done,
}

/// Streams an HTTP/1.1 body straight off its connection, returning the
/// connection to the pool once the body completes.
pub(crate) struct H1BodyReader {
    conn: Option<Conn>,
    pool: Arc<Pool>,
    framing: H1Framing,
    keep_alive: bool,
    /// Body bytes that arrived with the response head.
    leftover: Vec<u8>,
    /// Decoded-but-unserved bytes (chunked framing only).
    decoded: Vec<u8>,
    /// Trailer headers recovered from the chunked epilogue.
    trailers: Option<HeaderMap>,
}

impl H1BodyReader {
    pub(crate) fn new(
        conn: Conn,
        pool: Arc<Pool>,
        framing: H1Framing,
        keep_alive: bool,
        leftover: Vec<u8>,
        read_timeout: Option<Duration>,
    ) -> H1BodyReader {
        let _ = conn
            .transport
            .tcp()
            .set_read_timeout(read_timeout.map(crate::tls::clamp_timeout));
        H1BodyReader {
            conn: Some(conn),
            pool,
            framing,
            keep_alive,
            leftover,
            decoded: Vec::new(),
            trailers: None,
        }
    }

    /// Trailer headers, available once the body completed.
    pub(crate) fn take_trailers(&mut self) -> Option<HeaderMap> {
        self.trailers.take()
    }

    fn finish(&mut self, reusable: bool) {
        if let H1Framing::Chunked(decoder) = &mut self.framing {
            let trailers = decoder.take_trailers();
            if !trailers.is_empty() {
                self.trailers = Some(trailers);
            }
        }
        self.framing = H1Framing::Done;
        if let Some(conn) = self.conn.take() {
            self.pool.checkin(conn, reusable && self.keep_alive);
        }
    }

    fn read_socket(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.conn.as_mut() {
            Some(conn) => conn.transport.read(buf),
            None => Ok(0),
        }
    }
}

impl Read for H1BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match &mut self.framing {
                H1Framing::Done => return Ok(0),
                H1Framing::Length(remaining) => {
                    if *remaining == 0 {
                        self.finish(true);
                        return Ok(0);
                    }
                    let want = buf.len().min(*remaining as usize);

                    if !self.leftover.is_empty() {
                        let take = want.min(self.leftover.len());
                        buf[..take].copy_from_slice(&self.leftover[..take]);
                        self.leftover.drain(..take);
                        *remaining -= take as u64;
                        return Ok(take);
                    }

                    let n = self.read_socket(&mut buf[..want])?;
                    if n == 0 {
                        self.finish(false);
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "connection closed before body completed",
                        ));
                    }
                    *remaining -= n as u64;
                    if *remaining == 0 {
                        // served below on the next call, but the socket is
                        // already drained; return the connection eagerly
                        let served = n;
                        self.finish(true);
                        return Ok(served);
                    }
                    return Ok(n);
                }
                H1Framing::Close => {
                    if !self.leftover.is_empty() {
                        let take = buf.len().min(self.leftover.len());
                        buf[..take].copy_from_slice(&self.leftover[..take]);
                        self.leftover.drain(..take);
                        return Ok(take);
                    }
                    let n = self.read_socket(buf)?;
                    if n == 0 {
                        // EOF delimits the body; the connection is spent.
                        self.finish(false);
                        return Ok(0);
                    }
                    return Ok(n);
                }
                H1Framing::Chunked(_) => {
                    if !self.decoded.is_empty() {
                        let take = buf.len().min(self.decoded.len());
                        buf[..take].copy_from_slice(&self.decoded[..take]);
                        self.decoded.drain(..take);
                        return Ok(take);
                    }

                    // Feed whatever raw bytes we have through the decoder.
                    let input = if self.leftover.is_empty() {
                        let mut chunk = vec![0u8; 16 * 1024];
                        let n = self.read_socket(&mut chunk)?;
                        if n == 0 {
                            self.finish(false);
                            return Err(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "connection closed inside chunked body",
                            ));
                        }
                        chunk.truncate(n);
                        chunk
                    } else {
                        std::mem::take(&mut self.leftover)
                    };

                    let H1Framing::Chunked(decoder) = &mut self.framing else {
                        unreachable!()
                    };
                    let mut out = Vec::new();
                    let consumed = decoder
                        .decode(&input, &mut out)
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                    // Bytes past the terminal chunk belong to no message.
                    let done = decoder.is_done();
                    if consumed < input.len() {
                        self.leftover = input[consumed..].to_vec();
                    }
                    self.decoded = out;

                    if done {
                        let trailing_garbage = !self.leftover.is_empty();
                        self.finish(!trailing_garbage);
                        if !self.decoded.is_empty() {
                            let take = buf.len().min(self.decoded.len());
                            buf[..take].copy_from_slice(&self.decoded[..take]);
                            self.decoded.drain(..take);
                            return Ok(take);
                        }
                        return Ok(0);
                    }
                }
            }
        }
    }
}

impl Drop for H1BodyReader {
    fn drop(&mut self) {
        // An unfinished body cannot be returned to the pool mid-response.
        if let Some(conn) = self.conn.take() {
            self.pool.discard(conn);
        }
    }
}

/// Streams an HTTP/2 response body; the connection itself stays pooled,
/// only the stream is finished or cancelled.
pub(crate) struct H2BodyReader {
    conn: Arc<Http2Conn>,
    stream_id: u32,
    read_timeout: Option<Duration>,
    buffered: Vec<u8>,
    trailers: Option<HeaderMap>,
    done: bool,
}

impl H2BodyReader {
    pub(crate) fn new(
        conn: Arc<Http2Conn>,
        stream_id: u32,
        read_timeout: Option<Duration>,
    ) -> H2BodyReader {
        H2BodyReader {
            conn,
            stream_id,
            read_timeout,
            buffered: Vec::new(),
            trailers: None,
            done: false,
        }
    }

    /// Trailer headers, available once the stream ended.
    pub(crate) fn take_trailers(&mut self) -> Option<HeaderMap> {
        self.trailers.take()
    }
}

impl Read for H2BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if !self.buffered.is_empty() {
                let take = buf.len().min(self.buffered.len());
                buf[..take].copy_from_slice(&self.buffered[..take]);
                self.buffered.drain(..take);
                return Ok(take);
            }
            if self.done {
                return Ok(0);
            }

            let deadline = self.read_timeout.map(|t| Instant::now() + t);
            match self.conn.read_body_chunk(self.stream_id, deadline) {
                Ok(Some(data)) => self.buffered = data,
                Ok(None) => {
                    self.done = true;
                    self.trailers = self.conn.take_trailers(self.stream_id);
                    self.conn.finish_stream(self.stream_id);
                    return Ok(0);
                }
                Err(e) => {
                    self.done = true;
                    let kind = if e.is_timeout() {
                        io::ErrorKind::TimedOut
                    } else {
                        io::ErrorKind::Other
                    };
                    return Err(io::Error::new(kind, e));
                }
            }
        }
    }
}

impl Drop for H2BodyReader {
    fn drop(&mut self) {
        if !self.done {
            // RST_STREAM is enough; the connection may stay pooled.
            self.conn.cancel_stream(self.stream_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_body(body: &[u8]) -> Response {
        Response {
            status: StatusCode::OK,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            url: Url::parse("http://example.com/").unwrap(),
            body: BodySource::Full(Bytes::from(body.to_vec())),
            history: Vec::new(),
            tls_info: None,
            timings: Timings::default(),
            request_headers: HeaderMap::new(),
        }
    }

    #[test]
    fn ok_covers_success_and_redirects() {
        let mut res = response_with_body(b"");
        assert!(res.ok());

        res.status = StatusCode::FOUND;
        assert!(res.ok());

        res.status = StatusCode::BAD_REQUEST;
        assert!(!res.ok());
    }

    #[test]
    fn chunks_cover_whole_body() {
        let body: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let chunks: Vec<Bytes> = response_with_body(&body)
            .chunks(1024)
            .collect::<crate::Result<_>>()
            .unwrap();

        assert!(chunks.len() >= 10);
        let joined: Vec<u8> = chunks.concat();
        assert_eq!(joined, body);
    }

    #[test]
    fn lines_strip_crlf() {
        let lines: Vec<String> = response_with_body(b"alpha\r\nbeta\ngamma")
            .lines()
            .collect::<crate::Result<_>>()
            .unwrap();
        assert_eq!(lines, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn error_for_status_maps_4xx() {
        let mut res = response_with_body(b"");
        res.status = StatusCode::NOT_FOUND;
        let err = res.error_for_status().unwrap_err();
        assert!(err.is_status());
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }
}
