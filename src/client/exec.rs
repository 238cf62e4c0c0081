//! Request orchestration: connection acquisition, redirects, the
//! stale-connection retry, phase timeouts and error mapping.

use std::{
    io::Read,
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use super::{
    body::{MaterializedBody, Payload},
    request::Request,
    response::{BodySource, H1BodyReader, H1Framing, H2BodyReader, Response, Timings},
    ClientInner,
};
use crate::{
    connect::{connect_tcp, tunnel::tunnel},
    decoder,
    error::Error,
    pool::{Conn, H2Entry, PoolKey, Scheme, Transport},
    proto::{
        h1,
        h2::{H2Request, Http2Conn},
        GrowBuf,
    },
    proxy::ProxyServer,
    redirect, util,
};

pub(crate) fn execute(inner: &Arc<ClientInner>, req: Request) -> crate::Result<Response> {
    let started = Instant::now();

    let mut url = req.url;
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(Error::url_bad_scheme(url)),
    }

    let verify = req.verify.unwrap_or(inner.verify);
    let http2_pref = req.http2.unwrap_or(inner.http2);
    let policy = req
        .redirect
        .clone()
        .unwrap_or_else(|| inner.redirect.clone());
    let connect_timeout = req.connect_timeout.or(req.timeout).or(inner.connect_timeout);
    let read_timeout = req.read_timeout.or(req.timeout).or(inner.read_timeout);

    let mut body = match req.body {
        Some(body) => body.materialize()?,
        None => MaterializedBody::empty(),
    };
    let mut method = req.method;
    let mut custom_headers = req.headers;

    let mut history: Vec<Response> = Vec::new();
    let mut previous: Vec<Url> = Vec::new();
    let mut timings = Timings::default();

    loop {
        let params = HopParams {
            method: &method,
            url: &url,
            custom_headers: &custom_headers,
            cookies_override: req.cookies_override.as_deref(),
            proxy_override: req.proxy.as_ref(),
            verify,
            http2_pref,
            connect_timeout,
            read_timeout,
        };
        let hop = send_hop(inner, &params, &mut body)?;

        timings.connect_us += hop.connect_us;
        timings.tls_us += hop.tls_us;
        timings.first_byte_us = hop.first_byte_us;

        #[cfg(feature = "cookies")]
        if let Some(jar) = &inner.jar {
            jar.set_cookies(&hop.head.headers, &url);
        }

        let status = hop.head.status;
        let location = hop
            .head
            .headers
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if redirect::is_redirect_status(status) {
            if let Some(location) = location {
                let next = url
                    .join(&location)
                    .map_err(|e| Error::redirect(e, url.clone()))?;
                match next.scheme() {
                    "http" | "https" => {}
                    _ => return Err(Error::url_bad_scheme(next)),
                }

                previous.push(url.clone());
                let action = policy.check(redirect::Attempt {
                    status,
                    next: &next,
                    previous: &previous,
                });

                match action {
                    redirect::Action::Follow => {
                        // Intermediate bodies are drained so the
                        // connection can be pooled, and kept for history.
                        history.push(drain_hop(hop, &url)?);

                        if redirect::downgrades_to_get(status)
                            && method != Method::GET
                            && method != Method::HEAD
                        {
                            method = Method::GET;
                            body.clear();
                        }
                        // Credentials never cross to another host.
                        if next.host_str() != url.host_str() {
                            for name in [
                                http::header::AUTHORIZATION,
                                http::header::COOKIE,
                                http::header::PROXY_AUTHORIZATION,
                            ] {
                                custom_headers.remove(name);
                            }
                        }
                        url = next;
                        continue;
                    }
                    redirect::Action::Stop => {}
                    redirect::Action::Error(e) => return Err(e),
                }
            }
        }

        // Final hop.
        let mut response = if req.stream {
            finish_streaming(hop, &url)
        } else {
            finish_eager(inner, hop, &url)?
        };
        timings.total_us = started.elapsed().as_micros() as u64;
        response.timings = timings;
        response.history = history;
        return Ok(response);
    }
}

struct HopParams<'a> {
    method: &'a Method,
    url: &'a Url,
    custom_headers: &'a HeaderMap,
    cookies_override: Option<&'a [(String, String)]>,
    proxy_override: Option<&'a crate::proxy::Proxy>,
    verify: bool,
    http2_pref: bool,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

struct Hop {
    head: h1::ResponseHead,
    body: HopBody,
    tls_info: Option<crate::tls::TlsInfo>,
    connect_us: u64,
    tls_us: u64,
    first_byte_us: u64,
    request_headers: HeaderMap,
}

enum HopBody {
    Empty,
    H1(H1BodyReader),
    H2(H2BodyReader),
}

/// One request/response exchange against one origin, including the single
/// retry on a stale pooled connection.
fn send_hop(
    inner: &Arc<ClientInner>,
    params: &HopParams<'_>,
    body: &mut MaterializedBody,
) -> crate::Result<Hop> {
    let proxy = params
        .proxy_override
        .and_then(|p| p.intercept(params.url))
        .or_else(|| {
            inner
                .proxies
                .iter()
                .find_map(|p| p.intercept(params.url))
        })
        .cloned();

    let host = params
        .url
        .host_str()
        .ok_or_else(|| Error::builder("URL has no host"))?
        .to_owned();
    let port = params
        .url
        .port_or_known_default()
        .ok_or_else(|| Error::builder("URL has no port"))?;
    let https = params.url.scheme() == "https";

    let key = PoolKey {
        scheme: if https { Scheme::Https } else { Scheme::Http },
        host,
        port,
        proxy: proxy.as_ref().map(ProxyServer::pool_key),
        verify: params.verify,
    };

    let ordered = assemble_headers(inner, params, body, &key)?;
    let mut request_headers = HeaderMap::with_capacity(ordered.len());
    for (name, value) in &ordered {
        request_headers.append(name.clone(), value.clone());
    }

    // First attempt may use a pooled connection; a transport error before
    // any response byte on a reused connection earns one retry on a fresh
    // one. A consumed streaming body cannot be replayed, so it disarms
    // the retry.
    match attempt_hop(inner, params, body, &key, proxy.as_ref(), &ordered, true) {
        Ok(mut hop) => {
            hop.request_headers = request_headers;
            Ok(hop)
        }
        Err(AttemptError { error, retryable }) => {
            if retryable && !body.is_reader() {
                log::debug!("retrying once on a fresh connection: {error}");
                let mut hop =
                    attempt_hop(inner, params, body, &key, proxy.as_ref(), &ordered, false)
                        .map_err(|second| second.error)?;
                hop.request_headers = request_headers;
                Ok(hop)
            } else {
                Err(error)
            }
        }
    }
}

struct AttemptError {
    error: Error,
    retryable: bool,
}

fn attempt_hop(
    inner: &Arc<ClientInner>,
    params: &HopParams<'_>,
    body: &mut MaterializedBody,
    key: &PoolKey,
    proxy: Option<&ProxyServer>,
    ordered: &[(HeaderName, HeaderValue)],
    allow_reuse: bool,
) -> Result<Hop, AttemptError> {
    let https = key.scheme == Scheme::Https;

    // Multiplex onto a live h2 connection when the profile offers h2.
    if https && params.http2_pref && allow_reuse {
        if let Some(entry) = inner.pool.checkout_h2(key) {
            return send_h2(params, body, ordered, entry, 0, 0).map_err(|error| {
                AttemptError {
                    // A pooled h2 connection that died before the
                    // response head is the h2 shape of a stale one.
                    retryable: !error.is_timeout(),
                    error,
                }
            });
        }
    }

    if allow_reuse {
        if let Some(conn) = inner.pool.checkout(key) {
            return send_h1(inner, params, body, ordered, conn, 0, 0).map_err(
                |(error, retry_allowed)| AttemptError {
                    retryable: retry_allowed && !error.is_timeout(),
                    error,
                },
            );
        }
    }

    // Dial a new connection; nothing to fall back to if this fails.
    dial_and_send(inner, params, body, key, proxy, ordered).map_err(|error| AttemptError {
        error,
        retryable: false,
    })
}

fn dial_and_send(
    inner: &Arc<ClientInner>,
    params: &HopParams<'_>,
    body: &mut MaterializedBody,
    key: &PoolKey,
    proxy: Option<&ProxyServer>,
    ordered: &[(HeaderName, HeaderValue)],
) -> crate::Result<Hop> {
    let https = key.scheme == Scheme::Https;
    let connect_deadline = params.connect_timeout.map(|t| Instant::now() + t);

    inner.pool.reserve(key, connect_deadline)?;
    let dialed = (|| {
        let connect_started = Instant::now();

        // Through a proxy the TCP connection goes to the proxy; an HTTPS
        // origin then gets an opaque CONNECT tunnel before TLS.
        let mut tcp = match proxy {
            Some(proxy) => connect_tcp(proxy.host(), proxy.port(), connect_deadline)?,
            None => connect_tcp(&key.host, key.port, connect_deadline)?,
        };
        if let (Some(proxy), true) = (proxy, https) {
            tunnel(
                &mut tcp,
                &key.host,
                key.port,
                proxy.basic_auth_header(),
                connect_deadline,
            )?;
        }
        let connect_us = connect_started.elapsed().as_micros() as u64;

        if !https {
            let conn = Conn::new(Transport::Plain(tcp), key.clone(), None);
            return Ok((conn, None, connect_us, 0));
        }

        let tls_started = Instant::now();
        let connector = inner.tls_connector(params.verify)?;
        let stream = connector.handshake(tcp, &key.host, connect_deadline)?;
        let tls_us = tls_started.elapsed().as_micros() as u64;
        let tls_info = connector.tls_info(&stream);

        Ok((
            Conn::new(Transport::Tls(stream), key.clone(), Some(tls_info.clone())),
            Some(tls_info),
            connect_us,
            tls_us,
        ))
    })();

    let (conn, tls_info, connect_us, tls_us) = match dialed {
        Ok(parts) => parts,
        Err(e) => {
            inner.pool.cancel_reservation(key);
            return Err(e);
        }
    };

    // ALPN routes the new connection to its codec.
    let negotiated_h2 = tls_info
        .as_ref()
        .map(|info| info.alpn() == "h2")
        .unwrap_or(false);

    if negotiated_h2 {
        let Conn { transport, .. } = conn;
        let Transport::Tls(stream) = transport else {
            unreachable!("h2 is only negotiated over TLS")
        };
        let h2 = match Http2Conn::handshake(stream, &inner.emulation.http2, connect_deadline) {
            Ok(h2) => Arc::new(h2),
            Err(e) => {
                inner.pool.cancel_reservation(key);
                return Err(e);
            }
        };
        let entry = H2Entry {
            conn: h2,
            tls_info: tls_info.clone().expect("h2 always has TLS info"),
        };
        inner.pool.insert_h2(key, entry.clone());
        send_h2(params, body, ordered, entry, connect_us, tls_us)
    } else {
        send_h1(inner, params, body, ordered, conn, connect_us, tls_us)
            .map_err(|(error, _)| error)
    }
}

/// Assemble the final header list: profile template first, per-request
/// overrides merged by name, dynamic headers slotted in, all emitted in
/// the profile's order with unknown names trailing.
fn assemble_headers(
    inner: &Arc<ClientInner>,
    params: &HopParams<'_>,
    body: &MaterializedBody,
    key: &PoolKey,
) -> crate::Result<Vec<(HeaderName, HeaderValue)>> {
    let mut headers = inner.default_headers.clone();
    util::replace_headers(&mut headers, params.custom_headers.clone());

    let default_port = match key.scheme {
        Scheme::Https => 443,
        Scheme::Http => 80,
    };
    let host_value = if key.port == default_port {
        key.host.clone()
    } else {
        format!("{}:{}", key.host, key.port)
    };
    headers.insert(
        http::header::HOST,
        HeaderValue::from_str(&host_value).map_err(Error::builder)?,
    );

    if let Some(content_type) = &body.content_type {
        if !headers.contains_key(http::header::CONTENT_TYPE) {
            headers.insert(http::header::CONTENT_TYPE, content_type.clone());
        }
    }
    match &body.payload {
        Payload::Bytes(bytes) => {
            headers.insert(
                http::header::CONTENT_LENGTH,
                HeaderValue::from_str(&bytes.len().to_string()).map_err(Error::builder)?,
            );
        }
        Payload::Reader(_) => {
            headers.insert(
                http::header::TRANSFER_ENCODING,
                HeaderValue::from_static("chunked"),
            );
        }
        Payload::None => {
            if *params.method == Method::POST || *params.method == Method::PUT {
                headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from_static("0"));
            }
        }
    }

    // Cookies: an explicit per-call set suppresses the jar for this call.
    let cookie_value = match params.cookies_override {
        Some(cookies) => {
            let joined = cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            if joined.is_empty() {
                None
            } else {
                Some(HeaderValue::from_str(&joined).map_err(Error::builder)?)
            }
        }
        None => {
            #[cfg(feature = "cookies")]
            {
                inner
                    .jar
                    .as_ref()
                    .and_then(|jar| jar.cookie_header(params.url))
            }
            #[cfg(not(feature = "cookies"))]
            {
                None
            }
        }
    };
    match cookie_value {
        Some(cookie) => {
            headers.insert(http::header::COOKIE, cookie);
        }
        None => {
            headers.remove(http::header::COOKIE);
        }
    }

    Ok(util::ordered_headers(&headers, inner.headers_order))
}

/// Send over HTTP/1.1 and read the response head. The error side carries
/// whether the stale-connection retry is armed: a reused connection that
/// failed before any response byte.
fn send_h1(
    inner: &Arc<ClientInner>,
    params: &HopParams<'_>,
    body: &mut MaterializedBody,
    ordered: &[(HeaderName, HeaderValue)],
    mut conn: Conn,
    connect_us: u64,
    tls_us: u64,
) -> Result<Hop, (Error, bool)> {
    let pool = inner.pool.clone();
    let reused = conn.reused;
    let read_deadline = params.read_timeout.map(|t| Instant::now() + t);

    match send_h1_inner(params, body, ordered, &mut conn, read_deadline) {
        Ok((head, leftover, first_byte_us)) => {
            let framing = match h1::BodyFraming::for_response(params.method, &head) {
                Ok(framing) => framing,
                Err(e) => {
                    pool.discard(conn);
                    return Err((e, false));
                }
            };
            let keep_alive = h1::is_keep_alive(&head);
            let tls_info = conn.tls_info.clone();

            let hop_body = match framing {
                h1::BodyFraming::None => {
                    pool.checkin(conn, keep_alive);
                    HopBody::Empty
                }
                h1::BodyFraming::ContentLength(len) => HopBody::H1(H1BodyReader::new(
                    conn,
                    pool,
                    H1Framing::Length(len),
                    keep_alive,
                    leftover,
                    params.read_timeout,
                )),
                h1::BodyFraming::Chunked => HopBody::H1(H1BodyReader::new(
                    conn,
                    pool,
                    H1Framing::Chunked(h1::chunked::ChunkedDecoder::new()),
                    keep_alive,
                    leftover,
                    params.read_timeout,
                )),
                h1::BodyFraming::Close => HopBody::H1(H1BodyReader::new(
                    conn,
                    pool,
                    H1Framing::Close,
                    false,
                    leftover,
                    params.read_timeout,
                )),
            };

            Ok(Hop {
                head,
                body: hop_body,
                tls_info,
                connect_us,
                tls_us,
                first_byte_us,
                request_headers: HeaderMap::new(),
            })
        }
        Err((e, got_bytes)) => {
            pool.discard(conn);
            Err((e, reused && !got_bytes))
        }
    }
}

fn send_h1_inner(
    params: &HopParams<'_>,
    body: &mut MaterializedBody,
    ordered: &[(HeaderName, HeaderValue)],
    conn: &mut Conn,
    read_deadline: Option<Instant>,
) -> Result<(h1::ResponseHead, Vec<u8>, u64), (Error, bool)> {
    use std::io::Write;

    let fail = |e: Error| (e, false);

    crate::tls::set_io_deadline(conn.transport.tcp(), read_deadline).map_err(fail)?;

    // Through a plain-HTTP proxy the request line is absolute-form.
    let target = if conn.key.proxy.is_some() && conn.key.scheme == Scheme::Http {
        params.url.as_str().to_owned()
    } else {
        let mut target = params.url.path().to_owned();
        if let Some(query) = params.url.query() {
            target.push('?');
            target.push_str(query);
        }
        target
    };

    let head_bytes = h1::encode_head(params.method, &target, ordered);
    let sent_at = Instant::now();
    conn.transport
        .write_all(&head_bytes)
        .map_err(|e| fail(Error::from_io(e)))?;

    match &mut body.payload {
        Payload::Bytes(bytes) => {
            conn.transport
                .write_all(bytes)
                .map_err(|e| fail(Error::from_io(e)))?;
        }
        Payload::Reader(reader) => {
            // Unknown length: chunked transfer coding, consumed as we go.
            let mut chunk = [0u8; 16 * 1024];
            loop {
                let n = reader.read(&mut chunk).map_err(|e| fail(Error::body(e)))?;
                if n == 0 {
                    break;
                }
                let size_line = format!("{n:x}\r\n");
                conn.transport
                    .write_all(size_line.as_bytes())
                    .map_err(|e| fail(Error::from_io(e)))?;
                conn.transport
                    .write_all(&chunk[..n])
                    .map_err(|e| fail(Error::from_io(e)))?;
                conn.transport
                    .write_all(b"\r\n")
                    .map_err(|e| fail(Error::from_io(e)))?;
            }
            conn.transport
                .write_all(b"0\r\n\r\n")
                .map_err(|e| fail(Error::from_io(e)))?;
            // The stream is spent; keep the reader shape so neither the
            // retry nor a redirect ever replays a half-sent body.
            body.payload = Payload::Reader(Box::new(std::io::empty()));
        }
        Payload::None => {}
    }
    conn.transport.flush().map_err(|e| fail(Error::from_io(e)))?;

    let mut buf = GrowBuf::new();
    loop {
        if let Some((head, consumed)) = h1::parse_head(buf.filled()).map_err(|e| (e, true))? {
            let first_byte_us = sent_at.elapsed().as_micros() as u64;
            let leftover = {
                let mut all = buf.into_vec();
                all.drain(..consumed);
                all
            };
            return Ok((head, leftover, first_byte_us));
        }

        let got_bytes = buf.len() > 0;
        match buf.read_from(&mut conn.transport) {
            Ok(0) => {
                return Err((
                    Error::connect("connection closed before response head"),
                    got_bytes,
                ));
            }
            Ok(_) => {}
            Err(e) => return Err((Error::from_io(e), got_bytes)),
        }
    }
}

fn send_h2(
    params: &HopParams<'_>,
    body: &MaterializedBody,
    ordered: &[(HeaderName, HeaderValue)],
    entry: H2Entry,
    connect_us: u64,
    tls_us: u64,
) -> crate::Result<Hop> {
    let read_deadline = params.read_timeout.map(|t| Instant::now() + t);

    let authority = {
        let host = params.url.host_str().unwrap_or_default();
        match params.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        }
    };
    let mut path = params.url.path().to_owned();
    if let Some(query) = params.url.query() {
        path.push('?');
        path.push_str(query);
    }

    let payload: Option<&[u8]> = match &body.payload {
        Payload::Bytes(bytes) => Some(bytes),
        Payload::None => None,
        Payload::Reader(_) => {
            return Err(Error::request(
                "streaming request bodies require HTTP/1.1",
            ));
        }
    };

    let sent_at = Instant::now();
    let stream_id = entry.conn.send_request(
        H2Request {
            method: params.method,
            scheme: params.url.scheme(),
            authority: &authority,
            path: &path,
            headers: ordered,
            body: payload,
        },
        read_deadline,
    )?;

    let head = entry.conn.read_response_head(stream_id, read_deadline)?;
    let first_byte_us = sent_at.elapsed().as_micros() as u64;

    Ok(Hop {
        head,
        body: HopBody::H2(H2BodyReader::new(
            entry.conn.clone(),
            stream_id,
            params.read_timeout,
        )),
        tls_info: Some(entry.tls_info),
        connect_us,
        tls_us,
        first_byte_us,
        request_headers: HeaderMap::new(),
    })
}

/// Read a hop's body fully and build an eager `Response`, decoding any
/// supported content encoding and appending trailers to the headers.
fn finish_eager(inner: &Arc<ClientInner>, hop: Hop, url: &Url) -> crate::Result<Response> {
    let mut raw = Vec::new();
    let trailers = read_hop_body(hop.body, &mut raw)?;

    let mut head = hop.head;
    if let Some(trailers) = trailers {
        for (name, value) in trailers.iter() {
            head.headers.append(name.clone(), value.clone());
        }
    }

    let body = match decoder::response_encoding(&inner.accepts, &head.headers) {
        Some(encoding) if !raw.is_empty() => Bytes::from(decoder::decode(encoding, &raw)?),
        _ => Bytes::from(raw),
    };

    Ok(Response {
        status: head.status,
        version: head.version,
        headers: head.headers,
        url: url.clone(),
        body: BodySource::Full(body),
        history: Vec::new(),
        tls_info: hop.tls_info,
        timings: Timings::default(),
        request_headers: hop.request_headers,
    })
}

fn finish_streaming(hop: Hop, url: &Url) -> Response {
    let body = match hop.body {
        HopBody::Empty => BodySource::Full(Bytes::new()),
        HopBody::H1(reader) => BodySource::Stream(Box::new(reader)),
        HopBody::H2(reader) => BodySource::Stream(Box::new(reader)),
    };

    Response {
        status: hop.head.status,
        version: hop.head.version,
        headers: hop.head.headers,
        url: url.clone(),
        body,
        history: Vec::new(),
        tls_info: hop.tls_info,
        timings: Timings::default(),
        request_headers: hop.request_headers,
    }
}

/// Drain a redirect hop into an eager response for the history list.
fn drain_hop(hop: Hop, url: &Url) -> crate::Result<Response> {
    let mut raw = Vec::new();
    let _ = read_hop_body(hop.body, &mut raw)?;

    Ok(Response {
        status: hop.head.status,
        version: hop.head.version,
        headers: hop.head.headers,
        url: url.clone(),
        body: BodySource::Full(Bytes::from(raw)),
        history: Vec::new(),
        tls_info: hop.tls_info,
        timings: Timings::default(),
        request_headers: hop.request_headers,
    })
}

fn read_hop_body(body: HopBody, out: &mut Vec<u8>) -> crate::Result<Option<HeaderMap>> {
    match body {
        HopBody::Empty => Ok(None),
        HopBody::H1(mut reader) => {
            reader.read_to_end(out).map_err(read_error)?;
            Ok(reader.take_trailers())
        }
        HopBody::H2(mut reader) => {
            reader.read_to_end(out).map_err(read_error)?;
            Ok(reader.take_trailers())
        }
    }
}

fn read_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Error::timeout(),
        // Malformed framing surfaces from the codecs as InvalidData.
        std::io::ErrorKind::InvalidData => Error::decode(e),
        _ => Error::request(e),
    }
}
