//! HTTP/1.1 codec: request serialization and response head parsing.

pub(crate) mod chunked;

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};

use crate::error::Error;

/// Cap on the response head (status line + headers).
const MAX_HEAD_SIZE: usize = 1024 * 1024;

/// Serialize the request head. `target` is origin-form, or absolute-form
/// when talking to an HTTP proxy without a tunnel. Headers are emitted in
/// the given order; the order is the fingerprint and is decided upstream.
pub(crate) fn encode_head(
    method: &Method,
    target: &str,
    headers: &[(HeaderName, HeaderValue)],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    buf.extend_from_slice(method.as_str().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(target.as_bytes());
    buf.extend_from_slice(b" HTTP/1.1\r\n");

    for (name, value) in headers {
        write_header_name(&mut buf, name.as_str());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
    buf
}

/// Browsers titlecase classic header names on HTTP/1.1 but send the
/// client-hint and fetch-metadata families lowercase.
fn write_header_name(buf: &mut Vec<u8>, name: &str) {
    if name.starts_with("sec-") || name == "priority" {
        buf.extend_from_slice(name.as_bytes());
        return;
    }

    let mut upper = true;
    for &b in name.as_bytes() {
        if upper && b.is_ascii_lowercase() {
            buf.push(b.to_ascii_uppercase());
        } else {
            buf.push(b);
        }
        upper = b == b'-';
    }
}

/// A parsed response head.
#[derive(Debug)]
pub(crate) struct ResponseHead {
    pub(crate) version: Version,
    pub(crate) status: StatusCode,
    pub(crate) reason: Option<String>,
    pub(crate) headers: HeaderMap,
}

/// Try to parse a complete head out of `buf`. Returns the head and the
/// number of bytes it occupied, or `None` when more bytes are needed.
pub(crate) fn parse_head(buf: &[u8]) -> crate::Result<Option<(ResponseHead, usize)>> {
    let Some(head_end) = find_head_end(buf) else {
        if buf.len() > MAX_HEAD_SIZE {
            return Err(Error::decode("response head too large"));
        }
        return Ok(None);
    };

    let head = &buf[..head_end - 4];
    let mut lines = head.split(|&b| b == b'\n').map(|line| {
        if line.last() == Some(&b'\r') {
            &line[..line.len() - 1]
        } else {
            line
        }
    });

    let status_line = lines.next().ok_or_else(|| Error::decode("empty head"))?;
    let (version, status, reason) = parse_status_line(status_line)?;

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| Error::decode("malformed header line"))?;
        let name = HeaderName::from_bytes(&line[..colon]).map_err(Error::decode)?;
        let mut value = &line[colon + 1..];
        while value.first() == Some(&b' ') || value.first() == Some(&b'\t') {
            value = &value[1..];
        }
        let value = HeaderValue::from_bytes(value).map_err(Error::decode)?;
        headers.append(name, value);
    }

    Ok(Some((
        ResponseHead {
            version,
            status,
            reason,
            headers,
        },
        head_end,
    )))
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn parse_status_line(line: &[u8]) -> crate::Result<(Version, StatusCode, Option<String>)> {
    let version = if line.starts_with(b"HTTP/1.1 ") {
        Version::HTTP_11
    } else if line.starts_with(b"HTTP/1.0 ") {
        Version::HTTP_10
    } else {
        return Err(Error::decode("unsupported HTTP version in status line"));
    };

    let rest = &line[9..];
    if rest.len() < 3 {
        return Err(Error::decode("truncated status line"));
    }
    let status = std::str::from_utf8(&rest[..3])
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| Error::decode("invalid status code"))?;

    let reason = match rest.get(4..) {
        Some(reason) if !reason.is_empty() => {
            Some(String::from_utf8_lossy(reason).into_owned())
        }
        _ => None,
    };

    Ok((version, status, reason))
}

/// How the response body is framed.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BodyFraming {
    /// No body: HEAD responses, 1xx, 204, 304.
    None,
    /// Exactly this many bytes.
    ContentLength(u64),
    /// `Transfer-Encoding: chunked` — takes precedence over any
    /// `Content-Length` (RFC 7230 §3.3.3).
    Chunked,
    /// Body runs to connection close.
    Close,
}

impl BodyFraming {
    pub(crate) fn for_response(method: &Method, head: &ResponseHead) -> crate::Result<BodyFraming> {
        if method == Method::HEAD
            || head.status.is_informational()
            || head.status == StatusCode::NO_CONTENT
            || head.status == StatusCode::NOT_MODIFIED
        {
            return Ok(BodyFraming::None);
        }

        let chunked = head
            .headers
            .get_all(http::header::TRANSFER_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|v| v.trim().eq_ignore_ascii_case("chunked"));
        if chunked {
            return Ok(BodyFraming::Chunked);
        }

        if let Some(len) = head.headers.get(http::header::CONTENT_LENGTH) {
            let len = len
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .ok_or_else(|| Error::decode("invalid Content-Length"))?;
            return Ok(BodyFraming::ContentLength(len));
        }

        Ok(BodyFraming::Close)
    }
}

/// Whether the connection may be reused after this exchange.
pub(crate) fn is_keep_alive(head: &ResponseHead) -> bool {
    let connection = head
        .headers
        .get(http::header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match head.version {
        Version::HTTP_10 => connection.eq_ignore_ascii_case("keep-alive"),
        _ => !connection.eq_ignore_ascii_case("close"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_head_browser_casing() {
        let headers = vec![
            (
                HeaderName::from_static("host"),
                HeaderValue::from_static("example.com"),
            ),
            (
                HeaderName::from_static("sec-ch-ua-mobile"),
                HeaderValue::from_static("?0"),
            ),
            (
                HeaderName::from_static("upgrade-insecure-requests"),
                HeaderValue::from_static("1"),
            ),
        ];
        let head = encode_head(&Method::GET, "/get", &headers);
        let head = String::from_utf8(head).unwrap();

        assert!(head.starts_with("GET /get HTTP/1.1\r\n"));
        assert!(head.contains("Host: example.com\r\n"));
        assert!(head.contains("sec-ch-ua-mobile: ?0\r\n"));
        assert!(head.contains("Upgrade-Insecure-Requests: 1\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn parse_complete_head() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-Two: a\r\nX-Two: b\r\n\r\nhello";
        let (head, consumed) = parse_head(raw).unwrap().unwrap();

        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(head.version, Version::HTTP_11);
        assert_eq!(head.reason.as_deref(), Some("OK"));
        assert_eq!(head.headers.get("content-length").unwrap(), "5");
        assert_eq!(head.headers.get_all("x-two").iter().count(), 2);
        assert_eq!(&raw[consumed..], b"hello");
    }

    #[test]
    fn partial_head_needs_more() {
        assert!(parse_head(b"HTTP/1.1 200 OK\r\nContent-").unwrap().is_none());
    }

    #[test]
    fn chunked_takes_precedence_over_content_length() {
        let raw =
            b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nTransfer-Encoding: chunked\r\n\r\n";
        let (head, _) = parse_head(raw).unwrap().unwrap();
        let framing = BodyFraming::for_response(&Method::GET, &head).unwrap();
        assert_eq!(framing, BodyFraming::Chunked);
    }

    #[test]
    fn head_response_has_no_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n";
        let (head, _) = parse_head(raw).unwrap().unwrap();
        let framing = BodyFraming::for_response(&Method::HEAD, &head).unwrap();
        assert_eq!(framing, BodyFraming::None);
    }

    #[test]
    fn missing_length_means_read_to_close() {
        let raw = b"HTTP/1.1 200 OK\r\n\r\n";
        let (head, _) = parse_head(raw).unwrap().unwrap();
        let framing = BodyFraming::for_response(&Method::GET, &head).unwrap();
        assert_eq!(framing, BodyFraming::Close);
    }

    #[test]
    fn keep_alive_rules() {
        let (http11, _) = parse_head(b"HTTP/1.1 200 OK\r\n\r\n").unwrap().unwrap();
        assert!(is_keep_alive(&http11));

        let (close, _) = parse_head(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n")
            .unwrap()
            .unwrap();
        assert!(!is_keep_alive(&close));

        let (http10, _) = parse_head(b"HTTP/1.0 200 OK\r\n\r\n").unwrap().unwrap();
        assert!(!is_keep_alive(&http10));

        let (http10_ka, _) = parse_head(b"HTTP/1.0 200 OK\r\nConnection: keep-alive\r\n\r\n")
            .unwrap()
            .unwrap();
        assert!(is_keep_alive(&http10_ka));
    }

    #[test]
    fn status_line_without_reason() {
        let (head, _) = parse_head(b"HTTP/1.1 404\r\n\r\n").unwrap().unwrap();
        assert_eq!(head.status, StatusCode::NOT_FOUND);
        assert_eq!(head.reason, None);
    }
}
