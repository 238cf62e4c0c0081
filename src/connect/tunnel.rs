//! HTTP CONNECT tunneling.

use std::{
    io::{Read, Write},
    net::TcpStream,
    time::Instant,
};

use http::HeaderValue;

use crate::{error::Error, tls::set_io_deadline};

/// Open an opaque tunnel to `host:port` through an already-connected proxy
/// socket. On success the same socket carries the origin's traffic and may
/// be promoted to TLS as if it were a direct connection.
pub(crate) fn tunnel(
    conn: &mut TcpStream,
    host: &str,
    port: u16,
    auth: Option<&HeaderValue>,
    deadline: Option<Instant>,
) -> crate::Result<()> {
    set_io_deadline(conn, deadline)?;

    let mut buf = format!(
        "\
         CONNECT {host}:{port} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         "
    )
    .into_bytes();

    if let Some(auth) = auth {
        buf.extend_from_slice(b"Proxy-Authorization: ");
        buf.extend_from_slice(auth.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // headers end
    buf.extend_from_slice(b"\r\n");

    conn.write_all(&buf).map_err(Error::from_io)?;

    let mut buf = [0; 8192];
    let mut pos = 0;

    loop {
        let n = conn.read(&mut buf[pos..]).map_err(Error::from_io)?;

        if n == 0 {
            return Err(Error::proxy("unexpected eof while tunneling"));
        }
        pos += n;

        let recvd = &buf[..pos];
        if recvd.starts_with(b"HTTP/1.1 200") || recvd.starts_with(b"HTTP/1.0 200") {
            if recvd.ends_with(b"\r\n\r\n") {
                return Ok(());
            }
            if pos == buf.len() {
                return Err(Error::proxy("proxy headers too long for tunnel"));
            }
        // else read more
        } else if recvd.starts_with(b"HTTP/1.1 407") || recvd.starts_with(b"HTTP/1.0 407") {
            return Err(Error::proxy("proxy authentication required"));
        } else if pos >= 12 {
            let status = String::from_utf8_lossy(&recvd[..recvd.len().min(32)]).into_owned();
            return Err(Error::proxy(format!("unsuccessful tunnel: {status}")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn proxy_stub(reply: &'static [u8]) -> (std::net::SocketAddr, thread::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut req = vec![0u8; 4096];
            let mut total = 0;
            loop {
                let n = sock.read(&mut req[total..]).unwrap();
                total += n;
                if req[..total].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            sock.write_all(reply).unwrap();
            req.truncate(total);
            req
        });
        (addr, handle)
    }

    #[test]
    fn successful_connect() {
        let (addr, handle) = proxy_stub(b"HTTP/1.1 200 Connection established\r\n\r\n");
        let mut conn = TcpStream::connect(addr).unwrap();
        tunnel(&mut conn, "origin.example", 443, None, None).unwrap();

        let req = handle.join().unwrap();
        let req = String::from_utf8(req).unwrap();
        assert!(req.starts_with("CONNECT origin.example:443 HTTP/1.1\r\n"));
        assert!(req.contains("Host: origin.example:443\r\n"));
        assert!(!req.contains("Proxy-Authorization"));
    }

    #[test]
    fn auth_header_is_sent() {
        let (addr, handle) = proxy_stub(b"HTTP/1.1 200 OK\r\n\r\n");
        let mut conn = TcpStream::connect(addr).unwrap();
        let auth = crate::util::basic_auth("user", Some("pass"));
        tunnel(&mut conn, "origin.example", 443, Some(&auth), None).unwrap();

        let req = String::from_utf8(handle.join().unwrap()).unwrap();
        assert!(req.contains("Proxy-Authorization: Basic dXNlcjpwYXNz\r\n"));
    }

    #[test]
    fn auth_required_maps_to_proxy_error() {
        let (addr, _handle) = proxy_stub(b"HTTP/1.1 407 Proxy Authentication Required\r\n\r\n");
        let mut conn = TcpStream::connect(addr).unwrap();
        let err = tunnel(&mut conn, "origin.example", 443, None, None).unwrap_err();
        assert!(err.is_proxy());
        assert!(err.to_string().contains("authentication"));
    }

    #[test]
    fn non_2xx_maps_to_proxy_error() {
        let (addr, _handle) = proxy_stub(b"HTTP/1.1 503 Service Unavailable\r\n\r\n");
        let mut conn = TcpStream::connect(addr).unwrap();
        let err = tunnel(&mut conn, "origin.example", 443, None, None).unwrap_err();
        assert!(err.is_proxy());
    }
}
