use std::{
    io::{self, Read, Write},
    net::TcpStream,
};

use boring::ssl::SslStream;

/// A TLS session over a connected socket.
///
/// Reads and writes surface `WouldBlock` unchanged so a caller-side
/// scheduler can re-arm on readiness.
pub(crate) struct TlsStream {
    inner: SslStream<TcpStream>,
    insecure: bool,
}

impl TlsStream {
    pub(crate) fn new(inner: SslStream<TcpStream>, insecure: bool) -> Self {
        TlsStream { inner, insecure }
    }

    /// The ALPN protocol the server selected, if any.
    pub(crate) fn negotiated_alpn(&self) -> Option<&[u8]> {
        self.inner.ssl().selected_alpn_protocol()
    }

    /// Negotiated protocol version, e.g. `TLSv1.3`.
    pub(crate) fn tls_version(&self) -> &'static str {
        self.inner.ssl().version_str()
    }

    /// Negotiated cipher suite name.
    pub(crate) fn cipher(&self) -> Option<&'static str> {
        self.inner.ssl().current_cipher().map(|c| c.name())
    }

    /// DER encoding of the peer's leaf certificate.
    pub(crate) fn peer_certificate(&self) -> Option<Vec<u8>> {
        self.inner
            .ssl()
            .peer_certificate()
            .and_then(|cert| cert.to_der().ok())
    }

    /// The ClientHello this connection sent, recorded off the wire.
    pub(crate) fn client_hello(&self) -> Option<Vec<u8>> {
        super::capture::recorded(self.inner.ssl())
    }

    /// True when certificate verification was disabled for this session.
    pub(crate) fn is_insecure(&self) -> bool {
        self.insecure
    }

    pub(crate) fn get_ref(&self) -> &TcpStream {
        self.inner.get_ref()
    }

    /// Send the TLS close_notify alert, ignoring transport errors: the
    /// connection is going away either way.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.inner.shutdown();
    }
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
