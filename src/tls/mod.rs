//! The TLS engine.
//!
//! Configures BoringSSL from a browser profile so the emitted ClientHello
//! reproduces that browser's wire bytes, then runs the handshake over an
//! established socket.

pub(crate) mod capture;
mod cert_compression;
mod conn;
mod ext;
pub(crate) mod fingerprint;

use std::{
    net::TcpStream,
    time::{Duration, Instant},
};

use boring::ssl::{HandshakeError, SslConnector, SslMethod};

pub(crate) use self::conn::TlsStream;
use self::ext::{ConnectConfigurationExt, SslConnectorBuilderExt};
use crate::{
    emulation::{AlpnProtos, TlsSettings},
    error::Error,
};

/// A client certificate with its private key, in PEM form.
#[derive(Clone)]
pub struct Identity {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

impl Identity {
    /// Build an identity from PEM-encoded certificate and key.
    pub fn from_pem(cert: &[u8], key: &[u8]) -> Identity {
        Identity {
            cert_pem: cert.to_vec(),
            key_pem: key.to_vec(),
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // key material deliberately omitted
        f.debug_struct("Identity").finish()
    }
}

/// TLS session facts recorded per connection and surfaced on the response.
#[derive(Clone, Debug, Default)]
pub struct TlsInfo {
    pub(crate) tls_version: Option<&'static str>,
    pub(crate) cipher: Option<&'static str>,
    pub(crate) alpn: Option<String>,
    pub(crate) ja3: String,
    pub(crate) ja3_hash: String,
    pub(crate) ja4: String,
    pub(crate) peer_certificate: Option<Vec<u8>>,
    pub(crate) insecure: bool,
}

impl TlsInfo {
    /// Negotiated protocol version, e.g. `TLSv1.3`.
    pub fn tls_version(&self) -> Option<&str> {
        self.tls_version.as_deref()
    }

    /// Negotiated cipher suite name.
    pub fn cipher(&self) -> Option<&str> {
        self.cipher.as_deref()
    }

    /// ALPN result: `h2`, `http/1.1`, or empty when the server offered
    /// nothing.
    pub fn alpn(&self) -> &str {
        self.alpn.as_deref().unwrap_or("")
    }

    /// The JA3 string of the ClientHello this connection sent.
    pub fn ja3(&self) -> &str {
        &self.ja3
    }

    /// 32-hex-digit MD5 of the JA3 string.
    pub fn ja3_hash(&self) -> &str {
        &self.ja3_hash
    }

    /// JA4 fingerprint.
    pub fn ja4(&self) -> &str {
        &self.ja4
    }

    /// DER encoding of the peer's leaf certificate.
    pub fn peer_certificate(&self) -> Option<&[u8]> {
        self.peer_certificate.as_deref()
    }

    /// True when certificate verification was skipped for this connection.
    pub fn is_insecure(&self) -> bool {
        self.insecure
    }
}

/// A reusable connector carrying a profile-configured `SSL_CTX`.
///
/// Per-connection fingerprints come from the recorded ClientHello; the
/// declared digests below only back them up if a capture ever goes
/// missing.
pub(crate) struct TlsConnector {
    connector: SslConnector,
    alpn: AlpnProtos,
    application_settings: bool,
    enable_ech_grease: bool,
    verify: bool,
    declared_ja3: String,
    declared_ja4: String,
}

impl TlsConnector {
    pub(crate) fn new(
        settings: &TlsSettings,
        verify: bool,
        identity: Option<&Identity>,
    ) -> crate::Result<TlsConnector> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())
            .map_err(Error::tls)?
            .configure_profile(settings)
            .map_err(Error::tls)?
            .configure_cert_verification(verify)
            .map_err(Error::tls)?;

        if let Some(identity) = identity {
            let cert = boring::x509::X509::from_pem(&identity.cert_pem).map_err(Error::builder)?;
            let key = boring::pkey::PKey::private_key_from_pem(&identity.key_pem)
                .map_err(Error::builder)?;
            builder.set_certificate(&cert).map_err(Error::tls)?;
            builder.set_private_key(&key).map_err(Error::tls)?;
            builder.check_private_key().map_err(Error::tls)?;
        }

        Ok(TlsConnector {
            connector: builder.build(),
            alpn: settings.alpn_protos,
            application_settings: settings.application_settings,
            enable_ech_grease: settings.enable_ech_grease,
            verify,
            declared_ja3: fingerprint::ja3_string(settings),
            declared_ja4: fingerprint::ja4_string(settings),
        })
    }

    /// Run the handshake over `stream` with SNI set to `host`, bounded by
    /// `deadline`. GREASE values are drawn fresh by BoringSSL inside this
    /// call; a message callback records the ClientHello actually sent so
    /// the connection's fingerprints cover those exact bytes.
    pub(crate) fn handshake(
        &self,
        stream: TcpStream,
        host: &str,
        deadline: Option<Instant>,
    ) -> crate::Result<TlsStream> {
        set_io_deadline(&stream, deadline)?;

        let mut config = self.connector.configure().map_err(Error::tls)?;
        config
            .configure_enable_ech_grease(self.enable_ech_grease)
            .map_err(Error::tls)?
            .configure_add_application_settings(self.application_settings, self.alpn)
            .map_err(Error::tls)?;
        if !self.verify {
            config.set_verify_hostname(false);
        }
        capture::arm(&mut config);

        match config.connect(host, stream) {
            Ok(stream) => Ok(TlsStream::new(stream, !self.verify)),
            Err(HandshakeError::SetupFailure(stack)) => Err(Error::tls(stack)),
            Err(HandshakeError::Failure(mid)) => {
                let verify = mid.ssl().verify_result();
                if verify != boring::x509::X509VerifyResult::OK {
                    return Err(Error::cert(verify.error_string()));
                }
                if let Some(io) = mid.error().io_error() {
                    if matches!(
                        io.kind(),
                        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                    ) {
                        return Err(Error::timeout());
                    }
                }
                Err(Error::tls(mid.into_error()))
            }
            Err(HandshakeError::WouldBlock(_)) => Err(Error::timeout()),
        }
    }

    /// Session facts for a completed handshake. JA3/JA4 are computed from
    /// this connection's recorded ClientHello, so each handshake reports
    /// the values its own GREASE draw produced.
    pub(crate) fn tls_info(&self, stream: &TlsStream) -> TlsInfo {
        let (ja3, ja4) = match stream.client_hello().and_then(|bytes| capture::parse(&bytes)) {
            Some(hello) => (
                fingerprint::ja3_from_hello(&hello),
                fingerprint::ja4_from_hello(&hello),
            ),
            None => {
                log::debug!("client hello capture unavailable; reporting declared fingerprint");
                (self.declared_ja3.clone(), self.declared_ja4.clone())
            }
        };
        let ja3_hash = fingerprint::ja3_hash(&ja3);

        TlsInfo {
            tls_version: Some(stream.tls_version()),
            cipher: stream.cipher(),
            alpn: stream
                .negotiated_alpn()
                .map(|alpn| String::from_utf8_lossy(alpn).into_owned()),
            ja3,
            ja3_hash,
            ja4,
            peer_certificate: stream.peer_certificate(),
            insecure: stream.is_insecure(),
        }
    }
}

/// Apply the remaining time before `deadline` as the socket's read and
/// write timeout. An already-expired deadline reports `Timeout` without
/// touching the socket.
pub(crate) fn set_io_deadline(stream: &TcpStream, deadline: Option<Instant>) -> crate::Result<()> {
    let timeout = match deadline {
        Some(deadline) => {
            let now = Instant::now();
            if deadline <= now {
                return Err(Error::timeout());
            }
            Some(deadline - now)
        }
        None => None,
    };
    stream.set_read_timeout(timeout).map_err(Error::connect)?;
    stream.set_write_timeout(timeout).map_err(Error::connect)?;
    Ok(())
}

/// A zero duration means "no timeout" to the OS; clamp to something that
/// still behaves like a deadline.
pub(crate) fn clamp_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        Duration::from_millis(1)
    } else {
        timeout
    }
}
