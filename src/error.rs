use std::{error::Error as StdError, fmt, io};

use http::StatusCode;
use url::Url;

/// A `Result` alias where the `Err` case is `httpmorph::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed error type that can be used for dynamic error handling.
pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// The Errors that may occur when processing a `Request`.
///
/// Note: Errors may include the full URL used to make the `Request`. If the
/// URL contains sensitive information (e.g. an API key as a query
/// parameter), be sure to remove it ([`without_url`](Error::without_url)).
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    url: Option<Url>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                url: None,
            }),
        }
    }

    pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Builder, Some(e))
    }

    pub(crate) fn request<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Request, Some(e))
    }

    pub(crate) fn connect<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Connect, Some(e))
    }

    pub(crate) fn proxy<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Proxy, Some(e))
    }

    pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Tls, Some(e))
    }

    pub(crate) fn cert<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Tls, Some(CertificateInvalid::new(e)))
    }

    pub(crate) fn timeout() -> Error {
        Error::new(Kind::Timeout, Some(TimedOut))
    }

    pub(crate) fn body<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Body, Some(e))
    }

    pub(crate) fn decode<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Decode, Some(e))
    }

    pub(crate) fn redirect<E: Into<BoxError>>(e: E, url: Url) -> Error {
        Error::new(Kind::Redirect, Some(e)).with_url(url)
    }

    pub(crate) fn status_code(url: Url, status: StatusCode) -> Error {
        Error::new(Kind::Status(status), None::<Error>).with_url(url)
    }

    pub(crate) fn url_bad_scheme(url: Url) -> Error {
        Error::new(Kind::Builder, Some(BadScheme)).with_url(url)
    }

    /// Classify an I/O error raised during connect or read into the
    /// engine's taxonomy. Timeouts keep their own kind; everything else is
    /// a transport failure.
    pub(crate) fn from_io(e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::timeout(),
            _ => Error::connect(e),
        }
    }
}

impl Error {
    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Returns a mutable reference to the URL related to this error.
    ///
    /// This is useful if you need to remove sensitive information from the
    /// URL (e.g. an API key in the query), but do not want to remove the
    /// URL entirely.
    pub fn url_mut(&mut self) -> Option<&mut Url> {
        self.inner.url.as_mut()
    }

    /// Add a url related to this error (overwriting any existing).
    pub fn with_url(mut self, url: Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    /// Strip the related url from this error (if, for example, it contains
    /// sensitive information).
    pub fn without_url(mut self) -> Self {
        self.inner.url = None;
        self
    }

    /// Returns true if the error is from a type `Builder`.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error is related to the request.
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }

    /// Returns true if the error is a DNS, TCP, TLS or proxy transport
    /// failure.
    pub fn is_connect(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::Connect | Kind::Proxy | Kind::Tls
        )
    }

    /// Returns true if the error came from the proxy.
    pub fn is_proxy(&self) -> bool {
        matches!(self.inner.kind, Kind::Proxy)
    }

    /// Returns true if the error is related to TLS.
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if the error is a certificate verification failure.
    pub fn is_certificate(&self) -> bool {
        self.has_source::<CertificateInvalid>()
    }

    /// Returns true if the error is related to a timeout.
    pub fn is_timeout(&self) -> bool {
        if matches!(self.inner.kind, Kind::Timeout) {
            return true;
        }

        let mut source = self.source();
        while let Some(err) = source {
            if err.is::<TimedOut>() {
                return true;
            }
            if let Some(io) = err.downcast_ref::<io::Error>() {
                if io.kind() == io::ErrorKind::TimedOut {
                    return true;
                }
            }
            source = err.source();
        }

        false
    }

    /// Returns true if the error is from a redirect policy
    /// (`TooManyRedirects` included).
    pub fn is_redirect(&self) -> bool {
        matches!(self.inner.kind, Kind::Redirect)
    }

    /// Returns true if the redirect chain exceeded the configured maximum.
    pub fn is_too_many_redirects(&self) -> bool {
        self.has_source::<TooManyRedirects>()
    }

    /// Returns true if the error is from `Response::error_for_status`.
    pub fn is_status(&self) -> bool {
        matches!(self.inner.kind, Kind::Status(_))
    }

    /// Returns true if the error is related to the request or response body.
    pub fn is_body(&self) -> bool {
        matches!(self.inner.kind, Kind::Body)
    }

    /// Returns true if the error is related to decoding the response body:
    /// gzip/deflate failure or malformed chunked framing.
    pub fn is_decode(&self) -> bool {
        matches!(self.inner.kind, Kind::Decode)
    }

    /// Returns the status code, if the error was generated from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self.inner.kind {
            Kind::Status(code) => Some(code),
            _ => None,
        }
    }

    fn has_source<M: StdError + 'static>(&self) -> bool {
        let mut source = self.source();
        while let Some(err) = source {
            if err.is::<M>() {
                return true;
            }
            source = err.source();
        }
        false
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("httpmorph::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref url) = self.inner.url {
            builder.field("url", &url.as_str());
        }

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::Request => f.write_str("error sending request")?,
            Kind::Connect => f.write_str("connection error")?,
            Kind::Proxy => f.write_str("proxy error")?,
            Kind::Tls => f.write_str("tls error")?,
            Kind::Timeout => f.write_str("timeout reached")?,
            Kind::Redirect => f.write_str("error following redirect")?,
            Kind::Body => f.write_str("request or response body error")?,
            Kind::Decode => f.write_str("error decoding response body")?,
            Kind::Status(ref code) => {
                let prefix = if code.is_client_error() {
                    "HTTP status client error"
                } else {
                    debug_assert!(code.is_server_error());
                    "HTTP status server error"
                };
                write!(f, "{prefix} ({code})")?;
            }
        };

        if let Some(url) = &self.inner.url {
            write!(f, " for url ({url})")?;
        }

        if let Some(e) = &self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    Builder,
    Request,
    Connect,
    Proxy,
    Tls,
    Timeout,
    Redirect,
    Status(StatusCode),
    Body,
    Decode,
}

#[derive(Debug)]
pub(crate) struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("operation timed out")
    }
}

impl StdError for TimedOut {}

#[derive(Debug)]
pub(crate) struct TooManyRedirects;

impl fmt::Display for TooManyRedirects {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("too many redirects")
    }
}

impl StdError for TooManyRedirects {}

#[derive(Debug)]
pub(crate) struct CertificateInvalid {
    source: BoxError,
}

impl CertificateInvalid {
    fn new<E: Into<BoxError>>(e: E) -> Self {
        CertificateInvalid { source: e.into() }
    }
}

impl fmt::Display for CertificateInvalid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid peer certificate")
    }
}

impl StdError for CertificateInvalid {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}

#[derive(Debug)]
pub(crate) struct BadScheme;

impl fmt::Display for BadScheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("URL scheme is not allowed")
    }
}

impl StdError for BadScheme {}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_source_chain() {
        let root = Error::new(Kind::Request, None::<Error>);
        assert!(root.source().is_none());

        let link = Error::body(root);
        assert!(link.source().is_some());
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn mem_size_of() {
        use std::mem::size_of;
        assert_eq!(size_of::<Error>(), size_of::<usize>());
    }

    #[test]
    fn is_timeout() {
        let err = Error::timeout();
        assert!(err.is_timeout());

        let io = io::Error::from(io::ErrorKind::TimedOut);
        let nested = Error::request(io);
        assert!(nested.is_timeout());
    }

    #[test]
    fn io_timeout_classified() {
        let err = Error::from_io(io::Error::from(io::ErrorKind::TimedOut));
        assert!(err.is_timeout());
        assert!(!err.is_connect());

        let err = Error::from_io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(err.is_connect());
    }

    #[test]
    fn certificate_marker_survives_nesting() {
        let err = Error::cert(io::Error::new(io::ErrorKind::Other, "bad chain"));
        assert!(err.is_certificate());
        assert!(err.is_tls());
        assert!(err.is_connect());
    }

    #[test]
    fn too_many_redirects_marker() {
        let url = Url::parse("http://example.com/loop").unwrap();
        let err = Error::redirect(TooManyRedirects, url);
        assert!(err.is_redirect());
        assert!(err.is_too_many_redirects());
    }

    #[test]
    fn proxy_is_connect_subtype() {
        let err = Error::proxy("CONNECT returned 503");
        assert!(err.is_proxy());
        assert!(err.is_connect());
    }
}
