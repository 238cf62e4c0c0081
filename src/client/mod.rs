//! The `Client`, `Session` and their builder.

pub(crate) mod body;
mod exec;
#[cfg(feature = "multipart")]
pub mod multipart;
mod request;
mod response;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use http::{HeaderMap, HeaderName, Method};
use once_cell::sync::Lazy;

pub use self::{
    body::Body,
    request::{Request, RequestBuilder},
    response::{Chunks, Lines, Response, Timings},
};
#[cfg(feature = "cookies")]
use crate::cookie::Jar;
use crate::{
    decoder::Accepts,
    emulation::{self, EmulationProvider, Impersonate, Os},
    into_url::IntoUrl,
    pool::Pool,
    proxy::Proxy,
    redirect,
    tls::TlsConnector,
    util,
};

/// The process-wide pool every client shares unless configured otherwise.
static SHARED_POOL: Lazy<Arc<Pool>> = Lazy::new(Arc::default);

pub(crate) struct ClientInner {
    pub(crate) emulation: EmulationProvider,
    pub(crate) default_headers: HeaderMap,
    pub(crate) headers_order: &'static [HeaderName],
    pub(crate) http2: bool,
    pub(crate) verify: bool,
    pub(crate) proxies: Vec<Proxy>,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) redirect: redirect::Policy,
    pub(crate) accepts: Accepts,
    #[cfg(feature = "cookies")]
    pub(crate) jar: Option<Arc<Jar>>,
    pub(crate) identity: Option<crate::tls::Identity>,
    pub(crate) pool: Arc<Pool>,
    /// Connectors are built lazily per verification mode and reused for
    /// every connection of this client.
    connectors: Mutex<HashMap<bool, Arc<TlsConnector>>>,
}

impl ClientInner {
    pub(crate) fn tls_connector(&self, verify: bool) -> crate::Result<Arc<TlsConnector>> {
        let mut connectors = self.connectors.lock().unwrap();
        if let Some(connector) = connectors.get(&verify) {
            return Ok(connector.clone());
        }
        let connector = Arc::new(TlsConnector::new(
            &self.emulation.tls,
            verify,
            self.identity.as_ref(),
        )?);
        connectors.insert(verify, connector.clone());
        Ok(connector)
    }
}

/// An HTTP client with a browser wire fingerprint.
///
/// A `Client` is cheap to clone: clones share the configuration and the
/// connection pool.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// A `Client` with the default (Chrome) profile.
    pub fn new() -> Client {
        Client::builder().build().expect("default client config is valid")
    }

    /// A `ClientBuilder` to configure a `Client`.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Start building a request with `method` to `url`.
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        let request = url.into_url().map(|url| Request::new(method, url));
        RequestBuilder::new(self.clone(), request)
    }

    /// Convenience method to make a `GET` request.
    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request.
    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Convenience method to make a `PUT` request.
    pub fn put<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Convenience method to make a `PATCH` request.
    pub fn patch<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Convenience method to make a `DELETE` request.
    pub fn delete<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Convenience method to make a `HEAD` request.
    pub fn head<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Convenience method to make an `OPTIONS` request.
    pub fn options<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::OPTIONS, url)
    }

    /// Execute a built `Request`.
    pub fn execute(&self, request: Request) -> crate::Result<Response> {
        exec::execute(&self.inner, request)
    }

    /// The cookie jar, when this client keeps one.
    #[cfg(feature = "cookies")]
    pub fn cookie_jar(&self) -> Option<&Arc<Jar>> {
        self.inner.jar.as_ref()
    }

    /// Tear down this client's view of the connection pool. Only closes
    /// the shared pool's connections when called explicitly; dropping a
    /// client never does.
    pub fn clear_pool(&self) {
        self.inner.pool.clear();
    }
}

impl Default for Client {
    fn default() -> Client {
        Client::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("http2", &self.inner.http2)
            .field("verify", &self.inner.verify)
            .finish()
    }
}

/// A builder for `Client` and `Session`.
#[derive(Debug)]
pub struct ClientBuilder {
    impersonate: Impersonate,
    os: Os,
    headers: HeaderMap,
    http2: bool,
    verify: bool,
    proxies: Vec<Proxy>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    redirect: redirect::Policy,
    accepts: Accepts,
    cookie_store: bool,
    identity: Option<crate::tls::Identity>,
    pool_idle_timeout: Duration,
    pool_max_per_host: usize,
    pool_max_total: usize,
    custom_pool: bool,
}

impl ClientBuilder {
    pub fn new() -> ClientBuilder {
        ClientBuilder {
            impersonate: Impersonate::default(),
            os: Os::default(),
            headers: HeaderMap::new(),
            http2: true,
            verify: true,
            proxies: Vec::new(),
            connect_timeout: Some(Duration::from_secs(30)),
            read_timeout: Some(Duration::from_secs(30)),
            redirect: redirect::Policy::default(),
            accepts: Accepts::default(),
            cookie_store: false,
            identity: None,
            pool_idle_timeout: crate::pool::DEFAULT_IDLE_TIMEOUT,
            pool_max_per_host: crate::pool::DEFAULT_MAX_PER_HOST,
            pool_max_total: crate::pool::DEFAULT_MAX_TOTAL,
            custom_pool: false,
        }
    }

    /// Choose the browser version to impersonate.
    pub fn impersonate(mut self, ver: Impersonate) -> ClientBuilder {
        self.impersonate = ver;
        self
    }

    /// Choose the operating system the profile claims.
    pub fn impersonate_os(mut self, os: Os) -> ClientBuilder {
        self.os = os;
        self
    }

    /// Default headers merged over the profile template for every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> ClientBuilder {
        self.headers = headers;
        self
    }

    /// Offer HTTP/2 via ALPN (`true`, the default) or stick to HTTP/1.1.
    pub fn http2(mut self, enabled: bool) -> ClientBuilder {
        self.http2 = enabled;
        self
    }

    /// Verify peer certificates (`true`, the default).
    pub fn verify(mut self, verify: bool) -> ClientBuilder {
        self.verify = verify;
        self
    }

    /// Present a client certificate during the handshake.
    pub fn identity(mut self, identity: crate::tls::Identity) -> ClientBuilder {
        self.identity = Some(identity);
        self
    }

    /// Add a proxy; proxies are tried in insertion order per request.
    pub fn proxy(mut self, proxy: Proxy) -> ClientBuilder {
        self.proxies.push(proxy);
        self
    }

    /// Set both the connect and read timeouts.
    pub fn timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.connect_timeout = Some(timeout);
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the connect-phase timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read-phase timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the redirect policy.
    pub fn redirect(mut self, policy: redirect::Policy) -> ClientBuilder {
        self.redirect = policy;
        self
    }

    /// Keep a cookie jar across requests.
    #[cfg(feature = "cookies")]
    pub fn cookie_store(mut self, enabled: bool) -> ClientBuilder {
        self.cookie_store = enabled;
        self
    }

    /// Decode gzip response bodies (`true`, the default).
    #[cfg(feature = "gzip")]
    pub fn gzip(mut self, enabled: bool) -> ClientBuilder {
        self.accepts.gzip(enabled);
        self
    }

    /// Decode deflate response bodies (`true`, the default).
    #[cfg(feature = "deflate")]
    pub fn deflate(mut self, enabled: bool) -> ClientBuilder {
        self.accepts.deflate(enabled);
        self
    }

    /// How long an idle pooled connection stays usable.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.pool_idle_timeout = timeout;
        self.custom_pool = true;
        self
    }

    /// Maximum pooled connections per origin.
    pub fn pool_max_per_host(mut self, max: usize) -> ClientBuilder {
        self.pool_max_per_host = max;
        self.custom_pool = true;
        self
    }

    /// Maximum pooled connections overall.
    pub fn pool_max_total(mut self, max: usize) -> ClientBuilder {
        self.pool_max_total = max;
        self.custom_pool = true;
        self
    }

    /// Use a private pool instead of the process-wide one; test isolation.
    pub fn pool_isolated(mut self) -> ClientBuilder {
        self.custom_pool = true;
        self
    }

    pub fn build(self) -> crate::Result<Client> {
        let provider = emulation::provider(self.impersonate, self.os);

        let mut default_headers = provider.default_headers.clone();
        util::replace_headers(&mut default_headers, self.headers);

        let pool = if self.custom_pool {
            Arc::new(Pool::new(
                self.pool_idle_timeout,
                self.pool_max_per_host,
                self.pool_max_total,
            ))
        } else {
            SHARED_POOL.clone()
        };

        #[cfg(feature = "cookies")]
        let jar = self.cookie_store.then(|| Arc::new(Jar::new()));
        #[cfg(not(feature = "cookies"))]
        if self.cookie_store {
            return Err(crate::Error::builder("cookies feature is disabled"));
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                headers_order: provider.headers_order,
                emulation: provider,
                default_headers,
                http2: self.http2,
                verify: self.verify,
                proxies: self.proxies,
                connect_timeout: self.connect_timeout,
                read_timeout: self.read_timeout,
                redirect: self.redirect,
                accepts: self.accepts,
                #[cfg(feature = "cookies")]
                jar,
                identity: self.identity,
                pool,
                connectors: Mutex::new(HashMap::new()),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> ClientBuilder {
        ClientBuilder::new()
    }
}

/// A stateful session: a client plus a persistent cookie jar.
#[cfg(feature = "cookies")]
#[derive(Clone, Debug)]
pub struct Session {
    client: Client,
}

#[cfg(feature = "cookies")]
impl Session {
    /// A session impersonating `browser` on `os`.
    pub fn new(browser: Impersonate, os: Os) -> Session {
        Session::builder()
            .impersonate(browser)
            .impersonate_os(os)
            .build()
            .expect("default session config is valid")
    }

    /// A builder for a session, with the cookie jar always enabled.
    pub fn builder() -> SessionBuilder {
        SessionBuilder {
            inner: Client::builder().cookie_store(true),
        }
    }

    /// The session's cookie jar.
    pub fn cookies(&self) -> &Jar {
        self.client
            .cookie_jar()
            .expect("sessions always keep a jar")
    }

    /// The underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Start building a request with `method` to `url`.
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Convenience method to make a `GET` request.
    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.client.get(url)
    }

    /// Convenience method to make a `POST` request.
    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.client.post(url)
    }

    /// Convenience method to make a `PUT` request.
    pub fn put<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.client.put(url)
    }

    /// Convenience method to make a `PATCH` request.
    pub fn patch<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.client.patch(url)
    }

    /// Convenience method to make a `DELETE` request.
    pub fn delete<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.client.delete(url)
    }

    /// Convenience method to make a `HEAD` request.
    pub fn head<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.client.head(url)
    }

    /// Convenience method to make an `OPTIONS` request.
    pub fn options<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.client.options(url)
    }
}

#[cfg(feature = "cookies")]
impl Default for Session {
    fn default() -> Session {
        Session::new(Impersonate::default(), Os::default())
    }
}

/// Builds a [`Session`]; thin wrapper keeping the jar always on.
#[cfg(feature = "cookies")]
#[derive(Debug)]
pub struct SessionBuilder {
    inner: ClientBuilder,
}

#[cfg(feature = "cookies")]
impl SessionBuilder {
    /// Choose the browser version to impersonate.
    pub fn impersonate(mut self, ver: Impersonate) -> SessionBuilder {
        self.inner = self.inner.impersonate(ver);
        self
    }

    /// Choose the operating system the profile claims.
    pub fn impersonate_os(mut self, os: Os) -> SessionBuilder {
        self.inner = self.inner.impersonate_os(os);
        self
    }

    /// Offer HTTP/2 via ALPN (`true`, the default).
    pub fn http2(mut self, enabled: bool) -> SessionBuilder {
        self.inner = self.inner.http2(enabled);
        self
    }

    /// Verify peer certificates (`true`, the default).
    pub fn verify(mut self, verify: bool) -> SessionBuilder {
        self.inner = self.inner.verify(verify);
        self
    }

    /// Add a proxy.
    pub fn proxy(mut self, proxy: Proxy) -> SessionBuilder {
        self.inner = self.inner.proxy(proxy);
        self
    }

    /// Set both timeouts.
    pub fn timeout(mut self, timeout: Duration) -> SessionBuilder {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Default headers merged over the profile template.
    pub fn default_headers(mut self, headers: HeaderMap) -> SessionBuilder {
        self.inner = self.inner.default_headers(headers);
        self
    }

    /// Use a private pool instead of the process-wide one.
    pub fn pool_isolated(mut self) -> SessionBuilder {
        self.inner = self.inner.pool_isolated();
        self
    }

    pub fn build(self) -> crate::Result<Session> {
        Ok(Session {
            client: self.inner.build()?,
        })
    }
}
