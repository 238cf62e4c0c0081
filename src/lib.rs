//! # httpmorph
//!
//! An HTTP client whose wire behavior — TLS ClientHello, HTTP/2 SETTINGS,
//! header ordering and ALPN — reproduces a real browser's fingerprint,
//! while staying a practical general-purpose client with pooling, proxies,
//! compression, redirects and a persistent cookie jar.
//!
//! ```no_run
//! # fn run() -> httpmorph::Result<()> {
//! let session = httpmorph::Session::new(
//!     httpmorph::Impersonate::Chrome142,
//!     httpmorph::Os::MacOS,
//! );
//! let res = session.get("https://example.com").send()?;
//! println!("{} via HTTP/{}", res.status(), res.http_version());
//! println!("ja3: {:?}", res.ja3_fingerprint());
//! # Ok(())
//! # }
//! ```
//!
//! The engine is synchronous: one request occupies one thread for its
//! lifetime, and every shared structure (pool, jar, profile registry) is
//! safe for concurrent use, so requests can be issued from as many threads
//! as desired.

mod util;

mod client;
mod connect;
#[cfg(feature = "cookies")]
pub mod cookie;
mod decoder;
pub mod emulation;
mod error;
mod into_url;
mod pool;
mod proto;
mod proxy;
pub mod redirect;
mod tls;

pub use http::{header, HeaderMap, Method, StatusCode, Version};
pub use url::Url;

#[cfg(feature = "multipart")]
pub use self::client::multipart;
#[cfg(feature = "cookies")]
pub use self::client::{Session, SessionBuilder};
pub use self::{
    client::{Body, Chunks, Client, ClientBuilder, Lines, Request, RequestBuilder, Response,
             Timings},
    emulation::{Impersonate, Os},
    error::{Error, Result},
    into_url::IntoUrl,
    proxy::Proxy,
    tls::{Identity, TlsInfo},
};

/// Process-wide TLS library initialization. Safe to call more than once;
/// requests made without calling it initialize lazily.
pub fn init() {
    unsafe {
        boring_sys::CRYPTO_library_init();
    }
}

/// Process-wide teardown hook. BoringSSL keeps no global state that needs
/// explicit release, so this only exists to mirror [`init`] for bindings
/// with paired lifecycle calls.
pub fn cleanup() {}

#[cfg(feature = "cookies")]
mod default_session {
    use once_cell::sync::Lazy;

    use crate::Session;

    /// Convenience requests share one process-default session, so cookies
    /// persist across standalone calls.
    pub(crate) static DEFAULT: Lazy<Session> = Lazy::new(Session::default);
}

macro_rules! convenience_fn {
    ($(#[$doc:meta])* $name:ident, $method:ident) => {
        $(#[$doc])*
        #[cfg(feature = "cookies")]
        pub fn $name<U: IntoUrl>(url: U) -> RequestBuilder {
            default_session::DEFAULT.$method(url)
        }
    };
}

convenience_fn!(
    /// Start a `GET` request on the process-default session.
    get, get
);
convenience_fn!(
    /// Start a `POST` request on the process-default session.
    post, post
);
convenience_fn!(
    /// Start a `PUT` request on the process-default session.
    put, put
);
convenience_fn!(
    /// Start a `PATCH` request on the process-default session.
    patch, patch
);
convenience_fn!(
    /// Start a `DELETE` request on the process-default session.
    delete, delete
);
convenience_fn!(
    /// Start a `HEAD` request on the process-default session.
    head, head
);
convenience_fn!(
    /// Start an `OPTIONS` request on the process-default session.
    options, options
);

/// Start a request with an arbitrary method on the process-default
/// session.
#[cfg(feature = "cookies")]
pub fn request<U: IntoUrl>(method: Method, url: U) -> RequestBuilder {
    default_session::DEFAULT.request(method, url)
}

/// The crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
