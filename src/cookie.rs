//! HTTP Cookies
//!
//! An ordered, in-memory jar. Cookies are stored keyed by
//! (domain, path, name) in insertion order, which is also the order the
//! `Cookie` header serializes them in; replacing an existing cookie keeps
//! the original creation time (RFC 6265 §5.3).

use std::{
    fmt,
    sync::RwLock,
    time::{Duration, SystemTime},
};

use http::{HeaderMap, HeaderValue};
use url::Url;

pub use cookie_crate::SameSite;

/// A single HTTP cookie, parsed from a `Set-Cookie` header.
#[derive(Debug, Clone)]
pub struct Cookie<'a>(cookie_crate::Cookie<'a>);

impl<'a> Cookie<'a> {
    pub(crate) fn parse(value: &'a HeaderValue) -> Result<Cookie<'a>, cookie_crate::ParseError> {
        std::str::from_utf8(value.as_bytes())
            .map_err(cookie_crate::ParseError::from)
            .and_then(cookie_crate::Cookie::parse)
            .map(Cookie)
    }

    /// The name of the cookie.
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// The value of the cookie.
    pub fn value(&self) -> &str {
        self.0.value()
    }

    /// Returns true if the 'HttpOnly' directive is enabled.
    pub fn http_only(&self) -> bool {
        self.0.http_only().unwrap_or(false)
    }

    /// Returns true if the 'Secure' directive is enabled.
    pub fn secure(&self) -> bool {
        self.0.secure().unwrap_or(false)
    }

    /// Returns the 'SameSite' directive, if set.
    pub fn same_site(&self) -> Option<SameSite> {
        self.0.same_site()
    }

    /// Returns the path directive of the cookie, if set.
    pub fn path(&self) -> Option<&str> {
        self.0.path()
    }

    /// Returns the domain directive of the cookie, if set.
    pub fn domain(&self) -> Option<&str> {
        self.0.domain()
    }

    /// Get the Max-Age information.
    pub fn max_age(&self) -> Option<Duration> {
        self.0.max_age().and_then(|d| d.try_into().ok())
    }

    /// The cookie expiration time.
    pub fn expires(&self) -> Option<SystemTime> {
        match self.0.expires() {
            Some(cookie_crate::Expiration::DateTime(offset)) => Some(SystemTime::from(offset)),
            None | Some(cookie_crate::Expiration::Session) => None,
        }
    }
}

impl fmt::Display for Cookie<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One stored cookie with its RFC 6265 storage attributes.
#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    path: String,
    host_only: bool,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
    expires: Option<SystemTime>,
    created: SystemTime,
}

impl StoredCookie {
    fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expires, Some(at) if at <= now)
    }
}

/// An ordered cookie jar shared by every request issued through a session.
#[derive(Debug, Default)]
pub struct Jar {
    store: RwLock<Vec<StoredCookie>>,
}

impl Jar {
    pub fn new() -> Jar {
        Jar::default()
    }

    /// Store the `Set-Cookie` headers of a response received from `url`.
    pub(crate) fn set_cookies(&self, headers: &HeaderMap, url: &Url) {
        let mut store = self.store.write().unwrap();
        for value in headers.get_all(http::header::SET_COOKIE) {
            match Cookie::parse(value) {
                Ok(cookie) => insert(&mut store, cookie, url),
                Err(e) => log::debug!("invalid Set-Cookie ignored: {e}"),
            }
        }
    }

    /// Add a single cookie, as if `set_cookie` had been received from `url`.
    pub fn add_cookie_str(&self, set_cookie: &str, url: &Url) {
        if let Ok(raw) = cookie_crate::Cookie::parse(set_cookie.to_owned()) {
            let mut store = self.store.write().unwrap();
            insert(&mut store, Cookie(raw), url);
        }
    }

    /// The `Cookie` header value for a request to `url`: every matching,
    /// non-expired cookie in insertion order.
    pub(crate) fn cookie_header(&self, url: &Url) -> Option<HeaderValue> {
        let store = self.store.read().unwrap();
        let now = SystemTime::now();
        let host = url.host_str()?;
        let path = url.path();
        let https = url.scheme() == "https";

        let mut header = String::new();
        for cookie in store.iter() {
            if cookie.is_expired(now)
                || (cookie.secure && !https)
                || !domain_matches(host, &cookie.domain, cookie.host_only)
                || !path_matches(path, &cookie.path)
            {
                continue;
            }
            if !header.is_empty() {
                header.push_str("; ");
            }
            header.push_str(&cookie.name);
            header.push('=');
            header.push_str(&cookie.value);
        }

        if header.is_empty() {
            None
        } else {
            HeaderValue::from_str(&header).ok()
        }
    }

    /// The (name, value) pairs currently stored for `url`.
    pub fn cookies(&self, url: &Url) -> Vec<(String, String)> {
        let store = self.store.read().unwrap();
        let now = SystemTime::now();
        let Some(host) = url.host_str() else {
            return Vec::new();
        };

        store
            .iter()
            .filter(|c| {
                !c.is_expired(now)
                    && domain_matches(host, &c.domain, c.host_only)
                    && path_matches(url.path(), &c.path)
            })
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    /// Look up one cookie's stored attributes by name, for inspection.
    pub fn get(&self, url: &Url, name: &str) -> Option<StoredAttributes> {
        let store = self.store.read().unwrap();
        let host = url.host_str()?;

        store
            .iter()
            .find(|c| c.name == name && domain_matches(host, &c.domain, c.host_only))
            .map(|c| StoredAttributes {
                value: c.value.clone(),
                secure: c.secure,
                http_only: c.http_only,
                same_site: c.same_site,
                expires: c.expires,
                created: c.created,
            })
    }

    /// Remove every stored cookie.
    pub fn clear(&self) {
        self.store.write().unwrap().clear();
    }
}

/// The RFC 6265 storage attributes of one cookie in the jar.
#[derive(Debug, Clone)]
pub struct StoredAttributes {
    pub value: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    pub expires: Option<SystemTime>,
    pub created: SystemTime,
}

fn insert(store: &mut Vec<StoredCookie>, cookie: Cookie<'_>, url: &Url) {
    let Some(host) = url.host_str() else { return };

    // Domain attribute must be a suffix of the request host; otherwise the
    // cookie is rejected. Without the attribute the cookie is host-only.
    let (domain, host_only) = match cookie.domain() {
        Some(domain) => {
            let domain = domain.trim_start_matches('.').to_ascii_lowercase();
            if !domain_suffix_matches(host, &domain) {
                log::debug!("cookie domain {domain} rejected for host {host}");
                return;
            }
            (domain, false)
        }
        None => (host.to_ascii_lowercase(), true),
    };

    let path = match cookie.path() {
        Some(path) if path.starts_with('/') => path.to_owned(),
        _ => default_path(url.path()),
    };

    // Max-Age wins over Expires (RFC 6265 §4.1.2.2).
    let now = SystemTime::now();
    let expires = match cookie.max_age() {
        Some(max_age) => Some(now + max_age),
        None => cookie.expires(),
    };

    let replaced = store.iter_mut().find(|c| {
        c.name == cookie.name() && c.domain == domain && c.path == path
    });

    match replaced {
        Some(existing) => {
            // New value replaces the old one in place; creation time is
            // preserved (RFC 6265 §5.3 step 11.3).
            log::trace!(
                "cookie {} replaced, created {:?}",
                existing.name,
                existing.created
            );
            existing.value = cookie.value().to_owned();
            existing.host_only = host_only;
            existing.secure = cookie.secure();
            existing.http_only = cookie.http_only();
            existing.same_site = cookie.same_site();
            existing.expires = expires;
        }
        None => store.push(StoredCookie {
            name: cookie.name().to_owned(),
            value: cookie.value().to_owned(),
            domain,
            path,
            host_only,
            secure: cookie.secure(),
            http_only: cookie.http_only(),
            same_site: cookie.same_site(),
            expires,
            created: now,
        }),
    }
}

/// RFC 6265 §5.1.4 default-path: the request path up to, but not
/// including, its last `/`.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_owned();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_owned(),
        Some(idx) => request_path[..idx].to_owned(),
    }
}

fn domain_matches(host: &str, domain: &str, host_only: bool) -> bool {
    let host = host.to_ascii_lowercase();
    if host_only {
        host == domain
    } else {
        domain_suffix_matches(&host, domain)
    }
}

/// RFC 6265 §5.1.3 domain-matching: identical, or `host` ends with
/// `.domain` and is not an IP address.
fn domain_suffix_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    if host == domain {
        return true;
    }
    if host.parse::<std::net::IpAddr>().is_ok() {
        return false;
    }
    host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

/// RFC 6265 §5.1.4 path-matching.
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}
