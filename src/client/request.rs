//! Requests and the per-call builder.

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use super::{body::Body, Client, Response};
use crate::{error::Error, proxy::Proxy, redirect, util};

/// A request which can be executed with `Client::execute()`.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Body>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) redirect: Option<redirect::Policy>,
    pub(crate) verify: Option<bool>,
    pub(crate) http2: Option<bool>,
    pub(crate) proxy: Option<Proxy>,
    pub(crate) cookies_override: Option<Vec<(String, String)>>,
    pub(crate) stream: bool,
}

impl Request {
    pub(crate) fn new(method: Method, url: Url) -> Request {
        Request {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            connect_timeout: None,
            read_timeout: None,
            redirect: None,
            verify: None,
            http2: None,
            proxy: None,
            cookies_override: None,
            stream: false,
        }
    }

    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the url.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// A builder to construct the properties of a `Request`.
pub struct RequestBuilder {
    client: Client,
    request: crate::Result<Request>,
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, request: crate::Result<Request>) -> RequestBuilder {
        RequestBuilder { client, request }
    }

    /// Add a header to this request.
    pub fn header<K, V>(mut self, key: K, value: V) -> RequestBuilder
    where
        K: TryInto<HeaderName>,
        K::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        if let Ok(ref mut req) = self.request {
            match (key.try_into(), value.try_into()) {
                (Ok(key), Ok(value)) => {
                    req.headers.insert(key, value);
                }
                (Err(e), _) => self.request = Err(Error::builder(e.into())),
                (_, Err(e)) => self.request = Err(Error::builder(e.into())),
            }
        }
        self
    }

    /// Add a set of headers to the existing ones on this request.
    pub fn headers(mut self, headers: HeaderMap) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            util::replace_headers(&mut req.headers, headers);
        }
        self
    }

    /// Merge key/value pairs into the url's query string.
    ///
    /// Keys already present in the query are kept; the new pair is
    /// appended after them.
    pub fn query<K, V>(mut self, pairs: &[(K, V)]) -> RequestBuilder
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if let Ok(ref mut req) = self.request {
            let mut serializer = req.url.query_pairs_mut();
            for (key, value) in pairs {
                serializer.append_pair(key.as_ref(), value.as_ref());
            }
            drop(serializer);
            if req.url.query() == Some("") {
                req.url.set_query(None);
            }
        }
        self
    }

    /// Set the request body.
    pub fn body<B: Into<Body>>(mut self, body: B) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.body = Some(body.into());
        }
        self
    }

    /// Send a form body serialized from `form`.
    pub fn form<I, K, V>(mut self, form: I) -> RequestBuilder
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if let Ok(ref mut req) = self.request {
            let fields = form
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();
            req.body = Some(Body::form(fields));
        }
        self
    }

    /// Send a JSON body. When both `json` and `body` are set, the last
    /// call wins; the convenience functions always prefer `json`.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            match serde_json::to_value(json) {
                Ok(value) => req.body = Some(Body::json(value)),
                Err(e) => self.request = Err(Error::builder(e)),
            }
        }
        self
    }

    /// Send a multipart/form-data body.
    #[cfg(feature = "multipart")]
    pub fn multipart(mut self, form: super::multipart::Form) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.body = Some(Body {
                inner: super::body::Inner::Multipart(form),
            });
        }
        self
    }

    /// Enable HTTP basic authentication.
    pub fn basic_auth<U, P>(self, username: U, password: Option<P>) -> RequestBuilder
    where
        U: std::fmt::Display,
        P: std::fmt::Display,
    {
        let header = util::basic_auth(username, password);
        self.header(http::header::AUTHORIZATION, header)
    }

    /// Enable HTTP bearer authentication.
    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> RequestBuilder {
        let header = format!("Bearer {token}");
        self.header(http::header::AUTHORIZATION, header)
    }

    /// Set both the connect and read timeouts.
    pub fn timeout(mut self, timeout: Duration) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.timeout = Some(timeout);
        }
        self
    }

    /// Set the connect-phase timeout alone.
    pub fn connect_timeout(mut self, timeout: Duration) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.connect_timeout = Some(timeout);
        }
        self
    }

    /// Set the read-phase timeout alone.
    pub fn read_timeout(mut self, timeout: Duration) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.read_timeout = Some(timeout);
        }
        self
    }

    /// Override the client's redirect policy for this request.
    pub fn redirect(mut self, policy: redirect::Policy) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.redirect = Some(policy);
        }
        self
    }

    /// Follow redirects (`true`, the default) or return the first
    /// response as-is.
    pub fn allow_redirects(self, allow: bool) -> RequestBuilder {
        if allow {
            self
        } else {
            self.redirect(redirect::Policy::none())
        }
    }

    /// Cap the redirect chain length for this request.
    pub fn max_redirects(self, max: usize) -> RequestBuilder {
        self.redirect(redirect::Policy::limited(max))
    }

    /// Override certificate verification for this request.
    pub fn verify(mut self, verify: bool) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.verify = Some(verify);
        }
        self
    }

    /// Override the HTTP/2 preference for this request.
    pub fn http2(mut self, http2: bool) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.http2 = Some(http2);
        }
        self
    }

    /// Route this request through `proxy`, overriding the client's
    /// proxies.
    pub fn proxy(mut self, proxy: Proxy) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.proxy = Some(proxy);
        }
        self
    }

    /// Send exactly these cookies, suppressing the jar for this call.
    pub fn cookies(mut self, cookies: Vec<(String, String)>) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.cookies_override = Some(cookies);
        }
        self
    }

    /// Keep the body unread so it can be streamed with
    /// `Response::chunks`/`Response::lines`. The body is not
    /// decompressed in this mode.
    pub fn stream(mut self, stream: bool) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.stream = stream;
        }
        self
    }

    /// Build the `Request` without sending it.
    pub fn build(self) -> crate::Result<Request> {
        self.request
    }

    /// Send the request, consuming the builder.
    pub fn send(self) -> crate::Result<Response> {
        let request = self.request?;
        self.client.execute(request)
    }
}
