//! Request bodies as a tagged union.
//!
//! The polymorphic `data=`/`json=`/`files=` inputs of the caller surface
//! become explicit variants here; the orchestrator serializes them right
//! before the wire.

use std::fmt;
use std::io::Read;

use bytes::Bytes;
use http::HeaderValue;

/// A request body.
pub struct Body {
    pub(crate) inner: Inner,
}

pub(crate) enum Inner {
    /// Raw bytes, sent as-is.
    Bytes(Bytes),
    /// Key/value pairs, serialized as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// A JSON document, serialized as `application/json`.
    #[cfg(feature = "json")]
    Json(serde_json::Value),
    /// A multipart/form-data payload with a fresh boundary.
    #[cfg(feature = "multipart")]
    Multipart(super::multipart::Form),
    /// A lazy stream with unknown length; HTTP/1.1 sends it chunked.
    Reader(Box<dyn Read + Send>),
}

/// A body serialized and ready for the codecs, reusable across the
/// stale-connection retry and redirect hops.
pub(crate) struct MaterializedBody {
    pub(crate) content_type: Option<HeaderValue>,
    pub(crate) payload: Payload,
}

pub(crate) enum Payload {
    None,
    Bytes(Bytes),
    /// Streamed upload; consumed by the first send, so it disarms the
    /// retry and survives no redirect.
    Reader(Box<dyn Read + Send>),
}

impl Body {
    /// Wrap raw bytes.
    pub fn bytes<B: Into<Bytes>>(bytes: B) -> Body {
        Body {
            inner: Inner::Bytes(bytes.into()),
        }
    }

    /// A form body from key/value pairs.
    pub fn form(fields: Vec<(String, String)>) -> Body {
        Body {
            inner: Inner::Form(fields),
        }
    }

    /// A JSON body.
    #[cfg(feature = "json")]
    pub fn json(value: serde_json::Value) -> Body {
        Body {
            inner: Inner::Json(value),
        }
    }

    /// A streaming body read lazily during the send.
    pub fn reader<R: Read + Send + 'static>(reader: R) -> Body {
        Body {
            inner: Inner::Reader(Box::new(reader)),
        }
    }

    pub(crate) fn materialize(self) -> crate::Result<MaterializedBody> {
        match self.inner {
            Inner::Bytes(bytes) => Ok(MaterializedBody {
                content_type: None,
                payload: Payload::Bytes(bytes),
            }),
            Inner::Form(fields) => {
                let encoded =
                    serde_urlencoded::to_string(&fields).map_err(crate::Error::builder)?;
                Ok(MaterializedBody {
                    content_type: Some(HeaderValue::from_static(
                        "application/x-www-form-urlencoded",
                    )),
                    payload: Payload::Bytes(Bytes::from(encoded)),
                })
            }
            #[cfg(feature = "json")]
            Inner::Json(value) => {
                let encoded = serde_json::to_vec(&value).map_err(crate::Error::builder)?;
                Ok(MaterializedBody {
                    content_type: Some(HeaderValue::from_static("application/json")),
                    payload: Payload::Bytes(Bytes::from(encoded)),
                })
            }
            #[cfg(feature = "multipart")]
            Inner::Multipart(form) => {
                let content_type = form.content_type_header();
                let encoded = form.encode()?;
                Ok(MaterializedBody {
                    content_type: Some(content_type),
                    payload: Payload::Bytes(Bytes::from(encoded)),
                })
            }
            Inner::Reader(reader) => Ok(MaterializedBody {
                content_type: None,
                payload: Payload::Reader(reader),
            }),
        }
    }
}

impl MaterializedBody {
    pub(crate) fn empty() -> MaterializedBody {
        MaterializedBody {
            content_type: None,
            payload: Payload::None,
        }
    }

    pub(crate) fn is_reader(&self) -> bool {
        matches!(self.payload, Payload::Reader(_))
    }

    /// Drop the payload, as redirect downgrades (301/302/303) require.
    pub(crate) fn clear(&mut self) {
        self.content_type = None;
        self.payload = Payload::None;
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Body {
        Body::bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Body {
        Body::bytes(bytes)
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Body {
        Body::bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for Body {
    fn from(body: String) -> Body {
        Body::bytes(body.into_bytes())
    }
}

impl From<&'static str> for Body {
    fn from(body: &'static str) -> Body {
        Body::bytes(Bytes::from_static(body.as_bytes()))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.inner {
            Inner::Bytes(bytes) => f.debug_tuple("Body::Bytes").field(&bytes.len()).finish(),
            Inner::Form(fields) => f.debug_tuple("Body::Form").field(&fields.len()).finish(),
            #[cfg(feature = "json")]
            Inner::Json(_) => f.write_str("Body::Json"),
            #[cfg(feature = "multipart")]
            Inner::Multipart(_) => f.write_str("Body::Multipart"),
            Inner::Reader(_) => f.write_str("Body::Reader"),
        }
    }
}
