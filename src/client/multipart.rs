//! multipart/form-data support.

use std::borrow::Cow;

use bytes::Bytes;
use http::HeaderValue;
use mime::Mime;

use crate::util::fast_random;

/// A multipart form with a freshly drawn boundary.
#[derive(Debug)]
pub struct Form {
    boundary: String,
    parts: Vec<(Cow<'static, str>, Part)>,
}

/// One field of a multipart form.
#[derive(Debug)]
pub struct Part {
    value: Bytes,
    file_name: Option<Cow<'static, str>>,
    mime: Option<Mime>,
}

impl Form {
    pub fn new() -> Form {
        Form {
            boundary: format!(
                "{:016x}-{:016x}-{:016x}-{:016x}",
                fast_random(),
                fast_random(),
                fast_random(),
                fast_random()
            ),
            parts: Vec::new(),
        }
    }

    /// The boundary this form was created with.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text<N, V>(mut self, name: N, value: V) -> Form
    where
        N: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        self.parts
            .push((name.into(), Part::text(value)));
        self
    }

    /// Add a field with custom part configuration (file name, MIME type).
    pub fn part<N: Into<Cow<'static, str>>>(mut self, name: N, part: Part) -> Form {
        self.parts.push((name.into(), part));
        self
    }

    pub(crate) fn content_type_header(&self) -> HeaderValue {
        HeaderValue::from_str(&format!(
            "multipart/form-data; boundary={}",
            self.boundary
        ))
        .expect("boundary is always a valid header value")
    }

    pub(crate) fn encode(&self) -> crate::Result<Vec<u8>> {
        let mut out = Vec::new();

        for (name, part) in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");

            out.extend_from_slice(b"Content-Disposition: form-data; name=\"");
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b"\"");
            if let Some(file_name) = &part.file_name {
                out.extend_from_slice(b"; filename=\"");
                out.extend_from_slice(file_name.as_bytes());
                out.extend_from_slice(b"\"");
            }
            out.extend_from_slice(b"\r\n");

            if let Some(mime) = &part.mime {
                out.extend_from_slice(b"Content-Type: ");
                out.extend_from_slice(mime.as_ref().as_bytes());
                out.extend_from_slice(b"\r\n");
            }

            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.value);
            out.extend_from_slice(b"\r\n");
        }

        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");

        Ok(out)
    }
}

impl Default for Form {
    fn default() -> Form {
        Form::new()
    }
}

impl Part {
    /// A plain text part.
    pub fn text<V: Into<Cow<'static, str>>>(value: V) -> Part {
        Part {
            value: match value.into() {
                Cow::Borrowed(s) => Bytes::from_static(s.as_bytes()),
                Cow::Owned(s) => Bytes::from(s),
            },
            file_name: None,
            mime: None,
        }
    }

    /// A binary part.
    pub fn bytes<B: Into<Bytes>>(value: B) -> Part {
        Part {
            value: value.into(),
            file_name: None,
            mime: None,
        }
    }

    /// Attach a file name; the MIME type is guessed from its extension
    /// unless set explicitly.
    pub fn file_name<N: Into<Cow<'static, str>>>(mut self, file_name: N) -> Part {
        let file_name = file_name.into();
        if self.mime.is_none() {
            self.mime = Some(mime_guess::from_path(file_name.as_ref()).first_or_octet_stream());
        }
        self.file_name = Some(file_name);
        self
    }

    /// Set the part's MIME type.
    pub fn mime(mut self, mime: Mime) -> Part {
        self.mime = Some(mime);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_differ_between_forms() {
        assert_ne!(Form::new().boundary(), Form::new().boundary());
    }

    #[test]
    fn encoded_form_shape() {
        let form = Form::new()
            .text("key", "value")
            .part(
                "file",
                Part::bytes(&b"\x00\x01binary"[..]).file_name("data.bin"),
            );
        let boundary = form.boundary().to_owned();
        let encoded = form.encode().unwrap();
        let text = String::from_utf8_lossy(&encoded);

        assert!(text.contains(&format!("--{boundary}\r\n")));
        assert!(text.contains("Content-Disposition: form-data; name=\"key\"\r\n\r\nvalue"));
        assert!(text.contains("name=\"file\"; filename=\"data.bin\""));
        assert!(text.contains("Content-Type: application/octet-stream"));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }
}
