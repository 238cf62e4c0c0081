//! Response body decompression.

use http::HeaderMap;

/// Which content encodings the client decodes transparently.
#[derive(Clone, Debug)]
pub(crate) struct Accepts {
    #[cfg(feature = "gzip")]
    pub(crate) gzip: bool,
    #[cfg(feature = "deflate")]
    pub(crate) deflate: bool,
}

impl Accepts {
    #[cfg(feature = "gzip")]
    pub(crate) fn gzip(&mut self, enabled: bool) {
        self.gzip = enabled;
    }

    #[cfg(feature = "deflate")]
    pub(crate) fn deflate(&mut self, enabled: bool) {
        self.deflate = enabled;
    }
}

impl Default for Accepts {
    fn default() -> Accepts {
        Accepts {
            #[cfg(feature = "gzip")]
            gzip: true,
            #[cfg(feature = "deflate")]
            deflate: true,
        }
    }
}

/// The declared `Content-Encoding`, if it is one this build decodes.
pub(crate) fn response_encoding(accepts: &Accepts, headers: &HeaderMap) -> Option<Encoding> {
    let value = headers.get(http::header::CONTENT_ENCODING)?;
    let value = value.to_str().ok()?.trim();

    #[cfg(feature = "gzip")]
    if accepts.gzip && (value.eq_ignore_ascii_case("gzip") || value.eq_ignore_ascii_case("x-gzip"))
    {
        return Some(Encoding::Gzip);
    }

    #[cfg(feature = "deflate")]
    if accepts.deflate && value.eq_ignore_ascii_case("deflate") {
        return Some(Encoding::Deflate);
    }

    #[cfg(not(any(feature = "gzip", feature = "deflate")))]
    let _ = (accepts, value);
    None
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Encoding {
    #[cfg(feature = "gzip")]
    Gzip,
    #[cfg(feature = "deflate")]
    Deflate,
}

/// Decode a complete body. The output buffer starts at the compressed size
/// and doubles, preserving the already-decoded prefix on each growth.
pub(crate) fn decode(encoding: Encoding, body: &[u8]) -> crate::Result<Vec<u8>> {
    match encoding {
        #[cfg(feature = "gzip")]
        Encoding::Gzip => {
            let reader = flate2::read::MultiGzDecoder::new(body);
            drain(reader, body.len())
        }
        #[cfg(feature = "deflate")]
        Encoding::Deflate => {
            // Servers disagree on whether "deflate" means zlib-wrapped or
            // raw; try zlib first and fall back.
            let reader = flate2::read::ZlibDecoder::new(body);
            match drain(reader, body.len()) {
                Ok(out) => Ok(out),
                Err(_) => {
                    let reader = flate2::read::DeflateDecoder::new(body);
                    drain(reader, body.len())
                }
            }
        }
    }
}

fn drain<R: std::io::Read>(mut reader: R, initial: usize) -> crate::Result<Vec<u8>> {
    let mut buf = crate::proto::GrowBuf::with_capacity(initial.max(64));
    loop {
        match buf.read_from(&mut reader) {
            Ok(0) => return Ok(buf.into_vec()),
            Ok(_) => {}
            Err(e) => return Err(crate::Error::decode(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_round_trip() {
        let payload: Vec<u8> = (0..150_000u32).map(|i| (i % 251) as u8).collect();
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&payload).unwrap();
        let compressed = encoder.finish().unwrap();

        let decoded = decode(Encoding::Gzip, &compressed).unwrap();
        assert_eq!(decoded, payload);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn truncated_gzip_is_a_decode_error() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"hello world").unwrap();
        let mut compressed = encoder.finish().unwrap();
        compressed.truncate(compressed.len() / 2);

        let err = decode(Encoding::Gzip, &compressed).unwrap_err();
        assert!(err.is_decode());
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn deflate_zlib_and_raw_both_decode() {
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(100);

        let mut zlib =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        zlib.write_all(&payload).unwrap();
        let zlib = zlib.finish().unwrap();
        assert_eq!(decode(Encoding::Deflate, &zlib).unwrap(), payload);

        let mut raw =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        raw.write_all(&payload).unwrap();
        let raw = raw.finish().unwrap();
        assert_eq!(decode(Encoding::Deflate, &raw).unwrap(), payload);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn identity_encoding_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_ENCODING,
            http::HeaderValue::from_static("identity"),
        );
        assert_eq!(response_encoding(&Accepts::default(), &headers), None);
    }
}
