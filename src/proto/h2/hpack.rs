//! HPACK header compression (RFC 7541).
//!
//! The encoder indexes against the static table and never inserts into the
//! dynamic table, which is always a valid strategy; sensitive headers
//! (authorization, cookie) use the never-indexed literal form. The decoder
//! maintains the dynamic table at the size advertised in our SETTINGS and
//! understands Huffman-coded strings.

use once_cell::sync::Lazy;

use crate::error::Error;

/// The static table (RFC 7541 Appendix A), indices 1-61.
pub(crate) static STATIC_TABLE: [(&str, &str); 61] = [
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

/// The Huffman code (RFC 7541 Appendix B): (code, bit length) per symbol,
/// plus EOS at index 256.
#[rustfmt::skip]
static HUFFMAN_TABLE: [(u32, u8); 257] = [
    (0x1ff8, 13), (0x7fffd8, 23), (0xfffffe2, 28), (0xfffffe3, 28),
    (0xfffffe4, 28), (0xfffffe5, 28), (0xfffffe6, 28), (0xfffffe7, 28),
    (0xfffffe8, 28), (0xffffea, 24), (0x3ffffffc, 30), (0xfffffe9, 28),
    (0xfffffea, 28), (0x3ffffffd, 30), (0xfffffeb, 28), (0xfffffec, 28),
    (0xfffffed, 28), (0xfffffee, 28), (0xfffffef, 28), (0xffffff0, 28),
    (0xffffff1, 28), (0xffffff2, 28), (0x3ffffffe, 30), (0xffffff3, 28),
    (0xffffff4, 28), (0xffffff5, 28), (0xffffff6, 28), (0xffffff7, 28),
    (0xffffff8, 28), (0xffffff9, 28), (0xffffffa, 28), (0xffffffb, 28),
    (0x14, 6), (0x3f8, 10), (0x3f9, 10), (0xffa, 12),
    (0x1ff9, 13), (0x15, 6), (0xf8, 8), (0x7fa, 11),
    (0x3fa, 10), (0x3fb, 10), (0xf9, 8), (0x7fb, 11),
    (0xfa, 8), (0x16, 6), (0x17, 6), (0x18, 6),
    (0x0, 5), (0x1, 5), (0x2, 5), (0x19, 6),
    (0x1a, 6), (0x1b, 6), (0x1c, 6), (0x1d, 6),
    (0x1e, 6), (0x1f, 6), (0x5c, 7), (0xfb, 8),
    (0x7ffc, 15), (0x20, 6), (0xffb, 12), (0x3fc, 10),
    (0x1ffa, 13), (0x21, 6), (0x5d, 7), (0x5e, 7),
    (0x5f, 7), (0x60, 7), (0x61, 7), (0x62, 7),
    (0x63, 7), (0x64, 7), (0x65, 7), (0x66, 7),
    (0x67, 7), (0x68, 7), (0x69, 7), (0x6a, 7),
    (0x6b, 7), (0x6c, 7), (0x6d, 7), (0x6e, 7),
    (0x6f, 7), (0x70, 7), (0x71, 7), (0x72, 7),
    (0xfc, 8), (0x73, 7), (0xfd, 8), (0x1ffb, 13),
    (0x7fff0, 19), (0x1ffc, 13), (0x3ffc, 14), (0x22, 6),
    (0x7ffd, 15), (0x3, 5), (0x23, 6), (0x4, 5),
    (0x24, 6), (0x5, 5), (0x25, 6), (0x26, 6),
    (0x27, 6), (0x6, 5), (0x74, 7), (0x75, 7),
    (0x28, 6), (0x29, 6), (0x2a, 6), (0x7, 5),
    (0x2b, 6), (0x76, 7), (0x2c, 6), (0x8, 5),
    (0x9, 5), (0x2d, 6), (0x77, 7), (0x78, 7),
    (0x79, 7), (0x7a, 7), (0x7b, 7), (0x7ffe, 15),
    (0x7fc, 11), (0x3ffd, 14), (0x1ffd, 13), (0xffffffc, 28),
    (0xfffe6, 20), (0x3fffd2, 22), (0xfffe7, 20), (0xfffe8, 20),
    (0x3fffd3, 22), (0x3fffd4, 22), (0x3fffd5, 22), (0x7fffd9, 23),
    (0x3fffd6, 22), (0x7fffda, 23), (0x7fffdb, 23), (0x7fffdc, 23),
    (0x7fffdd, 23), (0x7fffde, 23), (0xffffeb, 24), (0x7fffdf, 23),
    (0xffffec, 24), (0xffffed, 24), (0x3fffd7, 22), (0x7fffe0, 23),
    (0xffffee, 24), (0x7fffe1, 23), (0x7fffe2, 23), (0x7fffe3, 23),
    (0x7fffe4, 23), (0x1fffdc, 21), (0x3fffd8, 22), (0x7fffe5, 23),
    (0x3fffd9, 22), (0x7fffe6, 23), (0x7fffe7, 23), (0xffffef, 24),
    (0x3fffda, 22), (0x1fffdd, 21), (0xfffe9, 20), (0x3fffdb, 22),
    (0x3fffdc, 22), (0x7fffe8, 23), (0x7fffe9, 23), (0x1fffde, 21),
    (0x7fffea, 23), (0x3fffdd, 22), (0x3fffde, 22), (0xfffff0, 24),
    (0x1fffdf, 21), (0x3fffdf, 22), (0x7fffeb, 23), (0x7fffec, 23),
    (0x1fffe0, 21), (0x1fffe1, 21), (0x3fffe0, 22), (0x1fffe2, 21),
    (0x7fffed, 23), (0x3fffe1, 22), (0x7fffee, 23), (0x7fffef, 23),
    (0xfffea, 20), (0x3fffe2, 22), (0x3fffe3, 22), (0x3fffe4, 22),
    (0x7ffff0, 23), (0x3fffe5, 22), (0x3fffe6, 22), (0x7ffff1, 23),
    (0x3ffffe0, 26), (0x3ffffe1, 26), (0xfffeb, 20), (0x7fff1, 19),
    (0x3fffe7, 22), (0x7ffff2, 23), (0x3fffe8, 22), (0x1ffffec, 25),
    (0x3ffffe2, 26), (0x3ffffe3, 26), (0x3ffffe4, 26), (0x7ffffde, 27),
    (0x7ffffdf, 27), (0x3ffffe5, 26), (0xfffff1, 24), (0x1ffffed, 25),
    (0x7fff2, 19), (0x1fffe3, 21), (0x3ffffe6, 26), (0x7ffffe0, 27),
    (0x7ffffe1, 27), (0x3ffffe7, 26), (0x7ffffe2, 27), (0xfffff2, 24),
    (0x1fffe4, 21), (0x1fffe5, 21), (0x3ffffe8, 26), (0x3ffffe9, 26),
    (0xffffffd, 28), (0x7ffffe3, 27), (0x7ffffe4, 27), (0x7ffffe5, 27),
    (0xfffec, 20), (0xfffff3, 24), (0xfffed, 20), (0x1fffe6, 21),
    (0x3fffe9, 22), (0x1fffe7, 21), (0x1fffe8, 21), (0x7ffff3, 23),
    (0x3fffea, 22), (0x3fffeb, 22), (0x1ffffee, 25), (0x1ffffef, 25),
    (0xfffff4, 24), (0xfffff5, 24), (0x3ffffea, 26), (0x7ffff4, 23),
    (0x3ffffeb, 26), (0x7ffffe6, 27), (0x3ffffec, 26), (0x3ffffed, 26),
    (0x7ffffe7, 27), (0x7ffffe8, 27), (0x7ffffe9, 27), (0x7ffffea, 27),
    (0x7ffffeb, 27), (0xffffffe, 28), (0x7ffffec, 27), (0x7ffffed, 27),
    (0x7ffffee, 27), (0x7ffffef, 27), (0x7fffff0, 27), (0x3ffffee, 26),
    (0x3fffffff, 30),
];

/// Binary decode tree built from `HUFFMAN_TABLE`. Index 0 is the root;
/// a negative child encodes symbol `-(child + 1)`.
static HUFFMAN_TREE: Lazy<Vec<[i32; 2]>> = Lazy::new(|| {
    let mut nodes: Vec<[i32; 2]> = vec![[0; 2]];
    for (symbol, &(code, bits)) in HUFFMAN_TABLE.iter().enumerate() {
        let mut node = 0usize;
        for i in (0..bits).rev() {
            let bit = ((code >> i) & 1) as usize;
            if i == 0 {
                nodes[node][bit] = -(symbol as i32) - 1;
            } else {
                if nodes[node][bit] == 0 {
                    nodes.push([0; 2]);
                    let next = (nodes.len() - 1) as i32;
                    nodes[node][bit] = next;
                }
                node = nodes[node][bit] as usize;
            }
        }
    }
    nodes
});

fn huffman_decode(input: &[u8]) -> crate::Result<Vec<u8>> {
    let tree = &*HUFFMAN_TREE;
    let mut out = Vec::with_capacity(input.len() * 2);
    let mut node = 0usize;
    // Bits consumed since the last emitted symbol, and whether they were
    // all ones: a trailing partial code is only valid as an EOS-prefix
    // padding of at most 7 one-bits.
    let mut depth = 0u8;
    let mut all_ones = true;

    for &byte in input {
        for i in (0..8).rev() {
            let bit = ((byte >> i) & 1) as usize;
            depth += 1;
            all_ones &= bit == 1;

            let next = tree[node][bit];
            if next < 0 {
                let symbol = (-next - 1) as u32;
                if symbol == 256 {
                    return Err(Error::decode("huffman EOS in string"));
                }
                out.push(symbol as u8);
                node = 0;
                depth = 0;
                all_ones = true;
            } else if next == 0 {
                return Err(Error::decode("invalid huffman code"));
            } else {
                node = next as usize;
            }
        }
    }

    if node != 0 && (!all_ones || depth > 7) {
        return Err(Error::decode("huffman string ends mid-symbol"));
    }
    Ok(out)
}

// ===== integer primitives (RFC 7541 §5.1) =====

fn encode_int(value: usize, prefix_bits: u8, first_byte: u8, out: &mut Vec<u8>) {
    let max_prefix = (1usize << prefix_bits) - 1;
    if value < max_prefix {
        out.push(first_byte | value as u8);
        return;
    }
    out.push(first_byte | max_prefix as u8);
    let mut rest = value - max_prefix;
    while rest >= 128 {
        out.push((rest % 128 + 128) as u8);
        rest /= 128;
    }
    out.push(rest as u8);
}

fn decode_int(input: &[u8], pos: &mut usize, prefix_bits: u8) -> crate::Result<usize> {
    let max_prefix = (1usize << prefix_bits) - 1;
    let first = *input
        .get(*pos)
        .ok_or_else(|| Error::decode("truncated hpack integer"))?;
    *pos += 1;

    let mut value = (first as usize) & max_prefix;
    if value < max_prefix {
        return Ok(value);
    }

    let mut shift = 0u32;
    loop {
        let byte = *input
            .get(*pos)
            .ok_or_else(|| Error::decode("truncated hpack integer"))?;
        *pos += 1;
        value = value
            .checked_add(((byte & 0x7f) as usize) << shift)
            .ok_or_else(|| Error::decode("hpack integer overflow"))?;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift > 28 {
            return Err(Error::decode("hpack integer too long"));
        }
    }
}

// ===== encoder =====

/// A header about to be encoded: name must already be lowercase.
pub(crate) struct EncodeField<'a> {
    pub(crate) name: &'a [u8],
    pub(crate) value: &'a [u8],
    pub(crate) sensitive: bool,
}

/// Stateless HPACK encoder over the static table. Strings are emitted as
/// raw literals (the H bit clear), which every decoder accepts.
pub(crate) struct Encoder;

impl Encoder {
    pub(crate) fn encode(fields: &[EncodeField<'_>], out: &mut Vec<u8>) {
        for field in fields {
            Self::encode_field(field, out);
        }
    }

    fn encode_field(field: &EncodeField<'_>, out: &mut Vec<u8>) {
        if field.sensitive {
            // Literal never indexed.
            let name_index = Self::find_name(field.name);
            match name_index {
                Some(index) => encode_int(index, 4, 0x10, out),
                None => {
                    out.push(0x10);
                    Self::encode_string(field.name, out);
                }
            }
            Self::encode_string(field.value, out);
            return;
        }

        match Self::find(field.name, field.value) {
            Match::Full(index) => encode_int(index, 7, 0x80, out),
            Match::Name(index) => {
                // Literal without indexing, indexed name.
                encode_int(index, 4, 0x00, out);
                Self::encode_string(field.value, out);
            }
            Match::None => {
                out.push(0x00);
                Self::encode_string(field.name, out);
                Self::encode_string(field.value, out);
            }
        }
    }

    fn encode_string(bytes: &[u8], out: &mut Vec<u8>) {
        encode_int(bytes.len(), 7, 0x00, out);
        out.extend_from_slice(bytes);
    }

    fn find(name: &[u8], value: &[u8]) -> Match {
        let mut name_index = None;
        for (i, (n, v)) in STATIC_TABLE.iter().enumerate() {
            if n.as_bytes() == name {
                if v.as_bytes() == value {
                    return Match::Full(i + 1);
                }
                if name_index.is_none() {
                    name_index = Some(i + 1);
                }
            }
        }
        match name_index {
            Some(index) => Match::Name(index),
            None => Match::None,
        }
    }

    fn find_name(name: &[u8]) -> Option<usize> {
        STATIC_TABLE
            .iter()
            .position(|(n, _)| n.as_bytes() == name)
            .map(|i| i + 1)
    }
}

enum Match {
    Full(usize),
    Name(usize),
    None,
}

// ===== decoder =====

const ENTRY_OVERHEAD: usize = 32;

/// HPACK decoder with a dynamic table bounded by our advertised
/// SETTINGS_HEADER_TABLE_SIZE.
pub(crate) struct Decoder {
    dynamic: std::collections::VecDeque<(Vec<u8>, Vec<u8>)>,
    dynamic_size: usize,
    max_size: usize,
    /// Upper bound the peer may not exceed via table size updates.
    protocol_max: usize,
}

impl Decoder {
    pub(crate) fn new(max_size: usize) -> Decoder {
        Decoder {
            dynamic: std::collections::VecDeque::new(),
            dynamic_size: 0,
            max_size,
            protocol_max: max_size,
        }
    }

    /// Decode one complete header block.
    pub(crate) fn decode(&mut self, input: &[u8]) -> crate::Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        let mut pos = 0;

        while pos < input.len() {
            let byte = input[pos];
            if byte & 0x80 != 0 {
                // Indexed field.
                let index = decode_int(input, &mut pos, 7)?;
                let (name, value) = self.lookup(index)?;
                out.push((name, value));
            } else if byte & 0xc0 == 0x40 {
                // Literal with incremental indexing.
                let index = decode_int(input, &mut pos, 6)?;
                let name = if index == 0 {
                    self.decode_string(input, &mut pos)?
                } else {
                    self.lookup(index)?.0
                };
                let value = self.decode_string(input, &mut pos)?;
                self.insert(name.clone(), value.clone());
                out.push((name, value));
            } else if byte & 0xe0 == 0x20 {
                // Dynamic table size update.
                let size = decode_int(input, &mut pos, 5)?;
                if size > self.protocol_max {
                    return Err(Error::decode("hpack table size update above limit"));
                }
                self.max_size = size;
                self.evict();
            } else {
                // Literal without indexing (0x00) or never indexed (0x10).
                let index = decode_int(input, &mut pos, 4)?;
                let name = if index == 0 {
                    self.decode_string(input, &mut pos)?
                } else {
                    self.lookup(index)?.0
                };
                let value = self.decode_string(input, &mut pos)?;
                out.push((name, value));
            }
        }

        Ok(out)
    }

    fn decode_string(&self, input: &[u8], pos: &mut usize) -> crate::Result<Vec<u8>> {
        let huffman = input
            .get(*pos)
            .map(|b| b & 0x80 != 0)
            .ok_or_else(|| Error::decode("truncated hpack string"))?;
        let len = decode_int(input, pos, 7)?;
        let end = pos
            .checked_add(len)
            .ok_or_else(|| Error::decode("hpack string overflow"))?;
        let raw = input
            .get(*pos..end)
            .ok_or_else(|| Error::decode("truncated hpack string"))?;
        *pos = end;

        if huffman {
            huffman_decode(raw)
        } else {
            Ok(raw.to_vec())
        }
    }

    fn lookup(&self, index: usize) -> crate::Result<(Vec<u8>, Vec<u8>)> {
        if index == 0 {
            return Err(Error::decode("hpack index zero"));
        }
        if index <= STATIC_TABLE.len() {
            let (name, value) = STATIC_TABLE[index - 1];
            return Ok((name.as_bytes().to_vec(), value.as_bytes().to_vec()));
        }
        self.dynamic
            .get(index - STATIC_TABLE.len() - 1)
            .cloned()
            .ok_or_else(|| Error::decode("hpack index out of range"))
    }

    fn insert(&mut self, name: Vec<u8>, value: Vec<u8>) {
        let size = name.len() + value.len() + ENTRY_OVERHEAD;
        self.dynamic.push_front((name, value));
        self.dynamic_size += size;
        self.evict();
    }

    fn evict(&mut self) {
        while self.dynamic_size > self.max_size {
            if let Some((name, value)) = self.dynamic.pop_back() {
                self.dynamic_size -= name.len() + value.len() + ENTRY_OVERHEAD;
            } else {
                self.dynamic_size = 0;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(name: &'a str, value: &'a str) -> EncodeField<'a> {
        EncodeField {
            name: name.as_bytes(),
            value: value.as_bytes(),
            sensitive: false,
        }
    }

    #[test]
    fn static_full_match_is_single_byte() {
        let mut out = Vec::new();
        Encoder::encode(&[field(":method", "GET")], &mut out);
        assert_eq!(out, vec![0x82]);
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut out = Vec::new();
        Encoder::encode(
            &[
                field(":method", "GET"),
                field(":scheme", "https"),
                field(":authority", "www.example.com"),
                field(":path", "/"),
                field("user-agent", "httpmorph"),
                field("x-custom", "abc"),
            ],
            &mut out,
        );

        let mut decoder = Decoder::new(4096);
        let decoded = decoder.decode(&out).unwrap();
        let as_strs: Vec<(String, String)> = decoded
            .iter()
            .map(|(n, v)| {
                (
                    String::from_utf8_lossy(n).into_owned(),
                    String::from_utf8_lossy(v).into_owned(),
                )
            })
            .collect();

        assert_eq!(as_strs[0], (":method".into(), "GET".into()));
        assert_eq!(as_strs[2], (":authority".into(), "www.example.com".into()));
        assert_eq!(as_strs[4], ("user-agent".into(), "httpmorph".into()));
        assert_eq!(as_strs[5], ("x-custom".into(), "abc".into()));
    }

    #[test]
    fn sensitive_headers_are_never_indexed() {
        let mut out = Vec::new();
        Encoder::encode(
            &[EncodeField {
                name: b"authorization",
                value: b"Basic dXNlcjpwYXNz",
                sensitive: true,
            }],
            &mut out,
        );
        // 0x10 prefix; authorization is static index 23, above the 4-bit
        // prefix maximum of 15, so the index continues into a second byte.
        assert_eq!(out[0], 0x1f);
        assert_eq!(out[1], 8);
    }

    // RFC 7541 Appendix C.4.1: Huffman-coded first request.
    #[test]
    fn rfc7541_c41_huffman_request() {
        let block: Vec<u8> = vec![
            0x82, 0x86, 0x84, 0x41, 0x8c, 0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab,
            0x90, 0xf4, 0xff,
        ];
        let mut decoder = Decoder::new(4096);
        let decoded = decoder.decode(&block).unwrap();

        assert_eq!(decoded[0].0, b":method");
        assert_eq!(decoded[0].1, b"GET");
        assert_eq!(decoded[1].0, b":scheme");
        assert_eq!(decoded[1].1, b"http");
        assert_eq!(decoded[2].0, b":path");
        assert_eq!(decoded[2].1, b"/");
        assert_eq!(decoded[3].0, b":authority");
        assert_eq!(decoded[3].1, b"www.example.com");
    }

    // RFC 7541 Appendix C.3.1: literal (non-Huffman) first request.
    #[test]
    fn rfc7541_c31_literal_request() {
        let mut block: Vec<u8> = vec![0x82, 0x86, 0x84, 0x41, 0x0f];
        block.extend_from_slice(b"www.example.com");
        let mut decoder = Decoder::new(4096);
        let decoded = decoder.decode(&block).unwrap();
        assert_eq!(decoded[3].0, b":authority");
        assert_eq!(decoded[3].1, b"www.example.com");
    }

    #[test]
    fn dynamic_table_entries_are_reusable() {
        // Literal with incremental indexing, then an indexed reference to
        // the same entry (index 62).
        let mut block: Vec<u8> = vec![0x40, 0x0a];
        block.extend_from_slice(b"custom-key");
        block.push(0x0c);
        block.extend_from_slice(b"custom-value");
        block.push(0xbe);

        let mut decoder = Decoder::new(4096);
        let decoded = decoder.decode(&block).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0], decoded[1]);
        assert_eq!(decoded[0].0, b"custom-key");
    }

    #[test]
    fn integer_round_trip_with_continuation() {
        let mut out = Vec::new();
        encode_int(1337, 5, 0x20, &mut out);
        assert_eq!(out, vec![0x3f, 0x9a, 0x0a]);

        let mut pos = 0;
        let value = decode_int(&out, &mut pos, 5).unwrap();
        assert_eq!(value, 1337);
        assert_eq!(pos, out.len());
    }

    #[test]
    fn huffman_round_trippable_strings_decode() {
        // "www.example.com" Huffman encoding from RFC 7541 C.4.1.
        let encoded = [
            0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab, 0x90, 0xf4, 0xff,
        ];
        let decoded = huffman_decode(&encoded).unwrap();
        assert_eq!(decoded, b"www.example.com");
    }

    #[test]
    fn table_size_update_above_limit_rejected() {
        let mut decoder = Decoder::new(4096);
        // 0x20 prefix with a size far above the advertised maximum.
        let mut block = Vec::new();
        encode_int(1 << 20, 5, 0x20, &mut block);
        assert!(decoder.decode(&block).is_err());
    }
}
