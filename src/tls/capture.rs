//! ClientHello capture.
//!
//! GREASE values are drawn inside BoringSSL during the handshake, so the
//! only place the real ClientHello exists is on the wire. A message
//! callback records the outbound handshake bytes into per-connection ex
//! data; the parsed result feeds the connection's JA3/JA4 digests.

use std::{ffi::c_void, os::raw::c_int, slice, sync::Mutex};

use boring::{
    ex_data::Index,
    ssl::{ConnectConfiguration, Ssl, SslRef},
};
use foreign_types::ForeignTypeRef;
use once_cell::sync::Lazy;

const SSL3_RT_HANDSHAKE: c_int = 22;
const HANDSHAKE_CLIENT_HELLO: u8 = 1;

static CAPTURE_INDEX: Lazy<Index<Ssl, Mutex<Vec<u8>>>> =
    Lazy::new(|| Ssl::new_ex_index().expect("ex data index is available"));

/// Arm the capture on a connection about to handshake.
pub(crate) fn arm(config: &mut ConnectConfiguration) {
    config.set_ex_data(*CAPTURE_INDEX, Mutex::new(Vec::new()));
    unsafe {
        boring_sys::SSL_set_msg_callback(config.as_ptr(), Some(msg_callback));
    }
}

/// The recorded ClientHello handshake message, if the callback saw one.
pub(crate) fn recorded(ssl: &SslRef) -> Option<Vec<u8>> {
    ssl.ex_data(*CAPTURE_INDEX)
        .and_then(|capture| capture.lock().ok().map(|bytes| bytes.clone()))
        .filter(|bytes| !bytes.is_empty())
}

unsafe extern "C" fn msg_callback(
    is_write: c_int,
    _version: c_int,
    content_type: c_int,
    buf: *const c_void,
    len: usize,
    ssl: *mut boring_sys::SSL,
    _arg: *mut c_void,
) {
    // outbound handshake records only
    if is_write != 1 || content_type != SSL3_RT_HANDSHAKE || len == 0 {
        return;
    }
    let data = slice::from_raw_parts(buf as *const u8, len);
    if data[0] != HANDSHAKE_CLIENT_HELLO {
        return;
    }
    let ssl = SslRef::from_ptr(ssl);
    if let Some(capture) = ssl.ex_data(*CAPTURE_INDEX) {
        if let Ok(mut bytes) = capture.lock() {
            // Keep the first flight; the repeat after a
            // HelloRetryRequest is not the fingerprint verifiers hash.
            if bytes.is_empty() {
                bytes.extend_from_slice(data);
            }
        }
    }
}

/// The ClientHello fields JA3 and JA4 are computed over, exactly as they
/// appeared on the wire — GREASE values included.
#[derive(Debug, Default)]
pub(crate) struct ParsedClientHello {
    pub(crate) version: u16,
    pub(crate) ciphers: Vec<u16>,
    pub(crate) extensions: Vec<u16>,
    pub(crate) groups: Vec<u16>,
    pub(crate) point_formats: Vec<u8>,
    pub(crate) sigalgs: Vec<u16>,
    pub(crate) supported_versions: Vec<u16>,
    pub(crate) alpn: Vec<String>,
    pub(crate) sni: bool,
}

/// Parse a ClientHello handshake message (type + 24-bit length + body).
pub(crate) fn parse(msg: &[u8]) -> Option<ParsedClientHello> {
    if msg.first() != Some(&HANDSHAKE_CLIENT_HELLO) || msg.len() < 4 {
        return None;
    }
    let body_len = u32::from_be_bytes([0, msg[1], msg[2], msg[3]]) as usize;
    let mut cur = Cursor::new(msg.get(4..4 + body_len)?);

    let mut hello = ParsedClientHello {
        version: cur.u16()?,
        ..ParsedClientHello::default()
    };

    cur.skip(32)?; // random
    let session_id_len = cur.u8()? as usize;
    cur.skip(session_id_len)?;

    let cipher_len = cur.u16()? as usize;
    if cipher_len % 2 != 0 {
        return None;
    }
    for _ in 0..cipher_len / 2 {
        hello.ciphers.push(cur.u16()?);
    }

    let compression_len = cur.u8()? as usize;
    cur.skip(compression_len)?;

    if cur.is_empty() {
        return Some(hello);
    }

    let extensions_len = cur.u16()? as usize;
    let mut exts = Cursor::new(cur.take(extensions_len)?);
    while !exts.is_empty() {
        let id = exts.u16()?;
        let payload_len = exts.u16()? as usize;
        let mut payload = Cursor::new(exts.take(payload_len)?);
        hello.extensions.push(id);

        match id {
            // server_name
            0 => hello.sni = true,
            // supported_groups
            10 => {
                let list_len = payload.u16()? as usize;
                for _ in 0..list_len / 2 {
                    hello.groups.push(payload.u16()?);
                }
            }
            // ec_point_formats
            11 => {
                let list_len = payload.u8()? as usize;
                hello.point_formats = payload.take(list_len)?.to_vec();
            }
            // signature_algorithms
            13 => {
                let list_len = payload.u16()? as usize;
                for _ in 0..list_len / 2 {
                    hello.sigalgs.push(payload.u16()?);
                }
            }
            // application_layer_protocol_negotiation
            16 => {
                let list_len = payload.u16()? as usize;
                let mut list = Cursor::new(payload.take(list_len)?);
                while !list.is_empty() {
                    let name_len = list.u8()? as usize;
                    let name = list.take(name_len)?;
                    hello.alpn.push(String::from_utf8_lossy(name).into_owned());
                }
            }
            // supported_versions
            43 => {
                let list_len = payload.u8()? as usize;
                for _ in 0..list_len / 2 {
                    hello.supported_versions.push(payload.u16()?);
                }
            }
            _ => {}
        }
    }

    Some(hello)
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Cursor<'a> {
        Cursor { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn u8(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn u16(&mut self) -> Option<u16> {
        let bytes = self.buf.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.buf.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(bytes)
    }

    fn skip(&mut self, len: usize) -> Option<()> {
        if self.pos + len > self.buf.len() {
            return None;
        }
        self.pos += len;
        Some(())
    }
}
