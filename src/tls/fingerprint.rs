//! TLS ClientHello fingerprint digests.
//!
//! JA3 follows the Salesforce specification: MD5 over
//! `version,ciphers,extensions,groups,formats` with each list dash-joined
//! in wire order and GREASE values dropped (the reference implementation's
//! GREASE_TABLE filter). JA3N additionally sorts ciphers and extensions,
//! which makes it invariant under extension permutation. JA4 follows the
//! Foxio layout `t{ver}{sni}{cc}{ec}{alpn}_{hash12}_{hash12}`.
//!
//! Per-connection digests are computed from the ClientHello recorded off
//! the wire by [`capture`](super::capture), so they cover exactly the
//! bytes each handshake sent. The registry-based variants below compute a
//! profile's *declared* digests from its ordered id lists; the two agree
//! whenever the capture is available.

use sha2::{Digest, Sha256};

use super::capture::ParsedClientHello;
use crate::emulation::{AlpnProtos, TlsSettings, TlsVersion};

/// RFC 8701 GREASE values: both bytes equal, low nibbles 0xA.
pub(crate) fn is_grease(id: u16) -> bool {
    (id & 0x0f0f) == 0x0a0a && (id >> 8) == (id & 0x00ff)
}

fn filter_grease(ids: &[u16]) -> Vec<u16> {
    ids.iter().copied().filter(|&id| !is_grease(id)).collect()
}

fn join_ids(ids: &[u16], sep: char) -> String {
    let mut out = String::with_capacity(ids.len() * 6);
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push(sep);
        }
        out.push_str(&id.to_string());
    }
    out
}

// The ClientHello legacy_version field is 0x0303 for TLS 1.2 and 1.3 alike;
// the real maximum travels in supported_versions.
fn wire_version(_version: TlsVersion) -> u16 {
    771
}

/// The comma-joined JA3 string of one recorded ClientHello: wire order,
/// GREASE filtered.
pub(crate) fn ja3_from_hello(hello: &ParsedClientHello) -> String {
    let formats = hello
        .point_formats
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("-");

    format!(
        "{},{},{},{},{}",
        hello.version,
        join_ids(&filter_grease(&hello.ciphers), '-'),
        join_ids(&filter_grease(&hello.extensions), '-'),
        join_ids(&filter_grease(&hello.groups), '-'),
        formats,
    )
}

/// JA3 of a recorded ClientHello with ciphers and extensions sorted.
pub(crate) fn ja3n_from_hello(hello: &ParsedClientHello) -> String {
    let mut ciphers = filter_grease(&hello.ciphers);
    let mut extensions = filter_grease(&hello.extensions);
    ciphers.sort_unstable();
    extensions.sort_unstable();

    let formats = hello
        .point_formats
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("-");

    format!(
        "{},{},{},{},{}",
        hello.version,
        join_ids(&ciphers, '-'),
        join_ids(&extensions, '-'),
        join_ids(&filter_grease(&hello.groups), '-'),
        formats,
    )
}

/// JA4 of a recorded ClientHello.
pub(crate) fn ja4_from_hello(hello: &ParsedClientHello) -> String {
    let max_version = hello
        .supported_versions
        .iter()
        .copied()
        .filter(|&v| !is_grease(v))
        .max()
        .unwrap_or(hello.version);
    let version = if max_version >= 0x0304 { "13" } else { "12" };

    let ciphers = filter_grease(&hello.ciphers);
    let extensions = filter_grease(&hello.extensions);
    let cipher_count = ciphers.len().min(99);
    let extension_count = extensions.len().min(99);

    let sni = if hello.sni { 'd' } else { 'i' };
    let alpn = match hello.alpn.first() {
        Some(proto) if !proto.is_empty() => {
            let mut chars = proto.chars();
            let first = chars.next().unwrap_or('0');
            let last = proto.chars().last().unwrap_or('0');
            format!("{first}{last}")
        }
        _ => "00".to_owned(),
    };

    let ja4_a = format!("t{version}{sni}{cipher_count:02}{extension_count:02}{alpn}");

    let mut cipher_hex: Vec<String> = ciphers.iter().map(|c| format!("{c:04x}")).collect();
    cipher_hex.sort_unstable();
    let ja4_b = sha256_12(&cipher_hex.join(","));

    let mut extension_hex: Vec<String> = extensions
        .iter()
        .filter(|&&id| id != 0x0000 && id != 0x0010)
        .map(|id| format!("{id:04x}"))
        .collect();
    extension_hex.sort_unstable();

    let sigalg_hex: Vec<String> = hello.sigalgs.iter().map(|id| format!("{id:04x}")).collect();
    let ja4_c = if sigalg_hex.is_empty() {
        sha256_12(&extension_hex.join(","))
    } else {
        sha256_12(&format!(
            "{}_{}",
            extension_hex.join(","),
            sigalg_hex.join(",")
        ))
    };

    format!("{ja4_a}_{ja4_b}_{ja4_c}")
}

/// The comma-joined JA3 string a profile declares, in offer order.
pub(crate) fn ja3_string(tls: &TlsSettings) -> String {
    let formats = tls
        .point_formats
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("-");

    format!(
        "{},{},{},{},{}",
        wire_version(tls.max_tls_version),
        join_ids(tls.cipher_ids, '-'),
        join_ids(tls.extension_ids, '-'),
        join_ids(tls.group_ids, '-'),
        formats,
    )
}

/// The declared JA3 with ciphers and extensions sorted.
pub(crate) fn ja3n_string(tls: &TlsSettings) -> String {
    let mut ciphers = tls.cipher_ids.to_vec();
    let mut extensions = tls.extension_ids.to_vec();
    ciphers.sort_unstable();
    extensions.sort_unstable();

    let formats = tls
        .point_formats
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("-");

    format!(
        "{},{},{},{},{}",
        wire_version(tls.max_tls_version),
        join_ids(&ciphers, '-'),
        join_ids(&extensions, '-'),
        join_ids(tls.group_ids, '-'),
        formats,
    )
}

/// 32-hex-digit MD5 of a JA3/JA3N string.
pub(crate) fn ja3_hash(ja3: &str) -> String {
    format!("{:x}", md5::compute(ja3.as_bytes()))
}

fn sha256_12(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..6])
}

fn alpn_tag(alpn: AlpnProtos) -> &'static str {
    match alpn {
        AlpnProtos::All | AlpnProtos::Http2 => "h2",
        AlpnProtos::Http1 => "h1",
    }
}

fn sigalg_id(name: &str) -> Option<u16> {
    let id = match name {
        "ecdsa_secp256r1_sha256" => 0x0403,
        "ecdsa_secp384r1_sha384" => 0x0503,
        "ecdsa_secp521r1_sha512" => 0x0603,
        "rsa_pss_rsae_sha256" => 0x0804,
        "rsa_pss_rsae_sha384" => 0x0805,
        "rsa_pss_rsae_sha512" => 0x0806,
        "rsa_pkcs1_sha256" => 0x0401,
        "rsa_pkcs1_sha384" => 0x0501,
        "rsa_pkcs1_sha512" => 0x0601,
        "ecdsa_sha1" => 0x0203,
        "rsa_pkcs1_sha1" => 0x0201,
        _ => return None,
    };
    Some(id)
}

/// The declared JA4, with SNI assumed present (the engine always sets it).
pub(crate) fn ja4_string(tls: &TlsSettings) -> String {
    let version = match tls.max_tls_version {
        TlsVersion::Tls1_2 => "12",
        TlsVersion::Tls1_3 => "13",
    };

    let cipher_count = tls.cipher_ids.len().min(99);
    let extension_count = tls.extension_ids.len().min(99);

    let ja4_a = format!(
        "t{version}d{cipher_count:02}{extension_count:02}{}",
        alpn_tag(tls.alpn_protos)
    );

    let mut ciphers: Vec<String> = tls.cipher_ids.iter().map(|c| format!("{c:04x}")).collect();
    ciphers.sort_unstable();
    let ja4_b = sha256_12(&ciphers.join(","));

    // SNI (0x0000) and ALPN (0x0010) are excluded from the hashed
    // extension set, per the JA4 specification.
    let mut extensions: Vec<String> = tls
        .extension_ids
        .iter()
        .filter(|&&id| id != 0x0000 && id != 0x0010)
        .map(|id| format!("{id:04x}"))
        .collect();
    extensions.sort_unstable();

    let sigalgs: Vec<String> = tls
        .sigalgs_list
        .split(':')
        .filter_map(sigalg_id)
        .map(|id| format!("{id:04x}"))
        .collect();

    let ja4_c = if sigalgs.is_empty() {
        sha256_12(&extensions.join(","))
    } else {
        sha256_12(&format!("{}_{}", extensions.join(","), sigalgs.join(",")))
    };

    format!("{ja4_a}_{ja4_b}_{ja4_c}")
}
