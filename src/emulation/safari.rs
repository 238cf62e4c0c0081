//! Safari profiles.

use super::Os;

// ============== TLS settings ==============
pub(super) mod tls {
    use std::borrow::Cow;

    use crate::emulation::tls::{CertCompressionAlgorithm, TlsSettings, TlsVersion};

    pub const CURVES: &str = static_join!(":", "X25519", "P-256", "P-384", "P-521");

    pub const CIPHER_LIST: &str = static_join!(
        ":",
        "TLS_AES_128_GCM_SHA256",
        "TLS_AES_256_GCM_SHA384",
        "TLS_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
        "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
        "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        "TLS_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_RSA_WITH_AES_256_CBC_SHA",
        "TLS_RSA_WITH_AES_128_CBC_SHA"
    );

    pub const SIGALGS_LIST: &str = static_join!(
        ":",
        "ecdsa_secp256r1_sha256",
        "rsa_pss_rsae_sha256",
        "rsa_pkcs1_sha256",
        "ecdsa_secp384r1_sha384",
        "ecdsa_sha1",
        "rsa_pss_rsae_sha384",
        "rsa_pss_rsae_sha384",
        "rsa_pkcs1_sha384",
        "rsa_pss_rsae_sha512",
        "rsa_pkcs1_sha512",
        "rsa_pkcs1_sha1"
    );

    pub const CIPHER_IDS: &[u16] = &[
        0x1301, 0x1302, 0x1303, 0xc02c, 0xc02b, 0xcca9, 0xc030, 0xc02f, 0xcca8, 0xc00a, 0xc009,
        0xc014, 0xc013, 0x009d, 0x009c, 0x0035, 0x002f,
    ];

    /// server_name, extended_master_secret, renegotiation_info,
    /// supported_groups, ec_point_formats, ALPN, status_request,
    /// signature_algorithms, signed_certificate_timestamp, key_share,
    /// psk_key_exchange_modes, supported_versions, compress_certificate,
    /// padding.
    pub const EXTENSION_IDS: &[u16] = &[
        0, 23, 65281, 10, 11, 16, 5, 13, 18, 51, 45, 43, 27, 21,
    ];

    pub const GROUP_IDS: &[u16] = &[29, 23, 24, 25];

    pub fn settings() -> TlsSettings {
        TlsSettings {
            cipher_list: Cow::Borrowed(CIPHER_LIST),
            sigalgs_list: Cow::Borrowed(SIGALGS_LIST),
            curves_list: Cow::Borrowed(CURVES),
            min_tls_version: TlsVersion::Tls1_2,
            max_tls_version: TlsVersion::Tls1_3,
            grease_enabled: true,
            enable_ech_grease: false,
            application_settings: false,
            pre_shared_key: false,
            enable_ocsp_stapling: true,
            enable_signed_cert_timestamps: true,
            cert_compression_algorithm: Some(CertCompressionAlgorithm::Zlib),
            record_size_limit: None,
            cipher_ids: CIPHER_IDS,
            extension_ids: EXTENSION_IDS,
            group_ids: GROUP_IDS,
            ..TlsSettings::default()
        }
    }
}

// ============== HTTP/2 settings ==============
pub(super) mod http2 {
    use crate::emulation::http2::{
        Http2Settings,
        PseudoId::{self, *},
        SettingId::{self, *},
    };

    pub const HEADERS_PSEUDO_ORDER: [PseudoId; 4] = [Method, Scheme, Path, Authority];

    pub const SETTINGS_ORDER: &[SettingId] = &[InitialWindowSize, MaxConcurrentStreams];

    pub fn settings() -> Http2Settings {
        Http2Settings {
            initial_stream_window_size: Some(4_194_304),
            max_concurrent_streams: Some(100),
            settings_order: SETTINGS_ORDER,
            connection_window_update: 10_485_760,
            headers_pseudo_order: HEADERS_PSEUDO_ORDER,
            headers_priority: None,
            ..Http2Settings::default()
        }
    }
}

pub(super) static HEADERS_ORDER: [http::HeaderName; 11] = [
    http::HeaderName::from_static("host"),
    http::HeaderName::from_static("content-type"),
    http::HeaderName::from_static("content-length"),
    http::HeaderName::from_static("accept"),
    http::HeaderName::from_static("origin"),
    http::HeaderName::from_static("referer"),
    http::HeaderName::from_static("user-agent"),
    http::HeaderName::from_static("authorization"),
    http::HeaderName::from_static("accept-language"),
    http::HeaderName::from_static("accept-encoding"),
    http::HeaderName::from_static("cookie"),
];

pub(super) fn user_agent(_os: Os) -> &'static str {
    // Safari ships on Apple platforms only; the macOS string is the one
    // verifiers expect regardless of the requested os.
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) \
     Version/18.0 Safari/605.1.15"
}

pub(crate) mod v18 {
    use http::{
        header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT},
        HeaderMap, HeaderValue,
    };

    use super::{http2, tls, Os};
    use crate::emulation::EmulationProvider;

    pub fn get_settings(os: Os) -> EmulationProvider {
        EmulationProvider {
            tls: tls::settings(),
            http2: http2::settings(),
            default_headers: header_initializer(os),
            headers_order: &super::HEADERS_ORDER,
        }
    }

    fn header_initializer(os: Os) -> HeaderMap {
        let mut headers = HeaderMap::new();
        header_safari_ua!(headers, super::user_agent(os));
        header_safari_accept!(headers);
        headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
        headers
    }
}
