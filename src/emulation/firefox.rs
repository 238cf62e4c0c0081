//! Firefox profiles.

use super::Os;

// ============== TLS settings ==============
pub(super) mod tls {
    use std::borrow::Cow;

    use crate::emulation::tls::{CertCompressionAlgorithm, TlsSettings, TlsVersion};

    pub const CURVES: &str =
        static_join!(":", "X25519MLKEM768", "X25519", "P-256", "P-384", "P-521");

    pub const CIPHER_LIST: &str = static_join!(
        ":",
        "TLS_AES_128_GCM_SHA256",
        "TLS_CHACHA20_POLY1305_SHA256",
        "TLS_AES_256_GCM_SHA384",
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        "TLS_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_RSA_WITH_AES_128_CBC_SHA",
        "TLS_RSA_WITH_AES_256_CBC_SHA"
    );

    pub const SIGALGS_LIST: &str = static_join!(
        ":",
        "ecdsa_secp256r1_sha256",
        "ecdsa_secp384r1_sha384",
        "ecdsa_secp521r1_sha512",
        "rsa_pss_rsae_sha256",
        "rsa_pss_rsae_sha384",
        "rsa_pss_rsae_sha512",
        "rsa_pkcs1_sha256",
        "rsa_pkcs1_sha384",
        "rsa_pkcs1_sha512",
        "ecdsa_sha1",
        "rsa_pkcs1_sha1"
    );

    pub const CIPHER_IDS: &[u16] = &[
        0x1301, 0x1303, 0x1302, 0xc02b, 0xc02f, 0xcca9, 0xcca8, 0xc02c, 0xc030, 0xc013, 0xc014,
        0x009c, 0x009d, 0x002f, 0x0035,
    ];

    /// server_name, extended_master_secret, renegotiation_info,
    /// supported_groups, ec_point_formats, session_ticket, ALPN,
    /// status_request, delegated_credential, key_share, supported_versions,
    /// signature_algorithms, psk_key_exchange_modes, record_size_limit,
    /// encrypted_client_hello, padding.
    pub const EXTENSION_IDS: &[u16] = &[
        0, 23, 65281, 10, 11, 35, 16, 5, 34, 51, 43, 13, 45, 28, 65037, 21,
    ];

    pub const GROUP_IDS: &[u16] = &[4588, 29, 23, 24, 25];

    pub fn settings() -> TlsSettings {
        TlsSettings {
            cipher_list: Cow::Borrowed(CIPHER_LIST),
            sigalgs_list: Cow::Borrowed(SIGALGS_LIST),
            curves_list: Cow::Borrowed(CURVES),
            min_tls_version: TlsVersion::Tls1_2,
            max_tls_version: TlsVersion::Tls1_3,
            grease_enabled: false,
            enable_ech_grease: true,
            application_settings: false,
            pre_shared_key: true,
            enable_ocsp_stapling: true,
            enable_signed_cert_timestamps: false,
            cert_compression_algorithm: Some(CertCompressionAlgorithm::Zlib),
            record_size_limit: Some(0x4001),
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

    pub const HEADERS_PSEUDO_ORDER: [PseudoId; 4] = [Method, Path, Authority, Scheme];

    pub const SETTINGS_ORDER: &[SettingId] =
        &[HeaderTableSize, InitialWindowSize, MaxFrameSize];

    pub fn settings() -> Http2Settings {
        Http2Settings {
            header_table_size: Some(65536),
            initial_stream_window_size: Some(131_072),
            max_frame_size: Some(16_384),
            settings_order: SETTINGS_ORDER,
            connection_window_update: 12_517_377,
            headers_pseudo_order: HEADERS_PSEUDO_ORDER,
            headers_priority: Some((13, 41, false)),
            ..Http2Settings::default()
        }
    }
}

pub(super) static HEADERS_ORDER: [http::HeaderName; 17] = [
    http::HeaderName::from_static("host"),
    http::HeaderName::from_static("user-agent"),
    http::HeaderName::from_static("accept"),
    http::HeaderName::from_static("accept-language"),
    http::HeaderName::from_static("accept-encoding"),
    http::HeaderName::from_static("content-type"),
    http::HeaderName::from_static("content-length"),
    http::HeaderName::from_static("authorization"),
    http::HeaderName::from_static("origin"),
    http::HeaderName::from_static("referer"),
    http::HeaderName::from_static("cookie"),
    http::HeaderName::from_static("upgrade-insecure-requests"),
    http::HeaderName::from_static("sec-fetch-dest"),
    http::HeaderName::from_static("sec-fetch-mode"),
    http::HeaderName::from_static("sec-fetch-site"),
    http::HeaderName::from_static("sec-fetch-user"),
    http::HeaderName::from_static("priority"),
];

pub(super) fn user_agent(os: Os) -> &'static str {
    match os {
        Os::MacOS => {
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0"
        }
        Os::Windows => {
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0"
        }
        Os::Linux => "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    }
}

pub(crate) mod v133 {
    use http::{
        header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS, USER_AGENT},
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
        header_firefox_ua!(headers, super::user_agent(os));
        header_firefox_accept!(headers);
        header_firefox_sec_fetch!(headers);
        headers.insert("priority", HeaderValue::from_static("u=0, i"));
        headers
    }
}
