//! Chrome profiles.
//!
//! Each version module reproduces the ClientHello and HTTP/2 preface of
//! that Chrome release. Extension permutation is left off so the declared
//! extension order is the wire order; GREASE stays on and is redrawn by
//! BoringSSL on every handshake.

use super::Os;

// ============== TLS settings ==============
pub(super) mod tls {
    use std::borrow::Cow;

    use crate::emulation::tls::{CertCompressionAlgorithm, TlsSettings, TlsVersion};

    pub const CURVES: &str = static_join!(":", "X25519MLKEM768", "X25519", "P-256", "P-384");

    pub const CIPHER_LIST: &str = static_join!(
        ":",
        "TLS_AES_128_GCM_SHA256",
        "TLS_AES_256_GCM_SHA384",
        "TLS_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
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
        "rsa_pss_rsae_sha256",
        "rsa_pkcs1_sha256",
        "ecdsa_secp384r1_sha384",
        "rsa_pss_rsae_sha384",
        "rsa_pkcs1_sha384",
        "rsa_pss_rsae_sha512",
        "rsa_pkcs1_sha512"
    );

    /// Cipher ids matching `CIPHER_LIST`, offer order.
    pub const CIPHER_IDS: &[u16] = &[
        0x1301, 0x1302, 0x1303, 0xc02b, 0xc02f, 0xc02c, 0xc030, 0xcca9, 0xcca8, 0xc013, 0xc014,
        0x009c, 0x009d, 0x002f, 0x0035,
    ];

    /// Extension ids in offer order: server_name, status_request,
    /// supported_groups, ec_point_formats, signature_algorithms, ALPN,
    /// signed_certificate_timestamp, extended_master_secret,
    /// compress_certificate, record_size_limit, session_ticket,
    /// supported_versions, psk_key_exchange_modes, key_share,
    /// application_settings, encrypted_client_hello (GREASE),
    /// renegotiation_info, padding.
    pub const EXTENSION_IDS: &[u16] = &[
        0, 5, 10, 11, 13, 16, 18, 23, 27, 28, 35, 43, 45, 51, 17513, 65037, 65281, 21,
    ];

    /// Group ids matching `CURVES`.
    pub const GROUP_IDS: &[u16] = &[4588, 29, 23, 24];

    pub fn settings(curves_list: &'static str, group_ids: &'static [u16]) -> TlsSettings {
        TlsSettings {
            cipher_list: Cow::Borrowed(CIPHER_LIST),
            sigalgs_list: Cow::Borrowed(SIGALGS_LIST),
            curves_list: Cow::Borrowed(curves_list),
            min_tls_version: TlsVersion::Tls1_2,
            max_tls_version: TlsVersion::Tls1_3,
            grease_enabled: true,
            enable_ech_grease: true,
            application_settings: true,
            pre_shared_key: true,
            enable_ocsp_stapling: true,
            enable_signed_cert_timestamps: true,
            cert_compression_algorithm: Some(CertCompressionAlgorithm::Brotli),
            record_size_limit: None,
            cipher_ids: CIPHER_IDS,
            extension_ids: EXTENSION_IDS,
            group_ids,
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

    pub const HEADERS_PRIORITY: (u32, u8, bool) = (0, 255, true);

    pub const HEADERS_PSEUDO_ORDER: [PseudoId; 4] = [Method, Authority, Scheme, Path];

    pub const SETTINGS_ORDER: &[SettingId] = &[
        HeaderTableSize,
        EnablePush,
        InitialWindowSize,
        MaxHeaderListSize,
    ];

    pub fn settings() -> Http2Settings {
        Http2Settings {
            header_table_size: Some(65536),
            enable_push: Some(false),
            initial_stream_window_size: Some(6_291_456),
            max_header_list_size: Some(262_144),
            settings_order: SETTINGS_ORDER,
            connection_window_update: 15_663_105,
            headers_pseudo_order: HEADERS_PSEUDO_ORDER,
            headers_priority: Some(HEADERS_PRIORITY),
            ..Http2Settings::default()
        }
    }
}

/// Header names in Chrome's emission order. `host` leads on HTTP/1.1,
/// dynamic headers (`content-length`, `cookie`) slot in at their browser
/// positions, unknown custom headers append after the template.
pub(super) static HEADERS_ORDER: [http::HeaderName; 21] = [
    http::HeaderName::from_static("host"),
    http::HeaderName::from_static("connection"),
    http::HeaderName::from_static("content-length"),
    http::HeaderName::from_static("content-type"),
    http::HeaderName::from_static("sec-ch-ua"),
    http::HeaderName::from_static("sec-ch-ua-mobile"),
    http::HeaderName::from_static("sec-ch-ua-platform"),
    http::HeaderName::from_static("upgrade-insecure-requests"),
    http::HeaderName::from_static("user-agent"),
    http::HeaderName::from_static("authorization"),
    http::HeaderName::from_static("accept"),
    http::HeaderName::from_static("origin"),
    http::HeaderName::from_static("sec-fetch-site"),
    http::HeaderName::from_static("sec-fetch-mode"),
    http::HeaderName::from_static("sec-fetch-user"),
    http::HeaderName::from_static("sec-fetch-dest"),
    http::HeaderName::from_static("referer"),
    http::HeaderName::from_static("accept-encoding"),
    http::HeaderName::from_static("accept-language"),
    http::HeaderName::from_static("cookie"),
    http::HeaderName::from_static("priority"),
];

macro_rules! chrome_user_agent {
    ($os:expr, $version:literal) => {
        match $os {
            Os::MacOS => concat!(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 ",
                "(KHTML, like Gecko) Chrome/",
                $version,
                ".0.0.0 Safari/537.36"
            ),
            Os::Windows => concat!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
                "(KHTML, like Gecko) Chrome/",
                $version,
                ".0.0.0 Safari/537.36"
            ),
            Os::Linux => concat!(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
                "(KHTML, like Gecko) Chrome/",
                $version,
                ".0.0.0 Safari/537.36"
            ),
        }
    };
}

pub(super) fn user_agent(os: Os, version: &'static str) -> &'static str {
    match version {
        "132" => chrome_user_agent!(os, "132"),
        "136" => chrome_user_agent!(os, "136"),
        _ => chrome_user_agent!(os, "142"),
    }
}

pub(crate) mod v132 {
    use http::{
        header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS, USER_AGENT},
        HeaderMap, HeaderValue,
    };

    use super::{http2, tls, Os};
    use crate::emulation::EmulationProvider;

    pub fn get_settings(os: Os) -> EmulationProvider {
        EmulationProvider {
            tls: tls::settings(tls::CURVES, tls::GROUP_IDS),
            http2: http2::settings(),
            default_headers: header_initializer(os),
            headers_order: &super::HEADERS_ORDER,
        }
    }

    fn header_initializer(os: Os) -> HeaderMap {
        let mut headers = HeaderMap::new();
        header_chrome_sec_ch_ua!(
            headers,
            "\"Not A(Brand\";v=\"8\", \"Chromium\";v=\"132\", \"Google Chrome\";v=\"132\"",
            os.sec_ch_ua_platform()
        );
        header_chrome_ua!(headers, super::user_agent(os, "132"));
        header_chrome_accept!(headers);
        header_chrome_sec_fetch!(headers);
        headers.insert("priority", HeaderValue::from_static("u=0, i"));
        headers
    }
}

pub(crate) mod v136 {
    use http::{
        header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS, USER_AGENT},
        HeaderMap, HeaderValue,
    };

    use super::{http2, tls, Os};
    use crate::emulation::EmulationProvider;

    pub fn get_settings(os: Os) -> EmulationProvider {
        EmulationProvider {
            tls: tls::settings(tls::CURVES, tls::GROUP_IDS),
            http2: http2::settings(),
            default_headers: header_initializer(os),
            headers_order: &super::HEADERS_ORDER,
        }
    }

    fn header_initializer(os: Os) -> HeaderMap {
        let mut headers = HeaderMap::new();
        header_chrome_sec_ch_ua!(
            headers,
            "\"Chromium\";v=\"136\", \"Google Chrome\";v=\"136\", \"Not.A/Brand\";v=\"99\"",
            os.sec_ch_ua_platform()
        );
        header_chrome_ua!(headers, super::user_agent(os, "136"));
        header_chrome_accept!(headers);
        header_chrome_sec_fetch!(headers);
        headers.insert("priority", HeaderValue::from_static("u=0, i"));
        headers
    }
}

pub(crate) mod v142 {
    use http::{
        header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS, USER_AGENT},
        HeaderMap, HeaderValue,
    };

    use super::{http2, tls, Os};
    use crate::emulation::EmulationProvider;

    pub fn get_settings(os: Os) -> EmulationProvider {
        EmulationProvider {
            tls: tls::settings(tls::CURVES, tls::GROUP_IDS),
            http2: http2::settings(),
            default_headers: header_initializer(os),
            headers_order: &super::HEADERS_ORDER,
        }
    }

    fn header_initializer(os: Os) -> HeaderMap {
        let mut headers = HeaderMap::new();
        header_chrome_sec_ch_ua!(
            headers,
            "\"Google Chrome\";v=\"142\", \"Chromium\";v=\"142\", \"Not_A Brand\";v=\"99\"",
            os.sec_ch_ua_platform()
        );
        header_chrome_ua!(headers, super::user_agent(os, "142"));
        header_chrome_accept!(headers);
        header_chrome_sec_fetch!(headers);
        headers.insert("priority", HeaderValue::from_static("u=0, i"));
        headers
    }
}
