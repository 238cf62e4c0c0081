use std::borrow::Cow;

/// Application-layer protocol negotiation offers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlpnProtos {
    /// Offer `h2` then `http/1.1`, the browser default.
    #[default]
    All,
    /// Offer only `http/1.1`.
    Http1,
    /// Offer only `h2`.
    Http2,
}

impl AlpnProtos {
    /// Wire encoding for `SSL_set_alpn_protos`.
    pub(crate) fn encode(&self) -> &'static [u8] {
        match self {
            AlpnProtos::All => b"\x02h2\x08http/1.1",
            AlpnProtos::Http1 => b"\x08http/1.1",
            AlpnProtos::Http2 => b"\x02h2",
        }
    }
}

/// A TLS protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlsVersion {
    Tls1_2,
    Tls1_3,
}

/// A certificate compression algorithm offered in `compress_certificate`.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CertCompressionAlgorithm {
    Brotli = boring_sys::TLSEXT_cert_compression_brotli as u16,
    Zlib = boring_sys::TLSEXT_cert_compression_zlib as u16,
}

/// The TLS half of a browser profile.
///
/// Pure data: every list is kept in the exact order the browser sends it,
/// because JA3/JA4 verifiers hash over ordering. The numeric id lists mirror
/// the string lists and drive fingerprint digests; GREASE values are not in
/// the lists, they are drawn fresh by BoringSSL on each handshake.
#[derive(Clone, Debug)]
pub struct TlsSettings {
    /// Cipher suites in browser order, OpenSSL names.
    pub cipher_list: Cow<'static, str>,

    /// Signature algorithms in browser order.
    pub sigalgs_list: Cow<'static, str>,

    /// Supported curves/groups in browser order, BoringSSL group names.
    pub curves_list: Cow<'static, str>,

    /// ALPN offer list.
    pub alpn_protos: AlpnProtos,

    /// The minimum TLS version to offer.
    pub min_tls_version: TlsVersion,

    /// The maximum TLS version to offer.
    pub max_tls_version: TlsVersion,

    /// Insert GREASE values into cipher/extension/group lists
    /// (RFC 8701), redrawn per connection by BoringSSL.
    pub grease_enabled: bool,

    /// Send a GREASE `encrypted_client_hello` placeholder.
    pub enable_ech_grease: bool,

    /// Offer the ALPS `application_settings` extension.
    pub application_settings: bool,

    /// Offer `psk_key_exchange_modes` with resumption.
    pub pre_shared_key: bool,

    /// OCSP stapling (`status_request`).
    pub enable_ocsp_stapling: bool,

    /// `signed_certificate_timestamp` extension.
    pub enable_signed_cert_timestamps: bool,

    /// `compress_certificate` offer.
    pub cert_compression_algorithm: Option<CertCompressionAlgorithm>,

    /// `record_size_limit` value, for profiles that send the extension.
    pub record_size_limit: Option<u16>,

    /// Keep the extension order stable. Browsers that shuffle extensions
    /// set this; the engine leaves it off so the declared order is the
    /// wire order.
    pub permute_extensions: bool,

    /// Cipher suite ids in offer order, GREASE excluded.
    pub cipher_ids: &'static [u16],

    /// Extension ids in offer order, GREASE excluded.
    pub extension_ids: &'static [u16],

    /// Named group ids in offer order, GREASE excluded.
    pub group_ids: &'static [u16],

    /// EC point formats.
    pub point_formats: &'static [u8],
}

impl Default for TlsSettings {
    fn default() -> Self {
        TlsSettings {
            cipher_list: Cow::Borrowed(""),
            sigalgs_list: Cow::Borrowed(""),
            curves_list: Cow::Borrowed(""),
            alpn_protos: AlpnProtos::All,
            min_tls_version: TlsVersion::Tls1_2,
            max_tls_version: TlsVersion::Tls1_3,
            grease_enabled: false,
            enable_ech_grease: false,
            application_settings: false,
            pre_shared_key: false,
            enable_ocsp_stapling: false,
            enable_signed_cert_timestamps: false,
            cert_compression_algorithm: None,
            record_size_limit: None,
            permute_extensions: false,
            cipher_ids: &[],
            extension_ids: &[],
            group_ids: &[],
            point_formats: &[0],
        }
    }
}
