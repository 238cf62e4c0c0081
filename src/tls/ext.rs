use std::os::raw::c_int;

use boring::{
    error::ErrorStack,
    ssl::{ConnectConfiguration, SslConnectorBuilder, SslVerifyMode, SslVersion},
};
use foreign_types::ForeignTypeRef;

use super::cert_compression::CompressionCallbacks;
use crate::emulation::{AlpnProtos, CertCompressionAlgorithm, TlsSettings, TlsVersion};

type TlsResult<T> = Result<T, ErrorStack>;

/// Error handler for the boringssl functions.
fn sv_handler(r: c_int) -> TlsResult<c_int> {
    if r == 0 {
        Err(ErrorStack::get())
    } else {
        Ok(r)
    }
}

fn ssl_version(version: TlsVersion) -> SslVersion {
    match version {
        TlsVersion::Tls1_2 => SslVersion::TLS1_2,
        TlsVersion::Tls1_3 => SslVersion::TLS1_3,
    }
}

/// Profile-driven configuration of an `SslConnectorBuilder`.
///
/// Every list is applied strictly in profile order; the order is the
/// fingerprint.
pub(crate) trait SslConnectorBuilderExt: Sized {
    fn configure_profile(self, settings: &TlsSettings) -> TlsResult<Self>;

    fn configure_cert_verification(self, certs_verification: bool) -> TlsResult<Self>;

    fn configure_alpn_protos(self, alpn: AlpnProtos) -> TlsResult<Self>;

    fn configure_add_cert_compression_alg(
        self,
        alg: CertCompressionAlgorithm,
    ) -> TlsResult<Self>;
}

impl SslConnectorBuilderExt for SslConnectorBuilder {
    fn configure_profile(mut self, settings: &TlsSettings) -> TlsResult<Self> {
        self.set_min_proto_version(Some(ssl_version(settings.min_tls_version)))?;
        self.set_max_proto_version(Some(ssl_version(settings.max_tls_version)))?;

        self.set_cipher_list(&settings.cipher_list)?;
        self.set_sigalgs_list(&settings.sigalgs_list)?;
        self.set_curves_list(&settings.curves_list)?;

        self.set_grease_enabled(settings.grease_enabled);
        self.set_permute_extensions(settings.permute_extensions);

        if settings.enable_ocsp_stapling {
            self.enable_ocsp_stapling();
        }
        if settings.enable_signed_cert_timestamps {
            self.enable_signed_cert_timestamps();
        }
        if !settings.pre_shared_key {
            self.set_options(boring::ssl::SslOptions::NO_TICKET);
        }

        let mut builder = self.configure_alpn_protos(settings.alpn_protos)?;
        if let Some(alg) = settings.cert_compression_algorithm {
            builder = builder.configure_add_cert_compression_alg(alg)?;
        }

        Ok(builder)
    }

    fn configure_cert_verification(mut self, certs_verification: bool) -> TlsResult<Self> {
        if certs_verification {
            self.set_verify(SslVerifyMode::PEER);
        } else {
            self.set_verify(SslVerifyMode::NONE);
        }
        Ok(self)
    }

    fn configure_alpn_protos(mut self, alpn: AlpnProtos) -> TlsResult<Self> {
        self.set_alpn_protos(alpn.encode())?;
        Ok(self)
    }

    fn configure_add_cert_compression_alg(
        self,
        alg: CertCompressionAlgorithm,
    ) -> TlsResult<Self> {
        unsafe {
            sv_handler(boring_sys::SSL_CTX_add_cert_compression_alg(
                self.as_ptr(),
                alg as _,
                alg.compression_fn(),
                alg.decompression_fn(),
            ))
            .map(|_| self)
        }
    }
}

/// Per-connection configuration applied just before the handshake.
pub(crate) trait ConnectConfigurationExt {
    /// Send a GREASE `encrypted_client_hello` placeholder.
    fn configure_enable_ech_grease(
        &mut self,
        enable: bool,
    ) -> TlsResult<&mut ConnectConfiguration>;

    /// Offer ALPS `application_settings` for the given protocol.
    fn configure_add_application_settings(
        &mut self,
        enable: bool,
        alpn: AlpnProtos,
    ) -> TlsResult<&mut ConnectConfiguration>;
}

impl ConnectConfigurationExt for ConnectConfiguration {
    fn configure_enable_ech_grease(
        &mut self,
        enable: bool,
    ) -> TlsResult<&mut ConnectConfiguration> {
        if enable {
            unsafe { boring_sys::SSL_set_enable_ech_grease(self.as_ptr(), 1) }
        }
        Ok(self)
    }

    fn configure_add_application_settings(
        &mut self,
        enable: bool,
        alpn: AlpnProtos,
    ) -> TlsResult<&mut ConnectConfiguration> {
        if !enable {
            return Ok(self);
        }

        let (alpn, alpn_len) = match alpn {
            AlpnProtos::Http1 => ("http/1.1", 8),
            AlpnProtos::Http2 | AlpnProtos::All => ("h2", 2),
        };

        unsafe {
            sv_handler(boring_sys::SSL_add_application_settings(
                self.as_ptr(),
                alpn.as_ptr(),
                alpn_len,
                std::ptr::null(),
                0,
            ))
            .map(|_| self)
        }
    }
}
