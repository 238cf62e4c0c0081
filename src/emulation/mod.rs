//! Browser profile registry.
//!
//! A profile is pure data: the ordered TLS lists, the HTTP/2 preface
//! parameters and the static header template that together reproduce a
//! browser's wire fingerprint. Profiles are resolved once per session and
//! consulted by reference after that.

#[macro_use]
mod macros;

pub(crate) mod chrome;
pub(crate) mod edge;
pub(crate) mod firefox;
pub(crate) mod http2;
pub(crate) mod safari;
pub(crate) mod tls;

use http::HeaderMap;

pub use self::{
    http2::{Http2Settings, PseudoId, SettingId},
    tls::{AlpnProtos, CertCompressionAlgorithm, TlsSettings, TlsVersion},
};

/// The operating system a profile claims in its `User-Agent` and client
/// hint headers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Os {
    #[default]
    MacOS,
    Windows,
    Linux,
}

impl Os {
    pub(crate) fn sec_ch_ua_platform(&self) -> &'static str {
        match self {
            Os::MacOS => "\"macOS\"",
            Os::Windows => "\"Windows\"",
            Os::Linux => "\"Linux\"",
        }
    }
}

impl std::str::FromStr for Os {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "macos" => Ok(Os::MacOS),
            "windows" => Ok(Os::Windows),
            "linux" => Ok(Os::Linux),
            _ => Err(crate::Error::builder(format!("unknown os: {s}"))),
        }
    }
}

/// A browser version to impersonate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum Impersonate {
    Chrome132,
    Chrome136,
    #[default]
    Chrome142,
    Firefox133,
    Safari18,
    Edge131,
}

impl_from_str!(
    (Chrome132, "chrome132", "chrome_132"),
    (Chrome136, "chrome136", "chrome_136"),
    (Chrome142, "chrome142", "chrome_142", "chrome"),
    (Firefox133, "firefox133", "firefox_133", "firefox"),
    (Safari18, "safari18", "safari_18", "safari"),
    (Edge131, "edge131", "edge_131", "edge"),
);

impl Impersonate {
    /// The `User-Agent` string for this profile on the given os.
    pub fn user_agent(&self, os: Os) -> &'static str {
        match self {
            Impersonate::Chrome132 => chrome::user_agent(os, "132"),
            Impersonate::Chrome136 => chrome::user_agent(os, "136"),
            Impersonate::Chrome142 => chrome::user_agent(os, "142"),
            Impersonate::Firefox133 => firefox::user_agent(os),
            Impersonate::Safari18 => safari::user_agent(os),
            Impersonate::Edge131 => edge::user_agent(os),
        }
    }
}

/// The complete parameter set for one (browser, os) pair.
#[derive(Clone, Debug)]
pub struct EmulationProvider {
    pub(crate) tls: TlsSettings,
    pub(crate) http2: Http2Settings,
    pub(crate) default_headers: HeaderMap,
    pub(crate) headers_order: &'static [http::HeaderName],
}

impl EmulationProvider {
    /// The TLS half of the profile.
    pub fn tls_settings(&self) -> &TlsSettings {
        &self.tls
    }

    /// The HTTP/2 half of the profile.
    pub fn http2_settings(&self) -> &Http2Settings {
        &self.http2
    }

    /// The static header template.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// The normalized JA3 hash this profile's ClientHello produces.
    ///
    /// JA3N sorts ciphers and extensions before hashing, so the value is
    /// identical for every GREASE draw and is the one to compare against
    /// fingerprint databases.
    pub fn ja3n(&self) -> String {
        crate::tls::fingerprint::ja3_hash(&crate::tls::fingerprint::ja3n_string(&self.tls))
    }

    /// The JA4 fingerprint this profile's ClientHello produces.
    pub fn ja4(&self) -> String {
        crate::tls::fingerprint::ja4_string(&self.tls)
    }
}

/// Resolve the parameters for an impersonation target.
pub fn provider(ver: Impersonate, os: Os) -> EmulationProvider {
    impersonate_match!(
        ver,
        os,
        Impersonate::Chrome132 => chrome::v132::get_settings,
        Impersonate::Chrome136 => chrome::v136::get_settings,
        Impersonate::Chrome142 => chrome::v142::get_settings,
        Impersonate::Firefox133 => firefox::v133::get_settings,
        Impersonate::Safari18 => safari::v18::get_settings,
        Impersonate::Edge131 => edge::v131::get_settings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_alias_resolves_to_current_default() {
        let ver: Impersonate = "chrome".parse().unwrap();
        assert_eq!(ver, Impersonate::Chrome142);
        assert_eq!(ver, Impersonate::default());
    }

    #[test]
    fn versioned_names_resolve() {
        assert_eq!(
            "chrome_136".parse::<Impersonate>().unwrap(),
            Impersonate::Chrome136
        );
        assert_eq!(
            "firefox".parse::<Impersonate>().unwrap(),
            Impersonate::Firefox133
        );
        assert!("netscape4".parse::<Impersonate>().is_err());
    }

    #[test]
    fn chrome142_tls_lists_are_normative() {
        let provider = provider(Impersonate::Chrome142, Os::MacOS);
        let tls = provider.tls_settings();

        assert!(tls.cipher_ids.len() >= 15);
        assert!(tls.extension_ids.len() >= 16);
        for required in [0u16, 43, 10, 13, 16, 51, 45, 28, 65037, 21] {
            assert!(
                tls.extension_ids.contains(&required),
                "missing extension {required}"
            );
        }
        assert_eq!(tls.group_ids, &[4588, 29, 23, 24]);
        assert_eq!(
            tls.curves_list,
            "X25519MLKEM768:X25519:P-256:P-384"
        );
        assert!(tls.grease_enabled);
        assert_eq!(tls.alpn_protos, AlpnProtos::All);
    }

    #[test]
    fn chrome142_http2_preface_shape() {
        let provider = provider(Impersonate::Chrome142, Os::MacOS);
        let pairs = provider.http2_settings().settings_pairs();
        assert_eq!(
            pairs,
            vec![(0x1, 65536), (0x2, 0), (0x4, 6_291_456), (0x6, 262_144)]
        );
        assert_eq!(provider.http2_settings().connection_window_update, 15_663_105);
        assert_eq!(
            provider.http2_settings().headers_pseudo_order,
            [
                PseudoId::Method,
                PseudoId::Authority,
                PseudoId::Scheme,
                PseudoId::Path
            ]
        );
    }

    #[test]
    fn user_agent_varies_by_os() {
        let mac = Impersonate::Chrome142.user_agent(Os::MacOS);
        let win = Impersonate::Chrome142.user_agent(Os::Windows);
        let linux = Impersonate::Chrome142.user_agent(Os::Linux);

        assert!(mac.contains("Macintosh"));
        assert!(win.contains("Windows NT 10.0"));
        assert!(linux.contains("X11; Linux"));
        for ua in [mac, win, linux] {
            assert!(ua.contains("Chrome/142"));
        }
    }

    #[test]
    fn header_template_claims_the_os() {
        let provider = provider(Impersonate::Chrome142, Os::Windows);
        let platform = provider.default_headers().get("sec-ch-ua-platform").unwrap();
        assert_eq!(platform, "\"Windows\"");
    }

    #[test]
    fn firefox_profile_is_structurally_distinct() {
        let ff = provider(Impersonate::Firefox133, Os::MacOS);
        assert_eq!(
            ff.http2_settings().headers_pseudo_order,
            [
                PseudoId::Method,
                PseudoId::Path,
                PseudoId::Authority,
                PseudoId::Scheme
            ]
        );
        assert_eq!(ff.tls_settings().record_size_limit, Some(0x4001));
        assert!(!ff.tls_settings().grease_enabled);
    }
}
