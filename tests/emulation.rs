use httpmorph::emulation::{self, AlpnProtos, PseudoId};
use httpmorph::{Impersonate, Os};

#[test]
fn aliases_resolve_to_current_defaults() {
    assert_eq!("chrome".parse::<Impersonate>().unwrap(), Impersonate::Chrome142);
    assert_eq!(
        "chrome142".parse::<Impersonate>().unwrap(),
        Impersonate::Chrome142
    );
    assert_eq!(
        "firefox".parse::<Impersonate>().unwrap(),
        Impersonate::Firefox133
    );
    assert_eq!("safari".parse::<Impersonate>().unwrap(), Impersonate::Safari18);
    assert_eq!("edge".parse::<Impersonate>().unwrap(), Impersonate::Edge131);
    assert!("mosaic".parse::<Impersonate>().is_err());
}

#[test]
fn chrome142_tls_parameters_match_the_published_shape() {
    let provider = emulation::provider(Impersonate::Chrome142, Os::MacOS);
    let tls = provider.tls_settings();

    // TLS 1.3 preferred with 1.2 fallback, 15 ciphers in Chrome order.
    assert_eq!(tls.cipher_ids.len(), 15);
    assert_eq!(&tls.cipher_ids[..3], &[0x1301, 0x1302, 0x1303]);

    // The published extension set, GREASE excluded.
    assert!(tls.extension_ids.len() >= 16);
    for id in [0u16, 43, 10, 13, 16, 51, 45, 28, 65037, 21] {
        assert!(tls.extension_ids.contains(&id), "extension {id} missing");
    }

    // Post-quantum group leads the supported-groups list.
    assert_eq!(tls.group_ids, &[4588, 29, 23, 24]);
    assert!(tls.curves_list.starts_with("X25519MLKEM768"));

    assert!(tls.grease_enabled);
    assert!(!tls.permute_extensions);
    assert_eq!(tls.alpn_protos, AlpnProtos::All);
}

#[test]
fn chrome142_http2_preface_parameters() {
    let provider = emulation::provider(Impersonate::Chrome142, Os::MacOS);
    let h2 = provider.http2_settings();

    assert_eq!(
        h2.settings_pairs(),
        vec![(0x1, 65_536), (0x2, 0), (0x4, 6_291_456), (0x6, 262_144)]
    );
    assert_eq!(h2.connection_window_update, 15_663_105);
    assert_eq!(
        h2.headers_pseudo_order,
        [
            PseudoId::Method,
            PseudoId::Authority,
            PseudoId::Scheme,
            PseudoId::Path
        ]
    );
}

#[test]
fn browsers_disagree_on_pseudo_header_order() {
    let chrome = emulation::provider(Impersonate::Chrome142, Os::MacOS);
    let firefox = emulation::provider(Impersonate::Firefox133, Os::MacOS);
    let safari = emulation::provider(Impersonate::Safari18, Os::MacOS);

    assert_ne!(
        chrome.http2_settings().headers_pseudo_order,
        firefox.http2_settings().headers_pseudo_order
    );
    assert_ne!(
        chrome.http2_settings().headers_pseudo_order,
        safari.http2_settings().headers_pseudo_order
    );
}

#[test]
fn user_agent_tracks_profile_and_os() {
    assert!(Impersonate::Chrome142
        .user_agent(Os::Windows)
        .contains("Windows NT 10.0"));
    assert!(Impersonate::Firefox133
        .user_agent(Os::Linux)
        .contains("Firefox/133.0"));
    assert!(Impersonate::Edge131.user_agent(Os::MacOS).contains("Edg/131"));
    assert!(Impersonate::Safari18
        .user_agent(Os::MacOS)
        .contains("Version/18.0"));
}

#[test]
fn header_templates_follow_the_browser() {
    let chrome = emulation::provider(Impersonate::Chrome142, Os::MacOS);
    assert!(chrome.default_headers().contains_key("sec-ch-ua"));
    assert_eq!(
        chrome.default_headers().get("sec-ch-ua-platform").unwrap(),
        "\"macOS\""
    );

    let firefox = emulation::provider(Impersonate::Firefox133, Os::MacOS);
    assert!(!firefox.default_headers().contains_key("sec-ch-ua"));
    assert!(firefox
        .default_headers()
        .get("accept-language")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("q=0.5"));
}

#[test]
fn declared_fingerprints_are_stable_and_distinct() {
    let chrome = emulation::provider(Impersonate::Chrome142, Os::MacOS);

    // Fresh GREASE draws never change the normalized digest: every
    // resolution of the profile yields the same JA3N.
    let first = chrome.ja3n();
    for _ in 0..5 {
        let again = emulation::provider(Impersonate::Chrome142, Os::MacOS).ja3n();
        assert_eq!(again, first);
    }
    assert_eq!(first.len(), 32);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));

    // JA4 leads with protocol, TLS version and list counts.
    assert!(chrome.ja4().starts_with("t13d"));

    let firefox = emulation::provider(Impersonate::Firefox133, Os::MacOS);
    assert_ne!(chrome.ja3n(), firefox.ja3n());
    assert_ne!(chrome.ja4(), firefox.ja4());
}

#[test]
fn edge_shares_chrome_wire_parameters() {
    let chrome = emulation::provider(Impersonate::Chrome142, Os::MacOS);
    let edge = emulation::provider(Impersonate::Edge131, Os::MacOS);

    assert_eq!(chrome.tls_settings().cipher_ids, edge.tls_settings().cipher_ids);
    assert_eq!(
        chrome.http2_settings().settings_pairs(),
        edge.http2_settings().settings_pairs()
    );
    assert_ne!(
        chrome.default_headers().get("user-agent"),
        edge.default_headers().get("user-agent")
    );
}
