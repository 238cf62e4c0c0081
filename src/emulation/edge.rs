//! Edge profiles. Chromium-based: the TLS and HTTP/2 halves are Chrome's,
//! the identity headers are Edge's own.

use super::{chrome, Os};

pub(super) fn user_agent(os: Os) -> &'static str {
    match os {
        Os::MacOS => {
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0"
        }
        Os::Windows => {
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0"
        }
        Os::Linux => {
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0"
        }
    }
}

pub(crate) mod v131 {
    use http::{
        header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS, USER_AGENT},
        HeaderMap, HeaderValue,
    };

    use super::{chrome, Os};
    use crate::emulation::EmulationProvider;

    pub fn get_settings(os: Os) -> EmulationProvider {
        EmulationProvider {
            tls: chrome::tls::settings(chrome::tls::CURVES, chrome::tls::GROUP_IDS),
            http2: chrome::http2::settings(),
            default_headers: header_initializer(os),
            headers_order: &chrome::HEADERS_ORDER,
        }
    }

    fn header_initializer(os: Os) -> HeaderMap {
        let mut headers = HeaderMap::new();
        header_chrome_sec_ch_ua!(
            headers,
            "\"Microsoft Edge\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"",
            os.sec_ch_ua_platform()
        );
        header_chrome_ua!(headers, super::user_agent(os));
        header_chrome_accept!(headers);
        header_chrome_sec_fetch!(headers);
        headers.insert("priority", HeaderValue::from_static("u=0, i"));
        headers
    }
}
