mod support;

use std::time::Duration;

use support::server;

fn client() -> httpmorph::Client {
    httpmorph::Client::builder()
        .pool_isolated()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[test]
fn get_returns_body_and_status() {
    let server = server::http(|req| {
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/get");
        server::Response::ok()
            .header("Content-Type", "application/json")
            .body(r#"{"method":"GET","path":"/get"}"#)
    });

    let res = client().get(server.url("/get")).send().unwrap();
    assert_eq!(res.status(), httpmorph::StatusCode::OK);
    assert!(res.ok());
    assert_eq!(res.http_version(), "1.1");

    let body = res.text().unwrap();
    assert_eq!(body, r#"{"method":"GET","path":"/get"}"#);
}

#[test]
fn post_json_sets_content_type() {
    let server = server::http(|req| {
        assert_eq!(req.method, "POST");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let echoed: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        server::Response::ok()
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({ "json": echoed })).unwrap())
    });

    let res = client()
        .post(server.url("/post"))
        .json(&serde_json::json!({"key": "value", "n": 42}))
        .send()
        .unwrap();

    let value: serde_json::Value = res.json().unwrap();
    assert_eq!(value["json"]["key"], "value");
    assert_eq!(value["json"]["n"], 42);
}

#[test]
fn form_body_is_urlencoded() {
    let server = server::http(|req| {
        assert_eq!(
            req.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        server::Response::ok().body(req.body.clone())
    });

    let res = client()
        .post(server.url("/post"))
        .form(vec![("a", "1"), ("b", "two words")])
        .send()
        .unwrap();

    assert_eq!(res.text().unwrap(), "a=1&b=two+words");
}

#[test]
fn query_params_are_appended() {
    let server = server::http(|req| server::Response::ok().body(req.path.clone()));

    let res = client()
        .get(server.url("/search?q=old"))
        .query(&[("q", "new"), ("page", "2")])
        .send()
        .unwrap();

    assert_eq!(res.text().unwrap(), "/search?q=old&q=new&page=2");
}

#[test]
fn profile_headers_are_sent_in_template_order() {
    let server = server::http(|req| {
        let host = req.header_position("host").unwrap();
        let ua = req.header_position("user-agent").unwrap();
        let accept = req.header_position("accept").unwrap();
        let custom = req.header_position("x-custom").unwrap();

        assert_eq!(host, 0, "Host leads the header block");
        assert!(ua < accept, "profile slots keep their order");
        assert!(custom > accept, "unknown headers trail the template");

        assert!(req.header("user-agent").unwrap().contains("Chrome/142"));
        assert!(req.header("sec-ch-ua").unwrap().contains("\"142\""));

        server::Response::ok()
    });

    let res = client()
        .get(server.url("/"))
        .header("x-custom", "tail")
        .send()
        .unwrap();
    assert!(res.ok());

    // The response records the headers exactly as sent.
    assert!(res
        .request_headers()
        .get("user-agent")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Chrome/142"));
}

#[test]
fn custom_header_overrides_template() {
    let server = server::http(|req| {
        assert_eq!(req.header("user-agent"), Some("custom-agent/1.0"));
        server::Response::ok()
    });

    let res = client()
        .get(server.url("/"))
        .header("user-agent", "custom-agent/1.0")
        .send()
        .unwrap();
    assert!(res.ok());
}

#[test]
fn head_has_no_body() {
    let server = server::http(|req| {
        assert_eq!(req.method, "HEAD");
        // Content-Length without a body, as HEAD responses do.
        server::Response::raw(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n".to_vec())
    });

    let res = client().head(server.url("/")).send().unwrap();
    assert_eq!(res.status(), httpmorph::StatusCode::OK);
    assert_eq!(res.content_length(), Some(100));
    assert!(res.bytes().unwrap().is_empty());
}

#[test]
fn large_body_survives_buffer_growth() {
    // 100 000 bytes forces several doublings of the 64 KiB read buffer;
    // a reallocation that copied the wrong length shows up as zeros.
    let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8 + 1).collect();
    let server_payload = payload.clone();
    let server = server::http(move |_| server::Response::ok().body(server_payload.clone()));

    let body = client()
        .get(server.url("/large"))
        .send()
        .unwrap()
        .bytes()
        .unwrap();

    assert_eq!(body.len(), 100_000);
    let nulls = body.iter().filter(|&&b| b == 0).count();
    assert!(
        (nulls as f64) / (body.len() as f64) < 0.01,
        "null-byte ratio {nulls}/100000 betrays a bad reallocation"
    );
    assert_eq!(&body[..], &payload[..]);
}

#[test]
fn error_for_status_maps_4xx_and_5xx() {
    let server = server::http(|_| server::Response::new(404).body("missing"));

    let res = client().get(server.url("/nope")).send().unwrap();
    assert_eq!(res.status(), httpmorph::StatusCode::NOT_FOUND);
    assert!(!res.ok());

    let err = res.error_for_status().unwrap_err();
    assert!(err.is_status());
    assert_eq!(err.status(), Some(httpmorph::StatusCode::NOT_FOUND));
}

#[test]
fn streamed_body_arrives_in_chunks() {
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 200) as u8).collect();
    let server_payload = payload.clone();
    let server = server::http(move |_| server::Response::ok().body(server_payload.clone()));

    let res = client()
        .get(server.url("/stream"))
        .stream(true)
        .send()
        .unwrap();

    let chunks: Vec<_> = res.chunks(8 * 1024).collect::<httpmorph::Result<_>>().unwrap();
    assert!(chunks.len() >= 6);
    let joined: Vec<u8> = chunks.concat();
    assert_eq!(joined, payload);
}

#[test]
fn lines_iterate_the_body() {
    let server = server::http(|_| server::Response::ok().body("one\ntwo\r\nthree"));

    let res = client()
        .get(server.url("/lines"))
        .stream(true)
        .send()
        .unwrap();
    let lines: Vec<String> = res.lines().collect::<httpmorph::Result<_>>().unwrap();
    assert_eq!(lines, vec!["one", "two", "three"]);
}

#[test]
fn timings_are_recorded() {
    let server = server::http(|_| server::Response::ok().body("ok"));

    let res = client().get(server.url("/")).send().unwrap();
    let timings = res.timings();
    assert!(timings.total_us > 0);
    assert!(timings.first_byte_us > 0);
    assert!(timings.total_us >= timings.first_byte_us);
}

#[test]
fn per_request_cookies_are_sent_verbatim() {
    let server = server::http(|req| {
        assert_eq!(req.header("cookie"), Some("a=1; b=2"));
        server::Response::ok()
    });

    let res = client()
        .get(server.url("/"))
        .cookies(vec![("a".into(), "1".into()), ("b".into(), "2".into())])
        .send()
        .unwrap();
    assert!(res.ok());
}

#[test]
fn close_delimited_body_reads_to_eof() {
    let server = server::http(|_| {
        server::Response::raw(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nplain tail".to_vec())
            .close()
    });

    let res = client().get(server.url("/")).send().unwrap();
    assert_eq!(res.text().unwrap(), "plain tail");
}

#[test]
fn reason_phrase_and_version_are_parsed() {
    let server = server::http(|_| {
        server::Response::raw(b"HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nhi".to_vec()).close()
    });

    let res = client().get(server.url("/")).send().unwrap();
    assert_eq!(res.http_version(), "1.0");
    assert_eq!(res.text().unwrap(), "hi");
}

// Network-dependent checks, opt-in via `cargo test -- --ignored` with the
// TEST_HTTPBIN_HOST / TEST_PROXY_URL environment variables set.

#[test]
#[ignore]
fn http2_negotiates_against_live_host() {
    let res = client()
        .get("https://www.google.com")
        .http2(true)
        .send()
        .unwrap();

    assert_eq!(res.http_version(), "2.0");
    let tls_version = res.tls_version().unwrap();
    assert!(tls_version == "TLSv1.2" || tls_version == "TLSv1.3");
    assert_eq!(res.ja3_fingerprint().unwrap().len(), 32);
}

#[test]
#[ignore]
fn session_against_live_httpbin() {
    let host =
        std::env::var("TEST_HTTPBIN_HOST").unwrap_or_else(|_| "httpbingo.org".to_owned());

    let session = httpmorph::Session::new(httpmorph::Impersonate::Chrome142, httpmorph::Os::MacOS);
    let res = session
        .get(format!("https://{host}/get"))
        .send()
        .unwrap();

    assert!(res.ok());
    assert!(res.tls_cipher().is_some());
    assert_eq!(res.ja3_fingerprint().unwrap().len(), 32);
    assert!(res
        .request_headers()
        .get("user-agent")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Chrome"));
}

#[test]
#[ignore]
fn proxy_changes_the_source_address() {
    let proxy_url = std::env::var("TEST_PROXY_URL").expect("TEST_PROXY_URL not set");

    let direct = client()
        .get("https://icanhazip.com")
        .send()
        .unwrap()
        .text()
        .unwrap();
    let proxied = client()
        .get("https://icanhazip.com")
        .proxy(httpmorph::Proxy::all(proxy_url).unwrap())
        .send()
        .unwrap()
        .text()
        .unwrap();

    assert_ne!(direct.trim(), proxied.trim());
}
