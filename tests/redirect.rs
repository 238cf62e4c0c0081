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

/// `/redirect/<n>` counts down to `/done`.
fn countdown_server() -> server::Server {
    server::http(|req| {
        if let Some(n) = req.path.strip_prefix("/redirect/") {
            let n: u32 = n.parse().unwrap();
            let location = if n <= 1 {
                "/done".to_owned()
            } else {
                format!("/redirect/{}", n - 1)
            };
            server::Response::new(302).header("Location", &location)
        } else {
            server::Response::ok().body("arrived")
        }
    })
}

#[test]
fn chain_of_three_is_followed_with_history() {
    let server = countdown_server();

    let res = client().get(server.url("/redirect/3")).send().unwrap();

    assert_eq!(res.status(), httpmorph::StatusCode::OK);
    assert_eq!(res.history().len(), 3);
    for hop in res.history() {
        assert!(hop.is_redirect());
        assert!(matches!(hop.status().as_u16(), 301 | 302));
    }
    assert!(res.url().path().ends_with("/done"));
    assert_eq!(res.text().unwrap(), "arrived");
}

#[test]
fn relative_location_resolves_against_current_url() {
    let server = server::http(|req| match req.path.as_str() {
        "/a/start" => server::Response::new(302).header("Location", "next"),
        "/a/next" => server::Response::ok().body("resolved"),
        other => panic!("unexpected path {other}"),
    });

    let res = client().get(server.url("/a/start")).send().unwrap();
    assert_eq!(res.url().path(), "/a/next");
    assert_eq!(res.text().unwrap(), "resolved");
}

#[test]
fn see_other_downgrades_post_to_get_and_drops_body() {
    let server = server::http(|req| match req.path.as_str() {
        "/submit" => {
            assert_eq!(req.method, "POST");
            assert_eq!(req.body, b"payload");
            server::Response::new(303).header("Location", "/result")
        }
        "/result" => {
            assert_eq!(req.method, "GET");
            assert!(req.body.is_empty());
            assert_eq!(req.header("content-length"), None);
            server::Response::ok().body("done")
        }
        other => panic!("unexpected path {other}"),
    });

    let res = client()
        .post(server.url("/submit"))
        .body("payload")
        .send()
        .unwrap();
    assert_eq!(res.text().unwrap(), "done");
}

#[test]
fn temporary_redirect_preserves_method_and_body() {
    let server = server::http(|req| match req.path.as_str() {
        "/put" => server::Response::new(307).header("Location", "/target"),
        "/target" => {
            assert_eq!(req.method, "PUT");
            assert_eq!(req.body, b"again");
            server::Response::ok().body("kept")
        }
        other => panic!("unexpected path {other}"),
    });

    let res = client()
        .put(server.url("/put"))
        .body("again")
        .send()
        .unwrap();
    assert_eq!(res.text().unwrap(), "kept");
}

#[test]
fn exceeding_max_redirects_errors() {
    let server = countdown_server();

    let err = client()
        .get(server.url("/redirect/10"))
        .max_redirects(5)
        .send()
        .unwrap_err();

    assert!(err.is_redirect());
    assert!(err.is_too_many_redirects());
}

#[test]
fn redirects_can_be_disabled() {
    let server = countdown_server();

    let res = client()
        .get(server.url("/redirect/3"))
        .allow_redirects(false)
        .send()
        .unwrap();

    assert_eq!(res.status(), httpmorph::StatusCode::FOUND);
    assert!(res.is_redirect());
    assert!(res.history().is_empty());
    assert_eq!(
        res.headers().get("location").unwrap(),
        "/redirect/2"
    );
}

#[test]
fn authorization_is_dropped_when_crossing_hosts() {
    // Second server plays the foreign host.
    let other = server::http(|req| {
        assert_eq!(req.header("authorization"), None);
        server::Response::ok().body("other")
    });
    let other_url = format!("http://127.0.0.1:{}/", other.addr().port());

    let first = server::http(move |req| {
        if req.path == "/go" {
            assert!(req.header("authorization").is_some());
            server::Response::new(302).header("Location", &other_url)
        } else {
            panic!("unexpected path {}", req.path)
        }
    });

    // 127.0.0.1 != localhost, so the hop counts as cross-host.
    let first_url = format!(
        "http://localhost:{}/go",
        first.addr().port()
    );
    let res = client()
        .get(first_url)
        .basic_auth("user", Some("pass"))
        .send()
        .unwrap();
    assert_eq!(res.text().unwrap(), "other");
}
