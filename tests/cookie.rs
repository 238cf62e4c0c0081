mod support;

use std::time::Duration;

use support::server;

fn session() -> httpmorph::Session {
    httpmorph::Session::builder()
        .pool_isolated()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[test]
fn cookie_from_response_is_sent_on_next_request() {
    let server = server::http(|req| match req.path.as_str() {
        "/set" => {
            assert_eq!(req.header("cookie"), None);
            server::Response::ok().header("Set-Cookie", "session=abc123; Path=/")
        }
        "/check" => {
            assert_eq!(req.header("cookie"), Some("session=abc123"));
            server::Response::ok().body("with cookie")
        }
        other => panic!("unexpected path {other}"),
    });

    let session = session();
    session.get(server.url("/set")).send().unwrap();
    let res = session.get(server.url("/check")).send().unwrap();
    assert_eq!(res.text().unwrap(), "with cookie");
}

#[test]
fn multiple_cookies_serialize_in_insertion_order() {
    let server = server::http(|req| match req.path.as_str() {
        "/set" => server::Response::ok()
            .header("Set-Cookie", "first=1; Path=/")
            .header("Set-Cookie", "second=2; Path=/"),
        "/check" => {
            assert_eq!(req.header("cookie"), Some("first=1; second=2"));
            server::Response::ok()
        }
        other => panic!("unexpected path {other}"),
    });

    let session = session();
    session.get(server.url("/set")).send().unwrap();
    assert!(session.get(server.url("/check")).send().unwrap().ok());
}

#[test]
fn expired_cookie_is_dropped() {
    let server = server::http(|req| match req.path.as_str() {
        "/set" => server::Response::ok().header("Set-Cookie", "gone=1; Path=/; Max-Age=0"),
        "/check" => {
            assert_eq!(req.header("cookie"), None);
            server::Response::ok()
        }
        other => panic!("unexpected path {other}"),
    });

    let session = session();
    session.get(server.url("/set")).send().unwrap();
    assert!(session.get(server.url("/check")).send().unwrap().ok());
}

#[test]
fn cookies_set_during_redirect_are_recorded() {
    let server = server::http(|req| match req.path.as_str() {
        "/login" => server::Response::new(302)
            .header("Set-Cookie", "token=xyz; Path=/")
            .header("Location", "/home"),
        "/home" => {
            assert_eq!(req.header("cookie"), Some("token=xyz"));
            server::Response::ok().body("home")
        }
        other => panic!("unexpected path {other}"),
    });

    let session = session();
    let res = session.get(server.url("/login")).send().unwrap();
    assert_eq!(res.text().unwrap(), "home");
    assert_eq!(res.history().len(), 1);
}

#[test]
fn explicit_cookies_suppress_the_jar_for_one_call() {
    let server = server::http(|req| match req.path.as_str() {
        "/set" => server::Response::ok().header("Set-Cookie", "jarred=1; Path=/"),
        "/explicit" => {
            assert_eq!(req.header("cookie"), Some("only=this"));
            server::Response::ok()
        }
        "/after" => {
            assert_eq!(req.header("cookie"), Some("jarred=1"));
            server::Response::ok()
        }
        other => panic!("unexpected path {other}"),
    });

    let session = session();
    session.get(server.url("/set")).send().unwrap();
    session
        .get(server.url("/explicit"))
        .cookies(vec![("only".into(), "this".into())])
        .send()
        .unwrap();
    // the jar is intact afterwards
    assert!(session.get(server.url("/after")).send().unwrap().ok());
}

#[test]
fn jar_is_inspectable_and_clearable() {
    let server = server::http(|req| match req.path.as_str() {
        "/set" => server::Response::ok().header("Set-Cookie", "k=v; Path=/; HttpOnly"),
        _ => {
            assert_eq!(req.header("cookie"), None);
            server::Response::ok()
        }
    });

    let session = session();
    session.get(server.url("/set")).send().unwrap();

    let url: httpmorph::Url = server.url("/").parse().unwrap();
    let cookies = session.cookies().cookies(&url);
    assert_eq!(cookies, vec![("k".to_owned(), "v".to_owned())]);
    let attrs = session.cookies().get(&url, "k").unwrap();
    assert!(attrs.http_only);

    session.cookies().clear();
    assert!(session.get(server.url("/check")).send().unwrap().ok());
}

#[test]
fn response_exposes_set_cookie_headers() {
    let server = server::http(|_| {
        server::Response::ok().header("Set-Cookie", "seen=yes; Path=/; Secure; SameSite=Lax")
    });

    let session = session();
    let res = session.get(server.url("/")).send().unwrap();
    let cookies: Vec<_> = res.cookies().collect();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name(), "seen");
    assert_eq!(cookies[0].value(), "yes");
    assert!(cookies[0].secure());
}
