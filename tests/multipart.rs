mod support;

use std::time::Duration;

use httpmorph::multipart;
use support::server;

fn client() -> httpmorph::Client {
    httpmorph::Client::builder()
        .pool_isolated()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[test]
fn multipart_form_posts_with_boundary() {
    let server = server::http(|req| {
        let content_type = req.header("content-type").unwrap().to_owned();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let boundary = content_type.split('=').nth(1).unwrap().to_owned();

        let body = String::from_utf8_lossy(&req.body).into_owned();
        assert!(body.contains(&format!("--{boundary}\r\n")));
        assert!(body.contains("Content-Disposition: form-data; name=\"field\"\r\n\r\nvalue"));
        assert!(body.contains("name=\"upload\"; filename=\"notes.txt\""));
        assert!(body.contains("Content-Type: text/plain"));
        assert!(body.contains("file contents"));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));

        // declared length matches what arrived
        let declared: usize = req.header("content-length").unwrap().parse().unwrap();
        assert_eq!(declared, req.body.len());

        server::Response::ok()
    });

    let form = multipart::Form::new()
        .text("field", "value")
        .part(
            "upload",
            multipart::Part::bytes(&b"file contents"[..]).file_name("notes.txt"),
        );

    let res = client()
        .post(server.url("/upload"))
        .multipart(form)
        .send()
        .unwrap();
    assert!(res.ok());
}

#[test]
fn streaming_request_body_goes_chunked() {
    let server = server::http(|req| {
        assert_eq!(req.header("transfer-encoding"), Some("chunked"));
        server::Response::ok()
    });

    // The test server does not decode chunked uploads, so only the
    // framing negotiation is asserted here.
    let res = client()
        .post(server.url("/stream-up"))
        .body(httpmorph::Body::reader(std::io::Cursor::new(
            b"streamed payload".to_vec(),
        )))
        .send()
        .unwrap();
    assert!(res.ok());
}
