mod support;

use std::io::Write;
use std::time::Duration;

use support::server;

fn client() -> httpmorph::Client {
    httpmorph::Client::builder()
        .pool_isolated()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = libflate::zlib::Encoder::new(Vec::new()).unwrap();
    encoder.write_all(data).unwrap();
    encoder.finish().into_result().unwrap()
}

#[test]
fn deflate_body_is_transparently_decoded() {
    let payload = b"deflate payload ".repeat(1_000);
    let compressed = zlib_compress(&payload);
    let server = server::http(move |req| {
        assert!(req.header("accept-encoding").unwrap().contains("deflate"));
        server::Response::ok()
            .header("Content-Encoding", "deflate")
            .body(compressed.clone())
    });

    let body = client()
        .get(server.url("/deflate"))
        .send()
        .unwrap()
        .bytes()
        .unwrap();
    assert_eq!(&body[..], &payload[..]);
}

#[test]
fn corrupt_deflate_is_a_decode_error() {
    let server = server::http(|_| {
        server::Response::ok()
            .header("Content-Encoding", "deflate")
            .body(vec![0xde, 0xad, 0xbe, 0xef])
    });

    let err = client().get(server.url("/bad")).send().unwrap_err();
    assert!(err.is_decode());
}
