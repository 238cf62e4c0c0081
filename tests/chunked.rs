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

fn chunked_response(chunks: &[&[u8]], trailers: &[(&str, &str)]) -> Vec<u8> {
    let mut raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    for chunk in chunks {
        raw.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        raw.extend_from_slice(chunk);
        raw.extend_from_slice(b"\r\n");
    }
    raw.extend_from_slice(b"0\r\n");
    for (name, value) in trailers {
        raw.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    raw.extend_from_slice(b"\r\n");
    raw
}

#[test]
fn boundary_chunk_sizes_reassemble() {
    // sizes spanning 0, 1, 64 KiB - 1, 64 KiB and 128 KiB
    for size in [0usize, 1, 64 * 1024 - 1, 64 * 1024, 128 * 1024] {
        let payload: Vec<u8> = (0..size).map(|i| (i % 249) as u8 + 1).collect();
        let pieces: Vec<&[u8]> = payload.chunks(7919).collect();
        let raw = chunked_response(&pieces, &[]);
        let server = server::http(move |_| server::Response::raw(raw.clone()));

        let body = client()
            .get(server.url("/chunked"))
            .send()
            .unwrap()
            .bytes()
            .unwrap();
        assert_eq!(body.len(), size, "size {size}");
        assert_eq!(&body[..], &payload[..], "size {size}");
    }
}

#[test]
fn single_chunk_with_extension() {
    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5;ext=1\r\nhello\r\n0\r\n\r\n"
        .to_vec();
    let server = server::http(move |_| server::Response::raw(raw.clone()));

    let body = client().get(server.url("/ext")).send().unwrap().text().unwrap();
    assert_eq!(body, "hello");
}

#[test]
fn trailers_are_appended_to_headers() {
    let raw = chunked_response(&[b"data"], &[("X-Checksum", "abc123")]);
    let server = server::http(move |_| server::Response::raw(raw.clone()));

    let res = client().get(server.url("/trailers")).send().unwrap();
    assert_eq!(res.headers().get("x-checksum").unwrap(), "abc123");
    assert_eq!(res.bytes().unwrap(), &b"data"[..]);
}

#[test]
fn chunked_wins_over_content_length() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 999\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nyes\r\n0\r\n\r\n".to_vec();
    let server = server::http(move |_| server::Response::raw(raw.clone()));

    let body = client().get(server.url("/both")).send().unwrap().text().unwrap();
    assert_eq!(body, "yes");
}

#[test]
fn malformed_chunk_size_is_a_decode_error() {
    let raw =
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\nhello\r\n0\r\n\r\n".to_vec();
    let server = server::http(move |_| server::Response::raw(raw.clone()).close());

    let err = client().get(server.url("/bad")).send().unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn chunked_body_streams() {
    let payload: Vec<u8> = (0..100_000usize).map(|i| (i % 251) as u8).collect();
    let pieces: Vec<&[u8]> = payload.chunks(1024).collect();
    let raw = chunked_response(&pieces, &[]);
    let server = server::http(move |_| server::Response::raw(raw.clone()));

    let res = client()
        .get(server.url("/stream"))
        .stream(true)
        .send()
        .unwrap();
    let collected: Vec<u8> = res
        .chunks(4096)
        .collect::<httpmorph::Result<Vec<_>>>()
        .unwrap()
        .concat();
    assert_eq!(collected, payload);
}
