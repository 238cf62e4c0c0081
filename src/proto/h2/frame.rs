//! HTTP/2 frame layer (RFC 7540 §4): the 9-byte frame header and the
//! payload encodings the client emits.

/// The client connection preface magic.
pub(crate) const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

pub(crate) const FRAME_HEADER_LEN: usize = 9;

/// Frame type codes.
pub(crate) mod frame_type {
    pub(crate) const DATA: u8 = 0x0;
    pub(crate) const HEADERS: u8 = 0x1;
    pub(crate) const PRIORITY: u8 = 0x2;
    pub(crate) const RST_STREAM: u8 = 0x3;
    pub(crate) const SETTINGS: u8 = 0x4;
    pub(crate) const PUSH_PROMISE: u8 = 0x5;
    pub(crate) const PING: u8 = 0x6;
    pub(crate) const GOAWAY: u8 = 0x7;
    pub(crate) const WINDOW_UPDATE: u8 = 0x8;
    pub(crate) const CONTINUATION: u8 = 0x9;
}

/// Frame flags.
pub(crate) mod flags {
    pub(crate) const END_STREAM: u8 = 0x1;
    pub(crate) const ACK: u8 = 0x1;
    pub(crate) const END_HEADERS: u8 = 0x4;
    pub(crate) const PADDED: u8 = 0x8;
    pub(crate) const PRIORITY: u8 = 0x20;
}

/// Stream error codes (RFC 7540 §7).
pub(crate) mod error_code {
    pub(crate) const NO_ERROR: u32 = 0x0;
    pub(crate) const PROTOCOL_ERROR: u32 = 0x1;
    pub(crate) const REFUSED_STREAM: u32 = 0x7;
    pub(crate) const CANCEL: u32 = 0x8;

    pub(crate) fn name(code: u32) -> &'static str {
        match code {
            0x0 => "NO_ERROR",
            0x1 => "PROTOCOL_ERROR",
            0x2 => "INTERNAL_ERROR",
            0x3 => "FLOW_CONTROL_ERROR",
            0x4 => "SETTINGS_TIMEOUT",
            0x5 => "STREAM_CLOSED",
            0x6 => "FRAME_SIZE_ERROR",
            0x7 => "REFUSED_STREAM",
            0x8 => "CANCEL",
            0x9 => "COMPRESSION_ERROR",
            0xa => "CONNECT_ERROR",
            0xb => "ENHANCE_YOUR_CALM",
            0xc => "INADEQUATE_SECURITY",
            0xd => "HTTP_1_1_REQUIRED",
            _ => "UNKNOWN",
        }
    }
}

/// A decoded 9-byte frame header: `{length:24, type:8, flags:8,
/// reserved:1, stream_id:31}`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FrameHead {
    pub(crate) length: u32,
    pub(crate) kind: u8,
    pub(crate) flags: u8,
    pub(crate) stream_id: u32,
}

impl FrameHead {
    pub(crate) fn parse(buf: &[u8]) -> FrameHead {
        debug_assert!(buf.len() >= FRAME_HEADER_LEN);
        FrameHead {
            length: u32::from_be_bytes([0, buf[0], buf[1], buf[2]]),
            kind: buf[3],
            flags: buf[4],
            stream_id: u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]) & 0x7fff_ffff,
        }
    }

    pub(crate) fn encode(length: u32, kind: u8, flags: u8, stream_id: u32, out: &mut Vec<u8>) {
        debug_assert!(length < 1 << 24);
        let len = length.to_be_bytes();
        out.extend_from_slice(&[len[1], len[2], len[3], kind, flags]);
        out.extend_from_slice(&(stream_id & 0x7fff_ffff).to_be_bytes());
    }
}

/// The preface SETTINGS frame with the (id, value) pairs in profile order.
pub(crate) fn settings(pairs: &[(u16, u32)], out: &mut Vec<u8>) {
    FrameHead::encode((pairs.len() * 6) as u32, frame_type::SETTINGS, 0, 0, out);
    for (id, value) in pairs {
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&value.to_be_bytes());
    }
}

pub(crate) fn settings_ack(out: &mut Vec<u8>) {
    FrameHead::encode(0, frame_type::SETTINGS, flags::ACK, 0, out);
}

pub(crate) fn window_update(stream_id: u32, increment: u32, out: &mut Vec<u8>) {
    FrameHead::encode(4, frame_type::WINDOW_UPDATE, 0, stream_id, out);
    out.extend_from_slice(&(increment & 0x7fff_ffff).to_be_bytes());
}

pub(crate) fn ping_ack(payload: &[u8], out: &mut Vec<u8>) {
    debug_assert_eq!(payload.len(), 8);
    FrameHead::encode(8, frame_type::PING, flags::ACK, 0, out);
    out.extend_from_slice(payload);
}

pub(crate) fn rst_stream(stream_id: u32, code: u32, out: &mut Vec<u8>) {
    FrameHead::encode(4, frame_type::RST_STREAM, 0, stream_id, out);
    out.extend_from_slice(&code.to_be_bytes());
}

pub(crate) fn goaway(last_stream_id: u32, code: u32, out: &mut Vec<u8>) {
    FrameHead::encode(8, frame_type::GOAWAY, 0, 0, out);
    out.extend_from_slice(&(last_stream_id & 0x7fff_ffff).to_be_bytes());
    out.extend_from_slice(&code.to_be_bytes());
}

/// A HEADERS frame, optionally with the priority block browsers attach,
/// splitting into CONTINUATION frames when the block exceeds
/// `max_frame_size`.
pub(crate) fn headers(
    stream_id: u32,
    block: &[u8],
    priority: Option<(u32, u8, bool)>,
    end_stream: bool,
    max_frame_size: u32,
    out: &mut Vec<u8>,
) {
    let mut first_flags = 0u8;
    if end_stream {
        first_flags |= flags::END_STREAM;
    }

    let mut priority_block = Vec::new();
    if let Some((dependency, weight, exclusive)) = priority {
        first_flags |= flags::PRIORITY;
        let mut dep = dependency & 0x7fff_ffff;
        if exclusive {
            dep |= 0x8000_0000;
        }
        priority_block.extend_from_slice(&dep.to_be_bytes());
        priority_block.push(weight);
    }

    let max = max_frame_size as usize;
    let first_budget = max.saturating_sub(priority_block.len()).max(1);
    let first_chunk = &block[..block.len().min(first_budget)];
    let rest = &block[first_chunk.len()..];

    if rest.is_empty() {
        first_flags |= flags::END_HEADERS;
    }
    FrameHead::encode(
        (priority_block.len() + first_chunk.len()) as u32,
        frame_type::HEADERS,
        first_flags,
        stream_id,
        out,
    );
    out.extend_from_slice(&priority_block);
    out.extend_from_slice(first_chunk);

    let mut remaining = rest;
    while !remaining.is_empty() {
        let chunk = &remaining[..remaining.len().min(max)];
        remaining = &remaining[chunk.len()..];
        let cont_flags = if remaining.is_empty() {
            flags::END_HEADERS
        } else {
            0
        };
        FrameHead::encode(
            chunk.len() as u32,
            frame_type::CONTINUATION,
            cont_flags,
            stream_id,
            out,
        );
        out.extend_from_slice(chunk);
    }
}

pub(crate) fn data(stream_id: u32, chunk: &[u8], end_stream: bool, out: &mut Vec<u8>) {
    let flags = if end_stream { flags::END_STREAM } else { 0 };
    FrameHead::encode(chunk.len() as u32, frame_type::DATA, flags, stream_id, out);
    out.extend_from_slice(chunk);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_head_round_trip() {
        let mut buf = Vec::new();
        FrameHead::encode(0x1234, frame_type::HEADERS, flags::END_HEADERS, 5, &mut buf);
        assert_eq!(buf.len(), FRAME_HEADER_LEN);

        let head = FrameHead::parse(&buf);
        assert_eq!(head.length, 0x1234);
        assert_eq!(head.kind, frame_type::HEADERS);
        assert_eq!(head.flags, flags::END_HEADERS);
        assert_eq!(head.stream_id, 5);
    }

    #[test]
    fn settings_payload_preserves_pair_order() {
        let mut buf = Vec::new();
        settings(&[(0x1, 65536), (0x2, 0), (0x4, 6291456)], &mut buf);

        let head = FrameHead::parse(&buf);
        assert_eq!(head.length, 18);
        assert_eq!(head.kind, frame_type::SETTINGS);
        assert_eq!(head.stream_id, 0);

        // first pair is HEADER_TABLE_SIZE
        assert_eq!(&buf[9..11], &[0x0, 0x1]);
        assert_eq!(&buf[11..15], &65536u32.to_be_bytes());
        // second pair is ENABLE_PUSH=0
        assert_eq!(&buf[15..17], &[0x0, 0x2]);
    }

    #[test]
    fn headers_frame_with_priority() {
        let block = vec![0xAAu8; 10];
        let mut buf = Vec::new();
        headers(1, &block, Some((0, 255, true)), true, 16384, &mut buf);

        let head = FrameHead::parse(&buf);
        assert_eq!(head.length, 15);
        assert_eq!(
            head.flags,
            flags::END_STREAM | flags::END_HEADERS | flags::PRIORITY
        );
        // exclusive bit set on the dependency
        assert_eq!(&buf[9..13], &0x8000_0000u32.to_be_bytes());
        assert_eq!(buf[13], 255);
    }

    #[test]
    fn oversized_block_splits_into_continuation() {
        let block = vec![0u8; 30];
        let mut buf = Vec::new();
        headers(3, &block, None, false, 16, &mut buf);

        let first = FrameHead::parse(&buf);
        assert_eq!(first.kind, frame_type::HEADERS);
        assert_eq!(first.length, 16);
        assert_eq!(first.flags & flags::END_HEADERS, 0);

        let second = FrameHead::parse(&buf[9 + 16..]);
        assert_eq!(second.kind, frame_type::CONTINUATION);
        assert_eq!(second.length, 14);
        assert_eq!(second.flags, flags::END_HEADERS);
    }
}
