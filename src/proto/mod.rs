//! In-tree protocol cores.

pub(crate) mod h1;
pub(crate) mod h2;

/// A read buffer with a 64 KiB starting capacity and a doubling growth
/// policy.
///
/// Growth copies the currently-received prefix — `self.len` bytes — never a
/// length taken from message framing fields, which are zero or partial
/// until the message completes.
pub(crate) struct GrowBuf {
    buf: Vec<u8>,
    len: usize,
}

pub(crate) const INITIAL_BUF_CAPACITY: usize = 64 * 1024;

impl GrowBuf {
    pub(crate) fn new() -> Self {
        GrowBuf {
            buf: vec![0; INITIAL_BUF_CAPACITY],
            len: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        GrowBuf {
            buf: vec![0; capacity.max(1)],
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn filled(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Read once from `io` into spare capacity, growing first when full.
    /// Returns the number of bytes read (0 at EOF).
    pub(crate) fn read_from<R: std::io::Read>(&mut self, io: &mut R) -> std::io::Result<usize> {
        if self.len == self.buf.len() {
            self.grow();
        }
        let n = io.read(&mut self.buf[self.len..])?;
        self.len += n;
        Ok(n)
    }

    /// Append bytes already read elsewhere (e.g. head/body split leftovers).
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        while self.buf.len() - self.len < bytes.len() {
            self.grow();
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    /// Drop the first `n` filled bytes.
    pub(crate) fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }

    pub(crate) fn into_vec(mut self) -> Vec<u8> {
        self.buf.truncate(self.len);
        self.buf
    }

    fn grow(&mut self) {
        let mut next = vec![0; self.buf.len() * 2];
        // Copy length is the received prefix, not any framing field.
        next[..self.len].copy_from_slice(&self.buf[..self.len]);
        self.buf = next;
    }
}
