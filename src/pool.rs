//! Host-keyed connection reuse.

use std::{
    collections::{HashMap, VecDeque},
    io::{self, Read, Write},
    net::TcpStream,
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

use crate::{
    error::Error,
    proto::h2::Http2Conn,
    tls::{TlsInfo, TlsStream},
};

pub(crate) const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_MAX_PER_HOST: usize = 16;
pub(crate) const DEFAULT_MAX_TOTAL: usize = 100;

/// Connections are keyed by origin plus everything that changes what the
/// bytes on the wire mean: the proxy they run through and whether the
/// certificate was verified.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub(crate) struct PoolKey {
    pub(crate) scheme: Scheme,
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) proxy: Option<String>,
    pub(crate) verify: bool,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub(crate) enum Scheme {
    Http,
    Https,
}

/// The byte stream under an HTTP/1.1 exchange.
pub(crate) enum Transport {
    Plain(TcpStream),
    Tls(TlsStream),
}

impl Transport {
    pub(crate) fn tcp(&self) -> &TcpStream {
        match self {
            Transport::Plain(stream) => stream,
            Transport::Tls(stream) => stream.get_ref(),
        }
    }

    /// Liveness probe at check-out: a healthy idle connection has nothing
    /// to read — `WouldBlock`. Bytes or EOF mean the server closed it or
    /// spoke out of turn; either way it is stale.
    fn is_alive(&mut self) -> bool {
        let tcp = self.tcp();
        if tcp.set_nonblocking(true).is_err() {
            return false;
        }
        let mut probe = [0u8; 1];
        let alive = matches!(
            self.tcp().peek(&mut probe),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock
        );
        let restored = self.tcp().set_nonblocking(false).is_ok();
        alive && restored
    }

    fn close(&mut self) {
        if let Transport::Tls(stream) = self {
            stream.shutdown();
        }
        let _ = self.tcp().shutdown(std::net::Shutdown::Both);
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.read(buf),
            Transport::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.write(buf),
            Transport::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(stream) => stream.flush(),
            Transport::Tls(stream) => stream.flush(),
        }
    }
}

/// An HTTP/1.1 connection owned by exactly one request at a time.
pub(crate) struct Conn {
    pub(crate) transport: Transport,
    pub(crate) key: PoolKey,
    pub(crate) tls_info: Option<TlsInfo>,
    /// Set when this connection came out of the idle set, which is what
    /// arms the stale-connection retry.
    pub(crate) reused: bool,
    idle_since: Instant,
}

impl Conn {
    pub(crate) fn new(transport: Transport, key: PoolKey, tls_info: Option<TlsInfo>) -> Conn {
        Conn {
            transport,
            key,
            tls_info,
            reused: false,
            idle_since: Instant::now(),
        }
    }

    pub(crate) fn close(mut self) {
        self.transport.close();
    }
}

/// A shared HTTP/2 connection; streams multiplex, so the pool hands out
/// clones instead of exclusive ownership.
#[derive(Clone)]
pub(crate) struct H2Entry {
    pub(crate) conn: Arc<Http2Conn>,
    pub(crate) tls_info: TlsInfo,
}

/// Process-scoped pool: per-key idle deques with MRU check-out, global
/// caps, idle trimming on the check-out pass.
pub(crate) struct Pool {
    inner: Mutex<Inner>,
    slot_freed: Condvar,
    idle_timeout: Duration,
    max_per_host: usize,
    max_total: usize,
}

struct Inner {
    idle: HashMap<PoolKey, VecDeque<Conn>>,
    h2: HashMap<PoolKey, Vec<H2Entry>>,
    /// Connections currently owned by requests (h1) per key.
    in_use: HashMap<PoolKey, usize>,
}

impl Inner {
    fn count_key(&self, key: &PoolKey) -> usize {
        self.idle.get(key).map_or(0, VecDeque::len)
            + self.h2.get(key).map_or(0, Vec::len)
            + self.in_use.get(key).copied().unwrap_or(0)
    }

    fn count_total(&self) -> usize {
        self.idle.values().map(VecDeque::len).sum::<usize>()
            + self.h2.values().map(Vec::len).sum::<usize>()
            + self.in_use.values().sum::<usize>()
    }
}

impl Default for Pool {
    fn default() -> Pool {
        Pool::new(
            DEFAULT_IDLE_TIMEOUT,
            DEFAULT_MAX_PER_HOST,
            DEFAULT_MAX_TOTAL,
        )
    }
}

impl Pool {
    pub(crate) fn new(idle_timeout: Duration, max_per_host: usize, max_total: usize) -> Pool {
        Pool {
            inner: Mutex::new(Inner {
                idle: HashMap::new(),
                h2: HashMap::new(),
                in_use: HashMap::new(),
            }),
            slot_freed: Condvar::new(),
            idle_timeout,
            max_per_host,
            max_total,
        }
    }

    /// Most-recently-used idle connection for the key, after trimming
    /// expired entries and probing liveness.
    pub(crate) fn checkout(&self, key: &PoolKey) -> Option<Conn> {
        let mut inner = self.inner.lock().unwrap();

        let deque = inner.idle.get_mut(key)?;
        let now = Instant::now();

        while let Some(mut conn) = deque.pop_back() {
            if now.duration_since(conn.idle_since) > self.idle_timeout {
                log::debug!("pool: dropping idle-expired connection to {}", key.host);
                conn.transport.close();
                continue;
            }
            if !conn.transport.is_alive() {
                log::debug!("pool: dropping stale connection to {}", key.host);
                conn.transport.close();
                continue;
            }
            conn.reused = true;
            *inner.in_use.entry(key.clone()).or_insert(0) += 1;
            log::trace!("pool: reusing connection to {}", key.host);
            return Some(conn);
        }

        None
    }

    /// A live multiplexed h2 connection for the key, if one exists. With
    /// several candidates the least-loaded one wins.
    pub(crate) fn checkout_h2(&self, key: &PoolKey) -> Option<H2Entry> {
        let mut inner = self.inner.lock().unwrap();
        let entries = inner.h2.get_mut(key)?;

        entries.retain(|entry| {
            let alive = entry.conn.is_reusable();
            if !alive {
                entry.conn.close();
            }
            alive
        });

        entries
            .iter()
            .min_by_key(|entry| entry.conn.active_streams())
            .cloned()
    }

    /// Claim a slot for a brand-new connection, waiting up to the connect
    /// deadline for caps to allow it.
    pub(crate) fn reserve(&self, key: &PoolKey, deadline: Option<Instant>) -> crate::Result<()> {
        let mut inner = self.inner.lock().unwrap();

        loop {
            if inner.count_key(key) < self.max_per_host && inner.count_total() < self.max_total {
                *inner.in_use.entry(key.clone()).or_insert(0) += 1;
                return Ok(());
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if deadline <= now {
                        return Err(Error::timeout());
                    }
                    deadline - now
                }
                None => Duration::from_secs(1),
            };

            let (guard, _) = self
                .slot_freed
                .wait_timeout(inner, wait)
                .map_err(|_| Error::request("pool lock poisoned"))?;
            inner = guard;
        }
    }

    /// Give back a connection the request finished with. Reusable and
    /// within caps: idle-queued; otherwise closed.
    pub(crate) fn checkin(&self, mut conn: Conn, reusable: bool) {
        let mut inner = self.inner.lock().unwrap();
        release_one(&mut inner, &conn.key);

        let within_cap = inner
            .idle
            .get(&conn.key)
            .map_or(0, VecDeque::len)
            < self.max_per_host;

        if reusable && within_cap {
            conn.idle_since = Instant::now();
            inner.idle.entry(conn.key.clone()).or_default().push_back(conn);
        } else {
            conn.transport.close();
        }

        drop(inner);
        self.slot_freed.notify_all();
    }

    /// The request abandoned its connection (error path).
    pub(crate) fn discard(&self, conn: Conn) {
        let mut inner = self.inner.lock().unwrap();
        release_one(&mut inner, &conn.key);
        drop(inner);
        conn.close();
        self.slot_freed.notify_all();
    }

    /// A reserved slot never became a connection (dial failed).
    pub(crate) fn cancel_reservation(&self, key: &PoolKey) {
        let mut inner = self.inner.lock().unwrap();
        release_one(&mut inner, key);
        drop(inner);
        self.slot_freed.notify_all();
    }

    /// Adopt a freshly established h2 connection into the shared set. The
    /// reservation made for the dial converts into the h2 entry.
    pub(crate) fn insert_h2(&self, key: &PoolKey, entry: H2Entry) {
        let mut inner = self.inner.lock().unwrap();
        release_one(&mut inner, key);
        inner.h2.entry(key.clone()).or_default().push(entry);
        drop(inner);
        self.slot_freed.notify_all();
    }

    /// Close everything; test isolation hook.
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        for (_, mut deque) in inner.idle.drain() {
            for mut conn in deque.drain(..) {
                conn.transport.close();
            }
        }
        for (_, entries) in inner.h2.drain() {
            for entry in entries {
                entry.conn.close();
            }
        }
        drop(inner);
        self.slot_freed.notify_all();
    }

    /// Idle connections currently pooled for the key.
    #[cfg(test)]
    pub(crate) fn idle_count(&self, key: &PoolKey) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.idle.get(key).map_or(0, VecDeque::len)
    }
}

fn release_one(inner: &mut Inner, key: &PoolKey) {
    if let Some(count) = inner.in_use.get_mut(key) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            inner.in_use.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn key(port: u16) -> PoolKey {
        PoolKey {
            scheme: Scheme::Http,
            host: "127.0.0.1".into(),
            port,
            proxy: None,
            verify: true,
        }
    }

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn checkin_then_checkout_reuses() {
        let pool = Pool::default();
        let (client, _server) = connected_pair();
        let k = key(1234);

        pool.reserve(&k, None).unwrap();
        let conn = Conn::new(Transport::Plain(client), k.clone(), None);
        pool.checkin(conn, true);
        assert_eq!(pool.idle_count(&k), 1);

        let conn = pool.checkout(&k).expect("idle connection");
        assert!(conn.reused);
        assert_eq!(pool.idle_count(&k), 0);
    }

    #[test]
    fn closed_peer_fails_liveness_probe() {
        let pool = Pool::default();
        let (client, server) = connected_pair();
        let k = key(4321);

        pool.reserve(&k, None).unwrap();
        let conn = Conn::new(Transport::Plain(client), k.clone(), None);
        pool.checkin(conn, true);

        drop(server); // EOF now pending on the client side

        assert!(pool.checkout(&k).is_none());
    }

    #[test]
    fn non_reusable_checkin_closes() {
        let pool = Pool::default();
        let (client, _server) = connected_pair();
        let k = key(7);

        pool.reserve(&k, None).unwrap();
        let conn = Conn::new(Transport::Plain(client), k.clone(), None);
        pool.checkin(conn, false);
        assert_eq!(pool.idle_count(&k), 0);
    }

    #[test]
    fn cap_blocks_until_timeout() {
        let pool = Pool::new(DEFAULT_IDLE_TIMEOUT, 1, 1);
        let k = key(9);

        pool.reserve(&k, None).unwrap();

        let deadline = Instant::now() + Duration::from_millis(50);
        let err = pool.reserve(&k, Some(deadline)).unwrap_err();
        assert!(err.is_timeout());

        pool.cancel_reservation(&k);
        pool.reserve(&k, Some(Instant::now() + Duration::from_millis(50)))
            .unwrap();
    }

    #[test]
    fn keys_distinguish_proxy_and_verify() {
        let direct = key(80);
        let mut proxied = key(80);
        proxied.proxy = Some("proxy:3128".into());
        let mut insecure = key(80);
        insecure.verify = false;

        assert_ne!(direct, proxied);
        assert_ne!(direct, insecure);
    }
}
