//! TCP establishment.

pub(crate) mod tunnel;

use std::{
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    time::{Duration, Instant},
};

use crate::error::Error;

/// Open a TCP connection to `host:port` within the connect phase deadline.
///
/// Both address families are resolved; when IPv6 candidates exist they are
/// tried first, falling back through the remaining candidates on failure.
/// The socket comes back with `TCP_NODELAY` and keepalive set.
pub(crate) fn connect_tcp(
    host: &str,
    port: u16,
    deadline: Option<Instant>,
) -> crate::Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(Error::connect)?
        .collect::<Vec<_>>();
    if addrs.is_empty() {
        return Err(Error::connect(format!("no address resolved for {host}")));
    }

    let ordered = order_addrs(addrs);

    let mut last_err = None;
    for addr in ordered {
        match connect_addr(addr, deadline) {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                set_keepalive(&stream);
                log::trace!("connected to {addr}");
                return Ok(stream);
            }
            Err(e) => {
                log::debug!("connect to {addr} failed: {e}");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| Error::connect("connect failed")))
}

fn connect_addr(addr: SocketAddr, deadline: Option<Instant>) -> crate::Result<TcpStream> {
    match remaining(deadline)? {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout).map_err(Error::from_io),
        None => TcpStream::connect(addr).map_err(Error::from_io),
    }
}

/// IPv6 candidates first, each family keeping resolver order.
fn order_addrs(addrs: Vec<SocketAddr>) -> Vec<SocketAddr> {
    let (v6, v4): (Vec<_>, Vec<_>) = addrs.into_iter().partition(|a| a.is_ipv6());
    let mut ordered = v6;
    ordered.extend(v4);
    ordered
}

pub(crate) fn remaining(deadline: Option<Instant>) -> crate::Result<Option<Duration>> {
    match deadline {
        Some(deadline) => {
            let now = Instant::now();
            if deadline <= now {
                return Err(Error::timeout());
            }
            Ok(Some(deadline - now))
        }
        None => Ok(None),
    }
}

#[cfg(unix)]
fn set_keepalive(stream: &TcpStream) {
    use std::os::unix::io::AsRawFd;

    let enable: libc::c_int = 1;
    unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_KEEPALIVE,
            &enable as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
    }
}

#[cfg(not(unix))]
fn set_keepalive(_stream: &TcpStream) {}
