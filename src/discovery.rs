//! Discovery of LED controllers on the local network
//!
//! Controllers answer a multicast DNS query for `_gameleds._udp.local`. The
//! answers are not parsed: every host that replies within the listening
//! window is a controller.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::{net::UdpSocket, time::Instant};

pub const MDNS_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
pub const MDNS_PORT: u16 = 5353;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Question for `_gameleds._udp.local`, type A, class IN
pub const QUERY: &[u8] = b"\x00\x00\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\
\x09_gameleds\x04_udp\x05local\x00\x00\x01\x00\x01";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot bind the discovery socket: {0}")]
    Bind(io::Error),
    #[error("discovery i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct Discovery {
    group: SocketAddrV4,
    timeout: Duration,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Discovery {
    pub fn new(timeout: Duration) -> Self {
        Self {
            group: SocketAddrV4::new(MDNS_GROUP, MDNS_PORT),
            timeout,
        }
    }

    fn bind(&self) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        // Other mDNS responders on this host may hold the port too
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.group.port())).into())?;
        socket.join_multicast_v4(self.group.ip(), &Ipv4Addr::UNSPECIFIED)?;

        UdpSocket::from_std(socket.into())
    }

    /// Query the network and return the addresses of all controllers that answered
    ///
    /// An empty list is a valid result.
    #[instrument]
    pub async fn discover(&self) -> Result<Vec<IpAddr>, DiscoveryError> {
        let socket = self.bind().map_err(DiscoveryError::Bind)?;
        socket.send_to(QUERY, self.group).await?;

        let found = collect_answers(&socket, Instant::now() + self.timeout).await?;
        info!(count = found.len(), "discovery complete");

        Ok(found)
    }
}

/// Receive datagrams until `deadline`, returning the distinct senders in order of arrival
///
/// Copies of [QUERY] are ignored: the multicast socket receives our own query, and
/// other hosts may be asking too.
async fn collect_answers(socket: &UdpSocket, deadline: Instant) -> io::Result<Vec<IpAddr>> {
    let mut found = Vec::new();
    let mut buf = [0u8; 1024];

    loop {
        let (len, addr) = match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await
        {
            Ok(result) => result?,
            Err(_) => break,
        };

        if &buf[..len] == QUERY {
            trace!(%addr, "ignoring query");
            continue;
        }

        let ip = addr.ip();
        if !found.contains(&ip) {
            debug!(%ip, "found controller");
            found.push(ip);
        }
    }

    Ok(found)
}
