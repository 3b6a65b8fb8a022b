//! Definition of the UDP method

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use super::{format_payload, Method, MethodError};
use crate::color::DeviceColor;

/// Port the LED controllers listen on
pub const DEFAULT_PORT: u16 = 19872;

/// Sends colors as text datagrams to one LED controller
pub struct Udp {
    /// Address as given in the configuration
    name: String,
    /// Resolved address of the controller
    remote_addr: SocketAddr,
    /// Socket shared by all UDP peers
    socket: Arc<UdpSocket>,
}

impl Udp {
    /// Bind the socket shared by all UDP methods
    ///
    /// Broadcast is enabled so the peer list may contain broadcast addresses.
    pub async fn bind() -> Result<Arc<UdpSocket>, MethodError> {
        let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).await?;
        socket.set_broadcast(true)?;
        Ok(Arc::new(socket))
    }

    /// Resolve a peer address
    ///
    /// # Parameters
    ///
    /// * `address`: host name or IP address, optionally followed by `:port`
    pub async fn resolve(address: &str) -> Result<SocketAddr, MethodError> {
        if let Ok(addr) = address.parse::<SocketAddr>() {
            return Ok(addr);
        }

        let mut candidates: Vec<SocketAddr> = if address.contains(':') {
            tokio::net::lookup_host(address).await?.collect()
        } else {
            tokio::net::lookup_host((address, DEFAULT_PORT))
                .await?
                .collect()
        };

        // The shared socket is bound to an IPv4 address
        candidates.retain(SocketAddr::is_ipv4);
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| MethodError::Unresolved(address.to_owned()))
    }

    /// Create a new UDP method
    ///
    /// # Parameters
    ///
    /// * `address`: address of the LED controller
    /// * `socket`: socket returned by [Udp::bind]
    pub async fn new(address: &str, socket: Arc<UdpSocket>) -> Result<Self, MethodError> {
        let remote_addr = Self::resolve(address).await?;
        debug!(peer = %address, %remote_addr, "resolved udp peer");

        Ok(Self {
            name: address.to_owned(),
            remote_addr,
            socket,
        })
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

#[async_trait]
impl Method for Udp {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, color: DeviceColor) -> Result<(), MethodError> {
        let payload = format_payload(color);
        self.socket
            .send_to(payload.as_bytes(), self.remote_addr)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_addresses() {
        assert_eq!(
            Udp::resolve("192.168.1.20").await.unwrap(),
            SocketAddr::from(([192, 168, 1, 20], DEFAULT_PORT))
        );
        assert_eq!(
            Udp::resolve("10.0.0.1:4000").await.unwrap(),
            SocketAddr::from(([10, 0, 0, 1], 4000))
        );
        assert_eq!(
            Udp::resolve("localhost").await.unwrap().port(),
            DEFAULT_PORT
        );
    }

    #[tokio::test]
    async fn sends_text_payload() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = receiver.local_addr().unwrap().to_string();

        let mut udp = Udp::new(&address, Udp::bind().await.unwrap())
            .await
            .unwrap();
        udp.write(DeviceColor::new(255, 128, 0)).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"255, 128, 0");
    }
}
