//! UDP transport implementation

use async_trait::async_trait;
use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{Result, TransportError};
use crate::traits::{DatagramLink, TransportEvent, TransportReceiver};

/// UDP configuration
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Kernel receive buffer size
    pub recv_buffer_size: usize,
    /// Maximum packet size
    pub max_packet_size: usize,
    /// Allow other processes on this host to bind the same port
    pub reuse_address: bool,
    /// Deliver our own multicast sends back to this host
    pub multicast_loop: bool,
    /// Capacity of the channel between the socket task and the receiver
    pub channel_capacity: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: 65536,
            max_packet_size: 65507, // Max UDP payload
            reuse_address: true,
            multicast_loop: false,
            channel_capacity: 100,
        }
    }
}

/// UDP transport (connectionless)
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    config: UdpConfig,
}

impl UdpTransport {
    /// Bind to a local address
    pub async fn bind(addr: &str) -> Result<Self> {
        Self::bind_with_config(addr, UdpConfig::default()).await
    }

    /// Bind with config
    pub async fn bind_with_config(addr: &str, config: UdpConfig) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| TransportError::InvalidAddress(addr.to_string()))?;

        let std_socket =
            build_socket(addr, &config).map_err(|e| TransportError::BindFailed(e.to_string()))?;
        let socket = UdpSocket::from_std(std_socket)?;

        info!("UDP bound to {}", socket.local_addr()?);

        Ok(Self {
            socket: Arc::new(socket),
            config,
        })
    }

    /// Get local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Io)
    }

    /// Join an IPv4 multicast group on the given interface
    pub fn join_multicast_v4(&self, group: Ipv4Addr, interface: Ipv4Addr) -> Result<()> {
        self.socket
            .join_multicast_v4(group, interface)
            .map_err(|e| TransportError::Multicast(e.to_string()))?;
        self.socket
            .set_multicast_loop_v4(self.config.multicast_loop)
            .map_err(|e| TransportError::Multicast(e.to_string()))?;

        info!("Joined multicast group {} on {}", group, interface);
        Ok(())
    }

    /// Leave an IPv4 multicast group
    pub fn leave_multicast_v4(&self, group: Ipv4Addr, interface: Ipv4Addr) -> Result<()> {
        self.socket
            .leave_multicast_v4(group, interface)
            .map_err(|e| TransportError::Multicast(e.to_string()))
    }

    /// Start receiving packets
    pub fn start_receiver(&self) -> UdpReceiver {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let socket = self.socket.clone();
        let max_size = self.config.max_packet_size;

        tokio::spawn(async move {
            let mut buf = vec![0u8; max_size];

            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, from)) => {
                        debug!("UDP received {} bytes from {}", len, from);
                        let data = Bytes::copy_from_slice(&buf[..len]);
                        if tx.send((TransportEvent::Data(data), from)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("UDP receive error: {}", e);
                        if tx
                            .send((
                                TransportEvent::Error(e.to_string()),
                                SocketAddr::from(([0, 0, 0, 0], 0)),
                            ))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
        });

        UdpReceiver { rx }
    }
}

#[async_trait]
impl DatagramLink for UdpTransport {
    async fn send_to(&self, data: Bytes, target: SocketAddr) -> Result<()> {
        self.socket
            .send_to(&data, target)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        debug!("UDP sent {} bytes to {}", data.len(), target);
        Ok(())
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        UdpTransport::local_addr(self)
    }
}

fn build_socket(addr: SocketAddr, config: &UdpConfig) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if config.reuse_address {
        socket.set_reuse_address(true)?;
    }
    socket.set_recv_buffer_size(config.recv_buffer_size)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

/// UDP receiver
pub struct UdpReceiver {
    rx: mpsc::Receiver<(TransportEvent, SocketAddr)>,
}

#[async_trait]
impl TransportReceiver for UdpReceiver {
    async fn recv_from(&mut self) -> Option<(TransportEvent, SocketAddr)> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_bind() {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_udp_bind_invalid_address() {
        let result = UdpTransport::bind("not-an-address").await;
        assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_udp_send_recv() {
        let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();

        let server_addr = server.local_addr().unwrap();
        let mut receiver = server.start_receiver();

        client
            .send_to(Bytes::from_static(b"hello"), server_addr)
            .await
            .unwrap();

        let (event, from) = receiver.recv_from().await.unwrap();
        match event {
            TransportEvent::Data(data) => {
                assert_eq!(data.as_ref(), b"hello");
            }
            _ => panic!("Expected Data event"),
        }

        assert_eq!(from.port(), client.local_addr().unwrap().port());
    }
}
