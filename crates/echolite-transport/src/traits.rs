//! Transport trait definitions

use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;

use crate::error::Result;

/// Events delivered by a datagram receiver
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Datagram received
    Data(Bytes),
    /// Receive error (the receiver keeps running)
    Error(String),
}

/// Connectionless send side shared by every outbound request
#[async_trait]
pub trait DatagramLink: Send + Sync {
    /// Send one datagram to `target`
    async fn send_to(&self, data: Bytes, target: SocketAddr) -> Result<()>;

    /// Local address of the underlying socket
    fn local_addr(&self) -> Result<SocketAddr>;
}

/// Receive side: yields events with their source address
#[async_trait]
pub trait TransportReceiver: Send {
    /// Receive the next event, `None` once the socket task has stopped
    async fn recv_from(&mut self) -> Option<(TransportEvent, SocketAddr)>;
}
