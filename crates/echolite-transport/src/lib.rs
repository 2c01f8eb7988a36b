//! echolite transport layer
//!
//! ECHONET Lite runs over UDP: unicast requests and responses on port 3610,
//! multicast discovery and announcements on 224.0.23.0.
//!
//! The client core only depends on the [`DatagramLink`] trait, so tests and
//! alternative sockets can stand in for [`UdpTransport`].

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::{DatagramLink, TransportEvent, TransportReceiver};
pub use udp::{UdpConfig, UdpReceiver, UdpTransport};
