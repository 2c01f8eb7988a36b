//! UDP Transport Tests (echolite-transport)
//!
//! Tests for the UDP transport implementation including:
//! - Binding and configuration
//! - Send/receive through the DatagramLink trait
//! - Shared port binding
//! - Multicast membership

use bytes::Bytes;
use echolite_transport::{
    DatagramLink, TransportError, TransportEvent, TransportReceiver, UdpConfig, UdpTransport,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

// ============================================================================
// Binding Tests
// ============================================================================

#[tokio::test]
async fn test_udp_bind_with_config() {
    let config = UdpConfig {
        max_packet_size: 1500,
        ..UdpConfig::default()
    };

    let transport = UdpTransport::bind_with_config("127.0.0.1:0", config)
        .await
        .expect("Bind with config should succeed");

    assert!(
        transport.local_addr().is_ok(),
        "Should be able to get local address"
    );
}

#[tokio::test]
async fn test_udp_shared_port() {
    let first = UdpTransport::bind("127.0.0.1:0")
        .await
        .expect("First bind should succeed");
    let port = first.local_addr().unwrap().port();

    let second = UdpTransport::bind(&format!("127.0.0.1:{}", port)).await;
    assert!(
        second.is_ok(),
        "Address reuse should allow a second socket on the same port"
    );
}

#[tokio::test]
async fn test_udp_exclusive_port() {
    let config = UdpConfig {
        reuse_address: false,
        ..UdpConfig::default()
    };
    let first = UdpTransport::bind_with_config("127.0.0.1:0", config.clone())
        .await
        .expect("First bind should succeed");
    let port = first.local_addr().unwrap().port();

    let second = UdpTransport::bind_with_config(&format!("127.0.0.1:{}", port), config).await;
    assert!(matches!(second, Err(TransportError::BindFailed(_))));
}

// ============================================================================
// Send/Receive Tests
// ============================================================================

#[tokio::test]
async fn test_send_through_dyn_link() {
    let server = UdpTransport::bind("127.0.0.1:0")
        .await
        .expect("Server bind should succeed");
    let server_addr = server.local_addr().unwrap();
    let mut receiver = server.start_receiver();

    let link: Arc<dyn DatagramLink> = Arc::new(
        UdpTransport::bind("127.0.0.1:0")
            .await
            .expect("Client bind should succeed"),
    );
    let client_port = link.local_addr().unwrap().port();

    for i in 0..3u8 {
        link.send_to(Bytes::from(vec![0x10, 0x81, i]), server_addr)
            .await
            .expect("Send should succeed");
    }

    for i in 0..3u8 {
        let (event, from) = timeout(Duration::from_secs(2), receiver.recv_from())
            .await
            .expect("Receive timed out")
            .expect("Receiver closed");
        assert_eq!(from.port(), client_port);
        match event {
            TransportEvent::Data(data) => assert_eq!(data.as_ref(), &[0x10, 0x81, i]),
            other => panic!("Expected Data event, got {:?}", other),
        }
    }
}

// ============================================================================
// Multicast Tests
// ============================================================================

#[tokio::test]
async fn test_join_and_leave_multicast() {
    let transport = UdpTransport::bind("0.0.0.0:0")
        .await
        .expect("Bind should succeed");

    // Hosts without a multicast route refuse the join; only check consistency
    let group = Ipv4Addr::new(224, 0, 23, 0);
    if transport
        .join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)
        .is_ok()
    {
        transport
            .leave_multicast_v4(group, Ipv4Addr::UNSPECIFIED)
            .expect("Leave should succeed after join");
    }
}
