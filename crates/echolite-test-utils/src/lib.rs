//! Common test helpers and utilities for echolite tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - A recording datagram link that captures every outbound frame
//! - Builders for the device-side frames a controller receives
//! - Counters for update handler invocations

use async_trait::async_trait;
use bytes::Bytes;
use echolite_core::{codec, EchonetObject, Frame, Property, ServiceCode, INSTANCE_LIST};
use echolite_transport::{DatagramLink, TransportError};
use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout, Instant};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || async { counter.load(Ordering::SeqCst) >= target },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

// ============================================================================
// Recording Link
// ============================================================================

/// A datagram link that records sends instead of touching the network
#[derive(Clone, Default)]
pub struct RecordingLink {
    sent: Arc<Mutex<Vec<(Bytes, SocketAddr)>>>,
    notify: Arc<Notify>,
    fail_sends: Arc<AtomicBool>,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Everything sent so far
    pub fn sent(&self) -> Vec<(Bytes, SocketAddr)> {
        self.sent.lock().clone()
    }

    /// Decoded frames sent so far
    pub fn sent_frames(&self) -> Vec<(Frame, SocketAddr)> {
        self.sent
            .lock()
            .iter()
            .filter_map(|(data, to)| codec::decode(data).ok().map(|frame| (frame, *to)))
            .collect()
    }

    /// Wait until the `n`th (1-based) frame has been sent and return it
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub async fn wait_for_frame(&self, n: usize, max_wait: Duration) -> Option<(Frame, SocketAddr)> {
        assert!(n >= 1, "wait_for_frame counts frames from 1, got {}", n);
        let deadline = Instant::now() + max_wait;
        loop {
            let notified = self.notify.notified();
            if let Some(entry) = self.sent_frames().into_iter().nth(n - 1) {
                return Some(entry);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            if timeout(remaining, notified).await.is_err() {
                return self.sent_frames().into_iter().nth(n - 1);
            }
        }
    }
}

#[async_trait]
impl DatagramLink for RecordingLink {
    async fn send_to(&self, data: Bytes, target: SocketAddr) -> echolite_transport::Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("send disabled".to_string()));
        }
        self.sent.lock().push((data, target));
        self.notify.notify_waiters();
        Ok(())
    }

    fn local_addr(&self) -> echolite_transport::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], echolite_core::ENL_PORT)))
    }
}

// ============================================================================
// Frame Builders
// ============================================================================

/// Address of a test device
pub fn device_addr(last_octet: u8) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, last_octet)), echolite_core::ENL_PORT)
}

/// Instance list payload for the given objects
pub fn instance_list(objects: &[EchonetObject]) -> Vec<u8> {
    let mut edt = vec![objects.len() as u8];
    for object in objects {
        edt.extend_from_slice(&object.to_bytes());
    }
    edt
}

/// A node profile Get_Res carrying an instance list
pub fn discovery_response(tid: u16, objects: &[EchonetObject]) -> Bytes {
    let frame = Frame::new(EchonetObject::controller(), ServiceCode::GetResponse)
        .with_source(EchonetObject::new(0x0E, 0xF0, 0x01))
        .with_tid(tid)
        .with_property(Property::new(INSTANCE_LIST, instance_list(objects)));
    encode(&frame)
}

/// A device frame from `source` with the given service and records
pub fn device_frame(
    tid: u16,
    source: EchonetObject,
    esv: ServiceCode,
    properties: Vec<Property>,
) -> Bytes {
    let frame = Frame::new(EchonetObject::controller(), esv)
        .with_source(source)
        .with_tid(tid)
        .with_properties(properties);
    encode(&frame)
}

/// A Get_Res from `source`
pub fn read_response(tid: u16, source: EchonetObject, properties: Vec<Property>) -> Bytes {
    device_frame(tid, source, ServiceCode::GetResponse, properties)
}

fn encode(frame: &Frame) -> Bytes {
    codec::encode(frame).expect("test frame should encode")
}

// ============================================================================
// Handler Counters
// ============================================================================

/// Records update handler invocations and their push flags
#[derive(Clone, Default)]
pub struct UpdateCounter {
    pushes: Arc<Mutex<Vec<bool>>>,
    count: Arc<AtomicU32>,
}

impl UpdateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one invocation
    pub fn record(&self, is_push: bool) {
        self.pushes.lock().push(is_push);
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Push flags in invocation order
    pub fn pushes(&self) -> Vec<bool> {
        self.pushes.lock().clone()
    }

    /// Wait until at least `n` invocations happened
    pub async fn wait_for(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait).await
    }
}
