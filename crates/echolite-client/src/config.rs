//! Client configuration

use echolite_core::{EchonetObject, ENL_PORT, MAX_POLLS, MULTICAST_GROUP, POLL_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Local bind address
    pub bind: String,
    /// Destination port for requests
    pub port: u16,
    /// Multicast group used for discovery
    pub multicast_group: Ipv4Addr,
    /// Interface to join the multicast group on
    pub multicast_interface: Ipv4Addr,
    /// Join the multicast group to receive announcements
    pub join_multicast: bool,
    /// Response wait granularity in milliseconds
    pub poll_interval_ms: u64,
    /// Number of intervals to wait for a response
    pub max_polls: u32,
    /// Timed-out transactions kept outstanding before the oldest is evicted
    pub max_abandoned: usize,
    /// Source object of outbound frames
    pub controller: EchonetObject,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{}", ENL_PORT),
            port: ENL_PORT,
            multicast_group: MULTICAST_GROUP,
            multicast_interface: Ipv4Addr::UNSPECIFIED,
            join_multicast: true,
            poll_interval_ms: POLL_INTERVAL_MS,
            max_polls: MAX_POLLS,
            max_abandoned: 256,
            controller: EchonetObject::controller(),
        }
    }
}

impl ClientConfig {
    /// How long a request waits for its response
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.saturating_mul(self.max_polls as u64))
    }

    /// Default discovery destination
    pub fn discovery_target(&self) -> IpAddr {
        IpAddr::V4(self.multicast_group)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 || self.max_polls == 0 {
            return Err(ClientError::Config(
                "response timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_abandoned == 0 {
            return Err(ClientError::Config(
                "max_abandoned must keep at least one timed-out transaction".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ClientError::Config("port must not be zero".to_string()));
        }
        Ok(())
    }
}
