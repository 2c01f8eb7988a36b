//! Client builder pattern

use echolite_core::{DecoderTable, EchonetObject, PropertyDecoder};
use echolite_transport::{DatagramLink, UdpTransport};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::info;

use crate::config::ClientConfig;
use crate::router::PropertyUpdateRouter;
use crate::{EchonetClient, Result};

/// Builder for [`EchonetClient`]
#[derive(Debug, Clone, Default)]
pub struct EchonetClientBuilder {
    config: ClientConfig,
    decoders: DecoderTable,
}

impl EchonetClientBuilder {
    /// Create a new builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            decoders: DecoderTable::default(),
        }
    }

    /// Set local bind address
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Set destination port for requests
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable/disable joining the multicast group
    pub fn multicast(mut self, enabled: bool) -> Self {
        self.config.join_multicast = enabled;
        self
    }

    /// Set the interface used for multicast membership
    pub fn multicast_interface(mut self, interface: Ipv4Addr) -> Self {
        self.config.multicast_interface = interface;
        self
    }

    /// Set the response wait granularity in milliseconds
    pub fn poll_interval(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_polls(mut self, polls: u32) -> Self {
        self.config.max_polls = polls;
        self
    }

    pub fn max_abandoned(mut self, max: usize) -> Self {
        self.config.max_abandoned = max;
        self
    }

    /// Set the source object of outbound frames
    pub fn controller(mut self, object: EchonetObject) -> Self {
        self.config.controller = object;
        self
    }

    /// Override or add the decoder for a map or identification code
    pub fn decoder(mut self, epc: u8, decoder: PropertyDecoder) -> Self {
        self.decoders.register(epc, decoder);
        self
    }

    /// Build on top of an existing link without starting a receive loop
    pub fn build_with_link(self, link: Arc<dyn DatagramLink>) -> Result<EchonetClient> {
        self.config.validate()?;
        Ok(EchonetClient::with_router(
            link,
            self.config,
            PropertyUpdateRouter::new(self.decoders),
        ))
    }

    /// Bind the UDP socket, join the multicast group and start receiving
    pub async fn connect(self) -> Result<EchonetClient> {
        self.config.validate()?;

        let transport = UdpTransport::bind(&self.config.bind).await?;
        if self.config.join_multicast {
            transport.join_multicast_v4(
                self.config.multicast_group,
                self.config.multicast_interface,
            )?;
        }
        let receiver = transport.start_receiver();
        let local = transport.local_addr()?;

        let client = self.build_with_link(Arc::new(transport))?;
        client.spawn_receiver(receiver);

        info!("ECHONET Lite client listening on {}", local);
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echolite_core::property::GET_MAP;
    use echolite_core::PropertyValue;
    use echolite_test_utils::RecordingLink;

    fn empty_map(_edt: &[u8]) -> echolite_core::Result<PropertyValue> {
        Ok(PropertyValue::empty_map())
    }

    #[test]
    fn test_builder_settings() {
        let builder = EchonetClientBuilder::new()
            .bind("127.0.0.1:0")
            .port(13610)
            .multicast(false)
            .poll_interval(10)
            .max_polls(5)
            .max_abandoned(4)
            .decoder(GET_MAP, empty_map);

        let client = builder.build_with_link(Arc::new(RecordingLink::new())).unwrap();
        let config = client.config();
        assert_eq!(config.bind, "127.0.0.1:0");
        assert_eq!(config.port, 13610);
        assert!(!config.join_multicast);
        assert_eq!(config.response_timeout().as_millis(), 50);
        assert_eq!(config.max_abandoned, 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = EchonetClientBuilder::new()
            .max_polls(0)
            .build_with_link(Arc::new(RecordingLink::new()));
        assert!(result.is_err());

        let result = EchonetClientBuilder::new()
            .max_abandoned(0)
            .build_with_link(Arc::new(RecordingLink::new()));
        assert!(result.is_err());
    }
}
