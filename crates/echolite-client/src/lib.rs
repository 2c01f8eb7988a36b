//! ECHONET Lite Client Library
//!
//! Async controller for ECHONET Lite devices: multicast discovery, requests
//! correlated to responses by transaction ID, and a live mirror of every
//! discovered device's properties.
//!
//! # Example
//!
//! ```ignore
//! use echolite_client::EchonetClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = EchonetClient::connect().await?;
//!
//!     // Find devices on the local network
//!     client.discover(None).await?;
//!
//!     for host in client.hosts() {
//!         for object in client.instances(host) {
//!             client.get_all_property_maps(host, object).await?;
//!
//!             // Watch for changes
//!             client.register_update_handler(host, object, move |is_push| async move {
//!                 println!("{} {} changed (push: {})", host, object, is_push);
//!                 Ok(())
//!             });
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod callbacks;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod router;
pub mod state;
pub mod transaction;

pub use builder::EchonetClientBuilder;
pub use callbacks::{CallbackRegistry, UpdateHandler};
pub use client::{EchonetClient, MessageReport};
pub use config::ClientConfig;
pub use discovery::DiscoveryOutcome;
pub use error::{ClientError, Result, StateError};
pub use router::{PropertyUpdateRouter, RecordOutcome};
pub use state::{DeviceStateTree, InstanceKey, Node, PropertyMap, Snapshot};
pub use transaction::{TransactionId, TransactionRegistry, TransactionState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::EchonetClientBuilder;
    pub use crate::client::EchonetClient;
    pub use crate::config::ClientConfig;
    pub use crate::error::{ClientError, Result};
    pub use echolite_core::{EchonetObject, Property, PropertyValue, ServiceCode};
}
