//! echolite core
//!
//! Core types and encoding for the ECHONET Lite protocol.
//!
//! This crate provides:
//! - Object identifiers, service codes and property records ([`EchonetObject`], [`ServiceCode`], [`Property`])
//! - Frame encoding/decoding ([`Frame`], [`codec`])
//! - Property code classes and the per-code decoder table ([`DecoderTable`], [`PropertyValue`])

pub mod codec;
pub mod error;
pub mod frame;
pub mod property;
pub mod types;

pub use codec::{decode, encode};
pub use error::{Error, Result};
pub use frame::Frame;
pub use property::{DecoderTable, Identification, PropertyClass, PropertyDecoder, PropertyValue};
pub use types::{EchonetObject, Property, ServiceCode};

use std::net::Ipv4Addr;

/// ECHONET Lite UDP port
pub const ENL_PORT: u16 = 3610;

/// Multicast group used for discovery and announcements
pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 23, 0);

/// Node profile class group code
pub const NODE_PROFILE_GROUP: u8 = 0x0E;

/// Node profile class code
pub const NODE_PROFILE_CLASS: u8 = 0xF0;

/// Profile class group; objects in it are not controllable instances
pub const PROFILE_GROUP: u8 = 0x0F;

/// Self-node instance list S (discovery payload)
pub const INSTANCE_LIST: u8 = 0xD6;

/// Poll interval for request correlation, in milliseconds
pub const POLL_INTERVAL_MS: u64 = 100;

/// Number of poll intervals before a request is considered lost
pub const MAX_POLLS: u32 = 200;
