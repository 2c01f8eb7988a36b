//! Client error types

use echolite_core::EchonetObject;
use std::net::IpAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("protocol error: {0}")]
    Protocol(#[from] echolite_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] echolite_transport::TransportError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("no decoder registered for property 0x{0:02x}")]
    MissingDecoder(u8),

    #[error("decoder for property 0x{0:02x} returned a value of the wrong shape")]
    ShapeMismatch(u8),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors raised by the device state tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("unknown host {0}")]
    UnknownHost(IpAddr),

    #[error("unknown instance {object} on {host}")]
    UnknownInstance { host: IpAddr, object: EchonetObject },
}
