//! Error types for echolite frames and property decoding

use thiserror::Error;

/// Result type alias for echolite core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Frame shorter than the fixed header
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// First header byte is not the ECHONET Lite marker
    #[error("invalid EHD1: expected 0x10, got 0x{0:02x}")]
    InvalidHeader(u8),

    /// Only the specified message format (EHD2 0x81) is understood
    #[error("unsupported frame format: EHD2 0x{0:02x}")]
    UnsupportedFormat(u8),

    /// Service code with a layout this codec does not handle
    #[error("unsupported service: 0x{0:02x}")]
    UnsupportedService(u8),

    /// Payload ended before the announced content
    #[error("truncated {what}: need {needed} bytes, have {have}")]
    Truncated {
        what: &'static str,
        needed: usize,
        have: usize,
    },

    /// Property data longer than one PDC byte can describe
    #[error("property 0x{epc:02x} data too large: {len} bytes (max 255)")]
    PropertyTooLarge { epc: u8, len: usize },

    /// More records than one OPC byte can describe
    #[error("too many properties: {0} (max 255)")]
    TooManyProperties(usize),

    /// Malformed object identifier text
    #[error("invalid object code: {0}")]
    InvalidObject(String),

    /// Property data does not match the layout expected for its code
    #[error("invalid data for property 0x{epc:02x}: {reason}")]
    InvalidPropertyData { epc: u8, reason: String },
}
