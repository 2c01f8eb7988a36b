//! ECHONET Lite frame
//!
//! Frame format (EHD2 = 0x81, specified message format):
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Byte 0:     EHD1 (0x10 = ECHONET Lite)                          │
//! │ Byte 1:     EHD2 (0x81 = specified format)                      │
//! │ Byte 2-3:   TID (uint16 big-endian)                             │
//! │ Byte 4-6:   SEOJ (source object: group, class, instance)        │
//! │ Byte 7-9:   DEOJ (destination object)                           │
//! │ Byte 10:    ESV (service code)                                  │
//! │ Byte 11:    OPC (number of property records)                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ OPC × [ EPC (1) | PDC (1) | EDT (PDC bytes) ]                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use crate::types::{EchonetObject, Property, ServiceCode};

/// Header size up to and including OPC
pub const HEADER_SIZE: usize = 12;

/// EHD1 marker for ECHONET Lite
pub const EHD1: u8 = 0x10;

/// EHD2 for the specified message format
pub const EHD2_SPECIFIED: u8 = 0x81;

/// A decoded ECHONET Lite message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Transaction identifier as carried on the wire (may be 0 in pushes)
    pub tid: u16,
    pub seoj: EchonetObject,
    pub deoj: EchonetObject,
    /// Raw service code
    pub esv: u8,
    pub properties: Vec<Property>,
}

impl Frame {
    /// Create a frame from the controller object to `deoj`
    pub fn new(deoj: EchonetObject, esv: ServiceCode) -> Self {
        Self {
            tid: 0,
            seoj: EchonetObject::controller(),
            deoj,
            esv: esv as u8,
            properties: Vec::new(),
        }
    }

    pub fn with_tid(mut self, tid: u16) -> Self {
        self.tid = tid;
        self
    }

    pub fn with_source(mut self, seoj: EchonetObject) -> Self {
        self.seoj = seoj;
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_properties(mut self, properties: impl IntoIterator<Item = Property>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Typed service code, if known
    pub fn service(&self) -> Option<ServiceCode> {
        ServiceCode::from_u8(self.esv)
    }

    /// Whether this frame is a read response (Get_Res)
    pub fn is_read_response(&self) -> bool {
        self.esv == ServiceCode::GetResponse as u8
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        HEADER_SIZE
            + self
                .properties
                .iter()
                .map(|p| 2 + p.edt.len())
                .sum::<usize>()
    }
}
