//! Property codes, decoded property values and the per-code decoder table

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::{Error, Result};

/// Status change announcement property map
pub const STATUS_MAP: u8 = 0x9D;
/// Set property map
pub const SET_MAP: u8 = 0x9E;
/// Get property map
pub const GET_MAP: u8 = 0x9F;
/// Identification number
pub const IDENTIFICATION_NUMBER: u8 = 0x83;
/// Manufacturer code
pub const MANUFACTURER_CODE: u8 = 0x8A;

/// Codes whose value is itself a set of property codes
pub const MAP_CODES: [u8; 3] = [STATUS_MAP, SET_MAP, GET_MAP];

/// Codes identifying the device and its maker
pub const IDENTIFICATION_CODES: [u8; 2] = [IDENTIFICATION_NUMBER, MANUFACTURER_CODE];

/// How a property code is handled when a value arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyClass {
    Map,
    Identification,
    Generic,
}

impl PropertyClass {
    pub fn of(epc: u8) -> Self {
        if MAP_CODES.contains(&epc) {
            PropertyClass::Map
        } else if IDENTIFICATION_CODES.contains(&epc) {
            PropertyClass::Identification
        } else {
            PropertyClass::Generic
        }
    }
}

/// Decoded identification values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identification {
    /// Identification number as lowercase hex
    DeviceId(String),
    /// Three-byte manufacturer code
    Manufacturer(u32),
}

/// A stored property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    /// Set of supported property codes
    Map(BTreeSet<u8>),
    Identification(Identification),
    /// Undecoded property data
    Raw(Bytes),
}

impl PropertyValue {
    /// An empty capability set
    pub fn empty_map() -> Self {
        PropertyValue::Map(BTreeSet::new())
    }

    /// Whether this value has the shape required for `epc`
    pub fn fits(&self, epc: u8) -> bool {
        matches!(
            (PropertyClass::of(epc), self),
            (PropertyClass::Map, PropertyValue::Map(_))
                | (PropertyClass::Identification, PropertyValue::Identification(_))
                | (PropertyClass::Generic, PropertyValue::Raw(_))
        )
    }

    pub fn as_map(&self) -> Option<&BTreeSet<u8>> {
        match self {
            PropertyValue::Map(codes) => Some(codes),
            _ => None,
        }
    }
}

/// Decoder for one property code
pub type PropertyDecoder = fn(&[u8]) -> Result<PropertyValue>;

/// Per-code decoder table
#[derive(Debug, Clone)]
pub struct DecoderTable {
    decoders: HashMap<u8, PropertyDecoder>,
}

impl DecoderTable {
    /// A table without any decoders
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register or replace the decoder for `epc`
    pub fn register(&mut self, epc: u8, decoder: PropertyDecoder) -> &mut Self {
        self.decoders.insert(epc, decoder);
        self
    }

    pub fn get(&self, epc: u8) -> Option<PropertyDecoder> {
        self.decoders.get(&epc).copied()
    }

    pub fn contains(&self, epc: u8) -> bool {
        self.decoders.contains_key(&epc)
    }
}

impl Default for DecoderTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table
            .register(STATUS_MAP, decode_status_map)
            .register(SET_MAP, decode_set_map)
            .register(GET_MAP, decode_get_map)
            .register(IDENTIFICATION_NUMBER, decode_identification_number)
            .register(MANUFACTURER_CODE, decode_manufacturer_code);
        table
    }
}

/// Decode a property map
///
/// The first byte is the number of codes. Below 16 the codes follow as a
/// plain list; from 16 on a 16-byte bitmap follows where bit `j` of byte `i`
/// stands for code `0x80 + i + 0x10 * j`.
pub fn decode_property_map(epc: u8, edt: &[u8]) -> Result<PropertyValue> {
    let Some((&count, rest)) = edt.split_first() else {
        return Err(Error::InvalidPropertyData {
            epc,
            reason: "empty property map".to_string(),
        });
    };

    let count = count as usize;
    let mut codes = BTreeSet::new();

    if count < 16 {
        if rest.len() < count {
            return Err(Error::Truncated {
                what: "property map",
                needed: count,
                have: rest.len(),
            });
        }
        codes.extend(rest[..count].iter().copied());
    } else {
        if rest.len() < 16 {
            return Err(Error::Truncated {
                what: "property map bitmap",
                needed: 16,
                have: rest.len(),
            });
        }
        for (i, byte) in rest[..16].iter().enumerate() {
            for j in 0..8 {
                if byte & (1 << j) != 0 {
                    codes.insert(0x80 + i as u8 + 0x10 * j as u8);
                }
            }
        }
    }

    Ok(PropertyValue::Map(codes))
}

fn decode_status_map(edt: &[u8]) -> Result<PropertyValue> {
    decode_property_map(STATUS_MAP, edt)
}

fn decode_set_map(edt: &[u8]) -> Result<PropertyValue> {
    decode_property_map(SET_MAP, edt)
}

fn decode_get_map(edt: &[u8]) -> Result<PropertyValue> {
    decode_property_map(GET_MAP, edt)
}

/// Identification number (0x83), kept as hex
pub fn decode_identification_number(edt: &[u8]) -> Result<PropertyValue> {
    if edt.is_empty() {
        return Err(Error::InvalidPropertyData {
            epc: IDENTIFICATION_NUMBER,
            reason: "empty identification number".to_string(),
        });
    }
    Ok(PropertyValue::Identification(Identification::DeviceId(
        hex::encode(edt),
    )))
}

/// Manufacturer code (0x8A), three bytes big-endian
pub fn decode_manufacturer_code(edt: &[u8]) -> Result<PropertyValue> {
    if edt.len() != 3 {
        return Err(Error::InvalidPropertyData {
            epc: MANUFACTURER_CODE,
            reason: format!("expected 3 bytes, got {}", edt.len()),
        });
    }
    let code = u32::from_be_bytes([0, edt[0], edt[1], edt[2]]);
    Ok(PropertyValue::Identification(Identification::Manufacturer(
        code,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(PropertyClass::of(0x9D), PropertyClass::Map);
        assert_eq!(PropertyClass::of(0x9F), PropertyClass::Map);
        assert_eq!(PropertyClass::of(0x83), PropertyClass::Identification);
        assert_eq!(PropertyClass::of(0x8A), PropertyClass::Identification);
        assert_eq!(PropertyClass::of(0x80), PropertyClass::Generic);
        assert_eq!(PropertyClass::of(0xD6), PropertyClass::Generic);
    }

    #[test]
    fn test_list_property_map() {
        let value = decode_property_map(GET_MAP, &[3, 0x80, 0x81, 0x9F]).unwrap();
        let codes: Vec<u8> = value.as_map().unwrap().iter().copied().collect();
        assert_eq!(codes, vec![0x80, 0x81, 0x9F]);
    }

    #[test]
    fn test_bitmap_property_map() {
        let mut edt = vec![17u8; 1];
        let mut bitmap = [0u8; 16];
        // 0x80: byte 0 bit 0; 0x9F: byte 15 bit 1; 0xF0: byte 0 bit 7
        bitmap[0] = 0b1000_0001;
        bitmap[15] = 0b0000_0010;
        edt.extend_from_slice(&bitmap);

        let value = decode_property_map(GET_MAP, &edt).unwrap();
        let codes: Vec<u8> = value.as_map().unwrap().iter().copied().collect();
        assert_eq!(codes, vec![0x80, 0x9F, 0xF0]);
    }

    #[test]
    fn test_truncated_property_map() {
        assert!(matches!(
            decode_property_map(SET_MAP, &[4, 0x80]),
            Err(Error::Truncated { .. })
        ));
        assert!(matches!(
            decode_property_map(SET_MAP, &[20, 0xFF, 0xFF]),
            Err(Error::Truncated { .. })
        ));
        assert!(decode_property_map(SET_MAP, &[]).is_err());
    }

    #[test]
    fn test_identification_decoders() {
        let value = decode_identification_number(&[0xFE, 0x00, 0x00, 0x77, 0xAB]).unwrap();
        assert_eq!(
            value,
            PropertyValue::Identification(Identification::DeviceId("fe000077ab".to_string()))
        );

        let value = decode_manufacturer_code(&[0x00, 0x00, 0x77]).unwrap();
        assert_eq!(
            value,
            PropertyValue::Identification(Identification::Manufacturer(0x77))
        );
        assert!(decode_manufacturer_code(&[0x00, 0x77]).is_err());
    }

    #[test]
    fn test_value_shapes() {
        assert!(PropertyValue::empty_map().fits(STATUS_MAP));
        assert!(!PropertyValue::empty_map().fits(0x80));
        assert!(PropertyValue::Raw(Bytes::from_static(&[0x30])).fits(0x80));
        assert!(!PropertyValue::Raw(Bytes::from_static(&[0x30])).fits(MANUFACTURER_CODE));
    }

    #[test]
    fn test_default_table() {
        let table = DecoderTable::default();
        for epc in MAP_CODES.iter().chain(IDENTIFICATION_CODES.iter()) {
            assert!(table.contains(*epc));
        }
        assert!(!table.contains(0x80));
        assert!(DecoderTable::empty().get(GET_MAP).is_none());
    }
}
