//! Protocol types: object identifiers, service codes and property records

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, NODE_PROFILE_CLASS, NODE_PROFILE_GROUP, PROFILE_GROUP};

/// ECHONET object identifier (EOJ): class group, class and instance codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EchonetObject {
    pub group: u8,
    pub class: u8,
    pub instance: u8,
}

impl EchonetObject {
    pub const fn new(group: u8, class: u8, instance: u8) -> Self {
        Self {
            group,
            class,
            instance,
        }
    }

    /// The node profile object addressed by discovery requests
    pub const fn node_profile() -> Self {
        Self::new(NODE_PROFILE_GROUP, NODE_PROFILE_CLASS, 0x00)
    }

    /// Controller object used as the source of outbound frames
    pub const fn controller() -> Self {
        Self::new(0x05, 0xFF, 0x01)
    }

    /// True for any instance of the node profile super-class
    pub fn is_node_profile(&self) -> bool {
        self.group == NODE_PROFILE_GROUP && self.class == NODE_PROFILE_CLASS
    }

    /// True for objects in the profile class group, which are never tracked
    pub fn is_profile_group(&self) -> bool {
        self.group == PROFILE_GROUP
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.group, self.class, self.instance]
    }
}

impl fmt::Display for EchonetObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.group, self.class, self.instance)
    }
}

/// Parses `0x013001`, `013001` or `01:30:01`
impl FromStr for EchonetObject {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits: String = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed)
            .chars()
            .filter(|c| *c != ':')
            .collect();

        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidObject(s.to_string()));
        }

        let raw = u32::from_str_radix(&digits, 16).map_err(|_| Error::InvalidObject(s.to_string()))?;
        Ok(Self::new((raw >> 16) as u8, (raw >> 8) as u8, raw as u8))
    }
}

/// Service codes (ESV)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ServiceCode {
    SetINoResponse = 0x50,
    SetCNoResponse = 0x51,
    GetNoResponse = 0x52,
    InfNoResponse = 0x53,
    SetGetNoResponse = 0x5E,
    SetI = 0x60,
    SetC = 0x61,
    Get = 0x62,
    InfRequest = 0x63,
    SetGet = 0x6E,
    SetResponse = 0x71,
    GetResponse = 0x72,
    Inf = 0x73,
    InfC = 0x74,
    InfCResponse = 0x7A,
    SetGetResponse = 0x7E,
}

impl ServiceCode {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0x50 => Some(ServiceCode::SetINoResponse),
            0x51 => Some(ServiceCode::SetCNoResponse),
            0x52 => Some(ServiceCode::GetNoResponse),
            0x53 => Some(ServiceCode::InfNoResponse),
            0x5E => Some(ServiceCode::SetGetNoResponse),
            0x60 => Some(ServiceCode::SetI),
            0x61 => Some(ServiceCode::SetC),
            0x62 => Some(ServiceCode::Get),
            0x63 => Some(ServiceCode::InfRequest),
            0x6E => Some(ServiceCode::SetGet),
            0x71 => Some(ServiceCode::SetResponse),
            0x72 => Some(ServiceCode::GetResponse),
            0x73 => Some(ServiceCode::Inf),
            0x74 => Some(ServiceCode::InfC),
            0x7A => Some(ServiceCode::InfCResponse),
            0x7E => Some(ServiceCode::SetGetResponse),
            _ => None,
        }
    }

    /// SetGet services carry two property lists
    pub fn has_split_lists(self) -> bool {
        matches!(
            self,
            ServiceCode::SetGet | ServiceCode::SetGetResponse | ServiceCode::SetGetNoResponse
        )
    }

    /// "Not available" replies (0x5X)
    pub fn is_failure(self) -> bool {
        (self as u8) & 0xF0 == 0x50
    }
}

/// One operation record: property code (EPC) and its data (EDT)
///
/// Requests that only name a property (Get) carry empty data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub epc: u8,
    pub edt: Bytes,
}

impl Property {
    pub fn new(epc: u8, edt: impl Into<Bytes>) -> Self {
        Self {
            epc,
            edt: edt.into(),
        }
    }

    /// A record without data, as used by Get requests
    pub fn request(epc: u8) -> Self {
        Self {
            epc,
            edt: Bytes::new(),
        }
    }

    pub fn has_data(&self) -> bool {
        !self.edt.is_empty()
    }
}
