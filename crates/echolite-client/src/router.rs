//! Applies received property records to the state tree
//!
//! Records are classified in this order:
//! 1. instance list from the node profile → discovery
//! 2. property map codes → decoded and stored, never reported as a change
//! 3. identification codes → decoded and stored, never reported as a change
//! 4. anything else → stored raw; in a read response (Get_Res) a value that
//!    differs from the stored one is reported as a change

use echolite_core::{DecoderTable, EchonetObject, Property, PropertyClass, PropertyValue, ServiceCode};
use std::net::IpAddr;
use tracing::debug;

use crate::discovery::{self, DiscoveryOutcome};
use crate::error::{ClientError, Result};
use crate::state::DeviceStateTree;

/// What applying one record did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Discovery(DiscoveryOutcome),
    /// Map or identification value stored
    Descriptor,
    /// Generic value stored, no change reported
    Stored,
    /// Generic value in a read response differed from the stored one
    Changed,
}

impl RecordOutcome {
    pub fn is_change(self) -> bool {
        matches!(self, RecordOutcome::Changed)
    }
}

/// Classifies records and writes them to the tree
#[derive(Debug, Clone, Default)]
pub struct PropertyUpdateRouter {
    decoders: DecoderTable,
}

impl PropertyUpdateRouter {
    pub fn new(decoders: DecoderTable) -> Self {
        Self { decoders }
    }

    /// Apply one record received from `source` on `host`
    pub fn apply(
        &self,
        tree: &mut DeviceStateTree,
        host: IpAddr,
        source: EchonetObject,
        esv: u8,
        property: &Property,
    ) -> Result<RecordOutcome> {
        let epc = property.epc;

        if discovery::is_instance_list(source, epc) {
            let outcome = discovery::apply_instance_list(tree, host, &property.edt)?;
            return Ok(RecordOutcome::Discovery(outcome));
        }

        match PropertyClass::of(epc) {
            PropertyClass::Map | PropertyClass::Identification => {
                let value = self.decode(epc, &property.edt)?;
                tree.set_descriptor(host, source, epc, value)?;
                debug!("{} {} 0x{:02X} descriptor stored", host, source, epc);
                Ok(RecordOutcome::Descriptor)
            }
            PropertyClass::Generic => {
                let value = PropertyValue::Raw(property.edt.clone());
                let changed = esv == ServiceCode::GetResponse as u8
                    && tree.property(host, source, epc) != Some(&value);
                tree.set_property(host, source, epc, value)?;

                if changed {
                    debug!("{} {} 0x{:02X} changed", host, source, epc);
                    Ok(RecordOutcome::Changed)
                } else {
                    Ok(RecordOutcome::Stored)
                }
            }
        }
    }

    fn decode(&self, epc: u8, edt: &[u8]) -> Result<PropertyValue> {
        let decoder = self
            .decoders
            .get(epc)
            .ok_or(ClientError::MissingDecoder(epc))?;
        let value = decoder(edt)?;
        if !value.fits(epc) {
            return Err(ClientError::ShapeMismatch(epc));
        }
        Ok(value)
    }
}
