//! Instance list processing
//!
//! A node profile answers discovery with its instance list (0xD6): one count
//! byte followed by that many 3-byte object codes.

use echolite_core::{EchonetObject, Error, INSTANCE_LIST};
use std::net::IpAddr;
use tracing::{debug, info};

use crate::state::DeviceStateTree;

/// Result of applying an instance list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Host was already discovered; nothing changed
    AlreadyDiscovered,
    /// Host marked discovered with this many tracked instances
    Discovered { instances: usize },
}

/// Whether a record from `source` carries an instance list
pub fn is_instance_list(source: EchonetObject, epc: u8) -> bool {
    source.is_node_profile() && epc == INSTANCE_LIST
}

/// Parse an instance list payload
///
/// Fails if the count announces more objects than the payload holds.
pub fn parse_instance_list(edt: &[u8]) -> Result<Vec<EchonetObject>, Error> {
    let Some((&count, rest)) = edt.split_first() else {
        return Err(Error::Truncated {
            what: "instance list",
            needed: 1,
            have: 0,
        });
    };

    let needed = count as usize * 3;
    if rest.len() < needed {
        return Err(Error::Truncated {
            what: "instance list",
            needed,
            have: rest.len(),
        });
    }

    Ok(rest[..needed]
        .chunks_exact(3)
        .map(|code| EchonetObject::new(code[0], code[1], code[2]))
        .collect())
}

/// Populate the tree from `host`'s instance list
///
/// Runs once per host. Profile-group objects are skipped. The host is
/// marked discovered even if no instance remains; a malformed payload
/// leaves both the tree and the flag untouched.
pub fn apply_instance_list(
    tree: &mut DeviceStateTree,
    host: IpAddr,
    edt: &[u8],
) -> Result<DiscoveryOutcome, Error> {
    if tree.is_discovered(host) {
        debug!("Ignoring instance list from already discovered {}", host);
        return Ok(DiscoveryOutcome::AlreadyDiscovered);
    }

    let objects = parse_instance_list(edt)?;
    let mut instances = 0;

    tree.ensure_node(host);
    for object in objects {
        if object.is_profile_group() {
            continue;
        }
        tree.ensure_instance(host, object);
        instances += 1;
    }

    if let Some(node) = tree.node_mut(host) {
        node.mark_discovered();
    }

    info!("Discovered {} with {} instance(s)", host, instances);
    Ok(DiscoveryOutcome::Discovered { instances })
}
