//! Mirrored device state
//!
//! One [`Node`] per host, holding group → class → instance → property map.
//! Instances are created by discovery; after that only their property maps
//! change.

use echolite_core::property::MAP_CODES;
use echolite_core::{EchonetObject, PropertyValue};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use crate::error::StateError;

/// Property code → value for one object instance
pub type PropertyMap = BTreeMap<u8, PropertyValue>;

type InstanceTree = BTreeMap<u8, BTreeMap<u8, BTreeMap<u8, PropertyMap>>>;

/// Host plus object: the key for one mirrored instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub host: IpAddr,
    pub object: EchonetObject,
}

impl InstanceKey {
    pub fn new(host: IpAddr, object: EchonetObject) -> Self {
        Self { host, object }
    }
}

/// Mirrored state of one host
#[derive(Debug, Clone, Default, Serialize)]
pub struct Node {
    discovered: bool,
    instances: InstanceTree,
}

impl Node {
    /// Whether an instance list has been processed for this host
    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    pub fn instance(&self, object: EchonetObject) -> Option<&PropertyMap> {
        self.instances
            .get(&object.group)?
            .get(&object.class)?
            .get(&object.instance)
    }

    /// All known objects in group/class/instance order
    pub fn objects(&self) -> impl Iterator<Item = EchonetObject> + '_ {
        self.instances.iter().flat_map(|(group, classes)| {
            classes.iter().flat_map(move |(class, instances)| {
                instances
                    .keys()
                    .map(move |instance| EchonetObject::new(*group, *class, *instance))
            })
        })
    }

    pub fn instance_count(&self) -> usize {
        self.instances
            .values()
            .flat_map(|classes| classes.values())
            .map(|instances| instances.len())
            .sum()
    }

    pub(crate) fn mark_discovered(&mut self) {
        self.discovered = true;
    }

    fn instance_mut(&mut self, object: EchonetObject) -> Option<&mut PropertyMap> {
        self.instances
            .get_mut(&object.group)?
            .get_mut(&object.class)?
            .get_mut(&object.instance)
    }

    fn instance_entry(&mut self, object: EchonetObject) -> &mut PropertyMap {
        self.instances
            .entry(object.group)
            .or_default()
            .entry(object.class)
            .or_default()
            .entry(object.instance)
            .or_default()
    }
}

/// Serializable copy of the whole tree
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub nodes: BTreeMap<IpAddr, Node>,
}

/// Per-host state store
#[derive(Debug, Default)]
pub struct DeviceStateTree {
    nodes: HashMap<IpAddr, Node>,
}

impl DeviceStateTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty node for `host` if there is none
    pub fn ensure_node(&mut self, host: IpAddr) -> &mut Node {
        self.nodes.entry(host).or_default()
    }

    /// Create the instance path, seeding empty property maps
    ///
    /// Existing values are left untouched.
    pub fn ensure_instance(&mut self, host: IpAddr, object: EchonetObject) {
        let properties = self.ensure_node(host).instance_entry(object);
        for code in MAP_CODES {
            properties
                .entry(code)
                .or_insert_with(PropertyValue::empty_map);
        }
    }

    pub fn has_node(&self, host: IpAddr) -> bool {
        self.nodes.contains_key(&host)
    }

    pub fn node(&self, host: IpAddr) -> Option<&Node> {
        self.nodes.get(&host)
    }

    pub(crate) fn node_mut(&mut self, host: IpAddr) -> Option<&mut Node> {
        self.nodes.get_mut(&host)
    }

    pub fn is_discovered(&self, host: IpAddr) -> bool {
        self.nodes.get(&host).is_some_and(Node::is_discovered)
    }

    pub fn hosts(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.nodes.keys().copied()
    }

    pub fn property(&self, host: IpAddr, object: EchonetObject, epc: u8) -> Option<&PropertyValue> {
        self.nodes.get(&host)?.instance(object)?.get(&epc)
    }

    /// Store a value on an existing instance, returning the previous one
    pub fn set_property(
        &mut self,
        host: IpAddr,
        object: EchonetObject,
        epc: u8,
        value: PropertyValue,
    ) -> Result<Option<PropertyValue>, StateError> {
        let node = self
            .nodes
            .get_mut(&host)
            .ok_or(StateError::UnknownHost(host))?;
        let properties = node
            .instance_mut(object)
            .ok_or(StateError::UnknownInstance { host, object })?;
        Ok(properties.insert(epc, value))
    }

    /// Store a map or identification value, creating the instance path
    ///
    /// Only the node has to exist: these codes are what fills in an
    /// instance that discovery has not reported yet.
    pub fn set_descriptor(
        &mut self,
        host: IpAddr,
        object: EchonetObject,
        epc: u8,
        value: PropertyValue,
    ) -> Result<(), StateError> {
        let node = self
            .nodes
            .get_mut(&host)
            .ok_or(StateError::UnknownHost(host))?;
        node.instance_entry(object).insert(epc, value);
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self
                .nodes
                .iter()
                .map(|(host, node)| (*host, node.clone()))
                .collect(),
        }
    }
}
