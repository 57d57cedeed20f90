//! # Port Registry
//!
//! Maps every generated port to the node generator that produces its code.
//! Registration is only open while the initializer runs. Flow input text is
//! memoized so a port reached from several places is generated once; the
//! cache is bypassed while state bodies are being generated.

use crate::graph::{NodeId, PortId};
use crate::nodes::NodeGenerator;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone)]
pub struct Registration {
    pub node: NodeId,
    pub generator: Arc<dyn NodeGenerator>,
}

#[derive(Default)]
pub struct PortRegistry {
    registrations: HashMap<PortId, Registration>,
    flow_cache: HashMap<PortId, String>,
    active: HashSet<PortId>,
    ungrouped: usize,
}

impl PortRegistry {
    pub fn register(&mut self, port: PortId, node: NodeId, generator: Arc<dyn NodeGenerator>) {
        self.registrations.insert(port, Registration { node, generator });
    }

    pub fn registration(&self, port: PortId) -> Option<Registration> {
        self.registrations.get(&port).cloned()
    }

    pub fn is_registered(&self, port: PortId) -> bool {
        self.registrations.contains_key(&port)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Cached flow text; always `None` while ungrouped
    pub fn cached(&self, port: PortId) -> Option<&str> {
        if self.ungrouped > 0 {
            return None;
        }
        self.flow_cache.get(&port).map(String::as_str)
    }

    pub fn remember(&mut self, port: PortId, code: &str) {
        if self.ungrouped == 0 {
            self.flow_cache.insert(port, code.to_string());
        }
    }

    /// Marks `port` as being generated; false if it already is
    pub fn enter(&mut self, port: PortId) -> bool {
        self.active.insert(port)
    }

    pub fn leave(&mut self, port: PortId) {
        self.active.remove(&port);
    }

    pub fn begin_ungrouped(&mut self) {
        self.ungrouped += 1;
    }

    pub fn end_ungrouped(&mut self) {
        self.ungrouped = self.ungrouped.saturating_sub(1);
    }

    pub fn is_ungrouped(&self) -> bool {
        self.ungrouped > 0
    }
}
