//! # Graph Index
//!
//! Lookup tables over a `GraphDescription`: ports by id, connections by
//! endpoint and nodes by container. Connection order is preserved so flow
//! outputs with several targets are emitted in authoring order.

use super::{Container, ContainerId, ContainerKind, GraphDescription, NodeId, NodeInstance, Port, PortId, PortKind};
use std::collections::HashMap;

#[derive(Debug)]
pub struct GraphIndex<'a> {
    graph: &'a GraphDescription,
    nodes: HashMap<NodeId, usize>,
    /// port id -> (node slot, port slot)
    ports: HashMap<PortId, (usize, usize)>,
    outgoing: HashMap<PortId, Vec<PortId>>,
    incoming: HashMap<PortId, Vec<PortId>>,
    containers: HashMap<ContainerId, usize>,
    group_owners: HashMap<NodeId, ContainerId>,
}

impl<'a> GraphIndex<'a> {
    pub fn build(graph: &'a GraphDescription) -> Self {
        let mut nodes = HashMap::new();
        let mut ports = HashMap::new();
        for (slot, node) in graph.nodes.iter().enumerate() {
            nodes.insert(node.id, slot);
            for (port_slot, port) in node.ports.iter().enumerate() {
                ports.insert(port.id, (slot, port_slot));
            }
        }

        let mut outgoing: HashMap<PortId, Vec<PortId>> = HashMap::new();
        let mut incoming: HashMap<PortId, Vec<PortId>> = HashMap::new();
        for connection in &graph.connections {
            outgoing.entry(connection.source).or_default().push(connection.target);
            incoming.entry(connection.target).or_default().push(connection.source);
        }

        let mut containers = HashMap::new();
        let mut group_owners = HashMap::new();
        for (slot, container) in graph.containers.iter().enumerate() {
            containers.insert(container.id, slot);
            if let ContainerKind::Group { owner, .. } = container.kind {
                group_owners.insert(owner, container.id);
            }
        }

        tracing::debug!(
            "[INDEX] {} nodes, {} ports, {} connections",
            nodes.len(),
            ports.len(),
            graph.connections.len()
        );

        Self {
            graph,
            nodes,
            ports,
            outgoing,
            incoming,
            containers,
            group_owners,
        }
    }

    pub fn graph(&self) -> &'a GraphDescription {
        self.graph
    }

    pub fn node(&self, id: NodeId) -> Option<&'a NodeInstance> {
        let graph = self.graph;
        self.nodes.get(&id).map(|slot| &graph.nodes[*slot])
    }

    pub fn port(&self, id: PortId) -> Option<(&'a NodeInstance, &'a Port)> {
        let graph = self.graph;
        self.ports.get(&id).map(|(node, port)| {
            let node = &graph.nodes[*node];
            (node, &node.ports[*port])
        })
    }

    /// Input ports connected to an output port, in connection order
    pub fn targets(&self, output: PortId) -> &[PortId] {
        self.outgoing.get(&output).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The upstream output of a value input, if connected
    pub fn source(&self, input: PortId) -> Option<PortId> {
        self.incoming.get(&input).and_then(|sources| sources.first().copied())
    }

    pub fn is_connected(&self, port: PortId) -> bool {
        self.outgoing.contains_key(&port) || self.incoming.contains_key(&port)
    }

    pub fn container(&self, id: ContainerId) -> Option<&'a Container> {
        let graph = self.graph;
        self.containers.get(&id).map(|slot| &graph.containers[*slot])
    }

    /// The group container owned by a group node
    pub fn group_of(&self, owner: NodeId) -> Option<&'a Container> {
        self.group_owners.get(&owner).and_then(|id| self.container(*id))
    }

    /// Nodes whose flow inputs are reached from `node`'s flow outputs
    pub fn flow_successors(&self, node: &NodeInstance) -> Vec<(PortId, NodeId)> {
        let mut successors = Vec::new();
        for port in node.ports_of(PortKind::FlowOutput) {
            for target in self.targets(port.id) {
                if let Some((next, _)) = self.port(*target) {
                    successors.push((*target, next.id));
                }
            }
        }
        successors
    }

    /// Nodes feeding `node`'s value inputs
    pub fn value_sources(&self, node: &NodeInstance) -> Vec<NodeId> {
        node.ports_of(PortKind::ValueInput)
            .filter_map(|port| self.source(port.id))
            .filter_map(|source| self.port(source).map(|(n, _)| n.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, TypeRef};

    #[test]
    fn targets_keep_connection_order() {
        let mut builder = GraphBuilder::new("Test");
        let function = builder.add_function("Run", TypeRef::void());
        let a = builder.add_node(function.container, "sequence", "A").flow_in("in").build();
        let b = builder.add_node(function.container, "sequence", "B").flow_in("in").build();
        builder.connect(function.entry, "body", b, "in");
        builder.connect(function.entry, "body", a, "in");
        let graph = builder.build();

        let index = GraphIndex::build(&graph);
        let entry = index.node(function.entry).unwrap();
        let body = entry.port("body").unwrap();
        let order: Vec<NodeId> = index
            .targets(body.id)
            .iter()
            .map(|p| index.port(*p).unwrap().0.id)
            .collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(index.flow_successors(entry).len(), 2);
    }

    #[test]
    fn value_sources_follow_connections() {
        let mut builder = GraphBuilder::new("Test");
        let function = builder.add_function("Run", TypeRef::void());
        let literal = builder
            .add_node(function.container, "literal", "One")
            .value_out("value", TypeRef::int())
            .build();
        let op = builder
            .add_node(function.container, "operator", "Add")
            .value_in("a", TypeRef::int())
            .value_in("b", TypeRef::int())
            .build();
        builder.connect(literal, "value", op, "a");
        let graph = builder.build();

        let index = GraphIndex::build(&graph);
        let node = index.node(op).unwrap();
        assert_eq!(index.value_sources(node), vec![literal]);
        let b = node.port("b").unwrap();
        assert_eq!(index.source(b.id), None);
    }
}
