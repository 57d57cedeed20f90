//! # Initializer
//!
//! The first pass over a class graph. It finds every node reachable from a
//! member body or an event, decides which flow inputs must become state
//! machine entries, mirrors the declared variables into records and lets each
//! reachable node register its ports.
//!
//! A flow input is a state entry when:
//!
//! - the port itself is coroutine-capable;
//! - its node lives in the main graph and leads (through main graph flow) to
//!   a coroutine node, a node on a flow cycle, or a node with a nested state
//!   flow output;
//! - it closes a flow cycle (the target of a DFS back edge);
//! - a node promoted it during initialization.

use super::records::{RecordKey, Storage, VariableSpec};
use super::{wrap_node_error, ClassScope, CodeGenerator, Phase};
use crate::error::{GeneratorError, Result};
use crate::graph::{ContainerId, ContainerKind, GraphDescription, GraphIndex, NodeId, NodeInstance, PortId, PortKind};
use crate::nodes::NodeLibrary;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// A flow edge between two reachable nodes. Edges into a group's child
/// entry have no target port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FlowEdge {
    port: Option<PortId>,
    target: NodeId,
}

/// Reachability and control-flow classification of one class graph
#[derive(Debug, Default)]
pub struct Classification {
    reachable: Vec<NodeId>,
    reachable_set: HashSet<NodeId>,
    events: Vec<NodeId>,
    edges: HashMap<NodeId, Vec<FlowEdge>>,
    state_ports: BTreeSet<PortId>,
    state_nodes: HashSet<NodeId>,
}

impl Classification {
    /// Reachable nodes in discovery order
    pub fn reachable(&self) -> &[NodeId] {
        &self.reachable
    }

    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.reachable_set.contains(&node)
    }

    pub fn events(&self) -> &[NodeId] {
        &self.events
    }

    pub fn is_state_port(&self, port: PortId) -> bool {
        self.state_ports.contains(&port)
    }

    pub fn state_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.state_ports.iter().copied()
    }

    /// Nodes that run inside some state body
    pub fn is_state_node(&self, node: NodeId) -> bool {
        self.state_nodes.contains(&node)
    }

    pub(crate) fn promote(&mut self, port: PortId) -> bool {
        self.state_ports.insert(port)
    }

    /// Recomputes the nodes running inside state bodies: every node flowing
    /// from a node that owns a state entry.
    pub(crate) fn refresh_state_nodes(&mut self, index: &GraphIndex<'_>) {
        let mut queue: VecDeque<NodeId> = self
            .state_ports
            .iter()
            .filter_map(|port| index.port(*port).map(|(node, _)| node.id))
            .collect();
        let mut nodes = HashSet::new();
        while let Some(node) = queue.pop_front() {
            if !nodes.insert(node) {
                continue;
            }
            for edge in self.edges.get(&node).into_iter().flatten() {
                queue.push_back(edge.target);
            }
        }
        self.state_nodes = nodes;
    }
}

/// The container whose method a node's code ends up in. Group children are
/// generated inline in their owner's body.
pub(crate) fn root_container(index: &GraphIndex<'_>, container: ContainerId) -> ContainerId {
    let mut current = container;
    for _ in 0..=index.graph().containers.len() {
        match index.container(current).map(|c| &c.kind) {
            Some(ContainerKind::Group { owner, .. }) => match index.node(*owner) {
                Some(node) => current = node.container,
                None => break,
            },
            _ => break,
        }
    }
    current
}

pub(crate) fn is_main_graph(index: &GraphIndex<'_>, container: ContainerId) -> bool {
    let root = root_container(index, container);
    matches!(index.container(root).map(|c| &c.kind), Some(ContainerKind::MainGraph))
}

fn flow_edges(index: &GraphIndex<'_>, node: &NodeInstance) -> Vec<FlowEdge> {
    let mut edges: Vec<FlowEdge> = index
        .flow_successors(node)
        .into_iter()
        .map(|(port, target)| FlowEdge {
            port: Some(port),
            target,
        })
        .collect();

    if let Some(entry) = index.group_of(node.id).and_then(|c| c.entry) {
        edges.push(FlowEdge { port: None, target: entry });
    }

    // Leaving a group continues at the owner's exit
    if node.node_type == "group_exit" {
        if let Some(ContainerKind::Group { owner, .. }) = index.container(node.container).map(|c| &c.kind) {
            if let Some(exit) = index.node(*owner).and_then(|owner| owner.port("exit")) {
                for target in index.targets(exit.id) {
                    if let Some((next, _)) = index.port(*target) {
                        edges.push(FlowEdge {
                            port: Some(*target),
                            target: next.id,
                        });
                    }
                }
            }
        }
    }
    edges
}

/// Runs reachability and state classification for one graph
pub fn analyze(index: &GraphIndex<'_>, library: &NodeLibrary) -> Result<Classification> {
    let graph = index.graph();
    let mut roots = Vec::new();
    for container in &graph.containers {
        let is_body = !matches!(container.kind, ContainerKind::MainGraph | ContainerKind::Group { .. });
        if let (true, Some(entry)) = (is_body, container.entry) {
            roots.push(entry);
        }
    }
    let mut events = Vec::new();
    for node in &graph.nodes {
        if library.get(&node.node_type).map(|g| g.is_event()).unwrap_or(false) {
            events.push(node.id);
            roots.push(node.id);
        }
    }

    let mut classification = Classification {
        events,
        ..Classification::default()
    };

    // Discovery: flow downstream, values upstream, groups inward
    let mut queue: VecDeque<NodeId> = roots.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if classification.reachable_set.contains(&id) {
            continue;
        }
        let Some(node) = index.node(id) else {
            continue;
        };
        classification.reachable_set.insert(id);
        classification.reachable.push(id);

        let edges = flow_edges(index, node);
        for edge in &edges {
            queue.push_back(edge.target);
        }
        for source in index.value_sources(node) {
            queue.push_back(source);
        }
        classification.edges.insert(id, edges);
    }

    let cyclic = cyclic_nodes(&classification.reachable, &classification.edges);
    let back_edges = back_edge_targets(&roots, &classification.reachable, &classification.edges);

    let mut coroutine_nodes = HashSet::new();
    for &id in &classification.reachable {
        let Some(node) = index.node(id) else {
            continue;
        };
        let generator = library.get(&node.node_type).ok_or_else(|| GeneratorError::UnknownNodeType {
            node: id,
            node_type: node.node_type.clone(),
        })?;
        if generator.is_coroutine(node) {
            coroutine_nodes.insert(id);
        }
        for port in node.ports_of(PortKind::FlowInput).filter(|p| p.coroutine) {
            classification.state_ports.insert(port.id);
        }
    }

    // Main graph nodes leading into coroutine-like nodes
    let main: HashSet<NodeId> = classification
        .reachable
        .iter()
        .copied()
        .filter(|id| index.node(*id).map(|n| is_main_graph(index, n.container)).unwrap_or(false))
        .collect();
    let mut predecessors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for (&from, edges) in &classification.edges {
        if !main.contains(&from) {
            continue;
        }
        for edge in edges {
            predecessors.entry(edge.target).or_default().push(from);
        }
    }
    let mut pending: VecDeque<NodeId> = classification
        .reachable
        .iter()
        .copied()
        .filter(|id| main.contains(id))
        .filter(|id| {
            coroutine_nodes.contains(id)
                || cyclic.contains(id)
                || index
                    .node(*id)
                    .map(|n| n.ports_of(PortKind::FlowOutput).any(|p| p.state_flow))
                    .unwrap_or(false)
        })
        .collect();
    let mut leads_to_state = HashSet::new();
    while let Some(id) = pending.pop_front() {
        if !main.contains(&id) || !leads_to_state.insert(id) {
            continue;
        }
        for &previous in predecessors.get(&id).into_iter().flatten() {
            pending.push_back(previous);
        }
    }
    for &id in &classification.reachable {
        if !leads_to_state.contains(&id) {
            continue;
        }
        if let Some(node) = index.node(id) {
            for port in node.ports_of(PortKind::FlowInput) {
                classification.state_ports.insert(port.id);
            }
        }
    }

    classification.state_ports.extend(back_edges);
    classification.refresh_state_nodes(index);

    tracing::debug!(
        "[INIT] {} reachable nodes, {} events, {} state entries, {} nodes on flow cycles",
        classification.reachable.len(),
        classification.events.len(),
        classification.state_ports.len(),
        cyclic.len()
    );
    Ok(classification)
}

/// Nodes inside a non-trivial strongly connected component of the flow
/// graph, or with a flow edge to themselves (iterative Tarjan).
fn cyclic_nodes(order: &[NodeId], edges: &HashMap<NodeId, Vec<FlowEdge>>) -> HashSet<NodeId> {
    fn successors(edges: &HashMap<NodeId, Vec<FlowEdge>>, node: NodeId) -> &[FlowEdge] {
        edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    let mut index_of: HashMap<NodeId, usize> = HashMap::new();
    let mut low: HashMap<NodeId, usize> = HashMap::new();
    let mut on_stack: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut cyclic = HashSet::new();
    let mut counter = 0usize;

    for &start in order {
        if index_of.contains_key(&start) {
            continue;
        }
        index_of.insert(start, counter);
        low.insert(start, counter);
        counter += 1;
        stack.push(start);
        on_stack.insert(start);
        let mut frames: Vec<(NodeId, usize)> = vec![(start, 0)];

        while let Some(&(node, child)) = frames.last() {
            let next_edges = successors(edges, node);
            if child < next_edges.len() {
                if let Some(frame) = frames.last_mut() {
                    frame.1 += 1;
                }
                let next = next_edges[child].target;
                if !index_of.contains_key(&next) {
                    index_of.insert(next, counter);
                    low.insert(next, counter);
                    counter += 1;
                    stack.push(next);
                    on_stack.insert(next);
                    frames.push((next, 0));
                } else if on_stack.contains(&next) {
                    let lowest = low[&node].min(index_of[&next]);
                    low.insert(node, lowest);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                let lowest = low[&parent].min(low[&node]);
                low.insert(parent, lowest);
            }
            if low[&node] == index_of[&node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack.remove(&member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                let self_loop = successors(edges, node).iter().any(|e| e.target == node);
                if component.len() > 1 || self_loop {
                    cyclic.extend(component);
                }
            }
        }
    }
    cyclic
}

/// Flow inputs that close a cycle: targets of back edges in a depth-first
/// walk started from the entry points in order.
fn back_edge_targets(roots: &[NodeId], order: &[NodeId], edges: &HashMap<NodeId, Vec<FlowEdge>>) -> Vec<PortId> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Open,
        Done,
    }

    let mut marks: HashMap<NodeId, Mark> = HashMap::new();
    let mut targets = Vec::new();
    for &start in roots.iter().chain(order) {
        if marks.contains_key(&start) {
            continue;
        }
        marks.insert(start, Mark::Open);
        let mut frames: Vec<(NodeId, usize)> = vec![(start, 0)];
        while let Some(&(node, child)) = frames.last() {
            let next_edges = edges.get(&node).map(Vec::as_slice).unwrap_or(&[]);
            if child >= next_edges.len() {
                marks.insert(node, Mark::Done);
                frames.pop();
                continue;
            }
            if let Some(frame) = frames.last_mut() {
                frame.1 += 1;
            }
            let edge = next_edges[child];
            match marks.get(&edge.target) {
                Some(Mark::Open) => targets.extend(edge.port),
                Some(Mark::Done) => {}
                None => {
                    marks.insert(edge.target, Mark::Open);
                    frames.push((edge.target, 0));
                }
            }
        }
    }
    targets
}

impl<'a> CodeGenerator<'a> {
    /// Starts a new class: resets per-class state, classifies the graph and
    /// mirrors declared variables. Returns the nodes to initialize, in
    /// discovery order.
    pub fn begin_class(&mut self, graph: &'a GraphDescription) -> Result<Vec<NodeId>> {
        tracing::info!("[INIT] Analyzing class '{}'", graph.metadata.name);
        self.class = ClassScope::new(graph, self.options);
        self.class.classification = analyze(&self.class.index, self.library)?;
        self.class.phase = Phase::Initializing;
        self.mirror_variables()?;
        Ok(self.class.classification.reachable().to_vec())
    }

    fn mirror_variables(&mut self) -> Result<()> {
        let graph = self.class.graph;
        for (slot, declaration) in graph.variables.iter().enumerate() {
            let initializer = declaration.default.as_ref().map(|v| self.value(v)).transpose()?;
            let mut attributes = Vec::with_capacity(declaration.attributes.len());
            for attribute in &declaration.attributes {
                attributes.push(self.attribute(attribute)?);
            }
            let spec = VariableSpec {
                name: declaration.name.clone(),
                ty: declaration.ty.clone(),
                storage: Storage::Instance,
                modifiers: declaration.modifiers.render(),
                attributes,
                initializer,
                summary: declaration.summary.clone(),
                exact_name: true,
            };
            self.class
                .variables
                .register(RecordKey::Variable(slot), spec, &mut self.class.names);
        }

        for container in &graph.containers {
            for (slot, local) in container.locals.iter().enumerate() {
                let initializer = local.default.as_ref().map(|v| self.value(v)).transpose()?;
                let storage = self.container_storage(container.id);
                let spec = VariableSpec::new(&local.name, local.ty.clone(), storage).with_initializer(initializer);
                self.class
                    .variables
                    .register(RecordKey::Local(container.id, slot), spec, &mut self.class.names);
            }
        }
        Ok(())
    }

    /// Runs a node's initialization hook. Registration calls made by the
    /// hook are attributed to this node.
    pub fn initialize_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.class.index.node(id).ok_or(GeneratorError::MissingNode(id))?;
        let generator = self
            .library
            .get(&node.node_type)
            .ok_or_else(|| GeneratorError::UnknownNodeType {
                node: id,
                node_type: node.node_type.clone(),
            })?;
        tracing::debug!("[INIT] Initializing node \"{}\" (#{})", node.display_title(), id);

        self.class.initializing = Some((id, generator.clone()));
        let result = generator.on_generator_initialize(self, node);
        self.class.initializing = None;
        result.map_err(|e| wrap_node_error(node, e))
    }

    /// Closes registration and settles storage for variables used inside
    /// state bodies.
    pub fn finish_initialization(&mut self) -> Result<()> {
        if self.class.phase != Phase::Initializing {
            return Err(GeneratorError::InvalidOperation(
                "initialization finished twice or never started".to_string(),
            ));
        }
        self.class.classification.refresh_state_nodes(&self.class.index);

        let index = &self.class.index;
        let classification = &self.class.classification;
        let state_roots: HashSet<ContainerId> = classification
            .reachable()
            .iter()
            .filter(|id| classification.is_state_node(**id))
            .filter_map(|id| index.node(*id))
            .map(|node| root_container(index, node.container))
            .collect();
        let promoted: Vec<RecordKey> = state_roots
            .iter()
            .flat_map(|root| self.class.variables.locals_of(*root).map(|r| r.key.clone()))
            .collect();
        for key in promoted {
            if let Some(record) = self.class.variables.get_mut(&key) {
                tracing::debug!("[INIT] Promoting '{}' to a field, it is used by a state body", record.name);
                record.storage = Storage::Instance;
            }
        }

        self.class.phase = Phase::Generating;
        tracing::info!(
            "[INIT] Class '{}': {} ports registered, {} state entries",
            self.class.state.class_name,
            self.class.registry.len(),
            self.class.classification.state_ports().count()
        );
        Ok(())
    }

    /// Storage for a variable owned by code in `container`
    pub(crate) fn container_storage(&self, container: ContainerId) -> Storage {
        let root = root_container(&self.class.index, container);
        if is_main_graph(&self.class.index, root) {
            Storage::Instance
        } else {
            Storage::Local(root)
        }
    }
}
