//! # Graph Builder
//!
//! Programmatic construction of graph descriptions with ids allocated
//! automatically. Hosts normally deserialize graphs; the builder serves
//! tooling and tests.

use super::*;

/// Handle to a body container and its entry node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyHandle {
    /// Index into the graph's declaration list (functions, constructors, ...)
    pub index: usize,
    pub container: ContainerId,
    pub entry: NodeId,
}

/// Handle to a group node and its child container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupHandle {
    pub node: NodeId,
    pub container: ContainerId,
    pub entry: NodeId,
}

pub struct GraphBuilder {
    graph: GraphDescription,
    next_node: u32,
    next_port: u32,
    next_container: u32,
}

impl GraphBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            graph: GraphDescription::new(name),
            next_node: 1,
            next_port: 1,
            next_container: 1,
        }
    }

    pub fn graph_mut(&mut self) -> &mut GraphDescription {
        &mut self.graph
    }

    pub fn build(self) -> GraphDescription {
        self.graph
    }

    fn add_container(&mut self, kind: ContainerKind) -> ContainerId {
        let id = ContainerId(self.next_container);
        self.next_container += 1;
        self.graph.containers.push(Container {
            id,
            kind,
            entry: None,
            locals: Vec::new(),
        });
        id
    }

    fn container_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.graph.containers.iter_mut().find(|c| c.id == id)
    }

    fn add_body(&mut self, kind: ContainerKind, index: usize) -> BodyHandle {
        let container = self.add_container(kind);
        let entry = self.add_node(container, "entry", "Entry").flow_out("body").build();
        if let Some(c) = self.container_mut(container) {
            c.entry = Some(entry);
        }
        BodyHandle {
            index,
            container,
            entry,
        }
    }

    /// The main (event) graph container, created on first use
    pub fn main_graph(&mut self) -> ContainerId {
        match self.graph.main_graph() {
            Some(container) => container.id,
            None => self.add_container(ContainerKind::MainGraph),
        }
    }

    pub fn add_function(&mut self, name: &str, return_type: TypeRef) -> BodyHandle {
        let index = self.graph.functions.len();
        let handle = self.add_body(ContainerKind::Function(index), index);
        self.graph.functions.push(FunctionDeclaration {
            name: name.to_string(),
            return_type,
            parameters: Vec::new(),
            generic_parameters: Vec::new(),
            modifiers: Modifiers::default(),
            attributes: Vec::new(),
            summary: None,
            container: handle.container,
        });
        handle
    }

    pub fn function_mut(&mut self, index: usize) -> Option<&mut FunctionDeclaration> {
        self.graph.functions.get_mut(index)
    }

    pub fn add_constructor(&mut self, parameters: Vec<ParameterDeclaration>) -> BodyHandle {
        let index = self.graph.constructors.len();
        let handle = self.add_body(ContainerKind::Constructor(index), index);
        self.graph.constructors.push(ConstructorDeclaration {
            modifiers: Modifiers::default(),
            parameters,
            container: handle.container,
            summary: None,
        });
        handle
    }

    /// Adds a property; accessors with bodies get their own containers
    pub fn add_property(
        &mut self,
        name: &str,
        ty: TypeRef,
        getter_body: bool,
        setter_body: bool,
    ) -> (usize, Option<BodyHandle>, Option<BodyHandle>) {
        let index = self.graph.properties.len();
        let getter = getter_body.then(|| self.add_body(ContainerKind::PropertyGetter(index), index));
        let setter = setter_body.then(|| self.add_body(ContainerKind::PropertySetter(index), index));
        self.graph.properties.push(PropertyDeclaration {
            name: name.to_string(),
            ty,
            modifiers: Modifiers::default(),
            attributes: Vec::new(),
            summary: None,
            getter: Some(AccessorDeclaration {
                visibility: None,
                container: getter.map(|h| h.container),
            }),
            setter: Some(AccessorDeclaration {
                visibility: None,
                container: setter.map(|h| h.container),
            }),
            default: None,
        });
        (index, getter, setter)
    }

    pub fn add_variable(&mut self, name: &str, ty: TypeRef, default: Option<Value>) -> usize {
        self.graph.variables.push(VariableDeclaration {
            name: name.to_string(),
            ty,
            default,
            modifiers: Modifiers::default(),
            attributes: Vec::new(),
            summary: None,
        });
        self.graph.variables.len() - 1
    }

    pub fn add_local(&mut self, container: ContainerId, name: &str, ty: TypeRef, default: Option<Value>) {
        if let Some(c) = self.container_mut(container) {
            c.locals.push(VariableDeclaration {
                name: name.to_string(),
                ty,
                default,
                modifiers: Modifiers::default(),
                attributes: Vec::new(),
                summary: None,
            });
        }
    }

    /// Adds an event node (`Start`, `Update`, ...) to the main graph
    pub fn add_event(&mut self, event: &str) -> NodeId {
        let main = self.main_graph();
        self.add_node(main, "event", event)
            .flow_out("out")
            .property("event", event)
            .build()
    }

    /// Adds a group node in `parent` with its own child container
    pub fn add_group(&mut self, parent: ContainerId, title: &str, reference: Option<ObjectId>) -> GroupHandle {
        let node = self.add_node(parent, "group", title).flow_in("in").flow_out("exit").build();
        let container = self.add_container(ContainerKind::Group { owner: node, reference });
        let entry = self.add_node(container, "group_entry", "Group Entry").flow_out("out").build();
        if let Some(c) = self.container_mut(container) {
            c.entry = Some(entry);
        }
        GroupHandle { node, container, entry }
    }

    pub fn add_node(&mut self, container: ContainerId, node_type: &str, title: &str) -> NodeBuilder<'_> {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        NodeBuilder {
            builder: self,
            node: NodeInstance {
                id,
                node_type: node_type.to_string(),
                title: title.to_string(),
                container,
                ports: Vec::new(),
                properties: BTreeMap::new(),
            },
        }
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeInstance> {
        self.graph.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn port(&self, node: NodeId, name: &str) -> Option<PortId> {
        self.graph
            .nodes
            .iter()
            .find(|n| n.id == node)
            .and_then(|n| n.port(name))
            .map(|p| p.id)
    }

    pub fn try_connect(&mut self, from: NodeId, output: &str, to: NodeId, input: &str) -> crate::Result<()> {
        let source = self
            .port(from, output)
            .ok_or_else(|| crate::GeneratorError::missing_port(from, output))?;
        let target = self
            .port(to, input)
            .ok_or_else(|| crate::GeneratorError::missing_port(to, input))?;
        self.graph.connections.push(Connection { source, target });
        Ok(())
    }

    /// Connects `from.output` to `to.input`.
    ///
    /// # Panics
    ///
    /// Panics if either port does not exist; use [`GraphBuilder::try_connect`]
    /// for untrusted input.
    pub fn connect(&mut self, from: NodeId, output: &str, to: NodeId, input: &str) -> &mut Self {
        if let Err(e) = self.try_connect(from, output, to, input) {
            panic!("invalid connection {}.{} -> {}.{}: {}", from, output, to, input, e);
        }
        self
    }
}

pub struct NodeBuilder<'b> {
    builder: &'b mut GraphBuilder,
    node: NodeInstance,
}

impl<'b> NodeBuilder<'b> {
    fn port(mut self, name: &str, kind: PortKind, ty: Option<TypeRef>) -> Self {
        let id = PortId(self.builder.next_port);
        self.builder.next_port += 1;
        self.node.ports.push(Port {
            id,
            name: name.to_string(),
            kind,
            ty,
            default: None,
            coroutine: false,
            state_flow: false,
        });
        self
    }

    fn last_port(&mut self) -> Option<&mut Port> {
        self.node.ports.last_mut()
    }

    pub fn flow_in(self, name: &str) -> Self {
        self.port(name, PortKind::FlowInput, None)
    }

    /// Flow input that is coroutine-capable by itself
    pub fn coroutine_in(mut self, name: &str) -> Self {
        self = self.port(name, PortKind::FlowInput, None);
        if let Some(port) = self.last_port() {
            port.coroutine = true;
        }
        self
    }

    pub fn flow_out(self, name: &str) -> Self {
        self.port(name, PortKind::FlowOutput, None)
    }

    /// Flow output carrying a nested state flow
    pub fn state_flow_out(mut self, name: &str) -> Self {
        self = self.port(name, PortKind::FlowOutput, None);
        if let Some(port) = self.last_port() {
            port.state_flow = true;
        }
        self
    }

    pub fn value_in(self, name: &str, ty: TypeRef) -> Self {
        self.port(name, PortKind::ValueInput, Some(ty))
    }

    pub fn value_in_default(mut self, name: &str, ty: TypeRef, default: impl Into<Value>) -> Self {
        self = self.port(name, PortKind::ValueInput, Some(ty));
        let default = default.into();
        if let Some(port) = self.last_port() {
            port.default = Some(default);
        }
        self
    }

    pub fn value_out(self, name: &str, ty: TypeRef) -> Self {
        self.port(name, PortKind::ValueOutput, Some(ty))
    }

    pub fn property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.node.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn build(self) -> NodeId {
        let id = self.node.id;
        self.builder.graph.nodes.push(self.node);
        id
    }
}
