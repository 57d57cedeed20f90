//! # Code Generation
//!
//! The `CodeGenerator` is one generation session. It owns the run-level
//! state (options, type names, collected errors) and a `ClassScope` holding
//! everything about the class currently being generated. Node generators
//! talk to it through the registration calls (initialization only) and the
//! generation calls (`generate_port`, `flow_output`, `value_input`, ...).
//!
//! A class goes through these steps, in order:
//!
//! 1. `begin_class`: reachability and state classification
//! 2. `initialize_node` for every reachable node
//! 3. `finish_initialization`: registration closes
//! 4. `generate_members`, `generate_function`, `generate_events`
//! 5. `lower_state_flows`
//! 6. `assemble_class`

pub mod assembler;
pub mod debug;
pub mod initializer;
pub mod lowering;
pub mod naming;
pub mod records;
pub mod registry;
pub mod state;
pub mod statements;
pub mod type_namer;
pub mod values;

use crate::config::GenerationOptions;
use crate::error::{GeneratorError, Result};
use crate::graph::{
    ContainerId, GraphDescription, GraphIndex, NodeId, NodeInstance, ObjectRef, Port, PortId, PortKind,
    TypeCatalog, TypeRef, Value,
};
use crate::nodes::{NodeGenerator, NodeLibrary};
use debug::{wrap_with_marker, DebugWeaver, MarkerId};
use initializer::Classification;
use naming::{sanitize, NameAllocator};
use records::{
    ConstructorRecord, CoroutineTable, EventIdMap, MethodSpec, MethodTable, PropertyRecord, RecordKey, Storage,
    VariableSpec, VariableTable,
};
use registry::PortRegistry;
use state::{BlockKind, ExprContext, GeneratorState};
use std::sync::Arc;
use type_namer::TypeNamer;

/// Where a class is in its generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Initializing,
    Generating,
}

/// Everything that belongs to the class being generated
pub(crate) struct ClassScope<'a> {
    pub graph: &'a GraphDescription,
    pub index: GraphIndex<'a>,
    pub phase: Phase,
    pub state: GeneratorState,
    pub classification: Classification,
    pub registry: PortRegistry,
    pub names: NameAllocator,
    pub variables: VariableTable,
    pub methods: MethodTable,
    pub properties: Vec<PropertyRecord>,
    pub constructors: Vec<ConstructorRecord>,
    pub coroutines: CoroutineTable,
    pub event_ids: EventIdMap,
    /// Dispatch cases by event id
    pub dispatch: Vec<(usize, String)>,
    pub debug: Option<DebugWeaver>,
    /// Node whose initialization hook is running
    pub initializing: Option<(NodeId, Arc<dyn NodeGenerator>)>,
}

impl<'a> ClassScope<'a> {
    pub fn new(graph: &'a GraphDescription, options: &GenerationOptions) -> Self {
        let class_name = sanitize(&graph.metadata.name);
        let mut state = GeneratorState::for_class(&class_name);
        state.is_static = graph.modifiers.is_static;

        let mut names = NameAllocator::new();
        names.reserve(&class_name);
        names.reserve(lowering::DISPATCH_METHOD);
        names.reserve(&options.setup_method);
        for property in &graph.properties {
            names.reserve(&property.name);
        }
        for function in &graph.functions {
            names.reserve(&function.name);
        }

        Self {
            graph,
            index: GraphIndex::build(graph),
            phase: Phase::Idle,
            state,
            classification: Classification::default(),
            registry: PortRegistry::default(),
            names,
            variables: VariableTable::default(),
            methods: MethodTable::default(),
            properties: Vec::new(),
            constructors: Vec::new(),
            coroutines: CoroutineTable::default(),
            event_ids: EventIdMap::default(),
            dispatch: Vec::new(),
            debug: options
                .debug
                .enabled
                .then(|| DebugWeaver::new(&options.debug, graph.uid())),
            initializing: None,
        }
    }

    /// Placeholder scope used between classes
    pub fn empty(options: &GenerationOptions) -> Self {
        Self::new(GraphDescription::empty(), options)
    }
}

/// Attributes an error to `node`, keeping the innermost attribution and
/// leaving authoring errors untouched.
pub(crate) fn wrap_node_error(node: &NodeInstance, error: GeneratorError) -> GeneratorError {
    if error.is_authoring_error() || matches!(error, GeneratorError::NodeGeneration { .. }) {
        return error;
    }
    GeneratorError::NodeGeneration {
        node: node.id,
        title: node.display_title().to_string(),
        source: Box::new(error),
    }
}

/// One generation session
pub struct CodeGenerator<'a> {
    options: &'a GenerationOptions,
    library: &'a NodeLibrary,
    types: TypeNamer<'a>,
    errors: Vec<GeneratorError>,
    has_error: bool,
    hoisted: Vec<ObjectRef>,
    pub(crate) class: ClassScope<'a>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(options: &'a GenerationOptions, library: &'a NodeLibrary, catalog: &'a TypeCatalog) -> Self {
        Self {
            options,
            library,
            types: TypeNamer::new(catalog, &options.usings, options.full_type_names),
            errors: Vec::new(),
            has_error: false,
            hoisted: Vec::new(),
            class: ClassScope::empty(options),
        }
    }

    pub fn options(&self) -> &'a GenerationOptions {
        self.options
    }

    pub fn library(&self) -> &'a NodeLibrary {
        self.library
    }

    pub fn phase(&self) -> Phase {
        self.class.phase
    }

    pub fn graph(&self) -> &'a GraphDescription {
        self.class.graph
    }

    pub fn index(&self) -> &GraphIndex<'a> {
        &self.class.index
    }

    pub fn node(&self, id: NodeId) -> Result<&'a NodeInstance> {
        self.class.index.node(id).ok_or(GeneratorError::MissingNode(id))
    }

    /// Imported namespaces, sorted
    pub fn usings(&self) -> Vec<String> {
        self.types.usings().cloned().collect()
    }

    pub fn errors(&self) -> &[GeneratorError] {
        &self.errors
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub(crate) fn take_errors(&mut self) -> Vec<GeneratorError> {
        std::mem::take(&mut self.errors)
    }

    pub(crate) fn take_hoisted(&mut self) -> Vec<ObjectRef> {
        std::mem::take(&mut self.hoisted)
    }

    // ------- Registration (initialization only) -------

    fn ensure_initializing(&self, operation: &'static str) -> Result<()> {
        if self.class.phase == Phase::Initializing {
            Ok(())
        } else {
            Err(GeneratorError::RegistrationClosed(operation))
        }
    }

    /// Registers `port` to be generated by the node currently initializing
    pub fn register_port(&mut self, port: PortId) -> Result<()> {
        self.ensure_initializing("register_port")?;
        let (node, generator) = self.class.initializing.clone().ok_or_else(|| {
            GeneratorError::InvalidOperation("register_port called outside of a node initializer".to_string())
        })?;
        self.class.registry.register(port, node, generator);
        Ok(())
    }

    /// Registers `port` with an explicit generator
    pub fn register_port_with(&mut self, port: PortId, generator: Arc<dyn NodeGenerator>) -> Result<()> {
        self.ensure_initializing("register_port")?;
        let (node, _) = self.class.index.port(port).ok_or(GeneratorError::UnknownPort(port))?;
        self.class.registry.register(port, node.id, generator);
        Ok(())
    }

    /// Registers every flow input and value output of `node`
    pub fn register_ports(&mut self, node: &NodeInstance) -> Result<()> {
        for port in &node.ports {
            if matches!(port.kind, PortKind::FlowInput | PortKind::ValueOutput) {
                self.register_port(port.id)?;
            }
        }
        Ok(())
    }

    /// Declares a variable owned by `key` and returns its name. Registering
    /// the same key again returns the same name and may promote its storage.
    pub fn register_variable(&mut self, key: RecordKey, spec: VariableSpec) -> Result<String> {
        self.ensure_initializing("register_variable")?;
        let record = self.class.variables.register(key, spec, &mut self.class.names);
        Ok(record.name.clone())
    }

    /// Forces a flow input to be lowered as a state entry
    pub fn register_as_state_flow(&mut self, port: PortId) -> Result<()> {
        self.ensure_initializing("register_as_state_flow")?;
        if self.class.classification.promote(port) {
            tracing::debug!("[INIT] Port #{} promoted to a state entry", port);
        }
        Ok(())
    }

    pub fn register_using(&mut self, namespace: &str) -> Result<()> {
        self.ensure_initializing("register_using")?;
        self.types.register_using(namespace);
        Ok(())
    }

    /// Storage for a variable owned by `node`: a field when the node runs in
    /// a state body or the main graph, otherwise a local of its method.
    pub fn storage_for(&self, node: &NodeInstance) -> Storage {
        if self.class.classification.is_state_node(node.id) {
            Storage::Instance
        } else {
            self.container_storage(node.container)
        }
    }

    // ------- Generation -------

    /// Code for a flow input or value output
    pub fn generate_port(&mut self, port: PortId) -> Result<String> {
        let (node, port_ref) = self.class.index.port(port).ok_or(GeneratorError::UnknownPort(port))?;
        match port_ref.kind {
            PortKind::FlowInput => {
                if let Some(code) = self.class.registry.cached(port) {
                    return Ok(code.to_string());
                }
                if !self.class.registry.enter(port) {
                    return Err(GeneratorError::InvalidOperation(format!(
                        "flow port #{} re-entered while generating it",
                        port
                    )));
                }
                let raw = self.invoke_port(node, port_ref);
                self.class.registry.leave(port);
                let code = self.decorate_flow(node, port_ref, raw?);
                self.class.registry.remember(port, &code);
                Ok(code)
            }
            PortKind::ValueOutput => {
                if !self.class.registry.enter(port) {
                    return Err(GeneratorError::CyclicValue(port));
                }
                let raw = self.invoke_port(node, port_ref);
                self.class.registry.leave(port);
                Ok(self.decorate_value(node, port_ref, raw?))
            }
            PortKind::FlowOutput | PortKind::ValueInput => Err(GeneratorError::InvalidOperation(format!(
                "port '{}' of node #{} is not a generated port",
                port_ref.name, node.id
            ))),
        }
    }

    fn invoke_port(&mut self, node: &'a NodeInstance, port: &'a Port) -> Result<String> {
        let registration = self
            .class
            .registry
            .registration(port.id)
            .ok_or_else(|| GeneratorError::UnregisteredPort {
                node: node.id,
                title: node.display_title().to_string(),
                port: port.name.clone(),
            })?;
        tracing::debug!("[GEN] Port '{}' of \"{}\" (#{})", port.name, node.display_title(), node.id);
        match registration.generator.generate_port(self, node, port) {
            Ok(code) => Ok(code),
            Err(e) => {
                let placeholder = statements::block_comment(&format!(
                    "Error generating node \"{}\" (#{})",
                    node.display_title(),
                    node.id
                ));
                self.recover(node, wrap_node_error(node, e), placeholder)
            }
        }
    }

    /// In asynchronous mode node errors are collected and `fallback` is used
    /// in place of the failed code; otherwise the error propagates.
    pub(crate) fn recover<T>(&mut self, node: &NodeInstance, error: GeneratorError, fallback: T) -> Result<T> {
        if !self.options.asynchronous || error.is_authoring_error() {
            return Err(error);
        }
        if !self.has_error {
            tracing::error!("[GEN] Errors while generating class '{}'", self.class.state.class_name);
            self.has_error = true;
        }
        tracing::warn!("[GEN] Node \"{}\" (#{}): {}", node.display_title(), node.id, error);
        self.errors.push(error);
        Ok(fallback)
    }

    /// Collects a failed step in asynchronous mode
    pub(crate) fn absorb(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Err(error) if self.options.asynchronous && !error.is_authoring_error() => {
                if !self.has_error {
                    tracing::error!("[GEN] Errors while generating class '{}'", self.class.state.class_name);
                    self.has_error = true;
                }
                tracing::warn!("[GEN] {}", error);
                self.errors.push(error);
                Ok(())
            }
            other => other,
        }
    }

    fn decorate_flow(&mut self, node: &NodeInstance, port: &Port, code: String) -> String {
        if code.trim().is_empty() {
            return code;
        }
        let mut parts = Vec::with_capacity(3);
        if self.options.node_comments {
            parts.push(statements::comment(node.display_title()));
        }
        if let Some(debug) = &self.class.debug {
            parts.push(debug.flow(self.class.state.owner_expression(), node.id, port.id));
        }
        parts.push(code);
        self.mark(MarkerId::Node(node.id), &statements::flow(&parts))
    }

    fn decorate_value(&mut self, node: &NodeInstance, port: &Port, code: String) -> String {
        let code = match &self.class.debug {
            Some(debug) if !self.class.state.is_set_context() => {
                debug.value(self.class.state.owner_expression(), node.id, port.id, &code)
            }
            _ => code,
        };
        self.mark(MarkerId::Node(node.id), &code)
    }

    /// Brackets `text` with markers when informations are enabled
    pub fn mark(&self, id: MarkerId, text: &str) -> String {
        if self.options.informations {
            wrap_with_marker(id, text)
        } else {
            text.to_string()
        }
    }

    /// Code for the flow leaving `node` through the output named `name`
    pub fn flow_output(&mut self, node: &NodeInstance, name: &str) -> Result<String> {
        let port = node
            .port(name)
            .ok_or_else(|| GeneratorError::missing_port(node.id, name))?;
        let index = &self.class.index;
        let targets = index.targets(port.id).to_vec();
        let mut parts = Vec::with_capacity(targets.len());
        for target in targets {
            parts.push(self.flow_to(target)?);
        }
        Ok(statements::flow(&parts))
    }

    /// Like `flow_output`, but an absent port yields no code
    pub fn optional_flow_output(&mut self, node: &NodeInstance, name: &str) -> Result<String> {
        if node.port(name).is_some() {
            self.flow_output(node, name)
        } else {
            Ok(String::new())
        }
    }

    /// Flow into `target`: inline code for regular ports, a jump for state
    /// entries
    pub fn flow_to(&mut self, target: PortId) -> Result<String> {
        if self.class.classification.is_state_port(target) {
            return self.state_jump(target);
        }
        self.generate_port(target)
    }

    /// Expression for the value input `name`: the connected output, the
    /// port default, or `default(T)`
    pub fn value_input(&mut self, node: &NodeInstance, name: &str) -> Result<String> {
        let port = node
            .port(name)
            .ok_or_else(|| GeneratorError::missing_port(node.id, name))?;
        if let Some(source) = self.class.index.source(port.id) {
            return self.generate_port(source);
        }
        match (&port.default, &port.ty) {
            (Some(value), Some(ty)) if ty.is_runtime() && !matches!(value, Value::Runtime { .. }) => {
                self.value(&Value::Runtime {
                    ty: ty.clone(),
                    value: Box::new(value.clone()),
                })
            }
            (Some(value), _) => self.value(value),
            (None, Some(ty)) => Ok(format!("default({})", self.type_name(ty))),
            (None, None) => Ok("null".to_string()),
        }
    }

    /// `value_input` evaluated as an assignment target
    pub fn value_input_target(&mut self, node: &NodeInstance, name: &str) -> Result<String> {
        self.with_context(ExprContext::Set, |g| g.value_input(node, name))
    }

    pub fn is_connected(&self, node: &NodeInstance, name: &str) -> bool {
        node.port(name)
            .map(|p| self.class.index.is_connected(p.id))
            .unwrap_or(false)
    }

    pub fn with_context<T>(&mut self, context: ExprContext, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.class.state.push_context(context);
        let result = f(self);
        self.class.state.pop_context();
        result
    }

    /// Runs `f` inside a new block scope
    pub fn in_block<T>(
        &mut self,
        kind: BlockKind,
        allow_yield: bool,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.class.state.push_block(kind, allow_yield);
        let result = f(self);
        self.class.state.pop_block();
        result
    }

    pub fn allow_yield(&self) -> bool {
        self.class.state.allow_yield()
    }

    pub fn is_state_flow(&self, port: PortId) -> bool {
        self.class.classification.is_state_port(port)
    }

    /// True while state bodies are being generated
    pub fn is_in_state_body(&self) -> bool {
        self.class.registry.is_ungrouped()
    }

    pub fn owner_expression(&self) -> &'static str {
        self.class.state.owner_expression()
    }

    pub fn type_name(&mut self, ty: &TypeRef) -> String {
        self.types.name(ty)
    }

    pub fn variable_name(&self, key: &RecordKey) -> Option<String> {
        self.class.variables.get(key).map(|r| r.name.clone())
    }

    /// A fresh identifier, unique within the class
    pub fn generate_name(&mut self, base: &str) -> String {
        self.class.names.generate(base)
    }

    /// A stable identifier owned by `key`
    pub fn name_for(&mut self, key: &RecordKey, base: &str) -> String {
        self.class.names.name_for(key, base)
    }

    /// Appends `code` to the method described by `spec`, creating the
    /// method on first use. Fragments are ordered by `priority`.
    pub fn insert_method_code(&mut self, spec: &MethodSpec, code: String, priority: i32) -> Result<()> {
        self.class.methods.get_or_create(spec)?.add_fragment(code, priority);
        Ok(())
    }

    /// The method container that code of `container` is emitted into
    pub fn method_container(&self, container: ContainerId) -> ContainerId {
        initializer::root_container(&self.class.index, container)
    }
}
