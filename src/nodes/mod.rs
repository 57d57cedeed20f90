//! # Node Generators
//!
//! Each node type is handled by a `NodeGenerator`. The `NodeLibrary` maps
//! node type strings to generators and comes pre-populated with the
//! built-in flow and data nodes; hosts register their own on top.

use crate::codegen::CodeGenerator;
use crate::error::Result;
use crate::graph::{NodeInstance, Port};
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod data;
pub mod flow;

/// Custom installation of a state entry, bypassing the default lowering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateExecution {
    /// Expression passed to the coroutine's `Setup`
    pub factory: String,
    /// Body of the callback run when the state flow stops
    pub on_stop: Option<String>,
}

/// Code generation behaviour of one node type
pub trait NodeGenerator: Send + Sync {
    /// Called once per reachable node before any code is generated. The
    /// default registers every flow input and value output.
    fn on_generator_initialize(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance) -> Result<()> {
        gen.register_ports(node)
    }

    /// Code for one of the node's registered ports: statements for a flow
    /// input, an expression for a value output.
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, port: &Port) -> Result<String>;

    /// Event nodes emit their method code here
    fn generate_event_code(&self, _gen: &mut CodeGenerator<'_>, _node: &NodeInstance) -> Result<()> {
        Ok(())
    }

    /// Event nodes are entry points of the main graph
    fn is_event(&self) -> bool {
        false
    }

    /// Coroutine nodes suspend execution and force state lowering
    fn is_coroutine(&self, _node: &NodeInstance) -> bool {
        false
    }

    /// Custom state installation for a state entry of this node
    fn state_execution(
        &self,
        _gen: &mut CodeGenerator<'_>,
        _node: &NodeInstance,
        _port: &Port,
    ) -> Result<Option<StateExecution>> {
        Ok(None)
    }
}

/// Node type → generator
#[derive(Clone, Default)]
pub struct NodeLibrary {
    generators: BTreeMap<String, Arc<dyn NodeGenerator>>,
}

impl NodeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with every built-in node type
    pub fn standard() -> Self {
        let mut library = Self::new();
        flow::register(&mut library);
        data::register(&mut library);
        tracing::debug!("[NODES] Standard library with {} node types", library.len());
        library
    }

    /// Adds or replaces the generator for `node_type`
    pub fn register(&mut self, node_type: &str, generator: impl NodeGenerator + 'static) -> &mut Self {
        self.generators.insert(node_type.to_string(), Arc::new(generator));
        self
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeGenerator>> {
        self.generators.get(node_type).cloned()
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.generators.contains_key(node_type)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl std::fmt::Debug for NodeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeLibrary")
            .field("node_types", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_library_has_builtin_nodes() {
        let library = NodeLibrary::standard();
        for node_type in [
            "entry", "event", "sequence", "branch", "switch", "for", "foreach", "while", "return", "yield",
            "run_coroutine", "group", "group_entry", "group_exit", "literal", "operator", "get_variable",
            "set_variable", "get_local", "set_local", "parameter", "self", "object_ref", "invoke", "lambda",
            "new_object", "assign",
        ] {
            assert!(library.contains(node_type), "missing node type '{}'", node_type);
        }
        assert!(library.get("event").unwrap().is_event());
        assert!(!library.get("sequence").unwrap().is_event());
    }
}
