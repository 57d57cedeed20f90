//! # Generator Errors
//!
//! Error types shared by every stage of code generation.

use crate::graph::{NodeId, PortId};
use thiserror::Error;

/// Result alias used throughout the generator
pub type Result<T, E = GeneratorError> = std::result::Result<T, E>;

/// Errors produced while lowering a graph into source code
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Failure while generating the code for a specific node
    #[error("error generating node \"{title}\" (#{node}): {source}")]
    NodeGeneration {
        node: NodeId,
        title: String,
        #[source]
        source: Box<GeneratorError>,
    },

    /// A node's generator did something that is only legal in another phase
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Code was requested for a port that no node registered
    #[error("port '{port}' of node \"{title}\" (#{node}) has no registered generator")]
    UnregisteredPort {
        node: NodeId,
        title: String,
        port: String,
    },

    /// A registration call arrived after the initializer pass ended
    #[error("'{0}' can only be called while the generator is initializing")]
    RegistrationClosed(&'static str),

    /// No node generator is known for a node type
    #[error("unknown node type '{node_type}' on node #{node}")]
    UnknownNodeType { node: NodeId, node_type: String },

    #[error("node #{node} has no port named '{port}'")]
    MissingPort { node: NodeId, port: String },

    #[error("port #{0} does not exist in this graph")]
    UnknownPort(PortId),

    #[error("node #{0} does not exist in this graph")]
    MissingNode(NodeId),

    /// Missing or mistyped node property
    #[error("node #{node} is missing property '{property}'")]
    MissingProperty { node: NodeId, property: String },

    #[error("'yield' is not allowed in the current block")]
    YieldNotAllowed,

    /// A value output ended up depending on itself
    #[error("value port #{0} depends on itself")]
    CyclicValue(PortId),

    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl GeneratorError {
    /// Authoring errors point at a defect in a node's own generator. They are
    /// raised immediately in both synchronous and asynchronous mode.
    pub fn is_authoring_error(&self) -> bool {
        matches!(
            self,
            GeneratorError::InvalidOperation(_)
                | GeneratorError::UnregisteredPort { .. }
                | GeneratorError::RegistrationClosed(_)
                | GeneratorError::UnknownNodeType { .. }
        )
    }

    /// The node this error is attributed to, if any
    pub fn node(&self) -> Option<NodeId> {
        match self {
            GeneratorError::NodeGeneration { node, .. }
            | GeneratorError::UnregisteredPort { node, .. }
            | GeneratorError::UnknownNodeType { node, .. }
            | GeneratorError::MissingPort { node, .. }
            | GeneratorError::MissingProperty { node, .. } => Some(*node),
            GeneratorError::MissingNode(node) => Some(*node),
            _ => None,
        }
    }

    pub(crate) fn missing_property(node: NodeId, property: &str) -> Self {
        GeneratorError::MissingProperty {
            node,
            property: property.to_string(),
        }
    }

    pub(crate) fn missing_port(node: NodeId, port: &str) -> Self {
        GeneratorError::MissingPort {
            node,
            port: port.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authoring_errors_are_classified() {
        assert!(GeneratorError::RegistrationClosed("register_port").is_authoring_error());
        assert!(GeneratorError::InvalidOperation("x".into()).is_authoring_error());
        assert!(!GeneratorError::YieldNotAllowed.is_authoring_error());
    }

    #[test]
    fn node_generation_message_names_node() {
        let err = GeneratorError::NodeGeneration {
            node: NodeId(7),
            title: "Print".into(),
            source: Box::new(GeneratorError::YieldNotAllowed),
        };
        let message = err.to_string();
        assert!(message.contains("\"Print\" (#7)"));
        assert_eq!(err.node(), Some(NodeId(7)));
    }
}
