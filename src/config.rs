//! # Generation Options
//!
//! The configuration surface of a generation request. Options are plain
//! serde data so hosts can keep them in project settings files.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Options recognized by the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Namespace wrapping every generated class, if any
    pub namespace: Option<String>,

    /// Namespaces imported with `using` directives
    pub usings: Vec<String>,

    /// Always emit fully qualified type names
    pub full_type_names: bool,

    /// Lines emitted verbatim at the top of the compilation unit
    pub headers: Vec<String>,

    /// Prefix each flow statement with a `// <node title>` comment
    pub node_comments: bool,

    /// Debug instrumentation weaving
    pub debug: DebugOptions,

    /// Bracket node-attributable text with informational markers and
    /// return the extracted ranges with the output
    pub informations: bool,

    /// Collect node errors instead of aborting the run
    pub asynchronous: bool,

    /// Maximum number of work items drained per tick in asynchronous mode
    pub max_queue: usize,

    /// Runtime type backing every state-flow coroutine field
    pub coroutine_type: String,

    /// Method receiving the coroutine setup statements
    pub setup_method: String,

    /// Conversion call used for values typed as runtime-only types
    pub runtime_convert: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            usings: vec![
                "System".to_string(),
                "System.Collections".to_string(),
                "System.Collections.Generic".to_string(),
            ],
            full_type_names: false,
            headers: Vec::new(),
            node_comments: false,
            debug: DebugOptions::default(),
            informations: false,
            asynchronous: false,
            max_queue: 16,
            coroutine_type: "EventCoroutine".to_string(),
            setup_method: "Awake".to_string(),
            runtime_convert: "GraphRuntime.Convert".to_string(),
        }
    }
}

impl GenerationOptions {
    /// Parse options from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Effective per-tick quantum, never zero
    pub fn quantum(&self) -> usize {
        if self.asynchronous {
            self.max_queue.max(1)
        } else {
            usize::MAX
        }
    }
}

/// Runtime debug API weaving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOptions {
    pub enabled: bool,

    /// Wrap debug calls in `#if <symbol>` blocks
    pub symbol: Option<String>,

    /// Static class exposing `Flow`, `Value` and `Finished`
    pub api: String,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            symbol: None,
            api: "GraphDebug".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options = GenerationOptions::from_json(
            r#"{ "namespace": "Game.Scripts", "debug": { "enabled": true } }"#,
        )
        .unwrap();

        assert_eq!(options.namespace.as_deref(), Some("Game.Scripts"));
        assert!(options.debug.enabled);
        assert_eq!(options.debug.api, "GraphDebug");
        assert_eq!(options.max_queue, 16);
        assert!(options.usings.contains(&"System".to_string()));
    }

    #[test]
    fn quantum_is_unbounded_when_synchronous() {
        let mut options = GenerationOptions::default();
        assert_eq!(options.quantum(), usize::MAX);

        options.asynchronous = true;
        options.max_queue = 0;
        assert_eq!(options.quantum(), 1);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = GenerationOptions::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::GeneratorError::Config(_)));
    }
}
