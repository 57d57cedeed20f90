//! # Graph Code Generator
//!
//! Lowers node-and-port program graphs into the source of class-based,
//! curly-brace target code (`using` directives, namespaces, classes and
//! `IEnumerator` iterator methods).
//!
//! The generator provides:
//! - Two-pass generation: reachability and flow classification, then
//!   on-demand port generation with memoization
//! - Automatic lowering of graph cycles and coroutine nodes into a shared
//!   dispatch state machine
//! - Collision-free identifiers and minimal unambiguous type names
//! - Literal emission for arbitrary constant values
//! - Optional debug instrumentation and node-to-text range mapping
//!
//! ## Quick Start
//!
//! ```rust
//! use graphgen::compile_graph;
//! use graphgen::graph::{GraphBuilder, TypeRef};
//!
//! let mut builder = GraphBuilder::new("Player");
//! let body = builder.add_function("Jump", TypeRef::void());
//! let call = builder
//!     .add_node(body.container, "invoke", "Play Sound")
//!     .flow_in("in")
//!     .property("method", "PlaySound")
//!     .build();
//! builder.connect(body.entry, "body", call, "in");
//!
//! let source = compile_graph(&builder.build())?;
//! assert!(source.contains("PlaySound();"));
//! # Ok::<(), graphgen::GeneratorError>(())
//! ```
//!
//! ## Architecture
//!
//! Every graph becomes one class, generated in phases:
//!
//! 1. **Initialization** - Reachability, state classification and port
//!    registration ([`codegen::initializer`])
//! 2. **Generation** - Members, functions and event methods, demanded port by
//!    port through the registry ([`codegen`])
//! 3. **Lowering** - State entries become coroutine fields, lambdas and
//!    dispatch cases ([`codegen::lowering`])
//! 4. **Assembly** - Records become declarations ([`codegen::assembler`])
//! 5. **Output** - The compilation unit and marker ranges ([`output`])
//!
//! Runs go through [`GenerationRequest`], synchronously or tick by tick.

pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod output;
pub mod queue;

// Re-export the main compilation API
pub use compiler::{
    compile_graph, compile_graph_with_options, GeneratedOutput, Generation, GenerationRequest,
};

pub use codegen::CodeGenerator;
pub use config::{DebugOptions, GenerationOptions};
pub use error::{GeneratorError, Result};
pub use graph::{GraphBuilder, GraphDescription, TypeCatalog, TypeRef, Value};
pub use nodes::{NodeGenerator, NodeLibrary, StateExecution};
pub use output::{extract_informations, InformationRange, TextPosition};
