mod common;

use common::{call, generate, init_tracing};
use graphgen::codegen::records::{RecordKey, VariableSpec};
use graphgen::graph::{GraphBuilder, GraphDescription, NodeInstance, Port, TypeRef};
use graphgen::{CodeGenerator, GenerationOptions, GenerationRequest, GeneratorError, NodeGenerator, NodeLibrary};

/// `Hurt()` assigning to a class variable that does not exist
fn broken_assignment() -> (GraphDescription, u32) {
    let mut builder = GraphBuilder::new("Enemy");
    let body = builder.add_function("Hurt", TypeRef::void());
    let damage = builder
        .add_node(body.container, "set_variable", "Damage")
        .flow_in("in")
        .value_in_default("value", TypeRef::int(), 5)
        .flow_out("out")
        .property("variable", "health")
        .build();
    let log = call(&mut builder, body.container, "Log");
    builder
        .connect(body.entry, "body", damage, "in")
        .connect(damage, "out", log, "in");
    (builder.build(), damage.0)
}

fn request_with(graph: GraphDescription, node_type: &str, generator: impl NodeGenerator + 'static) -> GenerationRequest {
    let mut library = NodeLibrary::standard();
    library.register(node_type, generator);
    GenerationRequest::new(vec![graph]).with_library(library)
}

/// `Run()` flowing into a single node of type `node_type`
fn single_custom_node(node_type: &str) -> GraphDescription {
    let mut builder = GraphBuilder::new("Custom");
    let body = builder.add_function("Run", TypeRef::void());
    let node = builder
        .add_node(body.container, node_type, "Custom")
        .flow_in("in")
        .flow_out("out")
        .build();
    builder.connect(body.entry, "body", node, "in");
    builder.build()
}

#[test]
fn asynchronous_mode_collects_node_errors() {
    init_tracing();
    let (graph, damage) = broken_assignment();
    let options = GenerationOptions {
        asynchronous: true,
        ..GenerationOptions::default()
    };
    let output = generate(graph, options);

    let placeholder = format!("/* Error generating node \"Damage\" (#{}) */", damage);
    assert!(output.source.contains(&format!("public void Hurt() {{\n\t\t{}\n\t}}", placeholder)));
    assert!(output.has_errors());
    assert_eq!(output.errors.len(), 1);
    match &output.errors[0] {
        GeneratorError::NodeGeneration { title, source, .. } => {
            assert_eq!(title, "Damage");
            assert!(matches!(**source, GeneratorError::MissingProperty { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn synchronous_mode_aborts_on_node_errors() {
    init_tracing();
    let (graph, _) = broken_assignment();
    let result = GenerationRequest::new(vec![graph]).generate();
    assert!(matches!(result, Err(GeneratorError::NodeGeneration { .. })));
}

#[test]
fn unknown_node_types_abort_even_asynchronously() {
    init_tracing();
    let graph = single_custom_node("mystery");
    let options = GenerationOptions {
        asynchronous: true,
        ..GenerationOptions::default()
    };
    let result = GenerationRequest::new(vec![graph]).with_options(options).generate();
    assert!(matches!(result, Err(GeneratorError::UnknownNodeType { .. })));
}

/// Tries to add a `using` while generating code
struct LateUsing;

impl NodeGenerator for LateUsing {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, _node: &NodeInstance, _port: &Port) -> graphgen::Result<String> {
        gen.register_using("Game.Audio")?;
        Ok("Play();".to_string())
    }
}

#[test]
fn registration_after_initialization_is_rejected() {
    init_tracing();
    let mut request = request_with(single_custom_node("late_using"), "late_using", LateUsing);
    request.options.asynchronous = true;
    let result = request.generate();
    assert!(matches!(result, Err(GeneratorError::RegistrationClosed("register_using"))));
}

/// Registers nothing, so its ports cannot be generated
struct Unregistered;

impl NodeGenerator for Unregistered {
    fn on_generator_initialize(&self, _gen: &mut CodeGenerator<'_>, _node: &NodeInstance) -> graphgen::Result<()> {
        Ok(())
    }

    fn generate_port(&self, _gen: &mut CodeGenerator<'_>, _node: &NodeInstance, _port: &Port) -> graphgen::Result<String> {
        Ok("Never();".to_string())
    }
}

#[test]
fn unregistered_ports_are_authoring_errors() {
    init_tracing();
    let request = request_with(single_custom_node("silent"), "silent", Unregistered);
    match request.generate() {
        Err(GeneratorError::UnregisteredPort { title, port, .. }) => {
            assert_eq!(title, "Custom");
            assert_eq!(port, "in");
        }
        other => panic!("unexpected result: {:?}", other.map(|o| o.source)),
    }
}

/// Imports its namespace while initializing
struct AudioCall;

impl NodeGenerator for AudioCall {
    fn on_generator_initialize(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance) -> graphgen::Result<()> {
        gen.register_ports(node)?;
        gen.register_using("Game.Audio")
    }

    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> graphgen::Result<String> {
        let out = gen.optional_flow_output(node, "out")?;
        Ok(format!("Mixer.Play();\n{}", out).trim_end().to_string())
    }
}

#[test]
fn usings_registered_during_initialization_are_emitted() {
    init_tracing();
    let output = request_with(single_custom_node("audio"), "audio", AudioCall)
        .generate()
        .unwrap();
    assert!(output.source.contains("using Game.Audio;\n"));
    assert!(output.source.contains("public void Run() {\n\t\tMixer.Play();\n\t}"));
}

/// Increments a shared `counter` variable owned by whichever node asks first
struct Counter;

impl NodeGenerator for Counter {
    fn on_generator_initialize(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance) -> graphgen::Result<()> {
        gen.register_ports(node)?;
        let storage = gen.storage_for(node);
        gen.register_variable(
            RecordKey::Named("counter".to_string()),
            VariableSpec::new("counter", TypeRef::int(), storage),
        )?;
        Ok(())
    }

    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> graphgen::Result<String> {
        let name = gen
            .variable_name(&RecordKey::Named("counter".to_string()))
            .ok_or_else(|| GeneratorError::InvalidOperation("counter was never registered".to_string()))?;
        let out = gen.optional_flow_output(node, "out")?;
        Ok(format!("{}++;\n{}", name, out).trim_end().to_string())
    }
}

#[test]
fn shared_variable_is_declared_once_and_promoted() {
    init_tracing();
    let mut builder = GraphBuilder::new("Score");
    let body = builder.add_function("Add", TypeRef::void());
    let local_use = builder
        .add_node(body.container, "counter", "Count")
        .flow_in("in")
        .build();
    builder.connect(body.entry, "body", local_use, "in");

    let main = builder.main_graph();
    let update = builder.add_event("Update");
    let field_use = builder.add_node(main, "counter", "Count").flow_in("in").build();
    builder.connect(update, "out", field_use, "in");

    let output = request_with(builder.build(), "counter", Counter).generate().unwrap();
    let source = &output.source;

    assert_eq!(source.matches("int counter;").count(), 1);
    assert!(source.contains("\n\tint counter;\n"));
    assert!(source.contains("public void Add() {\n\t\tcounter++;\n\t}"));
    assert!(source.contains("void Update() {\n\t\tcounter++;\n\t}"));
}
