//! Shared fixtures for the scenario tests

#![allow(dead_code)]

use graphgen::graph::{ContainerId, GraphBuilder, GraphDescription, NodeId, ObjectId, TypeRef, Value};
use graphgen::{GeneratedOutput, GenerationOptions, GenerationRequest};

/// Routes generator logs to the test harness output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn generate(graph: GraphDescription, options: GenerationOptions) -> GeneratedOutput {
    GenerationRequest::new(vec![graph])
        .with_options(options)
        .generate()
        .expect("generation should succeed")
}

/// Statement node calling `method` on the class itself
pub fn call(builder: &mut GraphBuilder, container: ContainerId, method: &str) -> NodeId {
    builder
        .add_node(container, "invoke", method)
        .flow_in("in")
        .flow_out("out")
        .property("method", method)
        .build()
}

pub fn wait(builder: &mut GraphBuilder, title: &str) -> NodeId {
    let main = builder.main_graph();
    builder.add_node(main, "yield", title).flow_in("in").flow_out("out").build()
}

/// `Jump()` calling `PlaySound()` then `Animate()`
pub fn sequential_graph() -> GraphDescription {
    let mut builder = GraphBuilder::new("Player");
    let body = builder.add_function("Jump", TypeRef::void());
    let sequence = builder
        .add_node(body.container, "sequence", "Sequence")
        .flow_in("in")
        .flow_out("then0")
        .flow_out("then1")
        .build();
    let sound = call(&mut builder, body.container, "PlaySound");
    let animate = call(&mut builder, body.container, "Animate");
    builder
        .connect(body.entry, "body", sequence, "in")
        .connect(sequence, "then0", sound, "in")
        .connect(sequence, "then1", animate, "in");
    builder.build()
}

/// `Start` event running one or more waits in a row
pub fn waiting_graph(waits: usize) -> GraphDescription {
    let mut builder = GraphBuilder::new("Door");
    let start = builder.add_event("Start");
    let mut previous = (start, "out");
    for i in 0..waits {
        let node = wait(&mut builder, &format!("Wait{}", i));
        builder.connect(previous.0, previous.1, node, "in");
        previous = (node, "out");
    }
    builder.build()
}

/// `Count()` looping with a connected step while updating and logging a
/// class variable through value nodes
pub fn value_graph() -> GraphDescription {
    let mut builder = GraphBuilder::new("Counter");
    builder.add_variable("health", TypeRef::int(), Some(Value::Int(100)));
    let body = builder.add_function("Count", TypeRef::void());
    let container = body.container;

    let one = builder
        .add_node(container, "literal", "One")
        .value_out("result", TypeRef::int())
        .property("value", Value::Int(1))
        .build();
    let five = builder
        .add_node(container, "literal", "Five")
        .value_out("result", TypeRef::int())
        .property("value", Value::Int(5))
        .build();
    let for_node = builder
        .add_node(container, "for", "Loop")
        .flow_in("in")
        .value_in_default("start", TypeRef::int(), 0)
        .value_in_default("end", TypeRef::int(), 10)
        .value_in("step", TypeRef::int())
        .flow_out("body")
        .flow_out("next")
        .value_out("index", TypeRef::int())
        .build();
    let damage = builder
        .add_node(container, "operator", "Double")
        .value_in("a", TypeRef::int())
        .value_in_default("b", TypeRef::int(), 2)
        .value_out("result", TypeRef::int())
        .property("op", "*")
        .build();
    let hurt = builder
        .add_node(container, "set_variable", "Hurt")
        .flow_in("in")
        .value_in("value", TypeRef::int())
        .flow_out("out")
        .property("variable", "health")
        .property("op", "-")
        .build();
    let health = builder
        .add_node(container, "get_variable", "Health")
        .value_out("value", TypeRef::int())
        .property("variable", "health")
        .build();
    let log = builder
        .add_node(container, "invoke", "Log")
        .flow_in("in")
        .value_in("message", TypeRef::int())
        .flow_out("out")
        .property("method", "Log")
        .build();
    builder
        .connect(body.entry, "body", for_node, "in")
        .connect(one, "result", for_node, "step")
        .connect(for_node, "body", hurt, "in")
        .connect(five, "result", damage, "a")
        .connect(damage, "result", hurt, "value")
        .connect(hurt, "out", log, "in")
        .connect(health, "value", log, "message");
    builder.build()
}

/// `Toggle()` running a group that references host object 7, then `Notify()`
pub fn referenced_group_graph() -> GraphDescription {
    let mut builder = GraphBuilder::new("Lamp");
    let body = builder.add_function("Toggle", TypeRef::void());
    let group = builder.add_group(body.container, "Switch", Some(ObjectId(7)));
    let flip = call(&mut builder, group.container, "Flip");
    let after = call(&mut builder, body.container, "Notify");
    builder
        .connect(body.entry, "body", group.node, "in")
        .connect(group.entry, "out", flip, "in")
        .connect(group.node, "exit", after, "in");
    builder.build()
}

/// Id of the first node titled `title`
pub fn node_titled(graph: &GraphDescription, title: &str) -> NodeId {
    graph
        .nodes
        .iter()
        .find(|n| n.title == title)
        .map(|n| n.id)
        .expect("fixture node should exist")
}
