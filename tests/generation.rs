mod common;

use common::{call, generate, init_tracing, sequential_graph};
use graphgen::graph::{GraphBuilder, TypeRef};
use graphgen::{compile_graph, GenerationOptions, GenerationRequest};

#[test]
fn sequential_function_is_plain_code() {
    init_tracing();
    let output = generate(sequential_graph(), GenerationOptions::default());

    assert!(output.source.contains("public void Jump() {\n\t\tPlaySound();\n\t\tAnimate();\n\t}"));
    assert!(!output.source.contains("switch"));
    assert!(!output.source.contains("coroutine_"));
    assert!(!output.source.contains("__ExecuteCoroutineEvent"));
    assert!(output.errors.is_empty());
}

#[test]
fn regenerating_is_byte_identical() {
    init_tracing();
    let first = compile_graph(&sequential_graph()).unwrap();
    let second = compile_graph(&sequential_graph()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn compilation_unit_layout() {
    init_tracing();
    let options = GenerationOptions {
        namespace: Some("Game.Scripts".to_string()),
        headers: vec!["// <auto-generated/>".to_string()],
        ..GenerationOptions::default()
    };
    let output = generate(sequential_graph(), options);

    assert!(output.source.starts_with(
        "// <auto-generated/>\n\nusing System;\nusing System.Collections;\nusing System.Collections.Generic;\n\nnamespace Game.Scripts {\n\tpublic class Player {"
    ));
    assert!(output.source.ends_with("\t}\n}\n"));
}

#[test]
fn events_with_the_same_name_share_one_method() {
    init_tracing();
    let mut builder = GraphBuilder::new("Enemy");
    let main = builder.main_graph();
    let first = builder.add_event("Update");
    let second = builder.add_event("Update");
    let think = call(&mut builder, main, "Think");
    let move_to = call(&mut builder, main, "Move");
    builder
        .connect(first, "out", think, "in")
        .connect(second, "out", move_to, "in");
    let output = generate(builder.build(), GenerationOptions::default());

    assert_eq!(output.source.matches("void Update()").count(), 1);
    assert!(output.source.contains("void Update() {\n\t\tThink();\n\t\tMove();\n\t}"));
}

#[test]
fn usings_decide_type_qualification() {
    init_tracing();
    let mut builder = GraphBuilder::new("Spawner");
    builder.add_function("Spawn", TypeRef::enumerator());
    let graph = builder.build();

    // IEnumerator<T> is visible through System.Collections.Generic
    let ambiguous = generate(graph.clone(), GenerationOptions::default());
    assert!(ambiguous.source.contains("public System.Collections.IEnumerator Spawn()"));

    let options = GenerationOptions {
        usings: vec!["System".to_string(), "System.Collections".to_string()],
        ..GenerationOptions::default()
    };
    let clear = generate(graph, options);
    assert!(clear.source.contains("public IEnumerator Spawn()"));
    assert!(!clear.source.contains("using System.Collections.Generic;"));
}

#[test]
fn full_type_names_always_qualify() {
    init_tracing();
    let mut builder = GraphBuilder::new("Inventory");
    builder.add_variable(
        "items",
        TypeRef::generic("System.Collections.Generic", "List", vec![TypeRef::string()]),
        None,
    );
    let options = GenerationOptions {
        full_type_names: true,
        ..GenerationOptions::default()
    };
    let output = generate(builder.build(), options);
    assert!(output.source.contains("public System.Collections.Generic.List<string> items;"));
}

#[test]
fn debug_calls_precede_flow_statements() {
    init_tracing();
    let mut options = GenerationOptions::default();
    options.debug.enabled = true;
    let graph = sequential_graph();
    let sound = graph.nodes.iter().find(|n| n.title == "PlaySound").unwrap();
    let port = sound.port("in").unwrap().id;

    let output = generate(graph.clone(), options);
    let expected = format!("GraphDebug.Flow(this, \"Player\", {}, {});\n\t\tPlaySound();", sound.id, port);
    assert!(output.source.contains(&expected));
}

#[test]
fn node_comments_name_the_node() {
    init_tracing();
    let options = GenerationOptions {
        node_comments: true,
        ..GenerationOptions::default()
    };
    let output = generate(sequential_graph(), options);
    assert!(output.source.contains("// PlaySound\n\t\tPlaySound();"));
}

#[test]
fn several_graphs_share_one_unit() {
    init_tracing();
    let request = GenerationRequest::new(vec![sequential_graph(), GraphBuilder::new("Enemy").build()]);
    let output = request.generate().unwrap();

    let player = output.source.find("public class Player").unwrap();
    let enemy = output.source.find("public class Enemy").unwrap();
    assert!(player < enemy);
    assert_eq!(output.source.matches("using System;").count(), 1);
}
