mod common;

use common::{
    generate, init_tracing, node_titled, referenced_group_graph, sequential_graph, value_graph, waiting_graph,
};
use graphgen::codegen::debug::{MarkerId, MARKER_HEAD, MARKER_TAIL};
use graphgen::graph::{GraphDescription, ObjectId};
use graphgen::{extract_informations, CodeGenerator, GenerationOptions, NodeLibrary, TypeCatalog};

fn with_informations() -> GenerationOptions {
    GenerationOptions {
        informations: true,
        ..GenerationOptions::default()
    }
}

fn assert_round_trip(name: &str, graph: GraphDescription) {
    let plain = generate(graph.clone(), GenerationOptions::default());
    let marked = generate(graph, with_informations());

    assert_eq!(plain.source, marked.source, "markers changed the code of {}", name);
    assert!(plain.informations.is_empty());
    assert!(!marked.informations.is_empty(), "{} produced no ranges", name);
    assert!(!marked.source.contains(MARKER_HEAD) && !marked.source.contains(MARKER_TAIL));
}

#[test]
fn markers_leave_the_text_unchanged() {
    init_tracing();
    let graphs = [
        ("sequential", sequential_graph()),
        ("one wait", waiting_graph(1)),
        ("three waits", waiting_graph(3)),
        ("value nodes", value_graph()),
        ("referenced group", referenced_group_graph()),
    ];
    for (name, graph) in graphs {
        assert_round_trip(name, graph);
    }
}

#[test]
fn connected_unit_step_still_increments() {
    init_tracing();
    let output = generate(value_graph(), with_informations());
    assert!(output.source.contains(
        "for(index = 0; index < 10; index++) {\n\t\t\thealth -= 5 * 2;\n\t\t\tLog(health);\n\t\t}"
    ));

    let step = output
        .informations
        .iter()
        .find(|r| r.id == MarkerId::Node(node_titled(&value_graph(), "One")));
    assert!(step.is_some());
}

#[test]
fn node_range_covers_its_statement() {
    init_tracing();
    let graph = sequential_graph();
    let sound = graph.nodes.iter().find(|n| n.title == "PlaySound").unwrap().id;
    let output = generate(graph, with_informations());

    let range = output
        .informations
        .iter()
        .find(|r| r.id == MarkerId::Node(sound))
        .expect("PlaySound should have a range");
    assert_eq!(range.start.line, range.end.line);

    let line: Vec<char> = output.source.split('\n').nth(range.start.line).unwrap().chars().collect();
    let covered: String = line[range.start.column..range.end.column].iter().collect();
    assert_eq!(covered, "PlaySound();");
    assert_eq!(range.owner, None);
}

#[test]
fn every_marker_becomes_a_range() {
    init_tracing();
    let graph = sequential_graph();
    let catalog = TypeCatalog::standard();
    let library = NodeLibrary::standard();

    let options = with_informations();
    let raw = CodeGenerator::new(&options, &library, &catalog)
        .generate_class(&graph)
        .unwrap();
    let plain_options = GenerationOptions::default();
    let plain = CodeGenerator::new(&plain_options, &library, &catalog)
        .generate_class(&graph)
        .unwrap();

    let (clean, ranges) = extract_informations(&raw);
    assert_eq!(raw.matches(MARKER_HEAD).count(), ranges.len());
    assert_eq!(clean, plain);
}

#[test]
fn referenced_group_owns_its_nodes() {
    init_tracing();
    let graph = referenced_group_graph();
    let flip = node_titled(&graph, "Flip");
    let after = node_titled(&graph, "Notify");
    let output = generate(graph, with_informations());

    let reference = output
        .informations
        .iter()
        .find(|r| r.id == MarkerId::Reference(ObjectId(7)))
        .expect("group reference should have a range");
    let inner = output
        .informations
        .iter()
        .find(|r| r.id == MarkerId::Node(flip))
        .unwrap();
    let outer = output
        .informations
        .iter()
        .find(|r| r.id == MarkerId::Node(after))
        .unwrap();

    assert!(reference.start <= inner.start && inner.end <= reference.end);
    assert_eq!(inner.owner, Some(ObjectId(7)));
    assert_eq!(outer.owner, None);
}
