mod common;

use common::{call, generate, init_tracing, wait, waiting_graph};
use graphgen::graph::{GraphBuilder, TypeRef};
use graphgen::GenerationOptions;

#[test]
fn single_trailing_yield_becomes_a_lambda() {
    init_tracing();
    let output = generate(waiting_graph(1), GenerationOptions::default());
    let source = &output.source;

    assert!(source.contains("private EventCoroutine coroutine_Wait0 = new EventCoroutine();"));
    assert!(source.contains("void Start() {\n\t\tcoroutine_Wait0.Run();\n\t}"));
    assert!(source.contains("void Awake() {\n\t\tcoroutine_Wait0.Setup(this, () => {\n\t\t\treturn null;\n\t\t});\n\t}"));
    assert!(!source.contains("__ExecuteCoroutineEvent"));
    assert!(!source.contains("yield"));
}

#[test]
fn yield_before_more_work_is_dispatched() {
    init_tracing();
    let output = generate(waiting_graph(2), GenerationOptions::default());
    let source = &output.source;

    assert!(source.contains("private System.Collections.IEnumerator __ExecuteCoroutineEvent(int uid) {"));
    assert!(source.contains(
        "switch(uid) {\n\t\t\tcase 0: {\n\t\t\t\tyield return null;\n\t\t\t\tyield return coroutine_Wait1.Run();\n\t\t\t\tbreak;\n\t\t\t}\n\t\t}\n\t\tyield break;"
    ));
    assert!(source.contains("coroutine_Wait0.Setup(this, () => __ExecuteCoroutineEvent(0));"));
    assert!(source.contains("coroutine_Wait1.Setup(this, () => {\n\t\t\treturn null;\n\t\t});"));
    assert!(!source.contains("case 1:"));
}

#[test]
fn setup_runs_before_other_awake_code() {
    init_tracing();
    let mut builder = GraphBuilder::new("Door");
    let main = builder.main_graph();
    let start = builder.add_event("Start");
    let pause = wait(&mut builder, "Wait0");
    let awake = builder.add_event("Awake");
    let init = call(&mut builder, main, "Init");
    builder
        .connect(start, "out", pause, "in")
        .connect(awake, "out", init, "in");
    let output = generate(builder.build(), GenerationOptions::default());

    assert!(output
        .source
        .contains("void Awake() {\n\t\tcoroutine_Wait0.Setup(this, () => {\n\t\t\treturn null;\n\t\t});\n\t\tInit();\n\t}"));
}

#[test]
fn main_graph_cycle_is_split_into_state_entries() {
    init_tracing();
    let mut builder = GraphBuilder::new("Guard");
    let main = builder.main_graph();
    let update = builder.add_event("Update");
    let patrol = call(&mut builder, main, "Patrol");
    let rest = call(&mut builder, main, "Rest");
    builder
        .connect(update, "out", patrol, "in")
        .connect(patrol, "out", rest, "in")
        .connect(rest, "out", patrol, "in");
    let output = generate(builder.build(), GenerationOptions::default());
    let source = &output.source;

    assert!(source.contains("void Update() {\n\t\tcoroutine_Patrol.Run();\n\t}"));
    assert!(source.contains(
        "coroutine_Patrol.Setup(this, () => {\n\t\t\tPatrol();\n\t\t\treturn coroutine_Rest.Run();\n\t\t});"
    ));
    assert!(source.contains(
        "coroutine_Rest.Setup(this, () => {\n\t\t\tRest();\n\t\t\treturn coroutine_Patrol.Run();\n\t\t});"
    ));
    assert!(!source.contains("__ExecuteCoroutineEvent"));
}

#[test]
fn function_cycle_breaks_at_its_back_edge() {
    init_tracing();
    let mut builder = GraphBuilder::new("Looper");
    let body = builder.add_function("Run", TypeRef::void());
    let patrol = call(&mut builder, body.container, "Patrol");
    let rest = call(&mut builder, body.container, "Rest");
    builder
        .connect(body.entry, "body", patrol, "in")
        .connect(patrol, "out", rest, "in")
        .connect(rest, "out", patrol, "in");
    let output = generate(builder.build(), GenerationOptions::default());
    let source = &output.source;

    assert!(source.contains("public void Run() {\n\t\tcoroutine_Patrol.Run();\n\t}"));
    assert!(source.contains(
        "coroutine_Patrol.Setup(this, () => {\n\t\t\tPatrol();\n\t\t\tRest();\n\t\t\treturn coroutine_Patrol.Run();\n\t\t});"
    ));
    assert!(!source.contains("coroutine_Rest"));
}

#[test]
fn run_coroutine_installs_its_routine() {
    init_tracing();
    let mut builder = GraphBuilder::new("Wave");
    let main = builder.main_graph();
    let start = builder.add_event("Start");
    let spawn = builder
        .add_node(main, "invoke", "Spawn")
        .value_out("result", TypeRef::enumerator())
        .property("method", "Spawn")
        .build();
    let run = builder
        .add_node(main, "run_coroutine", "RunSpawn")
        .flow_in("in")
        .value_in("routine", TypeRef::enumerator())
        .flow_out("out")
        .build();
    let done = call(&mut builder, main, "Done");
    builder
        .connect(start, "out", run, "in")
        .connect(spawn, "result", run, "routine")
        .connect(run, "out", done, "in");
    let output = generate(builder.build(), GenerationOptions::default());

    assert!(output
        .source
        .contains("coroutine_RunSpawn.Setup(this, () => Spawn(), () => {\n\t\t\tDone();\n\t\t});"));
    assert!(output.source.contains("void Start() {\n\t\tcoroutine_RunSpawn.Run();\n\t}"));
}

#[test]
fn debug_mode_reports_finished_state_flows() {
    init_tracing();
    let mut options = GenerationOptions::default();
    options.debug.enabled = true;
    let graph = waiting_graph(1);
    let wait = graph.nodes.iter().find(|n| n.node_type == "yield").unwrap();
    let port = wait.port("in").unwrap().id;

    let output = generate(graph.clone(), options);
    let finished = format!("GraphDebug.Finished(this, \"Door\", {}, {});", wait.id, port);
    assert!(output.source.contains(&finished));
}
