mod common;

use common::{init_tracing, sequential_graph, waiting_graph};
use graphgen::{GeneratedOutput, Generation, GenerationOptions, GenerationRequest};
use std::sync::Mutex;
use std::task::Poll;

// Every test here takes the process-wide generation lock
static SERIAL: Mutex<()> = Mutex::new(());

fn stepwise() -> GenerationOptions {
    GenerationOptions {
        asynchronous: true,
        max_queue: 1,
        ..GenerationOptions::default()
    }
}

fn finish(generation: &mut Generation<'_>) -> GeneratedOutput {
    loop {
        if let Poll::Ready(result) = generation.tick() {
            return result.unwrap();
        }
    }
}

#[test]
fn asynchronous_run_spreads_over_ticks() {
    init_tracing();
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());

    let graphs = vec![sequential_graph(), waiting_graph(2)];
    let request = GenerationRequest::new(graphs.clone()).with_options(stepwise());
    let mut generation = request.start();
    let mut ticks = 0;
    let output = loop {
        ticks += 1;
        if let Poll::Ready(result) = generation.tick() {
            break result.unwrap();
        }
        assert!(generation.holds_lock());
    };

    assert!(ticks > 10);
    assert!(generation.is_finished());
    assert!(!generation.holds_lock());

    let synchronous = GenerationRequest::new(graphs).generate().unwrap();
    assert_eq!(output.source, synchronous.source);
}

#[test]
fn second_run_waits_for_the_lock() {
    init_tracing();
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());

    let first = GenerationRequest::new(vec![sequential_graph()]).with_options(stepwise());
    let second = GenerationRequest::new(vec![waiting_graph(1)]).with_options(stepwise());

    let mut a = first.start();
    assert!(a.tick().is_pending());
    assert!(a.holds_lock());

    let mut b = second.start();
    assert!(b.tick().is_pending());
    assert!(!b.holds_lock());

    let output = finish(&mut a);
    assert!(output.source.contains("class Player"));
    assert!(!a.holds_lock());

    let output = finish(&mut b);
    assert!(output.source.contains("class Door"));
}

#[test]
fn dropping_a_run_releases_the_lock() {
    init_tracing();
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());

    let request = GenerationRequest::new(vec![sequential_graph()]).with_options(stepwise());
    {
        let mut abandoned = request.start();
        assert!(abandoned.tick().is_pending());
        assert!(abandoned.holds_lock());
    }

    let mut next = request.start();
    assert!(next.tick().is_pending());
    assert!(next.holds_lock());
    finish(&mut next);
}
