//! # Graph Compiler
//!
//! Main entry points for turning graphs into a compilation unit.
//!
//! A run is described by a [`GenerationRequest`] and driven by a
//! [`Generation`]. Only one run may be in flight per process: a run takes a
//! process-wide lock on its first successful tick and releases it when it
//! finishes or is dropped. Synchronous callers spin (yielding the thread)
//! until the lock is free; asynchronous callers call [`Generation::tick`]
//! from their frame loop and get `Poll::Pending` until the run is done.

use crate::codegen::CodeGenerator;
use crate::config::GenerationOptions;
use crate::error::{GeneratorError, Result};
use crate::graph::{GraphDescription, ObjectRef, TypeCatalog};
use crate::nodes::NodeLibrary;
use crate::output::{extract_informations, InformationRange, OutputBuilder};
use crate::queue::{WorkItem, WorkQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Poll;

static GENERATION_LOCK: AtomicBool = AtomicBool::new(false);

/// Held by the run that owns the process-wide generation lock
#[derive(Debug)]
struct GenerationLock;

impl GenerationLock {
    fn try_acquire() -> Option<Self> {
        GENERATION_LOCK
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| GenerationLock)
    }
}

impl Drop for GenerationLock {
    fn drop(&mut self) {
        GENERATION_LOCK.store(false, Ordering::Release);
    }
}

/// Everything one generation run needs
#[derive(Debug)]
pub struct GenerationRequest {
    pub graphs: Vec<GraphDescription>,
    pub options: GenerationOptions,
    pub catalog: TypeCatalog,
    pub library: NodeLibrary,
}

/// Result of a finished run
#[derive(Debug, Default)]
pub struct GeneratedOutput {
    /// The compilation unit, markers removed
    pub source: String,
    /// Node and reference ranges, when informations are enabled
    pub informations: Vec<InformationRange>,
    /// Node errors collected in asynchronous mode
    pub errors: Vec<GeneratorError>,
    /// Host objects that were hoisted into fields
    pub hoisted_objects: Vec<ObjectRef>,
}

impl GeneratedOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

type ProgressCallback<'r> = Box<dyn FnMut(f32, &str) + 'r>;

impl GenerationRequest {
    /// Request with default options, the standard type catalog and the
    /// built-in node library
    pub fn new(graphs: Vec<GraphDescription>) -> Self {
        Self {
            graphs,
            options: GenerationOptions::default(),
            catalog: TypeCatalog::standard(),
            library: NodeLibrary::standard(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_catalog(mut self, catalog: TypeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_library(mut self, library: NodeLibrary) -> Self {
        self.library = library;
        self
    }

    /// Prepares a run without taking the lock yet
    pub fn start(&self) -> Generation<'_> {
        Generation::new(self, None)
    }

    pub fn start_with_progress<'r>(&'r self, progress: impl FnMut(f32, &str) + 'r) -> Generation<'r> {
        Generation::new(self, Some(Box::new(progress)))
    }

    /// Runs to completion on the calling thread
    pub fn generate(&self) -> Result<GeneratedOutput> {
        self.start().run_to_completion()
    }

    pub fn generate_with_progress(&self, progress: impl FnMut(f32, &str)) -> Result<GeneratedOutput> {
        self.start_with_progress(progress).run_to_completion()
    }
}

/// One run in progress
pub struct Generation<'r> {
    request: &'r GenerationRequest,
    generator: CodeGenerator<'r>,
    queue: WorkQueue,
    output: OutputBuilder,
    lock: Option<GenerationLock>,
    progress: Option<ProgressCallback<'r>>,
    finished: bool,
}

impl<'r> Generation<'r> {
    fn new(request: &'r GenerationRequest, progress: Option<ProgressCallback<'r>>) -> Self {
        let mut queue = WorkQueue::new();
        for slot in 0..request.graphs.len() {
            queue.push_back(WorkItem::BeginClass(slot));
        }
        Self {
            request,
            generator: CodeGenerator::new(&request.options, &request.library, &request.catalog),
            queue,
            output: OutputBuilder::new(&request.options),
            lock: None,
            progress,
            finished: false,
        }
    }

    /// Whether this run currently owns the process-wide lock
    pub fn holds_lock(&self) -> bool {
        self.lock.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Does at most one quantum of work. Returns `Pending` while another run
    /// holds the lock or work remains.
    pub fn tick(&mut self) -> Poll<Result<GeneratedOutput>> {
        if self.finished {
            return Poll::Ready(Err(GeneratorError::InvalidOperation(
                "generation already finished".to_string(),
            )));
        }
        if self.lock.is_none() {
            match GenerationLock::try_acquire() {
                Some(lock) => {
                    tracing::info!("[QUEUE] Generation started: {} graphs", self.request.graphs.len());
                    self.lock = Some(lock);
                }
                None => return Poll::Pending,
            }
        }

        let quantum = self.request.options.quantum();
        let mut done = 0;
        while done < quantum {
            let Some(item) = self.queue.pop() else {
                break;
            };
            tracing::debug!("[QUEUE] {}", item);
            if let Err(e) = self.run(item) {
                tracing::error!("[QUEUE] Generation failed while {}: {}", item, e);
                self.finish();
                return Poll::Ready(Err(e));
            }
            if let Some(progress) = self.progress.as_mut() {
                progress(self.queue.progress(), &item.to_string());
            }
            done += 1;
        }

        if self.queue.is_empty() {
            let output = self.collect();
            self.finish();
            return Poll::Ready(Ok(output));
        }
        tracing::debug!("[QUEUE] {} items left after tick", self.queue.len());
        Poll::Pending
    }

    fn run_to_completion(mut self) -> Result<GeneratedOutput> {
        loop {
            match self.tick() {
                Poll::Ready(result) => return result,
                Poll::Pending if !self.holds_lock() => std::thread::yield_now(),
                Poll::Pending => {}
            }
        }
    }

    fn run(&mut self, item: WorkItem) -> Result<()> {
        let request: &'r GenerationRequest = self.request;
        let generator = &mut self.generator;
        match item {
            WorkItem::BeginClass(slot) => {
                let graph = request.graphs.get(slot).ok_or_else(|| {
                    GeneratorError::InvalidOperation(format!("no graph at index {}", slot))
                })?;
                let nodes = generator.begin_class(graph)?;

                let mut steps: Vec<WorkItem> = nodes.into_iter().map(WorkItem::InitializeNode).collect();
                steps.push(WorkItem::FinishInitialization);
                steps.push(WorkItem::GenerateMembers);
                steps.extend((0..graph.functions.len()).map(WorkItem::GenerateFunction));
                steps.push(WorkItem::GenerateEvents);
                steps.push(WorkItem::LowerStateFlows);
                steps.push(WorkItem::AssembleClass);
                self.queue.push_front_all(steps);
                Ok(())
            }
            WorkItem::InitializeNode(node) => {
                let result = generator.initialize_node(node);
                generator.absorb(result)
            }
            WorkItem::FinishInitialization => generator.finish_initialization(),
            WorkItem::GenerateMembers => {
                let result = generator.generate_members();
                generator.absorb(result)
            }
            WorkItem::GenerateFunction(slot) => {
                let result = generator.generate_function(slot);
                generator.absorb(result)
            }
            WorkItem::GenerateEvents => {
                let result = generator.generate_events();
                generator.absorb(result)
            }
            WorkItem::LowerStateFlows => {
                let result = generator.lower_state_flows();
                generator.absorb(result)
            }
            WorkItem::AssembleClass => {
                let class = generator.assemble_class()?;
                self.output.add_class(class);
                Ok(())
            }
        }
    }

    fn collect(&mut self) -> GeneratedOutput {
        self.output.add_usings(self.generator.usings());
        let source = self.output.build();
        let (source, informations) = if self.request.options.informations {
            extract_informations(&source)
        } else {
            (source, Vec::new())
        };
        let errors = self.generator.take_errors();
        if !errors.is_empty() {
            tracing::warn!("[QUEUE] Generation finished with {} errors", errors.len());
        }
        tracing::info!(
            "[QUEUE] Generation complete ({} bytes, {} ranges)",
            source.len(),
            informations.len()
        );
        GeneratedOutput {
            source,
            informations,
            errors,
            hoisted_objects: self.generator.take_hoisted(),
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.lock = None;
    }
}

/// Compile a single graph into a compilation unit
///
/// This is the simplest entry point: default options, the standard type
/// catalog and the built-in node library. Node errors abort the run.
///
/// # Examples
///
/// ```rust
/// use graphgen::compile_graph;
/// use graphgen::graph::{GraphBuilder, TypeRef};
///
/// let mut builder = GraphBuilder::new("Player");
/// builder.add_function("Jump", TypeRef::void());
/// let source = compile_graph(&builder.build()).unwrap();
/// assert!(source.contains("class Player"));
/// ```
pub fn compile_graph(graph: &GraphDescription) -> Result<String> {
    compile_graph_with_options(graph, GenerationOptions::default())
}

/// Compile a single graph with custom options
pub fn compile_graph_with_options(graph: &GraphDescription, options: GenerationOptions) -> Result<String> {
    tracing::info!(
        "[GEN] Compiling '{}' ({} nodes, {} connections)",
        graph.metadata.name,
        graph.nodes.len(),
        graph.connections.len()
    );
    let request = GenerationRequest::new(vec![graph.clone()]).with_options(options);
    let output = request.generate()?;
    Ok(output.source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, TypeRef};

    #[test]
    fn empty_request_produces_usings_only() {
        let output = GenerationRequest::new(Vec::new()).generate().unwrap();
        assert!(output.source.starts_with("using System;"));
        assert!(output.errors.is_empty());
    }

    #[test]
    fn finished_generation_cannot_tick_again() {
        let request = GenerationRequest::new(vec![GraphBuilder::new("A").build()]);
        let mut generation = request.start();
        let first = loop {
            if let Poll::Ready(result) = generation.tick() {
                break result;
            }
            std::thread::yield_now();
        };
        assert!(first.is_ok());
        assert!(!generation.holds_lock());
        assert!(matches!(
            generation.tick(),
            Poll::Ready(Err(GeneratorError::InvalidOperation(_)))
        ));
    }

    #[test]
    fn progress_reaches_completion() {
        let mut builder = GraphBuilder::new("Timer");
        builder.add_function("Reset", TypeRef::void());
        let request = GenerationRequest::new(vec![builder.build()]);

        let mut reports = Vec::new();
        request
            .generate_with_progress(|progress, step| reports.push((progress, step.to_string())))
            .unwrap();
        assert_eq!(reports.last().map(|(p, _)| *p), Some(1.0));
        assert!(reports.iter().any(|(_, step)| step == "assembling class"));
    }
}
