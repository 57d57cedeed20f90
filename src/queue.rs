//! # Work Queue
//!
//! Generation is split into small work items so asynchronous callers can
//! spread a run over many ticks. Items that discover more work (starting a
//! class reveals its nodes and members) push it to the front, which keeps
//! classes strictly sequential.

use crate::graph::NodeId;
use std::collections::VecDeque;
use std::fmt;

/// One unit of generation work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItem {
    /// Analyze the graph at this index of the request and queue its steps
    BeginClass(usize),
    InitializeNode(NodeId),
    FinishInitialization,
    GenerateMembers,
    GenerateFunction(usize),
    GenerateEvents,
    LowerStateFlows,
    AssembleClass,
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::BeginClass(slot) => write!(f, "analyzing graph {}", slot),
            WorkItem::InitializeNode(node) => write!(f, "initializing node #{}", node),
            WorkItem::FinishInitialization => write!(f, "finishing initialization"),
            WorkItem::GenerateMembers => write!(f, "generating members"),
            WorkItem::GenerateFunction(slot) => write!(f, "generating function {}", slot),
            WorkItem::GenerateEvents => write!(f, "generating events"),
            WorkItem::LowerStateFlows => write!(f, "lowering state flows"),
            WorkItem::AssembleClass => write!(f, "assembling class"),
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    items: VecDeque<WorkItem>,
    completed: usize,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, item: WorkItem) {
        self.items.push_back(item);
    }

    /// Queues `items` ahead of everything else, keeping their order
    pub fn push_front_all(&mut self, items: Vec<WorkItem>) {
        for item in items.into_iter().rev() {
            self.items.push_front(item);
        }
    }

    pub fn pop(&mut self) -> Option<WorkItem> {
        let item = self.items.pop_front()?;
        self.completed += 1;
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Share of the known work already taken, in `0.0..=1.0`. Starting a
    /// class adds work, so the value can move backwards.
    pub fn progress(&self) -> f32 {
        let total = self.completed + self.items.len();
        if total == 0 {
            1.0
        } else {
            self.completed as f32 / total as f32
        }
    }
}
