//! # Output Builder
//!
//! Joins generated classes into one compilation unit and turns the
//! informational markers woven into the text back into line/column ranges.

use crate::codegen::debug::{MarkerId, MARKER_END, MARKER_HEAD, MARKER_TAIL};
use crate::codegen::statements;
use crate::config::GenerationOptions;
use crate::graph::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Position in the final text. Lines and columns are 0-based; columns count
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl TextPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Span of text produced for one node or external reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationRange {
    pub id: MarkerId,
    pub start: TextPosition,
    /// Exclusive end
    pub end: TextPosition,
    /// Innermost external reference enclosing a node range
    pub owner: Option<ObjectId>,
}

impl InformationRange {
    fn encloses(&self, other: &InformationRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Assembles the compilation unit
#[derive(Debug, Default)]
pub struct OutputBuilder {
    headers: Vec<String>,
    usings: BTreeSet<String>,
    namespace: Option<String>,
    classes: Vec<String>,
}

impl OutputBuilder {
    pub fn new(options: &GenerationOptions) -> Self {
        Self {
            headers: options.headers.clone(),
            usings: BTreeSet::new(),
            namespace: options.namespace.clone().filter(|n| !n.trim().is_empty()),
            classes: Vec::new(),
        }
    }

    pub fn add_usings<I, S>(&mut self, usings: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.usings.extend(usings.into_iter().map(Into::into).filter(|u| !u.is_empty()));
        self
    }

    pub fn add_class(&mut self, class: String) -> &mut Self {
        self.classes.push(class);
        self
    }

    pub fn build(&self) -> String {
        let mut sections = Vec::new();
        if !self.headers.is_empty() {
            sections.push(self.headers.join("\n"));
        }
        if !self.usings.is_empty() {
            let usings: Vec<String> = self.usings.iter().map(|u| format!("using {};", u)).collect();
            sections.push(usings.join("\n"));
        }

        let classes = self.classes.join("\n\n");
        match &self.namespace {
            Some(namespace) => sections.push(format!("namespace {} {}", namespace, statements::block(&classes))),
            None if !classes.is_empty() => sections.push(classes),
            None => {}
        }

        tracing::info!(
            "[OUTPUT] Built compilation unit: {} classes, {} usings",
            self.classes.len(),
            self.usings.len()
        );
        let mut source = sections.join("\n\n");
        source.push('\n');
        source
    }
}

/// Reads one marker token starting after its lead character. Returns the id
/// and the number of characters consumed, lead and terminator included.
fn read_token(chars: &[char]) -> Option<(MarkerId, usize)> {
    let kind = *chars.get(1)?;
    let end = chars.iter().skip(2).position(|c| *c == MARKER_END)? + 2;
    let digits: String = chars[2..end].iter().collect();
    MarkerId::parse(kind, &digits).map(|id| (id, end + 1))
}

/// Strips every marker from `text` and returns the clean text with the
/// ranges the markers bracketed, sorted by start. Each tail closes the
/// nearest open head with the same id; heads left open are dropped.
pub fn extract_informations(text: &str) -> (String, Vec<InformationRange>) {
    let mut clean_lines = Vec::new();
    let mut open: Vec<(MarkerId, TextPosition)> = Vec::new();
    let mut ranges = Vec::new();

    for (line_no, line) in text.split('\n').enumerate() {
        let chars: Vec<char> = line.chars().collect();
        let mut clean = String::with_capacity(line.len());
        let mut column = 0;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == MARKER_HEAD || c == MARKER_TAIL {
                if let Some((id, consumed)) = read_token(&chars[i..]) {
                    let here = TextPosition::new(line_no, column);
                    if c == MARKER_HEAD {
                        open.push((id, here));
                    } else if let Some(at) = open.iter().rposition(|(open_id, _)| *open_id == id) {
                        let (_, start) = open.remove(at);
                        ranges.push(InformationRange {
                            id,
                            start,
                            end: here,
                            owner: None,
                        });
                    }
                    i += consumed;
                    continue;
                }
            }
            clean.push(c);
            column += 1;
            i += 1;
        }
        clean_lines.push(clean);
    }

    if !open.is_empty() {
        tracing::debug!("[OUTPUT] Dropped {} unmatched markers", open.len());
    }

    // Node ranges belong to the innermost reference around them
    let references: Vec<InformationRange> = ranges
        .iter()
        .filter(|r| matches!(r.id, MarkerId::Reference(_)))
        .cloned()
        .collect();
    for range in ranges.iter_mut().filter(|r| matches!(r.id, MarkerId::Node(_))) {
        range.owner = references
            .iter()
            .filter(|reference| reference.encloses(range))
            .max_by_key(|reference| reference.start)
            .and_then(|reference| match reference.id {
                MarkerId::Reference(object) => Some(object),
                MarkerId::Node(_) => None,
            });
    }

    ranges.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    (clean_lines.join("\n"), ranges)
}
