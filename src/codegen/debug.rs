//! # Debug Instrumentation
//!
//! Two independent weavers:
//!
//! - **Debug calls** wrap flow statements and value expressions with calls
//!   into the runtime debug API, optionally inside `#if <symbol>` blocks.
//! - **Informational markers** bracket node-attributable text with invisible
//!   tokens that the output builder later turns into line/column ranges.
//!
//! A marker is `HEAD kind id END` at the start of a range and
//! `TAIL kind id END` at its end, where `kind` is `N` for nodes and `R` for
//! external references.

use crate::config::DebugOptions;
use crate::graph::{NodeId, ObjectId, PortId};
use serde::{Deserialize, Serialize};

pub const MARKER_HEAD: char = '\u{2063}';
pub const MARKER_TAIL: char = '\u{2064}';
pub const MARKER_END: char = '\u{2062}';

/// Identity carried by a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkerId {
    Node(NodeId),
    Reference(ObjectId),
}

impl MarkerId {
    fn kind(self) -> char {
        match self {
            MarkerId::Node(_) => 'N',
            MarkerId::Reference(_) => 'R',
        }
    }

    fn raw(self) -> u32 {
        match self {
            MarkerId::Node(id) => id.0,
            MarkerId::Reference(id) => id.0,
        }
    }

    pub(crate) fn parse(kind: char, digits: &str) -> Option<Self> {
        let raw: u32 = digits.parse().ok()?;
        match kind {
            'N' => Some(MarkerId::Node(NodeId(raw))),
            'R' => Some(MarkerId::Reference(ObjectId(raw))),
            _ => None,
        }
    }

    pub fn head(self) -> String {
        format!("{}{}{}{}", MARKER_HEAD, self.kind(), self.raw(), MARKER_END)
    }

    pub fn tail(self) -> String {
        format!("{}{}{}{}", MARKER_TAIL, self.kind(), self.raw(), MARKER_END)
    }
}

/// Brackets `text` with markers for `id`. Leading and trailing whitespace
/// stays outside the markers so trimming and indentation behave the same
/// with and without them.
pub fn wrap_with_marker(id: MarkerId, text: &str) -> String {
    let core = text.trim();
    if core.is_empty() {
        return text.to_string();
    }
    let start = text.len() - text.trim_start().len();
    let end = start + core.len();
    format!("{}{}{}{}{}", &text[..start], id.head(), core, id.tail(), &text[end..])
}

pub fn has_markers(text: &str) -> bool {
    text.contains(MARKER_HEAD) || text.contains(MARKER_TAIL)
}

/// Removes every marker token from `text`
pub fn strip_markers(text: &str) -> String {
    if !has_markers(text) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut in_token = false;
    for c in text.chars() {
        match c {
            MARKER_HEAD | MARKER_TAIL => in_token = true,
            MARKER_END if in_token => in_token = false,
            _ if in_token => {}
            _ => out.push(c),
        }
    }
    out
}

/// Builds the runtime debug API calls for one graph
#[derive(Debug, Clone)]
pub struct DebugWeaver {
    api: String,
    symbol: Option<String>,
    graph: String,
}

impl DebugWeaver {
    pub fn new(options: &DebugOptions, graph_uid: &str) -> Self {
        Self {
            api: options.api.clone(),
            symbol: options.symbol.clone(),
            graph: graph_uid.to_string(),
        }
    }

    fn guard(&self, statement: String) -> String {
        match &self.symbol {
            Some(symbol) => format!("#if {}\n{}\n#endif", symbol, statement),
            None => statement,
        }
    }

    /// Statement recording that flow entered `port` of `node`
    pub fn flow(&self, owner: &str, node: NodeId, port: PortId) -> String {
        self.guard(format!(
            "{}.Flow({}, \"{}\", {}, {});",
            self.api, owner, self.graph, node, port
        ))
    }

    /// Statement recording that a state flow ran to its end
    pub fn finished(&self, owner: &str, node: NodeId, port: PortId) -> String {
        self.guard(format!(
            "{}.Finished({}, \"{}\", {}, {});",
            self.api, owner, self.graph, node, port
        ))
    }

    /// Wraps a value expression so the runtime observes it. Guarded builds
    /// cannot wrap expressions inline, so they leave values untouched.
    pub fn value(&self, owner: &str, node: NodeId, port: PortId, expression: &str) -> String {
        if self.symbol.is_some() {
            return expression.to_string();
        }
        format!(
            "{}.Value({}, \"{}\", {}, {}, {})",
            self.api, owner, self.graph, node, port, expression
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_whitespace_outside() {
        let id = MarkerId::Node(NodeId(4));
        let wrapped = wrap_with_marker(id, "\n\tRun();\n");
        assert!(wrapped.starts_with("\n\t"));
        assert!(wrapped.ends_with(";\u{2064}N4\u{2062}\n"));
        assert_eq!(strip_markers(&wrapped), "\n\tRun();\n");
    }

    #[test]
    fn empty_text_is_not_wrapped() {
        assert_eq!(wrap_with_marker(MarkerId::Node(NodeId(1)), "  "), "  ");
    }

    #[test]
    fn nested_markers_strip_cleanly() {
        let inner = wrap_with_marker(MarkerId::Node(NodeId(2)), "b");
        let outer = wrap_with_marker(MarkerId::Reference(ObjectId(9)), &format!("a {}", inner));
        assert_eq!(strip_markers(&outer), "a b");
    }

    #[test]
    fn guarded_flow_call() {
        let options = DebugOptions {
            enabled: true,
            symbol: Some("GRAPH_DEBUG".into()),
            api: "GraphDebug".into(),
        };
        let weaver = DebugWeaver::new(&options, "Player");
        assert_eq!(
            weaver.flow("this", NodeId(3), PortId(8)),
            "#if GRAPH_DEBUG\nGraphDebug.Flow(this, \"Player\", 3, 8);\n#endif"
        );
        assert_eq!(weaver.value("this", NodeId(3), PortId(9), "x"), "x");
    }

    #[test]
    fn finished_call_names_the_state_entry() {
        let weaver = DebugWeaver::new(&DebugOptions::default(), "Door");
        assert_eq!(
            weaver.finished("this", NodeId(4), PortId(7)),
            "GraphDebug.Finished(this, \"Door\", 4, 7);"
        );
    }

    #[test]
    fn unguarded_value_call() {
        let weaver = DebugWeaver::new(&DebugOptions::default(), "Player");
        assert_eq!(
            weaver.value("this", NodeId(1), PortId(2), "speed"),
            "GraphDebug.Value(this, \"Player\", 1, 2, speed)"
        );
    }
}
