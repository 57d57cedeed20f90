//! # Name Allocator
//!
//! Mints identifiers that never collide within a class. Names requested for
//! the same owner key and base are stable, so a record asked for twice
//! always gets the name it got the first time.

use super::records::RecordKey;
use std::collections::{HashMap, HashSet};

/// Words that cannot be used as identifiers in the target language
const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class",
    "const", "continue", "decimal", "default", "delegate", "do", "double", "else", "enum", "event",
    "explicit", "extern", "false", "finally", "fixed", "float", "for", "foreach", "goto", "if",
    "implicit", "in", "int", "interface", "internal", "is", "lock", "long", "namespace", "new",
    "null", "object", "operator", "out", "override", "params", "private", "protected", "public",
    "readonly", "ref", "return", "sbyte", "sealed", "short", "sizeof", "stackalloc", "static",
    "string", "struct", "switch", "this", "throw", "true", "try", "typeof", "uint", "ulong",
    "unchecked", "unsafe", "ushort", "using", "virtual", "void", "volatile", "while",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Turns arbitrary text into a legal identifier
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else if c.is_whitespace() || c == '-' || c == '.' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
        }
    }
    let trimmed = out.trim_end_matches('_');
    let mut out = if trimmed.is_empty() { "_".to_string() } else { trimmed.to_string() };
    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        out.insert(0, '_');
    }
    if is_keyword(&out) {
        out.insert(0, '_');
    }
    out
}

#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
    owned: HashMap<(RecordKey, String), String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `name` exactly; returns false when it is already taken
    pub fn reserve(&mut self, name: &str) -> bool {
        self.used.insert(name.to_string())
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// A fresh identifier derived from `base`
    pub fn generate(&mut self, base: &str) -> String {
        let base = sanitize(base);
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut counter = 1usize;
        loop {
            let candidate = format!("{}{}", base, counter);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// The identifier owned by `owner` for `base`, minted on first request
    pub fn name_for(&mut self, owner: &RecordKey, base: &str) -> String {
        let key = (owner.clone(), base.to_string());
        if let Some(name) = self.owned.get(&key) {
            return name.clone();
        }
        let name = self.generate(base);
        self.owned.insert(key, name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeId, PortId};

    #[test]
    fn sanitize_produces_identifiers() {
        assert_eq!(sanitize("my value"), "my_value");
        assert_eq!(sanitize("2d"), "_2d");
        assert_eq!(sanitize("class"), "_class");
        assert_eq!(sanitize("a+b"), "ab");
        assert_eq!(sanitize("!!"), "_");
    }

    #[test]
    fn generated_names_never_collide() {
        let mut names = NameAllocator::new();
        assert!(names.reserve("health"));
        assert_eq!(names.generate("health"), "health1");
        assert_eq!(names.generate("health"), "health2");
        assert_eq!(names.generate("speed"), "speed");
        assert!(!names.reserve("speed"));
    }

    #[test]
    fn owner_names_are_stable() {
        let mut names = NameAllocator::new();
        let a = RecordKey::Port(PortId(1));
        let b = RecordKey::Node(NodeId(1));
        let first = names.name_for(&a, "result");
        assert_eq!(names.name_for(&a, "result"), first);
        assert_ne!(names.name_for(&b, "result"), first);
    }
}
