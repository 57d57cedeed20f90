//! # Type References
//!
//! Types as the graph sees them. A `TypeRef` is purely descriptive: the
//! generator never loads types, it only needs enough shape to pick the right
//! output syntax. The `TypeCatalog` lists the types visible to the target
//! compiler and backs the namespace ambiguity probe.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// The declaration kind of a named type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Struct,
    Enum,
    Interface,
    Delegate,
}

/// A type as referenced by the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Named(NamedType),
    Array { element: Box<TypeRef>, rank: u8 },
    Nullable(Box<TypeRef>),
    GenericParameter(String),
    /// A type that only exists at runtime (for example another graph) and has
    /// no native backing type
    Runtime(RuntimeType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedType {
    #[serde(default)]
    pub namespace: Option<String>,
    /// Enclosing type names, outermost first
    #[serde(default)]
    pub nesting: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<TypeRef>,
    #[serde(default)]
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeType {
    pub name: String,
    /// Native type the runtime type ultimately derives from
    #[serde(default)]
    pub native_base: Option<Box<TypeRef>>,
}

impl TypeRef {
    pub fn named(namespace: &str, name: &str) -> Self {
        TypeRef::Named(NamedType {
            namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
            nesting: Vec::new(),
            name: name.to_string(),
            arguments: Vec::new(),
            kind: TypeKind::Class,
        })
    }

    pub fn value_type(namespace: &str, name: &str) -> Self {
        TypeRef::named(namespace, name).with_kind(TypeKind::Struct)
    }

    pub fn system(name: &str) -> Self {
        let ty = TypeRef::named("System", name);
        match name {
            "Object" | "String" | "Void" => ty,
            _ if PRIMITIVES.iter().any(|(n, _)| *n == name) => ty.with_kind(TypeKind::Struct),
            _ => ty,
        }
    }

    pub fn generic(namespace: &str, name: &str, arguments: Vec<TypeRef>) -> Self {
        let mut ty = TypeRef::named(namespace, name);
        if let TypeRef::Named(named) = &mut ty {
            named.arguments = arguments;
        }
        ty
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array {
            element: Box::new(element),
            rank: 1,
        }
    }

    pub fn nullable(inner: TypeRef) -> Self {
        TypeRef::Nullable(Box::new(inner))
    }

    pub fn runtime(name: &str) -> Self {
        TypeRef::Runtime(RuntimeType {
            name: name.to_string(),
            native_base: None,
        })
    }

    pub fn void() -> Self {
        TypeRef::system("Void")
    }
    pub fn int() -> Self {
        TypeRef::system("Int32")
    }
    pub fn float() -> Self {
        TypeRef::system("Single")
    }
    pub fn bool() -> Self {
        TypeRef::system("Boolean")
    }
    pub fn string() -> Self {
        TypeRef::system("String")
    }
    pub fn object() -> Self {
        TypeRef::system("Object")
    }

    /// `System.Collections.IEnumerator`, the return type of iterator methods
    pub fn enumerator() -> Self {
        TypeRef::named("System.Collections", "IEnumerator").with_kind(TypeKind::Interface)
    }

    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        if let TypeRef::Named(named) = &mut self {
            named.kind = kind;
        }
        self
    }

    pub fn nested_in(mut self, outer: &[&str]) -> Self {
        if let TypeRef::Named(named) = &mut self {
            named.nesting = outer.iter().map(|s| s.to_string()).collect();
        }
        self
    }

    pub fn as_named(&self) -> Option<&NamedType> {
        match self {
            TypeRef::Named(named) => Some(named),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.as_named().and_then(|n| n.namespace.as_deref())
    }

    pub fn simple_name(&self) -> &str {
        match self {
            TypeRef::Named(named) => &named.name,
            TypeRef::Array { element, .. } => element.simple_name(),
            TypeRef::Nullable(inner) => inner.simple_name(),
            TypeRef::GenericParameter(name) => name,
            TypeRef::Runtime(rt) => &rt.name,
        }
    }

    pub fn is_void(&self) -> bool {
        self.is_system("Void")
    }

    pub fn is_system(&self, name: &str) -> bool {
        matches!(self, TypeRef::Named(n)
            if n.namespace.as_deref() == Some("System") && n.nesting.is_empty() && n.name == name)
    }

    /// Iterator methods may contain `yield`
    pub fn is_iterator(&self) -> bool {
        match self {
            TypeRef::Named(n) => {
                matches!(
                    n.namespace.as_deref(),
                    Some("System.Collections") | Some("System.Collections.Generic")
                ) && matches!(n.name.as_str(), "IEnumerator" | "IEnumerable")
            }
            _ => false,
        }
    }

    pub fn is_value_type(&self) -> bool {
        match self {
            TypeRef::Named(n) => {
                matches!(n.kind, TypeKind::Struct | TypeKind::Enum)
                    || (n.namespace.as_deref() == Some("System") && n.name == "ValueType")
            }
            TypeRef::Nullable(_) => true,
            _ => false,
        }
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, TypeRef::Runtime(_))
    }
}

impl NamedType {
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    /// Dotted name without namespace, enclosing types included
    pub fn display_name(&self) -> String {
        if self.nesting.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.nesting.join("."), self.name)
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.display_name()),
            None => self.display_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(named) => {
                write!(f, "{}", named.qualified_name())?;
                if !named.arguments.is_empty() {
                    let args: Vec<String> = named.arguments.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            TypeRef::Array { element, rank } => {
                write!(f, "{}[{}]", element, ",".repeat(rank.saturating_sub(1) as usize))
            }
            TypeRef::Nullable(inner) => write!(f, "{}?", inner),
            TypeRef::GenericParameter(name) => write!(f, "{}", name),
            TypeRef::Runtime(rt) => write!(f, "{}", rt.name),
        }
    }
}

/// Built-in `System` types that have a language keyword
pub const PRIMITIVES: &[(&str, &str)] = &[
    ("Boolean", "bool"),
    ("Byte", "byte"),
    ("SByte", "sbyte"),
    ("Char", "char"),
    ("Decimal", "decimal"),
    ("Double", "double"),
    ("Single", "float"),
    ("Int16", "short"),
    ("UInt16", "ushort"),
    ("Int32", "int"),
    ("UInt32", "uint"),
    ("Int64", "long"),
    ("UInt64", "ulong"),
    ("Object", "object"),
    ("String", "string"),
    ("Void", "void"),
];

pub fn primitive_keyword(ty: &NamedType) -> Option<&'static str> {
    if ty.namespace.as_deref() != Some("System") || !ty.nesting.is_empty() || !ty.arguments.is_empty() {
        return None;
    }
    PRIMITIVES
        .iter()
        .find(|(name, _)| *name == ty.name)
        .map(|(_, keyword)| *keyword)
}

/// A type known to the target compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub arity: usize,
}

/// Namespace → simple name → generic arities
type NamespaceIndex = HashMap<String, HashMap<String, Vec<usize>>>;

/// Every type visible to the target compiler, grouped by namespace on first
/// use. The grouping is a snapshot: it is built once per catalog and never
/// invalidated, so catalogs are immutable once shared.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TypeCatalog {
    entries: Vec<CatalogEntry>,
    #[serde(skip)]
    index: OnceLock<NamespaceIndex>,
}

impl TypeCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            index: OnceLock::new(),
        }
    }

    /// The types every generated script can see
    pub fn standard() -> Self {
        let mut entries = Vec::new();
        for (name, _) in PRIMITIVES {
            entries.push(CatalogEntry::new("System", name, 0));
        }
        for (namespace, name, arity) in [
            ("System", "Action", 0),
            ("System", "Func", 1),
            ("System", "Nullable", 1),
            ("System", "Math", 0),
            ("System", "Type", 0),
            ("System", "Exception", 0),
            ("System.Collections", "IEnumerator", 0),
            ("System.Collections", "IEnumerable", 0),
            ("System.Collections", "ArrayList", 0),
            ("System.Collections", "Hashtable", 0),
            ("System.Collections.Generic", "List", 1),
            ("System.Collections.Generic", "Dictionary", 2),
            ("System.Collections.Generic", "HashSet", 1),
            ("System.Collections.Generic", "Queue", 1),
            ("System.Collections.Generic", "Stack", 1),
            ("System.Collections.Generic", "IEnumerable", 1),
            ("System.Collections.Generic", "IEnumerator", 1),
            ("System.Collections.Generic", "KeyValuePair", 2),
        ] {
            entries.push(CatalogEntry::new(namespace, name, arity));
        }
        Self::new(entries)
    }

    /// Returns a new catalog extended with `entries`
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        self.entries.extend(entries);
        Self::new(self.entries)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    fn index(&self) -> &NamespaceIndex {
        self.index.get_or_init(|| {
            let mut index: NamespaceIndex = HashMap::new();
            for entry in &self.entries {
                index
                    .entry(entry.namespace.clone())
                    .or_default()
                    .entry(entry.name.clone())
                    .or_default()
                    .push(entry.arity);
            }
            tracing::debug!("[TYPES] Indexed {} types in {} namespaces", self.entries.len(), index.len());
            index
        })
    }

    /// Whether `name` (with `arity` generic arguments, declared in
    /// `namespace`) would be ambiguous if written without its namespace
    /// given the visible `usings`.
    pub fn is_ambiguous<'u>(
        &self,
        namespace: &str,
        name: &str,
        arity: usize,
        usings: impl IntoIterator<Item = &'u String>,
    ) -> bool {
        let index = self.index();
        usings.into_iter().any(|using| {
            let Some(arities) = index.get(using).and_then(|types| types.get(name)) else {
                return false;
            };
            if using == namespace {
                arities.iter().any(|a| *a != arity)
            } else {
                !arities.is_empty()
            }
        })
    }
}

impl CatalogEntry {
    pub fn new(namespace: &str, name: &str, arity: usize) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            arity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn iterator_detection() {
        assert!(TypeRef::enumerator().is_iterator());
        assert!(!TypeRef::void().is_iterator());
        assert!(TypeRef::void().is_void());
    }

    #[test]
    fn primitive_keywords_only_for_system_types() {
        let int = TypeRef::int();
        assert_eq!(primitive_keyword(int.as_named().unwrap()), Some("int"));

        let fake = TypeRef::named("Game", "Int32");
        assert_eq!(primitive_keyword(fake.as_named().unwrap()), None);
    }

    #[test]
    fn ambiguity_probe_considers_other_namespaces() {
        let catalog = TypeCatalog::new(vec![
            CatalogEntry::new("Game", "Random", 0),
            CatalogEntry::new("System", "Random", 0),
        ]);
        assert!(catalog.is_ambiguous("Game", "Random", 0, &usings(&["Game", "System"])));
        assert!(!catalog.is_ambiguous("Game", "Random", 0, &usings(&["Game"])));
    }

    #[test]
    fn ambiguity_probe_considers_other_arities() {
        let catalog = TypeCatalog::new(vec![
            CatalogEntry::new("System", "Action", 0),
            CatalogEntry::new("System", "Action", 1),
        ]);
        assert!(catalog.is_ambiguous("System", "Action", 0, &usings(&["System"])));
        assert!(!catalog.is_ambiguous("System", "Math", 0, &usings(&["System"])));
    }

    #[test]
    fn display_is_fully_qualified() {
        let list = TypeRef::generic("System.Collections.Generic", "List", vec![TypeRef::int()]);
        assert_eq!(list.to_string(), "System.Collections.Generic.List<System.Int32>");
        assert_eq!(TypeRef::array(TypeRef::string()).to_string(), "System.String[]");
    }
}
