//! # Type Namer
//!
//! Resolves a `TypeRef` to the shortest name that still binds to the right
//! type under the active `using` directives. Results are cached per run; the
//! cache is dropped whenever a new namespace is imported, since that can turn
//! a short name ambiguous.

use super::naming::sanitize;
use crate::graph::types::primitive_keyword;
use crate::graph::{NamedType, TypeCatalog, TypeRef};
use std::collections::{BTreeSet, HashMap};

pub struct TypeNamer<'a> {
    catalog: &'a TypeCatalog,
    usings: BTreeSet<String>,
    full_names: bool,
    cache: HashMap<TypeRef, String>,
}

impl<'a> TypeNamer<'a> {
    pub fn new(catalog: &'a TypeCatalog, usings: &[String], full_names: bool) -> Self {
        Self {
            catalog,
            usings: usings.iter().cloned().collect(),
            full_names,
            cache: HashMap::new(),
        }
    }

    pub fn usings(&self) -> impl Iterator<Item = &String> {
        self.usings.iter()
    }

    /// Imports `namespace`; returns false if it was already imported
    pub fn register_using(&mut self, namespace: &str) -> bool {
        if namespace.is_empty() || !self.usings.insert(namespace.to_string()) {
            return false;
        }
        tracing::debug!("[TYPES] Added using '{}'", namespace);
        self.cache.clear();
        true
    }

    pub fn name(&mut self, ty: &TypeRef) -> String {
        if let Some(name) = self.cache.get(ty) {
            return name.clone();
        }
        let name = self.resolve(ty);
        self.cache.insert(ty.clone(), name.clone());
        name
    }

    fn resolve(&mut self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Named(named) => {
                if let Some(keyword) = primitive_keyword(named) {
                    return keyword.to_string();
                }
                self.named(named)
            }
            TypeRef::Nullable(inner) => format!("{}?", self.name(inner)),
            TypeRef::Array { element, rank } => {
                let element = self.name(element);
                format!("{}[{}]", element, ",".repeat((*rank).max(1) as usize - 1))
            }
            TypeRef::GenericParameter(name) => name.clone(),
            TypeRef::Runtime(runtime) => sanitize(&runtime.name),
        }
    }

    fn named(&mut self, named: &NamedType) -> String {
        let mut base = named.display_name();
        if let Some(namespace) = named.namespace.as_deref() {
            if !self.can_drop_namespace(namespace, named) {
                base = format!("{}.{}", namespace, base);
            }
        }
        if named.arguments.is_empty() {
            return base;
        }
        let arguments: Vec<String> = named.arguments.iter().map(|a| self.name(a)).collect();
        format!("{}<{}>", base, arguments.join(", "))
    }

    fn can_drop_namespace(&self, namespace: &str, named: &NamedType) -> bool {
        if self.full_names || !self.usings.contains(namespace) {
            return false;
        }
        // Nested types are looked up through their outermost type
        let (probe, arity) = match named.nesting.first() {
            Some(outer) => (outer.as_str(), 0),
            None => (named.name.as_str(), named.arity()),
        };
        !self.catalog.is_ambiguous(namespace, probe, arity, self.usings.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CatalogEntry;

    fn namer<'a>(catalog: &'a TypeCatalog, usings: &[&str]) -> TypeNamer<'a> {
        let usings: Vec<String> = usings.iter().map(|s| s.to_string()).collect();
        TypeNamer::new(catalog, &usings, false)
    }

    #[test]
    fn primitives_use_keywords() {
        let catalog = TypeCatalog::standard();
        let mut types = namer(&catalog, &[]);
        assert_eq!(types.name(&TypeRef::int()), "int");
        assert_eq!(types.name(&TypeRef::nullable(TypeRef::float())), "float?");
        assert_eq!(
            types.name(&TypeRef::Array {
                element: Box::new(TypeRef::string()),
                rank: 2
            }),
            "string[,]"
        );
    }

    #[test]
    fn generic_names_use_short_arguments() {
        let catalog = TypeCatalog::standard();
        let mut types = namer(&catalog, &["System.Collections.Generic"]);
        let dict = TypeRef::generic(
            "System.Collections.Generic",
            "Dictionary",
            vec![TypeRef::string(), TypeRef::array(TypeRef::int())],
        );
        assert_eq!(types.name(&dict), "Dictionary<string, int[]>");
    }

    #[test]
    fn namespace_kept_when_not_imported() {
        let catalog = TypeCatalog::standard();
        let mut types = namer(&catalog, &[]);
        let list = TypeRef::generic("System.Collections.Generic", "List", vec![TypeRef::int()]);
        assert_eq!(types.name(&list), "System.Collections.Generic.List<int>");
    }

    #[test]
    fn new_using_invalidates_cached_names() {
        let catalog = TypeCatalog::standard().with_entries([
            CatalogEntry::new("Game", "Timer", 0),
            CatalogEntry::new("Game.Legacy", "Timer", 0),
        ]);
        let mut types = namer(&catalog, &["Game"]);
        let timer = TypeRef::named("Game", "Timer");
        assert_eq!(types.name(&timer), "Timer");

        assert!(types.register_using("Game.Legacy"));
        assert_eq!(types.name(&timer), "Game.Timer");
        assert!(!types.register_using("Game.Legacy"));
    }

    #[test]
    fn nested_and_runtime_types() {
        let catalog = TypeCatalog::standard().with_entries([CatalogEntry::new("Game", "Player", 0)]);
        let mut types = namer(&catalog, &["Game"]);
        let state = TypeRef::named("Game", "State").nested_in(&["Player"]);
        assert_eq!(types.name(&state), "Player.State");
        assert_eq!(types.name(&TypeRef::runtime("Enemy Graph")), "Enemy_Graph");
        assert_eq!(types.name(&TypeRef::GenericParameter("T".into())), "T");
    }

    #[test]
    fn full_type_names_option_qualifies() {
        let catalog = TypeCatalog::standard();
        let usings = vec!["System".to_string()];
        let mut types = TypeNamer::new(&catalog, &usings, true);
        assert_eq!(types.name(&TypeRef::named("System", "Math")), "System.Math");
        assert_eq!(types.name(&TypeRef::int()), "int");
    }
}
