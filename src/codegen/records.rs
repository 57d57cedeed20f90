//! # Class Member Records
//!
//! Tables of everything a class will declare. Each table is keyed by a
//! `RecordKey`, so a member requested from many call sites is declared once.

use super::naming::NameAllocator;
use crate::graph::{ContainerId, NodeId, ObjectId, PortId, TypeRef};
use std::collections::HashMap;

/// Stable identity of a record owner
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    /// A declared class variable, by index
    Variable(usize),
    /// A declared local of a body container, by index
    Local(ContainerId, usize),
    Port(PortId),
    Node(NodeId),
    Object(ObjectId),
    Named(String),
}

/// Where a variable lives. `Local < Instance`; promotion only moves up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Storage {
    Local(ContainerId),
    Instance,
}

impl Storage {
    pub fn rank(self) -> u8 {
        match self {
            Storage::Local(_) => 0,
            Storage::Instance => 1,
        }
    }
}

/// Request to declare a variable
#[derive(Debug, Clone)]
pub struct VariableSpec {
    pub name: String,
    pub ty: TypeRef,
    pub storage: Storage,
    /// Already rendered modifier keywords with trailing space
    pub modifiers: String,
    pub attributes: Vec<String>,
    pub initializer: Option<String>,
    pub summary: Option<String>,
    /// Keep `name` verbatim instead of allocating a fresh one
    pub exact_name: bool,
}

impl VariableSpec {
    pub fn new(name: &str, ty: TypeRef, storage: Storage) -> Self {
        Self {
            name: name.to_string(),
            ty,
            storage,
            modifiers: String::new(),
            attributes: Vec::new(),
            initializer: None,
            summary: None,
            exact_name: false,
        }
    }

    pub fn with_initializer(mut self, initializer: Option<String>) -> Self {
        self.initializer = initializer;
        self
    }

    pub fn with_modifiers(mut self, modifiers: String) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub key: RecordKey,
    pub name: String,
    pub ty: TypeRef,
    pub storage: Storage,
    pub modifiers: String,
    pub attributes: Vec<String>,
    pub initializer: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Default)]
pub struct VariableTable {
    records: Vec<VariableRecord>,
    by_key: HashMap<RecordKey, usize>,
}

impl VariableTable {
    /// Declares a variable, or returns the existing record for `key`. A
    /// second request may promote storage from local to instance.
    pub fn register(&mut self, key: RecordKey, spec: VariableSpec, names: &mut NameAllocator) -> &VariableRecord {
        if let Some(&slot) = self.by_key.get(&key) {
            let record = &mut self.records[slot];
            if spec.storage.rank() > record.storage.rank() {
                tracing::debug!("[VARS] Promoting '{}' to instance storage", record.name);
                record.storage = spec.storage;
            }
            return &self.records[slot];
        }

        let name = if spec.exact_name {
            names.reserve(&spec.name);
            spec.name.clone()
        } else {
            names.name_for(&key, &spec.name)
        };
        self.by_key.insert(key.clone(), self.records.len());
        self.records.push(VariableRecord {
            key,
            name,
            ty: spec.ty,
            storage: spec.storage,
            modifiers: spec.modifiers,
            attributes: spec.attributes,
            initializer: spec.initializer,
            summary: spec.summary,
        });
        &self.records[self.records.len() - 1]
    }

    pub fn get(&self, key: &RecordKey) -> Option<&VariableRecord> {
        self.by_key.get(key).map(|slot| &self.records[*slot])
    }

    pub fn get_mut(&mut self, key: &RecordKey) -> Option<&mut VariableRecord> {
        self.by_key.get(key).map(|slot| &mut self.records[*slot])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn instance_fields(&self) -> impl Iterator<Item = &VariableRecord> {
        self.records.iter().filter(|r| r.storage == Storage::Instance)
    }

    pub fn locals_of(&self, container: ContainerId) -> impl Iterator<Item = &VariableRecord> {
        self.records
            .iter()
            .filter(move |r| r.storage == Storage::Local(container))
    }
}

/// Signature of a method to create or extend
#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: String,
    pub return_type: String,
    /// Rendered parameters, e.g. `int count`
    pub parameters: Vec<String>,
    /// Parameter types only; part of the method identity
    pub parameter_types: Vec<String>,
    pub modifiers: String,
}

impl MethodSpec {
    pub fn new(name: &str, return_type: &str) -> Self {
        Self {
            name: name.to_string(),
            return_type: return_type.to_string(),
            parameters: Vec::new(),
            parameter_types: Vec::new(),
            modifiers: String::new(),
        }
    }

    pub fn with_parameter(mut self, ty: &str, name: &str) -> Self {
        self.parameters.push(format!("{} {}", ty, name));
        self.parameter_types.push(ty.to_string());
        self
    }

    pub fn with_modifiers(mut self, modifiers: &str) -> Self {
        self.modifiers = modifiers.to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct MethodRecord {
    pub name: String,
    pub return_type: String,
    pub parameters: Vec<String>,
    pub parameter_types: Vec<String>,
    pub modifiers: String,
    pub generic_parameters: Vec<String>,
    pub constraints: Vec<String>,
    pub attributes: Vec<String>,
    pub summary: Option<String>,
    /// Body container whose locals are declared at the top of the body
    pub container: Option<ContainerId>,
    fragments: Vec<(i32, usize, String)>,
}

impl MethodRecord {
    pub fn add_fragment(&mut self, code: String, priority: i32) {
        let order = self.fragments.len();
        self.fragments.push((priority, order, code));
    }

    /// Fragments sorted by priority, insertion order breaking ties
    pub fn body(&self) -> String {
        let mut fragments: Vec<&(i32, usize, String)> = self.fragments.iter().collect();
        fragments.sort_by_key(|(priority, order, _)| (*priority, *order));
        let parts: Vec<&str> = fragments.iter().map(|(_, _, code)| code.as_str()).collect();
        super::statements::flow(&parts)
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }
}

#[derive(Debug, Default)]
pub struct MethodTable {
    records: Vec<MethodRecord>,
    by_signature: HashMap<(String, Vec<String>), usize>,
}

impl MethodTable {
    /// Returns the method with `spec`'s name and parameter types, creating it
    /// on first request
    pub fn get_or_create(&mut self, spec: &MethodSpec) -> crate::Result<&mut MethodRecord> {
        let key = (spec.name.clone(), spec.parameter_types.clone());
        if let Some(&slot) = self.by_signature.get(&key) {
            let record = &mut self.records[slot];
            if record.return_type != spec.return_type {
                return Err(crate::GeneratorError::InvalidOperation(format!(
                    "method '{}' is already declared returning '{}', not '{}'",
                    spec.name, record.return_type, spec.return_type
                )));
            }
            return Ok(record);
        }

        self.by_signature.insert(key, self.records.len());
        self.records.push(MethodRecord {
            name: spec.name.clone(),
            return_type: spec.return_type.clone(),
            parameters: spec.parameters.clone(),
            parameter_types: spec.parameter_types.clone(),
            modifiers: spec.modifiers.clone(),
            generic_parameters: Vec::new(),
            constraints: Vec::new(),
            attributes: Vec::new(),
            summary: None,
            container: None,
            fragments: Vec::new(),
        });
        let slot = self.records.len() - 1;
        Ok(&mut self.records[slot])
    }

    pub fn find(&self, name: &str) -> impl Iterator<Item = &MethodRecord> {
        let name = name.to_string();
        self.records.iter().filter(move |r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AccessorRecord {
    /// Rendered accessor modifier, e.g. `private `
    pub modifiers: String,
    /// `None` for an auto accessor
    pub body: Option<String>,
    pub container: Option<ContainerId>,
}

#[derive(Debug, Clone)]
pub struct PropertyRecord {
    pub name: String,
    pub ty: String,
    pub modifiers: String,
    pub attributes: Vec<String>,
    pub summary: Option<String>,
    pub getter: Option<AccessorRecord>,
    pub setter: Option<AccessorRecord>,
    pub initializer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConstructorRecord {
    pub modifiers: String,
    pub parameters: Vec<String>,
    pub summary: Option<String>,
    pub container: ContainerId,
    pub body: String,
}

/// How a state entry is installed into its coroutine field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoroutineBody {
    /// Not lowered yet
    Pending,
    /// Installed as a setup lambda
    Lambda(String),
    /// Dispatched through the shared iterator under this case id
    Dispatch(usize),
    /// Factory supplied by the node itself
    Custom(String),
}

/// One per referenced state flow entry
#[derive(Debug, Clone)]
pub struct EventCoroutineRecord {
    pub port: PortId,
    pub node: NodeId,
    pub variable: String,
    pub body: CoroutineBody,
    pub on_stop: Option<String>,
}

impl EventCoroutineRecord {
    pub fn case_id(&self) -> Option<usize> {
        match self.body {
            CoroutineBody::Dispatch(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct CoroutineTable {
    records: Vec<EventCoroutineRecord>,
    by_port: HashMap<PortId, usize>,
}

impl CoroutineTable {
    pub fn get(&self, port: PortId) -> Option<&EventCoroutineRecord> {
        self.by_port.get(&port).map(|slot| &self.records[*slot])
    }

    pub fn insert(&mut self, record: EventCoroutineRecord) -> &EventCoroutineRecord {
        let slot = self.records.len();
        self.by_port.insert(record.port, slot);
        self.records.push(record);
        &self.records[slot]
    }

    pub fn at(&self, slot: usize) -> Option<&EventCoroutineRecord> {
        self.records.get(slot)
    }

    pub fn at_mut(&mut self, slot: usize) -> Option<&mut EventCoroutineRecord> {
        self.records.get_mut(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventCoroutineRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Stable 0-based ids for dispatch entries, in first-seen order
#[derive(Debug, Default)]
pub struct EventIdMap {
    ids: HashMap<PortId, usize>,
}

impl EventIdMap {
    pub fn id_for(&mut self, port: PortId) -> usize {
        let next = self.ids.len();
        *self.ids.entry(port).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_registration_is_idempotent_and_promotes() {
        let mut names = NameAllocator::new();
        let mut table = VariableTable::default();
        let key = RecordKey::Port(PortId(3));

        let first = table
            .register(key.clone(), VariableSpec::new("result", TypeRef::int(), Storage::Local(ContainerId(1))), &mut names)
            .name
            .clone();
        let second = table
            .register(key.clone(), VariableSpec::new("other", TypeRef::int(), Storage::Instance), &mut names);
        assert_eq!(second.name, first);
        assert_eq!(second.storage, Storage::Instance);

        table.register(key.clone(), VariableSpec::new("result", TypeRef::int(), Storage::Local(ContainerId(1))), &mut names);
        assert_eq!(table.get(&key).unwrap().storage, Storage::Instance);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn method_fragments_sort_by_priority_then_order() {
        let mut table = MethodTable::default();
        let spec = MethodSpec::new("Start", "void");
        table.get_or_create(&spec).unwrap().add_fragment("B();".into(), 10);
        table.get_or_create(&spec).unwrap().add_fragment("A();".into(), -5);
        table.get_or_create(&spec).unwrap().add_fragment("C();".into(), 10);

        assert_eq!(table.len(), 1);
        let record = table.find("Start").next().unwrap();
        assert_eq!(record.body(), "A();\nB();\nC();");
    }

    #[test]
    fn conflicting_return_type_is_rejected() {
        let mut table = MethodTable::default();
        table.get_or_create(&MethodSpec::new("Run", "void")).unwrap();
        assert!(table.get_or_create(&MethodSpec::new("Run", "int")).is_err());
        assert!(table
            .get_or_create(&MethodSpec::new("Run", "int").with_parameter("int", "x"))
            .is_ok());
    }

    #[test]
    fn event_ids_are_first_seen() {
        let mut ids = EventIdMap::default();
        assert_eq!(ids.id_for(PortId(9)), 0);
        assert_eq!(ids.id_for(PortId(4)), 1);
        assert_eq!(ids.id_for(PortId(9)), 0);
        assert_eq!(ids.len(), 2);
    }
}
