//! # Graph Description
//!
//! The node-and-port program graph handed to the generator. One
//! `GraphDescription` describes one generated type: its declared members, the
//! containers holding node bodies, the nodes themselves and their
//! connections. The editor owns this data; the generator only reads it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

mod builder;
mod index;
pub mod types;
pub mod value;

pub use builder::{BodyHandle, GraphBuilder, GroupHandle, NodeBuilder};
pub use index::GraphIndex;
pub use types::{CatalogEntry, NamedType, RuntimeType, TypeCatalog, TypeKind, TypeRef};
pub use value::{ObjectRef, Value};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Stable id of a node within its graph
    NodeId
);
id_type!(
    /// Stable id of a port within its graph
    PortId
);
id_type!(ContainerId);
id_type!(
    /// Id of a host object referenced from the graph
    ObjectId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    FlowInput,
    FlowOutput,
    ValueInput,
    ValueOutput,
}

impl PortKind {
    pub fn is_flow(self) -> bool {
        matches!(self, PortKind::FlowInput | PortKind::FlowOutput)
    }

    pub fn is_input(self) -> bool {
        matches!(self, PortKind::FlowInput | PortKind::ValueInput)
    }
}

/// A typed directional socket on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub kind: PortKind,
    #[serde(default)]
    pub ty: Option<TypeRef>,
    /// Constant used by an unconnected value input
    #[serde(default)]
    pub default: Option<Value>,
    /// Flow input that is coroutine-capable on its own
    #[serde(default)]
    pub coroutine: bool,
    /// Flow output that carries a nested state flow
    #[serde(default)]
    pub state_flow: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: NodeId,
    pub node_type: String,
    #[serde(default)]
    pub title: String,
    pub container: ContainerId,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl NodeInstance {
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn ports_of(&self, kind: PortKind) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(move |p| p.kind == kind)
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(Value::as_str)
    }

    /// Title for messages, falling back to the node type
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.node_type
        } else {
            &self.title
        }
    }
}

/// A directed edge from an output port to an input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: PortId,
    pub target: PortId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// The event graph; nodes here may be lowered into a state machine
    MainGraph,
    Function(usize),
    Constructor(usize),
    PropertyGetter(usize),
    PropertySetter(usize),
    /// Nodes grouped under `owner`, optionally referencing an external asset
    Group {
        owner: NodeId,
        #[serde(default)]
        reference: Option<ObjectId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub kind: ContainerKind,
    /// Node whose flow output starts the body
    #[serde(default)]
    pub entry: Option<NodeId>,
    /// Method-local variables declared in this body
    #[serde(default)]
    pub locals: Vec<VariableDeclaration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    #[default]
    Class,
    Struct,
    Interface,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
    Internal,
    /// No access keyword at all
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_sealed: bool,
    pub is_readonly: bool,
    pub is_const: bool,
    pub is_partial: bool,
}

impl Modifiers {
    pub fn private() -> Self {
        Self {
            visibility: Visibility::Private,
            ..Self::default()
        }
    }

    /// Keywords followed by a trailing space, or an empty string
    pub fn render(&self) -> String {
        let mut words: Vec<&str> = Vec::new();
        match self.visibility {
            Visibility::Public => words.push("public"),
            Visibility::Private => words.push("private"),
            Visibility::Protected => words.push("protected"),
            Visibility::Internal => words.push("internal"),
            Visibility::Unspecified => {}
        }
        if self.is_const {
            words.push("const");
        } else if self.is_static {
            words.push("static");
        }
        if self.is_abstract {
            words.push("abstract");
        }
        if self.is_virtual {
            words.push("virtual");
        }
        if self.is_override {
            words.push("override");
        }
        if self.is_sealed {
            words.push("sealed");
        }
        if self.is_readonly {
            words.push("readonly");
        }
        if self.is_partial {
            words.push("partial");
        }
        if words.is_empty() {
            String::new()
        } else {
            format!("{} ", words.join(" "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeData {
    pub ty: TypeRef,
    #[serde(default)]
    pub arguments: Vec<Value>,
    #[serde(default)]
    pub named_arguments: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericParameter {
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<TypeRef>,
    /// Keyword constraints such as `class`, `struct` or `new()`
    #[serde(default)]
    pub special_constraints: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterModifier {
    #[default]
    None,
    Ref,
    Out,
    In,
    Params,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub modifier: ParameterModifier,
    #[serde(default)]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessorDeclaration {
    /// Extra accessor modifiers, e.g. `private set`
    #[serde(default)]
    pub visibility: Option<Visibility>,
    /// Body container; `None` makes an auto accessor
    #[serde(default)]
    pub container: Option<ContainerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub getter: Option<AccessorDeclaration>,
    #[serde(default)]
    pub setter: Option<AccessorDeclaration>,
    /// Initializer of an auto property
    #[serde(default)]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDeclaration {
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    pub container: ContainerId,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub return_type: TypeRef,
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    #[serde(default)]
    pub generic_parameters: Vec<GenericParameter>,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
    #[serde(default)]
    pub summary: Option<String>,
    pub container: ContainerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    #[serde(default)]
    pub value: Option<i64>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inheritance {
    #[serde(default)]
    pub base: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub name: String,
    /// Identifier passed to the runtime debug API; defaults to the name
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// One generated type and everything needed to emit it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    pub metadata: GraphMetadata,
    #[serde(default)]
    pub kind: DeclarationKind,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
    #[serde(default)]
    pub generic_parameters: Vec<GenericParameter>,
    #[serde(default)]
    pub inheritance: Inheritance,
    #[serde(default)]
    pub enum_members: Vec<EnumMember>,
    #[serde(default)]
    pub variables: Vec<VariableDeclaration>,
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
    #[serde(default)]
    pub constructors: Vec<ConstructorDeclaration>,
    #[serde(default)]
    pub functions: Vec<FunctionDeclaration>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub nodes: Vec<NodeInstance>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub nested_types: Vec<GraphDescription>,
}

impl GraphDescription {
    pub fn new(name: &str) -> Self {
        Self {
            metadata: GraphMetadata {
                name: name.to_string(),
                ..GraphMetadata::default()
            },
            ..Self::default()
        }
    }

    pub(crate) fn empty() -> &'static GraphDescription {
        static EMPTY: OnceLock<GraphDescription> = OnceLock::new();
        EMPTY.get_or_init(GraphDescription::default)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn uid(&self) -> &str {
        self.metadata.uid.as_deref().unwrap_or(&self.metadata.name)
    }

    pub fn main_graph(&self) -> Option<&Container> {
        self.containers.iter().find(|c| c.kind == ContainerKind::MainGraph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_render_in_keyword_order() {
        let modifiers = Modifiers {
            visibility: Visibility::Protected,
            is_static: true,
            is_readonly: true,
            ..Modifiers::default()
        };
        assert_eq!(modifiers.render(), "protected static readonly ");

        let bare = Modifiers {
            visibility: Visibility::Unspecified,
            ..Modifiers::default()
        };
        assert_eq!(bare.render(), "");
    }

    #[test]
    fn const_replaces_static() {
        let modifiers = Modifiers {
            is_const: true,
            is_static: true,
            ..Modifiers::default()
        };
        assert_eq!(modifiers.render(), "public const ");
    }

    #[test]
    fn graph_round_trips_through_json() {
        let mut builder = GraphBuilder::new("Player");
        let function = builder.add_function("Jump", TypeRef::void());
        let log = builder
            .add_node(function.container, "invoke", "Log")
            .flow_in("in")
            .flow_out("out")
            .build();
        builder.connect(function.entry, "body", log, "in");
        let graph = builder.build();

        let json = graph.to_json().unwrap();
        let restored = GraphDescription::from_json(&json).unwrap();
        assert_eq!(restored, graph);
    }
}
