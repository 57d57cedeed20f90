//! # Class Assembler
//!
//! Generates the declared members of a class graph and assembles all of the
//! class records into one declaration.

use super::records::{AccessorRecord, ConstructorRecord, MethodSpec, PropertyRecord, VariableRecord};
use super::state::BlockKind;
use super::{statements, ClassScope, CodeGenerator};
use crate::error::{GeneratorError, Result};
use crate::graph::{
    AccessorDeclaration, AttributeData, ContainerId, DeclarationKind, GenericParameter, GraphDescription,
    ParameterDeclaration, ParameterModifier, Visibility,
};

/// `/// <summary>` block for `summary`, or nothing
pub fn doc_comment(summary: Option<&str>) -> String {
    match summary.map(str::trim).filter(|s| !s.is_empty()) {
        Some(summary) => {
            let mut lines = vec!["/// <summary>".to_string()];
            lines.extend(summary.lines().map(|l| format!("/// {}", l.trim_end())));
            lines.push("/// </summary>".to_string());
            lines.join("\n")
        }
        None => String::new(),
    }
}

fn accessor_visibility(visibility: Option<Visibility>) -> String {
    match visibility {
        Some(Visibility::Private) => "private ".to_string(),
        Some(Visibility::Protected) => "protected ".to_string(),
        Some(Visibility::Internal) => "internal ".to_string(),
        _ => String::new(),
    }
}

/// Declaration head: doc comment, attributes, then `line`
fn declaration(summary: Option<&str>, attributes: &[String], line: String) -> String {
    let mut parts = vec![doc_comment(summary)];
    parts.extend(attributes.iter().cloned());
    parts.push(line);
    statements::flow(&parts)
}

impl<'a> CodeGenerator<'a> {
    /// `[Type(arguments, Name = value)]`
    pub fn attribute(&mut self, attribute: &AttributeData) -> Result<String> {
        let mut name = self.type_name(&attribute.ty);
        if name.len() > "Attribute".len() && name.ends_with("Attribute") {
            name.truncate(name.len() - "Attribute".len());
        }
        let mut arguments = Vec::with_capacity(attribute.arguments.len() + attribute.named_arguments.len());
        for argument in &attribute.arguments {
            arguments.push(self.value(argument)?);
        }
        for (member, value) in &attribute.named_arguments {
            arguments.push(format!("{} = {}", member, self.value(value)?));
        }
        if arguments.is_empty() {
            Ok(format!("[{}]", name))
        } else {
            Ok(format!("[{}({})]", name, arguments.join(", ")))
        }
    }

    fn attributes(&mut self, attributes: &[AttributeData]) -> Result<Vec<String>> {
        attributes.iter().map(|a| self.attribute(a)).collect()
    }

    fn parameter(&mut self, parameter: &ParameterDeclaration) -> Result<(String, String)> {
        let ty = self.type_name(&parameter.ty);
        let modifier = match parameter.modifier {
            ParameterModifier::None => "",
            ParameterModifier::Ref => "ref ",
            ParameterModifier::Out => "out ",
            ParameterModifier::In => "in ",
            ParameterModifier::Params => "params ",
        };
        let mut code = format!("{}{} {}", modifier, ty, parameter.name);
        if let Some(default) = &parameter.default {
            code.push_str(" = ");
            code.push_str(&self.value(default)?);
        }
        Ok((format!("{}{}", modifier, ty), code))
    }

    fn parameters(&mut self, parameters: &[ParameterDeclaration]) -> Result<(Vec<String>, Vec<String>)> {
        let mut types = Vec::with_capacity(parameters.len());
        let mut rendered = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let (ty, code) = self.parameter(parameter)?;
            types.push(ty);
            rendered.push(code);
        }
        Ok((types, rendered))
    }

    /// `where T : class, IComparable, new()` for each constrained parameter
    fn constraints(&mut self, generics: &[GenericParameter]) -> Vec<String> {
        let mut clauses = Vec::new();
        for generic in generics {
            let mut items: Vec<String> = generic
                .special_constraints
                .iter()
                .filter(|c| c.as_str() != "new()")
                .cloned()
                .collect();
            items.extend(generic.constraints.iter().map(|c| self.types.name(c)));
            if generic.special_constraints.iter().any(|c| c == "new()") {
                items.push("new()".to_string());
            }
            if !items.is_empty() {
                clauses.push(format!("where {} : {}", generic.name, items.join(", ")));
            }
        }
        clauses
    }

    /// Generates the body of a container whose entry starts with `body`
    fn container_body(&mut self, container: ContainerId, kind: BlockKind, allow_yield: bool) -> Result<String> {
        let Some(entry) = self.class.index.container(container).and_then(|c| c.entry) else {
            return Ok(String::new());
        };
        let entry = self.node(entry)?;
        self.in_block(kind, allow_yield, |g| g.flow_output(entry, "body"))
    }

    /// Properties and constructors
    pub fn generate_members(&mut self) -> Result<()> {
        let graph = self.class.graph;
        tracing::debug!(
            "[GEN] Generating {} properties and {} constructors of '{}'",
            graph.properties.len(),
            graph.constructors.len(),
            self.class.state.class_name
        );

        for property in &graph.properties {
            let getter = self.accessor(property.getter.as_ref())?;
            let setter = self.accessor(property.setter.as_ref())?;
            let is_auto = getter.as_ref().map(|a| a.body.is_none()).unwrap_or(true)
                && setter.as_ref().map(|a| a.body.is_none()).unwrap_or(true);
            let initializer = match (&property.default, is_auto) {
                (Some(value), true) => Some(self.value(value)?),
                _ => None,
            };
            let record = PropertyRecord {
                name: property.name.clone(),
                ty: self.type_name(&property.ty),
                modifiers: property.modifiers.render(),
                attributes: self.attributes(&property.attributes)?,
                summary: property.summary.clone(),
                getter,
                setter,
                initializer,
            };
            self.class.properties.push(record);
        }

        for constructor in &graph.constructors {
            let (_, parameters) = self.parameters(&constructor.parameters)?;
            let body = self.container_body(constructor.container, BlockKind::Method, false)?;
            self.class.constructors.push(ConstructorRecord {
                modifiers: constructor.modifiers.render(),
                parameters,
                summary: constructor.summary.clone(),
                container: constructor.container,
                body,
            });
        }
        Ok(())
    }

    fn accessor(&mut self, accessor: Option<&AccessorDeclaration>) -> Result<Option<AccessorRecord>> {
        let Some(accessor) = accessor else {
            return Ok(None);
        };
        let body = match accessor.container {
            Some(container) => Some(self.container_body(container, BlockKind::Accessor, false)?),
            None => None,
        };
        Ok(Some(AccessorRecord {
            modifiers: accessor_visibility(accessor.visibility),
            body,
            container: accessor.container,
        }))
    }

    /// Generates the declared function at `slot`
    pub fn generate_function(&mut self, slot: usize) -> Result<()> {
        let graph = self.class.graph;
        let function = graph
            .functions
            .get(slot)
            .ok_or_else(|| GeneratorError::InvalidOperation(format!("no function at index {}", slot)))?;
        tracing::debug!("[GEN] Generating function '{}'", function.name);

        let class_static = self.class.state.is_static;
        self.class.state.is_static = class_static || function.modifiers.is_static;
        let body = self.container_body(function.container, BlockKind::Method, function.return_type.is_iterator());
        self.class.state.is_static = class_static;
        let body = body?;

        let (parameter_types, parameters) = self.parameters(&function.parameters)?;
        let spec = MethodSpec {
            name: function.name.clone(),
            return_type: self.type_name(&function.return_type),
            parameters,
            parameter_types,
            modifiers: function.modifiers.render(),
        };
        let generics: Vec<String> = function.generic_parameters.iter().map(|g| g.name.clone()).collect();
        let constraints = self.constraints(&function.generic_parameters);
        let attributes = self.attributes(&function.attributes)?;

        let record = self.class.methods.get_or_create(&spec)?;
        record.generic_parameters = generics;
        record.constraints = constraints;
        record.attributes = attributes;
        record.summary = function.summary.clone();
        record.container = Some(function.container);
        record.add_fragment(body, 0);
        Ok(())
    }

    /// Lets every event node contribute its method code
    pub fn generate_events(&mut self) -> Result<()> {
        let events = self.class.classification.events().to_vec();
        for id in events {
            let node = self.node(id)?;
            let Some(generator) = self.library.get(&node.node_type) else {
                continue;
            };
            tracing::debug!("[GEN] Generating event \"{}\" (#{})", node.display_title(), id);
            if let Err(e) = generator.generate_event_code(self, node) {
                let error = super::wrap_node_error(node, e);
                self.recover(node, error, ())?;
            }
        }
        Ok(())
    }

    /// Generates a nested type with its own class scope
    fn generate_nested(&mut self, graph: &'a GraphDescription) -> Result<String> {
        let outer = std::mem::replace(&mut self.class, ClassScope::empty(self.options));
        let result = self.generate_class(graph);
        self.class = outer;
        result
    }

    /// Runs every step for `graph` at once and returns its declaration
    pub fn generate_class(&mut self, graph: &'a GraphDescription) -> Result<String> {
        for id in self.begin_class(graph)? {
            let result = self.initialize_node(id);
            self.absorb(result)?;
        }
        self.finish_initialization()?;
        let result = self.generate_members();
        self.absorb(result)?;
        for slot in 0..graph.functions.len() {
            let result = self.generate_function(slot);
            self.absorb(result)?;
        }
        let result = self.generate_events();
        self.absorb(result)?;
        let result = self.lower_state_flows();
        self.absorb(result)?;
        self.assemble_class()
    }

    fn locals(&mut self, container: Option<ContainerId>) -> Vec<String> {
        let Some(container) = container else {
            return Vec::new();
        };
        let locals: Vec<VariableRecord> = self.class.variables.locals_of(container).cloned().collect();
        locals
            .into_iter()
            .map(|local| {
                let ty = self.type_name(&local.ty);
                match &local.initializer {
                    Some(value) => format!("{} {} = {};", ty, local.name, value),
                    None => format!("{} {};", ty, local.name),
                }
            })
            .collect()
    }

    fn body_with_locals(&mut self, container: Option<ContainerId>, body: &str) -> String {
        let mut parts = self.locals(container);
        parts.push(body.to_string());
        statements::flow(&parts)
    }

    /// Assembles the records of the current class into its declaration
    pub fn assemble_class(&mut self) -> Result<String> {
        let graph = self.class.graph;
        let class_name = self.class.state.class_name.clone();
        tracing::info!("[GEN] Assembling class '{}'", class_name);

        let base = graph.inheritance.base.as_ref();
        let value_base = base.map(|b| b.is_value_type()).unwrap_or(false);
        let keyword = match graph.kind {
            DeclarationKind::Enum => "enum",
            _ if value_base => "struct",
            DeclarationKind::Interface if base.is_none() => "interface",
            DeclarationKind::Struct => "struct",
            _ => "class",
        };

        let mut head = format!("{}{} {}", graph.modifiers.render(), keyword, class_name);
        if !graph.generic_parameters.is_empty() {
            let names: Vec<&str> = graph.generic_parameters.iter().map(|g| g.name.as_str()).collect();
            head.push_str(&format!("<{}>", names.join(", ")));
        }
        let mut bases = Vec::new();
        if let Some(base) = base.filter(|_| !value_base && keyword != "enum") {
            if !base.is_system("Object") {
                bases.push(self.type_name(base));
            }
        }
        for interface in &graph.inheritance.interfaces {
            bases.push(self.type_name(interface));
        }
        if !bases.is_empty() {
            head.push_str(&format!(" : {}", bases.join(", ")));
        }
        for clause in self.constraints(&graph.generic_parameters) {
            head.push(' ');
            head.push_str(&clause);
        }

        let body = if keyword == "enum" {
            self.enum_body(graph)
        } else {
            self.class_body(graph, keyword == "interface")?
        };

        let attributes = self.attributes(&graph.attributes)?;
        let head = declaration(graph.metadata.summary.as_deref(), &attributes, head);
        Ok(format!("{} {}", head, statements::block(&body)))
    }

    fn enum_body(&self, graph: &GraphDescription) -> String {
        graph
            .enum_members
            .iter()
            .map(|member| {
                let line = match member.value {
                    Some(value) => format!("{} = {}", member.name, value),
                    None => member.name.clone(),
                };
                declaration(member.summary.as_deref(), &[], line)
            })
            .collect::<Vec<_>>()
            .join(",\n")
    }

    fn class_body(&mut self, graph: &'a GraphDescription, is_interface: bool) -> Result<String> {
        let mut sections: Vec<String> = Vec::new();

        let fields: Vec<VariableRecord> = self.class.variables.instance_fields().cloned().collect();
        let fields: Vec<String> = fields
            .into_iter()
            .map(|field| {
                let ty = self.type_name(&field.ty);
                let line = match &field.initializer {
                    Some(value) => format!("{}{} {} = {};", field.modifiers, ty, field.name, value),
                    None => format!("{}{} {};", field.modifiers, ty, field.name),
                };
                declaration(field.summary.as_deref(), &field.attributes, line)
            })
            .collect();
        sections.push(fields.join("\n"));

        let properties = std::mem::take(&mut self.class.properties);
        let properties: Vec<String> = properties.iter().map(|p| self.property(p)).collect();
        sections.push(properties.join("\n"));

        let constructors = std::mem::take(&mut self.class.constructors);
        let class_name = self.class.state.class_name.clone();
        let constructors: Vec<String> = constructors
            .iter()
            .map(|ctor| {
                let line = format!("{}{}({})", ctor.modifiers, class_name, ctor.parameters.join(", "));
                let body = self.body_with_locals(Some(ctor.container), &ctor.body);
                format!("{} {}", declaration(ctor.summary.as_deref(), &[], line), statements::block(&body))
            })
            .collect();
        sections.push(constructors.join("\n\n"));

        let methods: Vec<_> = self.class.methods.iter().cloned().collect();
        let mut rendered = Vec::with_capacity(methods.len());
        for method in methods {
            let mut line = format!("{}{} {}", method.modifiers, method.return_type, method.name);
            if !method.generic_parameters.is_empty() {
                line.push_str(&format!("<{}>", method.generic_parameters.join(", ")));
            }
            line.push_str(&format!("({})", method.parameters.join(", ")));
            for clause in &method.constraints {
                line.push(' ');
                line.push_str(clause);
            }
            let head = declaration(method.summary.as_deref(), &method.attributes, line);
            if is_interface {
                rendered.push(format!("{};", head));
            } else {
                let body = self.body_with_locals(method.container, &method.body());
                rendered.push(format!("{} {}", head, statements::block(&body)));
            }
        }
        sections.push(rendered.join("\n\n"));

        let mut nested = Vec::with_capacity(graph.nested_types.len());
        for nested_graph in &graph.nested_types {
            nested.push(self.generate_nested(nested_graph)?);
        }
        sections.push(nested.join("\n\n"));

        let sections: Vec<String> = sections.into_iter().filter(|s| !s.trim().is_empty()).collect();
        Ok(sections.join("\n\n"))
    }

    fn property(&mut self, property: &PropertyRecord) -> String {
        let line = format!("{}{} {}", property.modifiers, property.ty, property.name);
        let accessors = [("get", &property.getter), ("set", &property.setter)];
        let is_auto = accessors
            .iter()
            .all(|(_, accessor)| accessor.as_ref().map(|a| a.body.is_none()).unwrap_or(true));

        let code = if is_auto {
            let parts: Vec<String> = accessors
                .iter()
                .filter_map(|(keyword, accessor)| accessor.as_ref().map(|a| format!("{}{};", a.modifiers, keyword)))
                .collect();
            let mut code = format!("{} {{ {} }}", line, parts.join(" "));
            if let Some(initializer) = &property.initializer {
                code.push_str(&format!(" = {};", initializer));
            }
            code
        } else {
            let mut parts = Vec::new();
            for (keyword, accessor) in accessors {
                let Some(accessor) = accessor else {
                    continue;
                };
                match &accessor.body {
                    Some(body) => {
                        let body = self.body_with_locals(accessor.container, body);
                        parts.push(format!("{}{} {}", accessor.modifiers, keyword, statements::block(&body)));
                    }
                    None => parts.push(format!("{}{};", accessor.modifiers, keyword)),
                }
            }
            format!("{} {}", line, statements::block(&parts.join("\n")))
        };
        declaration(property.summary.as_deref(), &property.attributes, code)
    }
}
