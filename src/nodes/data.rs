//! # Data Nodes
//!
//! Literals, operators, variable access, calls and object construction.
//! Most are pure: their value outputs render to expressions that are
//! inlined wherever they are read.

use super::flow::not_generated;
use super::{NodeGenerator, NodeLibrary};
use crate::codegen::records::{RecordKey, VariableSpec};
use crate::codegen::state::BlockKind;
use crate::codegen::{statements, CodeGenerator};
use crate::error::{GeneratorError, Result};
use crate::graph::{ContainerKind, NodeInstance, Port, PortKind, TypeRef, Value};

pub(crate) fn register(library: &mut NodeLibrary) {
    library
        .register("literal", LiteralNode)
        .register("operator", OperatorNode)
        .register("get_variable", GetVariableNode)
        .register("set_variable", SetVariableNode)
        .register("get_local", GetLocalNode)
        .register("set_local", SetLocalNode)
        .register("assign", AssignNode)
        .register("parameter", ParameterNode)
        .register("self", SelfNode)
        .register("object_ref", ObjectRefNode)
        .register("invoke", InvokeNode)
        .register("lambda", LambdaNode)
        .register("new_object", NewObjectNode);
}

fn required_str<'n>(node: &'n NodeInstance, property: &str) -> Result<&'n str> {
    node.property_str(property)
        .ok_or_else(|| GeneratorError::missing_property(node.id, property))
}

/// Value inputs that are call arguments, in declaration order
fn arguments(gen: &mut CodeGenerator<'_>, node: &NodeInstance, skip: &[&str]) -> Result<Vec<String>> {
    let names: Vec<&str> = node
        .ports_of(PortKind::ValueInput)
        .map(|p| p.name.as_str())
        .filter(|name| !skip.contains(name))
        .collect();
    let mut arguments = Vec::with_capacity(names.len());
    for name in names {
        arguments.push(gen.value_input(node, name)?);
    }
    Ok(arguments)
}

/// Name of the class variable named by the `variable` property
fn class_variable(gen: &CodeGenerator<'_>, node: &NodeInstance) -> Result<String> {
    let name = required_str(node, "variable")?;
    gen.graph()
        .variables
        .iter()
        .position(|v| v.name == name)
        .and_then(|slot| gen.variable_name(&RecordKey::Variable(slot)))
        .ok_or_else(|| GeneratorError::missing_property(node.id, "variable"))
}

/// Name of the local named by the `local` property. Locals of enclosing
/// bodies are visible from inside groups.
fn local_variable(gen: &CodeGenerator<'_>, node: &NodeInstance) -> Result<String> {
    let name = required_str(node, "local")?;
    let index = gen.index();
    let mut current = index.container(node.container);
    while let Some(container) = current {
        if let Some(slot) = container.locals.iter().position(|l| l.name == name) {
            return gen
                .variable_name(&RecordKey::Local(container.id, slot))
                .ok_or_else(|| GeneratorError::missing_property(node.id, "local"));
        }
        current = match &container.kind {
            ContainerKind::Group { owner, .. } => index.node(*owner).and_then(|o| index.container(o.container)),
            _ => None,
        };
    }
    Err(GeneratorError::missing_property(node.id, "local"))
}

/// Assignment of `value` to `target`, then `out`
fn assignment(gen: &mut CodeGenerator<'_>, node: &NodeInstance, target: &str) -> Result<String> {
    let value = gen.value_input(node, "value")?;
    let code = statements::set(target, &value, node.property_str("op"));
    let out = gen.optional_flow_output(node, "out")?;
    Ok(statements::flow(&[code, out]))
}

/// Constant from the `value` property
pub struct LiteralNode;

impl NodeGenerator for LiteralNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let value = node
            .property("value")
            .ok_or_else(|| GeneratorError::missing_property(node.id, "value"))?;
        gen.value(value)
    }
}

/// Unary or binary operator named by `op`, applied to `a` (and `b`)
pub struct OperatorNode;

impl NodeGenerator for OperatorNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let op = required_str(node, "op")?;
        let binary = node.port("b").is_some();
        if binary && statements::is_binary_operator(op) {
            let left = gen.value_input(node, "a")?;
            let right = gen.value_input(node, "b")?;
            Ok(statements::binary(op, &left, &right))
        } else if !binary && statements::is_unary_operator(op) {
            let operand = gen.value_input(node, "a")?;
            Ok(statements::unary(op, &operand))
        } else {
            Err(GeneratorError::UnsupportedValue(format!("operator '{}'", op)))
        }
    }
}

pub struct GetVariableNode;

impl NodeGenerator for GetVariableNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        class_variable(gen, node)
    }
}

/// Assigns `value` to a class variable, optionally with a compound `op`
pub struct SetVariableNode;

impl NodeGenerator for SetVariableNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, port: &Port) -> Result<String> {
        let target = class_variable(gen, node)?;
        if port.kind == PortKind::ValueOutput {
            return Ok(target);
        }
        assignment(gen, node, &target)
    }
}

/// Assigns `value` to the expression connected to `target`
pub struct AssignNode;

impl NodeGenerator for AssignNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        if !gen.is_connected(node, "target") {
            return Err(GeneratorError::UnsupportedValue(format!(
                "assignment target of node #{} is not connected",
                node.id
            )));
        }
        let target = gen.value_input_target(node, "target")?;
        assignment(gen, node, &target)
    }
}

pub struct GetLocalNode;

impl NodeGenerator for GetLocalNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        local_variable(gen, node)
    }
}

pub struct SetLocalNode;

impl NodeGenerator for SetLocalNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, port: &Port) -> Result<String> {
        let target = local_variable(gen, node)?;
        if port.kind == PortKind::ValueOutput {
            return Ok(target);
        }
        assignment(gen, node, &target)
    }
}

/// Parameter of the enclosing method, by `name`
pub struct ParameterNode;

impl NodeGenerator for ParameterNode {
    fn generate_port(&self, _gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        required_str(node, "name").map(str::to_string)
    }
}

/// The instance owning the generated code
pub struct SelfNode;

impl NodeGenerator for SelfNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        if gen.graph().modifiers.is_static {
            return Err(GeneratorError::UnsupportedValue(format!(
                "node #{} reads 'this' in a static class",
                node.id
            )));
        }
        Ok(gen.owner_expression().to_string())
    }
}

/// Host object from the `object` property, hoisted into a field
pub struct ObjectRefNode;

impl NodeGenerator for ObjectRefNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        match node.property("object") {
            Some(object @ Value::Object(_)) => gen.value(object),
            _ => Err(GeneratorError::missing_property(node.id, "object")),
        }
    }
}

/// Method call. `method` names the method; the target is the `instance`
/// input, the `target_type` property for static calls, or the class itself.
/// Every other value input is an argument.
///
/// With flow ports the call is a statement and a connected `result` is
/// stored in a variable; without them the call is an inline expression.
pub struct InvokeNode;

impl InvokeNode {
    fn call(gen: &mut CodeGenerator<'_>, node: &NodeInstance) -> Result<String> {
        let method = required_str(node, "method")?;
        let target = if node.port("instance").is_some() {
            Some(gen.value_input(node, "instance")?)
        } else {
            node.property("target_type")
                .and_then(Value::as_type)
                .map(|ty| gen.type_name(ty))
        };
        let generics: Vec<String> = match node.property("generic_arguments").and_then(Value::items) {
            Some(items) => items
                .iter()
                .filter_map(Value::as_type)
                .map(|ty| gen.type_name(ty))
                .collect(),
            None => Vec::new(),
        };
        let arguments = arguments(gen, node, &["instance"])?;
        Ok(statements::invoke(target.as_deref(), method, &generics, &arguments))
    }

    fn has_flow(node: &NodeInstance) -> bool {
        node.ports_of(PortKind::FlowInput).next().is_some()
    }
}

impl NodeGenerator for InvokeNode {
    fn on_generator_initialize(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance) -> Result<()> {
        gen.register_ports(node)?;
        if !Self::has_flow(node) {
            return Ok(());
        }
        if let Some(result) = node.port("result").filter(|p| gen.index().is_connected(p.id)) {
            let ty = result.ty.clone().unwrap_or_else(TypeRef::object);
            let base = format!("{}Result", node.property_str("method").unwrap_or("call"));
            let spec = VariableSpec::new(&base, ty, gen.storage_for(node)).with_modifiers("private ".to_string());
            gen.register_variable(RecordKey::Node(node.id), spec)?;
        }
        Ok(())
    }

    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, port: &Port) -> Result<String> {
        let stored = gen.variable_name(&RecordKey::Node(node.id));
        match port.kind {
            PortKind::ValueOutput => match stored {
                Some(name) => Ok(name),
                None if Self::has_flow(node) => Err(GeneratorError::InvalidOperation(format!(
                    "result of \"{}\" (#{}) read without being stored",
                    node.display_title(),
                    node.id
                ))),
                None => Self::call(gen, node),
            },
            PortKind::FlowInput => {
                let call = Self::call(gen, node)?;
                let code = match stored {
                    Some(name) => statements::set(&name, &call, None),
                    None => statements::statement(&call),
                };
                let out = gen.optional_flow_output(node, "out")?;
                Ok(statements::flow(&[code, out]))
            }
            _ => Err(not_generated(node, port)),
        }
    }
}

/// Anonymous function whose statements follow the `body` output
pub struct LambdaNode;

impl NodeGenerator for LambdaNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let parameters: Vec<String> = match node.property("parameters").and_then(Value::items) {
            Some(items) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            None => Vec::new(),
        };
        let body = gen.in_block(BlockKind::Lambda, false, |g| g.optional_flow_output(node, "body"))?;
        Ok(statements::lambda(&parameters, &body))
    }
}

/// `new T(args)` for the `type` property
pub struct NewObjectNode;

impl NodeGenerator for NewObjectNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let ty = node
            .property("type")
            .and_then(Value::as_type)
            .ok_or_else(|| GeneratorError::missing_property(node.id, "type"))?;
        let type_name = gen.type_name(ty);
        let arguments = arguments(gen, node, &[])?;
        Ok(statements::new_object(&type_name, &arguments))
    }
}
