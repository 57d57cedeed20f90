//! # Flow Nodes
//!
//! Nodes that drive execution: entries, events, branching, loops, returns,
//! coroutines and groups. Each generates statements for its flow input and
//! continues through its flow outputs.

use super::{NodeGenerator, NodeLibrary, StateExecution};
use crate::codegen::debug::{strip_markers, MarkerId};
use crate::codegen::naming::sanitize;
use crate::codegen::records::{MethodSpec, RecordKey, VariableSpec};
use crate::codegen::state::BlockKind;
use crate::codegen::{statements, CodeGenerator};
use crate::error::{GeneratorError, Result};
use crate::graph::{ContainerKind, NodeInstance, Port, PortKind, TypeRef, Value};

pub(crate) fn register(library: &mut NodeLibrary) {
    library
        .register("entry", EntryNode)
        .register("event", EventNode)
        .register("sequence", SequenceNode)
        .register("branch", BranchNode)
        .register("switch", SwitchNode)
        .register("for", ForNode)
        .register("foreach", ForeachNode)
        .register("while", WhileNode)
        .register("return", ReturnNode)
        .register("yield", YieldNode)
        .register("run_coroutine", RunCoroutineNode)
        .register("group", GroupNode)
        .register("group_entry", GroupEntryNode)
        .register("group_exit", GroupExitNode);
}

/// Error for a port the node never registered for generation
pub(crate) fn not_generated(node: &NodeInstance, port: &Port) -> GeneratorError {
    GeneratorError::InvalidOperation(format!(
        "node \"{}\" (#{}) does not generate port '{}'",
        node.display_title(),
        node.id,
        port.name
    ))
}

/// Body entry of a function, constructor or accessor. Only its `body`
/// output is followed; it has nothing to generate itself.
pub struct EntryNode;

impl NodeGenerator for EntryNode {
    fn on_generator_initialize(&self, _gen: &mut CodeGenerator<'_>, _node: &NodeInstance) -> Result<()> {
        Ok(())
    }

    fn generate_port(&self, _gen: &mut CodeGenerator<'_>, node: &NodeInstance, port: &Port) -> Result<String> {
        Err(not_generated(node, port))
    }
}

/// Main graph event such as `Start` or `Update`. Emits a method named after
/// its `event` property.
pub struct EventNode;

impl NodeGenerator for EventNode {
    fn on_generator_initialize(&self, _gen: &mut CodeGenerator<'_>, _node: &NodeInstance) -> Result<()> {
        Ok(())
    }

    fn generate_port(&self, _gen: &mut CodeGenerator<'_>, node: &NodeInstance, port: &Port) -> Result<String> {
        Err(not_generated(node, port))
    }

    fn generate_event_code(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance) -> Result<()> {
        let event = node.property_str("event").unwrap_or(node.display_title());
        let body = gen.in_block(BlockKind::Method, false, |g| g.flow_output(node, "out"))?;
        if body.trim().is_empty() {
            return Ok(());
        }
        gen.insert_method_code(&MethodSpec::new(&sanitize(event), "void"), body, 0)
    }

    fn is_event(&self) -> bool {
        true
    }
}

/// Runs every flow output in declaration order
pub struct SequenceNode;

impl NodeGenerator for SequenceNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let outputs: Vec<&str> = node.ports_of(PortKind::FlowOutput).map(|p| p.name.as_str()).collect();
        let mut parts = Vec::with_capacity(outputs.len());
        for output in outputs {
            parts.push(gen.flow_output(node, output)?);
        }
        Ok(statements::flow(&parts))
    }
}

/// `if` on `condition`, then `next`
pub struct BranchNode;

impl NodeGenerator for BranchNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let condition = gen.value_input(node, "condition")?;
        let then = gen.optional_flow_output(node, "true")?;
        let otherwise = gen.optional_flow_output(node, "false")?;

        let branch = match (then.trim().is_empty(), otherwise.trim().is_empty()) {
            (true, true) => String::new(),
            (true, false) => statements::if_statement(&statements::unary("!", &condition), &otherwise, None),
            _ => statements::if_statement(&condition, &then, Some(&otherwise)),
        };
        let next = gen.optional_flow_output(node, "next")?;
        Ok(statements::flow(&[branch, next]))
    }
}

/// `switch` on `value`. The `cases` property lists the labels; label `i`
/// continues through the `case{i}` output.
pub struct SwitchNode;

impl NodeGenerator for SwitchNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let value = gen.value_input(node, "value")?;
        let labels = node
            .property("cases")
            .and_then(Value::items)
            .ok_or_else(|| GeneratorError::missing_property(node.id, "cases"))?;

        let mut cases = Vec::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            let label = gen.value(label)?;
            let body = gen.optional_flow_output(node, &format!("case{}", i))?;
            cases.push((vec![label], body));
        }
        let default = gen.optional_flow_output(node, "default")?;
        let switch = statements::switch_statement(&value, &cases, Some(&default));
        let next = gen.optional_flow_output(node, "next")?;
        Ok(statements::flow(&[switch, next]))
    }
}

/// Counting loop from `start` to `end` (exclusive) by `step`. The counter is
/// exposed through the `index` output.
pub struct ForNode;

impl ForNode {
    fn counter(gen: &CodeGenerator<'_>, node: &NodeInstance) -> Result<String> {
        gen.variable_name(&RecordKey::Node(node.id))
            .ok_or_else(|| GeneratorError::missing_port(node.id, "index"))
    }
}

impl NodeGenerator for ForNode {
    fn on_generator_initialize(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance) -> Result<()> {
        gen.register_ports(node)?;
        let ty = node.port("index").and_then(|p| p.ty.clone()).unwrap_or_else(TypeRef::int);
        let spec = VariableSpec::new("index", ty, gen.storage_for(node)).with_modifiers("private ".to_string());
        gen.register_variable(RecordKey::Node(node.id), spec)?;
        Ok(())
    }

    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, port: &Port) -> Result<String> {
        let index = Self::counter(gen, node)?;
        if port.kind == PortKind::ValueOutput {
            return Ok(index);
        }

        let start = gen.value_input(node, "start")?;
        let end = gen.value_input(node, "end")?;
        let step = match node.port("step") {
            Some(_) => gen.value_input(node, "step")?,
            None => "1".to_string(),
        };
        let body = gen.optional_flow_output(node, "body")?;
        let iterator = if strip_markers(&step) == "1" {
            format!("{}++", index)
        } else {
            format!("{} += {}", index, step)
        };
        let code = statements::for_statement(
            &format!("{} = {}", index, start),
            &statements::binary("<", &index, &end),
            &iterator,
            &body,
        );
        let next = gen.optional_flow_output(node, "next")?;
        Ok(statements::flow(&[code, next]))
    }
}

/// Iterates `collection`; the current item is the `element` output
pub struct ForeachNode;

impl NodeGenerator for ForeachNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, port: &Port) -> Result<String> {
        let element = gen.name_for(&RecordKey::Node(node.id), "element");
        if port.kind == PortKind::ValueOutput {
            return Ok(element);
        }

        let collection = gen.value_input(node, "collection")?;
        let element_type = match node.port("element").and_then(|p| p.ty.as_ref()) {
            Some(ty) => gen.type_name(ty),
            None => "var".to_string(),
        };
        let body = gen.optional_flow_output(node, "body")?;
        let code = statements::foreach_statement(&element_type, &element, &collection, &body);
        let next = gen.optional_flow_output(node, "next")?;
        Ok(statements::flow(&[code, next]))
    }
}

pub struct WhileNode;

impl NodeGenerator for WhileNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let condition = gen.value_input(node, "condition")?;
        let body = gen.optional_flow_output(node, "body")?;
        let code = statements::while_statement(&condition, &body);
        let next = gen.optional_flow_output(node, "next")?;
        Ok(statements::flow(&[code, next]))
    }
}

/// Leaves the current body, with `value` when one is wired or defaulted
pub struct ReturnNode;

impl NodeGenerator for ReturnNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let has_value = node
            .port("value")
            .map(|p| p.default.is_some() || gen.is_connected(node, "value"))
            .unwrap_or(false);
        if has_value {
            let value = gen.value_input(node, "value")?;
            return Ok(statements::return_statement(Some(&value)));
        }
        if gen.allow_yield() {
            Ok(statements::yield_break())
        } else {
            Ok(statements::return_statement(None))
        }
    }
}

/// Suspends for one step, or until the yielded `value` completes
pub struct YieldNode;

impl NodeGenerator for YieldNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        if !gen.allow_yield() {
            return Err(GeneratorError::YieldNotAllowed);
        }
        let value = match node.port("value") {
            Some(_) => gen.value_input(node, "value")?,
            None => "null".to_string(),
        };
        let out = gen.optional_flow_output(node, "out")?;
        Ok(statements::flow(&[statements::yield_return(&value), out]))
    }

    fn is_coroutine(&self, _node: &NodeInstance) -> bool {
        true
    }
}

/// Starts the `routine` iterator as its own state flow and continues through
/// `out` once it stops.
pub struct RunCoroutineNode;

impl NodeGenerator for RunCoroutineNode {
    fn on_generator_initialize(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance) -> Result<()> {
        gen.register_ports(node)?;
        let input = node.port("in").ok_or_else(|| GeneratorError::missing_port(node.id, "in"))?;
        gen.register_as_state_flow(input.id)
    }

    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        if !gen.allow_yield() {
            return Err(GeneratorError::YieldNotAllowed);
        }
        let routine = gen.value_input(node, "routine")?;
        let out = gen.optional_flow_output(node, "out")?;
        Ok(statements::flow(&[statements::yield_return(&routine), out]))
    }

    fn is_coroutine(&self, _node: &NodeInstance) -> bool {
        true
    }

    fn state_execution(
        &self,
        gen: &mut CodeGenerator<'_>,
        node: &NodeInstance,
        _port: &Port,
    ) -> Result<Option<StateExecution>> {
        let routine = gen.value_input(node, "routine")?;
        let on_stop = gen.in_block(BlockKind::Lambda, false, |g| g.optional_flow_output(node, "out"))?;
        Ok(Some(StateExecution {
            factory: statements::lambda_expression(&[], &routine),
            on_stop: (!on_stop.trim().is_empty()).then_some(on_stop),
        }))
    }
}

/// Inlines its child container. Flow continues through `exit` after the
/// body, unless the body leaves through a group exit node itself.
pub struct GroupNode;

impl NodeGenerator for GroupNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let Some(container) = gen.index().group_of(node.id) else {
            return gen.optional_flow_output(node, "exit");
        };

        let body = match container.entry {
            Some(entry) => {
                let entry = gen.node(entry)?;
                gen.flow_output(entry, "out")?
            }
            None => String::new(),
        };
        let body = match &container.kind {
            ContainerKind::Group {
                reference: Some(reference),
                ..
            } => gen.mark(MarkerId::Reference(*reference), &body),
            _ => body,
        };

        let has_exit = gen
            .graph()
            .nodes
            .iter()
            .any(|n| n.container == container.id && n.node_type == "group_exit");
        if has_exit {
            Ok(body)
        } else {
            let exit = gen.optional_flow_output(node, "exit")?;
            Ok(statements::flow(&[body, exit]))
        }
    }
}

/// Start of a group body
pub struct GroupEntryNode;

impl NodeGenerator for GroupEntryNode {
    fn on_generator_initialize(&self, _gen: &mut CodeGenerator<'_>, _node: &NodeInstance) -> Result<()> {
        Ok(())
    }

    fn generate_port(&self, _gen: &mut CodeGenerator<'_>, node: &NodeInstance, port: &Port) -> Result<String> {
        Err(not_generated(node, port))
    }
}

/// Leaves a group and continues through the owner's `exit`
pub struct GroupExitNode;

impl NodeGenerator for GroupExitNode {
    fn generate_port(&self, gen: &mut CodeGenerator<'_>, node: &NodeInstance, _port: &Port) -> Result<String> {
        let owner = match gen.index().container(node.container).map(|c| &c.kind) {
            Some(ContainerKind::Group { owner, .. }) => *owner,
            _ => {
                return Err(GeneratorError::InvalidOperation(format!(
                    "group exit #{} is not inside a group",
                    node.id
                )))
            }
        };
        let owner = gen.node(owner)?;
        gen.optional_flow_output(owner, "exit")
    }
}
