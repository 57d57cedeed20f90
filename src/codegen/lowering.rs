//! # State-Machine Lowering
//!
//! Every state entry referenced by a jump owns a coroutine field. After all
//! members are generated, each entry's body is generated on its own (with
//! `yield` legal and the flow cache bypassed) and installed into its field
//! in the setup method:
//!
//! - no `yield` at all: installed as a plain lambda;
//! - a single `yield` on the last meaningful line: the keyword is dropped and
//!   the body still becomes a lambda;
//! - anything else: the body becomes a `case` of the shared dispatch
//!   iterator.

use super::debug::strip_markers;
use super::records::{CoroutineBody, EventCoroutineRecord, MethodSpec, RecordKey, Storage, VariableSpec};
use super::state::BlockKind;
use super::{statements, wrap_node_error, CodeGenerator};
use crate::error::{GeneratorError, Result};
use crate::graph::{PortId, TypeRef};

/// Name of the shared dispatch iterator
pub const DISPATCH_METHOD: &str = "__ExecuteCoroutineEvent";

/// Priority of setup statements in the setup method; runs before node code
pub const SETUP_PRIORITY: i32 = -1000;

/// How a generated state body can be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateBodyShape {
    Lambda(String),
    Dispatch(String),
}

fn is_meaningful(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with("//") && !line.starts_with('#')
}

fn is_yield(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("yield return") || line.starts_with("yield break")
}

/// Turns a `yield` statement into the equivalent lambda `return`
fn drop_yield(line: &str) -> String {
    if line.contains("yield return ") {
        line.replacen("yield return ", "return ", 1)
    } else {
        line.replacen("yield break;", "return null;", 1)
    }
}

/// Decides how a state body is installed. Markers are ignored while looking
/// for `yield` but kept in the returned code.
pub fn shape_state_body(code: &str) -> StateBodyShape {
    let lines: Vec<&str> = code.split('\n').collect();
    let plain: Vec<String> = lines.iter().map(|l| strip_markers(l)).collect();
    let yields: Vec<usize> = plain
        .iter()
        .enumerate()
        .filter(|(_, l)| is_yield(l))
        .map(|(i, _)| i)
        .collect();
    let last = plain.iter().rposition(|l| is_meaningful(l));

    match yields.as_slice() {
        [] => StateBodyShape::Lambda(code.to_string()),
        [only] if Some(*only) == last => {
            let mut lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
            lines[*only] = drop_yield(&lines[*only]);
            StateBodyShape::Lambda(lines.join("\n"))
        }
        _ => StateBodyShape::Dispatch(code.to_string()),
    }
}

impl<'a> CodeGenerator<'a> {
    /// Jump into the state entry at `port`, creating its coroutine field on
    /// first use.
    pub fn state_jump(&mut self, port: PortId) -> Result<String> {
        let variable = self.coroutine_variable(port)?;
        let call = format!("{}.Run()", variable);
        if self.class.state.allow_yield() {
            Ok(statements::yield_return(&call))
        } else {
            Ok(statements::statement(&call))
        }
    }

    fn coroutine_variable(&mut self, port: PortId) -> Result<String> {
        if let Some(record) = self.class.coroutines.get(port) {
            return Ok(record.variable.clone());
        }
        let (node, _) = self.class.index.port(port).ok_or(GeneratorError::UnknownPort(port))?;

        let ty = match self.options.coroutine_type.rsplit_once('.') {
            Some((namespace, name)) => TypeRef::named(namespace, name),
            None => TypeRef::named("", &self.options.coroutine_type),
        };
        let type_name = self.type_name(&ty);
        let spec = VariableSpec::new(&format!("coroutine_{}", node.display_title()), ty, Storage::Instance)
            .with_modifiers("private ".to_string())
            .with_initializer(Some(statements::new_object(&type_name, &[])));
        let variable = self
            .class
            .variables
            .register(RecordKey::Port(port), spec, &mut self.class.names)
            .name
            .clone();

        tracing::debug!("[LOWER] State entry #{} of \"{}\" uses '{}'", port, node.display_title(), variable);
        self.class.coroutines.insert(EventCoroutineRecord {
            port,
            node: node.id,
            variable: variable.clone(),
            body: CoroutineBody::Pending,
            on_stop: None,
        });
        Ok(variable)
    }

    /// Lowers every referenced state entry. Bodies may jump to entries not
    /// seen yet, so the table is walked until it stops growing.
    pub fn lower_state_flows(&mut self) -> Result<()> {
        let mut slot = 0;
        while let Some(port) = self.class.coroutines.at(slot).map(|r| r.port) {
            self.lower_entry(slot, port)?;
            slot += 1;
        }
        if slot > 0 {
            tracing::info!(
                "[LOWER] Class '{}': {} state entries, {} dispatched",
                self.class.state.class_name,
                slot,
                self.class.event_ids.len()
            );
        }
        self.build_dispatch()?;
        self.install_setups()
    }

    fn lower_entry(&mut self, slot: usize, port: PortId) -> Result<()> {
        let (node, port_ref) = self.class.index.port(port).ok_or(GeneratorError::UnknownPort(port))?;
        let generator = self
            .class
            .registry
            .registration(port)
            .map(|r| r.generator)
            .or_else(|| self.library.get(&node.node_type))
            .ok_or_else(|| GeneratorError::UnknownNodeType {
                node: node.id,
                node_type: node.node_type.clone(),
            })?;

        self.class.registry.begin_ungrouped();
        let custom = generator.state_execution(self, node, port_ref);
        self.class.registry.end_ungrouped();
        let custom = match custom {
            Ok(custom) => custom,
            Err(e) => self.recover(node, wrap_node_error(node, e), None)?,
        };

        let (body, mut on_stop) = match custom {
            Some(execution) => (CoroutineBody::Custom(execution.factory), execution.on_stop),
            None => {
                let code = self.generate_state_body(port)?;
                let body = match shape_state_body(&code) {
                    StateBodyShape::Lambda(body) => CoroutineBody::Lambda(body),
                    StateBodyShape::Dispatch(body) => {
                        let id = self.class.event_ids.id_for(port);
                        self.class.dispatch.push((id, body));
                        CoroutineBody::Dispatch(id)
                    }
                };
                (body, None)
            }
        };

        if let Some(debug) = &self.class.debug {
            let finished = debug.finished(self.class.state.owner_expression(), node.id, port);
            on_stop = Some(statements::flow(&[on_stop.unwrap_or_default(), finished]));
        }

        if let Some(record) = self.class.coroutines.at_mut(slot) {
            record.body = body;
            record.on_stop = on_stop;
        }
        Ok(())
    }

    fn generate_state_body(&mut self, port: PortId) -> Result<String> {
        self.class.registry.begin_ungrouped();
        self.class.state.push_block(BlockKind::StateBody, true);
        let result = self.generate_port(port);
        self.class.state.pop_block();
        self.class.registry.end_ungrouped();
        result
    }

    fn build_dispatch(&mut self) -> Result<()> {
        if self.class.dispatch.is_empty() {
            return Ok(());
        }
        let mut cases = std::mem::take(&mut self.class.dispatch);
        cases.sort_by_key(|(id, _)| *id);
        let cases: Vec<(Vec<String>, String)> = cases
            .into_iter()
            .map(|(id, body)| (vec![id.to_string()], body))
            .collect();
        let body = statements::flow(&[statements::switch_statement("uid", &cases, None), statements::yield_break()]);

        let return_type = self.type_name(&TypeRef::enumerator());
        let spec = MethodSpec::new(DISPATCH_METHOD, &return_type)
            .with_parameter("int", "uid")
            .with_modifiers("private ");
        self.class.methods.get_or_create(&spec)?.add_fragment(body, 0);
        Ok(())
    }

    fn install_setups(&mut self) -> Result<()> {
        let owner = self.class.state.owner_expression();
        let mut setups = Vec::new();
        for record in self.class.coroutines.iter() {
            let factory = match &record.body {
                CoroutineBody::Lambda(body) => statements::lambda(&[], body),
                CoroutineBody::Dispatch(id) => {
                    statements::lambda_expression(&[], &format!("{}({})", DISPATCH_METHOD, id))
                }
                CoroutineBody::Custom(factory) => factory.clone(),
                CoroutineBody::Pending => continue,
            };
            let mut arguments = vec![owner.to_string(), factory];
            if let Some(on_stop) = &record.on_stop {
                arguments.push(statements::lambda(&[], on_stop));
            }
            setups.push(statements::statement(&statements::invoke(
                Some(&record.variable),
                "Setup",
                &[],
                &arguments,
            )));
        }
        if setups.is_empty() {
            return Ok(());
        }
        let spec = MethodSpec::new(&self.options.setup_method, "void");
        self.insert_method_code(&spec, statements::flow(&setups), SETUP_PRIORITY)
    }
}
