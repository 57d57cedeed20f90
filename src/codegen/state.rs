//! # Generator State
//!
//! The mutable context threaded through every emitter call: which class is
//! being generated, whether the current member is static, whether the
//! expression being built is an assignment target, and the stack of block
//! scopes that decides where `yield` is legal.

/// Whether an expression is read or assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprContext {
    Get,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Method,
    Lambda,
    StateBody,
    Accessor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockScope {
    pub kind: BlockKind,
    pub allow_yield: bool,
}

#[derive(Debug, Default)]
pub struct GeneratorState {
    pub class_name: String,
    pub is_static: bool,
    contexts: Vec<ExprContext>,
    blocks: Vec<BlockScope>,
}

impl GeneratorState {
    pub fn for_class(name: &str) -> Self {
        Self {
            class_name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn push_block(&mut self, kind: BlockKind, allow_yield: bool) {
        self.blocks.push(BlockScope { kind, allow_yield });
    }

    pub fn pop_block(&mut self) -> Option<BlockScope> {
        self.blocks.pop()
    }

    pub fn current_block(&self) -> Option<&BlockScope> {
        self.blocks.last()
    }

    pub fn block_depth(&self) -> usize {
        self.blocks.len()
    }

    /// `yield` is legal only in the innermost scope
    pub fn allow_yield(&self) -> bool {
        self.blocks.last().map(|b| b.allow_yield).unwrap_or(false)
    }

    pub fn push_context(&mut self, context: ExprContext) {
        self.contexts.push(context);
    }

    pub fn pop_context(&mut self) {
        self.contexts.pop();
    }

    pub fn context(&self) -> ExprContext {
        self.contexts.last().copied().unwrap_or(ExprContext::Get)
    }

    pub fn is_set_context(&self) -> bool {
        self.context() == ExprContext::Set
    }

    /// Expression naming the owner instance
    pub fn owner_expression(&self) -> &'static str {
        if self.is_static {
            "null"
        } else {
            "this"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yield_follows_innermost_block() {
        let mut state = GeneratorState::for_class("Player");
        assert!(!state.allow_yield());

        state.push_block(BlockKind::StateBody, true);
        assert!(state.allow_yield());

        state.push_block(BlockKind::Lambda, false);
        assert!(!state.allow_yield());

        state.pop_block();
        assert!(state.allow_yield());
        assert_eq!(state.block_depth(), 1);
    }

    #[test]
    fn context_defaults_to_get() {
        let mut state = GeneratorState::default();
        assert_eq!(state.context(), ExprContext::Get);
        state.push_context(ExprContext::Set);
        assert!(state.is_set_context());
        state.pop_context();
        assert!(!state.is_set_context());
    }
}
