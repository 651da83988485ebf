//! Execution state threaded through a running call tree.

use botscript_core::{Binding, ContextId, ObjectHandle, ProgramId, ReservedBinding, Variable};

use crate::runtime::{Engine, StepGate};

/// The engine and the identity of the stack being driven.
pub struct ExecContext<'e> {
    pub(crate) engine: &'e mut Engine,
    pub(crate) gate: &'e mut dyn StepGate,
    /// Root context of the stack; class guards are held in its name.
    pub(crate) token: ContextId,
    /// Program of the innermost running call.
    pub(crate) program: ProgramId,
    /// Number of call frames entered.
    pub(crate) depth: usize,
}

impl<'e> ExecContext<'e> {
    pub(crate) fn new(
        engine: &'e mut Engine,
        gate: &'e mut dyn StepGate,
        token: ContextId,
        program: ProgramId,
    ) -> Self {
        Self {
            engine,
            gate,
            token,
            program,
            depth: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        self.engine
    }

    pub fn token(&self) -> ContextId {
        self.token
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// The variables of the running call.
pub struct Env<'v> {
    vars: &'v mut Vec<Variable>,
}

impl<'v> Env<'v> {
    pub fn new(vars: &'v mut Vec<Variable>) -> Self {
        Self { vars }
    }

    pub fn get(&self, binding: Binding) -> Option<&Variable> {
        if binding == Binding::Unbound {
            return None;
        }
        self.vars.iter().find(|v| v.binding() == binding)
    }

    pub fn get_mut(&mut self, binding: Binding) -> Option<&mut Variable> {
        if binding == Binding::Unbound {
            return None;
        }
        self.vars.iter_mut().find(|v| v.binding() == binding)
    }

    pub fn push(&mut self, var: Variable) {
        self.vars.push(var);
    }

    /// The instance bound to `this`.
    pub fn this(&self) -> Option<ObjectHandle> {
        self.get(Binding::Reserved(ReservedBinding::CurrentInstance))?
            .value()
            .as_object()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
