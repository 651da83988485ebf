//! The serializable frame tree.
//!
//! A suspended script is nothing but a tree of frames: each call owns a
//! [`FrameState::Call`] frame holding its bound variables, and every
//! statement, expression and nested call that was in progress owns a child
//! frame recording how far it got. Resuming walks the same tree again and
//! picks up at the recorded states; nothing that already happened is redone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{FunctionId, ProgramId, Value, Variable};

/// How a call was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    /// A free function.
    Function,
    /// A `Class::name` function called in free form; `this` comes from the
    /// instance bound to the program that declares it.
    Method,
    /// A class method dispatched on an explicit receiver.
    Dispatched { synchronized: bool },
}

impl CallKind {
    pub fn binds_instance(self) -> bool {
        !matches!(self, CallKind::Function)
    }

    pub fn is_synchronized(self) -> bool {
        matches!(self, CallKind::Dispatched { synchronized: true })
    }
}

/// Progress of one call.
///
/// Steps only move forward; the order is the declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CallStep {
    /// Copy the arguments into the parameter slots.
    BindParams,
    /// Bind `this`, and `super` when the class has a parent.
    BindInstance,
    /// Take the class guard of a synchronized method.
    AcquireGuard,
    /// Run the body.
    RunBody,
}

impl CallStep {
    /// The step that follows `self` for a call of the given kind.
    ///
    /// `RunBody` is terminal.
    pub fn next(self, kind: CallKind) -> CallStep {
        match (self, kind) {
            (CallStep::BindParams, CallKind::Function) => CallStep::RunBody,
            (CallStep::BindParams, _) => CallStep::BindInstance,
            (CallStep::BindInstance, kind) if kind.is_synchronized() => CallStep::AcquireGuard,
            (CallStep::BindInstance, _) => CallStep::RunBody,
            (CallStep::AcquireGuard, _) | (CallStep::RunBody, _) => CallStep::RunBody,
        }
    }
}

/// The recorded state of a call frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    /// The callee.
    pub function: FunctionId,
    /// The program that owns the callee.
    pub program: ProgramId,
    pub kind: CallKind,
    pub step: CallStep,
    /// Class of a method. Names the guard a synchronized call holds even
    /// after its program is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl CallFrame {
    pub fn new(function: FunctionId, program: ProgramId, kind: CallKind) -> Self {
        Self {
            function,
            program,
            kind,
            step: CallStep::BindParams,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: Option<&str>) -> Self {
        self.owner = owner.map(str::to_string);
        self
    }

    /// The class whose guard this call holds, if it holds one.
    pub fn held_guard(&self) -> Option<&str> {
        self.owner.as_deref().filter(|_| self.guard_held())
    }

    /// Whether this call holds its class guard.
    ///
    /// The guard is taken on the way into `RunBody`, so any synchronized call
    /// that reached the body holds it until the call completes.
    pub fn guard_held(&self) -> bool {
        self.kind.is_synchronized() && self.step == CallStep::RunBody
    }
}

/// What a frame is doing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum FrameState {
    /// Not started.
    #[default]
    Fresh,
    /// A function call.
    Call(CallFrame),
    /// A statement block, positioned at statement `pc`.
    Block { pc: u32 },
    /// A `wait` statement with the given number of yields left.
    Wait { remaining: u32 },
    /// An expression; finished terms are kept in the frame's temporaries.
    Eval,
}

/// One node of the frame tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub state: FrameState,
    /// Variables owned by this frame (parameters, `this`/`super`, locals).
    pub vars: Vec<Variable>,
    /// Values of finished sub-evaluations.
    pub temps: Vec<Value>,
    /// Frames of the sub-evaluations in progress, keyed by slot.
    pub children: BTreeMap<u32, Frame>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self.state, FrameState::Fresh)
    }

    /// The call recorded in this frame, if it is a call frame.
    pub fn call(&self) -> Option<&CallFrame> {
        match &self.state {
            FrameState::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn call_mut(&mut self) -> Option<&mut CallFrame> {
        match &mut self.state {
            FrameState::Call(call) => Some(call),
            _ => None,
        }
    }

    /// The child in `slot`, created fresh when missing.
    pub fn child(&mut self, slot: u32) -> &mut Frame {
        self.children.entry(slot).or_default()
    }

    /// The child in `slot`, if one was created.
    pub fn existing_child(&mut self, slot: u32) -> Option<&mut Frame> {
        self.children.get_mut(&slot)
    }

    /// Remove a finished child.
    pub fn take_child(&mut self, slot: u32) -> Option<Frame> {
        self.children.remove(&slot)
    }

    /// Drop every temporary and child, keeping state and variables.
    pub fn clear_progress(&mut self) {
        self.temps.clear();
        self.children.clear();
    }

    /// Whether the call recorded in this frame holds its class guard.
    pub fn guard_held(&self) -> bool {
        self.call().is_some_and(CallFrame::guard_held)
    }
}
