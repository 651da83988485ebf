//! Execution stacks.

use serde::{Deserialize, Serialize};

use botscript_core::{
    ContextId, ErrorCode, Frame, FunctionId, ObjectHandle, ProgramId, RuntimeError, Value,
    Variable,
};

/// The result of driving a call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The call returned this value (`Void` for `void` functions).
    Completed(Value),
    /// The call yielded; drive the stack again to continue.
    Suspended,
    Failed(RuntimeError),
    /// No function matched the call.
    NotFound(ErrorCode),
}

impl CallOutcome {
    pub fn is_suspended(&self) -> bool {
        matches!(self, CallOutcome::Suspended)
    }

    /// The returned value of a completed call.
    pub fn value(&self) -> Option<&Value> {
        match self {
            CallOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// The call a stack was started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct EntryCall {
    pub name: String,
    pub args: Vec<Variable>,
    pub receiver: Option<Receiver>,
    /// Identity the entry resolved to on its first run.
    pub cached: Option<FunctionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Receiver {
    pub handle: ObjectHandle,
    pub class: String,
}

/// One independent script execution.
///
/// Holds the root frame of the call in progress and nothing the engine
/// owns, so a suspended stack can be serialized, dropped with the process,
/// and restored into an engine that loaded the same programs in the same
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecStack {
    context: ContextId,
    program: ProgramId,
    pub(crate) entry: Option<EntryCall>,
    pub(crate) root: Frame,
    #[serde(default)]
    pub(crate) last_error: Option<RuntimeError>,
}

impl ExecStack {
    pub(crate) fn new(context: ContextId, program: ProgramId) -> Self {
        Self {
            context,
            program,
            entry: None,
            root: Frame::new(),
            last_error: None,
        }
    }

    /// The root execution context; class guards are held in its name.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// The program free entry calls are resolved in.
    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Whether a call is suspended on this stack.
    pub fn is_active(&self) -> bool {
        self.entry.is_some()
    }

    pub fn root(&self) -> &Frame {
        &self.root
    }

    /// The error of the last failed call.
    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    pub(crate) fn finish(&mut self) {
        self.entry = None;
        self.root = Frame::new();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Load a stack saved with [`to_json`](Self::to_json). The stack must go
    /// through [`Engine::restore_call`](crate::Engine::restore_call) before
    /// it is resumed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
