//! Resumable execution.
//!
//! The [`Engine`] owns everything that outlives a single call: the loaded
//! programs, the class and public registries and the object heap. A running
//! script is an [`ExecStack`], a plain serializable value holding the frame
//! tree of the call in progress. Driving a stack either completes the call,
//! fails it, or leaves it suspended with its frame tree recording where to
//! pick up.
//!
//! A stack that went through serialization must be restored with
//! [`Engine::restore_call`] before it is resumed.

mod context;
mod engine;
mod gate;
pub(crate) mod invoke;
mod stack;

pub use context::{Env, ExecContext};
pub use engine::{Engine, EngineError};
pub use gate::{StepBudget, StepGate, Unlimited};
pub use stack::{CallOutcome, ExecStack};
