//! BotScript: a small scripting engine for game bots.
//!
//! Source text is compiled into programs of typed functions. Calls are
//! resolved by overload distance, run on execution stacks that can suspend
//! at any point, and the suspended stacks serialize to JSON and resume in a
//! later process.
//!
//! ```
//! use botscript::prelude::*;
//!
//! let mut engine = Engine::new();
//! let program = engine
//!     .compile_program(
//!         "patrol",
//!         "int steps(int n) { wait(1); return n + 1; }",
//!     )
//!     .unwrap();
//!
//! let mut stack = engine.new_stack(program);
//! assert!(engine.call(&mut stack, "steps", &[Variable::int(1)]).unwrap().is_suspended());
//!
//! let saved = stack.to_json().unwrap();
//! let mut stack = ExecStack::from_json(&saved).unwrap();
//! engine.restore_call(&mut stack).unwrap();
//! assert_eq!(
//!     engine.resume(&mut stack).unwrap(),
//!     CallOutcome::Completed(Value::Int(2))
//! );
//! ```

pub mod block;
pub mod compiler;
pub mod config;
pub mod function;
pub mod overload;
pub mod runtime;

pub use botscript_core::{
    CompileError, DataType, ErrorCode, FunctionId, ObjectHandle, ProgramId, RuntimeError,
    RuntimeErrorCode, SourceRegion, Span, Value, Variable,
};
pub use botscript_registry::{ClassEntry, MethodDecl, RegistryError};
pub use config::EngineProperty;
pub use runtime::{CallOutcome, Engine, EngineError, ExecStack, StepBudget, StepGate, Unlimited};

pub mod prelude {
    pub use crate::compiler::{Program, Programs};
    pub use crate::config::EngineProperty;
    pub use crate::function::{FunctionEntity, FunctionFlags, ParamList};
    pub use crate::runtime::{
        CallOutcome, Engine, EngineError, ExecStack, StepBudget, StepGate, Unlimited,
    };
    pub use botscript_core::{
        CompileError, DataType, ErrorCode, FunctionId, ObjectHandle, ProgramId, RuntimeError,
        RuntimeErrorCode, SourceRegion, Span, Value, Variable,
    };
    pub use botscript_registry::{ClassEntry, MethodDecl};
}
