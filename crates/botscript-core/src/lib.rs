//! BotScript core types.
//!
//! Shared by the parser, the registries and the engine:
//!
//! - [`ids`]: function, program, variable and execution-context identities
//! - [`span`]: source locations and the named regions of a function declaration
//! - [`error`]: the error taxonomy for lexing, compilation and execution
//! - [`data_type`]: script types, their overload ranks and compatibility rules
//! - [`value`]: runtime values and typed variables
//! - [`frame`]: the serializable frame tree used for suspend/resume
//! - [`object_heap`]: generational storage for class instances

pub mod data_type;
pub mod error;
pub mod frame;
pub mod ids;
pub mod object_heap;
pub mod span;
pub mod value;

pub use data_type::{ClassHierarchy, DataType, ExactClasses, TypeKind};
pub use error::{CompileError, ErrorCode, LexError, RuntimeError, RuntimeErrorCode};
pub use frame::{CallFrame, CallKind, CallStep, Frame, FrameState};
pub use ids::{Binding, ContextId, FunctionId, IdAllocator, ProgramId, ReservedBinding, VarId};
pub use object_heap::{Instance, ObjectHandle, ObjectHeap};
pub use span::{FunctionPositions, SourceRegion, Span};
pub use value::{InitState, Value, Variable};
