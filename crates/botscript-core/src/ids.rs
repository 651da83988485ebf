//! Identifier types for compiled functions, programs and execution contexts.
//!
//! Function identities are the fast-path key used by call sites once a call
//! has been resolved by name, so they are allocated once per compiled function
//! and never reused by the allocator that produced them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a compiled function.
///
/// Allocated during pass 1 and reused by pass 2, so a call site that cached
/// the identity while compiling keeps matching the finished function.
///
/// # Example
///
/// ```
/// use botscript_core::FunctionId;
///
/// let id = FunctionId::new(7);
/// assert_eq!(id.raw(), 7);
/// assert_eq!(id.to_string(), "fn#7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(u64);

impl FunctionId {
    /// Create a function id from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

/// Identifies a compilation unit (a program).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramId(u32);

impl ProgramId {
    /// Create a program id with the given index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program_{}", self.0)
    }
}

/// Identifies a root execution context.
///
/// Every execution stack driven by the host owns one. It is the
/// token under which class guards are held, so nested calls made from the
/// same root context re-enter a guard instead of waiting on themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(u64);

impl ContextId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Identity of an ordinary variable inside one function.
///
/// Always non-negative; the implicit bindings created by the engine use
/// [`ReservedBinding`] instead, so the two can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(u32);

impl VarId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Implicit bindings created by the engine for method calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservedBinding {
    /// `this`: the receiver of a method call.
    CurrentInstance,
    /// `super`: the receiver viewed as its parent class.
    ParentAlias,
}

impl ReservedBinding {
    /// The script-visible name of the binding.
    pub const fn name(self) -> &'static str {
        match self {
            ReservedBinding::CurrentInstance => "this",
            ReservedBinding::ParentAlias => "super",
        }
    }

    /// Look a reserved binding up by its script-visible name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "this" => Some(ReservedBinding::CurrentInstance),
            "super" => Some(ReservedBinding::ParentAlias),
            _ => None,
        }
    }
}

/// How a variable is addressed at runtime.
///
/// Bindings are not persisted with a suspended frame; the restore pass
/// re-establishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Binding {
    /// Not addressable (fresh or just deserialized).
    #[default]
    Unbound,
    /// An ordinary parameter or local.
    Var(VarId),
    /// An implicit binding created by the engine.
    Reserved(ReservedBinding),
}

/// Monotonic allocator for the engine's identities.
///
/// Allocation is deterministic: an engine that compiles the same programs in
/// the same order hands out the same function identities, which is what lets a
/// suspended stack saved by one process be restored by the next.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    last_function: u64,
    last_program: u32,
    last_context: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next function identity (the first one is `fn#1`).
    pub fn next_function(&mut self) -> FunctionId {
        self.last_function += 1;
        FunctionId(self.last_function)
    }

    /// Allocate the next program identity.
    pub fn next_program(&mut self) -> ProgramId {
        self.last_program += 1;
        ProgramId(self.last_program)
    }

    /// Allocate the next execution-context identity.
    pub fn next_context(&mut self) -> ContextId {
        self.last_context += 1;
        ContextId(self.last_context)
    }

    /// Make sure a context id adopted from a snapshot is never handed out again.
    pub fn reserve_context(&mut self, id: ContextId) {
        self.last_context = self.last_context.max(id.0);
    }
}
