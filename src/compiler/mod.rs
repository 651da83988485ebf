//! The two-pass compiler.
//!
//! Pass 1 ([`compile_signature`]) reads every declaration of a unit up to
//! its parameter list and steps over the body, so that all signatures are
//! known before any body is compiled. Pass 2 ([`compile_body`]) comes back
//! to each declaration and compiles the body, resolving call sites against
//! the pass-1 signatures and the public functions.

mod body;
mod program;
mod scope;
mod signature;
pub mod types;

use std::cell::Cell;
use std::rc::Rc;

use botscript_core::{DataType, ErrorCode, FunctionId, ProgramId};
use botscript_registry::{ClassRegistry, PublicRegistry};

use crate::function::{FunctionEntity, FunctionSignature, ParamList};
use crate::overload::{CallResolver, Overload};

pub use body::compile_body;
pub use program::{Program, Programs, compile_program};
pub use scope::{CompileScope, VarRef};
pub use signature::compile_signature;

/// What the engine exposes to a compiling unit.
#[derive(Clone, Copy)]
pub struct CompileEnv<'a> {
    pub classes: &'a ClassRegistry,
    /// The units already loaded.
    pub programs: &'a Programs,
    /// The unit being compiled.
    pub program: ProgramId,
    /// Whether free calls may resolve to public functions.
    pub resolve_public: bool,
}

/// A call target known while compiling: a pass-1 signature of the unit
/// being compiled, or a function of a loaded unit.
#[derive(Debug, Clone)]
pub enum Declared<'a> {
    Unit(&'a FunctionSignature),
    Loaded(Rc<FunctionEntity>),
}

impl Overload for Declared<'_> {
    fn function_id(&self) -> FunctionId {
        match self {
            Declared::Unit(s) => s.id,
            Declared::Loaded(f) => f.id(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Declared::Unit(s) => &s.name,
            Declared::Loaded(f) => f.name(),
        }
    }

    fn params(&self) -> &ParamList {
        match self {
            Declared::Unit(s) => &s.params,
            Declared::Loaded(f) => f.params(),
        }
    }

    fn return_type(&self) -> &DataType {
        match self {
            Declared::Unit(s) => &s.return_type,
            Declared::Loaded(f) => f.return_type(),
        }
    }
}

/// The call targets visible to the bodies of one unit.
pub struct UnitScope<'a> {
    pub env: CompileEnv<'a>,
    /// Pass-1 signatures of the whole unit.
    pub declared: &'a [FunctionSignature],
    pub public: &'a PublicRegistry<FunctionEntity>,
}

impl<'a> UnitScope<'a> {
    pub fn classes(&self) -> &'a ClassRegistry {
        self.env.classes
    }

    /// Resolve a free call: the unit's functions, then public functions.
    pub fn resolve_call(
        &self,
        cached: &Cell<Option<FunctionId>>,
        name: &str,
        args: &[DataType],
    ) -> Result<Declared<'a>, ErrorCode> {
        let declared = self.declared;
        let public = self.public;
        CallResolver::new(self.env.classes, self.env.resolve_public).resolve(
            cached,
            name,
            args,
            move || {
                declared
                    .iter()
                    .filter(|s| s.class_block.is_none())
                    .map(Declared::Unit)
            },
            move || public.iter().map(Declared::Loaded),
        )
    }

    /// Resolve a method call on a receiver of class `class`, falling back to
    /// the parent classes. Public functions never take part.
    pub fn resolve_method(
        &self,
        cached: &Cell<Option<FunctionId>>,
        class: &str,
        name: &str,
        args: &[DataType],
    ) -> Result<Declared<'a>, ErrorCode> {
        let resolver = CallResolver::new(self.env.classes, false);
        let mut first_error = None;
        for entry in self.env.classes.chain(class) {
            let class_name = entry.name.as_str();
            let declared = self.declared;
            let chain = self.env.programs.class_methods(class_name);
            let loaded = &chain;
            let found = resolver.resolve(
                cached,
                name,
                args,
                move || {
                    declared
                        .iter()
                        .filter(move |s| s.class_block.as_deref() == Some(class_name))
                        .map(Declared::Unit)
                        .chain(loaded.iter().cloned().map(Declared::Loaded))
                },
                std::iter::empty::<Declared<'a>>,
            );
            match found {
                Ok(target) => return Ok(target),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        Err(first_error.unwrap_or(ErrorCode::UndefinedCall))
    }
}
