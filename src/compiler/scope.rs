//! Variables visible while compiling one function.

use rustc_hash::FxHashSet;

use botscript_core::{CompileError, DataType, ErrorCode, ReservedBinding, Span, VarId};

/// Where a name resolves to at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarRef {
    /// A parameter or local of the running call.
    Local(VarId),
    /// `this` or `super`.
    Reserved(ReservedBinding),
    /// A member of `this`, by name.
    Member(String),
}

#[derive(Debug, Clone)]
struct ScopedVar {
    name: String,
    data_type: DataType,
    target: VarRef,
}

/// The compile-time scope of a function body.
///
/// Parameter and local names are unique across the whole function, nested
/// blocks included; a variable leaves visibility at the end of its block but
/// its name stays taken. Parameters take the first identities, locals follow.
#[derive(Debug)]
pub struct CompileScope {
    vars: Vec<ScopedVar>,
    /// Start of each open block in `vars`.
    blocks: Vec<usize>,
    taken: FxHashSet<String>,
    locals: Vec<(String, VarId)>,
    return_type: DataType,
}

impl CompileScope {
    pub fn new(return_type: DataType) -> Self {
        Self {
            vars: Vec::new(),
            blocks: Vec::new(),
            taken: FxHashSet::default(),
            locals: Vec::new(),
            return_type,
        }
    }

    pub fn return_type(&self) -> &DataType {
        &self.return_type
    }

    /// Declare a parameter or local.
    pub fn add_local(
        &mut self,
        name: &str,
        data_type: DataType,
        span: Span,
    ) -> Result<VarId, CompileError> {
        if !self.taken.insert(name.to_string()) {
            return Err(
                CompileError::new(ErrorCode::RedefinedVariable, span).with_detail(name),
            );
        }
        let id = VarId::new(self.locals.len() as u32);
        self.locals.push((name.to_string(), id));
        self.vars.push(ScopedVar {
            name: name.to_string(),
            data_type,
            target: VarRef::Local(id),
        });
        Ok(id)
    }

    /// Bind `this` or `super`.
    pub fn add_reserved(&mut self, binding: ReservedBinding, data_type: DataType) {
        self.taken.insert(binding.name().to_string());
        self.vars.push(ScopedVar {
            name: binding.name().to_string(),
            data_type,
            target: VarRef::Reserved(binding),
        });
    }

    /// Bind a member copy of `this`. Parameters and locals may shadow it.
    pub fn add_member(&mut self, name: &str, data_type: DataType) {
        self.vars.push(ScopedVar {
            name: name.to_string(),
            data_type,
            target: VarRef::Member(name.to_string()),
        });
    }

    /// The innermost visible variable called `name`.
    pub fn lookup(&self, name: &str) -> Option<(&VarRef, &DataType)> {
        self.vars
            .iter()
            .rev()
            .find(|v| v.name == name)
            .map(|v| (&v.target, &v.data_type))
    }

    pub fn push_block(&mut self) {
        self.blocks.push(self.vars.len());
    }

    pub fn pop_block(&mut self) {
        if let Some(start) = self.blocks.pop() {
            self.vars.truncate(start);
        }
    }

    /// Every parameter and local declared so far.
    pub fn into_locals(self) -> Vec<(String, VarId)> {
        self.locals
    }
}
