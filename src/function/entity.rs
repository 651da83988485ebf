//! Compiled functions and their pass-1 signatures.

use bitflags::bitflags;

use botscript_core::{
    CallKind, DataType, FunctionId, FunctionPositions, ProgramId, SourceRegion, VarId,
};

use crate::block::Block;
use crate::function::ParamList;

bitflags! {
    /// Declaration modifiers of a function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u8 {
        /// Callable from every program of the engine.
        const PUBLIC = 1 << 0;
        const EXTERN = 1 << 1;
        /// Runs under the guard of its class.
        const SYNCHRONIZED = 1 << 2;
    }
}

/// A declaration as seen by pass 1: everything but the body.
///
/// The identity allocated here is reused by pass 2, so call sites compiled
/// against the signature keep matching the finished function.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub id: FunctionId,
    pub name: String,
    pub return_type: DataType,
    pub params: ParamList,
    /// Pass 1 never sets `PUBLIC`; pass 2 does.
    pub flags: FunctionFlags,
    /// The class of a method, from a `Class::` prefix or an enclosing class
    /// block.
    pub owner: Option<String>,
    /// The enclosing `class Name { ... }` block, if any.
    pub class_block: Option<String>,
    pub positions: FunctionPositions,
    /// Token index of the first token of the declaration.
    pub decl_start: usize,
}

/// One compiled function.
#[derive(Debug)]
pub struct FunctionEntity {
    id: FunctionId,
    name: String,
    return_type: DataType,
    params: ParamList,
    body: Block,
    flags: FunctionFlags,
    owner: Option<String>,
    /// Whether the function was declared inside a class block and is
    /// dispatched on a receiver.
    dispatched: bool,
    positions: FunctionPositions,
    program: ProgramId,
    /// Every parameter and local of the body, by name.
    locals: Vec<(String, VarId)>,
}

impl FunctionEntity {
    pub(crate) fn new(
        signature: &FunctionSignature,
        flags: FunctionFlags,
        body: Block,
        program: ProgramId,
        locals: Vec<(String, VarId)>,
    ) -> Self {
        Self {
            id: signature.id,
            name: signature.name.clone(),
            return_type: signature.return_type.clone(),
            params: signature.params.clone(),
            body,
            flags,
            owner: signature.owner.clone(),
            dispatched: signature.class_block.is_some(),
            positions: signature.positions,
            program,
            locals,
        }
    }

    #[inline]
    pub fn id(&self) -> FunctionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &DataType {
        &self.return_type
    }

    pub fn params(&self) -> &ParamList {
        &self.params
    }

    pub fn body(&self) -> &Block {
        &self.body
    }

    pub fn flags(&self) -> FunctionFlags {
        self.flags
    }

    pub fn is_public(&self) -> bool {
        self.flags.contains(FunctionFlags::PUBLIC)
    }

    pub fn is_extern(&self) -> bool {
        self.flags.contains(FunctionFlags::EXTERN)
    }

    pub fn is_synchronized(&self) -> bool {
        self.flags.contains(FunctionFlags::SYNCHRONIZED)
    }

    /// The owning class of a method.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// The program that owns this function.
    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// How a call of this function binds its scope.
    pub fn call_kind(&self) -> CallKind {
        match (&self.owner, self.dispatched) {
            (None, _) => CallKind::Function,
            (Some(_), false) => CallKind::Method,
            (Some(_), true) => CallKind::Dispatched {
                synchronized: self.is_synchronized(),
            },
        }
    }

    /// The parameter list formatted as `( int a, float b )`.
    pub fn format_params(&self) -> String {
        self.params.format()
    }

    /// Byte offsets from the start of `start` to the end of `stop`.
    pub fn position(&self, start: SourceRegion, stop: SourceRegion) -> (u32, u32) {
        self.positions.range(start, stop)
    }

    pub fn positions(&self) -> &FunctionPositions {
        &self.positions
    }

    pub fn local_id(&self, name: &str) -> Option<VarId> {
        self.locals
            .iter()
            .find(|(local, _)| local == name)
            .map(|(_, id)| *id)
    }
}
