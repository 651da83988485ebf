//! Function bodies.
//!
//! A body is a tree of statements and expressions compiled from the tokens
//! of a `{ ... }` block. Executing it walks a [`Frame`] tree of the same
//! shape: every statement in progress owns a child frame of its block, every
//! operand in progress a child frame of its expression, and every call a
//! child frame of its call site. Values that are already computed live in the
//! frame's temporaries. Execution can stop at any point with
//! [`Flow::Suspended`]; running the same body over the same frame later picks
//! up where it stopped.
//!
//! Restoring walks the tree in the same order without executing anything. It
//! re-establishes the runtime bindings of the variables the finished part of
//! the body declared and descends into the part that was in progress.

mod compile;
mod expr;
mod stmt;

use tracing::trace;

use botscript_core::{Frame, FrameState, RuntimeError, Span, Value};

use crate::runtime::{Env, ExecContext};

pub use compile::compile_block;
pub use expr::{BinaryOp, CallSite, Expr, ExprKind};
pub use stmt::Stmt;

/// How a body, statement or expression stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Ran to the end.
    Done,
    /// Yielded cooperatively. The frame records where to pick up.
    Suspended,
    /// Left early through a control transfer.
    Unwind(Unwind),
    Failed(RuntimeError),
}

/// The kind of an early exit.
#[derive(Debug, Clone, PartialEq)]
pub enum Unwind {
    /// `return`, with the returned value (`Void` when there is none).
    Return(Value),
}

/// Something executable on a frame, and restorable onto one.
pub trait Body {
    fn execute(&self, cx: &mut ExecContext<'_>, env: &mut Env<'_>, frame: &mut Frame) -> Flow;

    /// Re-establish runtime state of a frame loaded from a snapshot.
    fn restore(&self, cx: &mut ExecContext<'_>, env: &mut Env<'_>, frame: &mut Frame);
}

/// A `{ ... }` statement block.
#[derive(Debug, Default)]
pub struct Block {
    stmts: Vec<Stmt>,
    span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

impl Body for Block {
    fn execute(&self, cx: &mut ExecContext<'_>, env: &mut Env<'_>, frame: &mut Frame) -> Flow {
        let mut pc = match frame.state {
            FrameState::Block { pc } => pc,
            _ => {
                frame.state = FrameState::Block { pc: 0 };
                0
            }
        };

        while let Some(stmt) = self.stmts.get(pc as usize) {
            match stmt.execute(cx, env, frame.child(pc)) {
                Flow::Done => {
                    frame.take_child(pc);
                    pc += 1;
                    frame.state = FrameState::Block { pc };
                }
                flow => {
                    trace!(pc, ?flow, "block stopped");
                    return flow;
                }
            }
        }
        Flow::Done
    }

    fn restore(&self, cx: &mut ExecContext<'_>, env: &mut Env<'_>, frame: &mut Frame) {
        let FrameState::Block { pc } = frame.state else {
            return;
        };
        if let (Some(stmt), Some(child)) = (self.stmts.get(pc as usize), frame.existing_child(pc)) {
            stmt.restore(cx, env, child);
        }
    }
}
