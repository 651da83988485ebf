use std::ops::ControlFlow;

use botscript_core::{Binding, DataType, Frame, FrameState, Span, Value, VarId, Variable};

use super::expr;
use crate::block::{Block, Body, Expr, Flow, Unwind};
use crate::compiler::VarRef;
use crate::runtime::{Env, ExecContext};

/// A statement.
#[derive(Debug)]
pub enum Stmt {
    Block(Block),
    Return {
        value: Option<Expr>,
        span: Span,
    },
    /// Yield to the host `count` times.
    Wait {
        count: Expr,
        span: Span,
    },
    Declare {
        id: VarId,
        name: String,
        data_type: DataType,
        init: Option<Expr>,
        span: Span,
    },
    Assign {
        target: VarRef,
        value: Expr,
        span: Span,
    },
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block(block) => block.span(),
            Stmt::Return { span, .. }
            | Stmt::Wait { span, .. }
            | Stmt::Declare { span, .. }
            | Stmt::Assign { span, .. } => *span,
            Stmt::Expr(expr) => expr.span,
        }
    }

    pub(crate) fn execute(
        &self,
        cx: &mut ExecContext<'_>,
        env: &mut Env<'_>,
        frame: &mut Frame,
    ) -> Flow {
        match self.step(cx, env, frame) {
            ControlFlow::Continue(()) => Flow::Done,
            ControlFlow::Break(flow) => flow,
        }
    }

    fn step(
        &self,
        cx: &mut ExecContext<'_>,
        env: &mut Env<'_>,
        frame: &mut Frame,
    ) -> ControlFlow<Flow> {
        match self {
            Stmt::Block(block) => match block.execute(cx, env, frame) {
                Flow::Done => ControlFlow::Continue(()),
                flow => ControlFlow::Break(flow),
            },
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => expr.eval(cx, env, frame)?,
                    None => Value::Void,
                };
                ControlFlow::Break(Flow::Unwind(Unwind::Return(value)))
            }
            Stmt::Wait { count, .. } => {
                if !matches!(frame.state, FrameState::Wait { .. }) {
                    let n = count.eval(cx, env, frame)?;
                    let remaining = n.as_float().map_or(0, |n| n.max(0.0) as u32);
                    frame.clear_progress();
                    frame.state = FrameState::Wait { remaining };
                }
                match &mut frame.state {
                    FrameState::Wait { remaining } if *remaining > 0 => {
                        *remaining -= 1;
                        ControlFlow::Break(Flow::Suspended)
                    }
                    _ => ControlFlow::Continue(()),
                }
            }
            Stmt::Declare {
                id,
                name,
                data_type,
                init,
                span,
            } => {
                let mut var = match init {
                    Some(expr) => {
                        let value = expr.eval(cx, env, frame)?;
                        let value = expr::convert(value, data_type, *span)?;
                        Variable::with_value(name.clone(), data_type.clone(), value)
                    }
                    None => Variable::new(name.clone(), data_type.clone()),
                };
                var.set_binding(Binding::Var(*id));
                env.push(var);
                ControlFlow::Continue(())
            }
            Stmt::Assign {
                target,
                value,
                span,
            } => {
                let value = value.eval(cx, env, frame)?;
                expr::write_var(cx, env, target, value, *span)
            }
            Stmt::Expr(expr) => {
                expr.eval(cx, env, frame)?;
                ControlFlow::Continue(())
            }
        }
    }

    /// Restore the statement in progress.
    pub(crate) fn restore(&self, cx: &mut ExecContext<'_>, env: &mut Env<'_>, frame: &mut Frame) {
        match self {
            Stmt::Block(block) => block.restore(cx, env, frame),
            Stmt::Wait { count, .. } => {
                if frame.state == FrameState::Eval {
                    count.restore(cx, env, frame);
                }
            }
            Stmt::Return {
                value: Some(expr), ..
            }
            | Stmt::Declare {
                init: Some(expr), ..
            }
            | Stmt::Assign { value: expr, .. }
            | Stmt::Expr(expr) => expr.restore(cx, env, frame),
            Stmt::Return { value: None, .. } | Stmt::Declare { init: None, .. } => {}
        }
    }
}
