//! Expressions.

use std::cell::Cell;
use std::ops::ControlFlow;

use botscript_core::{
    Binding, DataType, Frame, FrameState, FunctionId, RuntimeError, RuntimeErrorCode, Span,
    TypeKind, Value, Variable,
};

use crate::block::Flow;
use crate::compiler::VarRef;
use crate::runtime::{CallOutcome, Env, ExecContext, invoke};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// A call site.
///
/// The identity of the callee found at compile time is kept in `cached` so
/// that runtime resolution takes the fast path.
#[derive(Debug)]
pub struct CallSite {
    pub name: String,
    /// `receiver.name(...)`; `None` for a free call.
    pub receiver: Option<Box<Expr>>,
    /// Class to resolve in instead of the receiver's dynamic class
    /// (`super.name(...)`).
    pub static_class: Option<String>,
    pub args: Vec<Expr>,
    pub cached: Cell<Option<FunctionId>>,
    pub span: Span,
}

impl CallSite {
    /// Receiver first, then the arguments.
    fn operands(&self) -> Vec<&Expr> {
        self.receiver.as_deref().into_iter().chain(&self.args).collect()
    }
}

#[derive(Debug)]
pub enum ExprKind {
    Literal(Value),
    Var(VarRef),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call(CallSite),
}

/// A typed expression.
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    /// Static type of the result.
    pub data_type: DataType,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, data_type: DataType, span: Span) -> Self {
        Self {
            kind,
            data_type,
            span,
        }
    }

    /// Evaluate on `frame`.
    ///
    /// Operands are evaluated left to right, each on a child frame in the
    /// slot of its position. A finished operand moves to the frame's
    /// temporaries and is not evaluated again after a suspension.
    pub(crate) fn eval(
        &self,
        cx: &mut ExecContext<'_>,
        env: &mut Env<'_>,
        frame: &mut Frame,
    ) -> ControlFlow<Flow, Value> {
        match &self.kind {
            ExprKind::Literal(value) => ControlFlow::Continue(value.clone()),
            ExprKind::Var(target) => read_var(cx, env, target, self.span),
            ExprKind::Neg(operand) => {
                eval_operands(cx, env, frame, &[&**operand])?;
                let value = frame.temps.pop().unwrap_or_default();
                negate(value, &self.data_type, self.span)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                eval_operands(cx, env, frame, &[&**lhs, &**rhs])?;
                let rhs_value = frame.temps.pop().unwrap_or_default();
                let lhs_value = frame.temps.pop().unwrap_or_default();
                if self.data_type.kind() == TypeKind::String {
                    let text = to_text(&lhs_value, &lhs.data_type)
                        + &to_text(&rhs_value, &rhs.data_type);
                    return ControlFlow::Continue(Value::String(text));
                }
                arithmetic(*op, lhs_value, rhs_value, &self.data_type, self.span)
            }
            ExprKind::Call(call) => eval_call(cx, env, frame, call),
        }
    }

    /// Descend into the operand or call that was in progress.
    pub(crate) fn restore(&self, cx: &mut ExecContext<'_>, env: &mut Env<'_>, frame: &mut Frame) {
        if frame.state != FrameState::Eval {
            return;
        }
        let slot = frame.temps.len();
        let operands: Vec<&Expr> = match &self.kind {
            ExprKind::Literal(_) | ExprKind::Var(_) => return,
            ExprKind::Neg(operand) => vec![&**operand],
            ExprKind::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            ExprKind::Call(call) => call.operands(),
        };
        let Some(child) = frame.existing_child(slot as u32) else {
            return;
        };
        match operands.get(slot) {
            Some(operand) => operand.restore(cx, env, child),
            None if matches!(self.kind, ExprKind::Call(_)) => invoke::restore_call(cx, child),
            None => {}
        }
    }
}

fn eval_operands(
    cx: &mut ExecContext<'_>,
    env: &mut Env<'_>,
    frame: &mut Frame,
    operands: &[&Expr],
) -> ControlFlow<Flow> {
    if frame.state != FrameState::Eval {
        frame.clear_progress();
        frame.state = FrameState::Eval;
    }
    while let Some(operand) = operands.get(frame.temps.len()) {
        let slot = frame.temps.len() as u32;
        let value = operand.eval(cx, env, frame.child(slot))?;
        frame.take_child(slot);
        frame.temps.push(value);
    }
    ControlFlow::Continue(())
}

fn eval_call(
    cx: &mut ExecContext<'_>,
    env: &mut Env<'_>,
    frame: &mut Frame,
    call: &CallSite,
) -> ControlFlow<Flow, Value> {
    let operands = call.operands();
    eval_operands(cx, env, frame, &operands)?;

    let skip = usize::from(call.receiver.is_some());
    let args: Vec<Variable> = call
        .args
        .iter()
        .zip(&frame.temps[skip..])
        .map(|(arg, value)| Variable::with_value("", arg.data_type.clone(), value.clone()))
        .collect();
    let slot = operands.len() as u32;

    let outcome = match call.receiver {
        None => invoke::call_function(
            cx,
            &call.cached,
            &call.name,
            &args,
            frame.child(slot),
            Some(call.span),
        ),
        Some(_) => {
            let handle = match frame.temps.first() {
                Some(Value::Object(handle)) => *handle,
                _ => return fail(RuntimeErrorCode::NullReference, call.span),
            };
            let class = match &call.static_class {
                Some(class) => class.clone(),
                None => match cx.engine.heap().get(handle) {
                    Some(instance) => instance.class().to_string(),
                    None => return fail(RuntimeErrorCode::StaleObject, call.span),
                },
            };
            invoke::call_method(
                cx,
                &call.cached,
                handle,
                &class,
                &call.name,
                &args,
                frame.child(slot),
                Some(call.span),
            )
        }
    };

    match outcome {
        CallOutcome::Completed(value) => {
            frame.take_child(slot);
            ControlFlow::Continue(value)
        }
        CallOutcome::Suspended => ControlFlow::Break(Flow::Suspended),
        CallOutcome::Failed(err) => ControlFlow::Break(Flow::Failed(err)),
        CallOutcome::NotFound(_) => fail(RuntimeErrorCode::UndefinedCall, call.span),
    }
}

fn fail<T>(code: RuntimeErrorCode, span: Span) -> ControlFlow<Flow, T> {
    ControlFlow::Break(Flow::Failed(RuntimeError::at(code, span)))
}

/// Convert `value` for storage in `ty`.
pub(crate) fn convert(value: Value, ty: &DataType, span: Span) -> ControlFlow<Flow, Value> {
    match value.convert_to(ty) {
        Some(value) => ControlFlow::Continue(value),
        None => fail(RuntimeErrorCode::TypeMismatch, span),
    }
}

fn read_var(
    cx: &ExecContext<'_>,
    env: &Env<'_>,
    target: &VarRef,
    span: Span,
) -> ControlFlow<Flow, Value> {
    let var = match target {
        VarRef::Local(id) => env.get(Binding::Var(*id)),
        VarRef::Reserved(binding) => env.get(Binding::Reserved(*binding)),
        VarRef::Member(name) => {
            let Some(this) = env.this() else {
                return fail(RuntimeErrorCode::MissingInstance, span);
            };
            let Some(instance) = cx.engine.heap().get(this) else {
                return fail(RuntimeErrorCode::StaleObject, span);
            };
            instance.field(name)
        }
    };
    match var {
        Some(var) => ControlFlow::Continue(var.value().clone()),
        None => fail(RuntimeErrorCode::UnknownVariable, span),
    }
}

/// Store `value` in a local or a member of `this`, converted to the
/// variable's type.
pub(crate) fn write_var(
    cx: &mut ExecContext<'_>,
    env: &mut Env<'_>,
    target: &VarRef,
    value: Value,
    span: Span,
) -> ControlFlow<Flow> {
    let var = match target {
        VarRef::Local(id) => env.get_mut(Binding::Var(*id)),
        VarRef::Reserved(_) => return fail(RuntimeErrorCode::TypeMismatch, span),
        VarRef::Member(name) => {
            let Some(this) = env.this() else {
                return fail(RuntimeErrorCode::MissingInstance, span);
            };
            let Some(instance) = cx.engine.heap_mut().get_mut(this) else {
                return fail(RuntimeErrorCode::StaleObject, span);
            };
            instance.field_mut(name)
        }
    };
    let Some(var) = var else {
        return fail(RuntimeErrorCode::UnknownVariable, span);
    };
    let value = convert(value, var.data_type(), span)?;
    var.set_value(value);
    ControlFlow::Continue(())
}

fn negate(value: Value, ty: &DataType, span: Span) -> ControlFlow<Flow, Value> {
    let negated = match value {
        Value::Int(v) => Value::Int(v.wrapping_neg()),
        Value::Float(v) => Value::Float(-v),
        _ => return fail(RuntimeErrorCode::TypeMismatch, span),
    };
    convert(negated, ty, span)
}

fn arithmetic(
    op: BinaryOp,
    lhs: Value,
    rhs: Value,
    ty: &DataType,
    span: Span,
) -> ControlFlow<Flow, Value> {
    let result = if ty.kind().is_integral() {
        let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) else {
            return fail(RuntimeErrorCode::TypeMismatch, span);
        };
        Value::Int(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div if b == 0 => return fail(RuntimeErrorCode::DivisionByZero, span),
            BinaryOp::Div => a.wrapping_div(b),
        })
    } else {
        let (Some(a), Some(b)) = (lhs.as_float(), rhs.as_float()) else {
            return fail(RuntimeErrorCode::TypeMismatch, span);
        };
        Value::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div if b == 0.0 => return fail(RuntimeErrorCode::DivisionByZero, span),
            BinaryOp::Div => a / b,
        })
    };
    convert(result, ty, span)
}

/// Text of a value in string concatenation.
fn to_text(value: &Value, ty: &DataType) -> String {
    match value {
        Value::Float(v) if ty.kind() == TypeKind::Float => (*v as f32).to_string(),
        Value::Float(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Object(_) => ty.to_string(),
        Value::Void => String::new(),
    }
}
