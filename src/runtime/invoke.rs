//! Entering, running and restoring calls.
//!
//! A call frame moves through [`CallStep`]s: parameters are bound, then for
//! methods `this` (and `super`), then a synchronized method takes its class
//! guard, then the body runs. Each step is recorded in the frame before the
//! next one starts, so a call resumed after a suspension never repeats one.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{trace, warn};

use botscript_core::{
    Binding, CallFrame, CallStep, DataType, Frame, FrameState, FunctionId, InitState,
    ObjectHandle, ReservedBinding, RuntimeError, RuntimeErrorCode, Span, Value, Variable,
};

use crate::block::{Body, Flow, Unwind};
use crate::config::EngineProperty;
use crate::function::FunctionEntity;
use crate::runtime::{CallOutcome, Env, ExecContext};

/// Call a free function from the running program.
///
/// A fresh frame resolves `name` against the argument types (through the
/// cached identity first); a frame that already holds a call continues
/// that call.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn call_function(
    cx: &mut ExecContext<'_>,
    cached: &Cell<Option<FunctionId>>,
    name: &str,
    args: &[Variable],
    frame: &mut Frame,
    call_site: Option<Span>,
) -> CallOutcome {
    let function = match frame.call() {
        Some(call) => match cx.engine.programs.function(call.program, call.function) {
            Some(function) => function,
            None => return unknown_function(),
        },
        None => {
            let types = arg_types(args);
            match cx.engine.resolve_call(cx.program, name, &types, cached) {
                Ok(function) => function,
                Err(code) => return CallOutcome::NotFound(code),
            }
        }
    };
    run_call(cx, function, None, args, frame, call_site)
}

/// Call a method of `class` on `receiver`.
#[cfg_attr(feature = "profiling", profiling::function)]
#[allow(clippy::too_many_arguments)]
pub(crate) fn call_method(
    cx: &mut ExecContext<'_>,
    cached: &Cell<Option<FunctionId>>,
    receiver: ObjectHandle,
    class: &str,
    name: &str,
    args: &[Variable],
    frame: &mut Frame,
    call_site: Option<Span>,
) -> CallOutcome {
    let function = match frame.call() {
        Some(call) => match cx.engine.programs.function(call.program, call.function) {
            Some(function) => function,
            None => return unknown_function(),
        },
        None => {
            let types = arg_types(args);
            match cx.engine.resolve_method(class, name, &types, cached) {
                Ok(function) => function,
                Err(code) => return CallOutcome::NotFound(code),
            }
        }
    };
    run_call(cx, function, Some(receiver), args, frame, call_site)
}

fn unknown_function() -> CallOutcome {
    CallOutcome::Failed(RuntimeError::new(RuntimeErrorCode::UnknownFunction))
}

fn arg_types(args: &[Variable]) -> Vec<DataType> {
    args.iter().map(|arg| arg.data_type().clone()).collect()
}

fn run_call(
    cx: &mut ExecContext<'_>,
    function: Rc<FunctionEntity>,
    receiver: Option<ObjectHandle>,
    args: &[Variable],
    frame: &mut Frame,
    call_site: Option<Span>,
) -> CallOutcome {
    if cx.depth >= cx.engine.property(EngineProperty::MaxCallDepth) {
        let err = RuntimeError::new(RuntimeErrorCode::StackOverflow);
        return CallOutcome::Failed(match call_site {
            Some(span) => err.positioned(span),
            None => err,
        });
    }

    if frame.call().is_none() {
        frame.clear_progress();
        frame.vars.clear();
        frame.state = FrameState::Call(
            CallFrame::new(function.id(), function.program(), function.call_kind())
                .with_owner(function.owner()),
        );
        trace!(id = %function.id(), name = function.name(), "call entered");
    }

    let caller = std::mem::replace(&mut cx.program, function.program());
    cx.depth += 1;
    let outcome = advance(cx, &function, receiver, args, frame);
    cx.depth -= 1;
    cx.program = caller;

    match outcome {
        CallOutcome::Failed(err) if function.program() != caller => {
            CallOutcome::Failed(match call_site {
                Some(span) => err.positioned(span),
                None => err,
            })
        }
        outcome => outcome,
    }
}

/// Run the remaining steps of the call recorded in `frame`.
fn advance(
    cx: &mut ExecContext<'_>,
    function: &FunctionEntity,
    receiver: Option<ObjectHandle>,
    args: &[Variable],
    frame: &mut Frame,
) -> CallOutcome {
    loop {
        let Some(call) = frame.call() else {
            return unknown_function();
        };
        let (kind, step) = (call.kind, call.step);

        match step {
            CallStep::BindParams => {
                if let Err(err) = function.params().execute(args, &mut frame.vars) {
                    return CallOutcome::Failed(err);
                }
            }
            CallStep::BindInstance => {
                if let Err(err) = bind_instance(cx, function, receiver, &mut frame.vars) {
                    return CallOutcome::Failed(err);
                }
            }
            CallStep::AcquireGuard => {
                let owner = function.owner().unwrap_or_default();
                if !cx.engine.classes.try_lock(owner, cx.token) {
                    trace!(class = owner, token = %cx.token, "guard busy");
                    return CallOutcome::Suspended;
                }
            }
            CallStep::RunBody => return run_body(cx, function, frame),
        }

        if let Some(call) = frame.call_mut() {
            call.step = step.next(kind);
            trace!(id = %call.function, step = ?call.step, "call advanced");
        }
    }
}

fn bind_instance(
    cx: &mut ExecContext<'_>,
    function: &FunctionEntity,
    receiver: Option<ObjectHandle>,
    vars: &mut Vec<Variable>,
) -> Result<(), RuntimeError> {
    let Some(owner) = function.owner() else {
        return Ok(());
    };
    let handle = match receiver {
        Some(handle) => handle,
        None => cx.engine.program_instance(function.program(), owner)?,
    };

    vars.push(reserved(ReservedBinding::CurrentInstance, owner, handle));
    if let Some(parent) = cx.engine.classes.parent(owner) {
        vars.push(reserved(ReservedBinding::ParentAlias, parent, handle));
    }
    Ok(())
}

fn reserved(binding: ReservedBinding, class: &str, handle: ObjectHandle) -> Variable {
    let mut var = Variable::with_value(
        binding.name(),
        DataType::class(class),
        Value::Object(handle),
    );
    var.set_init(InitState::IsPointer);
    var.set_binding(Binding::Reserved(binding));
    var
}

fn run_body(cx: &mut ExecContext<'_>, function: &FunctionEntity, frame: &mut Frame) -> CallOutcome {
    if !cx.gate.allow() {
        trace!(id = %function.id(), "step declined");
        return CallOutcome::Suspended;
    }

    let flow = {
        let Frame { vars, children, .. } = &mut *frame;
        let mut env = Env::new(vars);
        function
            .body()
            .execute(cx, &mut env, children.entry(0).or_default())
    };

    let outcome = match flow {
        Flow::Suspended => return CallOutcome::Suspended,
        Flow::Done => CallOutcome::Completed(Value::default_for(function.return_type())),
        Flow::Unwind(Unwind::Return(value)) => match value.convert_to(function.return_type()) {
            Some(value) => CallOutcome::Completed(value),
            None => CallOutcome::Failed(RuntimeError::new(RuntimeErrorCode::TypeMismatch)),
        },
        Flow::Failed(err) => CallOutcome::Failed(err),
    };

    if let Some(owner) = frame.call().and_then(CallFrame::held_guard) {
        cx.engine.classes.unlock(owner, cx.token);
        trace!(class = owner, token = %cx.token, "guard released");
    }
    trace!(id = %function.id(), ?outcome, "call finished");
    outcome
}

/// Give snapshot variables their bindings again: parameters and locals by
/// the identity their name was compiled to, `this` and `super` in methods.
fn rebind_vars(function: &FunctionEntity, vars: &mut [Variable]) {
    for var in vars {
        let binding = match function.local_id(var.name()) {
            Some(id) => Binding::Var(id),
            None => match ReservedBinding::from_name(var.name()) {
                Some(reserved) if function.owner().is_some() => Binding::Reserved(reserved),
                _ => continue,
            },
        };
        var.set_binding(binding);
    }
}

/// Re-establish the runtime state of a call frame loaded from a snapshot.
///
/// Parameter, local, `this` and `super` bindings are re-tagged, a
/// guard the call held is taken again, and the body in progress is
/// restored. Nothing is executed and no step is repeated.
pub(crate) fn restore_call(cx: &mut ExecContext<'_>, frame: &mut Frame) {
    let Some(call) = frame.call().cloned() else {
        return;
    };
    let Some(function) = cx.engine.programs.function(call.program, call.function) else {
        warn!(
            id = %call.function,
            program = %call.program,
            "snapshot names a function that is not loaded"
        );
        return;
    };

    rebind_vars(&function, &mut frame.vars);
    if frame.guard_held()
        && let Some(owner) = function.owner()
        && !cx.engine.classes.try_lock(owner, cx.token)
    {
        warn!(class = owner, token = %cx.token, "guard of a restored call is held elsewhere");
    }

    if call.step == CallStep::RunBody {
        let caller = std::mem::replace(&mut cx.program, call.program);
        cx.depth += 1;
        let Frame { vars, children, .. } = &mut *frame;
        if let Some(body) = children.get_mut(&0) {
            let mut env = Env::new(vars);
            function.body().restore(cx, &mut env, body);
        }
        cx.depth -= 1;
        cx.program = caller;
    }
    trace!(id = %call.function, step = ?call.step, "call restored");
}
