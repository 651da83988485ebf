//! The script engine.

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, warn};

use botscript_core::{
    CallFrame, CompileError, DataType, ErrorCode, Frame, FunctionId, IdAllocator, Instance,
    ObjectHandle, ObjectHeap, ProgramId, RuntimeError, RuntimeErrorCode, Variable,
};
use botscript_registry::{ClassEntry, ClassRegistry, PublicRegistry, RegistryError};

use crate::compiler::{CompileEnv, Program, Programs, compile_program};
use crate::config::EngineProperty;
use crate::function::FunctionEntity;
use crate::overload::CallResolver;
use crate::runtime::stack::{EntryCall, Receiver};
use crate::runtime::{CallOutcome, ExecContext, ExecStack, StepGate, Unlimited, invoke};

/// Host-level failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown program {0}")]
    UnknownProgram(ProgramId),

    #[error("compilation failed {0}")]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("unknown class '{0}'")]
    UnknownClass(String),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("stale object handle")]
    StaleObject,

    #[error("no call is active on this stack")]
    NoActiveCall,

    #[error("a call is already suspended on this stack")]
    CallInProgress,
}

/// Owns the loaded programs, the registries and the object heap.
///
/// # Example
///
/// ```
/// use botscript::{CallOutcome, Engine, Value, Variable};
///
/// let mut engine = Engine::new();
/// let program = engine
///     .compile_program("main", "int twice(int a) { return a * 2; }")
///     .unwrap();
/// let mut stack = engine.new_stack(program);
/// let outcome = engine.call(&mut stack, "twice", &[Variable::int(21)]).unwrap();
/// assert_eq!(outcome, CallOutcome::Completed(Value::Int(42)));
/// ```
#[derive(Debug, Default)]
pub struct Engine {
    pub(crate) ids: IdAllocator,
    pub(crate) classes: ClassRegistry,
    pub(crate) public: PublicRegistry<FunctionEntity>,
    pub(crate) programs: Programs,
    pub(crate) heap: ObjectHeap,
    properties: FxHashMap<EngineProperty, usize>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================
    // Configuration
    // =========================================

    pub fn set_property(&mut self, property: EngineProperty, value: usize) {
        if property == EngineProperty::MaxLockWaiters {
            self.classes.set_max_waiters(value);
        }
        self.properties.insert(property, value);
    }

    pub fn property(&self, property: EngineProperty) -> usize {
        self.properties
            .get(&property)
            .copied()
            .unwrap_or_else(|| property.default_value())
    }

    // =========================================
    // Classes and programs
    // =========================================

    /// Register a class. Programs compiled afterwards may use it.
    pub fn register_class(&mut self, entry: ClassEntry) -> Result<(), EngineError> {
        let name = entry.name.clone();
        self.classes.register(entry)?;
        debug!(class = %name, "class registered");
        Ok(())
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn public_functions(&self) -> &PublicRegistry<FunctionEntity> {
        &self.public
    }

    /// Compile a source into a new program.
    ///
    /// # Errors
    ///
    /// The first compile error of the source. Nothing of the program stays
    /// loaded or public.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_program(&mut self, name: &str, source: &str) -> Result<ProgramId, EngineError> {
        let id = self.ids.next_program();
        let env = CompileEnv {
            classes: &self.classes,
            programs: &self.programs,
            program: id,
            resolve_public: self.property(EngineProperty::ResolvePublicCalls) != 0,
        };
        let program = compile_program(name, source, &env, &mut self.ids, &mut self.public)?;
        self.programs.insert(program);
        Ok(id)
    }

    /// Unload a program. Its public functions leave the public registry.
    pub fn unload_program(&mut self, id: ProgramId) -> Result<(), EngineError> {
        let program = self
            .programs
            .remove(id)
            .ok_or(EngineError::UnknownProgram(id))?;
        for function in program.all_functions() {
            self.public.remove(function.id());
        }
        debug!(program = program.name(), %id, "unloaded");
        Ok(())
    }

    pub fn program(&self, id: ProgramId) -> Option<&Program> {
        self.programs.get(id)
    }

    pub fn programs(&self) -> &Programs {
        &self.programs
    }

    /// Find a function of a loaded program or a public function by identity.
    pub fn function(&self, id: FunctionId) -> Option<Rc<FunctionEntity>> {
        self.programs
            .iter()
            .find_map(|program| program.function(id).cloned())
            .or_else(|| self.public.get(id))
    }

    // =========================================
    // Instances
    // =========================================

    /// Allocate an instance of `class` with default members.
    pub fn new_instance(&mut self, class: &str) -> Result<ObjectHandle, EngineError> {
        let fields = self
            .classes
            .instance_template(class)
            .ok_or_else(|| EngineError::UnknownClass(class.to_string()))?;
        Ok(self.heap.allocate(Instance::new(class, fields)))
    }

    /// Bind the object `this` refers to in free-form method calls of a
    /// program.
    pub fn bind_instance(
        &mut self,
        program: ProgramId,
        instance: ObjectHandle,
    ) -> Result<(), EngineError> {
        if self.heap.get(instance).is_none() {
            return Err(EngineError::StaleObject);
        }
        self.programs
            .get_mut(program)
            .ok_or(EngineError::UnknownProgram(program))?
            .set_instance(Some(instance));
        Ok(())
    }

    /// The instance a free-form method of `class` declared by `program`
    /// runs on. An unbound program gets a fresh instance bound.
    pub(crate) fn program_instance(
        &mut self,
        program: ProgramId,
        class: &str,
    ) -> Result<ObjectHandle, RuntimeError> {
        let bound = self.programs.get(program).and_then(Program::instance);
        if let Some(handle) = bound
            && let Some(instance) = self.heap.get(handle)
            && self.classes.chain(instance.class()).any(|c| c.name == class)
        {
            return Ok(handle);
        }

        let fields = self
            .classes
            .instance_template(class)
            .ok_or_else(|| RuntimeError::new(RuntimeErrorCode::MissingInstance))?;
        let handle = self.heap.allocate(Instance::new(class, fields));
        if bound.is_none()
            && let Some(program) = self.programs.get_mut(program)
        {
            program.set_instance(Some(handle));
        }
        Ok(handle)
    }

    pub fn heap(&self) -> &ObjectHeap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut ObjectHeap {
        &mut self.heap
    }

    /// Replace the heap, e.g. with one saved next to suspended stacks.
    pub fn adopt_heap(&mut self, heap: ObjectHeap) {
        self.heap = heap;
    }

    // =========================================
    // Resolution
    // =========================================

    /// Resolve a free call made from `program`: its own functions first,
    /// then the public ones when [`EngineProperty::ResolvePublicCalls`] is
    /// set.
    pub fn resolve_call(
        &self,
        program: ProgramId,
        name: &str,
        args: &[DataType],
        cached: &Cell<Option<FunctionId>>,
    ) -> Result<Rc<FunctionEntity>, ErrorCode> {
        let local = self.programs.get(program).map(Program::functions);
        let include_public = self.property(EngineProperty::ResolvePublicCalls) != 0;
        CallResolver::new(&self.classes, include_public).resolve(
            cached,
            name,
            args,
            || local.into_iter().flatten().cloned(),
            || self.public.iter(),
        )
    }

    /// Resolve a method call on an instance of `class`, walking up the
    /// parent classes until one has a match.
    pub fn resolve_method(
        &self,
        class: &str,
        name: &str,
        args: &[DataType],
        cached: &Cell<Option<FunctionId>>,
    ) -> Result<Rc<FunctionEntity>, ErrorCode> {
        let resolver = CallResolver::new(&self.classes, false);
        let mut first_error = None;
        for entry in self.classes.chain(class) {
            let methods = self.programs.class_methods(&entry.name);
            match resolver.resolve(
                cached,
                name,
                args,
                || methods.iter().cloned(),
                std::iter::empty::<Rc<FunctionEntity>>,
            ) {
                Ok(function) => return Ok(function),
                Err(code) => {
                    first_error.get_or_insert(code);
                }
            }
        }
        Err(first_error.unwrap_or(ErrorCode::UndefinedCall))
    }

    // =========================================
    // Execution
    // =========================================

    /// A new stack for calls resolved in `program`, with a fresh root
    /// context.
    pub fn new_stack(&mut self, program: ProgramId) -> ExecStack {
        ExecStack::new(self.ids.next_context(), program)
    }

    /// Start calling `name(args)` on an idle stack and run until the call
    /// completes, fails or suspends.
    pub fn call(
        &mut self,
        stack: &mut ExecStack,
        name: &str,
        args: &[Variable],
    ) -> Result<CallOutcome, EngineError> {
        self.call_with_gate(stack, name, args, &mut Unlimited)
    }

    pub fn call_with_gate(
        &mut self,
        stack: &mut ExecStack,
        name: &str,
        args: &[Variable],
        gate: &mut dyn StepGate,
    ) -> Result<CallOutcome, EngineError> {
        self.start(stack, name, args, None)?;
        self.drive(stack, gate)
    }

    /// Start calling the method `name(args)` on `receiver`.
    pub fn call_method(
        &mut self,
        stack: &mut ExecStack,
        receiver: ObjectHandle,
        name: &str,
        args: &[Variable],
    ) -> Result<CallOutcome, EngineError> {
        self.call_method_with_gate(stack, receiver, name, args, &mut Unlimited)
    }

    pub fn call_method_with_gate(
        &mut self,
        stack: &mut ExecStack,
        receiver: ObjectHandle,
        name: &str,
        args: &[Variable],
        gate: &mut dyn StepGate,
    ) -> Result<CallOutcome, EngineError> {
        let class = self
            .heap
            .get(receiver)
            .ok_or(EngineError::StaleObject)?
            .class()
            .to_string();
        self.start(
            stack,
            name,
            args,
            Some(Receiver {
                handle: receiver,
                class,
            }),
        )?;
        self.drive(stack, gate)
    }

    /// Continue the call suspended on `stack`.
    pub fn resume(&mut self, stack: &mut ExecStack) -> Result<CallOutcome, EngineError> {
        self.resume_with_gate(stack, &mut Unlimited)
    }

    pub fn resume_with_gate(
        &mut self,
        stack: &mut ExecStack,
        gate: &mut dyn StepGate,
    ) -> Result<CallOutcome, EngineError> {
        self.drive(stack, gate)
    }

    /// Re-establish the runtime state of a stack loaded from a snapshot.
    ///
    /// Must run once, after the programs the stack was running are loaded
    /// again in their original order and before the stack is resumed. An idle
    /// stack is left alone.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn restore_call(&mut self, stack: &mut ExecStack) -> Result<(), EngineError> {
        if stack.entry.is_none() {
            return Ok(());
        }
        if self.programs.get(stack.program()).is_none() {
            return Err(EngineError::UnknownProgram(stack.program()));
        }
        self.ids.reserve_context(stack.context());
        let mut gate = Unlimited;
        let mut cx = ExecContext::new(self, &mut gate, stack.context(), stack.program());
        invoke::restore_call(&mut cx, &mut stack.root);
        debug!(context = %stack.context(), "stack restored");
        Ok(())
    }

    /// Abandon the call suspended on `stack`, releasing the class guards it
    /// holds and leaving every guard queue it waits in.
    pub fn abort(&mut self, stack: &mut ExecStack) {
        let mut pending = vec![&stack.root];
        while let Some(frame) = pending.pop() {
            if let Some(owner) = frame.call().and_then(CallFrame::held_guard) {
                self.classes.unlock(owner, stack.context());
            }
            pending.extend(frame.children.values());
        }
        self.classes.withdraw(stack.context());
        stack.finish();
    }

    fn start(
        &mut self,
        stack: &mut ExecStack,
        name: &str,
        args: &[Variable],
        receiver: Option<Receiver>,
    ) -> Result<(), EngineError> {
        if stack.is_active() {
            return Err(EngineError::CallInProgress);
        }
        stack.root = Frame::new();
        stack.last_error = None;
        stack.entry = Some(EntryCall {
            name: name.to_string(),
            args: args.to_vec(),
            receiver,
            cached: None,
        });
        Ok(())
    }

    fn drive(
        &mut self,
        stack: &mut ExecStack,
        gate: &mut dyn StepGate,
    ) -> Result<CallOutcome, EngineError> {
        let Some(entry) = stack.entry.clone() else {
            return Err(EngineError::NoActiveCall);
        };
        if self.programs.get(stack.program()).is_none() {
            return Err(EngineError::UnknownProgram(stack.program()));
        }

        let cached = Cell::new(entry.cached);
        let outcome = {
            let mut cx = ExecContext::new(self, gate, stack.context(), stack.program());
            match &entry.receiver {
                None => invoke::call_function(
                    &mut cx,
                    &cached,
                    &entry.name,
                    &entry.args,
                    &mut stack.root,
                    None,
                ),
                Some(receiver) => invoke::call_method(
                    &mut cx,
                    &cached,
                    receiver.handle,
                    &receiver.class,
                    &entry.name,
                    &entry.args,
                    &mut stack.root,
                    None,
                ),
            }
        };

        match &outcome {
            CallOutcome::Suspended => {
                if let Some(entry) = &mut stack.entry {
                    entry.cached = cached.get();
                }
            }
            CallOutcome::Failed(err) => {
                warn!(context = %stack.context(), %err, "call failed");
                stack.last_error = Some(err.clone());
                stack.finish();
            }
            CallOutcome::Completed(_) | CallOutcome::NotFound(_) => stack.finish(),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botscript_core::Value;

    #[test]
    fn properties_default_and_override() {
        let mut engine = Engine::new();
        assert_eq!(engine.property(EngineProperty::MaxCallDepth), 128);
        engine.set_property(EngineProperty::MaxCallDepth, 8);
        assert_eq!(engine.property(EngineProperty::MaxCallDepth), 8);
    }

    #[test]
    fn unload_unknown_program() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.unload_program(ProgramId::new(9)),
            Err(EngineError::UnknownProgram(_))
        ));
    }

    #[test]
    fn call_on_active_stack_is_refused() {
        let mut engine = Engine::new();
        let program = engine
            .compile_program("p", "void idle() { wait(1); }")
            .unwrap();
        let mut stack = engine.new_stack(program);
        assert!(engine.call(&mut stack, "idle", &[]).unwrap().is_suspended());
        assert!(matches!(
            engine.call(&mut stack, "idle", &[]),
            Err(EngineError::CallInProgress)
        ));
        assert_eq!(
            engine.resume(&mut stack).unwrap(),
            CallOutcome::Completed(Value::Void)
        );
        assert!(matches!(
            engine.resume(&mut stack),
            Err(EngineError::NoActiveCall)
        ));
    }

    #[test]
    fn free_form_method_gets_program_instance() {
        let mut engine = Engine::new();
        engine
            .register_class(ClassEntry::new("Robot").with_field("energy", DataType::int()))
            .unwrap();
        let program = engine
            .compile_program(
                "p",
                "int Robot::charge(int n) { energy = energy + n; return energy; }",
            )
            .unwrap();
        let mut stack = engine.new_stack(program);
        let first = engine.call(&mut stack, "charge", &[Variable::int(5)]).unwrap();
        let second = engine.call(&mut stack, "charge", &[Variable::int(5)]).unwrap();
        assert_eq!(first, CallOutcome::Completed(Value::Int(5)));
        assert_eq!(second, CallOutcome::Completed(Value::Int(10)));
        assert!(engine.program(program).unwrap().instance().is_some());
    }
}
