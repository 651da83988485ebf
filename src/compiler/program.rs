//! Compilation units.

use std::collections::BTreeMap;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use botscript_core::{
    CompileError, ErrorCode, FunctionId, IdAllocator, ObjectHandle, ProgramId,
};
use botscript_parser::{TokenKind, TokenStream, tokenize};
use botscript_registry::PublicRegistry;

use crate::compiler::{CompileEnv, compile_body, compile_signature};
use crate::function::{FunctionChain, FunctionEntity};

/// A compiled unit: the functions declared in one source, and the methods
/// its class blocks add to existing classes.
#[derive(Debug)]
pub struct Program {
    id: ProgramId,
    name: String,
    functions: FunctionChain,
    methods: BTreeMap<String, FunctionChain>,
    /// The object `this` refers to in free-form method calls.
    instance: Option<ObjectHandle>,
}

impl Program {
    pub fn new(id: ProgramId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            functions: FunctionChain::new(),
            methods: BTreeMap::new(),
            instance: None,
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &FunctionChain {
        &self.functions
    }

    /// The methods this unit compiled for `class`.
    pub fn methods(&self, class: &str) -> Option<&FunctionChain> {
        self.methods.get(class)
    }

    /// Classes this unit added methods to.
    pub fn method_classes(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn instance(&self) -> Option<ObjectHandle> {
        self.instance
    }

    pub(crate) fn set_instance(&mut self, instance: Option<ObjectHandle>) {
        self.instance = instance;
    }

    /// Find a function or method of this unit by identity.
    pub fn function(&self, id: FunctionId) -> Option<&Rc<FunctionEntity>> {
        self.functions
            .get(id)
            .or_else(|| self.methods.values().find_map(|chain| chain.get(id)))
    }

    /// Every function and method of the unit.
    pub fn all_functions(&self) -> impl Iterator<Item = &Rc<FunctionEntity>> {
        self.functions
            .iter()
            .chain(self.methods.values().flat_map(FunctionChain::iter))
    }

    fn add(&mut self, function: Rc<FunctionEntity>, class_block: Option<&str>) {
        match class_block {
            Some(class) => self
                .methods
                .entry(class.to_string())
                .or_default()
                .push(function),
            None => self.functions.push(function),
        }
    }
}

/// The units loaded into an engine.
#[derive(Debug, Default)]
pub struct Programs {
    loaded: BTreeMap<ProgramId, Program>,
    /// Units that compiled methods for a class, in load order.
    class_programs: FxHashMap<String, Vec<ProgramId>>,
}

impl Programs {
    pub fn insert(&mut self, program: Program) {
        for class in program.method_classes() {
            self.class_programs
                .entry(class.to_string())
                .or_default()
                .push(program.id);
        }
        self.loaded.insert(program.id, program);
    }

    pub fn remove(&mut self, id: ProgramId) -> Option<Program> {
        let program = self.loaded.remove(&id)?;
        self.class_programs.retain(|_, ids| {
            ids.retain(|p| *p != id);
            !ids.is_empty()
        });
        Some(program)
    }

    pub fn get(&self, id: ProgramId) -> Option<&Program> {
        self.loaded.get(&id)
    }

    pub fn get_mut(&mut self, id: ProgramId) -> Option<&mut Program> {
        self.loaded.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Program> {
        self.loaded.values()
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// All methods compiled for `class` (not its ancestors), concatenated in
    /// load order.
    pub fn class_methods(&self, class: &str) -> FunctionChain {
        let mut chain = FunctionChain::new();
        for id in self.class_programs.get(class).into_iter().flatten() {
            if let Some(methods) = self.loaded.get(id).and_then(|p| p.methods(class)) {
                chain.add_next(methods);
            }
        }
        chain
    }

    /// A function of a loaded unit.
    pub fn function(&self, program: ProgramId, id: FunctionId) -> Option<Rc<FunctionEntity>> {
        self.loaded.get(&program)?.function(id).cloned()
    }
}

/// Compile a whole source into a unit.
///
/// Runs pass 1 over every declaration, top-level functions and the methods
/// of `class Name { ... }` blocks alike, then pass 2 over the same
/// declarations. The first error aborts the unit: functions of the unit
/// that pass 2 already made public are withdrawn again.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile_program(
    name: &str,
    source: &str,
    env: &CompileEnv<'_>,
    ids: &mut IdAllocator,
    public: &mut PublicRegistry<FunctionEntity>,
) -> Result<Program, CompileError> {
    let tokens = tokenize(source)?;
    let mut stream = TokenStream::new(&tokens);

    let mut declared = Vec::new();
    while !stream.is_at_end() {
        if stream.eat(TokenKind::Class).is_some() {
            let class = stream.expect(TokenKind::Identifier, ErrorCode::ExpectedIdentifier)?;
            if !env.classes.contains(&class.lexeme) {
                return Err(CompileError::new(ErrorCode::UnknownClass, class.span)
                    .with_detail(class.lexeme.clone()));
            }
            stream.expect(TokenKind::LeftBrace, ErrorCode::MissingOpenBlock)?;
            while stream.eat(TokenKind::RightBrace).is_none() {
                if stream.is_at_end() {
                    return Err(CompileError::new(ErrorCode::UnexpectedEof, stream.peek().span)
                        .with_detail("unclosed class block"));
                }
                let signature = compile_signature(
                    &mut stream,
                    env,
                    public,
                    &declared,
                    Some(&class.lexeme),
                    ids,
                )?;
                declared.push(signature);
            }
        } else {
            let signature = compile_signature(&mut stream, env, public, &declared, None, ids)?;
            declared.push(signature);
        }
    }

    let mut program = Program::new(env.program, name);
    let mut published = Vec::new();
    for signature in &declared {
        stream.seek(signature.decl_start);
        match compile_body(&mut stream, env, &declared, signature, public) {
            Ok(function) => {
                if function.is_public() {
                    published.push(function.id());
                }
                program.add(function, signature.class_block.as_deref());
            }
            Err(err) => {
                for id in published {
                    public.remove(id);
                }
                debug!(program = name, %err, "compilation failed");
                return Err(err);
            }
        }
    }

    debug!(program = name, id = %env.program, functions = declared.len(), "compiled");
    Ok(program)
}
