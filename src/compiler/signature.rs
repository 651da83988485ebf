//! Declaration headers and pass 1.

use tracing::debug;

use botscript_core::{
    CompileError, DataType, ErrorCode, FunctionPositions, IdAllocator, Span,
};
use botscript_parser::{TokenKind, TokenStream, skip_block};
use botscript_registry::{ClassRegistry, PublicRegistry};

use crate::compiler::CompileEnv;
use crate::compiler::types::parse_type;
use crate::function::{FunctionEntity, FunctionFlags, FunctionSignature, ParamList};

/// Everything in front of a function body.
#[derive(Debug)]
pub(crate) struct Header {
    pub public: bool,
    pub extern_kw: Option<Span>,
    pub synchronized: bool,
    pub return_type: DataType,
    pub owner: Option<String>,
    pub name: String,
    pub name_span: Span,
    pub params: ParamList,
    /// First token of the declaration.
    pub start: Span,
}

impl Header {
    pub fn flags(&self, with_public: bool) -> FunctionFlags {
        let mut flags = FunctionFlags::empty();
        flags.set(FunctionFlags::PUBLIC, with_public && self.public);
        flags.set(FunctionFlags::EXTERN, self.extern_kw.is_some());
        flags.set(FunctionFlags::SYNCHRONIZED, self.synchronized);
        flags
    }

    pub fn positions(&self, body: Span) -> FunctionPositions {
        FunctionPositions {
            extern_kw: self.extern_kw,
            name: self.name_span,
            params: self.params.span(),
            body,
            whole: self.start.to(body),
        }
    }

    fn same_signature(&self, name: &str, owner: Option<&str>, params: &ParamList) -> bool {
        self.name == name && self.owner.as_deref() == owner && self.params.matches(params)
    }
}

/// Parse `{modifier} type [Class '::'] ['~'] name params`.
///
/// Inside a class block the owner is the enclosing class and no `Class::`
/// prefix is read.
pub(crate) fn parse_header(
    stream: &mut TokenStream<'_>,
    classes: &ClassRegistry,
    class_block: Option<&str>,
) -> Result<Header, CompileError> {
    let start = stream.peek().span;
    let mut public = false;
    let mut extern_kw = None;
    let mut synchronized = false;

    loop {
        let token = stream.peek();
        match token.kind {
            TokenKind::Public if class_block.is_some() => {
                return Err(CompileError::new(ErrorCode::UnexpectedToken, token.span)
                    .with_detail("methods of a class block cannot be public"));
            }
            TokenKind::Public => public = true,
            TokenKind::Extern => extern_kw = Some(token.span),
            TokenKind::Synchronized => synchronized = true,
            _ => break,
        }
        stream.advance();
    }

    let return_type = parse_type(stream, classes)
        .ok_or_else(|| CompileError::new(ErrorCode::NoTypeForReturnValue, stream.peek().span))?;

    let mut owner = class_block.map(str::to_string);
    if class_block.is_none()
        && stream.check(TokenKind::Identifier)
        && stream.peek_nth(1).kind == TokenKind::ColonColon
    {
        let class = stream.advance();
        if !classes.contains(&class.lexeme) {
            return Err(CompileError::new(ErrorCode::UnknownClass, class.span)
                .with_detail(class.lexeme.clone()));
        }
        stream.advance();
        owner = Some(class.lexeme.clone());
    }

    let tilde = stream.eat(TokenKind::Tilde);
    let name = stream.expect(TokenKind::Identifier, ErrorCode::NoSuchFunctionName)?;
    let (name, name_span) = match tilde {
        Some(tilde) => (format!("~{}", name.lexeme), tilde.span.to(name.span)),
        None => (name.lexeme.clone(), name.span),
    };

    let params = ParamList::parse(stream, classes)?;

    Ok(Header {
        public,
        extern_kw,
        synchronized,
        return_type,
        owner,
        name,
        name_span,
        params,
        start,
    })
}

/// Pass 1: read one declaration up to its body and skip the body.
///
/// The declaration must not repeat a signature already known: for free
/// functions the unit's earlier declarations and the public functions, for
/// methods of a class block the unit's earlier methods of that class, the
/// methods other units compiled for it and the calls the class itself
/// declares. A repeat fails with [`ErrorCode::Redefinition`].
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile_signature(
    stream: &mut TokenStream<'_>,
    env: &CompileEnv<'_>,
    public: &PublicRegistry<FunctionEntity>,
    declared: &[FunctionSignature],
    class_block: Option<&str>,
    ids: &mut IdAllocator,
) -> Result<FunctionSignature, CompileError> {
    let decl_start = stream.position();
    let header = parse_header(stream, env.classes, class_block)?;

    let redefined = match class_block {
        Some(class) => {
            let types: Vec<DataType> = header.params.types().cloned().collect();
            declared.iter().any(|s| {
                s.class_block.as_deref() == Some(class)
                    && header.same_signature(&s.name, s.owner.as_deref(), &s.params)
            }) || env
                .programs
                .class_methods(class)
                .iter()
                .any(|f| header.same_signature(f.name(), f.owner(), f.params()))
                || env.classes.declares_call(class, &header.name, &types)
        }
        None => {
            declared.iter().any(|s| {
                s.class_block.is_none()
                    && header.same_signature(&s.name, s.owner.as_deref(), &s.params)
            }) || public
                .iter()
                .any(|f| header.same_signature(f.name(), f.owner(), f.params()))
        }
    };
    if redefined {
        return Err(CompileError::new(ErrorCode::Redefinition, header.name_span)
            .with_detail(header.name.clone()));
    }

    let body = skip_block(stream)?;
    let id = ids.next_function();
    debug!(%id, name = %header.name, params = %header.params.format(), "declared");

    Ok(FunctionSignature {
        id,
        flags: header.flags(false),
        positions: header.positions(body),
        name: header.name,
        return_type: header.return_type,
        params: header.params,
        owner: header.owner,
        class_block: class_block.map(str::to_string),
        decl_start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use botscript_core::{ProgramId, SourceRegion};
    use botscript_parser::tokenize;
    use botscript_registry::ClassEntry;

    use crate::compiler::Programs;

    struct Fixture {
        classes: ClassRegistry,
        programs: Programs,
        public: PublicRegistry<FunctionEntity>,
        ids: IdAllocator,
    }

    impl Fixture {
        fn new() -> Self {
            let mut classes = ClassRegistry::new();
            classes.register(ClassEntry::new("Robot")).unwrap();
            Self {
                classes,
                programs: Programs::default(),
                public: PublicRegistry::new(),
                ids: IdAllocator::new(),
            }
        }

        fn pass1(&mut self, source: &str) -> Result<Vec<FunctionSignature>, CompileError> {
            let env = CompileEnv {
                classes: &self.classes,
                programs: &self.programs,
                program: ProgramId::new(1),
                resolve_public: true,
            };
            let tokens = tokenize(source)?;
            let mut stream = TokenStream::new(&tokens);
            let mut declared = Vec::new();
            while !stream.is_at_end() {
                let sig = compile_signature(
                    &mut stream,
                    &env,
                    &self.public,
                    &declared,
                    None,
                    &mut self.ids,
                )?;
                declared.push(sig);
            }
            Ok(declared)
        }
    }

    #[test]
    fn reads_headers_and_skips_bodies() {
        let mut fx = Fixture::new();
        let sigs = fx
            .pass1("public int f(int a) { { } return a; } extern void Robot::go() { }")
            .unwrap();
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0].name, "f");
        assert!(!sigs[0].flags.contains(FunctionFlags::PUBLIC));
        assert_eq!(sigs[1].owner.as_deref(), Some("Robot"));
        assert!(sigs[1].flags.contains(FunctionFlags::EXTERN));
        assert!(sigs[1].id > sigs[0].id);
    }

    #[test]
    fn destructor_name() {
        let mut fx = Fixture::new();
        let sigs = fx.pass1("void Robot::~Robot() { }").unwrap();
        assert_eq!(sigs[0].name, "~Robot");
    }

    #[test]
    fn positions_cover_regions() {
        let mut fx = Fixture::new();
        let source = "extern void f(int a) { }";
        let sigs = fx.pass1(source).unwrap();
        let pos = &sigs[0].positions;
        let slice = |(s, e): (u32, u32)| &source[s as usize..e as usize];
        assert_eq!(slice(pos.range(SourceRegion::Extern, SourceRegion::Extern)), "extern");
        assert_eq!(slice(pos.range(SourceRegion::Name, SourceRegion::Name)), "f");
        assert_eq!(slice(pos.range(SourceRegion::Params, SourceRegion::Params)), "(int a)");
        assert_eq!(slice(pos.range(SourceRegion::Body, SourceRegion::Body)), "{ }");
        assert_eq!(slice(pos.range(SourceRegion::Whole, SourceRegion::Whole)), source);
    }

    #[test]
    fn errors() {
        let code = |source: &str| Fixture::new().pass1(source).unwrap_err().code;
        assert_eq!(code("f() { }"), ErrorCode::NoTypeForReturnValue);
        assert_eq!(code("void () { }"), ErrorCode::NoSuchFunctionName);
        assert_eq!(code("void Drone::f() { }"), ErrorCode::UnknownClass);
        assert_eq!(code("void f() ;"), ErrorCode::MissingOpenBlock);
        assert_eq!(code("void f() { } int f() { }"), ErrorCode::Redefinition);
    }

    #[test]
    fn overloads_and_owners_are_distinct() {
        let mut fx = Fixture::new();
        let sigs = fx
            .pass1("void f() { } void f(int a) { } void Robot::f() { }")
            .unwrap();
        assert_eq!(sigs.len(), 3);
    }
}
