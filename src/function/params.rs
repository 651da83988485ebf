//! Parameter lists.
//!
//! A parameter list is parsed once per compiler pass and owned by the
//! function it declares. At runtime it copies the provided arguments into
//! fresh parameter variables (`execute`) and, after a snapshot was loaded,
//! re-tags those variables without copying anything again (`restore`).

use std::fmt::Write as _;

use botscript_core::{
    Binding, CompileError, DataType, ErrorCode, RuntimeError, RuntimeErrorCode, Span, VarId,
    Variable,
};
use botscript_parser::{TokenKind, TokenStream};
use botscript_registry::ClassRegistry;

use crate::compiler::types::parse_type;

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    data_type: DataType,
    span: Span,
}

impl Param {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

/// An ordered list of typed parameters.
///
/// Parameter `i` is bound to variable identity `i`; locals of the function
/// body are numbered after the parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamList {
    params: Vec<Param>,
    /// The list, parentheses included.
    span: Span,
}

impl ParamList {
    /// Parse `'(' [type name {',' type name}] ')'`.
    pub fn parse(
        stream: &mut TokenStream<'_>,
        classes: &ClassRegistry,
    ) -> Result<ParamList, CompileError> {
        let open = stream.expect(TokenKind::LeftParen, ErrorCode::ExpectedOpenParen)?;
        let mut params: Vec<Param> = Vec::new();

        if !stream.check(TokenKind::RightParen) {
            loop {
                let start = stream.peek().span;
                let data_type = parse_type(stream, classes).ok_or_else(|| {
                    CompileError::new(ErrorCode::UnexpectedToken, start)
                        .with_detail("parameter type expected")
                })?;
                if data_type.is_void() {
                    return Err(CompileError::new(ErrorCode::TypeMismatch, start)
                        .with_detail("void parameter"));
                }
                let name = stream.expect(TokenKind::Identifier, ErrorCode::ExpectedIdentifier)?;
                if params.iter().any(|p| p.name == name.lexeme) {
                    return Err(
                        CompileError::new(ErrorCode::RedefinedVariable, name.span)
                            .with_detail(name.lexeme.clone()),
                    );
                }
                params.push(Param {
                    name: name.lexeme.clone(),
                    data_type,
                    span: start.to(name.span),
                });
                if stream.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        stream.expect(TokenKind::RightParen, ErrorCode::ExpectedCloseParen)?;
        Ok(ParamList {
            params,
            span: stream.span_since(open.span),
        })
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Param> {
        self.params.get(index)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn types(&self) -> impl Iterator<Item = &DataType> {
        self.params.iter().map(|p| &p.data_type)
    }

    /// Whether both lists have the same length and pairwise equal types.
    /// Names do not matter.
    pub fn matches(&self, other: &ParamList) -> bool {
        self.len() == other.len() && self.types().eq(other.types())
    }

    pub fn matches_types(&self, types: &[DataType]) -> bool {
        self.len() == types.len() && self.types().eq(types.iter())
    }

    /// Format as `( int a, float b )`, or `()` when empty.
    pub fn format(&self) -> String {
        if self.params.is_empty() {
            return "()".to_string();
        }
        let mut out = String::from("(");
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, " {} {}", param.data_type, param.name);
        }
        out.push_str(" )");
        out
    }

    /// Bind `args` to fresh parameter variables appended to `vars`.
    pub fn execute(&self, args: &[Variable], vars: &mut Vec<Variable>) -> Result<(), RuntimeError> {
        for (index, param) in self.params.iter().enumerate() {
            let value = args
                .get(index)
                .and_then(|arg| arg.value().convert_to(&param.data_type))
                .ok_or_else(|| RuntimeError::at(RuntimeErrorCode::TypeMismatch, param.span))?;
            let mut var = Variable::with_value(param.name.clone(), param.data_type.clone(), value);
            var.set_binding(Binding::Var(VarId::new(index as u32)));
            vars.push(var);
        }
        Ok(())
    }
}
