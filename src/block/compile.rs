//! Compiling `{ ... }` blocks.
//!
//! A recursive descent parser over the token stream of a body. Names are
//! bound against the compile scope and calls are resolved against the
//! unit's signatures while parsing, so the tree it builds is fully typed.

use std::cell::Cell;

use botscript_core::{
    CompileError, DataType, ErrorCode, ReservedBinding, Span, TypeKind, Value,
};
use botscript_parser::{TokenKind, TokenStream, float_value, int_value, string_value};

use crate::block::{BinaryOp, Block, CallSite, Expr, ExprKind, Stmt};
use crate::compiler::types::{parse_type, starts_type};
use crate::compiler::{CompileScope, UnitScope, VarRef};
use crate::overload::Overload;

/// Compile the block at the stream position.
pub fn compile_block(
    stream: &mut TokenStream<'_>,
    unit: &UnitScope<'_>,
    scope: &mut CompileScope,
) -> Result<Block, CompileError> {
    BodyParser {
        stream,
        unit,
        scope,
    }
    .block()
}

struct BodyParser<'p, 't, 'u> {
    stream: &'p mut TokenStream<'t>,
    unit: &'p UnitScope<'u>,
    scope: &'p mut CompileScope,
}

impl BodyParser<'_, '_, '_> {
    fn block(&mut self) -> Result<Block, CompileError> {
        let open = self
            .stream
            .expect(TokenKind::LeftBrace, ErrorCode::MissingOpenBlock)?;
        self.scope.push_block();

        let mut stmts = Vec::new();
        loop {
            if let Some(close) = self.stream.eat(TokenKind::RightBrace) {
                self.scope.pop_block();
                return Ok(Block::new(stmts, open.span.to(close.span)));
            }
            if self.stream.is_at_end() {
                return Err(
                    CompileError::new(ErrorCode::UnexpectedEof, self.stream.peek().span)
                        .with_detail("unclosed block"),
                );
            }
            stmts.push(self.statement()?);
        }
    }

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        match self.stream.peek().kind {
            TokenKind::LeftBrace => Ok(Stmt::Block(self.block()?)),
            TokenKind::Return => self.return_stmt(),
            TokenKind::Wait => self.wait_stmt(),
            TokenKind::Identifier if self.stream.peek_nth(1).kind == TokenKind::Equal => {
                self.assignment()
            }
            _ if self.starts_declaration() => self.declaration(),
            _ => {
                let expr = self.expr()?;
                self.semicolon()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// A type followed by a name. A bare class name is an expression.
    fn starts_declaration(&self) -> bool {
        let token = self.stream.peek();
        if token.kind.is_primitive_type() {
            return true;
        }
        starts_type(&*self.stream, self.unit.classes())
            && matches!(
                self.stream.peek_nth(1).kind,
                TokenKind::Identifier | TokenKind::LeftBracket
            )
    }

    fn return_stmt(&mut self) -> Result<Stmt, CompileError> {
        let keyword = self.stream.advance();
        let expected = self.scope.return_type().clone();

        if let Some(semi) = self.stream.eat(TokenKind::Semicolon) {
            if !expected.is_void() {
                return Err(CompileError::new(ErrorCode::MissingReturnValue, keyword.span)
                    .with_detail(expected.to_string()));
            }
            return Ok(Stmt::Return {
                value: None,
                span: keyword.span.to(semi.span),
            });
        }

        let value = self.expr()?;
        if expected.is_void() || !expected.accepts(&value.data_type, self.unit.classes()) {
            return Err(CompileError::new(ErrorCode::TypeMismatch, value.span).with_detail(
                format!("cannot return {} from {expected}", value.data_type),
            ));
        }
        self.semicolon()?;
        Ok(Stmt::Return {
            value: Some(value),
            span: self.stream.span_since(keyword.span),
        })
    }

    fn wait_stmt(&mut self) -> Result<Stmt, CompileError> {
        let keyword = self.stream.advance();
        self.stream
            .expect(TokenKind::LeftParen, ErrorCode::ExpectedOpenParen)?;
        let count = self.expr()?;
        if !count.data_type.kind().is_numeric() {
            return Err(CompileError::new(ErrorCode::TypeMismatch, count.span)
                .with_detail("wait count must be numeric"));
        }
        self.stream
            .expect(TokenKind::RightParen, ErrorCode::ExpectedCloseParen)?;
        self.semicolon()?;
        Ok(Stmt::Wait {
            count,
            span: self.stream.span_since(keyword.span),
        })
    }

    fn declaration(&mut self) -> Result<Stmt, CompileError> {
        let start = self.stream.peek().span;
        let data_type = parse_type(self.stream, self.unit.classes())
            .ok_or_else(|| CompileError::new(ErrorCode::UnexpectedToken, start))?;
        if data_type.is_void() {
            return Err(CompileError::new(ErrorCode::TypeMismatch, start)
                .with_detail("variables cannot be void"));
        }
        let name = self
            .stream
            .expect(TokenKind::Identifier, ErrorCode::ExpectedIdentifier)?;

        let init = match self.stream.eat(TokenKind::Equal) {
            Some(_) => {
                let init = self.expr()?;
                if !data_type.accepts(&init.data_type, self.unit.classes()) {
                    return Err(CompileError::new(ErrorCode::TypeMismatch, init.span)
                        .with_detail(format!("cannot assign {} to {data_type}", init.data_type)));
                }
                Some(init)
            }
            None => None,
        };
        self.semicolon()?;

        let id = self
            .scope
            .add_local(&name.lexeme, data_type.clone(), name.span)?;
        Ok(Stmt::Declare {
            id,
            name: name.lexeme.clone(),
            data_type,
            init,
            span: self.stream.span_since(start),
        })
    }

    fn assignment(&mut self) -> Result<Stmt, CompileError> {
        let name = self.stream.advance();
        let (target, data_type) = match self.scope.lookup(&name.lexeme) {
            Some((VarRef::Reserved(binding), _)) => {
                return Err(CompileError::new(ErrorCode::TypeMismatch, name.span)
                    .with_detail(format!("cannot assign to '{}'", binding.name())));
            }
            Some((target, data_type)) => (target.clone(), data_type.clone()),
            None => {
                return Err(CompileError::new(ErrorCode::UnknownVariable, name.span)
                    .with_detail(name.lexeme.clone()));
            }
        };
        self.stream.advance();

        let value = self.expr()?;
        if !data_type.accepts(&value.data_type, self.unit.classes()) {
            return Err(CompileError::new(ErrorCode::TypeMismatch, value.span)
                .with_detail(format!("cannot assign {} to {data_type}", value.data_type)));
        }
        self.semicolon()?;
        Ok(Stmt::Assign {
            target,
            value,
            span: self.stream.span_since(name.span),
        })
    }

    fn semicolon(&mut self) -> Result<(), CompileError> {
        self.stream
            .expect(TokenKind::Semicolon, ErrorCode::ExpectedSemicolon)?;
        Ok(())
    }

    // =========================================
    // Expressions
    // =========================================

    fn expr(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.product()?;
        loop {
            let op = match self.stream.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.stream.advance();
            let rhs = self.product()?;
            lhs = binary(op, lhs, rhs)?;
        }
    }

    fn product(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.stream.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.stream.advance();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs)?;
        }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        let Some(minus) = self.stream.eat(TokenKind::Minus) else {
            return self.postfix();
        };
        let operand = self.unary()?;
        let kind = operand.data_type.kind();
        if !kind.is_numeric() {
            return Err(CompileError::new(ErrorCode::TypeMismatch, operand.span)
                .with_detail(format!("cannot negate {}", operand.data_type)));
        }
        let span = minus.span.to(operand.span);
        Ok(Expr::new(
            ExprKind::Neg(Box::new(operand)),
            DataType::primitive(kind.max(TypeKind::Int)),
            span,
        ))
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        while self.stream.eat(TokenKind::Dot).is_some() {
            let name = self
                .stream
                .expect(TokenKind::Identifier, ErrorCode::ExpectedIdentifier)?;
            let Some(class) = expr.data_type.class_name().map(str::to_string) else {
                return Err(CompileError::new(ErrorCode::TypeMismatch, expr.span)
                    .with_detail(format!("{} has no methods", expr.data_type)));
            };
            let args = self.arguments()?;
            let types: Vec<DataType> = args.iter().map(|a| a.data_type.clone()).collect();

            let cached = Cell::new(None);
            let target = self
                .unit
                .resolve_method(&cached, &class, &name.lexeme, &types)
                .map_err(|code| {
                    CompileError::new(code, name.span).with_detail(name.lexeme.clone())
                })?;

            let static_class = matches!(
                expr.kind,
                ExprKind::Var(VarRef::Reserved(ReservedBinding::ParentAlias))
            )
            .then_some(class);
            let span = self.stream.span_since(expr.span);
            expr = Expr::new(
                ExprKind::Call(CallSite {
                    name: name.lexeme.clone(),
                    receiver: Some(Box::new(expr)),
                    static_class,
                    args,
                    cached,
                    span,
                }),
                target.return_type().clone(),
                span,
            );
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.stream.advance();
        let span = token.span;
        let literal = |value: Value, data_type: DataType| -> Result<Expr, CompileError> {
            Ok(Expr::new(ExprKind::Literal(value), data_type, span))
        };

        match token.kind {
            TokenKind::IntLiteral => {
                let value = int_value(&token.lexeme).ok_or_else(|| {
                    CompileError::new(ErrorCode::UnexpectedToken, span)
                        .with_detail(token.lexeme.clone())
                })?;
                let data_type = if i32::try_from(value).is_ok() {
                    DataType::int()
                } else {
                    DataType::long()
                };
                literal(Value::Int(value), data_type)
            }
            TokenKind::FloatLiteral | TokenKind::DoubleLiteral => {
                let value = float_value(&token.lexeme).ok_or_else(|| {
                    CompileError::new(ErrorCode::UnexpectedToken, span)
                        .with_detail(token.lexeme.clone())
                })?;
                if token.kind == TokenKind::FloatLiteral {
                    literal(Value::Float(value as f32 as f64), DataType::float())
                } else {
                    literal(Value::Float(value), DataType::double())
                }
            }
            TokenKind::StringLiteral => {
                literal(Value::String(string_value(&token.lexeme)), DataType::string())
            }
            TokenKind::True => literal(Value::Bool(true), DataType::bool()),
            TokenKind::False => literal(Value::Bool(false), DataType::bool()),
            TokenKind::Null => literal(Value::Null, DataType::null()),
            TokenKind::Identifier if self.stream.check(TokenKind::LeftParen) => {
                self.call(&token.lexeme, span)
            }
            TokenKind::This | TokenKind::Super | TokenKind::Identifier => {
                match self.scope.lookup(&token.lexeme) {
                    Some((target, data_type)) => Ok(Expr::new(
                        ExprKind::Var(target.clone()),
                        data_type.clone(),
                        span,
                    )),
                    None => Err(CompileError::new(ErrorCode::UnknownVariable, span)
                        .with_detail(token.lexeme.clone())),
                }
            }
            TokenKind::LeftParen => {
                let inner = self.expr()?;
                self.stream
                    .expect(TokenKind::RightParen, ErrorCode::ExpectedCloseParen)?;
                Ok(Expr::new(
                    inner.kind,
                    inner.data_type,
                    self.stream.span_since(span),
                ))
            }
            TokenKind::Eof => Err(CompileError::new(ErrorCode::UnexpectedEof, span)),
            kind => Err(CompileError::new(ErrorCode::UnexpectedToken, span)
                .with_detail(kind.description())),
        }
    }

    /// A free call `name(args)`, the name already consumed.
    fn call(&mut self, name: &str, name_span: Span) -> Result<Expr, CompileError> {
        let args = self.arguments()?;
        let types: Vec<DataType> = args.iter().map(|a| a.data_type.clone()).collect();

        let cached = Cell::new(None);
        let target = self
            .unit
            .resolve_call(&cached, name, &types)
            .map_err(|code| CompileError::new(code, name_span).with_detail(name))?;

        let span = self.stream.span_since(name_span);
        Ok(Expr::new(
            ExprKind::Call(CallSite {
                name: name.to_string(),
                receiver: None,
                static_class: None,
                args,
                cached,
                span,
            }),
            target.return_type().clone(),
            span,
        ))
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, CompileError> {
        self.stream
            .expect(TokenKind::LeftParen, ErrorCode::ExpectedOpenParen)?;
        let mut args = Vec::new();
        if self.stream.eat(TokenKind::RightParen).is_some() {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.stream.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.stream
            .expect(TokenKind::RightParen, ErrorCode::ExpectedCloseParen)?;
        Ok(args)
    }
}

/// Type a binary operation.
///
/// Numeric operands promote to the wider kind, at least `int`. `+` with a
/// string on either side concatenates.
fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Result<Expr, CompileError> {
    let (l, r) = (lhs.data_type.kind(), rhs.data_type.kind());
    let span = lhs.span.to(rhs.span);

    let data_type = if l.is_numeric() && r.is_numeric() {
        DataType::primitive(l.max(r).max(TypeKind::Int))
    } else if op == BinaryOp::Add
        && (l == TypeKind::String || r == TypeKind::String)
        && l != TypeKind::Void
        && r != TypeKind::Void
    {
        DataType::string()
    } else {
        return Err(CompileError::new(ErrorCode::TypeMismatch, span).with_detail(format!(
            "operands {} and {}",
            lhs.data_type, rhs.data_type
        )));
    };

    Ok(Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        data_type,
        span,
    ))
}
