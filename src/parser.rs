//! Parser for JScript source code
//!
//! Recursive descent for statements, precedence climbing for binary
//! operators. Automatic semicolon insertion follows the usual rule: a
//! missing `;` is accepted before `}`, at end of input or after a newline.

use crate::ast::*;
use crate::error::{ErrorCode, JsError, SourceLocation};
use crate::lexer::{Lexer, Span, Token, TokenKind};
use crate::string_dict::StringDict;
use crate::value::{JsString, number_to_string};

/// Limit on nested statements and expressions, kept well inside the native
/// stack of the parser and the compiler
const MAX_NESTING_DEPTH: u32 = 256;

/// Parser for one compilation unit
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    /// Set while parsing a `for` initializer, where `in` ends the expression
    no_in: bool,
    /// Nesting depth of function bodies
    function_depth: u32,
    /// Nesting depth of statements and expressions
    depth: u32,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, string_dict: &'a mut StringDict) -> Self {
        let mut lexer = Lexer::new(source, string_dict);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            previous: Token::eof(0, 1, 1),
            no_in: false,
            function_depth: 0,
            depth: 0,
        }
    }

    /// Parse a complete program
    pub fn parse_program(&mut self, eval_mode: bool) -> Result<Program, JsError> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body, eval_mode })
    }

    /// Parse a formal-parameter list given as a standalone string
    /// (`Function("a, b", body)`)
    pub fn parse_formal_parameters(&mut self) -> Result<Vec<Identifier>, JsError> {
        let mut params = Vec::new();
        if self.is_at_end() {
            return Ok(params);
        }
        loop {
            params.push(self.parse_identifier()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        if !self.is_at_end() {
            return Err(self.unexpected_token(ErrorCode::SYNTAX));
        }
        Ok(params)
    }

    // ============ STATEMENTS ============

    fn parse_statement(&mut self) -> Result<Statement, JsError> {
        self.enter_nested()?;
        let result = self.parse_statement_inner();
        self.depth -= 1;
        result
    }

    fn parse_statement_inner(&mut self) -> Result<Statement, JsError> {
        match &self.current.kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.parse_variable_declaration()?;
                self.expect_semicolon()?;
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Function => Ok(Statement::FunctionDeclaration(Box::new(
                self.parse_function(true)?,
            ))),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::With => self.parse_with_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => self.parse_break_statement(),
            TokenKind::Continue => self.parse_continue_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::LBrace => Ok(Statement::Block(self.parse_block_statement()?)),
            TokenKind::Semicolon => {
                let span = self.current.span;
                self.advance();
                Ok(Statement::Empty(span))
            }
            TokenKind::Debugger => {
                let span = self.current.span;
                self.advance();
                self.expect_semicolon()?;
                Ok(Statement::Empty(span))
            }
            _ => {
                let start = self.current.span;
                let expr = self.parse_expression()?;

                // A bare identifier followed by ':' is a label
                if let Expression::Identifier(label) = &expr
                    && self.check(&TokenKind::Colon)
                {
                    let label = label.clone();
                    self.advance();
                    let body = Box::new(self.parse_statement()?);
                    let span = self.span_from(start);
                    return Ok(Statement::Labeled(LabeledStatement { label, body, span }));
                }

                self.expect_semicolon()?;
                let span = self.span_from(start);
                Ok(Statement::Expression(ExpressionStatement {
                    expression: expr,
                    span,
                }))
            }
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, JsError> {
        let start = self.current.span;
        let kind = match &self.current.kind {
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => VariableKind::Var,
        };
        self.advance();

        let mut declarations = vec![self.parse_variable_declarator(kind)?];
        while self.match_token(&TokenKind::Comma) {
            declarations.push(self.parse_variable_declarator(kind)?);
        }

        let span = self.span_from(start);
        Ok(VariableDeclaration {
            kind,
            declarations,
            span,
        })
    }

    fn parse_variable_declarator(&mut self, kind: VariableKind) -> Result<VariableDeclarator, JsError> {
        let start = self.current.span;
        let id = self.parse_identifier()?;

        let init = if self.match_token(&TokenKind::Eq) {
            Some(self.parse_assignment_expression()?)
        } else {
            None
        };

        // A const without initializer is only allowed as a for-in target
        if kind == VariableKind::Const && init.is_none() && !self.no_in {
            return Err(self.error_at(ErrorCode::SYNTAX, "Expected '=' in const declaration", self.current.span));
        }

        let span = self.span_from(start);
        Ok(VariableDeclarator { id, init, span })
    }

    fn parse_function(&mut self, is_declaration: bool) -> Result<FunctionLiteral, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::Function)?;

        let id = if self.check_identifier() {
            Some(self.parse_identifier()?)
        } else if is_declaration {
            return Err(self.unexpected_token(ErrorCode::EXPECTED_IDENTIFIER));
        } else {
            None
        };

        self.require_token(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.parse_identifier()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.require_token(&TokenKind::RParen)?;
        self.require_token(&TokenKind::LBrace)?;

        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        self.function_depth += 1;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.function_depth -= 1;
        self.no_in = saved_no_in;
        self.require_token(&TokenKind::RBrace)?;

        let span = self.span_from(start);
        Ok(FunctionLiteral {
            id,
            params,
            body,
            is_declaration,
            source_start: start.start,
            source_end: self.previous.span.end,
            span,
        })
    }

    fn parse_block_statement(&mut self) -> Result<BlockStatement, JsError> {
        let start = self.current.span;
        self.require_token(&TokenKind::LBrace)?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        self.require_token(&TokenKind::RBrace)?;
        let span = self.span_from(start);
        Ok(BlockStatement { body, span })
    }

    fn parse_paren_expression(&mut self) -> Result<Expression, JsError> {
        self.require_token(&TokenKind::LParen)?;
        let expr = self.parse_expression()?;
        self.require_token(&TokenKind::RParen)?;
        Ok(expr)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        let test = self.parse_paren_expression()?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        let span = self.span_from(start);
        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
            span,
        }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();
        self.require_token(&TokenKind::LParen)?;

        let saved_no_in = std::mem::replace(&mut self.no_in, true);
        let init = match &self.current.kind {
            TokenKind::Semicolon => None,
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                Some(ForInit::Variable(self.parse_variable_declaration()?))
            }
            _ => Some(ForInit::Expression(self.parse_expression()?)),
        };
        self.no_in = saved_no_in;

        if self.match_token(&TokenKind::In) {
            let left = match init {
                Some(ForInit::Variable(decl)) if decl.declarations.len() == 1 => ForInLeft::Variable(decl),
                Some(ForInit::Expression(expr)) => ForInLeft::Expression(expr),
                _ => return Err(self.error_at(ErrorCode::SYNTAX, "Invalid for-in target", start)),
            };
            let right = self.parse_expression()?;
            self.require_token(&TokenKind::RParen)?;
            let body = Box::new(self.parse_statement()?);
            let span = self.span_from(start);
            return Ok(Statement::ForIn(ForInStatement {
                left,
                right,
                body,
                span,
            }));
        }

        if let Some(ForInit::Variable(decl)) = &init
            && decl.kind == VariableKind::Const
            && decl.declarations.iter().any(|d| d.init.is_none())
        {
            return Err(self.error_at(ErrorCode::SYNTAX, "Expected '=' in const declaration", start));
        }

        self.require_token(&TokenKind::Semicolon)?;
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.require_token(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.require_token(&TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);

        let span = self.span_from(start);
        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
            span,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        let test = self.parse_paren_expression()?;
        let body = Box::new(self.parse_statement()?);

        let span = self.span_from(start);
        Ok(Statement::While(WhileStatement { test, body, span }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        let body = Box::new(self.parse_statement()?);
        self.require_token(&TokenKind::While)?;
        let test = self.parse_paren_expression()?;
        // A semicolon after do-while is always optional
        self.match_token(&TokenKind::Semicolon);

        let span = self.span_from(start);
        Ok(Statement::DoWhile(DoWhileStatement { body, test, span }))
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        let discriminant = self.parse_paren_expression()?;
        self.require_token(&TokenKind::LBrace)?;

        let mut cases = Vec::new();
        let mut has_default = false;
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let case_start = self.current.span;
            let test = if self.match_token(&TokenKind::Default) {
                if has_default {
                    return Err(self.error_at(ErrorCode::SYNTAX, "Duplicate default clause", case_start));
                }
                has_default = true;
                None
            } else {
                self.require_token(&TokenKind::Case)?;
                Some(self.parse_expression()?)
            };
            self.require_token(&TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !matches!(
                self.current.kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }

            let span = self.span_from(case_start);
            cases.push(SwitchCase {
                test,
                consequent,
                span,
            });
        }
        self.require_token(&TokenKind::RBrace)?;

        let span = self.span_from(start);
        Ok(Statement::Switch(SwitchStatement {
            discriminant,
            cases,
            span,
        }))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        let block = self.parse_block_statement()?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.current.span;
            self.advance();
            self.require_token(&TokenKind::LParen)?;
            let param = self.parse_identifier()?;
            self.require_token(&TokenKind::RParen)?;
            let body = self.parse_block_statement()?;
            let span = self.span_from(catch_start);
            Some(CatchClause { param, body, span })
        } else {
            None
        };

        let finalizer = if self.match_token(&TokenKind::Finally) {
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_at(ErrorCode::SYNTAX, "Expected 'catch' or 'finally'", self.current.span));
        }

        let span = self.span_from(start);
        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
            span,
        }))
    }

    fn parse_with_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        let object = self.parse_paren_expression()?;
        let body = Box::new(self.parse_statement()?);

        let span = self.span_from(start);
        Ok(Statement::With(WithStatement { object, body, span }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        let argument = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_semicolon()?;

        let span = self.span_from(start);
        Ok(Statement::Return(ReturnStatement { argument, span }))
    }

    fn parse_break_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        let label = if self.check_identifier() && !self.lexer.had_newline_before() {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        self.expect_semicolon()?;

        let span = self.span_from(start);
        Ok(Statement::Break(BreakStatement { label, span }))
    }

    fn parse_continue_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        let label = if self.check_identifier() && !self.lexer.had_newline_before() {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        self.expect_semicolon()?;

        let span = self.span_from(start);
        Ok(Statement::Continue(ContinueStatement { label, span }))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.current.span;
        self.advance();

        if self.lexer.had_newline_before() {
            return Err(self.error_at(ErrorCode::SYNTAX, "Illegal newline after throw", self.current.span));
        }
        let argument = self.parse_expression()?;
        self.expect_semicolon()?;

        let span = self.span_from(start);
        Ok(Statement::Throw(ThrowStatement { argument, span }))
    }

    // ============ EXPRESSIONS ============

    pub fn parse_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let first = self.parse_assignment_expression()?;

        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.match_token(&TokenKind::Comma) {
            expressions.push(self.parse_assignment_expression()?);
        }

        let span = self.span_from(start);
        Ok(Expression::Sequence(SequenceExpression { expressions, span }))
    }

    fn parse_assignment_expression(&mut self) -> Result<Expression, JsError> {
        self.enter_nested()?;
        let result = self.parse_assignment_expression_inner();
        self.depth -= 1;
        result
    }

    fn parse_assignment_expression_inner(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let left = self.parse_conditional_expression()?;

        let Some(operator) = self.current_assignment_op() else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_assignment_expression()?;

        let span = self.span_from(start);
        Ok(Expression::Assignment(AssignmentExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span,
        }))
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let test = self.parse_binary_expression(0)?;

        if !self.match_token(&TokenKind::Question) {
            return Ok(test);
        }

        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assignment_expression()?;
        self.no_in = saved_no_in;
        self.require_token(&TokenKind::Colon)?;
        let alternate = self.parse_assignment_expression()?;

        let span = self.span_from(start);
        Ok(Expression::Conditional(ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span,
        }))
    }

    fn parse_binary_expression(&mut self, min_prec: u8) -> Result<Expression, JsError> {
        let start = self.current.span;
        let mut left = self.parse_unary_expression()?;

        while let Some((op, prec)) = self.current_binary_op() {
            if prec < min_prec {
                break;
            }
            self.advance();

            let right = self.parse_binary_expression(prec + 1)?;
            let span = self.span_from(start);
            left = match op {
                BinaryOrLogical::Logical(operator) => Expression::Logical(LogicalExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                }),
                BinaryOrLogical::Binary(operator) => Expression::Binary(BinaryExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                }),
            };
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, JsError> {
        self.enter_nested()?;
        let result = self.parse_unary_expression_inner();
        self.depth -= 1;
        result
    }

    fn parse_unary_expression_inner(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;

        if let Some(operator) = self.current_unary_op() {
            self.advance();
            let argument = Box::new(self.parse_unary_expression()?);
            let span = self.span_from(start);
            return Ok(Expression::Unary(UnaryExpression {
                operator,
                argument,
                span,
            }));
        }

        if matches!(self.current.kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let increment = self.check(&TokenKind::PlusPlus);
            self.advance();
            let argument = Box::new(self.parse_unary_expression()?);
            let span = self.span_from(start);
            return Ok(Expression::Update(UpdateExpression {
                increment,
                prefix: true,
                argument,
                span,
            }));
        }

        self.parse_postfix_expression()
    }

    fn parse_postfix_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let expr = self.parse_left_hand_side_expression()?;

        if matches!(self.current.kind, TokenKind::PlusPlus | TokenKind::MinusMinus)
            && !self.lexer.had_newline_before()
        {
            let increment = self.check(&TokenKind::PlusPlus);
            self.advance();
            let span = self.span_from(start);
            return Ok(Expression::Update(UpdateExpression {
                increment,
                prefix: false,
                argument: Box::new(expr),
                span,
            }));
        }

        Ok(expr)
    }

    fn parse_left_hand_side_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        let mut expr = self.parse_member_expression()?;

        loop {
            if self.check(&TokenKind::LParen) {
                let arguments = self.parse_arguments()?;
                let span = self.span_from(start);
                expr = Expression::Call(CallExpression {
                    callee: Box::new(expr),
                    arguments,
                    span,
                });
            } else if let Some(property) = self.parse_member_suffix()? {
                let span = self.span_from(start);
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property,
                    span,
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// `new` expressions and member accesses without calls
    fn parse_member_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;

        let mut expr = if self.match_token(&TokenKind::New) {
            let callee = Box::new(self.parse_member_expression()?);
            let arguments = if self.check(&TokenKind::LParen) {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            let span = self.span_from(start);
            Expression::New(NewExpression {
                callee,
                arguments,
                span,
            })
        } else {
            self.parse_primary_expression()?
        };

        while let Some(property) = self.parse_member_suffix()? {
            let span = self.span_from(start);
            expr = Expression::Member(MemberExpression {
                object: Box::new(expr),
                property,
                span,
            });
        }

        Ok(expr)
    }

    fn parse_member_suffix(&mut self) -> Result<Option<MemberProperty>, JsError> {
        if self.match_token(&TokenKind::Dot) {
            let span = self.current.span;
            let Some(name) = self.property_name_token() else {
                return Err(self.unexpected_token(ErrorCode::EXPECTED_IDENTIFIER));
            };
            self.advance();
            return Ok(Some(MemberProperty::Identifier(Identifier { name, span })));
        }
        if self.match_token(&TokenKind::LBracket) {
            let saved_no_in = std::mem::replace(&mut self.no_in, false);
            let index = self.parse_expression()?;
            self.no_in = saved_no_in;
            self.require_token(&TokenKind::RBracket)?;
            return Ok(Some(MemberProperty::Expression(Box::new(index))));
        }
        Ok(None)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, JsError> {
        self.require_token(&TokenKind::LParen)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut arguments = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                arguments.push(self.parse_assignment_expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.no_in = saved_no_in;
        self.require_token(&TokenKind::RParen)?;
        Ok(arguments)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;

        let literal = |value| Expression::Literal(Literal { value, span: start });
        let expr = match self.current.kind.clone() {
            TokenKind::Number(n) => literal(LiteralValue::Number(n)),
            TokenKind::String(s) => literal(LiteralValue::String(s)),
            TokenKind::True => literal(LiteralValue::Boolean(true)),
            TokenKind::False => literal(LiteralValue::Boolean(false)),
            TokenKind::Null => literal(LiteralValue::Null),
            TokenKind::This => Expression::This(start),
            TokenKind::Identifier(name) => Expression::Identifier(Identifier { name, span: start }),
            TokenKind::Slash | TokenKind::SlashEq => {
                self.current = self.lexer.rescan_as_regexp(start);
                match self.current.kind.clone() {
                    TokenKind::RegExp(pattern, flags) => {
                        literal(LiteralValue::RegExp { pattern, flags })
                    }
                    _ => return Err(self.error_at(ErrorCode::SYNTAX, "Unterminated regular expression", start)),
                }
            }
            TokenKind::Function => return Ok(Expression::Function(Box::new(self.parse_function(false)?))),
            TokenKind::LParen => {
                self.advance();
                let saved_no_in = std::mem::replace(&mut self.no_in, false);
                let expr = self.parse_expression()?;
                self.no_in = saved_no_in;
                self.require_token(&TokenKind::RParen)?;
                return Ok(expr);
            }
            TokenKind::LBracket => return self.parse_array_literal(),
            TokenKind::LBrace => return self.parse_object_literal(),
            _ => return Err(self.unexpected_token(ErrorCode::SYNTAX)),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        self.advance();
        let saved_no_in = std::mem::replace(&mut self.no_in, false);

        let mut elements = Vec::new();
        loop {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            if self.match_token(&TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_assignment_expression()?));
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.no_in = saved_no_in;
        self.require_token(&TokenKind::RBracket)?;
        let span = self.span_from(start);
        Ok(Expression::Array(ArrayExpression { elements, span }))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.current.span;
        self.advance();
        let saved_no_in = std::mem::replace(&mut self.no_in, false);

        let mut properties = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            properties.push(self.parse_property()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.no_in = saved_no_in;
        self.require_token(&TokenKind::RBrace)?;
        let span = self.span_from(start);
        Ok(Expression::Object(ObjectExpression { properties, span }))
    }

    fn parse_property(&mut self) -> Result<Property, JsError> {
        let start = self.current.span;
        let key = self.parse_property_key()?;

        // `get name() {}` / `set name(v) {}`
        let accessor = match key.as_str() {
            "get" => Some(PropertyKind::Get),
            "set" => Some(PropertyKind::Set),
            _ => None,
        };
        if let Some(kind) = accessor
            && !matches!(
                self.current.kind,
                TokenKind::Colon | TokenKind::Comma | TokenKind::RBrace | TokenKind::LParen
            )
        {
            let name = self.parse_property_key()?;
            let func_start = self.current.span;
            self.require_token(&TokenKind::LParen)?;
            let mut params = Vec::new();
            if !self.check(&TokenKind::RParen) {
                params.push(self.parse_identifier()?);
            }
            self.require_token(&TokenKind::RParen)?;
            let expected = if kind == PropertyKind::Get { 0 } else { 1 };
            if params.len() != expected {
                return Err(self.error_at(ErrorCode::SYNTAX, "Invalid accessor parameter list", func_start));
            }
            let body = self.parse_function_body()?;
            let span = self.span_from(start);
            let function = FunctionLiteral {
                id: None,
                params,
                body,
                is_declaration: false,
                source_start: start.start,
                source_end: self.previous.span.end,
                span,
            };
            return Ok(Property {
                key: name,
                value: Expression::Function(Box::new(function)),
                kind,
                span,
            });
        }

        self.require_token(&TokenKind::Colon)?;
        let value = self.parse_assignment_expression()?;
        let span = self.span_from(start);
        Ok(Property {
            key,
            value,
            kind: PropertyKind::Init,
            span,
        })
    }

    fn parse_function_body(&mut self) -> Result<Vec<Statement>, JsError> {
        self.require_token(&TokenKind::LBrace)?;
        self.function_depth += 1;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.function_depth -= 1;
        self.require_token(&TokenKind::RBrace)?;
        Ok(body)
    }

    fn parse_property_key(&mut self) -> Result<JsString, JsError> {
        let key = match &self.current.kind {
            TokenKind::String(s) => s.clone(),
            TokenKind::Number(n) => {
                let text = number_to_string(*n);
                self.lexer.string_dict().get_or_insert(&text)
            }
            _ => match self.property_name_token() {
                Some(name) => name,
                None => return Err(self.unexpected_token(ErrorCode::EXPECTED_IDENTIFIER)),
            },
        };
        self.advance();
        Ok(key)
    }

    /// Identifier or reserved word usable after `.` and as an object key
    fn property_name_token(&mut self) -> Option<JsString> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            return Some(name.clone());
        }
        let text = keyword_text(&self.current.kind)?;
        Some(self.lexer.string_dict().get_or_insert(text))
    }

    fn parse_identifier(&mut self) -> Result<Identifier, JsError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let id = Identifier {
                    name: name.clone(),
                    span: self.current.span,
                };
                self.advance();
                Ok(id)
            }
            _ => Err(self.unexpected_token(ErrorCode::EXPECTED_IDENTIFIER)),
        }
    }

    // ============ TOKEN HELPERS ============

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
    }

    fn require_token(&mut self, kind: &TokenKind) -> Result<(), JsError> {
        if self.check(kind) {
            self.advance();
            return Ok(());
        }
        let code = match kind {
            TokenKind::LParen => ErrorCode::MISSING_LPAREN,
            TokenKind::RParen => ErrorCode::MISSING_RPAREN,
            TokenKind::RBracket => ErrorCode::MISSING_RBRACKET,
            TokenKind::RBrace => ErrorCode::MISSING_RBRACE,
            TokenKind::Semicolon => ErrorCode::MISSING_SEMICOLON,
            _ => ErrorCode::SYNTAX,
        };
        Err(self.unexpected_token(code))
    }

    fn expect_semicolon(&mut self) -> Result<(), JsError> {
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(());
        }

        // ASI: accept if at end, before }, or after newline
        if self.is_at_end() || self.check(&TokenKind::RBrace) || self.lexer.had_newline_before() {
            return Ok(());
        }

        Err(self.unexpected_token(ErrorCode::MISSING_SEMICOLON))
    }

    /// `return` takes no argument when the statement ends here
    fn at_statement_end(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) || self.lexer.had_newline_before()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn check_identifier(&self) -> bool {
        matches!(self.current.kind, TokenKind::Identifier(_))
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn span_from(&self, start: Span) -> Span {
        Span::new(
            start.start,
            self.previous.span.end.max(start.start),
            start.line,
            start.column,
        )
    }

    fn enter_nested(&mut self) -> Result<(), JsError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_at(
                ErrorCode::STACK_OVERFLOW,
                "Out of stack space: code nested too deeply",
                self.current.span,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn error_at(&self, code: ErrorCode, message: &str, span: Span) -> JsError {
        JsError::syntax_error(code, message, location(span))
    }

    fn unexpected_token(&self, code: ErrorCode) -> JsError {
        let span = self.current.span;
        let (code, message) = match &self.current.kind {
            TokenKind::Unterminated => (ErrorCode::UNTERMINATED_STRING, "Unterminated string constant".to_string()),
            TokenKind::Invalid(c) => (ErrorCode::INVALID_CHARACTER, format!("Invalid character '{}'", c)),
            TokenKind::Eof => (code, format!("{} at end of input", expected_message(code))),
            kind => (code, format!("{}, found {:?}", expected_message(code), kind)),
        };
        JsError::syntax_error(code, message, location(span))
    }

    fn current_binary_op(&self) -> Option<(BinaryOrLogical, u8)> {
        use BinaryOrLogical::{Binary, Logical};
        let op = match &self.current.kind {
            TokenKind::PipePipe => (Logical(LogicalOp::Or), 1),
            TokenKind::AmpAmp => (Logical(LogicalOp::And), 2),
            TokenKind::Pipe => (Binary(BinaryOp::BitOr), 3),
            TokenKind::Caret => (Binary(BinaryOp::BitXor), 4),
            TokenKind::Amp => (Binary(BinaryOp::BitAnd), 5),
            TokenKind::EqEq => (Binary(BinaryOp::Eq), 6),
            TokenKind::BangEq => (Binary(BinaryOp::NotEq), 6),
            TokenKind::EqEqEq => (Binary(BinaryOp::StrictEq), 6),
            TokenKind::BangEqEq => (Binary(BinaryOp::StrictNotEq), 6),
            TokenKind::Lt => (Binary(BinaryOp::Lt), 7),
            TokenKind::LtEq => (Binary(BinaryOp::LtEq), 7),
            TokenKind::Gt => (Binary(BinaryOp::Gt), 7),
            TokenKind::GtEq => (Binary(BinaryOp::GtEq), 7),
            TokenKind::In if !self.no_in => (Binary(BinaryOp::In), 7),
            TokenKind::Instanceof => (Binary(BinaryOp::Instanceof), 7),
            TokenKind::LtLt => (Binary(BinaryOp::LShift), 8),
            TokenKind::GtGt => (Binary(BinaryOp::RShift), 8),
            TokenKind::GtGtGt => (Binary(BinaryOp::URShift), 8),
            TokenKind::Plus => (Binary(BinaryOp::Add), 9),
            TokenKind::Minus => (Binary(BinaryOp::Sub), 9),
            TokenKind::Star => (Binary(BinaryOp::Mul), 10),
            TokenKind::Slash => (Binary(BinaryOp::Div), 10),
            TokenKind::Percent => (Binary(BinaryOp::Mod), 10),
            _ => return None,
        };
        Some(op)
    }

    fn current_unary_op(&self) -> Option<UnaryOp> {
        match &self.current.kind {
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        }
    }

    /// `Some(None)` for plain `=`
    fn current_assignment_op(&self) -> Option<Option<BinaryOp>> {
        let op = match &self.current.kind {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinaryOp::Add),
            TokenKind::MinusEq => Some(BinaryOp::Sub),
            TokenKind::StarEq => Some(BinaryOp::Mul),
            TokenKind::SlashEq => Some(BinaryOp::Div),
            TokenKind::PercentEq => Some(BinaryOp::Mod),
            TokenKind::AmpEq => Some(BinaryOp::BitAnd),
            TokenKind::PipeEq => Some(BinaryOp::BitOr),
            TokenKind::CaretEq => Some(BinaryOp::BitXor),
            TokenKind::LtLtEq => Some(BinaryOp::LShift),
            TokenKind::GtGtEq => Some(BinaryOp::RShift),
            TokenKind::GtGtGtEq => Some(BinaryOp::URShift),
            _ => return None,
        };
        Some(op)
    }
}

enum BinaryOrLogical {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn location(span: Span) -> SourceLocation {
    span.location()
}

fn expected_message(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::MISSING_SEMICOLON => "Expected ';'",
        ErrorCode::MISSING_LPAREN => "Expected '('",
        ErrorCode::MISSING_RPAREN => "Expected ')'",
        ErrorCode::MISSING_RBRACKET => "Expected ']'",
        ErrorCode::MISSING_RBRACE => "Expected '}'",
        ErrorCode::EXPECTED_IDENTIFIER => "Expected identifier",
        _ => "Syntax error",
    }
}

fn keyword_text(kind: &TokenKind) -> Option<&'static str> {
    let text = match kind {
        TokenKind::True => "true",
        TokenKind::False => "false",
        TokenKind::Null => "null",
        TokenKind::Let => "let",
        TokenKind::Const => "const",
        TokenKind::Var => "var",
        TokenKind::Function => "function",
        TokenKind::Return => "return",
        TokenKind::If => "if",
        TokenKind::Else => "else",
        TokenKind::For => "for",
        TokenKind::While => "while",
        TokenKind::Do => "do",
        TokenKind::Break => "break",
        TokenKind::Continue => "continue",
        TokenKind::Switch => "switch",
        TokenKind::Case => "case",
        TokenKind::Default => "default",
        TokenKind::Try => "try",
        TokenKind::Catch => "catch",
        TokenKind::Finally => "finally",
        TokenKind::Throw => "throw",
        TokenKind::New => "new",
        TokenKind::This => "this",
        TokenKind::Typeof => "typeof",
        TokenKind::Instanceof => "instanceof",
        TokenKind::In => "in",
        TokenKind::Void => "void",
        TokenKind::Delete => "delete",
        TokenKind::With => "with",
        TokenKind::Debugger => "debugger",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Program, JsError> {
        let mut dict = StringDict::new();
        let mut parser = Parser::new(source, &mut dict);
        parser.parse_program(false)
    }

    fn parse_ok(source: &str) -> Program {
        match parse(source) {
            Ok(program) => program,
            Err(err) => panic!("parse failed for {:?}: {}", source, err),
        }
    }

    fn parse_expr(source: &str) -> Expression {
        let program = parse_ok(source);
        match program.body.into_iter().next() {
            Some(Statement::Expression(stmt)) => stmt.expression,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    fn syntax_code(source: &str) -> ErrorCode {
        match parse(source) {
            Err(JsError::Syntax { code, .. }) => code,
            other => panic!("expected syntax error for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_binary_precedence() {
        let expr = parse_expr("1 + 2 * 3");
        let Expression::Binary(add) = expr else {
            panic!("expected binary");
        };
        assert_eq!(add.operator, BinaryOp::Add);
        assert!(matches!(*add.right, Expression::Binary(ref mul) if mul.operator == BinaryOp::Mul));
    }

    #[test]
    fn test_logical_lower_than_equality() {
        let expr = parse_expr("a == 1 || b");
        assert!(matches!(expr, Expression::Logical(ref l) if l.operator == LogicalOp::Or));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expr("a = b += 1");
        let Expression::Assignment(outer) = expr else {
            panic!("expected assignment");
        };
        assert_eq!(outer.operator, None);
        assert!(matches!(*outer.right, Expression::Assignment(ref inner) if inner.operator == Some(BinaryOp::Add)));
    }

    #[test]
    fn test_asi() {
        let program = parse_ok("var a = 1\nvar b = 2\na\n++b");
        assert_eq!(program.body.len(), 4);
        assert!(matches!(
            program.body.get(3),
            Some(Statement::Expression(ExpressionStatement {
                expression: Expression::Update(UpdateExpression { prefix: true, .. }),
                ..
            }))
        ));
    }

    #[test]
    fn test_return_newline_ends_statement() {
        let program = parse_ok("function f() { return\n1 }");
        let Some(Statement::FunctionDeclaration(f)) = program.body.first() else {
            panic!("expected function");
        };
        assert!(matches!(f.body.first(), Some(Statement::Return(ReturnStatement { argument: None, .. }))));
    }

    #[test]
    fn test_for_in_variants() {
        let program = parse_ok("for (var k in o) ; for (k in o) ; for (var i = 0; i < 3; i++) ;");
        assert!(matches!(program.body.first(), Some(Statement::ForIn(_))));
        assert!(matches!(program.body.get(1), Some(Statement::ForIn(_))));
        assert!(matches!(program.body.get(2), Some(Statement::For(_))));
    }

    #[test]
    fn test_in_allowed_inside_parens_of_for_init() {
        let program = parse_ok("for (var x = ('a' in o); x; ) break;");
        assert!(matches!(program.body.first(), Some(Statement::For(_))));
    }

    #[test]
    fn test_labels() {
        let program = parse_ok("outer: for (;;) { break outer; }");
        let Some(Statement::Labeled(labeled)) = program.body.first() else {
            panic!("expected label");
        };
        assert_eq!(labeled.label.name.as_str(), "outer");
        assert!(labeled.body.is_loop());
    }

    #[test]
    fn test_object_literal_with_accessors() {
        let expr = parse_expr("({ a: 1, 'b': 2, 3: 4, get c() { return 1; }, set c(v) {}, if: 5 })");
        let Expression::Object(obj) = expr else {
            panic!("expected object");
        };
        let keys: Vec<_> = obj.properties.iter().map(|p| p.key.to_string()).collect();
        assert_eq!(keys, vec!["a", "b", "3", "c", "c", "if"]);
        assert_eq!(obj.properties.get(3).map(|p| p.kind), Some(PropertyKind::Get));
        assert_eq!(obj.properties.get(4).map(|p| p.kind), Some(PropertyKind::Set));
    }

    #[test]
    fn test_array_holes() {
        let expr = parse_expr("[1,,2,]");
        let Expression::Array(arr) = expr else {
            panic!("expected array");
        };
        assert_eq!(arr.elements.len(), 3);
        assert!(arr.elements.get(1).is_some_and(Option::is_none));
    }

    #[test]
    fn test_regexp_literal() {
        let expr = parse_expr("x = /ab+c/gi");
        let Expression::Assignment(assign) = expr else {
            panic!("expected assignment");
        };
        assert!(matches!(
            *assign.right,
            Expression::Literal(Literal { value: LiteralValue::RegExp { ref pattern, ref flags }, .. })
                if pattern == "ab+c" && flags == "gi"
        ));
    }

    #[test]
    fn test_new_with_member_and_call() {
        let expr = parse_expr("new a.B(1).c()");
        let Expression::Call(call) = expr else {
            panic!("expected call");
        };
        let Expression::Member(member) = *call.callee else {
            panic!("expected member");
        };
        assert!(matches!(*member.object, Expression::New(ref n) if n.arguments.len() == 1));
    }

    #[test]
    fn test_function_source_range() {
        let source = "var f = function (a, b) { return a; };";
        let program = parse_ok(source);
        let Some(Statement::VariableDeclaration(decl)) = program.body.first() else {
            panic!("expected var");
        };
        let Some(Some(Expression::Function(f))) = decl.declarations.first().map(|d| d.init.as_ref()) else {
            panic!("expected function");
        };
        assert_eq!(
            source.get(f.source_start..f.source_end),
            Some("function (a, b) { return a; }")
        );
    }

    #[test]
    fn test_syntax_error_codes() {
        assert_eq!(syntax_code("var a = (1;"), ErrorCode::MISSING_RPAREN);
        assert_eq!(syntax_code("if x"), ErrorCode::MISSING_LPAREN);
        assert_eq!(syntax_code("a b"), ErrorCode::MISSING_SEMICOLON);
        assert_eq!(syntax_code("var 1"), ErrorCode::EXPECTED_IDENTIFIER);
        assert_eq!(syntax_code("'abc"), ErrorCode::UNTERMINATED_STRING);
        assert_eq!(syntax_code("a = #"), ErrorCode::INVALID_CHARACTER);
        assert_eq!(syntax_code("{ a"), ErrorCode::MISSING_RBRACE);
        assert_eq!(syntax_code("try {}"), ErrorCode::SYNTAX);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        assert_eq!(syntax_code(&deep), ErrorCode::STACK_OVERFLOW);
        assert_eq!(syntax_code(&"{".repeat(5000)), ErrorCode::STACK_OVERFLOW);
        assert_eq!(syntax_code(&format!("{}x", "!".repeat(5000))), ErrorCode::STACK_OVERFLOW);

        let shallow = format!("{}1{}", "(".repeat(60), ")".repeat(60));
        parse_ok(&shallow);
    }

    #[test]
    fn test_formal_parameters() {
        let mut dict = StringDict::new();
        let mut parser = Parser::new("a, b , c", &mut dict);
        let params = parser.parse_formal_parameters().ok().unwrap_or_default();
        let names: Vec<_> = params.iter().map(|p| p.name.to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let mut parser = Parser::new("a) { x", &mut dict);
        assert!(parser.parse_formal_parameters().is_err());
    }
}
