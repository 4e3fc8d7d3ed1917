//! Declaration pass
//!
//! Walks one function body (without descending into nested functions) and
//! records the shape of its scopes before any code is emitted: hoisted `var`
//! names, hoisted function declarations, top-level `let`/`const` bindings and
//! every block that needs a runtime scope. Blocks without lexical bindings
//! get no scope at all.

use rustc_hash::FxHashMap;

use super::LanguageMode;
use super::bytecode::LocalVar;
use crate::ast::{
    CallExpression, Expression, ForInLeft, ForInit, FunctionLiteral, MemberProperty, Statement,
    SwitchCase, VariableDeclaration, VariableKind,
};
use crate::error::{ErrorCode, JsError};
use crate::lexer::Span;
use crate::value::{CheapClone, JsString};

/// Bindings and function declarations of one block scope
#[derive(Debug, Default)]
pub struct BlockShape<'a> {
    pub names: Vec<LocalVar>,
    pub functions: Vec<&'a FunctionLiteral>,
}

/// Declarations of one function body (or top level)
#[derive(Debug, Default)]
pub struct FunctionShape<'a> {
    /// `var` names, first declaration first
    pub vars: Vec<JsString>,
    /// Function declarations instantiated on entry
    pub functions: Vec<&'a FunctionLiteral>,
    /// `let`/`const` at the top level of the body
    pub lexicals: Vec<LocalVar>,
    /// Scoped blocks, keyed by the byte offset of the statement owning them
    pub blocks: FxHashMap<usize, BlockShape<'a>>,
    pub uses_arguments: bool,
    pub has_eval: bool,
    pub has_with: bool,
}

/// Collect the declarations of `body`
pub fn hoist<'a>(body: &'a [Statement], mode: LanguageMode) -> Result<FunctionShape<'a>, JsError> {
    let mut hoister = Hoister {
        shape: FunctionShape::default(),
        mode,
        blocks: Vec::new(),
    };
    hoister.statements(body)?;
    Ok(hoister.shape)
}

struct Hoister<'a> {
    shape: FunctionShape<'a>,
    mode: LanguageMode,
    /// Keys of the scoped blocks enclosing the current statement
    blocks: Vec<usize>,
}

impl<'a> Hoister<'a> {
    fn statements(&mut self, body: &'a [Statement]) -> Result<(), JsError> {
        for stmt in body {
            self.statement(stmt)?;
        }
        Ok(())
    }

    /// Open a block scope keyed by `key` if `body` declares anything lexical
    /// directly, then visit the body.
    fn scoped(&mut self, key: usize, body: &'a [Statement]) -> Result<(), JsError> {
        let scoped = self.needs_scope(body);
        if scoped {
            self.shape.blocks.insert(key, BlockShape::default());
            self.blocks.push(key);
        }
        self.statements(body)?;
        if scoped {
            self.blocks.pop();
        }
        Ok(())
    }

    fn needs_scope(&self, body: &[Statement]) -> bool {
        body.iter().any(|stmt| match stmt {
            Statement::VariableDeclaration(decl) => decl.kind.is_lexical(),
            Statement::FunctionDeclaration(_) => self.mode == LanguageMode::Modern,
            _ => false,
        })
    }

    fn statement(&mut self, stmt: &'a Statement) -> Result<(), JsError> {
        match stmt {
            Statement::VariableDeclaration(decl) => self.declaration(decl),
            Statement::FunctionDeclaration(func) => self.function_declaration(func),
            Statement::Block(block) => self.scoped(block.span.start, &block.body),
            Statement::If(s) => {
                self.expression(&s.test);
                self.statement(&s.consequent)?;
                if let Some(alt) = &s.alternate {
                    self.statement(alt)?;
                }
                Ok(())
            }
            Statement::Switch(s) => {
                self.expression(&s.discriminant);
                let scoped = s.cases.iter().any(|c| self.needs_scope(&c.consequent));
                if scoped {
                    self.shape.blocks.insert(s.span.start, BlockShape::default());
                    self.blocks.push(s.span.start);
                }
                for case in &s.cases {
                    self.case(case)?;
                }
                if scoped {
                    self.blocks.pop();
                }
                Ok(())
            }
            Statement::For(s) => {
                let lexical = matches!(&s.init, Some(ForInit::Variable(d)) if d.kind.is_lexical());
                if lexical {
                    self.shape.blocks.insert(s.span.start, BlockShape::default());
                    self.blocks.push(s.span.start);
                }
                match &s.init {
                    Some(ForInit::Variable(decl)) => self.declaration(decl)?,
                    Some(ForInit::Expression(e)) => self.expression(e),
                    None => {}
                }
                if let Some(test) = &s.test {
                    self.expression(test);
                }
                if let Some(update) = &s.update {
                    self.expression(update);
                }
                self.statement(&s.body)?;
                if lexical {
                    self.blocks.pop();
                }
                Ok(())
            }
            Statement::ForIn(s) => {
                let lexical = matches!(&s.left, ForInLeft::Variable(d) if d.kind.is_lexical());
                if lexical {
                    self.shape.blocks.insert(s.span.start, BlockShape::default());
                    self.blocks.push(s.span.start);
                }
                match &s.left {
                    ForInLeft::Variable(decl) => self.declaration(decl)?,
                    ForInLeft::Expression(e) => self.expression(e),
                }
                self.expression(&s.right);
                self.statement(&s.body)?;
                if lexical {
                    self.blocks.pop();
                }
                Ok(())
            }
            Statement::While(s) => {
                self.expression(&s.test);
                self.statement(&s.body)
            }
            Statement::DoWhile(s) => {
                self.statement(&s.body)?;
                self.expression(&s.test);
                Ok(())
            }
            Statement::Try(s) => {
                self.scoped(s.block.span.start, &s.block.body)?;
                if let Some(handler) = &s.handler {
                    self.scoped(handler.body.span.start, &handler.body.body)?;
                }
                if let Some(finalizer) = &s.finalizer {
                    self.scoped(finalizer.span.start, &finalizer.body)?;
                }
                Ok(())
            }
            Statement::With(s) => {
                self.shape.has_with = true;
                self.expression(&s.object);
                self.statement(&s.body)
            }
            Statement::Return(s) => {
                if let Some(arg) = &s.argument {
                    self.expression(arg);
                }
                Ok(())
            }
            Statement::Throw(s) => {
                self.expression(&s.argument);
                Ok(())
            }
            Statement::Expression(s) => {
                self.expression(&s.expression);
                Ok(())
            }
            Statement::Labeled(s) => self.statement(&s.body),
            Statement::Break(_) | Statement::Continue(_) | Statement::Empty(_) => Ok(()),
        }
    }

    fn case(&mut self, case: &'a SwitchCase) -> Result<(), JsError> {
        if let Some(test) = &case.test {
            self.expression(test);
        }
        self.statements(&case.consequent)
    }

    fn declaration(&mut self, decl: &'a VariableDeclaration) -> Result<(), JsError> {
        for d in &decl.declarations {
            if let Some(init) = &d.init {
                self.expression(init);
            }
            match decl.kind {
                VariableKind::Var => self.add_var(&d.id.name, d.span)?,
                VariableKind::Let | VariableKind::Const => {
                    let var = LocalVar {
                        name: d.id.name.cheap_clone(),
                        is_const: decl.kind == VariableKind::Const,
                    };
                    self.add_lexical(var, d.span)?;
                }
            }
        }
        Ok(())
    }

    fn function_declaration(&mut self, func: &'a FunctionLiteral) -> Result<(), JsError> {
        let Some(id) = &func.id else {
            return Ok(());
        };
        match self.blocks.last().copied() {
            Some(key) if self.mode == LanguageMode::Modern => {
                let block = self.shape.blocks.entry(key).or_default();
                if block.names.iter().any(|n| n.name == id.name && n.is_const) {
                    return Err(duplicate(&id.name, func.span));
                }
                if !block.names.iter().any(|n| n.name == id.name) {
                    block.names.push(LocalVar {
                        name: id.name.cheap_clone(),
                        is_const: false,
                    });
                }
                block.functions.push(func);
            }
            _ => {
                if self.shape.lexicals.iter().any(|l| l.name == id.name) {
                    return Err(duplicate(&id.name, func.span));
                }
                self.shape.functions.push(func);
            }
        }
        Ok(())
    }

    fn add_var(&mut self, name: &JsString, span: Span) -> Result<(), JsError> {
        if self.shape.lexicals.iter().any(|l| l.name == *name) {
            return Err(duplicate(name, span));
        }
        if !self.shape.vars.contains(name) {
            self.shape.vars.push(name.cheap_clone());
        }
        Ok(())
    }

    fn add_lexical(&mut self, var: LocalVar, span: Span) -> Result<(), JsError> {
        let names = match self.blocks.last().copied() {
            Some(key) => &mut self.shape.blocks.entry(key).or_default().names,
            None => {
                let clashes = self.shape.vars.contains(&var.name)
                    || self
                        .shape
                        .functions
                        .iter()
                        .any(|f| f.id.as_ref().is_some_and(|id| id.name == var.name));
                if clashes {
                    return Err(duplicate(&var.name, span));
                }
                &mut self.shape.lexicals
            }
        };
        if names.iter().any(|n| n.name == var.name) {
            return Err(duplicate(&var.name, span));
        }
        names.push(var);
        Ok(())
    }

    /// Note uses of `arguments` and calls to `eval`
    fn expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Identifier(id) => {
                if id.name == "arguments" {
                    self.shape.uses_arguments = true;
                }
            }
            Expression::Literal(_) | Expression::This(_) | Expression::Function(_) => {}
            Expression::Array(a) => {
                for e in a.elements.iter().flatten() {
                    self.expression(e);
                }
            }
            Expression::Object(o) => {
                for p in &o.properties {
                    self.expression(&p.value);
                }
            }
            Expression::Unary(u) => self.expression(&u.argument),
            Expression::Update(u) => self.expression(&u.argument),
            Expression::Binary(b) => {
                self.expression(&b.left);
                self.expression(&b.right);
            }
            Expression::Logical(l) => {
                self.expression(&l.left);
                self.expression(&l.right);
            }
            Expression::Assignment(a) => {
                self.expression(&a.left);
                self.expression(&a.right);
            }
            Expression::Conditional(c) => {
                self.expression(&c.test);
                self.expression(&c.consequent);
                self.expression(&c.alternate);
            }
            Expression::Sequence(s) => {
                for e in &s.expressions {
                    self.expression(e);
                }
            }
            Expression::Member(m) => {
                self.expression(&m.object);
                if let MemberProperty::Expression(e) = &m.property {
                    self.expression(e);
                }
            }
            Expression::Call(call) => self.call(call),
            Expression::New(n) => {
                self.expression(&n.callee);
                for arg in &n.arguments {
                    self.expression(arg);
                }
            }
        }
    }

    fn call(&mut self, call: &CallExpression) {
        if let Expression::Identifier(id) = call.callee.as_ref()
            && id.name == "eval"
        {
            self.shape.has_eval = true;
        }
        self.expression(&call.callee);
        for arg in &call.arguments {
            self.expression(arg);
        }
    }
}

fn duplicate(name: &JsString, span: Span) -> JsError {
    JsError::syntax_error(
        ErrorCode::DUPLICATE_DECLARATION,
        format!("Redeclaration of '{}'", name),
        span.location(),
    )
}
