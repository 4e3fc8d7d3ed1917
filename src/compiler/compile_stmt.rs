//! Statement compilation
//!
//! Every statement leaves the operand stack as it found it. Statements that
//! keep values on the stack while their body runs (for-in keeps its object
//! and cursor, finally blocks keep the completion marker) record how many in
//! their context so `break` and `continue` can drop them.

use super::bytecode::Op;
use super::{BreakKind, Compiler, NameScope, StmtCtx};
use crate::ast::{
    BlockStatement, BreakStatement, ContinueStatement, DoWhileStatement, Expression, ForInLeft,
    ForInStatement, ForInit, ForStatement, IfStatement, LabeledStatement, ReturnStatement,
    Statement, SwitchStatement, TryStatement, VariableDeclaration, VariableKind, WhileStatement,
    WithStatement,
};
use crate::error::{ErrorCode, JsError};
use crate::value::{CheapClone, JsString};

impl<'a> Compiler<'a> {
    /// Compile a statement
    pub(super) fn compile_statement(&mut self, stmt: &'a Statement) -> Result<(), JsError> {
        self.builder.set_loc(stmt.span().start);
        match stmt {
            Statement::Expression(expr_stmt) => {
                if self.state.result_mode {
                    self.compile_expression(&expr_stmt.expression)?;
                    self.builder.emit(Op::SetRet);
                } else {
                    self.compile_discarded(&expr_stmt.expression)?;
                }
                Ok(())
            }

            Statement::VariableDeclaration(decl) => self.compile_variable_declaration(decl),

            // Hoisted: instantiated on function or block entry
            Statement::FunctionDeclaration(_) => Ok(()),

            Statement::Block(block) => self.compile_block(block),

            Statement::If(if_stmt) => self.compile_if(if_stmt),

            Statement::While(while_stmt) => self.compile_while(while_stmt),

            Statement::DoWhile(do_while) => self.compile_do_while(do_while),

            Statement::For(for_stmt) => self.compile_for(for_stmt),

            Statement::ForIn(for_in) => self.compile_for_in(for_in),

            Statement::Switch(switch_stmt) => self.compile_switch(switch_stmt),

            Statement::Try(try_stmt) => self.compile_try(try_stmt),

            Statement::With(with_stmt) => self.compile_with(with_stmt),

            Statement::Return(return_stmt) => self.compile_return(return_stmt),

            Statement::Break(break_stmt) => self.compile_break(break_stmt),

            Statement::Continue(continue_stmt) => self.compile_continue(continue_stmt),

            Statement::Throw(throw_stmt) => {
                self.compile_expression(&throw_stmt.argument)?;
                self.builder.emit(Op::Throw);
                Ok(())
            }

            Statement::Labeled(labeled) => self.compile_labeled(labeled),

            Statement::Empty(_) => Ok(()),
        }
    }

    /// Evaluate an expression for its side effects only
    fn compile_discarded(&mut self, expr: &'a Expression) -> Result<(), JsError> {
        match expr {
            Expression::Call(call) => self.compile_call(call, true),
            _ => {
                self.compile_expression(expr)?;
                self.builder.emit(Op::Pop { count: 1 });
                Ok(())
            }
        }
    }

    fn compile_variable_declaration(&mut self, decl: &'a VariableDeclaration) -> Result<(), JsError> {
        for declarator in &decl.declarations {
            let name = &declarator.id.name;
            self.builder.set_loc(declarator.span.start);
            if decl.kind == VariableKind::Var {
                // Assignment through the scope chain, so `with` objects see it
                let Some(init) = &declarator.init else {
                    continue;
                };
                self.compile_name_ref(name);
                self.compile_expression(init)?;
                self.builder.emit(Op::Assign);
                self.builder.emit(Op::Pop { count: 1 });
            } else {
                match &declarator.init {
                    Some(init) => self.compile_expression(init)?,
                    None => {
                        self.builder.emit(Op::Undefined);
                    }
                }
                self.compile_lexical_init(name);
            }
        }
        Ok(())
    }

    /// Store the value on top of the stack into the `let`/`const` binding `name`
    fn compile_lexical_init(&mut self, name: &JsString) {
        if self.is_block_binding(name) {
            self.builder.emit(Op::InitLexical {
                name: name.cheap_clone(),
            });
            return;
        }
        match self.local_slot(name) {
            Some(slot) => {
                self.builder.emit(Op::InitLocal { slot });
            }
            None => {
                self.builder.emit(Op::InitVar {
                    name: name.cheap_clone(),
                });
            }
        }
    }

    fn compile_block(&mut self, block: &'a BlockStatement) -> Result<(), JsError> {
        let scoped = self.enter_block_scope(block.span.start)?;
        self.compile_statements(&block.body)?;
        if scoped {
            self.leave_block_scope();
        }
        Ok(())
    }

    fn compile_if(&mut self, if_stmt: &'a IfStatement) -> Result<(), JsError> {
        self.compile_expression(&if_stmt.test)?;
        let else_label = self.builder.new_label();
        self.builder.emit(Op::JmpZ {
            target: else_label.id(),
        });
        self.compile_statement(&if_stmt.consequent)?;

        match &if_stmt.alternate {
            Some(alternate) => {
                let end_label = self.builder.new_label();
                self.builder.emit(Op::Jmp {
                    target: end_label.id(),
                });
                self.builder.bind_label(else_label);
                self.compile_statement(alternate)?;
                self.builder.bind_label(end_label);
            }
            None => self.builder.bind_label(else_label),
        }
        Ok(())
    }

    fn compile_while(&mut self, while_stmt: &'a WhileStatement) -> Result<(), JsError> {
        let top = self.builder.new_label();
        let break_label = self.push_breakable(BreakKind::Loop, Some(top), 0);

        self.builder.bind_label(top);
        self.compile_expression(&while_stmt.test)?;
        self.builder.emit(Op::JmpZ {
            target: break_label.id(),
        });
        self.compile_statement(&while_stmt.body)?;
        self.builder.emit(Op::Jmp { target: top.id() });

        self.builder.bind_label(break_label);
        self.pop_ctx();
        Ok(())
    }

    fn compile_do_while(&mut self, do_while: &'a DoWhileStatement) -> Result<(), JsError> {
        let top = self.builder.new_label();
        let test = self.builder.new_label();
        let break_label = self.push_breakable(BreakKind::Loop, Some(test), 0);

        self.builder.bind_label(top);
        self.compile_statement(&do_while.body)?;
        self.builder.bind_label(test);
        self.compile_expression(&do_while.test)?;
        self.builder.emit(Op::JmpZ {
            target: break_label.id(),
        });
        self.builder.emit(Op::Jmp { target: top.id() });

        self.builder.bind_label(break_label);
        self.pop_ctx();
        Ok(())
    }

    fn compile_for(&mut self, for_stmt: &'a ForStatement) -> Result<(), JsError> {
        // The loop's context must claim its labels before the init runs
        let labels = std::mem::take(&mut self.state.pending_labels);
        let scoped = self.enter_block_scope(for_stmt.span.start)?;

        match &for_stmt.init {
            Some(ForInit::Variable(decl)) => self.compile_variable_declaration(decl)?,
            Some(ForInit::Expression(expr)) => self.compile_discarded(expr)?,
            None => {}
        }

        let top = self.builder.new_label();
        let update = self.builder.new_label();
        self.state.pending_labels = labels;
        let break_label = self.push_breakable(BreakKind::Loop, Some(update), 0);

        self.builder.bind_label(top);
        if let Some(test) = &for_stmt.test {
            self.compile_expression(test)?;
            self.builder.emit(Op::JmpZ {
                target: break_label.id(),
            });
        }
        self.compile_statement(&for_stmt.body)?;
        self.builder.bind_label(update);
        if let Some(update) = &for_stmt.update {
            self.compile_discarded(update)?;
        }
        self.builder.emit(Op::Jmp { target: top.id() });

        self.builder.bind_label(break_label);
        self.pop_ctx();
        if scoped {
            self.leave_block_scope();
        }
        Ok(())
    }

    fn compile_for_in(&mut self, for_in: &'a ForInStatement) -> Result<(), JsError> {
        let labels = std::mem::take(&mut self.state.pending_labels);
        let scoped = self.enter_block_scope(for_in.span.start)?;

        // A `var` initializer runs once before the object is evaluated
        if let ForInLeft::Variable(decl) = &for_in.left
            && decl.declarations.iter().any(|d| d.init.is_some())
        {
            self.compile_variable_declaration(decl)?;
        }

        self.compile_expression(&for_in.right)?;
        self.builder.emit(Op::ForInInit);

        let top = self.builder.new_label();
        self.state.pending_labels = labels;
        let break_label = self.push_breakable(BreakKind::Loop, Some(top), 2);

        self.builder.bind_label(top);
        self.builder.emit(Op::ForIn {
            target: break_label.id(),
        });
        match &for_in.left {
            ForInLeft::Variable(decl) => {
                let name = decl
                    .declarations
                    .first()
                    .map(|d| d.id.name.cheap_clone())
                    .ok_or_else(|| {
                        self.error_at(ErrorCode::EXPECTED_IDENTIFIER, "Expected identifier", decl.span)
                    })?;
                if decl.kind.is_lexical() {
                    self.compile_lexical_init(&name);
                } else {
                    self.compile_name_ref(&name);
                    self.builder.emit(Op::ForInAssign);
                }
            }
            ForInLeft::Expression(target) => {
                if !self.compile_ref(target)? {
                    self.builder.emit(Op::Pop { count: 1 });
                    self.builder.emit(Op::ThrowRef {
                        code: ErrorCode::ILLEGAL_ASSIGN,
                    });
                }
                self.builder.emit(Op::ForInAssign);
            }
        }
        self.compile_statement(&for_in.body)?;
        self.builder.emit(Op::Jmp { target: top.id() });

        self.builder.bind_label(break_label);
        self.builder.emit(Op::Pop { count: 2 });
        self.pop_ctx();
        if scoped {
            self.leave_block_scope();
        }
        Ok(())
    }

    fn compile_switch(&mut self, switch_stmt: &'a SwitchStatement) -> Result<(), JsError> {
        let labels = std::mem::take(&mut self.state.pending_labels);
        let scoped = self.enter_block_scope(switch_stmt.span.start)?;

        self.compile_expression(&switch_stmt.discriminant)?;

        let body_labels: Vec<_> = switch_stmt
            .cases
            .iter()
            .map(|_| self.builder.new_label())
            .collect();
        let mut default_label = None;
        for (case, label) in switch_stmt.cases.iter().zip(&body_labels) {
            match &case.test {
                Some(test) => {
                    self.builder.set_loc(case.span.start);
                    self.compile_expression(test)?;
                    self.builder.emit(Op::Case { target: label.id() });
                }
                None => default_label = Some(*label),
            }
        }

        self.state.pending_labels = labels;
        let break_label = self.push_breakable(BreakKind::Switch, None, 0);
        self.builder.emit(Op::Pop { count: 1 });
        self.builder.emit(Op::Jmp {
            target: default_label.unwrap_or(break_label).id(),
        });

        for (case, label) in switch_stmt.cases.iter().zip(body_labels) {
            self.builder.bind_label(label);
            self.compile_statements(&case.consequent)?;
        }

        self.builder.bind_label(break_label);
        self.pop_ctx();
        if scoped {
            self.leave_block_scope();
        }
        Ok(())
    }

    fn compile_try(&mut self, try_stmt: &'a TryStatement) -> Result<(), JsError> {
        let catch_label = try_stmt.handler.as_ref().map(|_| self.builder.new_label());
        let finally_label = try_stmt.finalizer.as_ref().map(|_| self.builder.new_label());
        let has_finally = finally_label.is_some();
        let end_label = self.builder.new_label();

        self.builder.emit(Op::PushExcept {
            catch_target: catch_label.map(|l| l.id()),
            finally_target: finally_label.map(|l| l.id()),
        });
        self.state.ctx.push(StmtCtx::Try);
        self.compile_block(&try_stmt.block)?;
        self.pop_ctx();
        self.builder.emit(Op::PopExcept {
            ret: end_label.id(),
        });

        if let (Some(handler), Some(label)) = (&try_stmt.handler, catch_label) {
            self.builder.bind_label(label);
            self.builder.set_loc(handler.span.start);
            self.builder.emit(Op::EnterCatch {
                name: handler.param.name.cheap_clone(),
            });
            self.state.ctx.push(StmtCtx::Catch { has_finally });
            self.state
                .names
                .push(NameScope::Catch(handler.param.name.cheap_clone()));
            self.compile_block(&handler.body)?;
            self.state.names.pop();
            self.pop_ctx();
            self.builder.emit(Op::PopScope);
            if has_finally {
                self.builder.emit(Op::PopExcept {
                    ret: end_label.id(),
                });
            }
        }

        if let (Some(finalizer), Some(label)) = (&try_stmt.finalizer, finally_label) {
            self.builder.bind_label(label);
            self.state.ctx.push(StmtCtx::Finally);
            self.compile_block(finalizer)?;
            self.pop_ctx();
            self.builder.emit(Op::EndFinally);
        }

        self.builder.bind_label(end_label);
        Ok(())
    }

    fn compile_with(&mut self, with_stmt: &'a WithStatement) -> Result<(), JsError> {
        self.compile_expression(&with_stmt.object)?;
        self.builder.emit(Op::PushWithScope);
        self.state.ctx.push(StmtCtx::Scope);
        self.state.names.push(NameScope::With);
        self.compile_statement(&with_stmt.body)?;
        self.state.names.pop();
        self.pop_ctx();
        self.builder.emit(Op::PopScope);
        Ok(())
    }

    fn compile_return(&mut self, return_stmt: &'a ReturnStatement) -> Result<(), JsError> {
        if !self.state.in_function && !self.options.allow_return {
            return Err(self.error_at(
                ErrorCode::MISPLACED_RETURN,
                "'return' statement outside of function",
                return_stmt.span,
            ));
        }
        match &return_stmt.argument {
            Some(argument) => self.compile_expression(argument)?,
            None => {
                self.builder.emit(Op::Undefined);
            }
        }
        self.builder.emit(Op::SetRet);

        // Leave every enclosing statement, running finally blocks on the way
        self.unwind_from(0);
        self.builder.emit(Op::Ret);
        Ok(())
    }

    fn compile_break(&mut self, break_stmt: &'a BreakStatement) -> Result<(), JsError> {
        let target = match &break_stmt.label {
            Some(label) => self.find_label(&label.name).ok_or_else(|| {
                self.error_at(
                    ErrorCode::LABEL_NOT_FOUND,
                    format!("Label '{}' not found", label.name),
                    break_stmt.span,
                )
            })?,
            None => self
                .innermost(|kind| kind != BreakKind::Labeled)
                .ok_or_else(|| {
                    self.error_at(
                        ErrorCode::INVALID_BREAK,
                        "Can't have 'break' outside of loop",
                        break_stmt.span,
                    )
                })?,
        };
        let Some(StmtCtx::Breakable { break_label, .. }) = self.state.ctx.get(target) else {
            return Err(JsError::internal_error("break target is not breakable"));
        };
        let break_label = *break_label;
        self.unwind_to(target);
        self.builder.emit(Op::Jmp {
            target: break_label.id(),
        });
        Ok(())
    }

    fn compile_continue(&mut self, continue_stmt: &'a ContinueStatement) -> Result<(), JsError> {
        let target = match &continue_stmt.label {
            Some(label) => self.find_label(&label.name).ok_or_else(|| {
                self.error_at(
                    ErrorCode::LABEL_NOT_FOUND,
                    format!("Label '{}' not found", label.name),
                    continue_stmt.span,
                )
            })?,
            None => self.innermost(|kind| kind == BreakKind::Loop).ok_or_else(|| {
                self.error_at(
                    ErrorCode::INVALID_CONTINUE,
                    "Can't have 'continue' outside of loop",
                    continue_stmt.span,
                )
            })?,
        };
        let continue_label = match self.state.ctx.get(target) {
            Some(StmtCtx::Breakable {
                continue_label: Some(label),
                ..
            }) => *label,
            _ => {
                return Err(self.error_at(
                    ErrorCode::INVALID_CONTINUE,
                    "Can't have 'continue' outside of loop",
                    continue_stmt.span,
                ));
            }
        };
        self.unwind_to(target);
        self.builder.emit(Op::Jmp {
            target: continue_label.id(),
        });
        Ok(())
    }

    fn compile_labeled(&mut self, labeled: &'a LabeledStatement) -> Result<(), JsError> {
        let name = &labeled.label.name;
        if self.has_label(name) {
            return Err(self.error_at(
                ErrorCode::LABEL_REDEFINED,
                format!("Label '{}' redefined", name),
                labeled.span,
            ));
        }
        self.state.pending_labels.push(name.cheap_clone());

        match labeled.body.as_ref() {
            Statement::Labeled(_) | Statement::Switch(_) => self.compile_statement(&labeled.body),
            body if body.is_loop() => self.compile_statement(body),
            body => {
                let break_label = self.push_breakable(BreakKind::Labeled, None, 0);
                self.compile_statement(body)?;
                self.builder.bind_label(break_label);
                self.pop_ctx();
                Ok(())
            }
        }
    }

    /// Context index of the statement labelled `name`
    fn find_label(&self, name: &JsString) -> Option<usize> {
        self.state.ctx.iter().rposition(
            |ctx| matches!(ctx, StmtCtx::Breakable { labels, .. } if labels.contains(name)),
        )
    }

    /// Context index of the innermost breakable statement accepted by `accept`
    fn innermost(&self, accept: impl Fn(BreakKind) -> bool) -> Option<usize> {
        self.state.ctx.iter().rposition(
            |ctx| matches!(ctx, StmtCtx::Breakable { kind, .. } if accept(*kind)),
        )
    }
}
