//! Bytecode compiler
//!
//! Two passes per function: [`hoist`] records declarations and scope shapes,
//! then code generation emits the instruction stream. Nested function
//! literals get a dense id when first referenced and are compiled afterwards,
//! one at a time, so jump labels never cross a function boundary.

mod builder;
mod bytecode;
mod compile_expr;
mod compile_stmt;
mod hoist;

pub use builder::{BytecodeBuilder, Label};
pub use bytecode::{
    Bytecode, CodeKind, FunctionCode, Instruction, JumpTarget, LocalVar, ObjPropKind, Op,
    ScopeInfo,
};

use std::collections::VecDeque;
use std::rc::Rc;

use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ast::{FunctionLiteral, Program, Statement};
use crate::error::{ErrorCode, JsError};
use crate::lexer::Span;
use crate::parser::Parser;
use crate::string_dict::StringDict;
use crate::value::{CheapClone, JsString};
use hoist::{FunctionShape, hoist};

/// Scoping of function declarations nested in blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageMode {
    /// Hoisted to the enclosing function, like classic JScript
    Compat,
    /// Scoped to the block
    #[default]
    Modern,
}

/// How one compilation unit is compiled
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub mode: LanguageMode,
    /// Global code or eval code
    pub kind: CodeKind,
    /// Expression statements at the top level set the unit's result
    pub eval_mode: bool,
    /// Whether `return` is accepted outside of functions
    pub allow_return: bool,
    /// Name used in diagnostics
    pub name: String,
}

impl CompileOptions {
    /// A program run for its side effects
    pub fn program(name: impl Into<String>) -> Self {
        Self {
            mode: LanguageMode::default(),
            kind: CodeKind::Global,
            eval_mode: false,
            allow_return: false,
            name: name.into(),
        }
    }

    /// Code passed to the script-level `eval`
    pub fn eval(name: impl Into<String>) -> Self {
        Self {
            mode: LanguageMode::default(),
            kind: CodeKind::Eval,
            eval_mode: true,
            allow_return: false,
            name: name.into(),
        }
    }

    pub fn with_mode(mut self, mode: LanguageMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Parse and compile `source` into a shareable unit
pub fn compile(
    source: &str,
    options: &CompileOptions,
    string_dict: &mut StringDict,
) -> Result<Rc<Bytecode>, JsError> {
    let program = Parser::new(source, string_dict).parse_program(options.eval_mode)?;
    let code = Compiler::new(options).compile_program(&program, source)?;
    debug!(
        "compiled '{}': {} functions, {} instructions",
        code.name,
        code.functions.len(),
        code.instrs.len()
    );
    Ok(Rc::new(code))
}

/// Kind of statement a `break` can leave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakKind {
    Loop,
    Switch,
    /// A labelled statement that is neither a loop nor a switch
    Labeled,
}

/// Statement context crossed by `break`, `continue` and `return`
#[derive(Debug)]
enum StmtCtx {
    Breakable {
        kind: BreakKind,
        labels: Vec<JsString>,
        break_label: Label,
        continue_label: Option<Label>,
        /// Operand-stack cells the statement keeps while its body runs
        stack_cells: u32,
    },
    /// Inside a try block: an exception frame is active
    Try,
    /// Inside a catch block: a catch scope is pushed, plus the frame when a
    /// finally block follows
    Catch { has_finally: bool },
    /// Inside a finally block: the completion marker pair is on the stack
    Finally,
    /// Inside a block or `with` scope
    Scope,
}

/// What leaving one statement context takes
struct Cleanup {
    pop: u32,
    pop_scope: bool,
    leave_try: bool,
}

/// Compile-time view of the runtime scopes enclosing the current code
#[derive(Debug)]
enum NameScope {
    Block(Vec<JsString>),
    Catch(JsString),
    With,
}

/// Per-function compilation state
struct FunctionState<'a> {
    kind: CodeKind,
    shape: FunctionShape<'a>,
    locals: Vec<LocalVar>,
    scopes: Vec<ScopeInfo>,
    ctx: Vec<StmtCtx>,
    names: Vec<NameScope>,
    /// Labels waiting for the statement they prefix
    pending_labels: Vec<JsString>,
    /// Expression statements store their value as the unit result
    result_mode: bool,
    in_function: bool,
}

impl FunctionState<'_> {
    fn new(kind: CodeKind) -> Self {
        Self {
            kind,
            shape: FunctionShape::default(),
            locals: Vec::new(),
            scopes: Vec::new(),
            ctx: Vec::new(),
            names: Vec::new(),
            pending_labels: Vec::new(),
            result_mode: false,
            in_function: false,
        }
    }
}

/// Compiler state for converting an AST to bytecode
pub struct Compiler<'a> {
    builder: BytecodeBuilder,
    options: &'a CompileOptions,
    functions: Vec<FunctionCode>,
    /// Function literals waiting for code generation
    queue: VecDeque<(u32, &'a FunctionLiteral)>,
    /// Ids of function literals, by source offset
    function_ids: FxHashMap<usize, u32>,
    state: FunctionState<'a>,
}

impl<'a> Compiler<'a> {
    pub fn new(options: &'a CompileOptions) -> Self {
        Self {
            builder: BytecodeBuilder::new(),
            options,
            functions: Vec::new(),
            queue: VecDeque::new(),
            function_ids: FxHashMap::default(),
            state: FunctionState::new(options.kind),
        }
    }

    /// Compile a whole unit: the top level first, then every nested function
    pub fn compile_program(mut self, program: &'a Program, source: &str) -> Result<Bytecode, JsError> {
        self.functions.push(FunctionCode::new(self.options.kind));
        self.compile_function(0, None, &program.body)?;
        while let Some((id, literal)) = self.queue.pop_front() {
            self.compile_function(id, Some(literal), &literal.body)?;
        }
        Ok(Bytecode {
            functions: self.functions,
            instrs: self.builder.finish(),
            source: Rc::from(source),
            name: self.options.name.clone(),
        })
    }

    /// Id of a nested function literal, queueing it on first use
    fn function_id(&mut self, literal: &'a FunctionLiteral) -> u32 {
        if let Some(id) = self.function_ids.get(&literal.source_start) {
            return *id;
        }
        let id = self.functions.len() as u32;
        self.functions.push(FunctionCode::new(CodeKind::Function));
        self.function_ids.insert(literal.source_start, id);
        self.queue.push_back((id, literal));
        id
    }

    fn compile_function(
        &mut self,
        id: u32,
        literal: Option<&'a FunctionLiteral>,
        body: &'a [Statement],
    ) -> Result<(), JsError> {
        let kind = if literal.is_some() {
            CodeKind::Function
        } else {
            self.options.kind
        };
        let shape = hoist(body, self.options.mode)?;
        let mut code = FunctionCode::new(kind);
        let mut state = FunctionState::new(kind);

        match literal {
            Some(literal) => {
                code.name = literal.id.as_ref().map(|i| i.name.cheap_clone());
                code.params = literal.params.iter().map(|p| p.name.cheap_clone()).collect();
                code.is_expression = !literal.is_declaration;
                code.source_start = literal.source_start;
                code.source_end = literal.source_end;

                let mut locals: Vec<LocalVar> = Vec::new();
                for param in &code.params {
                    let slot = declare(&mut locals, param, false);
                    code.param_slots.push(slot);
                }
                let needs_arguments =
                    shape.uses_arguments || shape.has_eval || shape.has_with;
                if needs_arguments && !code.params.iter().any(|p| *p == "arguments") {
                    let name = JsString::from("arguments");
                    code.arguments_slot = Some(declare(&mut locals, &name, false));
                }
                for name in &shape.vars {
                    declare(&mut locals, name, false);
                }
                for f in &shape.functions {
                    if let Some(fid) = &f.id {
                        declare(&mut locals, &fid.name, false);
                    }
                }
                for lexical in &shape.lexicals {
                    if locals.iter().any(|l| l.name == lexical.name) {
                        return Err(self.error_at(
                            ErrorCode::DUPLICATE_DECLARATION,
                            format!("Redeclaration of '{}'", lexical.name),
                            literal.span,
                        ));
                    }
                    locals.push(lexical.clone());
                }
                state.locals = locals;
                state.in_function = true;
            }
            None => {
                let mut names: Vec<LocalVar> = Vec::new();
                for name in &shape.vars {
                    declare(&mut names, name, false);
                }
                for f in &shape.functions {
                    if let Some(fid) = &f.id {
                        declare(&mut names, &fid.name, false);
                    }
                }
                names.extend(shape.lexicals.iter().cloned());
                code.var_names = names;
                state.result_mode = self.options.eval_mode;
            }
        }
        state.shape = shape;
        self.state = state;

        let entry = self.builder.offset();
        self.compile_hoisted_functions()?;
        self.compile_statements(body)?;
        self.builder.emit(Op::Ret);
        self.builder.resolve_labels(entry)?;

        code.entry = entry;
        code.end = self.builder.offset();
        code.locals = std::mem::take(&mut self.state.locals);
        code.scopes = std::mem::take(&mut self.state.scopes);
        if let Some(slot) = self.functions.get_mut(id as usize) {
            *slot = code;
        }
        Ok(())
    }

    /// Instantiate function declarations hoisted to the top of the body
    fn compile_hoisted_functions(&mut self) -> Result<(), JsError> {
        let functions = std::mem::take(&mut self.state.shape.functions);
        for literal in functions {
            let Some(name) = &literal.id else {
                continue;
            };
            self.builder.set_loc(literal.span.start);
            let id = self.function_id(literal);
            self.builder.emit(Op::Func { id });
            match self.state.locals.iter().position(|l| l.name == name.name) {
                Some(slot) if self.state.kind == CodeKind::Function => {
                    self.builder.emit(Op::InitLocal { slot: slot as u32 });
                }
                _ => {
                    self.builder.emit(Op::InitVar {
                        name: name.name.cheap_clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn compile_statements(&mut self, statements: &'a [Statement]) -> Result<(), JsError> {
        for stmt in statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Scopes and name resolution
    // ═══════════════════════════════════════════════════════════════════════════

    /// Statically known variable-object slot for `name`, if no enclosing
    /// runtime scope can shadow it
    fn local_slot(&self, name: &JsString) -> Option<u32> {
        if self.state.kind != CodeKind::Function {
            return None;
        }
        for scope in &self.state.names {
            let shadows = match scope {
                NameScope::Block(names) => names.contains(name),
                NameScope::Catch(catch_name) => catch_name == name,
                NameScope::With => true,
            };
            if shadows {
                return None;
            }
        }
        self.state.locals.iter().position(|l| l.name == *name).map(|i| i as u32)
    }

    /// Whether the innermost binding of `name` is a block-scope binding
    fn is_block_binding(&self, name: &JsString) -> bool {
        for scope in self.state.names.iter().rev() {
            match scope {
                NameScope::Block(names) if names.contains(name) => return true,
                NameScope::Catch(catch_name) if catch_name == name => return false,
                _ => {}
            }
        }
        false
    }

    /// Push the block scope recorded for the statement at `key`, if any.
    /// Returns whether a scope was pushed.
    fn enter_block_scope(&mut self, key: usize) -> Result<bool, JsError> {
        let Some(block) = self.state.shape.blocks.remove(&key) else {
            return Ok(false);
        };
        let scope = self.state.scopes.len() as u32;
        let names: Vec<JsString> = block.names.iter().map(|n| n.name.cheap_clone()).collect();
        self.state.scopes.push(ScopeInfo { names: block.names });
        self.builder.emit(Op::PushBlockScope { scope });
        self.state.names.push(NameScope::Block(names));
        self.state.ctx.push(StmtCtx::Scope);

        for literal in block.functions {
            let Some(name) = &literal.id else {
                continue;
            };
            let id = self.function_id(literal);
            self.builder.emit(Op::Func { id });
            self.builder.emit(Op::InitLexical {
                name: name.name.cheap_clone(),
            });
        }
        Ok(true)
    }

    fn leave_block_scope(&mut self) {
        self.builder.emit(Op::PopScope);
        self.state.names.pop();
        self.state.ctx.pop();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Statement contexts
    // ═══════════════════════════════════════════════════════════════════════════

    /// Push a breakable context, claiming any labels that prefix it
    fn push_breakable(&mut self, kind: BreakKind, continue_label: Option<Label>, stack_cells: u32) -> Label {
        let break_label = self.builder.new_label();
        let labels = std::mem::take(&mut self.state.pending_labels);
        self.state.ctx.push(StmtCtx::Breakable {
            kind,
            labels,
            break_label,
            continue_label,
            stack_cells,
        });
        break_label
    }

    fn pop_ctx(&mut self) {
        self.state.ctx.pop();
    }

    fn has_label(&self, name: &JsString) -> bool {
        self.state.pending_labels.contains(name)
            || self.state.ctx.iter().any(|c| {
                matches!(c, StmtCtx::Breakable { labels, .. } if labels.contains(name))
            })
    }

    /// Emit the cleanup needed to leave every context above `target`
    fn unwind_to(&mut self, target: usize) {
        self.unwind_from(target + 1);
    }

    /// Emit the cleanup needed to leave every context from `first` up,
    /// innermost first
    fn unwind_from(&mut self, first: usize) {
        let crossed: Vec<Cleanup> = self
            .state
            .ctx
            .iter()
            .skip(first)
            .rev()
            .map(|ctx| match ctx {
                StmtCtx::Breakable { stack_cells, .. } => Cleanup {
                    pop: *stack_cells,
                    pop_scope: false,
                    leave_try: false,
                },
                StmtCtx::Try => Cleanup {
                    pop: 0,
                    pop_scope: false,
                    leave_try: true,
                },
                StmtCtx::Catch { has_finally } => Cleanup {
                    pop: 0,
                    pop_scope: true,
                    leave_try: *has_finally,
                },
                StmtCtx::Finally => Cleanup {
                    pop: 2,
                    pop_scope: false,
                    leave_try: false,
                },
                StmtCtx::Scope => Cleanup {
                    pop: 0,
                    pop_scope: true,
                    leave_try: false,
                },
            })
            .collect();
        for cleanup in crossed {
            if cleanup.pop > 0 {
                self.builder.emit(Op::Pop { count: cleanup.pop });
            }
            if cleanup.pop_scope {
                self.builder.emit(Op::PopScope);
            }
            if cleanup.leave_try {
                self.emit_pop_except_here();
            }
        }
    }

    /// `PopExcept` continuing at the next instruction
    fn emit_pop_except_here(&mut self) {
        let next = self.builder.new_label();
        self.builder.emit(Op::PopExcept { ret: next.id() });
        self.builder.bind_label(next);
    }

    fn error_at(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> JsError {
        JsError::syntax_error(code, message, span.location())
    }
}

/// Add `name` to `locals` unless present; returns its slot
fn declare(locals: &mut Vec<LocalVar>, name: &JsString, is_const: bool) -> u32 {
    if let Some(slot) = locals.iter().position(|l| l.name == *name) {
        return slot as u32;
    }
    locals.push(LocalVar {
        name: name.cheap_clone(),
        is_const,
    });
    (locals.len() - 1) as u32
}
