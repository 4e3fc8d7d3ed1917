//! Bytecode instruction set and compilation-unit format
//!
//! The VM is a stack machine: every instruction consumes zero or more values
//! from the operand stack and pushes zero or one. Operands that name variables
//! or properties carry interned strings; jump operands hold instruction
//! offsets once the owning function has been resolved.
//!
//! A *reference* occupies two stack cells `[base, key]`. The key is either a
//! property name (`String`) or, when the compiler or the lookup already found
//! the slot, the slot id inside `base` (`Int`). An unresolved identifier has
//! an `Undefined` base.

use std::fmt;
use std::rc::Rc;

use crate::error::{ErrorCode, SourceLocation};
use crate::value::JsString;

/// Jump target (instruction offset, or a label id before resolution)
pub type JumpTarget = u32;

/// Kind of an object-literal member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjPropKind {
    Init,
    Getter,
    Setter,
}

/// Bytecode instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    // ═══════════════════════════════════════════════════════════════════════════════
    // Literals
    // ═══════════════════════════════════════════════════════════════════════════════
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(JsString),

    /// Create a RegExp object from a literal
    RegExp { pattern: JsString, flags: JsString },

    /// Push a new array with `length` preset: [] -> [arr]
    CArray { length: u32 },

    /// Store an element of an array literal: [arr, v] -> [arr]
    ArrayElem { index: u32 },

    /// Push a new plain object: [] -> [obj]
    NewObj,

    /// Define a member of an object literal: [obj, v] -> [obj]
    ObjProp { name: JsString, kind: ObjPropKind },

    /// Create a closure over the current scope chain: [] -> [f]
    Func { id: u32 },

    /// Push the current `this`
    This,

    // ═══════════════════════════════════════════════════════════════════════════════
    // Variables
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Look a name up along the scope chain: [] -> [v]
    Ident { name: JsString },

    /// Reference to a name on the scope chain: [] -> [base, key]
    IdentRef { name: JsString },

    /// Read a slot of the function's variable object: [] -> [v]
    Local { slot: u32 },

    /// Reference to a slot of the variable object: [] -> [vars, slot]
    LocalRef { slot: u32 },

    /// Initialize a variable-object slot, ignoring read-only flags: [v] -> []
    InitLocal { slot: u32 },

    /// Initialize a declared name of the variable object: [v] -> []
    InitVar { name: JsString },

    /// Initialize a binding of the innermost block scope holding `name`: [v] -> []
    InitLexical { name: JsString },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Members
    // ═══════════════════════════════════════════════════════════════════════════════
    /// [obj] -> [obj.name]
    Member { name: JsString },

    /// [obj] -> [obj, name]
    MemberRef { name: JsString },

    /// [obj, key] -> [obj[key]]
    Index,

    /// [obj, key] -> [obj, String(key)]
    IndexRef,

    /// Read through a reference, keeping it: [base, key] -> [base, key, v]
    RefVal,

    /// Store through a reference: [base, key, v] -> [v]
    Assign,

    /// Store a for-in name through a reference: [name, base, key] -> []
    ForInAssign,

    /// Discard `count` values
    Pop { count: u32 },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════════════
    /// [f, args...] -> [result], or [] when `discard`
    Call { argc: u32, discard: bool },

    /// Call through a reference, with the base as `this`:
    /// [base, key, args...] -> [result], or [] when `discard`
    CallMember { argc: u32, discard: bool },

    /// [f, args...] -> [obj]
    New { argc: u32 },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Binary Operations: [a, b] -> [a op b]
    // ═══════════════════════════════════════════════════════════════════════════════
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
    URShift,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    Instanceof,

    // ═══════════════════════════════════════════════════════════════════════════════
    // Unary Operations
    // ═══════════════════════════════════════════════════════════════════════════════
    Neg,
    /// Unary plus
    ToNumber,
    Not,
    BitNot,
    Typeof,
    Void,

    /// `typeof name`; unresolved names give "undefined": [] -> [s]
    TypeofIdent { name: JsString },

    /// [base, key] -> [bool]
    Delete,

    /// [] -> [bool]
    DeleteIdent { name: JsString },

    /// Postfix update through a reference: [base, key] -> [old]
    PostInc { delta: i32 },

    /// Prefix update through a reference: [base, key] -> [new]
    PreInc { delta: i32 },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Control Flow
    // ═══════════════════════════════════════════════════════════════════════════════
    Jmp { target: JumpTarget },

    /// Pop and jump when falsy
    JmpZ { target: JumpTarget },

    /// Jump keeping the value when truthy, pop otherwise
    CndNz { target: JumpTarget },

    /// Jump keeping the value when falsy, pop otherwise
    CndZ { target: JumpTarget },

    /// Switch case test: [d, v] -> jump with [] when d === v, else [d]
    Case { target: JumpTarget },

    /// Start a for-in loop: [v] -> [obj|null, cursor]
    ForInInit,

    /// Advance a for-in loop: push the next name or jump to `target`
    ForIn { target: JumpTarget },

    /// [obj] -> [], pushing a `with` scope
    PushWithScope,

    /// Push a block scope described by `FunctionCode::scopes[scope]`
    PushBlockScope { scope: u32 },

    PopScope,

    /// Enter a try region
    PushExcept {
        catch_target: Option<JumpTarget>,
        finally_target: Option<JumpTarget>,
    },

    /// Leave a try region and continue at `ret`, running the finally block first
    PopExcept { ret: JumpTarget },

    /// Bind the caught value in a fresh scope: [exc] -> []
    EnterCatch { name: JsString },

    /// [payload, normal] -> [], jumping to `payload` or rethrowing it
    EndFinally,

    /// [v] -> throws v
    Throw,

    /// Raise a ReferenceError
    ThrowRef { code: ErrorCode },

    /// Raise a TypeError
    ThrowType { code: ErrorCode, message: JsString },

    /// Pop into the frame's return value
    SetRet,

    /// Return the frame's return value
    Ret,
}

impl Op {
    /// Jump operands, in operand order
    pub fn targets_mut(&mut self) -> [Option<&mut JumpTarget>; 2] {
        match self {
            Op::Jmp { target }
            | Op::JmpZ { target }
            | Op::CndNz { target }
            | Op::CndZ { target }
            | Op::Case { target }
            | Op::ForIn { target } => [Some(target), None],
            Op::PopExcept { ret } => [Some(ret), None],
            Op::PushExcept {
                catch_target,
                finally_target,
            } => [catch_target.as_mut(), finally_target.as_mut()],
            _ => [None, None],
        }
    }

    pub fn targets(&self) -> [Option<JumpTarget>; 2] {
        match self {
            Op::Jmp { target }
            | Op::JmpZ { target }
            | Op::CndNz { target }
            | Op::CndZ { target }
            | Op::Case { target }
            | Op::ForIn { target } => [Some(*target), None],
            Op::PopExcept { ret } => [Some(*ret), None],
            Op::PushExcept {
                catch_target,
                finally_target,
            } => [*catch_target, *finally_target],
            _ => [None, None],
        }
    }
}

/// One instruction with the source byte offset it was compiled from
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub loc: u32,
}

/// Slot of a variable object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
    pub name: JsString,
    pub is_const: bool,
}

/// Bindings of one block scope, created by `PushBlockScope`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeInfo {
    pub names: Vec<LocalVar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// Top level of a program; declarations become global properties
    Global,
    /// Top level of eval code; declarations land in the caller's variables
    Eval,
    Function,
}

/// Metadata of one function (or the top level) inside a unit
#[derive(Debug, Clone)]
pub struct FunctionCode {
    pub name: Option<JsString>,
    pub params: Vec<JsString>,
    /// Variable-object slot bound by each parameter
    pub param_slots: Vec<u32>,
    /// Slots of the per-call variable object, in slot order
    pub locals: Vec<LocalVar>,
    /// Names declared by global or eval code, created before it runs
    pub var_names: Vec<LocalVar>,
    pub scopes: Vec<ScopeInfo>,
    /// Slot receiving the arguments object, if the body can observe it
    pub arguments_slot: Option<u32>,
    pub kind: CodeKind,
    /// Named function expressions bind their own name in an extra scope
    pub is_expression: bool,
    /// First instruction
    pub entry: u32,
    /// One past the last instruction
    pub end: u32,
    /// Byte range of the function's source text
    pub source_start: usize,
    pub source_end: usize,
}

impl FunctionCode {
    pub fn new(kind: CodeKind) -> Self {
        Self {
            name: None,
            params: Vec::new(),
            param_slots: Vec::new(),
            locals: Vec::new(),
            var_names: Vec::new(),
            scopes: Vec::new(),
            arguments_slot: None,
            kind,
            is_expression: false,
            entry: 0,
            end: 0,
            source_start: 0,
            source_end: 0,
        }
    }

    pub fn local_slot(&self, name: &str) -> Option<u32> {
        self.locals
            .iter()
            .position(|l| l.name == name)
            .map(|i| i as u32)
    }
}

/// A compiled unit: the instruction stream of the top level and of every
/// nested function, shared by all activations.
pub struct Bytecode {
    /// Function 0 is the unit's top level
    pub functions: Vec<FunctionCode>,
    pub instrs: Vec<Instruction>,
    pub source: Rc<str>,
    /// Name used in error reports
    pub name: String,
}

impl Bytecode {
    pub fn function(&self, id: usize) -> Option<&FunctionCode> {
        self.functions.get(id)
    }

    pub fn top_level(&self) -> Option<&FunctionCode> {
        self.functions.first()
    }

    pub fn get(&self, offset: usize) -> Option<&Instruction> {
        self.instrs.get(offset)
    }

    /// Line and column (both 1-based) of a source byte offset
    pub fn location(&self, offset: u32) -> SourceLocation {
        let offset = (offset as usize).min(self.source.len());
        let before = self.source.get(..offset).unwrap_or("");
        let line = before.matches('\n').count() as u32 + 1;
        let line_start = before.rfind('\n').map_or(0, |p| p + 1);
        let column = before
            .get(line_start..)
            .map_or(0, |s| s.chars().count()) as u32
            + 1;
        SourceLocation {
            line,
            column,
            offset: offset as u32,
        }
    }

    /// Text of a 1-based source line
    pub fn source_line(&self, line: u32) -> Option<&str> {
        self.source
            .lines()
            .nth((line as usize).checked_sub(1)?)
    }

    /// Source text of a function, for `Function.prototype.toString`
    pub fn function_source(&self, id: usize) -> Option<&str> {
        let f = self.function(id)?;
        self.source.get(f.source_start..f.source_end)
    }
}

impl fmt::Debug for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bytecode")
            .field("name", &self.name)
            .field("functions", &self.functions.len())
            .field("instrs", &self.instrs.len())
            .finish()
    }
}

impl fmt::Display for Bytecode {
    /// Disassembly listing, one instruction per line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, func) in self.functions.iter().enumerate() {
            let name = func.name.as_ref().map_or("<anonymous>", |n| n.as_str());
            writeln!(f, "function {} ({}):", id, name)?;
            let range = func.entry as usize..func.end as usize;
            for (offset, instr) in self.instrs.iter().enumerate() {
                if range.contains(&offset) {
                    writeln!(f, "  {:4}  {:?}", offset, instr.op)?;
                }
            }
        }
        Ok(())
    }
}
