//! Bytecode Virtual Machine
//!
//! A stack machine over the instruction stream of one compilation unit.
//! Calls between source functions push a [`CallFrame`] and stay inside the
//! same `run` loop; a native function that calls back into script starts a
//! nested VM. Each frame keeps its own exception frames, so unwinding pops
//! handlers of the innermost frame first and then whole frames.

use std::rc::Rc;

use log::trace;

use crate::compiler::{Bytecode, ObjPropKind, Op};
use crate::error::{ErrorCode, ErrorKind, JsError};
use crate::object::{
    CaseMode, ClassId, EnumMode, FunctionData, ObjectData, PropFlags, PropId, SlotKind,
    SourceFunction, delete_member, delete_prop, has_property, next_enumerable, prop_get, prop_put,
    put_member,
};
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue, to_uint32};

use super::builtins::function::apply_arguments;
use super::builtins::regexp::create_regexp;
use super::function::{activate, create_closure, function_code};
use super::scope::{
    create_block_scope, create_catch_scope, get_identifier, init_binding, init_lexical,
    parent_scope, push_scope, resolve,
};
use super::{CallerContext, Interpreter, StackFrame};

/// Active `try` region of a frame
#[derive(Debug, Clone)]
struct ExceptFrame {
    catch_target: Option<u32>,
    finally_target: Option<u32>,
    /// Operand-stack height when the region was entered
    stack_depth: usize,
    scope: Option<JsObjectRef>,
}

/// A call frame in the VM
#[derive(Debug)]
struct CallFrame {
    code: Rc<Bytecode>,
    func_id: usize,
    ip: u32,
    /// Operand-stack height at entry
    stack_base: usize,
    scope: Option<JsObjectRef>,
    var_obj: JsObjectRef,
    this: JsValue,
    except: Vec<ExceptFrame>,
    /// Value set by `SetRet`
    ret: JsValue,
    /// Instance under construction, for `new`
    construct: Option<JsObjectRef>,
    /// Drop the return value instead of pushing it on the caller's stack
    discard_result: bool,
    /// Frame of a function call, as opposed to global or eval code
    is_call: bool,
}

/// Result of executing a single opcode
enum OpResult {
    /// Continue to next instruction
    Continue,
    /// The outermost frame returned
    Return(JsValue),
}

/// The bytecode virtual machine
pub struct BytecodeVM {
    frames: Vec<CallFrame>,
    stack: Vec<JsValue>,
}

impl BytecodeVM {
    fn new() -> Self {
        Self {
            frames: Vec::new(),
            stack: Vec::with_capacity(64),
        }
    }

    /// Run the top level of `code`
    pub fn execute(
        interp: &mut Interpreter,
        code: &Rc<Bytecode>,
        scope: Option<JsObjectRef>,
        var_obj: JsObjectRef,
        this: JsValue,
    ) -> Result<JsValue, JsError> {
        let entry = function_code(code, 0)?.entry;
        let mut vm = Self::new();
        vm.frames.push(CallFrame {
            code: code.cheap_clone(),
            func_id: 0,
            ip: entry,
            stack_base: 0,
            scope,
            var_obj,
            this,
            except: Vec::new(),
            ret: JsValue::Undefined,
            construct: None,
            discard_result: false,
            is_call: false,
        });
        interp.enter_vm()?;
        let result = vm.run(interp);
        interp.leave_vm();
        result
    }

    /// Call a source function to completion
    pub fn call(
        interp: &mut Interpreter,
        callee: &JsObjectRef,
        func: &SourceFunction,
        this: JsValue,
        args: &[JsValue],
        construct: Option<JsObjectRef>,
    ) -> Result<JsValue, JsError> {
        interp.enter_vm()?;
        let mut vm = Self::new();
        let result = vm
            .push_call(interp, callee, func, this, args, construct, false)
            .and_then(|()| vm.run(interp));
        interp.leave_vm();
        result
    }

    /// Execute until the outermost frame returns or a failure escapes it
    fn run(&mut self, interp: &mut Interpreter) -> Result<JsValue, JsError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(JsValue::Undefined);
            };
            let offset = frame.ip;
            let Some(instr) = frame.code.get(offset as usize) else {
                return Err(JsError::internal_error("instruction pointer out of range"));
            };
            let op = instr.op.clone();
            frame.ip += 1;
            trace!("{:>5} {:?}", offset, op);

            match self.execute_op(interp, op) {
                Ok(OpResult::Continue) => {}
                Ok(OpResult::Return(value)) => return Ok(value),
                Err(err) => {
                    if let Some(frame) = self.frames.last() {
                        let code = frame.code.cheap_clone();
                        interp.note_error_site(&code, offset);
                    }
                    self.unwind(interp, err)?;
                }
            }
        }
    }

    /// Transfer control to the nearest handler, or fail when none is left
    fn unwind(&mut self, interp: &mut Interpreter, err: JsError) -> Result<(), JsError> {
        if !err.is_catchable() {
            while !self.frames.is_empty() {
                self.pop_frame(interp);
            }
            return Err(err);
        }
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Err(err);
            };
            let Some(handler) = frame.except.pop() else {
                self.pop_frame(interp);
                continue;
            };
            self.stack.truncate(handler.stack_depth);
            frame.scope = handler.scope.clone();
            interp.error_site = None;
            let value = interp.error_to_value(&err);
            match (handler.catch_target, handler.finally_target) {
                (Some(catch_target), finally_target) => {
                    if finally_target.is_some() {
                        frame.except.push(ExceptFrame {
                            catch_target: None,
                            ..handler
                        });
                    }
                    frame.ip = catch_target;
                    self.stack.push(value);
                }
                (None, Some(finally_target)) => {
                    frame.ip = finally_target;
                    self.stack.push(value);
                    self.stack.push(JsValue::Boolean(false));
                }
                (None, None) => continue,
            }
            trace!("exception caught: {}", err);
            return Ok(());
        }
    }

    fn pop_frame(&mut self, interp: &mut Interpreter) -> Option<CallFrame> {
        let frame = self.frames.pop()?;
        self.stack.truncate(frame.stack_base);
        if frame.is_call {
            interp.call_stack.pop();
            interp.call_depth = interp.call_depth.saturating_sub(1);
        }
        Some(frame)
    }

    /// Enter a source function
    #[allow(clippy::too_many_arguments)]
    fn push_call(
        &mut self,
        interp: &mut Interpreter,
        callee: &JsObjectRef,
        func: &SourceFunction,
        this: JsValue,
        args: &[JsValue],
        construct: Option<JsObjectRef>,
        discard_result: bool,
    ) -> Result<(), JsError> {
        let entry = function_code(&func.code, func.func_id)?.entry;
        interp.enter_call()?;
        let activation = match activate(interp, callee, func, this, args) {
            Ok(activation) => activation,
            Err(err) => {
                interp.call_depth = interp.call_depth.saturating_sub(1);
                return Err(err);
            }
        };
        interp.call_stack.push(StackFrame {
            callee: callee.cheap_clone(),
            var_obj: activation.var_obj.cheap_clone(),
            args: args.to_vec(),
            arguments: activation.arguments,
        });
        self.frames.push(CallFrame {
            code: func.code.cheap_clone(),
            func_id: func.func_id,
            ip: entry,
            stack_base: self.stack.len(),
            scope: Some(activation.scope),
            var_obj: activation.var_obj,
            this: activation.this,
            except: Vec::new(),
            ret: JsValue::Undefined,
            construct,
            discard_result,
            is_call: true,
        });
        interp.note_call();
        Ok(())
    }

    /// Call `callee` from bytecode; source functions continue in this loop
    fn call_value(
        &mut self,
        interp: &mut Interpreter,
        callee: &JsValue,
        this: JsValue,
        args: Vec<JsValue>,
        is_new: bool,
        discard_result: bool,
    ) -> Result<(), JsError> {
        let (obj, data) = interp.function_data(callee)?;
        match data {
            FunctionData::Source(source) => {
                if is_new {
                    let instance = interp.instance_for(&obj)?;
                    let this = JsValue::Object(instance.cheap_clone());
                    self.push_call(interp, &obj, &source, this, &args, Some(instance), false)
                } else {
                    self.push_call(interp, &obj, &source, this, &args, None, discard_result)
                }
            }
            FunctionData::Native(_) if !is_new && is_forwarder(interp, &obj) && is_source_function(&this) => {
                // `f.call(...)` / `f.apply(...)` on a source function: run
                // `f` in this loop instead of a nested VM
                let this_arg = args.first().cloned().unwrap_or_default();
                let call_args = if interp.forwarders.as_ref().is_some_and(|f| f.call == obj) {
                    args.get(1..).unwrap_or(&[]).to_vec()
                } else {
                    apply_arguments(interp, &args.get(1).cloned().unwrap_or_default())?
                };
                self.call_value(interp, &this, this_arg, call_args, false, discard_result)
            }
            FunctionData::Native(native) => {
                let context = {
                    let frame = self.frame()?;
                    CallerContext {
                        scope: frame.scope.clone(),
                        var_obj: frame.var_obj.cheap_clone(),
                        this: frame.this.clone(),
                    }
                };
                let height = self.stack.len();
                let saved = interp.caller.replace(context);
                let result = if is_new {
                    interp.construct_native(&native, &args)
                } else {
                    interp.call_native(&native, this, &args)
                };
                interp.caller = saved;
                let value = result?;
                if !discard_result {
                    self.stack.push(value);
                }
                self.expect_height(height, discard_result)
            }
        }
    }

    /// A finished call leaves exactly its result on the caller's stack, or
    /// nothing when the result is discarded
    fn expect_height(&self, before: usize, discarded: bool) -> Result<(), JsError> {
        let expected = before + usize::from(!discarded);
        if self.stack.len() == expected {
            Ok(())
        } else {
            Err(JsError::internal_error(format!(
                "operand stack unbalanced after call: height {}, expected {}",
                self.stack.len(),
                expected
            )))
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Stack and frame access
    // ═══════════════════════════════════════════════════════════════════════════

    fn frame(&self) -> Result<&CallFrame, JsError> {
        self.frames
            .last()
            .ok_or_else(|| JsError::internal_error("no active frame"))
    }

    fn frame_mut(&mut self) -> Result<&mut CallFrame, JsError> {
        self.frames
            .last_mut()
            .ok_or_else(|| JsError::internal_error("no active frame"))
    }

    fn jump(&mut self, target: u32) -> Result<OpResult, JsError> {
        self.frame_mut()?.ip = target;
        Ok(OpResult::Continue)
    }

    fn pop(&mut self) -> Result<JsValue, JsError> {
        self.stack
            .pop()
            .ok_or_else(|| JsError::internal_error("operand stack underflow"))
    }

    fn pop_n(&mut self, count: u32) -> Result<Vec<JsValue>, JsError> {
        let at = self
            .stack
            .len()
            .checked_sub(count as usize)
            .ok_or_else(|| JsError::internal_error("operand stack underflow"))?;
        Ok(self.stack.split_off(at))
    }

    /// Value `depth` cells below the top
    fn peek(&self, depth: usize) -> Result<&JsValue, JsError> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.stack.get(i))
            .ok_or_else(|| JsError::internal_error("operand stack underflow"))
    }

    fn push(&mut self, value: JsValue) -> Result<OpResult, JsError> {
        self.stack.push(value);
        Ok(OpResult::Continue)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Instruction dispatch
    // ═══════════════════════════════════════════════════════════════════════════

    fn execute_op(&mut self, interp: &mut Interpreter, op: Op) -> Result<OpResult, JsError> {
        match op {
            // ───────────────────────────────────────────────────────────────────
            // Literals
            // ───────────────────────────────────────────────────────────────────
            Op::Undefined => self.push(JsValue::Undefined),
            Op::Null => self.push(JsValue::Null),
            Op::Bool(b) => self.push(JsValue::Boolean(b)),
            Op::Int(i) => self.push(JsValue::Int(i)),
            Op::Double(n) => self.push(JsValue::Number(n)),
            Op::Str(s) => self.push(JsValue::String(s)),

            Op::RegExp { pattern, flags } => {
                let re = create_regexp(interp, &pattern, flags.as_str())?;
                self.push(JsValue::Object(re))
            }

            Op::CArray { length } => {
                let arr = interp.create_array(Vec::new());
                if let ObjectData::Array(data) = &mut arr.borrow_mut().data {
                    data.length = length;
                }
                self.push(JsValue::Object(arr))
            }

            Op::ArrayElem { index } => {
                let value = self.pop()?;
                if let JsValue::Object(arr) = self.peek(0)? {
                    let key = interp.intern(&index.to_string());
                    arr.borrow_mut().set_own(key, value, PropFlags::ALL);
                }
                Ok(OpResult::Continue)
            }

            Op::NewObj => {
                let obj = interp.create_object();
                self.push(JsValue::Object(obj))
            }

            Op::ObjProp { name, kind } => {
                let value = self.pop()?;
                if let JsValue::Object(obj) = self.peek(0)? {
                    match (kind, value) {
                        (ObjPropKind::Init, value) => {
                            obj.borrow_mut().set_own(name, value, PropFlags::ALL);
                        }
                        (ObjPropKind::Getter, JsValue::Object(f)) => define_accessor(obj, name, f, true),
                        (ObjPropKind::Setter, JsValue::Object(f)) => define_accessor(obj, name, f, false),
                        _ => {}
                    }
                }
                Ok(OpResult::Continue)
            }

            Op::Func { id } => {
                let (code, scope) = {
                    let frame = self.frame()?;
                    (frame.code.cheap_clone(), frame.scope.clone())
                };
                let func = create_closure(interp, &code, id as usize, scope)?;
                self.push(JsValue::Object(func))
            }

            Op::This => {
                let this = self.frame()?.this.clone();
                self.push(this)
            }

            // ───────────────────────────────────────────────────────────────────
            // Variables
            // ───────────────────────────────────────────────────────────────────
            Op::Ident { name } => {
                let scope = self.frame()?.scope.clone();
                let value = get_identifier(interp, scope.as_ref(), name.as_str())?;
                self.push(value)
            }

            Op::IdentRef { name } => {
                let scope = self.frame()?.scope.clone();
                match resolve(interp, scope.as_ref(), name.as_str())? {
                    Some((holder, id)) => {
                        self.stack.push(JsValue::Object(holder));
                        self.push(JsValue::Int(id.0 as i32))
                    }
                    None => {
                        self.stack.push(JsValue::Undefined);
                        self.push(JsValue::String(name))
                    }
                }
            }

            Op::Local { slot } => {
                let var_obj = self.frame()?.var_obj.cheap_clone();
                let fast = match var_obj.borrow().props.kind(PropId(slot)) {
                    Some(SlotKind::Value(v)) => Some(v.clone()),
                    _ => None,
                };
                let value = match fast {
                    Some(v) => v,
                    None => prop_get(interp, &var_obj, PropId(slot))?,
                };
                self.push(value)
            }

            Op::LocalRef { slot } => {
                let var_obj = self.frame()?.var_obj.cheap_clone();
                self.stack.push(JsValue::Object(var_obj));
                self.push(JsValue::Int(slot as i32))
            }

            Op::InitLocal { slot } => {
                let value = self.pop()?;
                let var_obj = self.frame()?.var_obj.cheap_clone();
                if let Some(s) = var_obj.borrow_mut().props.slot_mut(PropId(slot)) {
                    s.kind = SlotKind::Value(value);
                }
                Ok(OpResult::Continue)
            }

            Op::InitVar { name } => {
                let value = self.pop()?;
                let var_obj = self.frame()?.var_obj.cheap_clone();
                init_binding(interp, &var_obj, &name, value)?;
                Ok(OpResult::Continue)
            }

            Op::InitLexical { name } => {
                let value = self.pop()?;
                let (scope, var_obj) = {
                    let frame = self.frame()?;
                    (frame.scope.clone(), frame.var_obj.cheap_clone())
                };
                init_lexical(interp, scope.as_ref(), &var_obj, &name, value)?;
                Ok(OpResult::Continue)
            }

            // ───────────────────────────────────────────────────────────────────
            // Members
            // ───────────────────────────────────────────────────────────────────
            Op::Member { name } => {
                let base = self.pop()?;
                let value = interp.get_property(&base, name.as_str())?;
                self.push(value)
            }

            Op::MemberRef { name } => {
                check_base(self.peek(0)?, name.as_str())?;
                self.push(JsValue::String(name))
            }

            Op::Index => {
                let key = self.pop()?;
                let base = self.pop()?;
                let key = interp.to_property_key(&key)?;
                let value = interp.get_property(&base, key.as_str())?;
                self.push(value)
            }

            Op::IndexRef => {
                let key = self.pop()?;
                let key = interp.to_property_key(&key)?;
                check_base(self.peek(0)?, key.as_str())?;
                self.push(JsValue::String(key))
            }

            Op::RefVal => {
                let base = self.peek(1)?.clone();
                let key = self.peek(0)?.clone();
                let value = ref_get(interp, &base, &key)?;
                self.push(value)
            }

            Op::Assign => {
                let value = self.pop()?;
                let key = self.pop()?;
                let base = self.pop()?;
                ref_put(interp, &base, &key, value.clone())?;
                self.push(value)
            }

            Op::ForInAssign => {
                let key = self.pop()?;
                let base = self.pop()?;
                let name = self.pop()?;
                ref_put(interp, &base, &key, name)?;
                Ok(OpResult::Continue)
            }

            Op::Pop { count } => {
                self.pop_n(count)?;
                Ok(OpResult::Continue)
            }

            // ───────────────────────────────────────────────────────────────────
            // Calls
            // ───────────────────────────────────────────────────────────────────
            Op::Call { argc, discard } => {
                let args = self.pop_n(argc)?;
                let callee = self.pop()?;
                self.call_value(interp, &callee, JsValue::Undefined, args, false, discard)?;
                Ok(OpResult::Continue)
            }

            Op::CallMember { argc, discard } => {
                let args = self.pop_n(argc)?;
                let key = self.pop()?;
                let base = self.pop()?;
                let callee = ref_get(interp, &base, &key)?;
                let this = match &base {
                    JsValue::Object(obj)
                        if matches!(obj.borrow().class(), ClassId::Variables | ClassId::Global) =>
                    {
                        JsValue::Undefined
                    }
                    _ => base,
                };
                if !callee.is_callable() {
                    return Err(not_a_function(&key));
                }
                self.call_value(interp, &callee, this, args, false, discard)?;
                Ok(OpResult::Continue)
            }

            Op::New { argc } => {
                let args = self.pop_n(argc)?;
                let callee = self.pop()?;
                if !callee.is_callable() {
                    return Err(JsError::type_error(
                        ErrorCode::UNSUPPORTED_ACTION,
                        "Object doesn't support this action",
                    ));
                }
                self.call_value(interp, &callee, JsValue::Undefined, args, true, false)?;
                Ok(OpResult::Continue)
            }

            // ───────────────────────────────────────────────────────────────────
            // Binary operations
            // ───────────────────────────────────────────────────────────────────
            Op::Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                let value = interp.add(&a, &b)?;
                self.push(value)
            }

            Op::Sub => {
                let b = self.pop()?;
                let a = self.pop()?;
                if let (JsValue::Int(x), JsValue::Int(y)) = (&a, &b)
                    && let Some(r) = x.checked_sub(*y)
                {
                    return self.push(JsValue::Int(r));
                }
                let (x, y) = numeric_operands(interp, &a, &b)?;
                self.push(JsValue::number(x - y))
            }

            Op::Mul => self.arithmetic(interp, |x, y| x * y),
            Op::Div => self.arithmetic(interp, |x, y| x / y),
            Op::Mod => self.arithmetic(interp, |x, y| x % y),

            Op::BitAnd => self.bitwise(interp, |x, y| x & y),
            Op::BitOr => self.bitwise(interp, |x, y| x | y),
            Op::BitXor => self.bitwise(interp, |x, y| x ^ y),
            Op::LShift => self.bitwise(interp, |x, y| x.wrapping_shl(y as u32 & 31)),
            Op::RShift => self.bitwise(interp, |x, y| x.wrapping_shr(y as u32 & 31)),

            Op::URShift => {
                let b = self.pop()?;
                let a = self.pop()?;
                let x = to_uint32(interp.to_number(&a)?);
                let y = to_uint32(interp.to_number(&b)?) & 31;
                self.push(JsValue::number(f64::from(x >> y)))
            }

            Op::Eq => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = interp.loose_equals(&a, &b)?;
                self.push(JsValue::Boolean(result))
            }

            Op::NotEq => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = interp.loose_equals(&a, &b)?;
                self.push(JsValue::Boolean(!result))
            }

            Op::StrictEq => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(JsValue::Boolean(a.strict_equals(&b)))
            }

            Op::StrictNotEq => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(JsValue::Boolean(!a.strict_equals(&b)))
            }

            Op::Lt => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = interp.less_than(&a, &b, true)? == Some(true);
                self.push(JsValue::Boolean(result))
            }

            Op::LtEq => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = interp.less_than(&b, &a, false)? == Some(false);
                self.push(JsValue::Boolean(result))
            }

            Op::Gt => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = interp.less_than(&b, &a, false)? == Some(true);
                self.push(JsValue::Boolean(result))
            }

            Op::GtEq => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = interp.less_than(&a, &b, true)? == Some(false);
                self.push(JsValue::Boolean(result))
            }

            Op::In => {
                let obj = self.pop()?;
                let key = self.pop()?;
                let JsValue::Object(obj) = obj else {
                    return Err(JsError::object_expected());
                };
                let key = interp.to_property_key(&key)?;
                let result = has_property(&obj, key.as_str())?;
                self.push(JsValue::Boolean(result))
            }

            Op::Instanceof => {
                let ctor = self.pop()?;
                let value = self.pop()?;
                let result = interp.instance_of(&value, &ctor)?;
                self.push(JsValue::Boolean(result))
            }

            // ───────────────────────────────────────────────────────────────────
            // Unary operations
            // ───────────────────────────────────────────────────────────────────
            Op::Neg => {
                let value = self.pop()?;
                if let JsValue::Int(i) = value
                    && i != 0
                    && let Some(r) = i.checked_neg()
                {
                    return self.push(JsValue::Int(r));
                }
                let n = interp.to_number(&value)?;
                self.push(JsValue::number(-n))
            }

            Op::ToNumber => {
                let value = self.pop()?;
                let result = match value {
                    JsValue::Int(_) => value,
                    _ => JsValue::number(interp.to_number(&value)?),
                };
                self.push(result)
            }

            Op::Not => {
                let value = self.pop()?;
                self.push(JsValue::Boolean(!value.to_boolean()))
            }

            Op::BitNot => {
                let value = self.pop()?;
                let i = interp.to_int32(&value)?;
                self.push(JsValue::Int(!i))
            }

            Op::Typeof => {
                let value = self.pop()?;
                let name = interp.intern(value.type_of());
                self.push(JsValue::String(name))
            }

            Op::Void => {
                self.pop()?;
                self.push(JsValue::Undefined)
            }

            Op::TypeofIdent { name } => {
                let scope = self.frame()?.scope.clone();
                let type_name = match resolve(interp, scope.as_ref(), name.as_str())? {
                    Some((holder, id)) => prop_get(interp, &holder, id)?.type_of(),
                    None => "undefined",
                };
                let type_name = interp.intern(type_name);
                self.push(JsValue::String(type_name))
            }

            Op::Delete => {
                let key = self.pop()?;
                let base = self.pop()?;
                let result = match (&base, &key) {
                    (JsValue::Object(obj), JsValue::Int(id)) => delete_prop(obj, PropId(*id as u32))?,
                    (JsValue::Object(obj), JsValue::String(name)) => delete_member(obj, name.as_str())?,
                    _ => true,
                };
                self.push(JsValue::Boolean(result))
            }

            Op::DeleteIdent { name } => {
                let scope = self.frame()?.scope.clone();
                let result = match resolve(interp, scope.as_ref(), name.as_str())? {
                    Some((holder, id)) => delete_prop(&holder, id)?,
                    None => true,
                };
                self.push(JsValue::Boolean(result))
            }

            Op::PostInc { delta } => {
                let key = self.pop()?;
                let base = self.pop()?;
                let old = ref_get(interp, &base, &key)?;
                let (old, new) = increment(interp, &old, delta)?;
                ref_put(interp, &base, &key, new)?;
                self.push(old)
            }

            Op::PreInc { delta } => {
                let key = self.pop()?;
                let base = self.pop()?;
                let old = ref_get(interp, &base, &key)?;
                let (_, new) = increment(interp, &old, delta)?;
                ref_put(interp, &base, &key, new.clone())?;
                self.push(new)
            }

            // ───────────────────────────────────────────────────────────────────
            // Control flow
            // ───────────────────────────────────────────────────────────────────
            Op::Jmp { target } => self.jump(target),

            Op::JmpZ { target } => {
                if self.pop()?.to_boolean() {
                    Ok(OpResult::Continue)
                } else {
                    self.jump(target)
                }
            }

            Op::CndNz { target } => {
                if self.peek(0)?.to_boolean() {
                    self.jump(target)
                } else {
                    self.pop()?;
                    Ok(OpResult::Continue)
                }
            }

            Op::CndZ { target } => {
                if self.peek(0)?.to_boolean() {
                    self.pop()?;
                    Ok(OpResult::Continue)
                } else {
                    self.jump(target)
                }
            }

            Op::Case { target } => {
                let value = self.pop()?;
                if self.peek(0)?.strict_equals(&value) {
                    self.pop()?;
                    self.jump(target)
                } else {
                    Ok(OpResult::Continue)
                }
            }

            Op::ForInInit => {
                let value = self.pop()?;
                let subject = match value {
                    JsValue::Undefined | JsValue::Null => JsValue::Null,
                    other => JsValue::Object(interp.to_object(&other)?),
                };
                self.stack.push(subject);
                self.push(JsValue::Int(-1))
            }

            Op::ForIn { target } => {
                let JsValue::Object(obj) = self.peek(1)?.clone() else {
                    return self.jump(target);
                };
                let after = match self.peek(0)? {
                    JsValue::Int(i) if *i >= 0 => Some(PropId(*i as u32)),
                    _ => None,
                };
                let Some(id) = next_enumerable(&obj, after, EnumMode::All)? else {
                    return self.jump(target);
                };
                if let Some(cursor) = self.stack.last_mut() {
                    *cursor = JsValue::Int(id.0 as i32);
                }
                let name = obj.borrow().props.name(id).cloned().unwrap_or_default();
                self.push(JsValue::String(name))
            }

            Op::PushWithScope => {
                let value = self.pop()?;
                let object = interp.to_object(&value)?;
                let frame = self.frame_mut()?;
                let next = frame.scope.take();
                let scope = push_scope(interp, object, next);
                self.frame_mut()?.scope = Some(scope);
                Ok(OpResult::Continue)
            }

            Op::PushBlockScope { scope } => {
                let (code, func_id, next) = {
                    let frame = self.frame()?;
                    (frame.code.cheap_clone(), frame.func_id, frame.scope.clone())
                };
                let info = function_code(&code, func_id)?
                    .scopes
                    .get(scope as usize)
                    .ok_or_else(|| JsError::internal_error("unknown block scope"))?;
                let vars = create_block_scope(interp, info);
                let link = push_scope(interp, vars, next);
                self.frame_mut()?.scope = Some(link);
                Ok(OpResult::Continue)
            }

            Op::PopScope => {
                let frame = self.frame_mut()?;
                frame.scope = frame.scope.as_ref().and_then(parent_scope);
                Ok(OpResult::Continue)
            }

            Op::PushExcept {
                catch_target,
                finally_target,
            } => {
                let stack_depth = self.stack.len();
                let frame = self.frame_mut()?;
                let scope = frame.scope.clone();
                frame.except.push(ExceptFrame {
                    catch_target,
                    finally_target,
                    stack_depth,
                    scope,
                });
                Ok(OpResult::Continue)
            }

            Op::PopExcept { ret } => {
                let handler = self.frame_mut()?.except.pop();
                match handler.and_then(|h| h.finally_target) {
                    Some(finally_target) => {
                        self.stack.push(JsValue::Int(ret as i32));
                        self.stack.push(JsValue::Boolean(true));
                        self.jump(finally_target)
                    }
                    None => self.jump(ret),
                }
            }

            Op::EnterCatch { name } => {
                let exception = self.pop()?;
                let vars = create_catch_scope(interp, &name, exception);
                let next = self.frame_mut()?.scope.take();
                let link = push_scope(interp, vars, next);
                self.frame_mut()?.scope = Some(link);
                Ok(OpResult::Continue)
            }

            Op::EndFinally => {
                let normal = self.pop()?;
                let payload = self.pop()?;
                match (normal, payload) {
                    (JsValue::Boolean(true), JsValue::Int(target)) => self.jump(target as u32),
                    (_, payload) => Err(interp.throw_value(payload)),
                }
            }

            Op::Throw => {
                let value = self.pop()?;
                Err(interp.throw_value(value))
            }

            Op::ThrowRef { code } => Err(JsError::runtime(
                ErrorKind::Reference,
                code,
                "Cannot assign to a function result",
            )),

            Op::ThrowType { code, message } => Err(JsError::type_error(code, message.as_str())),

            Op::SetRet => {
                let value = self.pop()?;
                self.frame_mut()?.ret = value;
                Ok(OpResult::Continue)
            }

            Op::Ret => {
                let height = self.stack.len();
                let frame = self
                    .pop_frame(interp)
                    .ok_or_else(|| JsError::internal_error("return without a frame"))?;
                if height != frame.stack_base {
                    return Err(JsError::internal_error(format!(
                        "operand stack unbalanced on return: height {}, frame base {}",
                        height, frame.stack_base
                    )));
                }
                let value = match (frame.construct, frame.ret) {
                    (Some(instance), ret) if !matches!(ret, JsValue::Object(_)) => JsValue::Object(instance),
                    (_, ret) => ret,
                };
                if self.frames.is_empty() {
                    return Ok(OpResult::Return(value));
                }
                if !frame.discard_result {
                    self.stack.push(value);
                }
                self.expect_height(frame.stack_base, frame.discard_result)?;
                Ok(OpResult::Continue)
            }
        }
    }

    fn arithmetic(&mut self, interp: &mut Interpreter, f: fn(f64, f64) -> f64) -> Result<OpResult, JsError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let (x, y) = numeric_operands(interp, &a, &b)?;
        self.push(JsValue::number(f(x, y)))
    }

    fn bitwise(&mut self, interp: &mut Interpreter, f: fn(i32, i32) -> i32) -> Result<OpResult, JsError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let x = interp.to_int32(&a)?;
        let y = interp.to_int32(&b)?;
        self.push(JsValue::Int(f(x, y)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// References
// ═══════════════════════════════════════════════════════════════════════════

fn is_forwarder(interp: &Interpreter, obj: &JsObjectRef) -> bool {
    interp
        .forwarders
        .as_ref()
        .is_some_and(|f| f.call == *obj || f.apply == *obj)
}

fn is_source_function(value: &JsValue) -> bool {
    match value {
        JsValue::Object(obj) => matches!(obj.borrow().as_function(), Some(FunctionData::Source(_))),
        _ => false,
    }
}

fn ref_get(interp: &mut Interpreter, base: &JsValue, key: &JsValue) -> Result<JsValue, JsError> {
    match (base, key) {
        (JsValue::Object(obj), JsValue::Int(id)) => prop_get(interp, obj, PropId(*id as u32)),
        (JsValue::Undefined, JsValue::String(name)) => Err(JsError::reference_error(name.as_str())),
        (_, JsValue::String(name)) => interp.get_property(base, name.as_str()),
        _ => Err(JsError::internal_error("malformed reference")),
    }
}

fn ref_put(interp: &mut Interpreter, base: &JsValue, key: &JsValue, value: JsValue) -> Result<(), JsError> {
    match (base, key) {
        (JsValue::Object(obj), JsValue::Int(id)) => {
            let id = PropId(*id as u32);
            if obj.borrow().props.flags(id).is_const() {
                let name = obj.borrow().props.name(id).cloned().unwrap_or_default();
                return Err(JsError::type_error(
                    ErrorCode::CONST_ASSIGNMENT,
                    format!("Assignment to const '{}'", name),
                ));
            }
            prop_put(interp, obj, id, value)
        }
        (JsValue::Undefined, JsValue::String(name)) => {
            let global = interp.global.cheap_clone();
            put_member(interp, &global, name, value)
        }
        (_, JsValue::String(name)) => interp.put_property(base, name, value),
        _ => Err(JsError::internal_error("malformed reference")),
    }
}

/// Member access on `undefined` or `null` fails before the key is used
fn check_base(base: &JsValue, name: &str) -> Result<(), JsError> {
    if base.is_null_or_undefined() {
        return Err(JsError::type_error(
            ErrorCode::OBJECT_EXPECTED,
            format!("Unable to get property '{}' of undefined or null reference", name),
        ));
    }
    Ok(())
}

fn not_a_function(key: &JsValue) -> JsError {
    match key {
        JsValue::String(name) => JsError::type_error(
            ErrorCode::PROPERTY_NOT_SUPPORTED,
            format!("Object doesn't support property or method '{}'", name),
        ),
        _ => JsError::function_expected(),
    }
}

fn define_accessor(obj: &JsObjectRef, name: JsString, f: JsObjectRef, is_getter: bool) {
    let mut o = obj.borrow_mut();
    let flags = PropFlags::ENUMERABLE | PropFlags::CONFIGURABLE;
    let existing = o.props.find(name.as_str(), CaseMode::Sensitive);
    let (getter, setter) = match existing.and_then(|id| o.props.kind(id)) {
        Some(SlotKind::Accessor { getter, setter }) => (getter.clone(), setter.clone()),
        _ => (None, None),
    };
    let kind = if is_getter {
        SlotKind::Accessor {
            getter: Some(f),
            setter,
        }
    } else {
        SlotKind::Accessor {
            getter,
            setter: Some(f),
        }
    };
    match existing {
        Some(id) => o.props.set(id, kind, flags),
        None => {
            o.props.add(name, flags, kind);
        }
    }
}

fn numeric_operands(interp: &mut Interpreter, a: &JsValue, b: &JsValue) -> Result<(f64, f64), JsError> {
    let x = interp.to_number(a)?;
    let y = interp.to_number(b)?;
    Ok((x, y))
}

/// Old value as a number, and the updated value
fn increment(interp: &mut Interpreter, old: &JsValue, delta: i32) -> Result<(JsValue, JsValue), JsError> {
    if let JsValue::Int(i) = old
        && let Some(r) = i.checked_add(delta)
    {
        return Ok((JsValue::Int(*i), JsValue::Int(r)));
    }
    let n = interp.to_number(old)?;
    Ok((JsValue::number(n), JsValue::number(n + f64::from(delta))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileOptions;
    use crate::interpreter::EngineConfig;
    use crate::interpreter::function::declare_unit_names;

    /// A call site waiting for its callee: frame count at the call and the
    /// operand-stack height the caller must see afterwards
    struct PendingCall {
        frames: usize,
        expected: usize,
    }

    /// Step `source` as global code one instruction at a time, checking the
    /// caller's stack height after every call. Returns the number of calls
    /// checked and the final value.
    fn run_checked(source: &str) -> (usize, JsValue) {
        let mut interp = Interpreter::new(EngineConfig::default());
        let options = CompileOptions {
            eval_mode: true,
            ..CompileOptions::program("test")
        };
        let code = interp.compile(source, options).unwrap();
        let var_obj = interp.global.cheap_clone();
        declare_unit_names(code.top_level().unwrap(), &var_obj, false).unwrap();

        let mut vm = BytecodeVM::new();
        vm.frames.push(CallFrame {
            code: code.cheap_clone(),
            func_id: 0,
            ip: function_code(&code, 0).unwrap().entry,
            stack_base: 0,
            scope: None,
            var_obj,
            this: interp.global_this.clone(),
            except: Vec::new(),
            ret: JsValue::Undefined,
            construct: None,
            discard_result: false,
            is_call: false,
        });

        let mut pending: Vec<PendingCall> = Vec::new();
        let mut checked = 0;
        loop {
            let frame = vm.frames.last_mut().unwrap();
            let op = frame.code.get(frame.ip as usize).unwrap().op.clone();
            frame.ip += 1;

            let height = vm.stack.len();
            let frames = vm.frames.len();
            let expected = match &op {
                Op::Call { argc, discard } => Some(height - *argc as usize - 1 + usize::from(!discard)),
                Op::CallMember { argc, discard } => Some(height - *argc as usize - 2 + usize::from(!discard)),
                Op::New { argc } => Some(height - *argc as usize),
                _ => None,
            };
            if let Some(expected) = expected {
                pending.push(PendingCall { frames, expected });
            }

            match vm.execute_op(&mut interp, op) {
                Ok(OpResult::Continue) => {}
                Ok(OpResult::Return(value)) => {
                    assert!(pending.is_empty());
                    assert!(vm.stack.is_empty());
                    return (checked, value);
                }
                Err(err) => vm.unwind(&mut interp, err).unwrap(),
            }

            while let Some(call) = pending.last() {
                if vm.frames.len() != call.frames {
                    break;
                }
                assert_eq!(vm.stack.len(), call.expected, "stack height after call");
                pending.pop();
                checked += 1;
            }
        }
    }

    #[test]
    fn test_calls_leave_one_result() {
        let (checked, value) = run_checked(
            "function add(a, b) { return a + b; }
             function one() { return 1; }
             var r = add(one(), add(2, 3));
             add(r, r);
             r",
        );
        assert_eq!(checked, 4);
        assert_eq!(value, JsValue::Int(6));
    }

    #[test]
    fn test_return_from_inside_statements() {
        let (checked, value) = run_checked(
            "function inForIn(o) { for (var k in o) { for (var j in o) return k + j; } }
             function inSwitch(x) { while (true) { switch (x) { case 1: return 'one'; default: return 'other'; } } }
             function inFinally() { try { throw 1; } finally { return 'f'; } }
             function throughFinally() { var o = {a: 1}; for (var k in o) { try { return k; } finally { o.b = 2; } } }
             function inCatch() { try { null.x; } catch (e) { with ({v: 'c'}) { return v; } } }
             inForIn({a: 1}) + inSwitch(1) + inSwitch(2) + inFinally() + throughFinally() + inCatch()",
        );
        assert_eq!(checked, 6);
        assert_eq!(value, JsValue::from("aaoneotherfac"));
    }

    #[test]
    fn test_method_native_and_constructor_calls() {
        let (checked, value) = run_checked(
            "function P(x) { this.x = x; return 5; }
             function twice(x) { return x * 2; }
             var o = {m: function () { return this; }};
             o.m();
             var p = new P(4);
             var s = [1, 2].join('-');
             var t = twice.call(null, p.x) + twice.apply(null, [1]);
             s + t + (o.m() === o)",
        );
        assert_eq!(checked, 6);
        assert_eq!(value, JsValue::from("1-210true"));
    }
}
