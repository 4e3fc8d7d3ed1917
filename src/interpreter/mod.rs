//! Interpreter: the execution context of one engine instance
//!
//! Everything that has to survive between two calls into the engine lives
//! here: the heap, the global object, the builtin prototypes, the caller
//! context consulted by `eval`, collector scheduling and the site of the
//! failure currently being reported. Nothing is kept in statics, so several
//! engines can coexist on one thread.

pub mod builtins;
mod bytecode_vm;
pub mod function;
pub mod scope;

use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use serde::Deserialize;

pub use bytecode_vm::BytecodeVM;

use crate::compiler::{Bytecode, CodeKind, CompileOptions, LanguageMode, compile};
use crate::error::{ErrorCode, ErrorKind, ErrorReport, JsError};
use crate::gc::{GcStats, Heap};
use crate::object::{
    ArrayData, BooleanData, ClassId, DateData, FunctionData, JsObject, NativeFn, NativeFunction,
    NumberData, ObjectData, PropFlags, StringData, get_member, put_member,
};
use crate::string_dict::StringDict;
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue, array_index, to_int32};

/// Calls between two checks of the collector schedule
const GC_CALL_CHECK: u32 = 64;

/// Engine tuning knobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum wall-clock time between opportunistic collections
    pub gc_interval: Duration,
    /// Nesting limit for calls; exceeding it raises a RangeError
    pub max_call_depth: usize,
    /// Nesting limit for native code that calls back into script. Each
    /// level runs a nested VM on the native stack.
    pub max_native_depth: usize,
    /// Scoping of function declarations nested in blocks
    pub language_mode: LanguageMode,
    /// Cap on the collector's traversal stack, in chunks
    pub mark_stack_limit: Option<usize>,
    /// Local time as a fixed offset east of UTC, in minutes. `None` follows
    /// the host's time zone.
    pub utc_offset: Option<i32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gc_interval: Duration::from_millis(30),
            max_call_depth: 512,
            max_native_depth: 32,
            language_mode: LanguageMode::default(),
            mark_stack_limit: None,
            utc_offset: None,
        }
    }
}

/// The two builtins that only forward to another function
#[derive(Debug)]
pub struct Forwarders {
    pub call: JsObjectRef,
    pub apply: JsObjectRef,
}

/// Scope chain, variable object and `this` of the code that made a native
/// call. Direct `eval` runs in this context.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub scope: Option<JsObjectRef>,
    pub var_obj: JsObjectRef,
    pub this: JsValue,
}

/// One active call of a source function
#[derive(Debug)]
pub struct StackFrame {
    pub callee: JsObjectRef,
    pub var_obj: JsObjectRef,
    pub args: Vec<JsValue>,
    /// Arguments object handed out by `f.arguments` when the body has none
    pub arguments: Option<JsObjectRef>,
}

/// Where the failure being propagated was raised
#[derive(Debug, Clone)]
pub struct ErrorSite {
    pub code: Rc<Bytecode>,
    /// Instruction offset
    pub offset: u32,
}

/// Host callback for unhandled failures. Returning true marks the failure
/// handled.
pub type ErrorHandler = Box<dyn FnMut(&ErrorReport) -> bool>;

/// Hint for ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    Number,
    String,
}

/// The execution context
pub struct Interpreter {
    pub config: EngineConfig,

    /// Global object, the last link of every scope chain
    pub global: JsObjectRef,

    /// `this` of global code
    pub global_this: JsValue,

    pub object_prototype: JsObjectRef,
    pub function_prototype: JsObjectRef,
    pub array_prototype: JsObjectRef,
    pub string_prototype: JsObjectRef,
    pub number_prototype: JsObjectRef,
    pub boolean_prototype: JsObjectRef,
    pub date_prototype: JsObjectRef,
    pub regexp_prototype: JsObjectRef,
    pub weakmap_prototype: JsObjectRef,
    /// One prototype per `ErrorKind::ALL` entry
    pub error_prototypes: Vec<JsObjectRef>,

    pub string_dict: StringDict,

    /// Nesting of calls currently on the native stack
    pub call_depth: usize,

    /// Number of VMs currently running, outermost included
    pub vm_depth: usize,

    /// Function.prototype.call and apply, which run source targets in the
    /// calling VM
    pub forwarders: Option<Forwarders>,

    /// Active source-function calls, innermost last
    pub call_stack: Vec<StackFrame>,

    /// Context of the bytecode that made the current native call
    pub caller: Option<CallerContext>,

    pub error_site: Option<ErrorSite>,

    pub error_handler: Option<ErrorHandler>,

    last_gc: Instant,
    calls_since_gc: u32,

    /// Owns every object. Declared last so every handle above is released
    /// before the heap goes away.
    pub heap: Heap<JsObject>,
}

impl Interpreter {
    /// Create an interpreter with a fully populated global object
    pub fn new(config: EngineConfig) -> Self {
        let heap: Heap<JsObject> = Heap::new();
        heap.set_mark_stack_limit(config.mark_stack_limit);

        let object_prototype = heap.alloc(JsObject::new(ObjectData::plain(ClassId::Object), None));
        let with_proto =
            |data: ObjectData| heap.alloc(JsObject::new(data, Some(object_prototype.cheap_clone())));

        let function_prototype = with_proto(ObjectData::Function(FunctionData::Native(
            NativeFunction {
                name: JsString::from(""),
                func: builtins::function::function_prototype_call,
                construct: None,
                length: 0,
            },
        )));
        let array_prototype = with_proto(ObjectData::Array(ArrayData::default()));
        let string_prototype = with_proto(ObjectData::String(StringData {
            value: JsString::from(""),
        }));
        let number_prototype = with_proto(ObjectData::Number(NumberData(0.0)));
        let boolean_prototype = with_proto(ObjectData::Boolean(BooleanData(false)));
        let date_prototype = with_proto(ObjectData::Date(DateData(0.0)));
        let regexp_prototype = with_proto(ObjectData::plain(ClassId::Object));
        let weakmap_prototype = with_proto(ObjectData::plain(ClassId::Object));
        let global = with_proto(ObjectData::plain(ClassId::Global));

        let error_prototype = with_proto(ObjectData::plain(ClassId::Error));
        let error_prototypes = ErrorKind::ALL
            .iter()
            .map(|kind| match kind {
                ErrorKind::Error => error_prototype.cheap_clone(),
                _ => heap.alloc(JsObject::new(
                    ObjectData::plain(ClassId::Error),
                    Some(error_prototype.cheap_clone()),
                )),
            })
            .collect();

        let mut interp = Self {
            config,
            global_this: JsValue::Object(global.cheap_clone()),
            global,
            object_prototype,
            function_prototype,
            array_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            date_prototype,
            regexp_prototype,
            weakmap_prototype,
            error_prototypes,
            string_dict: StringDict::with_common_strings(),
            call_depth: 0,
            vm_depth: 0,
            forwarders: None,
            call_stack: Vec::new(),
            caller: None,
            error_site: None,
            error_handler: None,
            last_gc: Instant::now(),
            calls_since_gc: 0,
            heap,
        };
        builtins::init_realm(&mut interp);
        interp
    }

    /// Intern a string through the shared dictionary
    pub fn intern(&mut self, s: &str) -> JsString {
        self.string_dict.get_or_insert(s)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Object creation
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn alloc(&self, data: ObjectData, prototype: Option<JsObjectRef>) -> JsObjectRef {
        self.heap.alloc(JsObject::new(data, prototype))
    }

    /// Create a plain object inheriting from Object.prototype
    pub fn create_object(&self) -> JsObjectRef {
        self.alloc(
            ObjectData::plain(ClassId::Object),
            Some(self.object_prototype.cheap_clone()),
        )
    }

    /// Create an array holding `elements`
    pub fn create_array(&self, elements: Vec<JsValue>) -> JsObjectRef {
        let arr = self.alloc(
            ObjectData::Array(ArrayData {
                length: elements.len() as u32,
            }),
            Some(self.array_prototype.cheap_clone()),
        );
        {
            let mut a = arr.borrow_mut();
            for (i, value) in elements.into_iter().enumerate() {
                a.set_own(JsString::from(i.to_string()), value, PropFlags::ALL);
            }
        }
        arr
    }

    pub fn create_native_function(&mut self, name: &str, func: NativeFn, length: u32) -> JsObjectRef {
        let name = self.intern(name);
        self.alloc(
            ObjectData::Function(FunctionData::Native(NativeFunction {
                name,
                func,
                construct: None,
                length,
            })),
            Some(self.function_prototype.cheap_clone()),
        )
    }

    /// Create a constructor wired to `prototype` in both directions
    pub fn create_constructor(
        &mut self,
        name: &str,
        func: NativeFn,
        construct: NativeFn,
        length: u32,
        prototype: &JsObjectRef,
    ) -> JsObjectRef {
        let name = self.intern(name);
        let ctor = self.alloc(
            ObjectData::Function(FunctionData::Native(NativeFunction {
                name,
                func,
                construct: Some(construct),
                length,
            })),
            Some(self.function_prototype.cheap_clone()),
        );
        let prototype_key = self.intern("prototype");
        let constructor_key = self.intern("constructor");
        ctor.borrow_mut().set_own(
            prototype_key,
            JsValue::Object(prototype.cheap_clone()),
            PropFlags::NONE,
        );
        prototype.borrow_mut().set_own(
            constructor_key,
            JsValue::Object(ctor.cheap_clone()),
            PropFlags::HIDDEN,
        );
        ctor
    }

    /// Register a native method on an object
    pub fn register_method(&mut self, obj: &JsObjectRef, name: &str, func: NativeFn, length: u32) {
        let f = self.create_native_function(name, func, length);
        let key = self.intern(name);
        obj.borrow_mut().set_own(key, JsValue::Object(f), PropFlags::HIDDEN);
    }

    /// Define a non-enumerable global binding
    pub fn define_global(&mut self, name: &str, value: JsValue) {
        let key = self.intern(name);
        self.global.borrow_mut().set_own(key, value, PropFlags::HIDDEN);
    }

    pub fn error_prototype(&self, kind: ErrorKind) -> JsObjectRef {
        ErrorKind::ALL
            .iter()
            .position(|k| *k == kind)
            .and_then(|i| self.error_prototypes.get(i))
            .unwrap_or(&self.object_prototype)
            .cheap_clone()
    }

    /// Create an Error object of `kind`
    pub fn create_error(&mut self, kind: ErrorKind, code: Option<ErrorCode>, message: &str) -> JsObjectRef {
        let obj = self.alloc(ObjectData::plain(ClassId::Error), Some(self.error_prototype(kind)));
        let message_key = self.intern("message");
        let description_key = self.intern("description");
        let number_key = self.intern("number");
        {
            let mut o = obj.borrow_mut();
            o.set_own(message_key, JsValue::from(message), PropFlags::HIDDEN);
            o.set_own(description_key, JsValue::from(message), PropFlags::HIDDEN);
            if let Some(code) = code {
                o.set_own(number_key, JsValue::Int(code.number()), PropFlags::HIDDEN);
            }
        }
        obj
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Exceptions
    // ═══════════════════════════════════════════════════════════════════════════

    /// The script-visible value of a catchable failure
    pub fn error_to_value(&mut self, error: &JsError) -> JsValue {
        match error {
            JsError::Thrown { value, .. } => value.clone(),
            JsError::Runtime { kind, code, message } => {
                JsValue::Object(self.create_error(*kind, Some(*code), message))
            }
            JsError::Syntax { code, message, .. } => {
                JsValue::Object(self.create_error(ErrorKind::Syntax, Some(*code), message))
            }
            JsError::Host { message } => JsValue::Object(self.create_error(ErrorKind::Error, None, message)),
            JsError::OutOfMemory | JsError::AlreadyReported | JsError::Internal(_) => JsValue::Undefined,
        }
    }

    /// Wrap a thrown value
    pub fn throw_value(&self, value: JsValue) -> JsError {
        let message = describe_exception(&value);
        JsError::Thrown { value, message }
    }

    /// Remember where the failure now propagating was raised
    pub fn note_error_site(&mut self, code: &Rc<Bytecode>, offset: u32) {
        if self.error_site.is_none() {
            self.error_site = Some(ErrorSite {
                code: code.cheap_clone(),
                offset,
            });
        }
    }

    /// Offer an unhandled failure to the host error handler.
    ///
    /// Returns `AlreadyReported` when the host marks it handled, the original
    /// failure otherwise.
    pub fn report_error(&mut self, error: JsError, source: Option<(&str, &str)>) -> JsError {
        let site = self.error_site.take();
        if matches!(error, JsError::AlreadyReported) {
            return error;
        }
        let Some(handler) = self.error_handler.as_mut() else {
            return error;
        };

        let mut report = ErrorReport {
            code: error.code().number(),
            message: error.to_string(),
            source_line: None,
            line: 0,
            column: 0,
            unit: String::new(),
            offset: None,
        };
        match (&error, &site) {
            (JsError::Syntax { message, location, .. }, _) => {
                report.message = message.clone();
                report.line = location.line;
                report.column = location.column;
                if let Some((unit, text)) = source {
                    report.unit = unit.to_string();
                    report.source_line = text
                        .lines()
                        .nth((location.line as usize).saturating_sub(1))
                        .map(str::to_string);
                }
            }
            (_, Some(site)) => {
                let byte_offset = site.code.get(site.offset as usize).map_or(0, |i| i.loc);
                let location = site.code.location(byte_offset);
                report.line = location.line;
                report.column = location.column;
                report.unit = site.code.name.clone();
                report.source_line = site.code.source_line(location.line).map(str::to_string);
                report.offset = Some(site.offset);
            }
            _ => {}
        }
        if let JsError::Runtime { message, .. } | JsError::Thrown { message, .. } = &error {
            report.message = message.clone();
        }

        debug!("reporting unhandled error: {}", report.message);
        if handler(&report) {
            JsError::AlreadyReported
        } else {
            error
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Running code
    // ═══════════════════════════════════════════════════════════════════════════

    /// Compile `source` with this engine's language mode
    pub fn compile(&mut self, source: &str, mut options: CompileOptions) -> Result<Rc<Bytecode>, JsError> {
        options.mode = self.config.language_mode;
        compile(source, &options, &mut self.string_dict)
    }

    /// Run a compiled unit as global code
    pub fn execute(&mut self, code: &Rc<Bytecode>) -> Result<JsValue, JsError> {
        self.maybe_collect();
        let var_obj = self.global.cheap_clone();
        let this = self.global_this.clone();
        let result = self.run_unit(code, None, var_obj, this);
        if result.is_ok() {
            self.error_site = None;
        }
        result
    }

    /// Run global or eval code against an explicit context
    pub fn run_unit(
        &mut self,
        code: &Rc<Bytecode>,
        scope: Option<JsObjectRef>,
        var_obj: JsObjectRef,
        this: JsValue,
    ) -> Result<JsValue, JsError> {
        let top = code
            .top_level()
            .ok_or_else(|| JsError::internal_error("unit has no top-level code"))?;
        function::declare_unit_names(top, &var_obj, top.kind == CodeKind::Eval)?;
        BytecodeVM::execute(self, code, scope, var_obj, this)
    }

    /// Compile and run `source` as eval code in `context`, or in the global
    /// context when there is none
    pub fn eval_in(&mut self, source: &str, context: Option<CallerContext>) -> Result<JsValue, JsError> {
        let code = match self.compile(source, CompileOptions::eval("eval code")) {
            Ok(code) => code,
            Err(JsError::Syntax { code, message, .. }) => {
                return Err(JsError::runtime(ErrorKind::Syntax, code, message));
            }
            Err(err) => return Err(err),
        };
        match context {
            Some(ctx) => self.run_unit(&code, ctx.scope, ctx.var_obj, ctx.this),
            None => {
                let global = self.global.cheap_clone();
                let this = self.global_this.clone();
                self.run_unit(&code, None, global, this)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════════

    /// Function object and data behind a callable value
    pub fn function_data(&self, value: &JsValue) -> Result<(JsObjectRef, FunctionData), JsError> {
        let JsValue::Object(obj) = value else {
            return Err(JsError::function_expected());
        };
        let data = obj.borrow().as_function().cloned();
        match data {
            Some(data) => Ok((obj.cheap_clone(), data)),
            None => Err(JsError::function_expected()),
        }
    }

    /// Call a function value from native code
    pub fn call_function(&mut self, callee: &JsValue, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        let (obj, data) = self.function_data(callee)?;
        match data {
            FunctionData::Native(native) => {
                // Only calls made directly by bytecode see the caller context
                let saved = self.caller.take();
                let result = self.call_native(&native, this, args);
                self.caller = saved;
                result
            }
            FunctionData::Source(source) => BytecodeVM::call(self, &obj, &source, this, args, None),
        }
    }

    /// `new callee(...args)` from native code
    pub fn construct(&mut self, callee: &JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        let (obj, data) = self.function_data(callee)?;
        match data {
            FunctionData::Native(native) => {
                let saved = self.caller.take();
                let result = self.construct_native(&native, args);
                self.caller = saved;
                result
            }
            FunctionData::Source(source) => {
                let instance = self.instance_for(&obj)?;
                BytecodeVM::call(
                    self,
                    &obj,
                    &source,
                    JsValue::Object(instance.cheap_clone()),
                    args,
                    Some(instance),
                )
            }
        }
    }

    /// Fresh object inheriting from `ctor.prototype`
    pub fn instance_for(&mut self, ctor: &JsObjectRef) -> Result<JsObjectRef, JsError> {
        let proto = match get_member(self, ctor, "prototype")? {
            JsValue::Object(proto) => proto,
            _ => self.object_prototype.cheap_clone(),
        };
        Ok(self.alloc(ObjectData::plain(ClassId::Object), Some(proto)))
    }

    pub fn call_native(&mut self, native: &NativeFunction, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        self.enter_call()?;
        trace!("native call {}", native.name);
        let result = (native.func)(self, this, args);
        self.call_depth = self.call_depth.saturating_sub(1);
        result
    }

    pub fn construct_native(&mut self, native: &NativeFunction, args: &[JsValue]) -> Result<JsValue, JsError> {
        let Some(construct) = native.construct else {
            return Err(JsError::type_error(
                ErrorCode::UNSUPPORTED_ACTION,
                format!("'{}' is not a constructor", native.name),
            ));
        };
        self.enter_call()?;
        let result = construct(self, JsValue::Undefined, args);
        self.call_depth = self.call_depth.saturating_sub(1);
        result
    }

    /// Account for one more nested call
    pub fn enter_call(&mut self) -> Result<(), JsError> {
        if self.call_depth >= self.config.max_call_depth {
            return Err(JsError::range_error(ErrorCode::STACK_OVERFLOW, "Out of stack space"));
        }
        self.call_depth += 1;
        Ok(())
    }

    /// Account for one more running VM
    pub fn enter_vm(&mut self) -> Result<(), JsError> {
        // The outermost VM is not a re-entry
        if self.vm_depth > self.config.max_native_depth {
            return Err(JsError::range_error(ErrorCode::STACK_OVERFLOW, "Out of stack space"));
        }
        self.vm_depth += 1;
        Ok(())
    }

    pub fn leave_vm(&mut self) {
        self.vm_depth = self.vm_depth.saturating_sub(1);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Garbage collection
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run the collector now
    pub fn collect_garbage(&mut self) -> Result<usize, JsError> {
        self.last_gc = Instant::now();
        self.calls_since_gc = 0;
        let collected = self.heap.collect()?;
        debug!(
            "gc: collected {} objects, {} live",
            collected,
            self.heap.stats().live_objects
        );
        Ok(collected)
    }

    /// Collect if the configured interval has elapsed since the last run
    pub fn maybe_collect(&mut self) {
        if self.last_gc.elapsed() < self.config.gc_interval {
            return;
        }
        if let Err(err) = self.collect_garbage() {
            warn!("opportunistic collection failed: {}", err);
        }
    }

    /// Called on every source-function call
    pub(crate) fn note_call(&mut self) {
        self.calls_since_gc += 1;
        if self.calls_since_gc >= GC_CALL_CHECK {
            self.calls_since_gc = 0;
            self.maybe_collect();
        }
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Conversions
    // ═══════════════════════════════════════════════════════════════════════════

    /// ToPrimitive: objects are asked for `valueOf`/`toString` in hint order
    pub fn to_primitive(&mut self, value: &JsValue, hint: PreferredType) -> Result<JsValue, JsError> {
        let JsValue::Object(obj) = value else {
            return Ok(value.clone());
        };
        let host = obj.borrow().as_host();
        if let Some(host) = host
            && let Some(text) = host.to_display_string()
        {
            return Ok(JsValue::from(text));
        }
        // Dates convert like strings unless a number is asked for
        let hint = match hint {
            PreferredType::Default if obj.borrow().class() == ClassId::Date => PreferredType::String,
            hint => hint,
        };
        let order = match hint {
            PreferredType::String => ["toString", "valueOf"],
            PreferredType::Default | PreferredType::Number => ["valueOf", "toString"],
        };
        for name in order {
            let method = get_member(self, obj, name)?;
            if method.is_callable() {
                let result = self.call_function(&method, value.clone(), &[])?;
                if !matches!(result, JsValue::Object(_)) {
                    return Ok(result);
                }
            }
        }
        Err(JsError::type_error(
            ErrorCode::UNSUPPORTED_ACTION,
            "Object doesn't support this action",
        ))
    }

    pub fn to_number(&mut self, value: &JsValue) -> Result<f64, JsError> {
        match value {
            JsValue::Object(_) => Ok(self.to_primitive(value, PreferredType::Number)?.to_number()),
            _ => Ok(value.to_number()),
        }
    }

    pub fn to_int32(&mut self, value: &JsValue) -> Result<i32, JsError> {
        match value {
            JsValue::Int(i) => Ok(*i),
            _ => Ok(to_int32(self.to_number(value)?)),
        }
    }

    pub fn to_string(&mut self, value: &JsValue) -> Result<JsString, JsError> {
        match value {
            JsValue::Object(_) => Ok(self.to_primitive(value, PreferredType::String)?.to_js_string()),
            _ => Ok(value.to_js_string()),
        }
    }

    /// Property name for a computed member access
    pub fn to_property_key(&mut self, value: &JsValue) -> Result<JsString, JsError> {
        match value {
            JsValue::String(s) => Ok(s.cheap_clone()),
            JsValue::Int(i) if *i >= 0 && *i < 16 => Ok(self.intern(&i.to_string())),
            _ => self.to_string(value),
        }
    }

    /// ToObject; primitives are wrapped
    pub fn to_object(&mut self, value: &JsValue) -> Result<JsObjectRef, JsError> {
        let (data, proto) = match value {
            JsValue::Object(obj) => return Ok(obj.cheap_clone()),
            JsValue::Undefined | JsValue::Null => return Err(JsError::object_expected()),
            JsValue::Boolean(b) => (ObjectData::Boolean(BooleanData(*b)), &self.boolean_prototype),
            JsValue::Int(_) | JsValue::Number(_) => (
                ObjectData::Number(NumberData(value.to_number())),
                &self.number_prototype,
            ),
            JsValue::String(s) => (
                ObjectData::String(StringData { value: s.cheap_clone() }),
                &self.string_prototype,
            ),
        };
        Ok(self.alloc(data, Some(proto.cheap_clone())))
    }

    /// `base[name]` for any base value
    pub fn get_property(&mut self, base: &JsValue, name: &str) -> Result<JsValue, JsError> {
        let proto = match base {
            JsValue::Object(obj) => return get_member(self, obj, name),
            JsValue::String(s) => {
                if name == "length" {
                    return Ok(JsValue::Int(s.len() as i32));
                }
                if let Some(index) = array_index(name)
                    && let Some(unit) = s.char_code_at(index as usize)
                {
                    return Ok(JsValue::from(String::from_utf16_lossy(&[unit])));
                }
                self.string_prototype.cheap_clone()
            }
            JsValue::Int(_) | JsValue::Number(_) => self.number_prototype.cheap_clone(),
            JsValue::Boolean(_) => self.boolean_prototype.cheap_clone(),
            JsValue::Undefined | JsValue::Null => {
                return Err(JsError::type_error(
                    ErrorCode::OBJECT_EXPECTED,
                    format!(
                        "Unable to get property '{}' of undefined or null reference",
                        name
                    ),
                ));
            }
        };
        get_member(self, &proto, name)
    }

    /// `base[name] = value`; stores on primitives are dropped
    pub fn put_property(&mut self, base: &JsValue, name: &JsString, value: JsValue) -> Result<(), JsError> {
        match base {
            JsValue::Object(obj) => put_member(self, obj, name, value),
            JsValue::Undefined | JsValue::Null => Err(JsError::type_error(
                ErrorCode::OBJECT_EXPECTED,
                format!(
                    "Unable to set property '{}' of undefined or null reference",
                    name
                ),
            )),
            _ => Ok(()),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════════════

    /// The `+` operator
    pub fn add(&mut self, left: &JsValue, right: &JsValue) -> Result<JsValue, JsError> {
        if let (JsValue::Int(a), JsValue::Int(b)) = (left, right) {
            return Ok(match a.checked_add(*b) {
                Some(sum) => JsValue::Int(sum),
                None => JsValue::Number(f64::from(*a) + f64::from(*b)),
            });
        }
        let left = self.to_primitive(left, PreferredType::Default)?;
        let right = self.to_primitive(right, PreferredType::Default)?;
        match (&left, &right) {
            (JsValue::String(a), _) => Ok(JsValue::String(a.cheap_clone() + right.to_js_string().as_str())),
            (_, JsValue::String(b)) => Ok(JsValue::String(left.to_js_string() + b.as_str())),
            _ => Ok(JsValue::number(left.to_number() + right.to_number())),
        }
    }

    /// Abstract equality (`==`)
    pub fn loose_equals(&mut self, left: &JsValue, right: &JsValue) -> Result<bool, JsError> {
        use JsValue::*;
        Ok(match (left, right) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (Object(_), Object(_)) => left.strict_equals(right),
            (Boolean(_), _) => {
                let left = JsValue::number(left.to_number());
                return self.loose_equals(&left, right);
            }
            (_, Boolean(_)) => {
                let right = JsValue::number(right.to_number());
                return self.loose_equals(left, &right);
            }
            (Object(_), _) => {
                let left = self.to_primitive(left, PreferredType::Default)?;
                return self.loose_equals(&left, right);
            }
            (_, Object(_)) => {
                let right = self.to_primitive(right, PreferredType::Default)?;
                return self.loose_equals(left, &right);
            }
            (String(a), String(b)) => a == b,
            _ => left.to_number() == right.to_number(),
        })
    }

    /// `left < right` after converting both operands in order; `None` when a
    /// NaN is involved
    pub fn less_than(&mut self, left: &JsValue, right: &JsValue, left_first: bool) -> Result<Option<bool>, JsError> {
        let (left, right) = if left_first {
            let l = self.to_primitive(left, PreferredType::Number)?;
            let r = self.to_primitive(right, PreferredType::Number)?;
            (l, r)
        } else {
            let r = self.to_primitive(right, PreferredType::Number)?;
            let l = self.to_primitive(left, PreferredType::Number)?;
            (l, r)
        };
        if let (JsValue::String(a), JsValue::String(b)) = (&left, &right) {
            return Ok(Some(a.to_utf16() < b.to_utf16()));
        }
        let (a, b) = (left.to_number(), right.to_number());
        if a.is_nan() || b.is_nan() {
            return Ok(None);
        }
        Ok(Some(a < b))
    }

    /// `value instanceof ctor`
    pub fn instance_of(&mut self, value: &JsValue, ctor: &JsValue) -> Result<bool, JsError> {
        let JsValue::Object(ctor_obj) = ctor else {
            return Err(JsError::function_expected());
        };
        if !ctor.is_callable() {
            return Err(JsError::function_expected());
        }
        let JsValue::Object(obj) = value else {
            return Ok(false);
        };
        let JsValue::Object(proto) = get_member(self, ctor_obj, "prototype")? else {
            return Err(JsError::type_error(
                ErrorCode::INVALID_PROTOTYPE,
                "'prototype' is null or not an object",
            ));
        };
        let mut current = obj.borrow().prototype.clone();
        while let Some(p) = current {
            if p == proto {
                return Ok(true);
            }
            current = p.borrow().prototype.clone();
        }
        Ok(false)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Text describing a thrown value, used in reports and `Display`
pub fn describe_exception(value: &JsValue) -> String {
    let JsValue::Object(obj) = value else {
        return value.to_js_string().to_string();
    };
    let Some(o) = obj.try_borrow() else {
        return "[object]".to_string();
    };
    if o.class() != ClassId::Error {
        return format!("[object {}]", o.class_name());
    }
    let message = o.own_value("message").map(|m| m.to_js_string().to_string());
    let mut name = None;
    let mut current = o.prototype.clone();
    drop(o);
    while let Some(p) = current {
        let Some(pb) = p.try_borrow() else {
            break;
        };
        if let Some(n) = pb.own_value("name") {
            name = Some(n.to_js_string().to_string());
            break;
        }
        current = pb.prototype.clone();
    }
    match (name, message) {
        (Some(name), Some(message)) if !message.is_empty() => format!("{}: {}", name, message),
        (Some(name), _) => name,
        (None, Some(message)) => message,
        (None, None) => "Error".to_string(),
    }
}
