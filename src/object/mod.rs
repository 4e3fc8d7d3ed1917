//! Dispatch objects: the engine's dynamically extensible property bags.
//!
//! An object is a property table, a prototype link, an extensible flag and a
//! class. Class-specific behavior (builtin members, indexed elements, extra
//! links for the collector) is reached through [`ClassOps`], implemented once
//! per class data type and selected by [`ObjectData`].

mod property;
mod table;

pub use property::*;
pub use table::{CaseMode, PropFlags, PropId, PropertyTable, Slot, SlotKind, string_hash};

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::compiler::Bytecode;
use crate::error::JsError;
use crate::gc::{GcPtr, Reset, Traceable, WeakGc};
use crate::host::HostObject;
use crate::interpreter::Interpreter;
use crate::value::{JsObjectRef, JsString, JsValue};

/// Class identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassId {
    Object,
    Global,
    /// Function or block variable container
    Variables,
    Function,
    Array,
    Arguments,
    Error,
    Boolean,
    Number,
    String,
    Date,
    RegExp,
    Math,
    Json,
    WeakMap,
    /// Scope-chain link
    Scope,
    Host,
}

impl ClassId {
    /// Name used by `Object.prototype.toString`
    pub fn name(self) -> &'static str {
        match self {
            ClassId::Object | ClassId::Variables | ClassId::Scope => "Object",
            ClassId::Global => "global",
            ClassId::Function => "Function",
            ClassId::Array => "Array",
            ClassId::Arguments => "Arguments",
            ClassId::Error => "Error",
            ClassId::Boolean => "Boolean",
            ClassId::Number => "Number",
            ClassId::String => "String",
            ClassId::Date => "Date",
            ClassId::RegExp => "RegExp",
            ClassId::Math => "Math",
            ClassId::Json => "JSON",
            ClassId::WeakMap => "WeakMap",
            ClassId::Host => "Object",
        }
    }
}

/// Getter of a builtin-table property. Receives the object holding the slot.
pub type BuiltinGetter = fn(&mut Interpreter, &JsObjectRef) -> Result<JsValue, JsError>;

/// Setter of a builtin-table property
pub type BuiltinSetter = fn(&mut Interpreter, &JsObjectRef, JsValue) -> Result<(), JsError>;

/// Class-level property backed by functions instead of storage
pub struct BuiltinProp {
    pub name: &'static str,
    pub flags: PropFlags,
    pub get: BuiltinGetter,
    pub set: Option<BuiltinSetter>,
}

/// Optional per-class behavior
pub trait ClassOps {
    fn class(&self) -> ClassId;

    /// Properties materialized lazily from a class table
    fn builtin_props(&self) -> &'static [BuiltinProp] {
        &[]
    }

    /// Number of indexed elements exposed as `Indexed` slots
    fn indexed_len(&self) -> u32 {
        0
    }

    fn indexed_get(&self, _index: u32) -> Option<JsValue> {
        None
    }

    /// Attributes given to materialized indexed slots
    fn indexed_flags(&self) -> PropFlags {
        PropFlags::ALL
    }

    /// Store through an indexed slot; false when the element is read-only
    fn indexed_put(&mut self, _index: u32, _value: JsValue) -> bool {
        false
    }

    /// Called after a property named `name` was created or assigned
    fn on_put(&mut self, _name: &JsString) {}

    /// Report links held by class data
    fn trace(&self, _visitor: &mut dyn FnMut(GcPtr<JsObject>)) {}

    /// Drop links held by class data
    fn unlink(&mut self) {}
}

/// Classes without data of their own
#[derive(Debug, Clone, Copy)]
pub struct PlainData(pub ClassId);

impl ClassOps for PlainData {
    fn class(&self) -> ClassId {
        self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Functions
// ═══════════════════════════════════════════════════════════════════════════

/// Native function signature: (interpreter, this, arguments)
pub type NativeFn = fn(&mut Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub func: NativeFn,
    /// Behavior under `new`; functions without one are not constructors
    pub construct: Option<NativeFn>,
    pub length: u32,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("length", &self.length)
            .finish()
    }
}

/// A function compiled from source
#[derive(Debug, Clone)]
pub struct SourceFunction {
    pub code: Rc<Bytecode>,
    /// Index into `code.functions`
    pub func_id: usize,
    /// Captured scope chain (a `Scope` object), none at global level
    pub scope: Option<JsObjectRef>,
}

#[derive(Debug, Clone)]
pub enum FunctionData {
    Native(NativeFunction),
    Source(SourceFunction),
}

impl FunctionData {
    pub fn name(&self) -> Option<JsString> {
        match self {
            FunctionData::Native(f) => Some(f.name.clone()),
            FunctionData::Source(f) => f.code.function(f.func_id).and_then(|c| c.name.clone()),
        }
    }

    pub fn length(&self) -> u32 {
        match self {
            FunctionData::Native(f) => f.length,
            FunctionData::Source(f) => f
                .code
                .function(f.func_id)
                .map(|c| c.params.len() as u32)
                .unwrap_or(0),
        }
    }
}

impl ClassOps for FunctionData {
    fn class(&self) -> ClassId {
        ClassId::Function
    }

    fn builtin_props(&self) -> &'static [BuiltinProp] {
        crate::interpreter::builtins::function::FUNCTION_PROPS
    }

    fn trace(&self, visitor: &mut dyn FnMut(GcPtr<JsObject>)) {
        if let FunctionData::Source(f) = self
            && let Some(scope) = &f.scope
        {
            visitor(scope.copy_ref());
        }
    }

    fn unlink(&mut self) {
        if let FunctionData::Source(f) = self {
            f.scope = None;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Arrays, arguments, strings
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ArrayData {
    pub length: u32,
}

impl ClassOps for ArrayData {
    fn class(&self) -> ClassId {
        ClassId::Array
    }

    fn builtin_props(&self) -> &'static [BuiltinProp] {
        crate::interpreter::builtins::array::ARRAY_PROPS
    }

    fn on_put(&mut self, name: &JsString) {
        if let Some(index) = name.as_array_index()
            && index >= self.length
        {
            self.length = index + 1;
        }
    }
}

/// The `arguments` pseudo-array of one call
#[derive(Debug, Clone, Default)]
pub struct ArgumentsData {
    /// Variable container of the call; mapped elements alias its slots
    pub var_obj: Option<JsObjectRef>,
    pub values: Vec<JsValue>,
    /// Parameter slot in `var_obj` for each mapped argument
    pub mapped: Vec<Option<PropId>>,
}

impl ArgumentsData {
    fn mapped_slot(&self, index: u32) -> Option<(&JsObjectRef, PropId)> {
        let var_obj = self.var_obj.as_ref()?;
        let id = self.mapped.get(index as usize).copied().flatten()?;
        Some((var_obj, id))
    }
}

impl ClassOps for ArgumentsData {
    fn class(&self) -> ClassId {
        ClassId::Arguments
    }

    fn indexed_len(&self) -> u32 {
        self.values.len() as u32
    }

    fn indexed_get(&self, index: u32) -> Option<JsValue> {
        if let Some((var_obj, id)) = self.mapped_slot(index) {
            let vars = var_obj.try_borrow()?;
            if let Some(SlotKind::Value(v)) = vars.props.kind(id) {
                return Some(v.clone());
            }
        }
        self.values.get(index as usize).cloned()
    }

    fn indexed_put(&mut self, index: u32, value: JsValue) -> bool {
        if let Some((var_obj, id)) = self.mapped_slot(index)
            && let Some(mut vars) = var_obj.try_borrow_mut()
            && let Some(slot) = vars.props.slot_mut(id)
            && matches!(slot.kind, SlotKind::Value(_))
        {
            slot.kind = SlotKind::Value(value);
            return true;
        }
        match self.values.get_mut(index as usize) {
            Some(v) => {
                *v = value;
                true
            }
            None => false,
        }
    }

    fn trace(&self, visitor: &mut dyn FnMut(GcPtr<JsObject>)) {
        if let Some(var_obj) = &self.var_obj {
            visitor(var_obj.copy_ref());
        }
        for v in &self.values {
            if let JsValue::Object(obj) = v {
                visitor(obj.copy_ref());
            }
        }
    }

    fn unlink(&mut self) {
        self.var_obj = None;
        self.values.clear();
        self.mapped.clear();
    }
}

/// String wrapper object
#[derive(Debug, Clone)]
pub struct StringData {
    pub value: JsString,
}

impl ClassOps for StringData {
    fn class(&self) -> ClassId {
        ClassId::String
    }

    fn builtin_props(&self) -> &'static [BuiltinProp] {
        crate::interpreter::builtins::string::STRING_PROPS
    }

    fn indexed_len(&self) -> u32 {
        self.value.len() as u32
    }

    fn indexed_flags(&self) -> PropFlags {
        PropFlags::ENUMERABLE
    }

    fn indexed_get(&self, index: u32) -> Option<JsValue> {
        let unit = self.value.char_code_at(index as usize)?;
        Some(JsValue::String(JsString::from(String::from_utf16_lossy(&[unit]))))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanData(pub bool);

impl ClassOps for BooleanData {
    fn class(&self) -> ClassId {
        ClassId::Boolean
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NumberData(pub f64);

impl ClassOps for NumberData {
    fn class(&self) -> ClassId {
        ClassId::Number
    }
}

/// Time value in milliseconds since the epoch, UTC; NaN when invalid
#[derive(Debug, Clone, Copy)]
pub struct DateData(pub f64);

impl ClassOps for DateData {
    fn class(&self) -> ClassId {
        ClassId::Date
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RegExp
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegExpFlags {
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
}

impl RegExpFlags {
    pub fn parse(flags: &str) -> Option<RegExpFlags> {
        let mut result = RegExpFlags::default();
        for c in flags.chars() {
            let flag = match c {
                'g' => &mut result.global,
                'i' => &mut result.ignore_case,
                'm' => &mut result.multiline,
                _ => return None,
            };
            if *flag {
                return None;
            }
            *flag = true;
        }
        Some(result)
    }
}

impl fmt::Display for RegExpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.global {
            write!(f, "g")?;
        }
        if self.ignore_case {
            write!(f, "i")?;
        }
        if self.multiline {
            write!(f, "m")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RegExpData {
    pub source: JsString,
    pub flags: RegExpFlags,
    #[cfg(feature = "regex")]
    pub compiled: Rc<fancy_regex::Regex>,
}

impl ClassOps for RegExpData {
    fn class(&self) -> ClassId {
        ClassId::RegExp
    }

    fn builtin_props(&self) -> &'static [BuiltinProp] {
        crate::interpreter::builtins::regexp::REGEXP_PROPS
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// WeakMap
// ═══════════════════════════════════════════════════════════════════════════

/// Entries keyed by object identity; keys are held weakly
#[derive(Debug, Clone, Default)]
pub struct WeakMapData {
    entries: FxHashMap<usize, (WeakGc<JsObject>, JsValue)>,
}

impl WeakMapData {
    pub fn get(&self, key: &JsObjectRef) -> Option<&JsValue> {
        self.entries
            .get(&key.id())
            .filter(|(k, _)| k.refers_to(key))
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, key: &JsObjectRef, value: JsValue) {
        self.entries.insert(key.id(), (key.downgrade(), value));
    }

    pub fn remove(&mut self, key: &JsObjectRef) -> bool {
        if self.get(key).is_none() {
            return false;
        }
        self.entries.remove(&key.id()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.values().filter(|(k, _)| k.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn prune(&mut self) {
        self.entries.retain(|_, (k, _)| k.is_alive());
    }
}

impl ClassOps for WeakMapData {
    fn class(&self) -> ClassId {
        ClassId::WeakMap
    }

    fn unlink(&mut self) {
        self.entries.clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Scope links and host objects
// ═══════════════════════════════════════════════════════════════════════════

/// One link of a scope chain
#[derive(Debug, Clone)]
pub struct ScopeData {
    /// Variable container consulted for this link
    pub object: JsObjectRef,
    pub next: Option<JsObjectRef>,
}

impl ClassOps for ScopeData {
    fn class(&self) -> ClassId {
        ClassId::Scope
    }

    fn trace(&self, visitor: &mut dyn FnMut(GcPtr<JsObject>)) {
        visitor(self.object.copy_ref());
        if let Some(next) = &self.next {
            visitor(next.copy_ref());
        }
    }
}

#[derive(Clone)]
pub struct HostData {
    pub host: Rc<dyn HostObject>,
}

impl fmt::Debug for HostData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostData").finish_non_exhaustive()
    }
}

impl ClassOps for HostData {
    fn class(&self) -> ClassId {
        ClassId::Host
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ObjectData / JsObject
// ═══════════════════════════════════════════════════════════════════════════

/// Class identity plus per-class data
#[derive(Debug, Clone)]
pub enum ObjectData {
    Plain(PlainData),
    Function(FunctionData),
    Array(ArrayData),
    Arguments(ArgumentsData),
    String(StringData),
    Boolean(BooleanData),
    Number(NumberData),
    Date(DateData),
    RegExp(RegExpData),
    WeakMap(WeakMapData),
    Scope(ScopeData),
    Host(HostData),
}

impl ObjectData {
    pub fn plain(class: ClassId) -> Self {
        ObjectData::Plain(PlainData(class))
    }

    pub fn ops(&self) -> &dyn ClassOps {
        match self {
            ObjectData::Plain(d) => d,
            ObjectData::Function(d) => d,
            ObjectData::Array(d) => d,
            ObjectData::Arguments(d) => d,
            ObjectData::String(d) => d,
            ObjectData::Boolean(d) => d,
            ObjectData::Number(d) => d,
            ObjectData::Date(d) => d,
            ObjectData::RegExp(d) => d,
            ObjectData::WeakMap(d) => d,
            ObjectData::Scope(d) => d,
            ObjectData::Host(d) => d,
        }
    }

    pub fn ops_mut(&mut self) -> &mut dyn ClassOps {
        match self {
            ObjectData::Plain(d) => d,
            ObjectData::Function(d) => d,
            ObjectData::Array(d) => d,
            ObjectData::Arguments(d) => d,
            ObjectData::String(d) => d,
            ObjectData::Boolean(d) => d,
            ObjectData::Number(d) => d,
            ObjectData::Date(d) => d,
            ObjectData::RegExp(d) => d,
            ObjectData::WeakMap(d) => d,
            ObjectData::Scope(d) => d,
            ObjectData::Host(d) => d,
        }
    }
}

/// The fundamental dynamically extensible object
#[derive(Debug)]
pub struct JsObject {
    pub data: ObjectData,
    pub prototype: Option<JsObjectRef>,
    pub props: PropertyTable,
    /// When false, new properties cannot be created
    pub extensible: bool,
    /// Set once the object is used as a weak-map key
    pub has_weak_refs: bool,
}

impl JsObject {
    pub fn new(data: ObjectData, prototype: Option<JsObjectRef>) -> Self {
        Self {
            data,
            prototype,
            props: PropertyTable::new(),
            extensible: true,
            has_weak_refs: false,
        }
    }

    pub fn class(&self) -> ClassId {
        self.data.ops().class()
    }

    pub fn class_name(&self) -> &'static str {
        self.class().name()
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.data, ObjectData::Function(_))
    }

    pub fn as_function(&self) -> Option<&FunctionData> {
        match &self.data {
            ObjectData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<Rc<dyn HostObject>> {
        match &self.data {
            ObjectData::Host(h) => Some(h.host.clone()),
            _ => None,
        }
    }

    pub fn as_scope(&self) -> Option<&ScopeData> {
        match &self.data {
            ObjectData::Scope(s) => Some(s),
            _ => None,
        }
    }

    /// Read a concrete own value without running any getter
    pub fn own_value(&self, name: &str) -> Option<JsValue> {
        let id = self.props.find(name, CaseMode::Sensitive)?;
        match self.props.kind(id)? {
            SlotKind::Value(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Add or overwrite a concrete own property, bypassing attributes.
    /// Used while building builtin objects.
    pub fn set_own(&mut self, name: JsString, value: JsValue, flags: PropFlags) -> PropId {
        match self.props.find(name.as_str(), CaseMode::Sensitive) {
            Some(id) => {
                self.props.set(id, SlotKind::Value(value), flags);
                id
            }
            None => self.props.add(name, flags, SlotKind::Value(value)),
        }
    }
}

impl Reset for JsObject {
    fn reset(&mut self) {
        self.data.ops_mut().unlink();
        self.props.clear();
        self.prototype = None;
        self.data = ObjectData::plain(ClassId::Object);
        self.extensible = true;
        self.has_weak_refs = false;
    }
}

impl Traceable for JsObject {
    fn trace<F: FnMut(GcPtr<Self>)>(&self, mut visitor: F) {
        if let Some(proto) = &self.prototype {
            visitor(proto.copy_ref());
        }
        for kind in self.props.values() {
            match kind {
                SlotKind::Value(JsValue::Object(obj)) => visitor(obj.copy_ref()),
                SlotKind::Accessor { getter, setter } => {
                    if let Some(g) = getter {
                        visitor(g.copy_ref());
                    }
                    if let Some(s) = setter {
                        visitor(s.copy_ref());
                    }
                }
                _ => {}
            }
        }
        self.data.ops().trace(&mut visitor);
    }

    fn trace_ephemerons<F: FnMut(GcPtr<Self>, GcPtr<Self>)>(&self, mut visitor: F) {
        if let ObjectData::WeakMap(map) = &self.data {
            for (key, value) in map.entries.values() {
                if let (Some(key), JsValue::Object(value)) = (key.as_ptr(), value) {
                    visitor(key, value.copy_ref());
                }
            }
        }
    }

    fn is_externally_counted(&self) -> bool {
        matches!(self.data, ObjectData::Host(_))
    }

    fn prune_weak(&mut self) {
        if let ObjectData::WeakMap(map) = &mut self.data {
            map.prune();
        }
    }
}
