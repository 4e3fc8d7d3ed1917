//! Property operations: lookup with prototype delegation, get, put, delete,
//! define with attributes and enumeration.
//!
//! Names that resolve through the prototype chain leave a `ProtoRef` slot in
//! the object the lookup started from. The cached slot index is only trusted
//! after checking that the ancestor slot still carries the same name and has
//! not been deleted; a stale entry is re-resolved or healed to `Deleted`.

use log::trace;

use super::{BuiltinProp, CaseMode, PropFlags, PropId, SlotKind};
use crate::error::{ErrorCode, JsError};
use crate::host::SetOutcome;
use crate::interpreter::Interpreter;
use crate::value::{JsObjectRef, JsString, JsValue, array_index};

/// Which slots `next_enumerable` reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMode {
    /// Own properties, enumerable or not
    Own,
    /// Enumerable own and inherited properties
    All,
    /// Enumerable own properties
    EnumOnly,
}

/// Partial property descriptor as accepted by `Object.defineProperty`
#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
    /// `Some(None)` describes an accessor without a getter
    pub getter: Option<Option<JsObjectRef>>,
    pub setter: Option<Option<JsObjectRef>>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, flags: PropFlags) -> Self {
        Self {
            value: Some(value),
            writable: Some(flags.writable()),
            enumerable: Some(flags.enumerable()),
            configurable: Some(flags.configurable()),
            getter: None,
            setter: None,
        }
    }

    pub fn is_accessor(&self) -> bool {
        self.getter.is_some() || self.setter.is_some()
    }

    pub fn is_data(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_generic(&self) -> bool {
        !self.is_accessor() && !self.is_data()
    }
}

fn names_match(a: &str, b: &str, case: CaseMode) -> bool {
    a == b || (case == CaseMode::Insensitive && a.to_lowercase() == b.to_lowercase())
}

fn builtin_prop(obj: &JsObjectRef, index: usize) -> Option<&'static BuiltinProp> {
    obj.borrow().data.ops().builtin_props().get(index)
}

fn not_extensible(name: &str) -> JsError {
    JsError::type_error(
        ErrorCode::OBJECT_NOT_EXTENSIBLE,
        format!("Cannot create property '{}': object is not extensible", name),
    )
}

fn cannot_redefine(name: &str) -> JsError {
    JsError::type_error(
        ErrorCode::NONCONFIGURABLE_REDEFINED,
        format!("Cannot redefine non-configurable property '{}'", name),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// Lookup
// ═══════════════════════════════════════════════════════════════════════════

/// Materialize a class-table, indexed or host member named `name`
fn materialize(obj: &JsObjectRef, name: &str, case: CaseMode) -> Result<Option<PropId>, JsError> {
    let (found, host) = {
        let o = obj.borrow();
        let ops = o.data.ops();
        let builtins = ops.builtin_props();
        let builtin = builtins
            .iter()
            .position(|p| p.name == name)
            .or_else(|| builtins.iter().position(|p| names_match(p.name, name, case)));
        let found = match builtin {
            Some(i) => builtins
                .get(i)
                .map(|p| (JsString::from(p.name), SlotKind::Builtin(i), p.flags)),
            None => array_index(name)
                .filter(|i| *i < ops.indexed_len())
                .map(|i| (JsString::from(name), SlotKind::Indexed(i), ops.indexed_flags())),
        };
        (found, o.as_host())
    };
    let found = match (found, host) {
        (Some(found), _) => Some(found),
        (None, Some(host)) => host
            .lookup_property(name, case)?
            .map(|desc| (JsString::from(name), SlotKind::External(desc.id), desc.flags)),
        (None, None) => None,
    };
    Ok(found.map(|(name, kind, flags)| obj.borrow_mut().props.add(name, flags, kind)))
}

/// Find an own slot, materializing class and host members on demand.
/// May return a `Deleted` or `ProtoRef` slot.
pub fn find_own(obj: &JsObjectRef, name: &str, case: CaseMode) -> Result<Option<PropId>, JsError> {
    let found = obj.borrow().props.find(name, case);
    match found {
        Some(id) => Ok(Some(id)),
        None => materialize(obj, name, case),
    }
}

/// Find a slot in `obj` through which `name` resolves, own or inherited.
/// Never returns a `Deleted` slot. An insensitive lookup that meets two own
/// names differing only by case resolves to nothing.
pub fn find_with_prototype(
    obj: &JsObjectRef,
    name: &str,
    case: CaseMode,
) -> Result<Option<PropId>, JsError> {
    if case == CaseMode::Insensitive && obj.borrow().props.is_ambiguous(name) {
        trace!("'{}' is ambiguous ignoring case", name);
        return Ok(None);
    }
    let Some(id) = find_own(obj, name, case)? else {
        return inherit(obj, None, name, case);
    };
    let (kind, slot_name, proto) = {
        let o = obj.borrow();
        let Some(slot) = o.props.slot(id) else {
            return Ok(None);
        };
        (slot.kind.clone(), slot.name.clone(), o.prototype.clone())
    };
    match kind {
        SlotKind::ProtoRef(target) => {
            if let Some(proto) = &proto {
                let target_kind = proto
                    .borrow()
                    .props
                    .slot(target)
                    .filter(|s| s.name == slot_name)
                    .map(|s| s.kind.clone());
                match target_kind {
                    Some(kind) if kind.is_own() => return Ok(Some(id)),
                    Some(SlotKind::ProtoRef(_)) => {
                        if find_with_prototype(proto, slot_name.as_str(), CaseMode::Sensitive)?
                            == Some(target)
                        {
                            return Ok(Some(id));
                        }
                    }
                    _ => {}
                }
            }
            trace!("prototype reference for '{}' is stale", slot_name);
            inherit(obj, Some(id), slot_name.as_str(), CaseMode::Sensitive)
        }
        SlotKind::Deleted => inherit(obj, Some(id), name, case),
        _ => Ok(Some(id)),
    }
}

/// Resolve `name` through the prototype and record the result in `obj`,
/// reusing `existing` (a tombstone or stale reference) when possible.
fn inherit(
    obj: &JsObjectRef,
    existing: Option<PropId>,
    name: &str,
    case: CaseMode,
) -> Result<Option<PropId>, JsError> {
    let proto = obj.borrow().prototype.clone();
    let resolved = match &proto {
        Some(proto) => match find_with_prototype(proto, name, case)? {
            Some(pid) => proto.borrow().props.name(pid).cloned().map(|n| (pid, n)),
            None => None,
        },
        None => None,
    };
    let mut o = obj.borrow_mut();
    let reusable = existing
        .filter(|id| match &resolved {
            Some((_, target_name)) => o.props.name(*id) == Some(target_name),
            None => true,
        })
        .or_else(|| match &resolved {
            // Found under another spelling: refresh the reference cached for it
            Some((_, target_name)) if target_name.as_str() != name => o
                .props
                .find(target_name.as_str(), CaseMode::Sensitive)
                .filter(|id| o.props.kind(*id).is_some_and(|k| !k.is_own())),
            _ => None,
        });
    match (resolved, reusable) {
        (Some((pid, _)), Some(id)) => {
            o.props.set(id, SlotKind::ProtoRef(pid), PropFlags::NONE);
            Ok(Some(id))
        }
        (Some((pid, target_name)), None) => {
            Ok(Some(o.props.add(target_name, PropFlags::NONE, SlotKind::ProtoRef(pid))))
        }
        (None, Some(id)) => {
            o.props.tombstone(id);
            Ok(None)
        }
        (None, None) => Ok(None),
    }
}

/// Like `find_with_prototype`, but creates an own `undefined` slot with
/// `flags` when the name does not resolve at all.
pub fn ensure(obj: &JsObjectRef, name: &JsString, flags: PropFlags) -> Result<PropId, JsError> {
    if let Some(id) = find_with_prototype(obj, name.as_str(), CaseMode::Sensitive)? {
        return Ok(id);
    }
    let mut o = obj.borrow_mut();
    if !o.extensible {
        return Err(not_extensible(name.as_str()));
    }
    if let Some(id) = o.props.find(name.as_str(), CaseMode::Sensitive) {
        o.props.set(id, SlotKind::Value(JsValue::Undefined), flags);
        return Ok(id);
    }
    Ok(o.props.add(name.clone(), flags, SlotKind::Value(JsValue::Undefined)))
}

// ═══════════════════════════════════════════════════════════════════════════
// Get / put / delete
// ═══════════════════════════════════════════════════════════════════════════

/// Read the slot `id` of `obj`, with `obj` as the receiver
pub fn prop_get(interp: &mut Interpreter, obj: &JsObjectRef, id: PropId) -> Result<JsValue, JsError> {
    get_with_receiver(interp, obj, id, &JsValue::Object(obj.clone()))
}

fn get_with_receiver(
    interp: &mut Interpreter,
    holder: &JsObjectRef,
    id: PropId,
    receiver: &JsValue,
) -> Result<JsValue, JsError> {
    let (kind, proto) = {
        let o = holder.borrow();
        (o.props.kind(id).cloned(), o.prototype.clone())
    };
    match kind {
        None | Some(SlotKind::Deleted) => Ok(JsValue::Undefined),
        Some(SlotKind::Value(v)) => Ok(v),
        Some(SlotKind::Accessor { getter, .. }) => match getter {
            Some(getter) => interp.call_function(&JsValue::Object(getter), receiver.clone(), &[]),
            None => Ok(JsValue::Undefined),
        },
        Some(SlotKind::Builtin(index)) => match builtin_prop(holder, index) {
            Some(prop) => (prop.get)(interp, holder),
            None => Ok(JsValue::Undefined),
        },
        Some(SlotKind::Indexed(index)) => {
            let value = holder.borrow().data.ops().indexed_get(index);
            Ok(value.unwrap_or_default())
        }
        Some(SlotKind::External(host_id)) => {
            let host = holder.borrow().as_host();
            match host {
                Some(host) => Ok(host.get_property(host_id)?),
                None => Ok(JsValue::Undefined),
            }
        }
        Some(SlotKind::ProtoRef(target)) => match proto {
            Some(proto) => get_with_receiver(interp, &proto, target, receiver),
            None => Ok(JsValue::Undefined),
        },
    }
}

/// Write the slot `id` of `obj`.
///
/// Non-writable values and builtins without a setter ignore the write.
/// Writes through a prototype reference create an own property unless the
/// inherited slot is an accessor or read-only.
pub fn prop_put(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    id: PropId,
    value: JsValue,
) -> Result<(), JsError> {
    let (kind, flags, proto) = {
        let o = obj.borrow();
        (o.props.kind(id).cloned(), o.props.flags(id), o.prototype.clone())
    };
    match kind {
        None => Ok(()),
        Some(SlotKind::Value(_)) => {
            if flags.writable() {
                store_value(obj, id, value, flags);
            }
            Ok(())
        }
        Some(SlotKind::Accessor { setter, .. }) => {
            if let Some(setter) = setter {
                interp.call_function(&JsValue::Object(setter), JsValue::Object(obj.clone()), &[value])?;
            }
            Ok(())
        }
        Some(SlotKind::Builtin(index)) => {
            if let Some(set) = builtin_prop(obj, index).and_then(|p| p.set) {
                set(interp, obj, value)?;
            }
            Ok(())
        }
        Some(SlotKind::Indexed(index)) => {
            if flags.writable() {
                let stored = obj.borrow_mut().data.ops_mut().indexed_put(index, value.clone());
                if !stored {
                    store_value(obj, id, value, flags);
                }
            }
            Ok(())
        }
        Some(SlotKind::External(host_id)) => {
            let host = obj.borrow().as_host();
            if let Some(host) = host
                && host.set_property(host_id, &value)? == SetOutcome::Accepted
            {
                return Ok(());
            }
            trace!("host declined property write, keeping own value");
            store_value(obj, id, value, PropFlags::ALL);
            Ok(())
        }
        Some(SlotKind::ProtoRef(target)) => {
            if let Some(proto) = proto
                && inherited_put(interp, obj, &proto, target, &value)?
            {
                return Ok(());
            }
            create_own(obj, id, value);
            Ok(())
        }
        Some(SlotKind::Deleted) => {
            create_own(obj, id, value);
            Ok(())
        }
    }
}

/// Handle a write that resolved to an ancestor's slot. Returns true when
/// the ancestor consumed or refused the write.
fn inherited_put(
    interp: &mut Interpreter,
    receiver: &JsObjectRef,
    holder: &JsObjectRef,
    id: PropId,
    value: &JsValue,
) -> Result<bool, JsError> {
    let (kind, flags, proto) = {
        let o = holder.borrow();
        (o.props.kind(id).cloned(), o.props.flags(id), o.prototype.clone())
    };
    match kind {
        Some(SlotKind::Accessor { setter, .. }) => {
            if let Some(setter) = setter {
                interp.call_function(
                    &JsValue::Object(setter),
                    JsValue::Object(receiver.clone()),
                    std::slice::from_ref(value),
                )?;
            }
            Ok(true)
        }
        Some(SlotKind::Builtin(index)) => {
            let has_setter = builtin_prop(holder, index).is_some_and(|p| p.set.is_some());
            Ok(!has_setter && !flags.writable())
        }
        Some(SlotKind::Value(_) | SlotKind::Indexed(_) | SlotKind::External(_)) => Ok(!flags.writable()),
        Some(SlotKind::ProtoRef(target)) => match proto {
            Some(proto) => inherited_put(interp, receiver, &proto, target, value),
            None => Ok(false),
        },
        Some(SlotKind::Deleted) | None => Ok(false),
    }
}

fn store_value(obj: &JsObjectRef, id: PropId, value: JsValue, flags: PropFlags) {
    let mut o = obj.borrow_mut();
    o.props.set(id, SlotKind::Value(value), flags);
    let name = o.props.name(id).cloned();
    if let Some(name) = name {
        o.data.ops_mut().on_put(&name);
    }
}

fn create_own(obj: &JsObjectRef, id: PropId, value: JsValue) {
    if obj.borrow().extensible {
        store_value(obj, id, value, PropFlags::ALL);
    }
}

/// Delete slot `id`. Non-configurable properties are kept and report false.
pub fn delete_prop(obj: &JsObjectRef, id: PropId) -> Result<bool, JsError> {
    let (kind, flags) = {
        let o = obj.borrow();
        (o.props.kind(id).cloned(), o.props.flags(id))
    };
    match kind {
        None | Some(SlotKind::Deleted | SlotKind::ProtoRef(_)) => return Ok(true),
        _ if !flags.configurable() => return Ok(false),
        Some(SlotKind::External(host_id)) => {
            let host = obj.borrow().as_host();
            if let Some(host) = host
                && !host.delete_property(host_id)?
            {
                return Ok(false);
            }
        }
        Some(_) => {}
    }
    obj.borrow_mut().props.tombstone(id);
    Ok(true)
}

// ═══════════════════════════════════════════════════════════════════════════
// Name-based helpers
// ═══════════════════════════════════════════════════════════════════════════

/// `obj[name]`
pub fn get_member(interp: &mut Interpreter, obj: &JsObjectRef, name: &str) -> Result<JsValue, JsError> {
    Ok(lookup_member(interp, obj, name, CaseMode::Sensitive)?.unwrap_or_default())
}

/// Resolve and read `name` the way a host dispatch lookup does; `None` when
/// the name does not resolve or is ambiguous ignoring case.
pub fn lookup_member(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    name: &str,
    case: CaseMode,
) -> Result<Option<JsValue>, JsError> {
    match find_with_prototype(obj, name, case)? {
        Some(id) => prop_get(interp, obj, id).map(Some),
        None => Ok(None),
    }
}

/// `obj[name] = value`. Silently ignored on non-extensible objects.
pub fn put_member(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    name: &JsString,
    value: JsValue,
) -> Result<(), JsError> {
    if let Some(id) = find_with_prototype(obj, name.as_str(), CaseMode::Sensitive)? {
        return prop_put(interp, obj, id, value);
    }
    let mut o = obj.borrow_mut();
    if !o.extensible {
        return Ok(());
    }
    match o.props.find(name.as_str(), CaseMode::Sensitive) {
        Some(id) => o.props.set(id, SlotKind::Value(value), PropFlags::ALL),
        None => {
            o.props.add(name.clone(), PropFlags::ALL, SlotKind::Value(value));
        }
    }
    o.data.ops_mut().on_put(name);
    Ok(())
}

/// `delete obj[name]`
pub fn delete_member(obj: &JsObjectRef, name: &str) -> Result<bool, JsError> {
    match find_own(obj, name, CaseMode::Sensitive)? {
        Some(id) => delete_prop(obj, id),
        None => Ok(true),
    }
}

/// `name in obj`
pub fn has_property(obj: &JsObjectRef, name: &str) -> Result<bool, JsError> {
    Ok(find_with_prototype(obj, name, CaseMode::Sensitive)?.is_some())
}

pub fn has_own_property(obj: &JsObjectRef, name: &str) -> Result<bool, JsError> {
    Ok(own_slot(obj, name)?.is_some())
}

/// Own, non-deleted slot and its attributes
fn own_slot(obj: &JsObjectRef, name: &str) -> Result<Option<(PropId, SlotKind, PropFlags)>, JsError> {
    let Some(id) = find_own(obj, name, CaseMode::Sensitive)? else {
        return Ok(None);
    };
    let o = obj.borrow();
    Ok(o.props
        .slot(id)
        .filter(|s| s.kind.is_own())
        .map(|s| (id, s.kind.clone(), s.flags)))
}

pub fn get_own_property_descriptor(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    name: &str,
) -> Result<Option<PropertyDescriptor>, JsError> {
    let Some((id, kind, flags)) = own_slot(obj, name)? else {
        return Ok(None);
    };
    let desc = match kind {
        SlotKind::Accessor { getter, setter } => PropertyDescriptor {
            value: None,
            writable: None,
            enumerable: Some(flags.enumerable()),
            configurable: Some(flags.configurable()),
            getter: Some(getter),
            setter: Some(setter),
        },
        _ => PropertyDescriptor::data(prop_get(interp, obj, id)?, flags),
    };
    Ok(Some(desc))
}

// ═══════════════════════════════════════════════════════════════════════════
// Define
// ═══════════════════════════════════════════════════════════════════════════

/// Define or redefine an own property following the ES5 attribute rules
pub fn define_property(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    name: &JsString,
    desc: PropertyDescriptor,
) -> Result<(), JsError> {
    let existing = find_own(obj, name.as_str(), CaseMode::Sensitive)?;
    let current = match existing {
        Some(id) => own_slot(obj, name.as_str())?.filter(|(own, _, _)| *own == id),
        None => None,
    };
    let Some((id, kind, flags)) = current else {
        let mut o = obj.borrow_mut();
        if !o.extensible {
            return Err(not_extensible(name.as_str()));
        }
        let base = PropFlags::NONE
            .with(PropFlags::ENUMERABLE, desc.enumerable == Some(true))
            .with(PropFlags::CONFIGURABLE, desc.configurable == Some(true));
        let (kind, flags) = if desc.is_accessor() {
            let kind = SlotKind::Accessor {
                getter: desc.getter.flatten(),
                setter: desc.setter.flatten(),
            };
            (kind, base)
        } else {
            let flags = base.with(PropFlags::WRITABLE, desc.writable == Some(true));
            (SlotKind::Value(desc.value.unwrap_or_default()), flags)
        };
        match existing {
            Some(id) => o.props.set(id, kind, flags),
            None => {
                o.props.add(name.clone(), flags, kind);
            }
        }
        o.data.ops_mut().on_put(name);
        return Ok(());
    };

    let is_accessor = matches!(kind, SlotKind::Accessor { .. });
    if !flags.configurable() {
        if desc.configurable == Some(true) {
            return Err(cannot_redefine(name.as_str()));
        }
        if desc.enumerable.is_some_and(|e| e != flags.enumerable()) {
            return Err(cannot_redefine(name.as_str()));
        }
        if !desc.is_generic() && desc.is_accessor() != is_accessor {
            return Err(cannot_redefine(name.as_str()));
        }
        if let SlotKind::Accessor { getter, setter } = &kind {
            if desc.getter.as_ref().is_some_and(|g| g != getter)
                || desc.setter.as_ref().is_some_and(|s| s != setter)
            {
                return Err(cannot_redefine(name.as_str()));
            }
        } else if !flags.writable() {
            if desc.writable == Some(true) {
                return Err(cannot_redefine(name.as_str()));
            }
            if let Some(value) = &desc.value {
                let current = prop_get(interp, obj, id)?;
                if !value.strict_equals(&current) {
                    return Err(JsError::type_error(
                        ErrorCode::NONWRITABLE_MODIFIED,
                        format!("Cannot modify non-writable property '{}'", name),
                    ));
                }
            }
        }
    }

    let new_flags = flags
        .with(PropFlags::ENUMERABLE, desc.enumerable.unwrap_or(flags.enumerable()))
        .with(PropFlags::CONFIGURABLE, desc.configurable.unwrap_or(flags.configurable()));

    if desc.is_accessor() {
        let (mut getter, mut setter) = match kind {
            SlotKind::Accessor { getter, setter } => (getter, setter),
            _ => (None, None),
        };
        if let Some(g) = desc.getter {
            getter = g;
        }
        if let Some(s) = desc.setter {
            setter = s;
        }
        let flags = new_flags.with(PropFlags::WRITABLE, false);
        obj.borrow_mut()
            .props
            .set(id, SlotKind::Accessor { getter, setter }, flags);
        return Ok(());
    }

    if is_accessor && desc.is_generic() {
        obj.borrow_mut().props.set(id, kind, new_flags);
        return Ok(());
    }

    let writable = desc
        .writable
        .unwrap_or(!is_accessor && flags.writable());
    let new_flags = new_flags.with(PropFlags::WRITABLE, writable);
    match kind {
        SlotKind::Value(current) => {
            let value = desc.value.unwrap_or(current);
            store_value(obj, id, value, new_flags);
        }
        SlotKind::Accessor { .. } => {
            store_value(obj, id, desc.value.unwrap_or_default(), new_flags);
        }
        SlotKind::External(host_id) => {
            let host = obj.borrow().as_host();
            let mut kept = false;
            if let Some(host) = host {
                kept = new_flags == flags
                    || host.configure_property(host_id, new_flags)? == SetOutcome::Accepted;
                if kept {
                    obj.borrow_mut().props.set(id, SlotKind::External(host_id), new_flags);
                    if let Some(value) = &desc.value {
                        kept = host.set_property(host_id, value)? == SetOutcome::Accepted;
                    }
                }
            }
            if !kept {
                let value = match desc.value {
                    Some(value) => value,
                    None => prop_get(interp, obj, id)?,
                };
                store_value(obj, id, value, new_flags);
            }
        }
        SlotKind::Builtin(_) | SlotKind::Indexed(_) => {
            if new_flags == flags {
                if let Some(value) = desc.value {
                    prop_put(interp, obj, id, value)?;
                }
            } else {
                let value = match desc.value {
                    Some(value) => value,
                    None => prop_get(interp, obj, id)?,
                };
                store_value(obj, id, value, new_flags);
            }
        }
        SlotKind::ProtoRef(_) | SlotKind::Deleted => {}
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Enumeration
// ═══════════════════════════════════════════════════════════════════════════

/// Materialize every class-table, indexed and host member of `obj`
pub fn fill_class_members(obj: &JsObjectRef) -> Result<(), JsError> {
    let host = {
        let mut guard = obj.borrow_mut();
        let o = &mut *guard;
        let ops = o.data.ops();
        for (i, prop) in ops.builtin_props().iter().enumerate() {
            if o.props.find(prop.name, CaseMode::Sensitive).is_none() {
                o.props.add(JsString::from(prop.name), prop.flags, SlotKind::Builtin(i));
            }
        }
        let flags = ops.indexed_flags();
        for i in 0..ops.indexed_len() {
            let name = i.to_string();
            if o.props.find(&name, CaseMode::Sensitive).is_none() {
                o.props.add(JsString::from(name), flags, SlotKind::Indexed(i));
            }
        }
        o.as_host()
    };
    if let Some(host) = host {
        for (name, desc) in host.fill_all_properties()? {
            let mut o = obj.borrow_mut();
            if o.props.find(&name, CaseMode::Sensitive).is_none() {
                o.props.add(JsString::from(name), desc.flags, SlotKind::External(desc.id));
            }
        }
    }
    Ok(())
}

/// Attributes of the slot `id` after following prototype references,
/// provided it still carries `name`
fn resolved_flags(obj: &JsObjectRef, id: PropId, name: &JsString) -> Option<PropFlags> {
    let (kind, flags, proto) = {
        let o = obj.borrow();
        let slot = o.props.slot(id).filter(|s| s.name == *name)?;
        (slot.kind.clone(), slot.flags, o.prototype.clone())
    };
    match kind {
        SlotKind::ProtoRef(target) => proto.and_then(|p| resolved_flags(&p, target, name)),
        SlotKind::Deleted => None,
        _ => Some(flags),
    }
}

/// Install prototype references for every enumerable inherited name
fn fill_protrefs(obj: &JsObjectRef) -> Result<(), JsError> {
    let Some(proto) = obj.borrow().prototype.clone() else {
        return Ok(());
    };
    fill_class_members(&proto)?;
    fill_protrefs(&proto)?;
    let candidates: Vec<(PropId, JsString)> = proto
        .borrow()
        .props
        .iter()
        .filter(|(_, s)| !s.kind.is_deleted())
        .map(|(id, s)| (id, s.name.clone()))
        .collect();
    for (pid, name) in candidates {
        if !resolved_flags(&proto, pid, &name).is_some_and(PropFlags::enumerable) {
            continue;
        }
        let mut o = obj.borrow_mut();
        match o.props.find(name.as_str(), CaseMode::Sensitive) {
            None => {
                o.props.add(name, PropFlags::NONE, SlotKind::ProtoRef(pid));
            }
            Some(id) => {
                if matches!(o.props.kind(id), Some(SlotKind::Deleted | SlotKind::ProtoRef(_))) {
                    o.props.set(id, SlotKind::ProtoRef(pid), PropFlags::NONE);
                }
            }
        }
    }
    Ok(())
}

/// Next slot after `after` (or the first slot) that `mode` reports.
/// Slots are visited in creation order.
pub fn next_enumerable(
    obj: &JsObjectRef,
    after: Option<PropId>,
    mode: EnumMode,
) -> Result<Option<PropId>, JsError> {
    if after.is_none() {
        fill_class_members(obj)?;
        if mode == EnumMode::All {
            fill_protrefs(obj)?;
        }
    }
    let start = after.map_or(0, |id| id.index() + 1);
    let o = obj.borrow();
    for (id, slot) in o.props.iter().skip(start) {
        let reported = match (&slot.kind, mode) {
            (SlotKind::Deleted, _) => false,
            (SlotKind::ProtoRef(target), EnumMode::All) => o
                .prototype
                .as_ref()
                .and_then(|p| resolved_flags(p, *target, &slot.name))
                .is_some_and(PropFlags::enumerable),
            (SlotKind::ProtoRef(_), _) => false,
            (_, EnumMode::Own) => true,
            _ => slot.flags.enumerable(),
        };
        if reported {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

/// Names reported by `mode`, in enumeration order
pub fn property_names(obj: &JsObjectRef, mode: EnumMode) -> Result<Vec<JsString>, JsError> {
    let mut names = Vec::new();
    let mut cursor = None;
    while let Some(id) = next_enumerable(obj, cursor, mode)? {
        if let Some(name) = obj.borrow().props.name(id) {
            names.push(name.clone());
        }
        cursor = Some(id);
    }
    Ok(names)
}
