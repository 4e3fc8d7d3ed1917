//! Function objects compiled from source
//!
//! A closure pairs a compiled function with the scope chain in force where
//! its literal was evaluated. Every call gets a fresh variable object whose
//! slots follow `FunctionCode::locals`, so the compiler can address
//! parameters and locals by slot number.

use std::rc::Rc;

use crate::compiler::{Bytecode, FunctionCode};
use crate::error::JsError;
use crate::object::{
    ArgumentsData, ClassId, FunctionData, ObjectData, PropFlags, PropId, SlotKind, SourceFunction,
    ensure,
};
use crate::value::{CheapClone, JsObjectRef, JsValue};

use super::Interpreter;
use super::scope::{binding_flags, push_scope};

/// Look up function `func_id` of a unit
pub fn function_code(code: &Bytecode, func_id: usize) -> Result<&FunctionCode, JsError> {
    code.function(func_id)
        .ok_or_else(|| JsError::internal_error(format!("no function {} in '{}'", func_id, code.name)))
}

/// Create a closure for function `func_id` of `code`
pub fn create_closure(
    interp: &mut Interpreter,
    code: &Rc<Bytecode>,
    func_id: usize,
    scope: Option<JsObjectRef>,
) -> Result<JsObjectRef, JsError> {
    let fcode = function_code(code, func_id)?;

    // A named function expression sees its own name in a scope of its own
    let (scope, binder) = match (&fcode.name, fcode.is_expression) {
        (Some(name), true) => {
            let binder = interp.alloc(ObjectData::plain(ClassId::Variables), None);
            let scope = push_scope(interp, binder.cheap_clone(), scope);
            (Some(scope), Some((binder, name.cheap_clone())))
        }
        _ => (scope, None),
    };

    let func = interp.alloc(
        ObjectData::Function(FunctionData::Source(SourceFunction {
            code: code.cheap_clone(),
            func_id,
            scope,
        })),
        Some(interp.function_prototype.cheap_clone()),
    );
    if let Some((binder, name)) = binder {
        binder
            .borrow_mut()
            .set_own(name, JsValue::Object(func.cheap_clone()), PropFlags::NONE);
    }

    let prototype = interp.create_object();
    let constructor_key = interp.intern("constructor");
    let prototype_key = interp.intern("prototype");
    prototype.borrow_mut().set_own(
        constructor_key,
        JsValue::Object(func.cheap_clone()),
        PropFlags::HIDDEN,
    );
    func.borrow_mut()
        .set_own(prototype_key, JsValue::Object(prototype), PropFlags::WRITABLE);
    Ok(func)
}

/// Per-call state of a source function
#[derive(Debug)]
pub struct Activation {
    pub var_obj: JsObjectRef,
    pub scope: JsObjectRef,
    pub this: JsValue,
    pub arguments: Option<JsObjectRef>,
}

/// Build the variable object, arguments object, `this` and scope chain of
/// one call
pub fn activate(
    interp: &mut Interpreter,
    callee: &JsObjectRef,
    func: &SourceFunction,
    this: JsValue,
    args: &[JsValue],
) -> Result<Activation, JsError> {
    let fcode = function_code(&func.code, func.func_id)?;

    let var_obj = interp.alloc(ObjectData::plain(ClassId::Variables), None);
    {
        let mut v = var_obj.borrow_mut();
        for local in &fcode.locals {
            v.props.add(
                local.name.cheap_clone(),
                binding_flags(local.is_const),
                SlotKind::Value(JsValue::Undefined),
            );
        }
        for (i, slot) in fcode.param_slots.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or_default();
            if let Some(s) = v.props.slot_mut(PropId(*slot)) {
                s.kind = SlotKind::Value(value);
            }
        }
    }

    let arguments = match fcode.arguments_slot {
        Some(slot) => {
            let mapped = (0..args.len())
                .map(|i| {
                    let slot = fcode.param_slots.get(i).copied()?;
                    // A later parameter with the same name owns the slot
                    let shadowed = fcode.param_slots.iter().skip(i + 1).any(|s| *s == slot);
                    (!shadowed).then_some(PropId(slot))
                })
                .collect();
            let arguments = interp.alloc(
                ObjectData::Arguments(ArgumentsData {
                    var_obj: Some(var_obj.cheap_clone()),
                    values: args.to_vec(),
                    mapped,
                }),
                Some(interp.object_prototype.cheap_clone()),
            );
            let length_key = interp.intern("length");
            let callee_key = interp.intern("callee");
            {
                let mut a = arguments.borrow_mut();
                a.set_own(length_key, JsValue::Int(args.len() as i32), PropFlags::HIDDEN);
                a.set_own(callee_key, JsValue::Object(callee.cheap_clone()), PropFlags::HIDDEN);
            }
            if let Some(s) = var_obj.borrow_mut().props.slot_mut(PropId(slot)) {
                s.kind = SlotKind::Value(JsValue::Object(arguments.cheap_clone()));
            }
            Some(arguments)
        }
        None => None,
    };

    let this = match this {
        JsValue::Undefined | JsValue::Null => interp.global_this.clone(),
        JsValue::Object(_) => this,
        primitive => JsValue::Object(interp.to_object(&primitive)?),
    };
    let scope = push_scope(interp, var_obj.cheap_clone(), func.scope.clone());

    Ok(Activation {
        var_obj,
        scope,
        this,
        arguments,
    })
}

/// Create the names declared by global or eval code on its variable object
/// before the code runs
pub fn declare_unit_names(fcode: &FunctionCode, var_obj: &JsObjectRef, configurable: bool) -> Result<(), JsError> {
    let flags = (PropFlags::WRITABLE | PropFlags::ENUMERABLE).with(PropFlags::CONFIGURABLE, configurable);
    for local in &fcode.var_names {
        let id = ensure(var_obj, &local.name, flags)?;
        if local.is_const {
            let mut o = var_obj.borrow_mut();
            if let Some(slot) = o.props.slot_mut(id)
                && matches!(slot.kind, SlotKind::Value(_))
            {
                slot.flags = binding_flags(true);
            }
        }
    }
    Ok(())
}
