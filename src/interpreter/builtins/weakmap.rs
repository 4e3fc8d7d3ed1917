//! WeakMap built-in methods
//!
//! Keys are held weakly: an entry does not keep its key alive, and its value
//! is only reachable through the map while the key is reachable elsewhere.

use crate::error::{ErrorCode, JsError};
use crate::interpreter::Interpreter;
use crate::object::{ObjectData, WeakMapData};
use crate::value::{JsObjectRef, JsValue};

use super::arg;

/// Initialize WeakMap.prototype and publish the WeakMap constructor
pub fn init_weakmap(interp: &mut Interpreter) {
    let proto = interp.weakmap_prototype.clone();

    interp.register_method(&proto, "get", weakmap_get, 1);
    interp.register_method(&proto, "set", weakmap_set, 2);
    interp.register_method(&proto, "has", weakmap_has, 1);
    interp.register_method(&proto, "delete", weakmap_delete, 1);

    let constructor = interp.create_constructor("WeakMap", weakmap_call, weakmap_construct, 0, &proto);
    interp.define_global("WeakMap", JsValue::Object(constructor));
}

pub fn weakmap_call(_interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Err(JsError::type_error(
        ErrorCode::UNSUPPORTED_ACTION,
        "WeakMap: 'this' is not a WeakMap object",
    ))
}

pub fn weakmap_construct(interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = interp.alloc(
        ObjectData::WeakMap(WeakMapData::default()),
        Some(interp.weakmap_prototype.clone()),
    );
    Ok(JsValue::Object(map))
}

fn this_map(this: &JsValue) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) if matches!(obj.borrow().data, ObjectData::WeakMap(_)) => Ok(obj.clone()),
        _ => Err(JsError::type_error(
            ErrorCode::UNSUPPORTED_ACTION,
            "WeakMap: 'this' is not a WeakMap object",
        )),
    }
}

fn key_object(key: &JsValue) -> Result<JsObjectRef, JsError> {
    match key {
        JsValue::Object(obj) => Ok(obj.clone()),
        _ => Err(JsError::type_error(ErrorCode::KEY_NOT_OBJECT, "WeakMap: Invalid key")),
    }
}

/// WeakMap.prototype.get(key); primitive keys find nothing
pub fn weakmap_get(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this)?;
    let JsValue::Object(key) = arg(args, 0) else {
        return Ok(JsValue::Undefined);
    };
    Ok(match &map.borrow().data {
        ObjectData::WeakMap(data) => data.get(&key).cloned().unwrap_or_default(),
        _ => JsValue::Undefined,
    })
}

/// WeakMap.prototype.set(key, value); returns the map
pub fn weakmap_set(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this)?;
    let key = key_object(&arg(args, 0))?;
    key.borrow_mut().has_weak_refs = true;
    if let ObjectData::WeakMap(data) = &mut map.borrow_mut().data {
        data.set(&key, arg(args, 1));
    }
    Ok(JsValue::Object(map))
}

pub fn weakmap_has(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this)?;
    let JsValue::Object(key) = arg(args, 0) else {
        return Ok(JsValue::Boolean(false));
    };
    Ok(JsValue::Boolean(match &map.borrow().data {
        ObjectData::WeakMap(data) => data.get(&key).is_some(),
        _ => false,
    }))
}

pub fn weakmap_delete(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this)?;
    let JsValue::Object(key) = arg(args, 0) else {
        return Ok(JsValue::Boolean(false));
    };
    Ok(JsValue::Boolean(match &mut map.borrow_mut().data {
        ObjectData::WeakMap(data) => data.remove(&key),
        _ => false,
    }))
}
