//! Boolean built-in methods

use crate::error::{ErrorCode, JsError};
use crate::interpreter::Interpreter;
use crate::object::{BooleanData, ObjectData};
use crate::value::JsValue;

/// Initialize Boolean.prototype and publish the Boolean constructor
pub fn init_boolean(interp: &mut Interpreter) {
    let proto = interp.boolean_prototype.clone();

    interp.register_method(&proto, "toString", boolean_to_string, 0);
    interp.register_method(&proto, "valueOf", boolean_value_of, 0);

    let constructor = interp.create_constructor("Boolean", boolean_call, boolean_construct, 1, &proto);
    interp.define_global("Boolean", JsValue::Object(constructor));
}

pub fn boolean_call(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(args.first().is_some_and(JsValue::to_boolean)))
}

pub fn boolean_construct(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = args.first().is_some_and(JsValue::to_boolean);
    let obj = interp.alloc(
        ObjectData::Boolean(BooleanData(value)),
        Some(interp.boolean_prototype.clone()),
    );
    Ok(JsValue::Object(obj))
}

fn this_boolean(this: &JsValue) -> Result<bool, JsError> {
    match this {
        JsValue::Boolean(b) => Ok(*b),
        JsValue::Object(obj) => match &obj.borrow().data {
            ObjectData::Boolean(BooleanData(b)) => Ok(*b),
            _ => Err(JsError::type_error(ErrorCode::BOOLEAN_EXPECTED, "Boolean expected")),
        },
        _ => Err(JsError::type_error(ErrorCode::BOOLEAN_EXPECTED, "Boolean expected")),
    }
}

pub fn boolean_to_string(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::from(if this_boolean(&this)? { "true" } else { "false" }))
}

pub fn boolean_value_of(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(this_boolean(&this)?))
}
