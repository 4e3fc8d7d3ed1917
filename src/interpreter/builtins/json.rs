//! JSON built-in methods, backed by serde_json

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::{ErrorCode, ErrorKind, JsError};
use crate::interpreter::Interpreter;
use crate::object::{ClassId, EnumMode, ObjectData, PropFlags, get_member, property_names};
use crate::value::{JsObjectRef, JsString, JsValue, to_uint32};

use super::arg;

/// Create the JSON object
pub fn create_json_object(interp: &mut Interpreter) -> JsObjectRef {
    let json = interp.alloc(ObjectData::plain(ClassId::Json), Some(interp.object_prototype.clone()));
    interp.register_method(&json, "stringify", json_stringify, 3);
    interp.register_method(&json, "parse", json_parse, 2);
    json
}

/// JSON.stringify(value, replacer, space)
///
/// The replacer argument is ignored. Values that have no JSON form
/// (undefined, functions) produce `undefined` at top level.
pub fn json_stringify(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = arg(args, 0);
    let mut visited = FxHashSet::default();
    let Some(json) = to_json(interp, &value, &mut visited)? else {
        return Ok(JsValue::Undefined);
    };

    let indent = match arg(args, 2) {
        JsValue::Int(n) if n > 0 => " ".repeat(n.min(10) as usize),
        JsValue::Number(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        JsValue::String(s) => s.as_str().chars().take(10).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        json.to_string()
    } else {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        json.serialize(&mut ser)
            .map_err(|e| JsError::internal_error(format!("JSON serialization failed: {}", e)))?;
        String::from_utf8_lossy(&out).into_owned()
    };
    Ok(JsValue::from(text))
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// JSON form of a value; `None` when the value is skipped
fn to_json(
    interp: &mut Interpreter,
    value: &JsValue,
    visited: &mut FxHashSet<usize>,
) -> Result<Option<serde_json::Value>, JsError> {
    let obj = match value {
        JsValue::Undefined => return Ok(None),
        JsValue::Null => return Ok(Some(serde_json::Value::Null)),
        JsValue::Boolean(b) => return Ok(Some(serde_json::Value::Bool(*b))),
        JsValue::Int(i) => return Ok(Some(serde_json::Value::from(*i))),
        JsValue::Number(n) => return Ok(Some(number_to_json(*n))),
        JsValue::String(s) => return Ok(Some(serde_json::Value::String(s.to_string()))),
        JsValue::Object(obj) => obj,
    };

    let primitive = match &obj.borrow().data {
        ObjectData::Function(_) => return Ok(None),
        ObjectData::Boolean(b) => Some(serde_json::Value::Bool(b.0)),
        ObjectData::Number(n) => Some(number_to_json(n.0)),
        ObjectData::String(s) => Some(serde_json::Value::String(s.value.to_string())),
        _ => None,
    };
    if primitive.is_some() {
        return Ok(primitive);
    }

    if !visited.insert(obj.id()) {
        return Err(JsError::type_error(
            ErrorCode::JSON_SYNTAX,
            "Circular reference in value argument not supported",
        ));
    }

    let is_array = matches!(obj.borrow().data, ObjectData::Array(_));
    let result = if is_array {
        let length = get_member(interp, obj, "length")?;
        let length = to_uint32(interp.to_number(&length)?);
        let mut items = Vec::with_capacity(length as usize);
        for i in 0..length {
            let element = get_member(interp, obj, &i.to_string())?;
            items.push(to_json(interp, &element, visited)?.unwrap_or(serde_json::Value::Null));
        }
        serde_json::Value::Array(items)
    } else {
        let mut map = serde_json::Map::new();
        for key in property_names(obj, EnumMode::EnumOnly)? {
            let member = get_member(interp, obj, key.as_str())?;
            if let Some(json) = to_json(interp, &member, visited)? {
                map.insert(key.to_string(), json);
            }
        }
        serde_json::Value::Object(map)
    };

    visited.remove(&obj.id());
    Ok(Some(result))
}

/// JSON.parse(text); the reviver argument is ignored
pub fn json_parse(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = interp.to_string(&arg(args, 0))?;
    let json: serde_json::Value = serde_json::from_str(text.as_str()).map_err(|e| {
        JsError::runtime(ErrorKind::Syntax, ErrorCode::JSON_SYNTAX, format!("Invalid JSON: {}", e))
    })?;
    Ok(from_json(interp, &json))
}

/// Build script values from parsed JSON
pub fn from_json(interp: &mut Interpreter, json: &serde_json::Value) -> JsValue {
    match json {
        serde_json::Value::Null => JsValue::Null,
        serde_json::Value::Bool(b) => JsValue::Boolean(*b),
        serde_json::Value::Number(n) => JsValue::number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => JsValue::String(JsString::from(s.as_str())),
        serde_json::Value::Array(items) => {
            let elements = items.iter().map(|item| from_json(interp, item)).collect();
            JsValue::Object(interp.create_array(elements))
        }
        serde_json::Value::Object(map) => {
            let obj = interp.create_object();
            for (key, value) in map {
                let value = from_json(interp, value);
                let key = interp.intern(key);
                obj.borrow_mut().set_own(key, value, PropFlags::ALL);
            }
            JsValue::Object(obj)
        }
    }
}
