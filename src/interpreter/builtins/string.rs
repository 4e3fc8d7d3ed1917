//! String built-in methods
//!
//! Positions are UTF-16 code unit offsets, as script observes them.

use crate::error::{ErrorCode, JsError};
use crate::interpreter::Interpreter;
use crate::object::{BuiltinProp, ObjectData, PropFlags, StringData};
use crate::value::{JsObjectRef, JsString, JsValue, to_uint32};

use super::arg;

pub static STRING_PROPS: &[BuiltinProp] = &[BuiltinProp {
    name: "length",
    flags: PropFlags::NONE,
    get: string_length_get,
    set: None,
}];

/// Initialize String.prototype and publish the String constructor
pub fn init_string(interp: &mut Interpreter) {
    let proto = interp.string_prototype.clone();

    interp.register_method(&proto, "charAt", string_char_at, 1);
    interp.register_method(&proto, "charCodeAt", string_char_code_at, 1);
    interp.register_method(&proto, "indexOf", string_index_of, 1);
    interp.register_method(&proto, "lastIndexOf", string_last_index_of, 1);
    interp.register_method(&proto, "substring", string_substring, 2);
    interp.register_method(&proto, "substr", string_substr, 2);
    interp.register_method(&proto, "slice", string_slice, 2);
    interp.register_method(&proto, "toUpperCase", string_to_upper_case, 0);
    interp.register_method(&proto, "toLowerCase", string_to_lower_case, 0);
    interp.register_method(&proto, "split", string_split, 2);
    interp.register_method(&proto, "concat", string_concat, 1);
    interp.register_method(&proto, "toString", string_value_of, 0);
    interp.register_method(&proto, "valueOf", string_value_of, 0);

    let constructor = interp.create_constructor("String", string_call, string_construct, 1, &proto);
    interp.register_method(&constructor, "fromCharCode", string_from_char_code, 1);
    interp.define_global("String", JsValue::Object(constructor));
}

fn string_length_get(_interp: &mut Interpreter, obj: &JsObjectRef) -> Result<JsValue, JsError> {
    let length = match &obj.borrow().data {
        ObjectData::String(s) => s.value.len(),
        _ => 0,
    };
    Ok(JsValue::Int(length as i32))
}

/// String(value): conversion
pub fn string_call(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    match args.first() {
        Some(value) => Ok(JsValue::String(interp.to_string(value)?)),
        None => Ok(JsValue::from("")),
    }
}

/// new String(value): wrapper object
pub fn string_construct(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = match args.first() {
        Some(value) => interp.to_string(value)?,
        None => JsString::default(),
    };
    let obj = interp.alloc(
        ObjectData::String(StringData { value }),
        Some(interp.string_prototype.clone()),
    );
    Ok(JsValue::Object(obj))
}

/// String.fromCharCode(...codes)
pub fn string_from_char_code(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut units = Vec::with_capacity(args.len());
    for code in args {
        units.push((to_uint32(interp.to_number(code)?) & 0xFFFF) as u16);
    }
    Ok(JsValue::from(String::from_utf16_lossy(&units)))
}

/// `this` coerced to a string; undefined and null are rejected
fn this_string(interp: &mut Interpreter, this: &JsValue) -> Result<JsString, JsError> {
    match this {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Undefined | JsValue::Null => Err(JsError::object_expected()),
        _ => interp.to_string(this),
    }
}

fn from_units(units: &[u16]) -> JsValue {
    JsValue::from(String::from_utf16_lossy(units))
}

/// ToInteger, with NaN as zero
fn integer_arg(interp: &mut Interpreter, value: &JsValue, default: f64) -> Result<f64, JsError> {
    if matches!(value, JsValue::Undefined) {
        return Ok(default);
    }
    let n = interp.to_number(value)?;
    Ok(if n.is_nan() { 0.0 } else { n.trunc() })
}

fn clamp(n: f64, len: usize) -> usize {
    n.clamp(0.0, len as f64) as usize
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

// ═══════════════════════════════════════════════════════════════════════════
// Prototype methods
// ═══════════════════════════════════════════════════════════════════════════

pub fn string_char_at(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?;
    let pos = integer_arg(interp, &arg(args, 0), 0.0)?;
    if pos < 0.0 {
        return Ok(JsValue::from(""));
    }
    match s.char_code_at(pos as usize) {
        Some(unit) => Ok(from_units(&[unit])),
        None => Ok(JsValue::from("")),
    }
}

pub fn string_char_code_at(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?;
    let pos = integer_arg(interp, &arg(args, 0), 0.0)?;
    if pos < 0.0 {
        return Ok(JsValue::Number(f64::NAN));
    }
    match s.char_code_at(pos as usize) {
        Some(unit) => Ok(JsValue::Int(i32::from(unit))),
        None => Ok(JsValue::Number(f64::NAN)),
    }
}

/// String.prototype.indexOf(search, position)
pub fn string_index_of(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?.to_utf16();
    let search = interp.to_string(&arg(args, 0))?.to_utf16();
    let from = clamp(integer_arg(interp, &arg(args, 1), 0.0)?, s.len());
    Ok(match find_units(&s, &search, from) {
        Some(i) => JsValue::Int(i as i32),
        None => JsValue::Int(-1),
    })
}

/// String.prototype.lastIndexOf(search, position)
pub fn string_last_index_of(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?.to_utf16();
    let search = interp.to_string(&arg(args, 0))?.to_utf16();
    let pos = match arg(args, 1) {
        JsValue::Undefined => f64::INFINITY,
        value => {
            let n = interp.to_number(&value)?;
            if n.is_nan() { f64::INFINITY } else { n.trunc() }
        }
    };
    let Some(max_start) = s.len().checked_sub(search.len()) else {
        return Ok(JsValue::Int(-1));
    };
    let start = clamp(pos, max_start);
    let found = (0..=start)
        .rev()
        .find(|&i| s.get(i..i + search.len()) == Some(search.as_slice()));
    Ok(match found {
        Some(i) => JsValue::Int(i as i32),
        None => JsValue::Int(-1),
    })
}

/// String.prototype.substring(start, end): arguments are clamped and
/// swapped when out of order
pub fn string_substring(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?;
    let len = s.len();
    let start = clamp(integer_arg(interp, &arg(args, 0), 0.0)?, len);
    let end = clamp(integer_arg(interp, &arg(args, 1), len as f64)?, len);
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    Ok(JsValue::String(s.substring(start, end)))
}

/// String.prototype.substr(start, length); a negative start counts from the end
pub fn string_substr(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?;
    let len = s.len();
    let start = integer_arg(interp, &arg(args, 0), 0.0)?;
    let start = if start < 0.0 { (len as f64 + start).max(0.0) } else { start.min(len as f64) } as usize;
    let count = clamp(integer_arg(interp, &arg(args, 1), f64::INFINITY)?, len - start);
    Ok(JsValue::String(s.substring(start, start + count)))
}

/// String.prototype.slice(start, end); negative positions count from the end
pub fn string_slice(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?;
    let len = s.len() as f64;
    let relative = |n: f64| if n < 0.0 { (len + n).max(0.0) } else { n.min(len) } as usize;
    let start = relative(integer_arg(interp, &arg(args, 0), 0.0)?);
    let end = relative(integer_arg(interp, &arg(args, 1), len)?);
    if start >= end {
        return Ok(JsValue::from(""));
    }
    Ok(JsValue::String(s.substring(start, end)))
}

pub fn string_to_upper_case(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?;
    Ok(JsValue::from(s.as_str().to_uppercase()))
}

pub fn string_to_lower_case(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?;
    Ok(JsValue::from(s.as_str().to_lowercase()))
}

/// String.prototype.split(separator, limit)
pub fn string_split(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(interp, &this)?;
    let limit = match arg(args, 1) {
        JsValue::Undefined => u32::MAX,
        value => to_uint32(interp.to_number(&value)?),
    };
    let separator = arg(args, 0);

    if let JsValue::Object(re) = &separator
        && let Some(parts) = super::regexp::split(interp, re, s.as_str(), limit)?
    {
        return Ok(JsValue::Object(interp.create_array(parts)));
    }

    let mut parts: Vec<JsValue> = match separator {
        JsValue::Undefined => vec![JsValue::String(s)],
        sep => {
            let sep = interp.to_string(&sep)?;
            if sep.is_empty() {
                s.to_utf16().chunks(1).map(from_units).collect()
            } else {
                s.as_str().split(sep.as_str()).map(JsValue::from).collect()
            }
        }
    };
    parts.truncate(limit as usize);
    Ok(JsValue::Object(interp.create_array(parts)))
}

/// String.prototype.concat(...values)
pub fn string_concat(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut out = this_string(interp, &this)?.to_string();
    for value in args {
        out.push_str(interp.to_string(value)?.as_str());
    }
    Ok(JsValue::from(out))
}

/// String.prototype.toString / valueOf: only strings and String objects
pub fn string_value_of(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    match &this {
        JsValue::String(_) => Ok(this),
        JsValue::Object(obj) => match &obj.borrow().data {
            ObjectData::String(s) => Ok(JsValue::String(s.value.clone())),
            _ => Err(JsError::type_error(ErrorCode::STRING_EXPECTED, "String expected")),
        },
        _ => Err(JsError::type_error(ErrorCode::STRING_EXPECTED, "String expected")),
    }
}
