//! Array built-in methods
//!
//! Elements are ordinary properties named by their index; the class keeps
//! only `length`, which grows through the `on_put` hook and truncates through
//! the builtin setter. Methods go through generic property access, so they
//! also work on array-likes such as `arguments`.

use crate::error::{ErrorCode, JsError};
use crate::interpreter::Interpreter;
use crate::object::{
    ArrayData, BuiltinProp, ObjectData, PropFlags, delete_member, get_member, has_property, put_member,
};
use crate::value::{JsObjectRef, JsString, JsValue, array_index, to_uint32};

use super::arg;

pub static ARRAY_PROPS: &[BuiltinProp] = &[BuiltinProp {
    name: "length",
    flags: PropFlags::WRITABLE,
    get: array_length_get,
    set: Some(array_length_set),
}];

/// Initialize Array.prototype and publish the Array constructor.
/// The prototype object must already exist in `interp.array_prototype`.
pub fn init_array(interp: &mut Interpreter) {
    let proto = interp.array_prototype.clone();

    interp.register_method(&proto, "push", array_push, 1);
    interp.register_method(&proto, "pop", array_pop, 0);
    interp.register_method(&proto, "shift", array_shift, 0);
    interp.register_method(&proto, "unshift", array_unshift, 1);
    interp.register_method(&proto, "reverse", array_reverse, 0);

    interp.register_method(&proto, "concat", array_concat, 1);
    interp.register_method(&proto, "slice", array_slice, 2);
    interp.register_method(&proto, "join", array_join, 1);
    interp.register_method(&proto, "toString", array_to_string, 0);
    interp.register_method(&proto, "indexOf", array_index_of, 1);

    let constructor = interp.create_constructor("Array", array_constructor_fn, array_constructor_fn, 1, &proto);
    interp.define_global("Array", JsValue::Object(constructor));
}

fn array_length_get(_interp: &mut Interpreter, obj: &JsObjectRef) -> Result<JsValue, JsError> {
    let length = match &obj.borrow().data {
        ObjectData::Array(a) => a.length,
        _ => 0,
    };
    Ok(JsValue::number(f64::from(length)))
}

/// Setting `length` below the current value deletes the trailing elements
fn array_length_set(interp: &mut Interpreter, obj: &JsObjectRef, value: JsValue) -> Result<(), JsError> {
    let n = interp.to_number(&value)?;
    let length = to_uint32(n);
    if f64::from(length) != n {
        return Err(JsError::range_error(ErrorCode::INVALID_LENGTH, "Array length must be a finite positive integer"));
    }

    let mut o = obj.borrow_mut();
    let doomed: Vec<_> = o
        .props
        .iter()
        .filter(|(_, slot)| slot.kind.is_own())
        .filter(|(_, slot)| array_index(slot.name.as_str()).is_some_and(|i| i >= length))
        .map(|(id, _)| id)
        .collect();
    for id in doomed {
        o.props.tombstone(id);
    }
    if let ObjectData::Array(a) = &mut o.data {
        a.length = length;
    }
    Ok(())
}

/// Array(len) / Array(e0, e1, ...), with or without `new`
pub fn array_constructor_fn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    if let [len] = args
        && len.is_number()
    {
        let n = len.to_number();
        let length = to_uint32(n);
        if f64::from(length) != n {
            return Err(JsError::range_error(ErrorCode::INVALID_LENGTH, "Array length must be a finite positive integer"));
        }
        let arr = interp.alloc(
            ObjectData::Array(ArrayData { length }),
            Some(interp.array_prototype.clone()),
        );
        return Ok(JsValue::Object(arr));
    }
    Ok(JsValue::Object(interp.create_array(args.to_vec())))
}

// ═══════════════════════════════════════════════════════════════════════════
// Element helpers
// ═══════════════════════════════════════════════════════════════════════════

fn index_key(index: u32) -> JsString {
    JsString::from(index.to_string())
}

fn length_of(interp: &mut Interpreter, obj: &JsObjectRef) -> Result<u32, JsError> {
    let length = get_member(interp, obj, "length")?;
    Ok(to_uint32(interp.to_number(&length)?))
}

fn set_length(interp: &mut Interpreter, obj: &JsObjectRef, length: u32) -> Result<(), JsError> {
    let key = interp.intern("length");
    put_member(interp, obj, &key, JsValue::number(f64::from(length)))
}

fn get_index(interp: &mut Interpreter, obj: &JsObjectRef, index: u32) -> Result<JsValue, JsError> {
    get_member(interp, obj, &index.to_string())
}

fn put_index(interp: &mut Interpreter, obj: &JsObjectRef, index: u32, value: JsValue) -> Result<(), JsError> {
    put_member(interp, obj, &index_key(index), value)
}

/// Move element `from` to `to`, deleting `to` when `from` is a hole
fn move_index(interp: &mut Interpreter, obj: &JsObjectRef, from: u32, to: u32) -> Result<(), JsError> {
    if has_property(obj, &from.to_string())? {
        let value = get_index(interp, obj, from)?;
        put_index(interp, obj, to, value)
    } else {
        delete_member(obj, &to.to_string()).map(|_| ())
    }
}

/// Resolve a relative start/end argument against `length`
fn relative_index(interp: &mut Interpreter, value: &JsValue, length: u32, default: u32) -> Result<u32, JsError> {
    if matches!(value, JsValue::Undefined) {
        return Ok(default);
    }
    let n = interp.to_number(value)?;
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let length = f64::from(length);
    let resolved = if n < 0.0 { (length + n).max(0.0) } else { n.min(length) };
    Ok(resolved as u32)
}

// ═══════════════════════════════════════════════════════════════════════════
// Mutators
// ═══════════════════════════════════════════════════════════════════════════

/// Array.prototype.push(...items)
pub fn array_push(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let mut length = length_of(interp, &obj)?;
    for value in args {
        put_index(interp, &obj, length, value.clone())?;
        length = length.saturating_add(1);
    }
    set_length(interp, &obj, length)?;
    Ok(JsValue::number(f64::from(length)))
}

/// Array.prototype.pop()
pub fn array_pop(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = length_of(interp, &obj)?;
    let Some(last) = length.checked_sub(1) else {
        set_length(interp, &obj, 0)?;
        return Ok(JsValue::Undefined);
    };
    let value = get_index(interp, &obj, last)?;
    delete_member(&obj, &last.to_string())?;
    set_length(interp, &obj, last)?;
    Ok(value)
}

/// Array.prototype.shift()
pub fn array_shift(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = length_of(interp, &obj)?;
    let Some(last) = length.checked_sub(1) else {
        set_length(interp, &obj, 0)?;
        return Ok(JsValue::Undefined);
    };
    let first = get_index(interp, &obj, 0)?;
    for k in 1..length {
        move_index(interp, &obj, k, k - 1)?;
    }
    delete_member(&obj, &last.to_string())?;
    set_length(interp, &obj, last)?;
    Ok(first)
}

/// Array.prototype.unshift(...items)
pub fn array_unshift(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = length_of(interp, &obj)?;
    let count = args.len() as u32;
    for k in (0..length).rev() {
        move_index(interp, &obj, k, k.saturating_add(count))?;
    }
    for (i, value) in args.iter().enumerate() {
        put_index(interp, &obj, i as u32, value.clone())?;
    }
    let length = length.saturating_add(count);
    set_length(interp, &obj, length)?;
    Ok(JsValue::number(f64::from(length)))
}

/// Array.prototype.reverse(): in place, holes included
pub fn array_reverse(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = length_of(interp, &obj)?;
    let mut lower = 0;
    while lower < length / 2 {
        let upper = length - 1 - lower;
        let lower_exists = has_property(&obj, &lower.to_string())?;
        let upper_exists = has_property(&obj, &upper.to_string())?;
        let lower_value = get_index(interp, &obj, lower)?;
        let upper_value = get_index(interp, &obj, upper)?;
        if upper_exists {
            put_index(interp, &obj, lower, upper_value)?;
        } else {
            delete_member(&obj, &lower.to_string())?;
        }
        if lower_exists {
            put_index(interp, &obj, upper, lower_value)?;
        } else {
            delete_member(&obj, &upper.to_string())?;
        }
        lower += 1;
    }
    Ok(JsValue::Object(obj))
}

// ═══════════════════════════════════════════════════════════════════════════
// Accessors
// ═══════════════════════════════════════════════════════════════════════════

/// Array.prototype.concat(...items)
pub fn array_concat(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let result = interp.create_array(Vec::new());
    let mut n: u32 = 0;

    let items = std::iter::once(JsValue::Object(obj)).chain(args.iter().cloned());
    for item in items {
        let spread = match &item {
            JsValue::Object(o) if matches!(o.borrow().data, ObjectData::Array(_)) => Some(o.clone()),
            _ => None,
        };
        match spread {
            Some(source) => {
                let length = length_of(interp, &source)?;
                for k in 0..length {
                    if has_property(&source, &k.to_string())? {
                        let value = get_index(interp, &source, k)?;
                        put_index(interp, &result, n.saturating_add(k), value)?;
                    }
                }
                n = n.saturating_add(length);
            }
            None => {
                put_index(interp, &result, n, item)?;
                n = n.saturating_add(1);
            }
        }
    }
    set_length(interp, &result, n)?;
    Ok(JsValue::Object(result))
}

/// Array.prototype.slice(start, end)
pub fn array_slice(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = length_of(interp, &obj)?;
    let start = relative_index(interp, &arg(args, 0), length, 0)?;
    let end = relative_index(interp, &arg(args, 1), length, length)?;

    let result = interp.create_array(Vec::new());
    let mut n = 0;
    for k in start..end {
        if has_property(&obj, &k.to_string())? {
            let value = get_index(interp, &obj, k)?;
            put_index(interp, &result, n, value)?;
        }
        n += 1;
    }
    set_length(interp, &result, n)?;
    Ok(JsValue::Object(result))
}

/// Array.prototype.join(separator): `undefined` and `null` elements join as
/// empty strings
pub fn array_join(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let separator = match arg(args, 0) {
        JsValue::Undefined => JsString::from(","),
        sep => interp.to_string(&sep)?,
    };
    let length = length_of(interp, &obj)?;

    let mut out = String::new();
    for k in 0..length {
        if k > 0 {
            out.push_str(separator.as_str());
        }
        let value = get_index(interp, &obj, k)?;
        if !value.is_null_or_undefined() {
            out.push_str(interp.to_string(&value)?.as_str());
        }
    }
    Ok(JsValue::from(out))
}

pub fn array_to_string(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    array_join(interp, this, &[])
}

/// Array.prototype.indexOf(search, fromIndex): strict equality, skipping holes
pub fn array_index_of(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = length_of(interp, &obj)?;
    let search = arg(args, 0);
    let start = relative_index(interp, &arg(args, 1), length, 0)?;

    for k in start..length {
        if !has_property(&obj, &k.to_string())? {
            continue;
        }
        if get_index(interp, &obj, k)?.strict_equals(&search) {
            return Ok(JsValue::number(f64::from(k)));
        }
    }
    Ok(JsValue::Int(-1))
}
