//! Global functions and constants

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::PropFlags;
use crate::value::{JsValue, string_to_number};

use super::arg;

/// Install `undefined`, `NaN`, `Infinity` and the global functions
pub fn init_globals(interp: &mut Interpreter) {
    let global = interp.global.clone();
    for (name, value) in [
        ("undefined", JsValue::Undefined),
        ("NaN", JsValue::Number(f64::NAN)),
        ("Infinity", JsValue::Number(f64::INFINITY)),
    ] {
        let key = interp.intern(name);
        global.borrow_mut().set_own(key, value, PropFlags::NONE);
    }

    interp.register_method(&global, "eval", global_eval, 1);
    interp.register_method(&global, "isNaN", global_is_nan, 1);
    interp.register_method(&global, "isFinite", global_is_finite, 1);
    interp.register_method(&global, "parseInt", global_parse_int, 2);
    interp.register_method(&global, "parseFloat", global_parse_float, 1);
    interp.register_method(&global, "CollectGarbage", global_collect_garbage, 0);
}

/// eval(source)
///
/// Called directly from script, the code runs in the caller's scope chain,
/// variable object and `this`; any other call runs it as global code.
pub fn global_eval(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::String(source) = arg(args, 0) else {
        return Ok(arg(args, 0));
    };
    let context = interp.caller.clone();
    interp.eval_in(source.as_str(), context)
}

pub fn global_is_nan(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = interp.to_number(&arg(args, 0))?;
    Ok(JsValue::Boolean(n.is_nan()))
}

pub fn global_is_finite(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = interp.to_number(&arg(args, 0))?;
    Ok(JsValue::Boolean(n.is_finite()))
}

/// parseInt(string, radix)
///
/// Without a radix, a leading `0x` selects hexadecimal and a leading `0`
/// selects octal.
pub fn global_parse_int(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let input = interp.to_string(&arg(args, 0))?;
    let radix = interp.to_int32(&arg(args, 1))?;
    Ok(JsValue::number(parse_int(input.as_str(), radix)))
}

pub(crate) fn parse_int(input: &str, radix: i32) -> f64 {
    let s = input.trim_start();
    let (negative, s) = match s.chars().next() {
        Some('-') => (true, s.get(1..).unwrap_or("")),
        Some('+') => (false, s.get(1..).unwrap_or("")),
        _ => (false, s),
    };
    let has_hex_prefix = s.starts_with("0x") || s.starts_with("0X");
    let (radix, digits) = match radix {
        0 if has_hex_prefix => (16, s.get(2..).unwrap_or("")),
        0 if s.starts_with('0') && s.len() > 1 => (8, s.get(1..).unwrap_or("")),
        0 => (10, s),
        16 if has_hex_prefix => (16, s.get(2..).unwrap_or("")),
        r if (2..=36).contains(&r) => (r as u32, s),
        _ => return f64::NAN,
    };

    let mut value = 0.0f64;
    let mut any = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        value = value * f64::from(radix) + f64::from(d);
        any = true;
    }
    if !any {
        return f64::NAN;
    }
    if negative { -value } else { value }
}

/// parseFloat(string): the longest numeric prefix
pub fn global_parse_float(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let input = interp.to_string(&arg(args, 0))?;
    Ok(JsValue::number(parse_float(input.as_str())))
}

pub(crate) fn parse_float(input: &str) -> f64 {
    let s = input.trim_start();
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    if unsigned.starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'+' | b'-' if i == 0 => {}
            b'0'..=b'9' => {
                seen_digit = true;
                end = i + 1;
            }
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => {
                seen_exp = true;
                if matches!(bytes.get(i + 1), Some(b'+' | b'-')) {
                    i += 1;
                }
            }
            _ => break,
        }
        i += 1;
    }
    if !seen_digit {
        return f64::NAN;
    }
    s.get(..end).map_or(f64::NAN, string_to_number)
}

/// CollectGarbage(): run the cycle collector now
pub fn global_collect_garbage(interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    interp.collect_garbage()?;
    Ok(JsValue::Undefined)
}
