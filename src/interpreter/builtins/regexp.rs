//! RegExp built-in methods
//!
//! Matching is done by fancy-regex when the `regex` feature is enabled.
//! Without it, RegExp objects can still be created and inspected, but
//! matching raises an error.

use crate::error::{ErrorCode, ErrorKind, JsError};
use crate::interpreter::Interpreter;
use crate::object::{BuiltinProp, ObjectData, PropFlags, RegExpData, RegExpFlags, get_member, put_member};
use crate::value::{JsObjectRef, JsString, JsValue};

use super::arg;

pub static REGEXP_PROPS: &[BuiltinProp] = &[
    BuiltinProp {
        name: "source",
        flags: PropFlags::NONE,
        get: regexp_source,
        set: None,
    },
    BuiltinProp {
        name: "global",
        flags: PropFlags::NONE,
        get: regexp_global,
        set: None,
    },
    BuiltinProp {
        name: "ignoreCase",
        flags: PropFlags::NONE,
        get: regexp_ignore_case,
        set: None,
    },
    BuiltinProp {
        name: "multiline",
        flags: PropFlags::NONE,
        get: regexp_multiline,
        set: None,
    },
];

/// Initialize RegExp.prototype and publish the RegExp constructor
pub fn init_regexp(interp: &mut Interpreter) {
    let proto = interp.regexp_prototype.clone();

    interp.register_method(&proto, "test", regexp_test, 1);
    interp.register_method(&proto, "exec", regexp_exec, 1);
    interp.register_method(&proto, "toString", regexp_to_string, 0);

    let constructor = interp.create_constructor("RegExp", regexp_call, regexp_construct, 2, &proto);
    interp.define_global("RegExp", JsValue::Object(constructor));
}

fn regexp_syntax_error(message: impl Into<String>) -> JsError {
    JsError::runtime(ErrorKind::Syntax, ErrorCode::REGEXP_SYNTAX, message)
}

/// Create a RegExp object from a pattern and flag string
pub fn create_regexp(interp: &mut Interpreter, pattern: &JsString, flags: &str) -> Result<JsObjectRef, JsError> {
    let Some(parsed) = RegExpFlags::parse(flags) else {
        return Err(regexp_syntax_error(format!("Invalid regular expression flags '{}'", flags)));
    };
    let data = RegExpData {
        source: pattern.clone(),
        flags: parsed,
        #[cfg(feature = "regex")]
        compiled: std::rc::Rc::new(engine::compile(pattern.as_str(), parsed)?),
    };
    let obj = interp.alloc(ObjectData::RegExp(data), Some(interp.regexp_prototype.clone()));
    let last_index_key = interp.intern("lastIndex");
    obj.borrow_mut().set_own(last_index_key, JsValue::Int(0), PropFlags::WRITABLE);
    Ok(obj)
}

fn regexp_data(this: &JsValue) -> Result<(JsObjectRef, RegExpData), JsError> {
    if let JsValue::Object(obj) = this
        && let ObjectData::RegExp(data) = &obj.borrow().data
    {
        return Ok((obj.clone(), data.clone()));
    }
    Err(JsError::type_error(ErrorCode::REGEXP_EXPECTED, "Regular Expression object expected"))
}

fn flags_of(obj: &JsObjectRef) -> Option<RegExpFlags> {
    match &obj.borrow().data {
        ObjectData::RegExp(data) => Some(data.flags),
        _ => None,
    }
}

fn regexp_source(_interp: &mut Interpreter, obj: &JsObjectRef) -> Result<JsValue, JsError> {
    Ok(match &obj.borrow().data {
        ObjectData::RegExp(data) => JsValue::String(data.source.clone()),
        _ => JsValue::Undefined,
    })
}

fn regexp_global(_interp: &mut Interpreter, obj: &JsObjectRef) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(flags_of(obj).is_some_and(|f| f.global)))
}

fn regexp_ignore_case(_interp: &mut Interpreter, obj: &JsObjectRef) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(flags_of(obj).is_some_and(|f| f.ignore_case)))
}

fn regexp_multiline(_interp: &mut Interpreter, obj: &JsObjectRef) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(flags_of(obj).is_some_and(|f| f.multiline)))
}

/// Pattern and flags from constructor arguments. A RegExp pattern
/// contributes its source, and its flags when none are given.
fn constructor_parts(interp: &mut Interpreter, args: &[JsValue]) -> Result<(JsString, String), JsError> {
    let flags_arg = arg(args, 1);
    if let Ok((_, data)) = regexp_data(&arg(args, 0)) {
        if !matches!(flags_arg, JsValue::Undefined) {
            return Err(JsError::type_error(
                ErrorCode::REGEXP_SYNTAX,
                "Cannot supply flags when constructing one RegExp from another",
            ));
        }
        return Ok((data.source, data.flags.to_string()));
    }
    let pattern = match arg(args, 0) {
        JsValue::Undefined => JsString::default(),
        value => interp.to_string(&value)?,
    };
    let flags = match flags_arg {
        JsValue::Undefined => String::new(),
        value => interp.to_string(&value)?.to_string(),
    };
    Ok((pattern, flags))
}

/// RegExp(pattern, flags) without `new` returns a RegExp argument unchanged
pub fn regexp_call(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    if let [JsValue::Object(obj)] = args
        && matches!(obj.borrow().data, ObjectData::RegExp(_))
    {
        return Ok(JsValue::Object(obj.clone()));
    }
    regexp_construct(interp, JsValue::Undefined, args)
}

pub fn regexp_construct(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (pattern, flags) = constructor_parts(interp, args)?;
    Ok(JsValue::Object(create_regexp(interp, &pattern, &flags)?))
}

/// RegExp.prototype.toString(): "/source/flags"
pub fn regexp_to_string(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, data) = regexp_data(&this)?;
    Ok(JsValue::from(format!("/{}/{}", data.source, data.flags)))
}

/// RegExp.prototype.test(string)
pub fn regexp_test(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let matched = regexp_exec(interp, this, args)?;
    Ok(JsValue::Boolean(!matches!(matched, JsValue::Null)))
}

/// RegExp.prototype.exec(string)
///
/// Global expressions start at `lastIndex` and advance it past the match;
/// a failed match resets it to 0.
pub fn regexp_exec(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (obj, data) = regexp_data(&this)?;
    let input = interp.to_string(&arg(args, 0))?;
    let last_index_key = interp.intern("lastIndex");

    let start = if data.flags.global {
        let last_index = get_member(interp, &obj, "lastIndex")?;
        let n = interp.to_number(&last_index)?;
        if !(0.0..=input.len() as f64).contains(&n) {
            put_member(interp, &obj, &last_index_key, JsValue::Int(0))?;
            return Ok(JsValue::Null);
        }
        n as usize
    } else {
        0
    };

    let Some(found) = engine::exec_at(&data, input.as_str(), start)? else {
        if data.flags.global {
            put_member(interp, &obj, &last_index_key, JsValue::Int(0))?;
        }
        return Ok(JsValue::Null);
    };

    if data.flags.global {
        put_member(interp, &obj, &last_index_key, JsValue::number(found.end as f64))?;
    }
    let groups = found
        .groups
        .into_iter()
        .map(|g| g.map_or(JsValue::Undefined, JsValue::from))
        .collect();
    let result = interp.create_array(groups);
    let index_key = interp.intern("index");
    let input_key = interp.intern("input");
    {
        let mut r = result.borrow_mut();
        r.set_own(index_key, JsValue::number(found.start as f64), PropFlags::ALL);
        r.set_own(input_key, JsValue::String(input), PropFlags::ALL);
    }
    Ok(JsValue::Object(result))
}

/// Split `input` around the matches of a RegExp separator. Returns `None`
/// when `separator` is not a RegExp.
pub(crate) fn split(
    _interp: &mut Interpreter,
    separator: &JsObjectRef,
    input: &str,
    limit: u32,
) -> Result<Option<Vec<JsValue>>, JsError> {
    let data = match &separator.borrow().data {
        ObjectData::RegExp(data) => data.clone(),
        _ => return Ok(None),
    };
    let mut parts = engine::split(&data, input)?;
    parts.truncate(limit as usize);
    Ok(Some(parts))
}

/// One successful match, with positions in UTF-16 code units
struct Found {
    start: usize,
    end: usize,
    groups: Vec<Option<String>>,
}

#[cfg(feature = "regex")]
mod engine {
    use fancy_regex::Regex;

    use super::{Found, regexp_syntax_error};
    use crate::error::{ErrorCode, JsError};
    use crate::object::{RegExpData, RegExpFlags};
    use crate::value::JsValue;

    pub(super) fn compile(pattern: &str, flags: RegExpFlags) -> Result<Regex, JsError> {
        let mut prefix = String::new();
        if flags.ignore_case {
            prefix.push('i');
        }
        if flags.multiline {
            prefix.push('m');
        }
        let source = if prefix.is_empty() {
            pattern.to_string()
        } else {
            format!("(?{}){}", prefix, pattern)
        };
        Regex::new(&source).map_err(|e| regexp_syntax_error(format!("Syntax error in regular expression: {}", e)))
    }

    fn match_failed(err: fancy_regex::Error) -> JsError {
        JsError::runtime(
            crate::error::ErrorKind::Error,
            ErrorCode::REGEXP_SYNTAX,
            format!("Regular expression failed: {}", err),
        )
    }

    fn utf16_to_byte(s: &str, units: usize) -> usize {
        let mut count = 0;
        for (byte, c) in s.char_indices() {
            if count >= units {
                return byte;
            }
            count += c.len_utf16();
        }
        s.len()
    }

    fn byte_to_utf16(s: &str, byte: usize) -> usize {
        s.get(..byte).map_or(0, |p| p.encode_utf16().count())
    }

    pub(super) fn exec_at(data: &RegExpData, input: &str, start: usize) -> Result<Option<Found>, JsError> {
        let pos = utf16_to_byte(input, start);
        let Some(caps) = data.compiled.captures_from_pos(input, pos).map_err(match_failed)? else {
            return Ok(None);
        };
        let Some(whole) = caps.get(0) else {
            return Ok(None);
        };
        let groups = (0..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
            .collect();
        Ok(Some(Found {
            start: byte_to_utf16(input, whole.start()),
            end: byte_to_utf16(input, whole.end()),
            groups,
        }))
    }

    /// Pieces between matches, with capture groups spliced in
    pub(super) fn split(data: &RegExpData, input: &str) -> Result<Vec<JsValue>, JsError> {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in data.compiled.captures_iter(input) {
            let caps = caps.map_err(match_failed)?;
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() == whole.end() && (whole.end() == 0 || whole.start() >= input.len()) {
                continue;
            }
            parts.push(JsValue::from(input.get(last..whole.start()).unwrap_or("")));
            for i in 1..caps.len() {
                parts.push(caps.get(i).map_or(JsValue::Undefined, |m| JsValue::from(m.as_str())));
            }
            last = whole.end();
        }
        parts.push(JsValue::from(input.get(last..).unwrap_or("")));
        Ok(parts)
    }
}

#[cfg(not(feature = "regex"))]
mod engine {
    use super::Found;
    use crate::error::{ErrorCode, JsError};
    use crate::object::RegExpData;
    use crate::value::JsValue;

    fn disabled() -> JsError {
        JsError::type_error(ErrorCode::UNSUPPORTED_ACTION, "Regular expression support is disabled")
    }

    pub(super) fn exec_at(_data: &RegExpData, _input: &str, _start: usize) -> Result<Option<Found>, JsError> {
        Err(disabled())
    }

    pub(super) fn split(_data: &RegExpData, _input: &str) -> Result<Vec<JsValue>, JsError> {
        Err(disabled())
    }
}
