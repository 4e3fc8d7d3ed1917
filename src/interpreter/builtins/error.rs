//! Error constructors: Error, EvalError, RangeError, ReferenceError,
//! SyntaxError, TypeError, URIError

use crate::error::{ErrorKind, JsError};
use crate::interpreter::Interpreter;
use crate::object::{PropFlags, get_member};
use crate::value::JsValue;

use super::arg;

/// Set up the seven error prototypes and publish their constructors
pub fn init_errors(interp: &mut Interpreter) {
    let base = interp.error_prototype(ErrorKind::Error);
    interp.register_method(&base, "toString", error_to_string, 0);

    for kind in ErrorKind::ALL {
        let proto = interp.error_prototype(kind);
        let name_key = interp.intern("name");
        let message_key = interp.intern("message");
        {
            let mut p = proto.borrow_mut();
            p.set_own(name_key, JsValue::from(kind.name()), PropFlags::HIDDEN);
            p.set_own(message_key, JsValue::from(""), PropFlags::HIDDEN);
        }

        let func = constructor_for(kind);
        let constructor = interp.create_constructor(kind.name(), func, func, 1, &proto);
        interp.define_global(kind.name(), JsValue::Object(constructor));
    }
}

fn constructor_for(kind: ErrorKind) -> crate::object::NativeFn {
    match kind {
        ErrorKind::Error => error_constructor,
        ErrorKind::Eval => eval_error_constructor,
        ErrorKind::Range => range_error_constructor,
        ErrorKind::Reference => reference_error_constructor,
        ErrorKind::Syntax => syntax_error_constructor,
        ErrorKind::Type => type_error_constructor,
        ErrorKind::Uri => uri_error_constructor,
    }
}

/// Shared body of the error constructors.
///
/// `new Error(message)` sets `message` and `description`; the two-argument
/// form `new Error(number, description)` also sets `number`.
fn construct_error(interp: &mut Interpreter, kind: ErrorKind, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (number, message) = match args {
        [number, description, ..] if number.is_number() => (Some(number.clone()), description.clone()),
        _ => (None, arg(args, 0)),
    };
    let message = match message {
        JsValue::Undefined => String::new(),
        value => interp.to_string(&value)?.to_string(),
    };

    let obj = interp.create_error(kind, None, &message);
    if let Some(number) = number {
        let number_key = interp.intern("number");
        obj.borrow_mut().set_own(number_key, number, PropFlags::HIDDEN);
    }
    Ok(JsValue::Object(obj))
}

pub fn error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    construct_error(interp, ErrorKind::Error, args)
}

pub fn eval_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    construct_error(interp, ErrorKind::Eval, args)
}

pub fn range_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    construct_error(interp, ErrorKind::Range, args)
}

pub fn reference_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    construct_error(interp, ErrorKind::Reference, args)
}

pub fn syntax_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    construct_error(interp, ErrorKind::Syntax, args)
}

pub fn type_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    construct_error(interp, ErrorKind::Type, args)
}

pub fn uri_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    construct_error(interp, ErrorKind::Uri, args)
}

/// Error.prototype.toString(): "name: message"
pub fn error_to_string(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(obj) = &this else {
        return Err(JsError::object_expected());
    };
    let name = match get_member(interp, obj, "name")? {
        JsValue::Undefined => "Error".to_string(),
        value => interp.to_string(&value)?.to_string(),
    };
    let message = match get_member(interp, obj, "message")? {
        JsValue::Undefined => String::new(),
        value => interp.to_string(&value)?.to_string(),
    };
    Ok(JsValue::from(match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{}: {}", name, message),
    }))
}
