//! Function constructor and Function.prototype (call, apply, toString)

use crate::error::{ErrorCode, ErrorKind, JsError};
use crate::interpreter::{Forwarders, Interpreter};
use crate::object::{
    ArgumentsData, BuiltinProp, FunctionData, ObjectData, PropFlags, get_member,
};
use crate::parser::Parser;
use crate::value::{CheapClone, JsObjectRef, JsValue, to_uint32};

use super::arg;

/// Builtin-table members of every function object
pub static FUNCTION_PROPS: &[BuiltinProp] = &[
    BuiltinProp {
        name: "length",
        flags: PropFlags::NONE,
        get: function_length,
        set: None,
    },
    BuiltinProp {
        name: "arguments",
        flags: PropFlags::NONE,
        get: function_arguments,
        set: None,
    },
];

/// Initialize Function.prototype and publish the Function constructor
pub fn init_function(interp: &mut Interpreter) {
    let proto = interp.function_prototype.clone();

    let call = interp.create_native_function("call", function_call, 1);
    let apply = interp.create_native_function("apply", function_apply, 2);
    for (name, method) in [("call", &call), ("apply", &apply)] {
        let key = interp.intern(name);
        proto
            .borrow_mut()
            .set_own(key, JsValue::Object(method.cheap_clone()), PropFlags::HIDDEN);
    }
    interp.forwarders = Some(Forwarders { call, apply });
    interp.register_method(&proto, "toString", function_to_string, 0);

    let constructor = interp.create_constructor(
        "Function",
        function_constructor_fn,
        function_constructor_fn,
        1,
        &proto,
    );
    interp.define_global("Function", JsValue::Object(constructor));
}

/// Function.prototype is itself callable and returns undefined
pub fn function_prototype_call(_interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Undefined)
}

fn function_length(_interp: &mut Interpreter, obj: &JsObjectRef) -> Result<JsValue, JsError> {
    let length = obj.borrow().as_function().map_or(0, FunctionData::length);
    Ok(JsValue::Int(length as i32))
}

/// `f.arguments`: the arguments of the innermost active call of `f`, or null
fn function_arguments(interp: &mut Interpreter, obj: &JsObjectRef) -> Result<JsValue, JsError> {
    let object_prototype = interp.object_prototype.cheap_clone();
    let Some(frame) = interp.call_stack.iter_mut().rev().find(|f| f.callee == *obj) else {
        return Ok(JsValue::Null);
    };
    if let Some(arguments) = &frame.arguments {
        return Ok(JsValue::Object(arguments.cheap_clone()));
    }
    let args = frame.args.clone();
    let arguments = interp.alloc(
        ObjectData::Arguments(ArgumentsData {
            var_obj: None,
            values: args.clone(),
            mapped: Vec::new(),
        }),
        Some(object_prototype),
    );
    let length_key = interp.intern("length");
    let callee_key = interp.intern("callee");
    {
        let mut a = arguments.borrow_mut();
        a.set_own(length_key, JsValue::Int(args.len() as i32), PropFlags::HIDDEN);
        a.set_own(callee_key, JsValue::Object(obj.cheap_clone()), PropFlags::HIDDEN);
    }
    if let Some(frame) = interp.call_stack.iter_mut().rev().find(|f| f.callee == *obj) {
        frame.arguments = Some(arguments.cheap_clone());
    }
    Ok(JsValue::Object(arguments))
}

/// new Function([p1[, p2[, ...pN]],] body)
///
/// The function is created in the global scope.
pub fn function_constructor_fn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (params, body) = match args.split_last() {
        Some((body, params)) => {
            let body = interp.to_string(body)?;
            let mut names = Vec::with_capacity(params.len());
            for p in params {
                names.push(interp.to_string(p)?.to_string());
            }
            (names.join(","), body.to_string())
        }
        None => (String::new(), String::new()),
    };

    // Parameters and body must each be well formed on their own, so that
    // neither can close the function early
    let checked = Parser::new(&params, &mut interp.string_dict)
        .parse_formal_parameters()
        .and_then(|_| Parser::new(&body, &mut interp.string_dict).parse_program(false).map(|_| ()));
    if let Err(err) = checked {
        return Err(match err {
            JsError::Syntax { code, message, .. } => JsError::runtime(ErrorKind::Syntax, code, message),
            other => other,
        });
    }

    let source = format!("(function anonymous({}) {{\n{}\n}})", params, body);
    interp.eval_in(&source, None)
}

/// Function.prototype.call(thisArg, ...args)
pub fn function_call(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let this_arg = arg(args, 0);
    let rest = args.get(1..).unwrap_or(&[]);
    interp.call_function(&this, this_arg, rest)
}

/// Function.prototype.apply(thisArg, argsArray)
pub fn function_apply(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let this_arg = arg(args, 0);
    let call_args = apply_arguments(interp, &arg(args, 1))?;
    interp.call_function(&this, this_arg, &call_args)
}

/// Argument list of `apply`: nothing for null or undefined, else an array-like
pub(crate) fn apply_arguments(interp: &mut Interpreter, list: &JsValue) -> Result<Vec<JsValue>, JsError> {
    match list {
        JsValue::Undefined | JsValue::Null => Ok(Vec::new()),
        JsValue::Object(list) => array_like_to_vec(interp, list),
        _ => Err(JsError::type_error(
            ErrorCode::OBJECT_EXPECTED,
            "Array or arguments object expected",
        )),
    }
}

/// Elements `0..length` of an array-like object
pub(crate) fn array_like_to_vec(interp: &mut Interpreter, list: &JsObjectRef) -> Result<Vec<JsValue>, JsError> {
    let length = get_member(interp, list, "length")?;
    let length = to_uint32(interp.to_number(&length)?);
    let mut values = Vec::with_capacity(length as usize);
    for i in 0..length {
        values.push(get_member(interp, list, &i.to_string())?);
    }
    Ok(values)
}

/// Function.prototype.toString(): source text, or a native-code stub
pub fn function_to_string(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(obj) = &this else {
        return Err(JsError::function_expected());
    };
    let data = obj.borrow().as_function().cloned();
    match data {
        Some(FunctionData::Source(f)) => {
            let text = f.code.function_source(f.func_id).unwrap_or("function () {}");
            Ok(JsValue::from(text))
        }
        Some(FunctionData::Native(f)) => Ok(JsValue::from(format!(
            "\nfunction {}() {{\n    [native code]\n}}\n",
            f.name
        ))),
        None => Err(JsError::function_expected()),
    }
}
