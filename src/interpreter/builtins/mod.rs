//! Built-in objects of the global environment

pub mod array;
pub mod boolean;
pub mod date;
pub mod error;
pub mod function;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod regexp;
pub mod string;
pub mod weakmap;

use crate::value::JsValue;

use super::Interpreter;

/// Populate the global object. Prototype objects already exist; this wires
/// their methods and publishes the constructors.
pub fn init_realm(interp: &mut Interpreter) {
    object::init_object(interp);
    function::init_function(interp);
    array::init_array(interp);
    string::init_string(interp);
    number::init_number(interp);
    boolean::init_boolean(interp);
    date::init_date(interp);
    error::init_errors(interp);
    regexp::init_regexp(interp);
    weakmap::init_weakmap(interp);

    let math = math::create_math_object(interp);
    interp.define_global("Math", JsValue::Object(math));
    let json = json::create_json_object(interp);
    interp.define_global("JSON", JsValue::Object(json));

    global::init_globals(interp);
}

/// Argument `index`, `undefined` when absent
pub(crate) fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}
