//! Error constructor tests

use super::eval;
use jscore::JsValue;

#[test]
fn test_error_properties() {
    assert_eq!(eval("var e = new Error('boom'); e.name + ':' + e.message"), JsValue::from("Error:boom"));
    assert_eq!(eval("new Error('boom').description"), JsValue::from("boom"));
    assert_eq!(eval("new Error().message"), JsValue::from(""));
}

#[test]
fn test_error_to_string() {
    assert_eq!(eval("String(new TypeError('bad'))"), JsValue::from("TypeError: bad"));
    assert_eq!(eval("new RangeError('r').toString()"), JsValue::from("RangeError: r"));
}

#[test]
fn test_error_number_form() {
    assert_eq!(eval("var e = new Error(42, 'described'); e.number + ':' + e.message"), JsValue::from("42:described"));
}

#[test]
fn test_error_kinds_inherit_from_error() {
    let source = r#"
        var kinds = [EvalError, RangeError, ReferenceError, SyntaxError, TypeError, URIError];
        var ok = true;
        for (var i = 0; i < kinds.length; i++) {
            var e = new kinds[i]('m');
            ok = ok && e instanceof kinds[i] && e instanceof Error;
        }
        ok
    "#;
    assert_eq!(eval(source), JsValue::Boolean(true));
}

#[test]
fn test_error_called_without_new() {
    assert_eq!(eval("Error('x') instanceof Error"), JsValue::Boolean(true));
}

#[test]
fn test_engine_errors_carry_number() {
    assert_eq!(
        eval("var n; try { undefinedThing; } catch (e) { n = e.number; } n"),
        JsValue::Int(jscore::ErrorCode::UNDEFINED_VARIABLE.number())
    );
}
