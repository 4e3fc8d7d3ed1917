//! eval tests: caller scope, variable object and `this`

use super::{create_test_engine, eval};
use jscore::{ErrorCode, JsError, JsValue};

#[test]
fn test_eval_returns_completion_value() {
    assert_eq!(eval("eval('1 + 2')"), JsValue::Int(3));
    assert_eq!(eval("eval('var q = 1; q + 1;')"), JsValue::Int(2));
    assert_eq!(eval("eval(5)"), JsValue::Int(5));
}

#[test]
fn test_eval_sees_caller_locals() {
    assert_eq!(eval("function f() { var local = 10; return eval('local * 2'); } f()"), JsValue::Int(20));
}

#[test]
fn test_eval_declares_in_caller_variable_object() {
    assert_eq!(
        eval("function f() { eval('var made = 3'); return made; } f() + ',' + typeof made"),
        JsValue::from("3,undefined")
    );
}

#[test]
fn test_eval_uses_caller_this() {
    assert_eq!(
        eval("var o = { v: 'mine', get: function() { return eval('this.v'); } }; o.get()"),
        JsValue::from("mine")
    );
}

#[test]
fn test_eval_syntax_error_is_catchable() {
    assert_eq!(
        eval("var r; try { eval('var = ;'); } catch (e) { r = e instanceof SyntaxError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_eval_function_declaration() {
    assert_eq!(eval("eval('function made() { return 9; }'); made()"), JsValue::Int(9));
}

#[test]
fn test_deeply_nested_source_is_a_syntax_error() {
    let source = r#"
        var src = '1';
        for (var i = 0; i < 5000; i++) src = '(' + src + ')';
        var r;
        try { eval(src); } catch (e) { r = (e instanceof SyntaxError) + ' ' + (e.number & 0xFFFF); }
        r
    "#;
    assert_eq!(eval(source), JsValue::from("true 28"));

    let mut engine = create_test_engine();
    let deep = format!("{}1{}", "[".repeat(5000), "]".repeat(5000));
    let err = engine.eval(&deep).unwrap_err();
    assert!(matches!(err, JsError::Syntax { .. }));
    assert_eq!(err.code(), ErrorCode::STACK_OVERFLOW);
}
