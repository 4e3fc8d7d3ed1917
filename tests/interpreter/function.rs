//! Function tests: closures, arguments, call/apply, constructors, Function()

use super::{eval, eval_result, throws_error};
use jscore::JsValue;

#[test]
fn test_closure_captures_variable() {
    let source = r#"
        function counter() {
            var n = 0;
            return function() { return ++n; };
        }
        var c = counter();
        c(); c();
        c()
    "#;
    assert_eq!(eval(source), JsValue::Int(3));
}

#[test]
fn test_closures_share_activation() {
    let source = r#"
        function pair() {
            var v = 1;
            return { get: function() { return v; }, set: function(x) { v = x; } };
        }
        var p = pair();
        p.set(9);
        p.get()
    "#;
    assert_eq!(eval(source), JsValue::Int(9));
}

#[test]
fn test_function_hoisting() {
    assert_eq!(eval("var r = f(); function f() { return 'hoisted'; } r"), JsValue::from("hoisted"));
}

#[test]
fn test_named_function_expression_binds_own_name() {
    assert_eq!(
        eval("var fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); }; fact(5)"),
        JsValue::Int(120)
    );
    assert_eq!(eval("var g = function h() {}; typeof h"), JsValue::from("undefined"));
}

#[test]
fn test_missing_arguments_are_undefined() {
    assert_eq!(eval("function f(a, b) { return typeof b; } f(1)"), JsValue::from("undefined"));
}

#[test]
fn test_arguments_object() {
    assert_eq!(eval("function f() { return arguments.length; } f(1, 2, 3)"), JsValue::Int(3));
    assert_eq!(eval("function f() { return arguments[1]; } f('a', 'b')"), JsValue::from("b"));
}

#[test]
fn test_arguments_alias_parameters() {
    assert_eq!(eval("function f(a) { arguments[0] = 10; return a; } f(1)"), JsValue::Int(10));
    assert_eq!(eval("function f(a) { a = 7; return arguments[0]; } f(1)"), JsValue::Int(7));
}

#[test]
fn test_arguments_callee() {
    assert_eq!(
        eval("var f = function(n) { return n ? n + arguments.callee(n - 1) : 0; }; f(4)"),
        JsValue::Int(10)
    );
}

#[test]
fn test_function_length() {
    assert_eq!(eval("function f(a, b, c) {} f.length"), JsValue::Int(3));
    assert_eq!(eval("Math.max.length"), JsValue::Int(2));
}

#[test]
fn test_call_and_apply() {
    let source = r#"
        function who(greeting, punct) { return greeting + ' ' + this.name + punct; }
        var o = { name: 'o' };
        who.call(o, 'hi', '!') + '|' + who.apply(o, ['bye', '?'])
    "#;
    assert_eq!(eval(source), JsValue::from("hi o!|bye o?"));
}

#[test]
fn test_method_call_this() {
    assert_eq!(
        eval("var o = { v: 4, get: function() { return this.v; } }; o.get()"),
        JsValue::Int(4)
    );
}

#[test]
fn test_plain_call_this_is_global() {
    assert_eq!(
        eval("var v = 'global'; function f() { return this.v; } f()"),
        JsValue::from("global")
    );
}

#[test]
fn test_constructor() {
    let source = r#"
        function Point(x, y) { this.x = x; this.y = y; }
        Point.prototype.sum = function() { return this.x + this.y; };
        var p = new Point(2, 3);
        [p.sum(), p instanceof Point, p.constructor === Point].join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("5,true,true"));
}

#[test]
fn test_constructor_returning_object() {
    assert_eq!(
        eval("function F() { this.a = 1; return { a: 2 }; } new F().a"),
        JsValue::Int(2)
    );
    assert_eq!(
        eval("function F() { this.a = 1; return 5; } new F().a"),
        JsValue::Int(1)
    );
}

#[test]
fn test_calling_non_function_fails() {
    assert!(throws_error("var o = {}; o.missing();", "missing"));
    assert!(eval_result("var x = 1; x();").is_err());
}

#[test]
fn test_function_constructor() {
    assert_eq!(eval("var add = new Function('a', 'b', 'return a + b;'); add(2, 3)"), JsValue::Int(5));
    assert_eq!(eval("Function('return 7')()"), JsValue::Int(7));
}

#[test]
fn test_function_constructor_rejects_injection() {
    assert_eq!(
        eval("var r; try { Function('a) { return 1; }; (function(', 'return 2'); } catch (e) { r = e instanceof SyntaxError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_function_to_string() {
    assert_eq!(
        eval("function f(a) { return a; } f.toString()"),
        JsValue::from("function f(a) { return a; }")
    );
    assert!(
        eval("String(Math.abs)")
            .to_js_string()
            .as_str()
            .contains("[native code]")
    );
}

#[test]
fn test_recursion() {
    assert_eq!(
        eval("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(15)"),
        JsValue::Int(610)
    );
}
