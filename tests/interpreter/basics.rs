//! Basic language feature tests: arithmetic, precedence, comparison, variables, conversions

use super::{eval, eval_result};
use jscore::{ErrorCode, JsError, JsValue};

#[test]
fn test_program_returns_last_expression() {
    assert_eq!(
        eval("var x = 1; function f(){ return x+1; } f();"),
        JsValue::Int(2)
    );
}

#[test]
fn test_deleted_property_reads_undefined() {
    assert_eq!(
        eval("var o = {}; o.a = 1; delete o.a; typeof o.a"),
        JsValue::from("undefined")
    );
}

#[test]
fn test_loop_accumulates() {
    assert_eq!(eval("for (var i=0,s=0; i<5; i++) s += i; s"), JsValue::Int(10));
}

#[test]
fn test_arithmetic() {
    assert_eq!(eval("1 + 2"), JsValue::Int(3));
    assert_eq!(eval("10 - 4"), JsValue::Int(6));
    assert_eq!(eval("3 * 4"), JsValue::Int(12));
    assert_eq!(eval("15 / 3"), JsValue::Int(5));
    assert_eq!(eval("7 / 2"), JsValue::Number(3.5));
    assert_eq!(eval("7 % 3"), JsValue::Int(1));
    assert_eq!(eval("-7 % 3"), JsValue::Int(-1));
}

#[test]
fn test_int_overflow_widens() {
    assert_eq!(eval("2147483647 + 1"), JsValue::Number(2147483648.0));
    assert_eq!(eval("65536 * 65536"), JsValue::Number(4294967296.0));
}

#[test]
fn test_precedence() {
    assert_eq!(eval("1 + 2 * 3"), JsValue::Int(7));
    assert_eq!(eval("(1 + 2) * 3"), JsValue::Int(9));
    assert_eq!(eval("1 + 2 == 3 && 4 > 3"), JsValue::Boolean(true));
}

#[test]
fn test_bitwise() {
    assert_eq!(eval("5 & 3"), JsValue::Int(1));
    assert_eq!(eval("5 | 3"), JsValue::Int(7));
    assert_eq!(eval("5 ^ 3"), JsValue::Int(6));
    assert_eq!(eval("~5"), JsValue::Int(-6));
    assert_eq!(eval("1 << 4"), JsValue::Int(16));
    assert_eq!(eval("-16 >> 2"), JsValue::Int(-4));
    assert_eq!(eval("-1 >>> 28"), JsValue::Int(15));
}

#[test]
fn test_comparison() {
    assert_eq!(eval("1 < 2"), JsValue::Boolean(true));
    assert_eq!(eval("2 >= 2"), JsValue::Boolean(true));
    assert_eq!(eval("'a' < 'b'"), JsValue::Boolean(true));
    assert_eq!(eval("1 === 1"), JsValue::Boolean(true));
    assert_eq!(eval("1 !== 2"), JsValue::Boolean(true));
    assert_eq!(eval("NaN == NaN"), JsValue::Boolean(false));
    assert_eq!(eval("NaN < 1"), JsValue::Boolean(false));
}

#[test]
fn test_loose_equality() {
    assert_eq!(eval("1 == '1'"), JsValue::Boolean(true));
    assert_eq!(eval("null == undefined"), JsValue::Boolean(true));
    assert_eq!(eval("null == 0"), JsValue::Boolean(false));
    assert_eq!(eval("true == 1"), JsValue::Boolean(true));
    assert_eq!(eval("'' == 0"), JsValue::Boolean(true));
    assert_eq!(eval("1 === '1'"), JsValue::Boolean(false));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval("'a' + 1"), JsValue::from("a1"));
    assert_eq!(eval("1 + 2 + 'x'"), JsValue::from("3x"));
    assert_eq!(eval("'x' + null + undefined"), JsValue::from("xnullundefined"));
    assert_eq!(eval("'' + 0.5"), JsValue::from("0.5"));
    assert_eq!(eval("'' + 1e21"), JsValue::from("1e+21"));
}

#[test]
fn test_typeof() {
    assert_eq!(eval("typeof 1"), JsValue::from("number"));
    assert_eq!(eval("typeof 'a'"), JsValue::from("string"));
    assert_eq!(eval("typeof true"), JsValue::from("boolean"));
    assert_eq!(eval("typeof undefined"), JsValue::from("undefined"));
    assert_eq!(eval("typeof null"), JsValue::from("object"));
    assert_eq!(eval("typeof {}"), JsValue::from("object"));
    assert_eq!(eval("typeof function(){}"), JsValue::from("function"));
    assert_eq!(eval("typeof notDeclared"), JsValue::from("undefined"));
}

#[test]
fn test_variables() {
    assert_eq!(eval("var x = 5; x"), JsValue::Int(5));
    assert_eq!(eval("var x = 5; x = 10; x"), JsValue::Int(10));
    assert_eq!(eval("var x = 5; x += 2; x *= 3; x"), JsValue::Int(21));
    assert_eq!(eval("var x = 1; var y = x++; var z = ++x; '' + y + z + x"), JsValue::from("133"));
}

#[test]
fn test_assignment_creates_global() {
    assert_eq!(eval("function f() { g = 3; } f(); g"), JsValue::Int(3));
}

#[test]
fn test_undeclared_read_is_reference_error() {
    match eval_result("missing + 1") {
        Err(JsError::Runtime { code, message, .. }) => {
            assert_eq!(code, ErrorCode::UNDEFINED_VARIABLE);
            assert_eq!(message, "'missing' is undefined");
        }
        other => panic!("expected a reference error, got {:?}", other),
    }
}

#[test]
fn test_const_rejects_assignment() {
    assert_eq!(eval("const c = 1; c"), JsValue::Int(1));
    match eval_result("const c = 1; c = 2;") {
        Err(err) => assert_eq!(err.code(), ErrorCode::CONST_ASSIGNMENT),
        Ok(v) => panic!("expected a TypeError, got {:?}", v),
    }
}

#[test]
fn test_let_is_block_scoped() {
    assert_eq!(
        eval("var x = 1; { let x = 2; } x"),
        JsValue::Int(1)
    );
}

#[test]
fn test_conditional_and_logical() {
    assert_eq!(eval("true ? 1 : 2"), JsValue::Int(1));
    assert_eq!(eval("false ? 1 : 2"), JsValue::Int(2));
    assert_eq!(eval("0 || 'b'"), JsValue::from("b"));
    assert_eq!(eval("1 && 'b'"), JsValue::from("b"));
    assert_eq!(eval("null && x"), JsValue::Null);
    assert_eq!(eval("!0"), JsValue::Boolean(true));
}

#[test]
fn test_comma_and_void() {
    assert_eq!(eval("(1, 2, 3)"), JsValue::Int(3));
    assert_eq!(eval("void 0"), JsValue::Undefined);
}

#[test]
fn test_numeric_conversions() {
    assert_eq!(eval("+'42'"), JsValue::Int(42));
    assert_eq!(eval("+' 0x1F '"), JsValue::Int(31));
    assert_eq!(eval("-'3'"), JsValue::Int(-3));
    assert_eq!(eval("isNaN(+'abc')"), JsValue::Boolean(true));
    assert_eq!(eval("+''"), JsValue::Int(0));
    assert_eq!(eval("+true"), JsValue::Int(1));
}

#[test]
fn test_number_literals() {
    assert_eq!(eval("0x10"), JsValue::Int(16));
    assert_eq!(eval("010"), JsValue::Int(8));
    assert_eq!(eval("1.5e3"), JsValue::Int(1500));
    assert_eq!(eval(".5"), JsValue::Number(0.5));
}

#[test]
fn test_string_escapes() {
    assert_eq!(eval(r#""a\tb".length"#), JsValue::Int(3));
    assert_eq!(eval(r#"'\x41B'"#), JsValue::from("AB"));
    assert_eq!(eval(r#"'it\'s'"#), JsValue::from("it's"));
}

#[test]
fn test_automatic_semicolons() {
    assert_eq!(eval("var a = 1\nvar b = 2\na + b"), JsValue::Int(3));
    assert_eq!(eval("function f() { return\n1 }\ntypeof f()"), JsValue::from("undefined"));
}

#[test]
fn test_in_and_instanceof() {
    assert_eq!(eval("'a' in {a: 1}"), JsValue::Boolean(true));
    assert_eq!(eval("'toString' in {}"), JsValue::Boolean(true));
    assert_eq!(eval("'b' in {a: 1}"), JsValue::Boolean(false));
    assert_eq!(eval("[] instanceof Array"), JsValue::Boolean(true));
    assert_eq!(eval("[] instanceof Object"), JsValue::Boolean(true));
    assert_eq!(eval("({}) instanceof Array"), JsValue::Boolean(false));
}

#[test]
fn test_global_this() {
    assert_eq!(eval("var v = 7; this.v"), JsValue::Int(7));
}
