//! Number and Boolean tests

use super::eval;
use jscore::JsValue;

#[test]
fn test_number_to_string() {
    assert_eq!(eval("(255).toString(16)"), JsValue::from("ff"));
    assert_eq!(eval("(10).toString(2)"), JsValue::from("1010"));
    assert_eq!(eval("(1.5).toString()"), JsValue::from("1.5"));
    assert_eq!(eval("String(-0)"), JsValue::from("0"));
    assert_eq!(eval("String(1/3)"), JsValue::from("0.3333333333333333"));
    assert_eq!(eval("String(0.000001)"), JsValue::from("0.000001"));
    assert_eq!(eval("String(1e-7)"), JsValue::from("1e-7"));
}

#[test]
fn test_to_fixed() {
    assert_eq!(eval("(3.14159).toFixed(2)"), JsValue::from("3.14"));
    assert_eq!(eval("(2).toFixed(3)"), JsValue::from("2.000"));
    assert_eq!(
        eval("var r; try { (1).toFixed(25); } catch (e) { r = e instanceof RangeError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_number_constants() {
    assert_eq!(eval("Number.MAX_VALUE > 1e308"), JsValue::Boolean(true));
    assert_eq!(eval("isNaN(Number.NaN)"), JsValue::Boolean(true));
    assert_eq!(eval("Number.POSITIVE_INFINITY === Infinity"), JsValue::Boolean(true));
}

#[test]
fn test_number_constructor() {
    assert_eq!(eval("Number('12')"), JsValue::Int(12));
    assert_eq!(eval("Number()"), JsValue::Int(0));
    assert_eq!(eval("typeof new Number(1)"), JsValue::from("object"));
    assert_eq!(eval("new Number(4) * 2"), JsValue::Int(8));
}

#[test]
fn test_number_value_of_requires_number() {
    assert_eq!(
        eval("var r; try { Number.prototype.valueOf.call('1'); } catch (e) { r = e instanceof TypeError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_parse_int() {
    assert_eq!(eval("parseInt('42px')"), JsValue::Int(42));
    assert_eq!(eval("parseInt('  -17')"), JsValue::Int(-17));
    assert_eq!(eval("parseInt('0x1A')"), JsValue::Int(26));
    assert_eq!(eval("parseInt('011')"), JsValue::Int(9));
    assert_eq!(eval("parseInt('011', 10)"), JsValue::Int(11));
    assert_eq!(eval("parseInt('z', 36)"), JsValue::Int(35));
    assert_eq!(eval("isNaN(parseInt('abc'))"), JsValue::Boolean(true));
}

#[test]
fn test_parse_float() {
    assert_eq!(eval("parseFloat('3.5e2abc')"), JsValue::Int(350));
    assert_eq!(eval("parseFloat('.25')"), JsValue::Number(0.25));
    assert_eq!(eval("isNaN(parseFloat('x'))"), JsValue::Boolean(true));
}

#[test]
fn test_is_finite() {
    assert_eq!(eval("isFinite(1)"), JsValue::Boolean(true));
    assert_eq!(eval("isFinite(1/0)"), JsValue::Boolean(false));
    assert_eq!(eval("isFinite('12')"), JsValue::Boolean(true));
}

#[test]
fn test_boolean() {
    assert_eq!(eval("Boolean('')"), JsValue::Boolean(false));
    assert_eq!(eval("Boolean('0')"), JsValue::Boolean(true));
    assert_eq!(eval("new Boolean(false) ? 'yes' : 'no'"), JsValue::from("yes"));
    assert_eq!(eval("new Boolean(false).valueOf()"), JsValue::Boolean(false));
    assert_eq!(eval("true.toString()"), JsValue::from("true"));
}
