//! Math object tests

use super::eval;
use jscore::JsValue;

#[test]
fn test_constants() {
    assert_eq!(eval("Math.PI"), JsValue::Number(std::f64::consts::PI));
    assert_eq!(eval("Math.SQRT2"), JsValue::Number(std::f64::consts::SQRT_2));
}

#[test]
fn test_rounding() {
    assert_eq!(eval("Math.floor(-1.5)"), JsValue::Int(-2));
    assert_eq!(eval("Math.ceil(1.2)"), JsValue::Int(2));
    assert_eq!(eval("Math.round(2.5)"), JsValue::Int(3));
    assert_eq!(eval("Math.round(-2.5)"), JsValue::Int(-2));
    assert_eq!(eval("1 / Math.round(-0.2)"), JsValue::Number(f64::NEG_INFINITY));
}

#[test]
fn test_min_max() {
    assert_eq!(eval("Math.max(1, 5, 3)"), JsValue::Int(5));
    assert_eq!(eval("Math.min(1, -5, 3)"), JsValue::Int(-5));
    assert_eq!(eval("Math.max()"), JsValue::Number(f64::NEG_INFINITY));
    assert_eq!(eval("isNaN(Math.max(1, NaN))"), JsValue::Boolean(true));
}

#[test]
fn test_pow_and_sqrt() {
    assert_eq!(eval("Math.pow(2, 10)"), JsValue::Int(1024));
    assert_eq!(eval("Math.sqrt(81)"), JsValue::Int(9));
    assert_eq!(eval("isNaN(Math.pow(1, Infinity))"), JsValue::Boolean(true));
}

#[test]
fn test_abs_and_trig() {
    assert_eq!(eval("Math.abs(-3)"), JsValue::Int(3));
    assert_eq!(eval("Math.sin(0)"), JsValue::Int(0));
    assert_eq!(eval("Math.cos(0)"), JsValue::Int(1));
    assert_eq!(eval("Math.atan2(0, 1)"), JsValue::Int(0));
}

#[test]
fn test_math_is_not_callable() {
    assert_eq!(
        eval("var r; try { Math(); } catch (e) { r = e instanceof TypeError; } r"),
        JsValue::Boolean(true)
    );
}
