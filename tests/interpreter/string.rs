//! String tests: String.prototype methods and UTF-16 positions

use super::eval;
use jscore::JsValue;

#[test]
fn test_length_counts_utf16_units() {
    assert_eq!(eval("'hello'.length"), JsValue::Int(5));
    assert_eq!(eval("'\\u00e9'.length"), JsValue::Int(1));
    assert_eq!(eval("'😀'.length"), JsValue::Int(2));
}

#[test]
fn test_char_at_and_code() {
    assert_eq!(eval("'abc'.charAt(1)"), JsValue::from("b"));
    assert_eq!(eval("'abc'.charAt(5)"), JsValue::from(""));
    assert_eq!(eval("'abc'.charCodeAt(0)"), JsValue::Int(97));
    assert_eq!(eval("isNaN('abc'.charCodeAt(9))"), JsValue::Boolean(true));
    assert_eq!(eval("String.fromCharCode(72, 105)"), JsValue::from("Hi"));
}

#[test]
fn test_index_of() {
    assert_eq!(eval("'hello'.indexOf('l')"), JsValue::Int(2));
    assert_eq!(eval("'hello'.indexOf('l', 3)"), JsValue::Int(3));
    assert_eq!(eval("'hello'.lastIndexOf('l')"), JsValue::Int(3));
    assert_eq!(eval("'hello'.indexOf('z')"), JsValue::Int(-1));
}

#[test]
fn test_substring_substr_slice() {
    assert_eq!(eval("'abcdef'.substring(1, 3)"), JsValue::from("bc"));
    assert_eq!(eval("'abcdef'.substring(3, 1)"), JsValue::from("bc"));
    assert_eq!(eval("'abcdef'.substr(2, 3)"), JsValue::from("cde"));
    assert_eq!(eval("'abcdef'.slice(-2)"), JsValue::from("ef"));
    assert_eq!(eval("'abcdef'.slice(1, -1)"), JsValue::from("bcde"));
}

#[test]
fn test_case_conversion() {
    assert_eq!(eval("'Hello'.toUpperCase()"), JsValue::from("HELLO"));
    assert_eq!(eval("'Hello'.toLowerCase()"), JsValue::from("hello"));
}

#[test]
fn test_split() {
    assert_eq!(eval("'a,b,c'.split(',').length"), JsValue::Int(3));
    assert_eq!(eval("'a,b,c'.split(',', 2).join('|')"), JsValue::from("a|b"));
    assert_eq!(eval("'abc'.split('').join('|')"), JsValue::from("a|b|c"));
    assert_eq!(eval("'abc'.split().length"), JsValue::Int(1));
}

#[test]
fn test_concat() {
    assert_eq!(eval("'a'.concat('b', 1)"), JsValue::from("ab1"));
}

#[test]
fn test_string_constructor() {
    assert_eq!(eval("String(12)"), JsValue::from("12"));
    assert_eq!(eval("typeof new String('x')"), JsValue::from("object"));
    assert_eq!(eval("new String('x') + 'y'"), JsValue::from("xy"));
    assert_eq!(eval("new String('abc').length"), JsValue::Int(3));
}

#[test]
fn test_value_of_requires_string() {
    assert_eq!(
        eval("var r; try { String.prototype.valueOf.call(1); } catch (e) { r = e instanceof TypeError; } r"),
        JsValue::Boolean(true)
    );
}
