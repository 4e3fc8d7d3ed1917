//! RegExp tests

#![cfg(feature = "regex")]

use super::eval;
use jscore::JsValue;

#[test]
fn test_literal_test() {
    assert_eq!(eval("/ab+c/.test('xabbbcx')"), JsValue::Boolean(true));
    assert_eq!(eval("/^abc$/.test('abcd')"), JsValue::Boolean(false));
    assert_eq!(eval("/ABC/i.test('abc')"), JsValue::Boolean(true));
}

#[test]
fn test_flags_and_source() {
    assert_eq!(eval("var r = /a.c/gi; [r.source, r.global, r.ignoreCase, r.multiline].join(',')"), JsValue::from("a.c,true,true,false"));
    assert_eq!(eval("String(/x/m)"), JsValue::from("/x/m"));
}

#[test]
fn test_exec_groups() {
    let source = r#"
        var m = /(\d+)-(\d+)/.exec('range 10-20 end');
        [m[0], m[1], m[2], m.index].join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("10-20,10,20,6"));
    assert_eq!(eval("/z/.exec('abc')"), JsValue::Null);
}

#[test]
fn test_global_exec_advances_last_index() {
    let source = r#"
        var re = /o/g;
        var s = 'foo boo';
        var hits = [];
        var m;
        while ((m = re.exec(s)) != null) hits.push(m.index);
        hits.join(',') + '|' + re.lastIndex
    "#;
    assert_eq!(eval(source), JsValue::from("1,2,5,6|0"));
}

#[test]
fn test_constructor() {
    assert_eq!(eval("new RegExp('a+', 'g').global"), JsValue::Boolean(true));
    assert_eq!(eval("var r = /x/; RegExp(r) === r"), JsValue::Boolean(true));
    assert_eq!(
        eval("var e; try { new RegExp('a', 'q'); } catch (x) { e = x instanceof SyntaxError; } e"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_split_with_regexp() {
    assert_eq!(eval("'a1b22c'.split(/\\d+/).join(',')"), JsValue::from("a,b,c"));
}

#[test]
fn test_regexp_after_division_context() {
    assert_eq!(eval("var a = 10, g = 2; a / g / 5"), JsValue::Int(1));
}
