//! Object constructor and Object.prototype tests

use super::eval;
use jscore::JsValue;

#[test]
fn test_object_literal() {
    assert_eq!(eval("var o = {a: 1, 'b c': 2, 3: 'three'}; o.a + o['b c'] + o[3]"), JsValue::from("3three"));
}

#[test]
fn test_object_constructor() {
    assert_eq!(eval("typeof new Object()"), JsValue::from("object"));
    assert_eq!(eval("typeof Object(1)"), JsValue::from("object"));
    assert_eq!(eval("var o = {}; Object(o) === o"), JsValue::Boolean(true));
}

#[test]
fn test_to_string_class_names() {
    assert_eq!(eval("({}).toString()"), JsValue::from("[object Object]"));
    assert_eq!(eval("Object.prototype.toString.call([])"), JsValue::from("[object Array]"));
    assert_eq!(eval("Object.prototype.toString.call(Math)"), JsValue::from("[object Math]"));
    assert_eq!(eval("'' + {}"), JsValue::from("[object Object]"));
}

#[test]
fn test_has_own_property() {
    assert_eq!(
        eval("var o = {a: 1}; [o.hasOwnProperty('a'), o.hasOwnProperty('toString')].join(',')"),
        JsValue::from("true,false")
    );
}

#[test]
fn test_property_is_enumerable() {
    assert_eq!(
        eval("var a = [1]; [a.propertyIsEnumerable(0), a.propertyIsEnumerable('length')].join(',')"),
        JsValue::from("true,false")
    );
}

#[test]
fn test_is_prototype_of() {
    assert_eq!(
        eval("var p = {}; var o = Object.create(p); [p.isPrototypeOf(o), o.isPrototypeOf(p)].join(',')"),
        JsValue::from("true,false")
    );
}

#[test]
fn test_get_prototype_of() {
    assert_eq!(eval("Object.getPrototypeOf([]) === Array.prototype"), JsValue::Boolean(true));
    assert_eq!(eval("Object.getPrototypeOf(Object.create(null)) === null"), JsValue::Boolean(true));
}

#[test]
fn test_create_with_properties() {
    assert_eq!(
        eval("var o = Object.create({}, {x: {value: 1, enumerable: true}}); o.x + Object.keys(o).length"),
        JsValue::Int(2)
    );
}

#[test]
fn test_define_accessor() {
    let source = r#"
        var o = {};
        var hits = 0;
        Object.defineProperty(o, 'x', { get: function() { hits++; return 42; }, enumerable: true });
        o.x; o.x;
        hits + ':' + o.x
    "#;
    assert_eq!(eval(source), JsValue::from("2:42"));
}

#[test]
fn test_get_own_property_descriptor() {
    let source = r#"
        var o = {a: 1};
        var d = Object.getOwnPropertyDescriptor(o, 'a');
        [d.value, d.writable, d.enumerable, d.configurable].join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("1,true,true,true"));
    assert_eq!(eval("typeof Object.getOwnPropertyDescriptor({}, 'missing')"), JsValue::from("undefined"));
}

#[test]
fn test_get_own_property_names_includes_hidden() {
    let source = r#"
        var o = {a: 1};
        Object.defineProperty(o, 'h', {value: 2});
        Object.getOwnPropertyNames(o).join(',') + '|' + Object.keys(o).join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("a,h|a"));
}

#[test]
fn test_value_of_returns_object() {
    assert_eq!(eval("var o = {}; o.valueOf() === o"), JsValue::Boolean(true));
}

#[test]
fn test_custom_value_of_in_arithmetic() {
    assert_eq!(eval("var o = { valueOf: function() { return 10; } }; o * 2"), JsValue::Int(20));
    assert_eq!(
        eval("var o = { toString: function() { return 'S'; } }; 'x' + o"),
        JsValue::from("xS")
    );
}
