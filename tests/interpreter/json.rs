//! JSON tests

use super::eval;
use jscore::JsValue;

#[test]
fn test_stringify_primitives() {
    assert_eq!(eval("JSON.stringify(1)"), JsValue::from("1"));
    assert_eq!(eval("JSON.stringify(1.5)"), JsValue::from("1.5"));
    assert_eq!(eval("JSON.stringify('a\"b')"), JsValue::from(r#""a\"b""#));
    assert_eq!(eval("JSON.stringify(null)"), JsValue::from("null"));
    assert_eq!(eval("JSON.stringify(NaN)"), JsValue::from("null"));
    assert_eq!(eval("typeof JSON.stringify(undefined)"), JsValue::from("undefined"));
}

#[test]
fn test_stringify_keeps_property_order() {
    assert_eq!(
        eval("JSON.stringify({z: 1, a: [true, null], m: {k: 'v'}})"),
        JsValue::from(r#"{"z":1,"a":[true,null],"m":{"k":"v"}}"#)
    );
}

#[test]
fn test_stringify_skips_functions_and_undefined() {
    assert_eq!(
        eval("JSON.stringify({a: 1, f: function() {}, u: undefined})"),
        JsValue::from(r#"{"a":1}"#)
    );
    assert_eq!(
        eval("JSON.stringify([1, function() {}, undefined])"),
        JsValue::from("[1,null,null]")
    );
}

#[test]
fn test_stringify_unwraps_wrappers() {
    assert_eq!(
        eval("JSON.stringify([new Number(3), new String('s'), new Boolean(true)])"),
        JsValue::from(r#"[3,"s",true]"#)
    );
}

#[test]
fn test_stringify_indent() {
    assert_eq!(
        eval("JSON.stringify({a: [1]}, null, 2)"),
        JsValue::from("{\n  \"a\": [\n    1\n  ]\n}")
    );
}

#[test]
fn test_stringify_cycle_is_type_error() {
    assert_eq!(
        eval("var o = {}; o.self = o; var r; try { JSON.stringify(o); } catch (e) { r = e instanceof TypeError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_parse() {
    assert_eq!(eval("JSON.parse('{\"a\": [1, 2, {\"b\": \"c\"}]}').a[2].b"), JsValue::from("c"));
    assert_eq!(eval("JSON.parse('3.25')"), JsValue::Number(3.25));
    assert_eq!(eval("JSON.parse('null')"), JsValue::Null);
    assert_eq!(
        eval("Object.keys(JSON.parse('{\"z\": 1, \"a\": 2}')).join(',')"),
        JsValue::from("z,a")
    );
}

#[test]
fn test_parse_invalid_is_syntax_error() {
    assert_eq!(
        eval("var r; try { JSON.parse('{bad'); } catch (e) { r = e instanceof SyntaxError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_round_trip_through_script() {
    assert_eq!(
        eval("JSON.stringify(JSON.parse('{\"list\":[1,2.5,\"x\"],\"ok\":false}'))"),
        JsValue::from(r#"{"list":[1,2.5,"x"],"ok":false}"#)
    );
}
