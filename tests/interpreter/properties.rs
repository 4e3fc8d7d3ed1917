//! Property table behavior: prototype fall-through, cached prototype
//! references, extensibility and configurability

use super::{create_test_engine, eval};
use jscore::object::get_member;
use jscore::{ErrorCode, JsValue};

#[test]
fn test_delete_falls_through_to_prototype() {
    let source = r#"
        var p = {x: 1};
        var o = Object.create(p);
        o.x = 2;
        var a = o.x;
        delete o.x;
        var b = o.x;
        delete p.x;
        a + ',' + b + ',' + typeof o.x
    "#;
    assert_eq!(eval(source), JsValue::from("2,1,undefined"));
}

#[test]
fn test_cached_prototype_reference_sees_deletion() {
    let source = r#"
        var p = {v: 1};
        var o = Object.create(p);
        var first = o.v;
        o.v;
        delete p.v;
        var gone = typeof o.v;
        p.v = 3;
        first + ',' + gone + ',' + o.v
    "#;
    assert_eq!(eval(source), JsValue::from("1,undefined,3"));
}

#[test]
fn test_cached_reference_through_two_links() {
    let source = r#"
        var a = {k: 'a'};
        var b = Object.create(a);
        var c = Object.create(b);
        var r = c.k;
        b.k = 'b';
        r += c.k;
        delete b.k;
        r += c.k;
        delete a.k;
        r + typeof c.k
    "#;
    assert_eq!(eval(source), JsValue::from("abaundefined"));
}

#[test]
fn test_write_through_prototype_creates_own() {
    let source = r#"
        var p = {v: 1};
        var o = Object.create(p);
        o.v;
        o.v = 2;
        p.v + ',' + o.v + ',' + o.hasOwnProperty('v')
    "#;
    assert_eq!(eval(source), JsValue::from("1,2,true"));
}

#[test]
fn test_readonly_inherited_blocks_write() {
    let source = r#"
        var p = {};
        Object.defineProperty(p, 'r', {value: 1, writable: false});
        var o = Object.create(p);
        o.r = 2;
        o.r + ',' + o.hasOwnProperty('r')
    "#;
    assert_eq!(eval(source), JsValue::from("1,false"));
}

#[test]
fn test_inherited_setter_receives_instance() {
    let source = r#"
        var p = { set v(x) { this.stored = x * 2; } };
        var o = Object.create(p);
        o.v = 4;
        o.stored + ',' + p.hasOwnProperty('stored')
    "#;
    assert_eq!(eval(source), JsValue::from("8,false"));
}

#[test]
fn test_getter_and_setter_literals() {
    let source = r#"
        var o = { _x: 1, get x() { return this._x; }, set x(v) { this._x = v + 1; } };
        o.x = 5;
        o.x
    "#;
    assert_eq!(eval(source), JsValue::Int(6));
}

#[test]
fn test_non_extensible_rejects_new_names() {
    let source = r#"
        var o = {a: 1};
        Object.preventExtensions(o);
        o.b = 2;
        o.a = 3;
        var r = [typeof o.b, o.a, Object.isExtensible(o)];
        try { Object.defineProperty(o, 'c', {value: 1}); r.push('defined'); }
        catch (e) { r.push(e instanceof TypeError); }
        r.join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("undefined,3,false,true"));
}

#[test]
fn test_redefining_frozen_value() {
    let source = r#"
        var o = {};
        Object.defineProperty(o, 'k', {value: 1, writable: false, configurable: false});
        var r = [];
        try { Object.defineProperty(o, 'k', {value: 1}); r.push('same ok'); }
        catch (e) { r.push('same failed'); }
        try { Object.defineProperty(o, 'k', {value: 2}); r.push('changed'); }
        catch (e) { r.push(e instanceof TypeError); }
        try { Object.defineProperty(o, 'k', {enumerable: true}); r.push('enumerable'); }
        catch (e) { r.push(e instanceof TypeError); }
        r.join(',') + ',' + o.k
    "#;
    assert_eq!(eval(source), JsValue::from("same ok,true,true,1"));
}

#[test]
fn test_modified_error_code() {
    let source = r#"
        var o = {};
        Object.defineProperty(o, 'k', {value: 1});
        var n;
        try { Object.defineProperty(o, 'k', {value: 2}); } catch (e) { n = e.number & 0xFFFF; }
        n
    "#;
    assert_eq!(eval(source), JsValue::Int(ErrorCode::NONWRITABLE_MODIFIED.0 as i32));
}

#[test]
fn test_non_configurable_survives_delete() {
    let source = r#"
        var o = {};
        Object.defineProperty(o, 'k', {value: 1, configurable: false});
        var deleted = delete o.k;
        deleted + ',' + o.k
    "#;
    assert_eq!(eval(source), JsValue::from("false,1"));
}

#[test]
fn test_frozen_object() {
    let source = r#"
        var o = Object.freeze({a: 1});
        o.a = 2;
        o.b = 3;
        [o.a, typeof o.b, Object.isFrozen(o), delete o.a].join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("1,undefined,true,false"));
}

#[test]
fn test_property_order_is_creation_order() {
    assert_eq!(
        eval("var o = {}; o.z = 1; o.a = 2; o.m = 3; Object.keys(o).join(',')"),
        JsValue::from("z,a,m")
    );
}

#[test]
fn test_many_properties_survive_growth() {
    let source = r#"
        var o = {};
        for (var i = 0; i < 200; i++) o['p' + i] = i;
        var sum = 0;
        for (var i = 0; i < 200; i++) sum += o['p' + i];
        sum
    "#;
    assert_eq!(eval(source), JsValue::Int(19900));
}

#[test]
fn test_string_object_indexes() {
    assert_eq!(eval("var s = new String('abc'); s[1] + s.length"), JsValue::from("b3"));
    assert_eq!(eval("'xyz'[2]"), JsValue::from("z"));
}

#[test]
fn test_member_lookup_from_rust() {
    let mut engine = create_test_engine();
    let obj = engine.eval("var base = {inherited: 'yes'}; Object.create(base)").unwrap();
    let obj = obj.as_object().unwrap().clone();
    let value = get_member(engine.interpreter(), &obj, "inherited").unwrap();
    assert_eq!(value, JsValue::from("yes"));
}
