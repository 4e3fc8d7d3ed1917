//! WeakMap tests

use super::{create_manual_gc_engine, eval};
use jscore::object::ObjectData;
use jscore::JsValue;

fn live_entries(engine: &mut jscore::Engine, name: &str) -> usize {
    let map = engine.get_global(name).unwrap();
    let map = map.as_object().unwrap();
    match &map.borrow().data {
        ObjectData::WeakMap(data) => data.len(),
        _ => panic!("{} is not a WeakMap", name),
    }
}

#[test]
fn test_get_set_has_delete() {
    let source = r#"
        var m = new WeakMap();
        var k = {};
        var r = [m.has(k), m.set(k, 'v') === m, m.get(k), m.has(k), m.delete(k), m.has(k)];
        r.join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("false,true,v,true,true,false"));
}

#[test]
fn test_primitive_keys() {
    assert_eq!(
        eval("var r; try { new WeakMap().set(1, 2); } catch (e) { r = e instanceof TypeError; } r"),
        JsValue::Boolean(true)
    );
    assert_eq!(eval("typeof new WeakMap().get('x')"), JsValue::from("undefined"));
}

#[test]
fn test_requires_new() {
    assert_eq!(
        eval("var r; try { WeakMap(); } catch (e) { r = e instanceof TypeError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_keys_are_held_weakly() {
    let mut engine = create_manual_gc_engine();
    engine
        .exec("var m = new WeakMap(); var k = {}; m.set(k, {payload: 1}); var kept = {}; m.set(kept, 2);")
        .unwrap();
    assert_eq!(live_entries(&mut engine, "m"), 2);

    engine.exec("k = null;").unwrap();
    engine.collect_garbage().unwrap();
    assert_eq!(live_entries(&mut engine, "m"), 1);
    assert_eq!(engine.eval("m.get(kept)").unwrap(), JsValue::Int(2));
}

#[test]
fn test_value_referencing_its_key_is_collected() {
    let mut engine = create_manual_gc_engine();
    engine
        .exec("var m = new WeakMap(); var k = {}; m.set(k, {back: k}); k = null;")
        .unwrap();
    engine.collect_garbage().unwrap();
    assert_eq!(live_entries(&mut engine, "m"), 0);
}

#[test]
fn test_value_lives_while_key_is_reachable() {
    let mut engine = create_manual_gc_engine();
    engine
        .exec("var m = new WeakMap(); var k = {}; m.set(k, {back: k, tag: 'alive'});")
        .unwrap();
    engine.collect_garbage().unwrap();
    assert_eq!(engine.eval("m.get(k).tag").unwrap(), JsValue::from("alive"));
}
