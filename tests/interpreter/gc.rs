//! Collector tests through the engine: cycle reclamation, external holders
//! and traversal failure

use std::time::Duration;

use super::{create_manual_gc_engine, eval};
use jscore::{Engine, EngineConfig, JsError, JsValue};

#[test]
fn test_cycles_are_reclaimed() {
    let mut engine = create_manual_gc_engine();
    engine
        .exec("function mk() { var a = {}; var b = {}; a.p = b; b.p = a; } for (var i = 0; i < 50; i++) mk();")
        .unwrap();
    let before = engine.gc_stats().live_objects;

    let collected = engine.collect_garbage().unwrap();
    assert!(collected >= 100, "collected only {}", collected);
    assert!(engine.gc_stats().live_objects + 100 <= before);
    assert_eq!(engine.gc_stats().last_collected, collected);
}

#[test]
fn test_externally_held_cycle_survives() {
    let mut engine = create_manual_gc_engine();
    engine
        .exec("var keep = {}; (function() { var a = {}, b = {}; a.p = b; b.p = a; keep.a = a; })();")
        .unwrap();
    engine.collect_garbage().unwrap();
    assert_eq!(engine.eval("keep.a.p.p === keep.a").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_host_reference_keeps_cycle_alive() {
    let mut engine = create_manual_gc_engine();
    let held = engine.eval("var x = {tag: 'held'}; x.self = x; x").unwrap();
    engine.exec("x = null;").unwrap();
    engine.collect_garbage().unwrap();

    let obj = held.as_object().unwrap();
    assert_eq!(obj.borrow().own_value("tag"), Some(JsValue::from("held")));
    assert!(obj.borrow().own_value("self").is_some());
}

#[test]
fn test_closure_cycles_are_reclaimed() {
    let mut engine = create_manual_gc_engine();
    let source = r#"
        function make() {
            var state = {};
            state.fn = function() { return state; };
        }
        for (var i = 0; i < 20; i++) make();
    "#;
    engine.exec(source).unwrap();
    assert!(engine.collect_garbage().unwrap() >= 40);
}

#[test]
fn test_collect_garbage_from_script() {
    assert_eq!(eval("var o = {}; o.o = o; o = null; CollectGarbage(); 1"), JsValue::Int(1));
}

#[test]
fn test_frequent_collection_keeps_live_data() {
    let mut engine = Engine::with_config(EngineConfig {
        gc_interval: Duration::ZERO,
        ..EngineConfig::default()
    });
    let source = r#"
        function node(v, next) { var n = {v: v, next: next}; n.self = n; return n; }
        var list = null;
        for (var i = 0; i < 300; i++) list = node(i, list);
        var sum = 0;
        for (var n = list; n; n = n.next) sum += n.v;
        sum
    "#;
    assert_eq!(engine.eval(source).unwrap(), JsValue::Int(44850));
}

#[test]
fn test_traversal_failure_restores_state() {
    let mut engine = Engine::with_config(EngineConfig {
        gc_interval: Duration::from_secs(3600),
        mark_stack_limit: Some(1),
        ..EngineConfig::default()
    });
    engine
        .exec("var arr = []; for (var i = 0; i < 2000; i++) arr.push({v: i});")
        .unwrap();

    assert!(matches!(engine.collect_garbage(), Err(JsError::OutOfMemory)));

    // Counts were restored: everything is still reachable and intact
    assert_eq!(
        engine
            .eval("var s = 0; for (var i = 0; i < arr.length; i++) s += arr[i].v; s")
            .unwrap(),
        JsValue::Int(1999000)
    );
}

#[test]
fn test_dropping_long_object_chain() {
    let mut engine = create_manual_gc_engine();
    engine
        .exec("var h = null; for (var i = 0; i < 200000; i++) h = {n: h}; h = null;")
        .unwrap();
    let before = engine.gc_stats().live_objects;
    engine
        .exec("var a = null; for (var i = 0; i < 200000; i++) a = [a]; a = null;")
        .unwrap();
    assert!(engine.gc_stats().live_objects <= before + 64);
    assert_eq!(engine.eval("typeof h + typeof a").unwrap(), JsValue::from("objectobject"));
}
