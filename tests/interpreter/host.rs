//! Host object protocol tests

use std::cell::RefCell;
use std::rc::Rc;

use super::create_test_engine;
use jscore::{CaseMode, HostError, HostObject, HostPropDesc, JsError, JsValue, PropFlags, SetOutcome};

const VALUE: u32 = 0;
const READONLY: u32 = 1;
const BROKEN: u32 = 2;
const FATAL: u32 = 3;

/// A host object with one read/write property, one the host refuses to
/// store, and two that fail
struct Widget {
    value: RefCell<JsValue>,
    lookups: RefCell<Vec<String>>,
}

impl Widget {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            value: RefCell::new(JsValue::Int(1)),
            lookups: RefCell::new(Vec::new()),
        })
    }
}

impl HostObject for Widget {
    fn lookup_property(&self, name: &str, case: CaseMode) -> Result<Option<HostPropDesc>, HostError> {
        self.lookups.borrow_mut().push(name.to_string());
        let folded = match case {
            CaseMode::Sensitive => name.to_string(),
            CaseMode::Insensitive => name.to_lowercase(),
        };
        Ok(match folded.as_str() {
            "value" => Some(HostPropDesc::new(VALUE, PropFlags::ALL)),
            "readonly" => Some(HostPropDesc::new(READONLY, PropFlags::ENUMERABLE)),
            "broken" => Some(HostPropDesc::new(BROKEN, PropFlags::NONE)),
            "fatal" => Some(HostPropDesc::new(FATAL, PropFlags::NONE)),
            _ => None,
        })
    }

    fn get_property(&self, id: u32) -> Result<JsValue, HostError> {
        match id {
            VALUE => Ok(self.value.borrow().clone()),
            READONLY => Ok(JsValue::from("fixed")),
            BROKEN => Err(HostError::with_exception("broken", JsValue::from("host says no"))),
            _ => Err(HostError::new("fatal host failure")),
        }
    }

    fn set_property(&self, id: u32, value: &JsValue) -> Result<SetOutcome, HostError> {
        match id {
            VALUE => {
                *self.value.borrow_mut() = value.clone();
                Ok(SetOutcome::Accepted)
            }
            _ => Ok(SetOutcome::Rejected),
        }
    }

    fn fill_all_properties(&self) -> Result<Vec<(String, HostPropDesc)>, HostError> {
        Ok(vec![
            ("value".to_string(), HostPropDesc::new(VALUE, PropFlags::ALL)),
            ("readonly".to_string(), HostPropDesc::new(READONLY, PropFlags::ENUMERABLE)),
        ])
    }

    fn to_display_string(&self) -> Option<String> {
        Some("[widget]".to_string())
    }
}

#[test]
fn test_host_property_read_and_write() {
    let mut engine = create_test_engine();
    let widget = Widget::new();
    engine.add_named_item("widget", widget.clone());

    assert_eq!(engine.eval("widget.value").unwrap(), JsValue::Int(1));
    engine.exec("widget.value = 'changed';").unwrap();
    assert_eq!(*widget.value.borrow(), JsValue::from("changed"));
    assert_eq!(engine.eval("widget.value").unwrap(), JsValue::from("changed"));
}

#[test]
fn test_host_lookup_is_cached() {
    let mut engine = create_test_engine();
    let widget = Widget::new();
    engine.add_named_item("widget", widget.clone());

    engine.exec("widget.value; widget.value; widget.value = 2; widget.value;").unwrap();
    let lookups = widget.lookups.borrow();
    assert_eq!(lookups.iter().filter(|n| n.as_str() == "value").count(), 1);
}

#[test]
fn test_rejected_write_becomes_own_property() {
    let mut engine = create_test_engine();
    let widget = Widget::new();
    engine.add_named_item("widget", widget.clone());

    assert_eq!(
        engine.eval("var before = widget.readonly; widget.readonly = 5; before + ',' + widget.readonly").unwrap(),
        JsValue::from("fixed,5")
    );
}

#[test]
fn test_unknown_names_fall_back_to_script_properties() {
    let mut engine = create_test_engine();
    engine.add_named_item("widget", Widget::new());

    assert_eq!(engine.eval("typeof widget.nothing").unwrap(), JsValue::from("undefined"));
    assert_eq!(engine.eval("widget.extra = 3; widget.extra").unwrap(), JsValue::Int(3));
    assert_eq!(engine.eval("typeof widget.hasOwnProperty").unwrap(), JsValue::from("function"));
}

#[test]
fn test_case_insensitive_dispatch_lookup() {
    let mut engine = create_test_engine();
    let widget = Widget::new();
    let obj = engine.add_named_item("widget", widget.clone());

    assert_eq!(
        engine.lookup_member(&obj, "VALUE", CaseMode::Insensitive).unwrap(),
        Some(JsValue::Int(1))
    );
    assert_eq!(engine.lookup_member(&obj, "VALUE", CaseMode::Sensitive).unwrap(), None);
    assert!(widget.lookups.borrow().iter().any(|n| n == "VALUE"));

    // Two script members differing only by case: exact spelling wins,
    // any other spelling is ambiguous
    engine.exec("widget.Extra = 1; widget.eXTRA = 2;").unwrap();
    assert_eq!(
        engine.lookup_member(&obj, "Extra", CaseMode::Insensitive).unwrap(),
        Some(JsValue::Int(1))
    );
    assert_eq!(engine.lookup_member(&obj, "EXTRA", CaseMode::Insensitive).unwrap(), None);

    // Inherited members resolve ignoring case too
    let to_string = engine
        .lookup_member(&obj, "TOSTRING", CaseMode::Insensitive)
        .unwrap();
    assert!(matches!(to_string, Some(JsValue::Object(_))));
}

#[test]
fn test_case_collision_in_prototype_is_ambiguous() {
    let mut engine = create_test_engine();
    let obj = engine
        .eval("var proto = {Bar: 1, bAR: 2, Qux: 4}; var o = Object.create(proto); o.Baz = 3; o")
        .unwrap();
    let obj = obj.as_object().unwrap().clone();

    assert_eq!(engine.lookup_member(&obj, "BAR", CaseMode::Insensitive).unwrap(), None);
    assert_eq!(
        engine.lookup_member(&obj, "bAR", CaseMode::Insensitive).unwrap(),
        Some(JsValue::Int(2))
    );
    assert_eq!(
        engine.lookup_member(&obj, "baz", CaseMode::Insensitive).unwrap(),
        Some(JsValue::Int(3))
    );
    assert_eq!(
        engine.lookup_member(&obj, "QUX", CaseMode::Insensitive).unwrap(),
        Some(JsValue::Int(4))
    );
    // The cached reference is reused under any spelling
    assert_eq!(
        engine.lookup_member(&obj, "qux", CaseMode::Insensitive).unwrap(),
        Some(JsValue::Int(4))
    );
    assert_eq!(engine.eval("o.Qux + o.Baz").unwrap(), JsValue::Int(7));
}

#[test]
fn test_host_failure_with_exception_is_catchable() {
    let mut engine = create_test_engine();
    engine.add_named_item("widget", Widget::new());

    assert_eq!(
        engine.eval("var r; try { widget.broken; } catch (e) { r = e; } r").unwrap(),
        JsValue::from("host says no")
    );
}

#[test]
fn test_host_failure_without_exception_is_not_catchable() {
    let mut engine = create_test_engine();
    engine.add_named_item("widget", Widget::new());

    match engine.eval("var r = 'untouched'; try { widget.fatal; } catch (e) { r = 'caught'; }") {
        Err(JsError::Host { message }) => assert_eq!(message, "fatal host failure"),
        other => panic!("expected a host failure, got {:?}", other),
    }
    assert_eq!(engine.get_global("r").unwrap(), JsValue::from("untouched"));
}

#[test]
fn test_host_enumeration_and_display() {
    let mut engine = create_test_engine();
    engine.add_named_item("widget", Widget::new());

    assert_eq!(
        engine.eval("var keys = []; for (var k in widget) keys.push(k); keys.join(',')").unwrap(),
        JsValue::from("value,readonly")
    );
    assert_eq!(engine.eval("'' + widget").unwrap(), JsValue::from("[widget]"));
}

#[test]
fn test_host_object_survives_collection() {
    let mut engine = create_test_engine();
    engine.add_named_item("widget", Widget::new());
    engine.exec("widget.self = widget;").unwrap();
    engine.collect_garbage().unwrap();
    assert_eq!(engine.eval("widget.self.value").unwrap(), JsValue::Int(1));
}

#[test]
fn test_global_this_can_be_replaced() {
    let mut engine = create_test_engine();
    let widget = Widget::new();
    let obj = engine.add_named_item("widget", widget);
    engine.set_global_this(JsValue::Object(obj));
    assert_eq!(engine.eval("this.value").unwrap(), JsValue::Int(1));
}
