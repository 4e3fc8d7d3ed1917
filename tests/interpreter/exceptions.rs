//! Exception tests: try/catch/finally unwinding and host error reporting

use std::cell::RefCell;
use std::rc::Rc;

use super::{create_test_engine, eval, eval_result};
use jscore::{ErrorCode, ErrorReport, JsError, JsValue};

#[test]
fn test_catch_binds_thrown_value() {
    assert_eq!(eval("try { throw 5; } catch(e) { e + 1; }"), JsValue::Int(6));
}

#[test]
fn test_caught_exception_is_not_reported() {
    let mut engine = create_test_engine();
    let reports = Rc::new(RefCell::new(Vec::<ErrorReport>::new()));
    let sink = reports.clone();
    engine.set_error_handler(move |report| {
        sink.borrow_mut().push(report.clone());
        true
    });
    let result = engine.eval("try { throw 5; } catch(e) { e + 1; }").unwrap();
    assert_eq!(result, JsValue::Int(6));
    assert!(reports.borrow().is_empty());
}

#[test]
fn test_nested_finally_order() {
    let source = r#"
        var log = [];
        try {
            try {
                try { throw 'x'; } finally { log.push('f1'); }
            } catch (e) { log.push('c:' + e); } finally { log.push('f2'); }
        } finally { log.push('f3'); }
        log.join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("f1,c:x,f2,f3"));
}

#[test]
fn test_uncaught_rethrow_runs_finally() {
    let mut engine = create_test_engine();
    let result = engine.eval("var log = ''; try { throw 1; } finally { log += 'f'; }");
    match result {
        Err(JsError::Thrown { value, .. }) => assert_eq!(value, JsValue::Int(1)),
        other => panic!("expected the thrown value, got {:?}", other),
    }
    assert_eq!(engine.get_global("log").unwrap(), JsValue::from("f"));
}

#[test]
fn test_throw_from_catch_replaces_exception() {
    let source = r#"
        var r;
        try {
            try { throw 'first'; } catch (e) { throw 'second'; }
        } catch (e) { r = e; }
        r
    "#;
    assert_eq!(eval(source), JsValue::from("second"));
}

#[test]
fn test_catch_scope_is_separate() {
    assert_eq!(
        eval("var e = 'outer'; try { throw 'inner'; } catch (e) { } e"),
        JsValue::from("outer")
    );
}

#[test]
fn test_break_runs_finally() {
    let source = r#"
        var s = '';
        for (var i = 0; i < 3; i++) {
            try { if (i == 1) break; s += i; } finally { s += 'f'; }
        }
        s
    "#;
    assert_eq!(eval(source), JsValue::from("0ff"));
}

#[test]
fn test_continue_runs_finally() {
    let source = r#"
        var s = '';
        for (var i = 0; i < 3; i++) {
            try { if (i == 1) continue; s += i; } finally { s += '.'; }
        }
        s
    "#;
    assert_eq!(eval(source), JsValue::from("0..2."));
}

#[test]
fn test_return_runs_finally() {
    assert_eq!(
        eval("function f() { try { return 1; } finally { g = 2; } } f() + g"),
        JsValue::Int(3)
    );
}

#[test]
fn test_exception_crosses_function_boundaries() {
    let source = r#"
        function inner() { throw new RangeError('deep'); }
        function outer() { inner(); return 'unreached'; }
        var r;
        try { outer(); } catch (e) { r = e.name + ':' + e.message; }
        r
    "#;
    assert_eq!(eval(source), JsValue::from("RangeError:deep"));
}

#[test]
fn test_runtime_errors_are_catchable() {
    let source = r#"
        var r = [];
        try { null.x; } catch (e) { r.push(e instanceof TypeError); }
        try { missing; } catch (e) { r.push(e instanceof ReferenceError); }
        try { (1)(); } catch (e) { r.push(e instanceof TypeError); }
        r.join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("true,true,true"));
}

#[test]
fn test_runtime_error_number() {
    assert_eq!(
        eval("var n; try { null.x; } catch (e) { n = e.number & 0xFFFF; } n"),
        JsValue::Int(ErrorCode::OBJECT_EXPECTED.0 as i32)
    );
}

#[test]
fn test_stack_overflow_is_range_error() {
    assert_eq!(
        eval("function f() { return f(); } var r; try { f(); } catch (e) { r = e instanceof RangeError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_recursion_through_call_and_apply() {
    // Source targets of call/apply run in the calling VM, so they share the
    // ordinary call limit
    assert_eq!(
        eval("function f(n) { return n == 0 ? 0 : 1 + f.call(null, n - 1); } f(400)"),
        JsValue::Int(400)
    );
    assert_eq!(
        eval("function g(n) { return n == 0 ? 0 : 1 + g.apply(null, [n - 1]); } g(400)"),
        JsValue::Int(400)
    );
    assert_eq!(
        eval("function f() { return f.call(null); } var r; try { f(); } catch (e) { r = e instanceof RangeError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_reentry_through_native_code_is_range_error() {
    let source = r#"
        var o = { toString: function() { return 'x' + this; } };
        var r;
        try { '' + o; } catch (e) { r = e.name + ' ' + e.message; }
        r
    "#;
    assert_eq!(eval(source), JsValue::from("RangeError Out of stack space"));

    let source = r#"
        var p = {};
        Object.defineProperty(p, 'deep', { get: function() { return this.deep; } });
        var r;
        try { p.deep; } catch (e) { r = e instanceof RangeError; }
        r
    "#;
    assert_eq!(eval(source), JsValue::Boolean(true));
}

#[test]
fn test_handled_error_returns_already_reported() {
    let mut engine = create_test_engine();
    let reports = Rc::new(RefCell::new(Vec::<ErrorReport>::new()));
    let sink = reports.clone();
    engine.set_error_handler(move |report| {
        sink.borrow_mut().push(report.clone());
        true
    });

    let result = engine.eval("var a = 1;\nmissing;");
    assert!(matches!(result, Err(JsError::AlreadyReported)));

    let reports = reports.borrow();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.code, ErrorCode::UNDEFINED_VARIABLE.number());
    assert_eq!(report.message, "'missing' is undefined");
    assert_eq!(report.line, 2);
    assert_eq!(report.source_line.as_deref(), Some("missing;"));
}

#[test]
fn test_unhandled_error_returns_original() {
    let mut engine = create_test_engine();
    let count = Rc::new(RefCell::new(0));
    let seen = count.clone();
    engine.set_error_handler(move |_| {
        *seen.borrow_mut() += 1;
        false
    });

    let result = engine.eval("throw 'boom';");
    match result {
        Err(JsError::Thrown { value, .. }) => assert_eq!(value, JsValue::from("boom")),
        other => panic!("expected the thrown value, got {:?}", other),
    }
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_syntax_error_is_reported_with_source_line() {
    let mut engine = create_test_engine();
    let reports = Rc::new(RefCell::new(Vec::<ErrorReport>::new()));
    let sink = reports.clone();
    engine.set_error_handler(move |report| {
        sink.borrow_mut().push(report.clone());
        true
    });

    assert!(matches!(
        engine.eval("var x = 1;\nvar = 2;"),
        Err(JsError::AlreadyReported)
    ));
    let reports = reports.borrow();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].line, 2);
    assert_eq!(reports[0].unit, "script");
    assert_eq!(reports[0].source_line.as_deref(), Some("var = 2;"));
}

#[test]
fn test_syntax_error_runs_nothing() {
    let mut engine = create_test_engine();
    assert!(engine.eval("ran = true;\nvar = ;").is_err());
    assert!(engine.eval("typeof ran").unwrap() == JsValue::from("undefined"));
}

#[test]
fn test_uncaught_error_message() {
    match eval_result("throw new TypeError('bad thing');") {
        Err(err) => assert!(err.to_string().contains("TypeError: bad thing")),
        Ok(v) => panic!("expected an error, got {:?}", v),
    }
}
