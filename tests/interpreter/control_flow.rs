//! Control flow tests: if/else, loops, labels, switch, for-in, with

use super::eval;
use jscore::JsValue;

#[test]
fn test_if_else() {
    assert_eq!(eval("var x; if (1 < 2) x = 'a'; else x = 'b'; x"), JsValue::from("a"));
    assert_eq!(eval("var x; if (0) x = 'a'; else if ('') x = 'b'; else x = 'c'; x"), JsValue::from("c"));
}

#[test]
fn test_while_and_do_while() {
    assert_eq!(eval("var i = 0; while (i < 10) i++; i"), JsValue::Int(10));
    assert_eq!(eval("var i = 10; do { i++; } while (i < 5); i"), JsValue::Int(11));
}

#[test]
fn test_break_and_continue() {
    assert_eq!(
        eval("var s = 0; for (var i = 0; i < 10; i++) { if (i == 5) break; if (i % 2) continue; s += i; } s"),
        JsValue::Int(6)
    );
}

#[test]
fn test_labeled_loops() {
    assert_eq!(
        eval(
            r#"
            var n = 0;
            outer: for (var i = 0; i < 3; i++) {
                for (var j = 0; j < 3; j++) {
                    if (j == 1) continue outer;
                    if (i == 2) break outer;
                    n++;
                }
            }
            n
            "#
        ),
        JsValue::Int(2)
    );
}

#[test]
fn test_labeled_block_break() {
    assert_eq!(eval("var x = 1; b: { x = 2; break b; x = 3; } x"), JsValue::Int(2));
}

#[test]
fn test_switch() {
    let source = r#"
        function name(n) {
            var r = '';
            switch (n) {
                case 1: r += 'one';
                case 2: r += 'two'; break;
                case '3': r = 'string'; break;
                default: r = 'other';
            }
            return r;
        }
        [name(1), name(2), name('3'), name(3)].join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("onetwo,two,string,other"));
}

#[test]
fn test_switch_default_in_middle() {
    let source = r#"
        var r = '';
        switch (5) {
            case 1: r += 'a';
            default: r += 'd';
            case 2: r += 'b';
        }
        r
    "#;
    assert_eq!(eval(source), JsValue::from("db"));
}

#[test]
fn test_for_in_visits_own_then_inherited() {
    let source = r#"
        var base = {inherited: 1};
        var o = Object.create(base);
        o.a = 1; o.b = 2;
        var keys = [];
        for (var k in o) keys.push(k);
        keys.join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("a,b,inherited"));
}

#[test]
fn test_for_in_skips_hidden_and_deleted() {
    let source = r#"
        var o = {a: 1, b: 2, c: 3};
        Object.defineProperty(o, 'h', {value: 4, enumerable: false});
        delete o.b;
        var keys = [];
        for (var k in o) keys.push(k);
        keys.join(',')
    "#;
    assert_eq!(eval(source), JsValue::from("a,c"));
}

#[test]
fn test_for_in_over_array() {
    assert_eq!(
        eval("var s = ''; for (var i in ['x', 'y']) s += i; s"),
        JsValue::from("01")
    );
}

#[test]
fn test_for_in_null_runs_no_iterations() {
    assert_eq!(eval("var n = 0; for (var k in null) n++; n"), JsValue::Int(0));
}

#[test]
fn test_with_statement() {
    assert_eq!(eval("var o = {a: 5}; var r; with (o) { r = a * 2; } r"), JsValue::Int(10));
    assert_eq!(eval("var o = {a: 5}; with (o) { a = 7; } o.a"), JsValue::Int(7));
}

#[test]
fn test_block_function_declarations() {
    assert_eq!(
        eval("var r; if (true) { function inner() { return 4; } r = inner(); } r"),
        JsValue::Int(4)
    );
}

#[test]
fn test_return_inside_for_in_and_finally_repeatedly() {
    // Each return leaves iterator state and finally markers behind; running
    // many times shows nothing accumulates between calls
    assert_eq!(
        eval(
            "function first(o) { for (var k in o) { for (var j in o) return k + j; } }
             function fin() { try { throw 'x'; } finally { return 1; } }
             function scoped(o) { with (o) { try { return v; } finally { v++; } } }
             var o = {v: 0}, acc = 0;
             for (var i = 0; i < 1000; i++) acc += first({a: 1}).length + fin() + scoped(o);
             acc + ':' + o.v"
        ),
        JsValue::from("502500:1000")
    );
}
