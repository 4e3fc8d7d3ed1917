//! Array tests: length tracking, holes and Array.prototype methods

use super::eval;
use jscore::JsValue;

#[test]
fn test_array_literal() {
    assert_eq!(eval("[1, 2, 3].length"), JsValue::Int(3));
    assert_eq!(eval("[1, , 3].length"), JsValue::Int(3));
    assert_eq!(eval("var a = [1, , 3]; 1 in a"), JsValue::Boolean(false));
    assert_eq!(eval("[].length"), JsValue::Int(0));
}

#[test]
fn test_length_follows_index_writes() {
    assert_eq!(eval("var a = []; a[4] = 'x'; a.length"), JsValue::Int(5));
    assert_eq!(eval("var a = [1]; a['2'] = 3; a.length"), JsValue::Int(3));
    assert_eq!(eval("var a = [1]; a.foo = 3; a.length"), JsValue::Int(1));
}

#[test]
fn test_length_setter_truncates() {
    assert_eq!(
        eval("var a = [1, 2, 3, 4]; a.length = 2; a.join(',') + '|' + typeof a[3]"),
        JsValue::from("1,2|undefined")
    );
    assert_eq!(eval("var a = [1]; a.length = 3; a.length"), JsValue::Int(3));
}

#[test]
fn test_invalid_length_is_range_error() {
    assert_eq!(
        eval("var r; try { [].length = -1; } catch (e) { r = e instanceof RangeError; } r"),
        JsValue::Boolean(true)
    );
    assert_eq!(
        eval("var r; try { new Array(1.5); } catch (e) { r = e instanceof RangeError; } r"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_array_constructor() {
    assert_eq!(eval("new Array(3).length"), JsValue::Int(3));
    assert_eq!(eval("new Array(1, 2).join('-')"), JsValue::from("1-2"));
    assert_eq!(eval("Array('a').length"), JsValue::Int(1));
}

#[test]
fn test_push_and_pop() {
    assert_eq!(eval("var a = [1]; a.push(2, 3)"), JsValue::Int(3));
    assert_eq!(eval("var a = [1, 2]; a.pop() + ':' + a.length"), JsValue::from("2:1"));
    assert_eq!(eval("typeof [].pop()"), JsValue::from("undefined"));
}

#[test]
fn test_shift_and_unshift() {
    assert_eq!(eval("var a = [1, 2, 3]; a.shift() + ':' + a.join(',')"), JsValue::from("1:2,3"));
    assert_eq!(eval("var a = [3]; a.unshift(1, 2) + ':' + a.join(',')"), JsValue::from("3:1,2,3"));
}

#[test]
fn test_reverse() {
    assert_eq!(eval("[1, 2, 3].reverse().join(',')"), JsValue::from("3,2,1"));
    assert_eq!(eval("var a = [1, , 3]; a.reverse(); 1 in a"), JsValue::Boolean(false));
}

#[test]
fn test_concat() {
    assert_eq!(eval("[1].concat([2, 3], 4).join(',')"), JsValue::from("1,2,3,4"));
    assert_eq!(eval("var a = [1]; a.concat(2); a.length"), JsValue::Int(1));
}

#[test]
fn test_slice() {
    assert_eq!(eval("[1, 2, 3, 4].slice(1, 3).join(',')"), JsValue::from("2,3"));
    assert_eq!(eval("[1, 2, 3, 4].slice(-2).join(',')"), JsValue::from("3,4"));
    assert_eq!(eval("[1, 2, 3].slice().length"), JsValue::Int(3));
}

#[test]
fn test_join_and_to_string() {
    assert_eq!(eval("[1, null, undefined, 'x'].join()"), JsValue::from("1,,,x"));
    assert_eq!(eval("[1, 2].join(' + ')"), JsValue::from("1 + 2"));
    assert_eq!(eval("String([1, [2, 3]])"), JsValue::from("1,2,3"));
}

#[test]
fn test_index_of() {
    assert_eq!(eval("[1, 2, 3, 2].indexOf(2)"), JsValue::Int(1));
    assert_eq!(eval("[1, 2, 3, 2].indexOf(2, 2)"), JsValue::Int(3));
    assert_eq!(eval("[1, 2, 3].indexOf('2')"), JsValue::Int(-1));
}

#[test]
fn test_generic_methods_on_array_like() {
    assert_eq!(
        eval("var o = {length: 2, 0: 'a', 1: 'b'}; Array.prototype.join.call(o, '+')"),
        JsValue::from("a+b")
    );
}
