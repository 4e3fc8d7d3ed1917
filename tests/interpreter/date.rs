//! Date tests
//!
//! Local-time expectations run with a fixed zone so they hold on any host.

use super::{eval, throws_error};
use jscore::{Engine, EngineConfig, JsValue};

/// Evaluate with local time fixed at `offset` minutes east of UTC
#[allow(clippy::expect_used)]
fn eval_in_zone(offset: i32, source: &str) -> JsValue {
    let mut engine = Engine::with_config(EngineConfig {
        utc_offset: Some(offset),
        ..EngineConfig::default()
    });
    engine.eval(source).expect("eval failed")
}

#[test]
fn test_utc_fields() {
    assert_eq!(
        eval("Date.UTC(2024, 1, 29, 13, 45, 30, 250)"),
        JsValue::Number(1_709_214_330_250.0)
    );
    assert_eq!(
        eval(
            "var d = new Date(Date.UTC(2024, 1, 29, 13, 45, 30, 250));
             [d.getUTCFullYear(), d.getUTCMonth(), d.getUTCDate(), d.getUTCDay(),
              d.getUTCHours(), d.getUTCMinutes(), d.getUTCSeconds(), d.getUTCMilliseconds()].join()"
        ),
        JsValue::from("2024,1,29,4,13,45,30,250")
    );
    assert_eq!(eval("new Date(0).getTime()"), JsValue::Int(0));
    assert_eq!(eval("new Date(-1).getUTCFullYear()"), JsValue::Int(1969));
    // Two-digit years name the twentieth century
    assert_eq!(eval("Date.UTC(99, 0) === Date.UTC(1999, 0)"), JsValue::Boolean(true));
}

#[test]
fn test_local_fields_follow_the_zone() {
    assert_eq!(
        eval_in_zone(
            60,
            "var d = new Date(2024, 0, 15, 10, 30);
             [d.getHours(), d.getUTCHours(), d.getMinutes(), d.getTimezoneOffset(),
              d.getTime() === Date.UTC(2024, 0, 15, 9, 30)].join()"
        ),
        JsValue::from("10,9,30,-60,true")
    );
    assert_eq!(
        eval_in_zone(-300, "var d = new Date(Date.UTC(2024, 0, 1, 2)); [d.getDate(), d.getDay(), d.getFullYear()].join()"),
        JsValue::from("31,0,2023")
    );
}

#[test]
fn test_out_of_range_fields_roll_over() {
    assert_eq!(
        eval_in_zone(0, "var d = new Date(2024, 12, 32); [d.getFullYear(), d.getMonth(), d.getDate()].join()"),
        JsValue::from("2025,1,1")
    );
    assert_eq!(
        eval_in_zone(0, "var d = new Date(2024, 2, 0); d.getDate()"),
        JsValue::Int(29)
    );
    assert_eq!(eval("isNaN(new Date(8.64e15 + 1).getTime())"), JsValue::Boolean(true));
    assert_eq!(eval("isNaN(Date.UTC(NaN, 0))"), JsValue::Boolean(true));
}

#[test]
fn test_setters() {
    assert_eq!(
        eval(
            "var d = new Date(Date.UTC(2024, 0, 31));
             var r = d.setUTCMonth(1);
             [r === d.getTime(), d.getUTCMonth(), d.getUTCDate()].join()"
        ),
        JsValue::from("true,2,2")
    );
    assert_eq!(
        eval("var d = new Date(Date.UTC(2024, 0, 1)); d.setUTCHours(25, 5); [d.getUTCDate(), d.getUTCHours(), d.getUTCMinutes()].join()"),
        JsValue::from("2,1,5")
    );
    assert_eq!(
        eval_in_zone(
            120,
            "var d = new Date(2024, 5, 10, 8);
             d.setHours(23, 59, 59, 999);
             d.setDate(d.getDate() + 1);
             d.setMilliseconds(0);
             [d.getDate(), d.getHours(), d.getSeconds(), d.getMilliseconds(), d.getUTCHours()].join()"
        ),
        JsValue::from("11,23,59,0,21")
    );
    assert_eq!(
        eval("var d = new Date(0); d.setTime(86400000); d.getUTCDate()"),
        JsValue::Int(2)
    );
    // Only a year can revive an invalid date
    assert_eq!(
        eval_in_zone(0, "var d = new Date(NaN); var a = d.setMonth(1); d.setFullYear(2020); [isNaN(a), d.getFullYear(), d.getMonth()].join()"),
        JsValue::from("true,2020,0")
    );
    assert_eq!(
        eval_in_zone(0, "var d = new Date(1995, 0, 1); var a = d.getYear(); d.setYear(99); [a, d.getFullYear(), new Date(2005, 0, 1).getYear()].join()"),
        JsValue::from("95,1999,2005")
    );
}

#[test]
fn test_string_forms() {
    let script = |expr: &str| format!("var d = new Date(Date.UTC(2024, 11, 25, 9, 30, 5)); {}", expr);
    assert_eq!(
        eval_in_zone(60, &script("d.toString()")),
        JsValue::from("Wed Dec 25 10:30:05 UTC+0100 2024")
    );
    assert_eq!(eval_in_zone(0, &script("String(d)")), JsValue::from("Wed Dec 25 09:30:05 UTC 2024"));
    assert_eq!(
        eval_in_zone(60, &script("d.toUTCString()")),
        JsValue::from("Wed, 25 Dec 2024 09:30:05 UTC")
    );
    assert_eq!(eval_in_zone(60, &script("d.toDateString()")), JsValue::from("Wed Dec 25 2024"));
    assert_eq!(eval_in_zone(-90, &script("d.toTimeString()")), JsValue::from("08:00:05 UTC-0130"));
    assert_eq!(
        eval_in_zone(60, &script("d.toLocaleString()")),
        JsValue::from("Wednesday, December 25, 2024 10:30:05 AM")
    );
    assert_eq!(eval("String(new Date(NaN))"), JsValue::from("NaN"));
    assert_eq!(eval("typeof Date()"), JsValue::from("string"));
}

#[test]
fn test_conversions() {
    // A date converts like a string under `+` and like a number under `-`
    assert_eq!(
        eval("var d = new Date(5000); [typeof (d + 1), d - 0, +d, d.valueOf()].join()"),
        JsValue::from("string,5000,5000,5000")
    );
    assert_eq!(eval("new Date(1000) < new Date(2000)"), JsValue::Boolean(true));
    assert_eq!(
        eval("Object.prototype.toString.call(new Date(0))"),
        JsValue::from("[object Date]")
    );
    assert_eq!(eval("new Date(new Date(1234)).getTime()"), JsValue::Int(1000));
    assert_eq!(
        eval("Math.abs(new Date().getTime() - Date.now()) < 5000"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_parse() {
    assert_eq!(
        eval_in_zone(0, "Date.parse('12/25/2024') === Date.UTC(2024, 11, 25)"),
        JsValue::Boolean(true)
    );
    assert_eq!(
        eval_in_zone(0, "Date.parse('2024/12/25') === Date.UTC(2024, 11, 25)"),
        JsValue::Boolean(true)
    );
    assert_eq!(
        eval_in_zone(120, "Date.parse('Dec 25, 2024 10:30:00 UTC') === Date.UTC(2024, 11, 25, 10, 30)"),
        JsValue::Boolean(true)
    );
    assert_eq!(
        eval_in_zone(0, "Date.parse('Wed Dec 25 10:30:05 UTC+0100 2024') === Date.UTC(2024, 11, 25, 9, 30, 5)"),
        JsValue::Boolean(true)
    );
    assert_eq!(
        eval_in_zone(0, "Date.parse('December 25, 2024 10:30 PM') === Date.UTC(2024, 11, 25, 22, 30)"),
        JsValue::Boolean(true)
    );
    // Without a zone the fields are local time
    assert_eq!(
        eval_in_zone(60, "Date.parse('(xmas) Dec 25 2024 10:00') === Date.UTC(2024, 11, 25, 9)"),
        JsValue::Boolean(true)
    );
    assert_eq!(
        eval_in_zone(60, "var d = new Date(2024, 6, 4, 12, 0, 30); Date.parse(d.toString()) === d.getTime()"),
        JsValue::Boolean(true)
    );
    assert_eq!(
        eval_in_zone(0, "new Date('Jan 2 2001').getTime() === Date.UTC(2001, 0, 2)"),
        JsValue::Boolean(true)
    );

    for bad in ["'garbage'", "'Dec 25'", "'Dec 25 2024)'", "'13:00 PM Dec 25 2024'", ""] {
        assert_eq!(
            eval(&format!("isNaN(Date.parse({}))", bad)),
            JsValue::Boolean(true),
            "{}",
            bad
        );
    }
}

#[test]
fn test_date_methods_require_a_date() {
    assert!(throws_error("Date.prototype.getTime.call({})", "Date object expected"));
    assert_eq!(
        eval("var r; try { Date.prototype.getHours.call(5); } catch (e) { r = e instanceof TypeError; } r"),
        JsValue::Boolean(true)
    );
    assert!(throws_error("new Date(0).setTime()", "Argument not optional"));
    assert!(throws_error("new Date(0).setUTCHours()", "Argument not optional"));
}
