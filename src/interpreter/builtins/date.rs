//! Date built-in methods
//!
//! A date holds a time value: milliseconds since 1970-01-01T00:00:00 UTC as
//! an `f64`, NaN when invalid. Calendar fields are computed from the time
//! value arithmetically so that out-of-range fields roll over the way
//! `new Date(2024, 12, 32)` expects. chrono supplies the clock and the
//! host's offset from UTC.

use chrono::{Local, TimeZone, Utc};
use log::trace;

use crate::error::{ErrorCode, ErrorKind, JsError};
use crate::interpreter::{Interpreter, PreferredType};
use crate::object::{DateData, ObjectData};
use crate::value::JsValue;

const MS_PER_DAY: f64 = 86_400_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_SECOND: f64 = 1000.0;

/// Time values beyond this many milliseconds from the epoch are invalid
const MAX_TIME: f64 = 8.64e15;

/// First day of each month in a common year
const MONTH_START: [f64; 12] = [
    0.0, 31.0, 59.0, 90.0, 120.0, 151.0, 181.0, 212.0, 243.0, 273.0, 304.0, 334.0,
];

const WEEK_DAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Initialize Date.prototype and publish the Date constructor
pub fn init_date(interp: &mut Interpreter) {
    let proto = interp.date_prototype.clone();

    interp.register_method(&proto, "getTime", date_get_time, 0);
    interp.register_method(&proto, "valueOf", date_get_time, 0);
    interp.register_method(&proto, "getTimezoneOffset", date_get_timezone_offset, 0);

    interp.register_method(&proto, "getFullYear", date_get_full_year, 0);
    interp.register_method(&proto, "getYear", date_get_year, 0);
    interp.register_method(&proto, "getMonth", date_get_month, 0);
    interp.register_method(&proto, "getDate", date_get_date, 0);
    interp.register_method(&proto, "getDay", date_get_day, 0);
    interp.register_method(&proto, "getHours", date_get_hours, 0);
    interp.register_method(&proto, "getMinutes", date_get_minutes, 0);
    interp.register_method(&proto, "getSeconds", date_get_seconds, 0);
    interp.register_method(&proto, "getMilliseconds", date_get_milliseconds, 0);

    interp.register_method(&proto, "getUTCFullYear", date_get_utc_full_year, 0);
    interp.register_method(&proto, "getUTCMonth", date_get_utc_month, 0);
    interp.register_method(&proto, "getUTCDate", date_get_utc_date, 0);
    interp.register_method(&proto, "getUTCDay", date_get_utc_day, 0);
    interp.register_method(&proto, "getUTCHours", date_get_utc_hours, 0);
    interp.register_method(&proto, "getUTCMinutes", date_get_utc_minutes, 0);
    interp.register_method(&proto, "getUTCSeconds", date_get_utc_seconds, 0);
    interp.register_method(&proto, "getUTCMilliseconds", date_get_utc_milliseconds, 0);

    interp.register_method(&proto, "setTime", date_set_time, 1);
    interp.register_method(&proto, "setFullYear", date_set_full_year, 3);
    interp.register_method(&proto, "setYear", date_set_year, 1);
    interp.register_method(&proto, "setMonth", date_set_month, 2);
    interp.register_method(&proto, "setDate", date_set_date, 1);
    interp.register_method(&proto, "setHours", date_set_hours, 4);
    interp.register_method(&proto, "setMinutes", date_set_minutes, 3);
    interp.register_method(&proto, "setSeconds", date_set_seconds, 2);
    interp.register_method(&proto, "setMilliseconds", date_set_milliseconds, 1);

    interp.register_method(&proto, "setUTCFullYear", date_set_utc_full_year, 3);
    interp.register_method(&proto, "setUTCMonth", date_set_utc_month, 2);
    interp.register_method(&proto, "setUTCDate", date_set_utc_date, 1);
    interp.register_method(&proto, "setUTCHours", date_set_utc_hours, 4);
    interp.register_method(&proto, "setUTCMinutes", date_set_utc_minutes, 3);
    interp.register_method(&proto, "setUTCSeconds", date_set_utc_seconds, 2);
    interp.register_method(&proto, "setUTCMilliseconds", date_set_utc_milliseconds, 1);

    interp.register_method(&proto, "toString", date_to_string, 0);
    interp.register_method(&proto, "toDateString", date_to_date_string, 0);
    interp.register_method(&proto, "toTimeString", date_to_time_string, 0);
    interp.register_method(&proto, "toUTCString", date_to_utc_string, 0);
    interp.register_method(&proto, "toGMTString", date_to_utc_string, 0);
    interp.register_method(&proto, "toLocaleString", date_to_locale_string, 0);
    interp.register_method(&proto, "toLocaleDateString", date_to_locale_date_string, 0);
    interp.register_method(&proto, "toLocaleTimeString", date_to_locale_time_string, 0);

    let constructor = interp.create_constructor("Date", date_call, date_construct, 7, &proto);
    interp.register_method(&constructor, "UTC", date_utc, 7);
    interp.register_method(&constructor, "parse", date_parse, 1);
    interp.register_method(&constructor, "now", date_now, 0);
    interp.define_global("Date", JsValue::Object(constructor));
}

// ═══════════════════════════════════════════════════════════════════════════
// Time value arithmetic
// ═══════════════════════════════════════════════════════════════════════════

fn day(t: f64) -> f64 {
    (t / MS_PER_DAY).floor()
}

fn time_within_day(t: f64) -> f64 {
    t.rem_euclid(MS_PER_DAY)
}

fn is_leap_year(year: f64) -> bool {
    year % 4.0 == 0.0 && (year % 100.0 != 0.0 || year % 400.0 == 0.0)
}

/// Day number of January 1st of `year`; NaN unless `year` is integral
fn day_from_year(year: f64) -> f64 {
    if !year.is_finite() || year.fract() != 0.0 {
        return f64::NAN;
    }
    365.0 * (year - 1970.0) + ((year - 1969.0) / 4.0).floor() - ((year - 1901.0) / 100.0).floor()
        + ((year - 1601.0) / 400.0).floor()
}

fn time_from_year(year: f64) -> f64 {
    MS_PER_DAY * day_from_year(year)
}

fn year_from_time(t: f64) -> f64 {
    if !t.is_finite() {
        return f64::NAN;
    }
    let mut year = (1970.0 + t / MS_PER_DAY / 365.2425).floor();
    while time_from_year(year) > t {
        year -= 1.0;
    }
    while time_from_year(year + 1.0) <= t {
        year += 1.0;
    }
    year
}

fn month_start(month: usize, leap: bool) -> f64 {
    let start = MONTH_START.get(month).copied().unwrap_or(0.0);
    if leap && month >= 2 { start + 1.0 } else { start }
}

/// Month (0-11) and day of month (1-31) of a time value
fn month_and_date(t: f64) -> (f64, f64) {
    if !t.is_finite() {
        return (f64::NAN, f64::NAN);
    }
    let year = year_from_time(t);
    let leap = is_leap_year(year);
    let day_in_year = day(t) - day_from_year(year);
    let month = (1..12)
        .rev()
        .find(|&m| day_in_year >= month_start(m, leap))
        .unwrap_or(0);
    (month as f64, day_in_year - month_start(month, leap) + 1.0)
}

fn month_from_time(t: f64) -> f64 {
    month_and_date(t).0
}

fn date_from_time(t: f64) -> f64 {
    month_and_date(t).1
}

fn week_day(t: f64) -> f64 {
    (day(t) + 4.0).rem_euclid(7.0)
}

fn hour_from_time(t: f64) -> f64 {
    (t / MS_PER_HOUR).floor().rem_euclid(24.0)
}

fn min_from_time(t: f64) -> f64 {
    (t / MS_PER_MINUTE).floor().rem_euclid(60.0)
}

fn sec_from_time(t: f64) -> f64 {
    (t / MS_PER_SECOND).floor().rem_euclid(60.0)
}

fn ms_from_time(t: f64) -> f64 {
    t.rem_euclid(MS_PER_SECOND)
}

fn make_time(hour: f64, min: f64, sec: f64, ms: f64) -> f64 {
    hour * MS_PER_HOUR + min * MS_PER_MINUTE + sec * MS_PER_SECOND + ms
}

/// Day number of a calendar date; months outside 0-11 carry into the year
fn make_day(year: f64, month: f64, date: f64) -> f64 {
    if !year.is_finite() || !month.is_finite() || !date.is_finite() {
        return f64::NAN;
    }
    let year = year + (month / 12.0).floor();
    let month = month.rem_euclid(12.0);
    let first = day_from_year(year);
    first + month_start(month as usize, is_leap_year(year)) + date - 1.0
}

fn make_date(day: f64, time: f64) -> f64 {
    day * MS_PER_DAY + time
}

fn time_clip(t: f64) -> f64 {
    if !t.is_finite() || t.abs() > MAX_TIME {
        return f64::NAN;
    }
    t.floor() + 0.0
}

/// Two-digit years name the twentieth century
fn full_year(year: f64) -> f64 {
    if (0.0..=99.0).contains(&year) { year + 1900.0 } else { year }
}

fn now() -> f64 {
    Utc::now().timestamp_millis() as f64
}

// ═══════════════════════════════════════════════════════════════════════════
// Local time
// ═══════════════════════════════════════════════════════════════════════════

/// Offset of local time from UTC at time value `t`, in milliseconds
fn local_offset(interp: &Interpreter, t: f64) -> f64 {
    if let Some(minutes) = interp.config.utc_offset {
        return f64::from(minutes) * MS_PER_MINUTE;
    }
    if !t.is_finite() {
        return 0.0;
    }
    match Utc.timestamp_millis_opt(t as i64).single() {
        Some(instant) => {
            let offset = Local.offset_from_utc_datetime(&instant.naive_utc());
            f64::from(offset.local_minus_utc()) * MS_PER_SECOND
        }
        None => 0.0,
    }
}

fn local_time(interp: &Interpreter, t: f64) -> f64 {
    t + local_offset(interp, t)
}

/// Inverse of `local_time`; the offset is looked up at the UTC guess so
/// daylight-saving transitions resolve to the later reading
fn utc(interp: &Interpreter, local: f64) -> f64 {
    let guess = local - local_offset(interp, local);
    local - local_offset(interp, guess)
}

// ═══════════════════════════════════════════════════════════════════════════
// Constructor and static methods
// ═══════════════════════════════════════════════════════════════════════════

/// Date(): the current time as a string, whatever the arguments
pub fn date_call(interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let local = local_time(interp, now());
    Ok(JsValue::from(format!(
        "{} {} {}",
        date_part(local),
        clock(local),
        year_with_era(local)
    )))
}

/// new Date(), new Date(value), new Date(year, month[, date[, hours[, minutes[, seconds[, ms]]]]])
pub fn date_construct(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let time = match args {
        [] => now(),
        [value] => match interp.to_primitive(value, PreferredType::Default)? {
            JsValue::String(s) => parse_date(interp, s.as_str()),
            primitive => time_clip(primitive.to_number()),
        },
        _ => {
            let local = utc_from_args(interp, args)?;
            time_clip(utc(interp, local))
        }
    };
    trace!("new Date: {}", time);
    let obj = interp.alloc(
        ObjectData::Date(DateData(time)),
        Some(interp.date_prototype.clone()),
    );
    Ok(JsValue::Object(obj))
}

/// Time value from year, month, date, hours, minutes, seconds and ms
/// arguments, read as UTC
fn utc_from_args(interp: &mut Interpreter, args: &[JsValue]) -> Result<f64, JsError> {
    let mut fields = [1900.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
    for (field, value) in fields.iter_mut().zip(args) {
        *field = interp.to_number(value)?;
    }
    let [year, month, date, hours, minutes, seconds, ms] = fields;
    Ok(time_clip(make_date(
        make_day(full_year(year), month, date),
        make_time(hours, minutes, seconds, ms),
    )))
}

/// Date.UTC(year, month[, date[, hours[, minutes[, seconds[, ms]]]]])
pub fn date_utc(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::number(utc_from_args(interp, args)?))
}

/// Date.parse(string)
pub fn date_parse(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let Some(value) = args.first() else {
        return Ok(JsValue::number(f64::NAN));
    };
    let text = interp.to_string(value)?;
    Ok(JsValue::number(parse_date(interp, text.as_str())))
}

pub fn date_now(_interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::number(now()))
}

// ═══════════════════════════════════════════════════════════════════════════
// Getters
// ═══════════════════════════════════════════════════════════════════════════

fn this_time(this: &JsValue) -> Result<f64, JsError> {
    match this {
        JsValue::Object(obj) => match &obj.borrow().data {
            ObjectData::Date(DateData(t)) => Ok(*t),
            _ => Err(date_expected()),
        },
        _ => Err(date_expected()),
    }
}

fn date_expected() -> JsError {
    JsError::type_error(ErrorCode::DATE_EXPECTED, "Date object expected")
}

fn local_field(interp: &Interpreter, this: &JsValue, field: fn(f64) -> f64) -> Result<JsValue, JsError> {
    let t = this_time(this)?;
    Ok(JsValue::number(field(local_time(interp, t))))
}

fn utc_field(this: &JsValue, field: fn(f64) -> f64) -> Result<JsValue, JsError> {
    Ok(JsValue::number(field(this_time(this)?)))
}

/// Date.prototype.getTime / valueOf
pub fn date_get_time(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::number(this_time(&this)?))
}

/// Minutes to add to local time to get UTC
pub fn date_get_timezone_offset(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    let t = this_time(&this)?;
    Ok(JsValue::number(((t - local_time(interp, t)) / MS_PER_MINUTE).floor()))
}

pub fn date_get_full_year(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    local_field(interp, &this, year_from_time)
}

/// Years 1900-1999 come back as two digits
pub fn date_get_year(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    local_field(interp, &this, |t| {
        let year = year_from_time(t);
        if (1900.0..2000.0).contains(&year) { year - 1900.0 } else { year }
    })
}

pub fn date_get_month(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    local_field(interp, &this, month_from_time)
}

pub fn date_get_date(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    local_field(interp, &this, date_from_time)
}

pub fn date_get_day(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    local_field(interp, &this, week_day)
}

pub fn date_get_hours(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    local_field(interp, &this, hour_from_time)
}

pub fn date_get_minutes(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    local_field(interp, &this, min_from_time)
}

pub fn date_get_seconds(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    local_field(interp, &this, sec_from_time)
}

pub fn date_get_milliseconds(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    local_field(interp, &this, ms_from_time)
}

pub fn date_get_utc_full_year(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    utc_field(&this, year_from_time)
}

pub fn date_get_utc_month(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    utc_field(&this, month_from_time)
}

pub fn date_get_utc_date(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    utc_field(&this, date_from_time)
}

pub fn date_get_utc_day(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    utc_field(&this, week_day)
}

pub fn date_get_utc_hours(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    utc_field(&this, hour_from_time)
}

pub fn date_get_utc_minutes(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    utc_field(&this, min_from_time)
}

pub fn date_get_utc_seconds(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    utc_field(&this, sec_from_time)
}

pub fn date_get_utc_milliseconds(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    utc_field(&this, ms_from_time)
}

// ═══════════════════════════════════════════════════════════════════════════
// Setters
// ═══════════════════════════════════════════════════════════════════════════

/// First calendar field a setter replaces; later arguments fill the
/// fields that follow it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Year,
    Month,
    Date,
    Hours,
    Minutes,
    Seconds,
    Ms,
}

impl Field {
    fn index(self) -> usize {
        self as usize
    }

    /// Arguments the setter accepts
    fn arity(self) -> usize {
        match self {
            Field::Year | Field::Minutes => 3,
            Field::Month | Field::Seconds => 2,
            Field::Date | Field::Ms => 1,
            Field::Hours => 4,
        }
    }
}

fn missing_arg() -> JsError {
    JsError::runtime(ErrorKind::Error, ErrorCode::MISSING_ARG, "Argument not optional")
}

fn store_time(this: &JsValue, t: f64) -> Result<JsValue, JsError> {
    let JsValue::Object(obj) = this else {
        return Err(date_expected());
    };
    match &mut obj.borrow_mut().data {
        ObjectData::Date(data) => {
            data.0 = t;
            Ok(JsValue::number(t))
        }
        _ => Err(date_expected()),
    }
}

/// Replace calendar fields of `this` from `args`, in local time or UTC
fn set_fields(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    first: Field,
    local: bool,
) -> Result<JsValue, JsError> {
    let current = this_time(this)?;
    if args.is_empty() {
        return Err(missing_arg());
    }
    let mut t = if local { local_time(interp, current) } else { current };
    // A year can be given to an invalid date; other fields keep it invalid
    if first == Field::Year && t.is_nan() {
        t = 0.0;
    }

    let (month, date) = month_and_date(t);
    let mut fields = [
        year_from_time(t),
        month,
        date,
        hour_from_time(t),
        min_from_time(t),
        sec_from_time(t),
        ms_from_time(t),
    ];
    let replaced = fields.iter_mut().skip(first.index()).take(first.arity());
    for (field, value) in replaced.zip(args) {
        *field = interp.to_number(value)?;
    }
    let [year, month, date, hours, minutes, seconds, ms] = fields;

    let updated = make_date(make_day(year, month, date), make_time(hours, minutes, seconds, ms));
    let updated = if local { utc(interp, updated) } else { updated };
    store_time(this, time_clip(updated))
}

/// Date.prototype.setTime(time)
pub fn date_set_time(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    this_time(&this)?;
    let value = args.first().ok_or_else(missing_arg)?;
    let t = interp.to_number(value)?;
    store_time(&this, time_clip(t))
}

/// Date.prototype.setYear(year): two-digit years name the twentieth century
pub fn date_set_year(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let current = this_time(&this)?;
    let value = args.first().ok_or_else(missing_arg)?;
    let year = interp.to_number(value)?;
    if year.is_nan() {
        return store_time(&this, f64::NAN);
    }
    let year = year.trunc();
    let year = if year > -1.0 && year < 100.0 { year + 1900.0 } else { year };
    let t = local_time(interp, current);
    let updated = make_date(
        make_day(year, month_from_time(t), date_from_time(t)),
        time_within_day(t),
    );
    store_time(&this, time_clip(utc(interp, updated)))
}

pub fn date_set_full_year(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Year, true)
}

pub fn date_set_month(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Month, true)
}

pub fn date_set_date(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Date, true)
}

pub fn date_set_hours(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Hours, true)
}

pub fn date_set_minutes(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Minutes, true)
}

pub fn date_set_seconds(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Seconds, true)
}

pub fn date_set_milliseconds(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Ms, true)
}

pub fn date_set_utc_full_year(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Year, false)
}

pub fn date_set_utc_month(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Month, false)
}

pub fn date_set_utc_date(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Date, false)
}

pub fn date_set_utc_hours(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Hours, false)
}

pub fn date_set_utc_minutes(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Minutes, false)
}

pub fn date_set_utc_seconds(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Seconds, false)
}

pub fn date_set_utc_milliseconds(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    set_fields(interp, &this, args, Field::Ms, false)
}

// ═══════════════════════════════════════════════════════════════════════════
// String forms
// ═══════════════════════════════════════════════════════════════════════════

fn short_name(names: &[&'static str], index: f64) -> String {
    full_name(names, index).chars().take(3).collect()
}

/// `Wed Dec 25`
fn date_part(t: f64) -> String {
    format!(
        "{} {} {}",
        short_name(&WEEK_DAYS, week_day(t)),
        short_name(&MONTHS, month_from_time(t)),
        date_from_time(t)
    )
}

/// `10:30:05`
fn clock(t: f64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        hour_from_time(t),
        min_from_time(t),
        sec_from_time(t)
    )
}

/// Years before 1 AD are counted backwards and marked
fn year_with_era(t: f64) -> String {
    let year = year_from_time(t);
    if year < 0.0 {
        format!("{} B.C.", -year + 1.0)
    } else {
        format!("{}", year)
    }
}

/// `UTC+0100`, or `UTC` at zero offset
fn zone(offset_ms: f64) -> String {
    let minutes = (offset_ms / MS_PER_MINUTE).round() as i64;
    if minutes == 0 {
        return "UTC".to_string();
    }
    let sign = if minutes > 0 { '+' } else { '-' };
    let minutes = minutes.abs();
    format!("UTC{}{:02}{:02}", sign, minutes / 60, minutes % 60)
}

/// Apply `render` to the local time of `this`, or answer "NaN"
fn render_local(
    interp: &Interpreter,
    this: &JsValue,
    render: impl Fn(f64, f64) -> String,
) -> Result<JsValue, JsError> {
    let t = this_time(this)?;
    if t.is_nan() {
        return Ok(JsValue::from("NaN"));
    }
    let offset = local_offset(interp, t);
    Ok(JsValue::from(render(t + offset, offset)))
}

/// `Wed Dec 25 10:30:05 UTC+0100 2024`
pub fn date_to_string(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    render_local(interp, &this, |t, offset| {
        format!("{} {} {} {}", date_part(t), clock(t), zone(offset), year_with_era(t))
    })
}

/// `Wed Dec 25 2024`
pub fn date_to_date_string(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    render_local(interp, &this, |t, _| format!("{} {}", date_part(t), year_with_era(t)))
}

/// `10:30:05 UTC+0100`
pub fn date_to_time_string(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    render_local(interp, &this, |t, offset| format!("{} {}", clock(t), zone(offset)))
}

/// `Wed, 25 Dec 2024 09:30:05 UTC`
pub fn date_to_utc_string(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let t = this_time(&this)?;
    if t.is_nan() {
        return Ok(JsValue::from("NaN"));
    }
    Ok(JsValue::from(format!(
        "{}, {} {} {} {} UTC",
        short_name(&WEEK_DAYS, week_day(t)),
        date_from_time(t),
        short_name(&MONTHS, month_from_time(t)),
        year_with_era(t),
        clock(t)
    )))
}

fn full_name(names: &[&'static str], index: f64) -> &'static str {
    names.get(index as usize).copied().unwrap_or_default()
}

/// `Wednesday, December 25, 2024`
fn long_date(t: f64) -> String {
    format!(
        "{}, {} {}, {}",
        full_name(&WEEK_DAYS, week_day(t)),
        full_name(&MONTHS, month_from_time(t)),
        date_from_time(t),
        year_with_era(t)
    )
}

/// `10:30:05 AM`
fn twelve_hour_clock(t: f64) -> String {
    let hour = hour_from_time(t);
    let (hour, suffix) = match hour {
        h if h == 0.0 => (12.0, "AM"),
        h if h < 12.0 => (h, "AM"),
        h if h == 12.0 => (12.0, "PM"),
        h => (h - 12.0, "PM"),
    };
    format!(
        "{}:{:02}:{:02} {}",
        hour,
        min_from_time(t),
        sec_from_time(t),
        suffix
    )
}

pub fn date_to_locale_string(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    render_local(interp, &this, |t, _| format!("{} {}", long_date(t), twelve_hour_clock(t)))
}

pub fn date_to_locale_date_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    render_local(interp, &this, |t, _| long_date(t))
}

pub fn date_to_locale_time_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    render_local(interp, &this, |t, _| twelve_hour_clock(t))
}

// ═══════════════════════════════════════════════════════════════════════════
// Parsing
// ═══════════════════════════════════════════════════════════════════════════

/// Cursor over the upper-cased text being parsed
struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn skip_spaces(&mut self) {
        self.skip_while(char::is_whitespace);
    }

    fn skip_char(&mut self, c: char) {
        if self.peek() == Some(c) {
            self.pos += 1;
        }
    }

    fn at_digit(&self) -> bool {
        self.peek().is_some_and(|c| c.is_ascii_digit())
    }

    fn at_letter(&self, ahead: usize) -> bool {
        self.peek_at(ahead).is_some_and(|c| c.is_ascii_uppercase())
    }

    fn number(&mut self) -> i64 {
        let mut n: i64 = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            n = n.saturating_mul(10).saturating_add(i64::from(d));
            self.pos += 1;
        }
        n
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        self.skip_while(|c| c.is_ascii_uppercase());
        self.chars.get(start..self.pos).unwrap_or_default().iter().collect()
    }
}

/// Fields collected while parsing
#[derive(Default)]
struct Parsed {
    year: Option<i64>,
    month: Option<i64>,
    day: Option<i64>,
    time: Option<(i64, i64, i64)>,
    /// Minutes to add to reach UTC
    offset: Option<i64>,
    /// An explicit offset or UTC marker makes the fields UTC; a military
    /// zone letter only shifts the hour
    explicit_zone: bool,
    hour_adjust: i64,
    before_christ: Option<bool>,
    pm: Option<bool>,
}

/// Parse the loose date formats JScript accepts: `12/25/2024 10:30`,
/// `Wed Dec 25 10:30:00 UTC+0100 2024`, `December 25, 2024 10:30 PM`.
/// Parenthesized text is ignored. Unrecognized input yields NaN.
fn parse_date(interp: &Interpreter, text: &str) -> f64 {
    let Some(chars) = strip_comments(text) else {
        return f64::NAN;
    };
    let mut scan = Scanner { chars, pos: 0 };
    let mut p = Parsed::default();
    if scan_fields(&mut scan, &mut p).is_none() || !scan.at_end() {
        return f64::NAN;
    }
    let (Some(year), Some(month), Some(day)) = (p.year, p.month, p.day) else {
        return f64::NAN;
    };
    let (mut hour, min, sec) = p.time.unwrap_or_default();
    if let Some(pm) = p.pm {
        if hour > 12 {
            return f64::NAN;
        }
        if hour == 12 {
            hour = 0;
        }
        if pm {
            hour += 12;
        }
    }
    let year = match p.before_christ {
        Some(true) => 1 - year,
        _ if year < 100 => year + 1900,
        _ => year,
    };

    let fields = make_date(
        make_day(year as f64, month as f64, day as f64),
        make_time((hour + p.hour_adjust) as f64, min as f64, sec as f64, 0.0),
    );
    let t = time_clip(fields) + p.offset.unwrap_or(0) as f64 * MS_PER_MINUTE;
    if p.explicit_zone { t } else { utc(interp, t) }
}

/// Upper-case `text` and drop parenthesized comments; None when a `)` has
/// no opening partner
fn strip_comments(text: &str) -> Option<Vec<char>> {
    let mut depth = 0usize;
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            _ if depth == 0 => out.extend(c.to_uppercase()),
            _ => {}
        }
    }
    Some(out)
}

/// Collect fields until the input ends; None on a token that does not fit
fn scan_fields(scan: &mut Scanner, p: &mut Parsed) -> Option<()> {
    loop {
        scan.skip_spaces();
        let c = match scan.peek() {
            None => return Some(()),
            Some(c) => c,
        };
        if c == ',' {
            scan.skip_while(|c| c == ',');
        } else if c.is_ascii_digit() {
            scan_number_field(scan, p)?;
        } else if c == '+' || c == '-' {
            scan_offset(scan, p)?;
        } else if c.is_ascii_uppercase() {
            scan_word(scan, p)?;
        } else {
            return None;
        }
    }
}

fn scan_number_field(scan: &mut Scanner, p: &mut Parsed) -> Option<()> {
    let n = scan.number();
    scan.skip_spaces();
    match scan.peek() {
        Some(':') => {
            if p.time.is_some() {
                return None;
            }
            scan.skip_while(|c| c == ':');
            scan.skip_spaces();
            let min = if scan.at_digit() { scan.number() } else { 0 };
            scan.skip_spaces();
            scan.skip_while(|c| c == ':');
            scan.skip_spaces();
            let sec = if scan.at_digit() { scan.number() } else { 0 };
            p.time = Some((n, min, sec));
        }
        Some('-' | '/') => {
            // m/d/y, or y/m/d when the first number is a year
            if p.day.is_some() || p.month.is_some() || p.year.is_some() {
                return None;
            }
            scan.skip_spaces();
            scan.skip_while(|c| c == '-' || c == '/');
            scan.skip_spaces();
            if !scan.at_digit() {
                return None;
            }
            let second = scan.number();
            scan.skip_while(|c| c == '-' || c == '/');
            scan.skip_spaces();
            if !scan.at_digit() {
                return None;
            }
            let third = scan.number();
            let (year, month, day) = if n >= 70 { (n, second - 1, third) } else { (third, n - 1, second) };
            p.year = Some(year);
            p.month = Some(month);
            p.day = Some(day);
        }
        _ if n < 70 => {
            if p.day.replace(n).is_some() {
                return None;
            }
        }
        _ => {
            if p.year.replace(n).is_some() {
                return None;
            }
        }
    }
    Some(())
}

/// `+0100`, `-5`: hours below 24, otherwise hhmm
fn scan_offset(scan: &mut Scanner, p: &mut Parsed) -> Option<()> {
    if p.offset.is_some() && !p.explicit_zone {
        return None;
    }
    let east = scan.peek() == Some('+');
    scan.pos += 1;
    scan.skip_spaces();
    if !scan.at_digit() {
        return None;
    }
    let n = scan.number();
    let minutes = if n < 24 { n * 60 } else { (n / 100) * 60 + n % 100 };
    p.offset = Some(if east { -minutes } else { minutes });
    p.explicit_zone = true;
    Some(())
}

fn scan_word(scan: &mut Scanner, p: &mut Parsed) -> Option<()> {
    let c = scan.peek()?;
    let next = scan.peek_at(1);
    let after = scan.peek_at(2);

    let era = match (c, next, after) {
        ('B', Some('C'), _) | ('B', Some('.'), Some('C')) => Some(true),
        ('A', Some('D'), _) | ('A', Some('.'), Some('D')) => Some(false),
        _ => None,
    };
    if let Some(bc) = era {
        if p.before_christ.replace(bc).is_some() {
            return None;
        }
        scan.pos += 1;
        scan.skip_char('.');
        scan.pos += 1;
        scan.skip_char('.');
        return Some(());
    }

    if !scan.at_letter(1) {
        // Single-letter military zone
        if p.offset.is_some() || c == 'J' {
            return None;
        }
        p.offset = Some(0);
        p.hour_adjust = match c {
            'A'..='I' => c as i64 - 'A' as i64 + 2,
            'K'..='M' => c as i64 - 'K' as i64 + 11,
            'N'..='Y' => c as i64 - 'N' as i64,
            _ => 1,
        };
        scan.pos += 1;
        scan.skip_char('.');
        return Some(());
    }

    match (c, next) {
        ('A' | 'P', Some('M')) => {
            if p.pm.replace(c == 'P').is_some() {
                return None;
            }
            scan.pos += 2;
            return Some(());
        }
        _ => {}
    }

    let word = scan.word();
    if word.starts_with("UTC") || word.starts_with("GMT") {
        if p.offset.is_some() {
            return None;
        }
        p.offset = Some(0);
        p.explicit_zone = true;
        // Anything glued on after the marker is scanned again
        scan.pos -= word.len() - 3;
        return Some(());
    }

    // A month or day name, possibly abbreviated to any prefix; later months
    // win an ambiguous prefix
    let upper = |name: &&str| name.to_uppercase();
    if let Some(month) = MONTHS.iter().rposition(|name| upper(name).starts_with(&word)) {
        if p.month.replace(month as i64).is_some() {
            return None;
        }
        return Some(());
    }
    if WEEK_DAYS.iter().any(|name| upper(name).starts_with(&word)) {
        return Some(());
    }
    None
}
