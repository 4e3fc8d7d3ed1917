//! Number built-in methods

use crate::error::{ErrorCode, JsError};
use crate::interpreter::Interpreter;
use crate::object::{NumberData, ObjectData, PropFlags};
use crate::value::{JsValue, number_to_string};

use super::arg;

/// Initialize Number.prototype and publish the Number constructor
pub fn init_number(interp: &mut Interpreter) {
    let proto = interp.number_prototype.clone();

    interp.register_method(&proto, "toString", number_to_string_fn, 1);
    interp.register_method(&proto, "toLocaleString", number_to_string_fn, 0);
    interp.register_method(&proto, "toFixed", number_to_fixed, 1);
    interp.register_method(&proto, "valueOf", number_value_of, 0);

    let constructor = interp.create_constructor("Number", number_call, number_construct, 1, &proto);
    for (name, value) in [
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("NaN", f64::NAN),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("POSITIVE_INFINITY", f64::INFINITY),
    ] {
        let key = interp.intern(name);
        constructor.borrow_mut().set_own(key, JsValue::Number(value), PropFlags::NONE);
    }
    interp.define_global("Number", JsValue::Object(constructor));
}

/// Number(value): conversion
pub fn number_call(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    match args.first() {
        Some(value) => Ok(JsValue::number(interp.to_number(value)?)),
        None => Ok(JsValue::Int(0)),
    }
}

/// new Number(value): wrapper object
pub fn number_construct(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = match args.first() {
        Some(value) => interp.to_number(value)?,
        None => 0.0,
    };
    let obj = interp.alloc(
        ObjectData::Number(NumberData(value)),
        Some(interp.number_prototype.clone()),
    );
    Ok(JsValue::Object(obj))
}

fn this_number(this: &JsValue) -> Result<f64, JsError> {
    match this {
        JsValue::Int(i) => Ok(f64::from(*i)),
        JsValue::Number(n) => Ok(*n),
        JsValue::Object(obj) => match &obj.borrow().data {
            ObjectData::Number(NumberData(n)) => Ok(*n),
            _ => Err(number_expected()),
        },
        _ => Err(number_expected()),
    }
}

fn number_expected() -> JsError {
    JsError::type_error(ErrorCode::NUMBER_EXPECTED, "Number expected")
}

/// Number.prototype.toString(radix)
pub fn number_to_string_fn(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = this_number(&this)?;
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10,
        value => interp.to_int32(&value)?,
    };
    if !(2..=36).contains(&radix) {
        return Err(JsError::range_error(
            ErrorCode::INVALID_LENGTH,
            "Invalid function argument: radix must be between 2 and 36",
        ));
    }
    if radix == 10 {
        return Ok(JsValue::from(number_to_string(n)));
    }
    Ok(JsValue::from(to_radix_string(n, radix as u32)))
}

/// Digits of `n` in `radix`, fraction truncated after 20 digits
pub(crate) fn to_radix_string(n: f64, radix: u32) -> String {
    if !n.is_finite() {
        return number_to_string(n);
    }
    let base = f64::from(radix);
    let negative = n < 0.0;
    let n = n.abs();
    let mut int_part = n.trunc();
    let mut frac = n - int_part;

    let mut digits = Vec::new();
    loop {
        let d = (int_part % base) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        int_part = (int_part / base).trunc();
        if int_part < 1.0 {
            break;
        }
    }
    let mut out = String::with_capacity(digits.len() + 22);
    if negative {
        out.push('-');
    }
    out.extend(digits.iter().rev());

    if frac > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac *= base;
            let d = frac.trunc();
            out.push(std::char::from_digit(d as u32, radix).unwrap_or('0'));
            frac -= d;
            if frac <= 0.0 {
                break;
            }
        }
    }
    out
}

/// Number.prototype.toFixed(digits)
pub fn number_to_fixed(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = this_number(&this)?;
    let digits = match arg(args, 0) {
        JsValue::Undefined => 0,
        value => interp.to_int32(&value)?,
    };
    if !(0..=20).contains(&digits) {
        return Err(JsError::range_error(
            ErrorCode::INVALID_LENGTH,
            "The number of fractional digits is out of range",
        ));
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(JsValue::from(number_to_string(n)));
    }
    Ok(JsValue::from(format!("{:.*}", digits as usize, n)))
}

pub fn number_value_of(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::number(this_number(&this)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_radix_string() {
        assert_eq!(to_radix_string(255.0, 16), "ff");
        assert_eq!(to_radix_string(-5.0, 2), "-101");
        assert_eq!(to_radix_string(0.5, 2), "0.1");
        assert_eq!(to_radix_string(0.0, 8), "0");
        assert_eq!(to_radix_string(35.0, 36), "z");
    }
}
