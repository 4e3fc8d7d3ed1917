//! Math built-in methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::{ClassId, ObjectData, PropFlags};
use crate::value::{JsObjectRef, JsValue};

use super::arg;

/// Create the Math object with its constants and methods
pub fn create_math_object(interp: &mut Interpreter) -> JsObjectRef {
    let math = interp.alloc(ObjectData::plain(ClassId::Math), Some(interp.object_prototype.clone()));

    for (name, value) in [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ] {
        let key = interp.intern(name);
        math.borrow_mut().set_own(key, JsValue::Number(value), PropFlags::NONE);
    }

    // Rounding
    interp.register_method(&math, "abs", math_abs, 1);
    interp.register_method(&math, "floor", math_floor, 1);
    interp.register_method(&math, "ceil", math_ceil, 1);
    interp.register_method(&math, "round", math_round, 1);

    interp.register_method(&math, "min", math_min, 2);
    interp.register_method(&math, "max", math_max, 2);

    // Powers, logarithms, trigonometry
    interp.register_method(&math, "pow", math_pow, 2);
    interp.register_method(&math, "sqrt", math_sqrt, 1);
    interp.register_method(&math, "exp", math_exp, 1);
    interp.register_method(&math, "log", math_log, 1);
    interp.register_method(&math, "sin", math_sin, 1);
    interp.register_method(&math, "cos", math_cos, 1);
    interp.register_method(&math, "tan", math_tan, 1);
    interp.register_method(&math, "asin", math_asin, 1);
    interp.register_method(&math, "acos", math_acos, 1);
    interp.register_method(&math, "atan", math_atan, 1);
    interp.register_method(&math, "atan2", math_atan2, 2);

    math
}

fn unary(interp: &mut Interpreter, args: &[JsValue], f: fn(f64) -> f64) -> Result<JsValue, JsError> {
    let x = interp.to_number(&arg(args, 0))?;
    Ok(JsValue::number(f(x)))
}

pub fn math_abs(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::abs)
}

pub fn math_floor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::floor)
}

pub fn math_ceil(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::ceil)
}

/// Math.round: halves round toward +Infinity
pub fn math_round(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, |x| {
        if !x.is_finite() || x == 0.0 {
            return x;
        }
        if (-0.5..0.0).contains(&x) {
            return -0.0;
        }
        (x + 0.5).floor()
    })
}

/// Math.min(...values); NaN if any value is NaN
pub fn math_min(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut result = f64::INFINITY;
    for value in args {
        let n = interp.to_number(value)?;
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        if n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative()) {
            result = n;
        }
    }
    Ok(JsValue::number(result))
}

/// Math.max(...values); NaN if any value is NaN
pub fn math_max(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut result = f64::NEG_INFINITY;
    for value in args {
        let n = interp.to_number(value)?;
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        if n > result || (n == 0.0 && result == 0.0 && result.is_sign_negative()) {
            result = n;
        }
    }
    Ok(JsValue::number(result))
}

pub fn math_pow(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let base = interp.to_number(&arg(args, 0))?;
    let exponent = interp.to_number(&arg(args, 1))?;
    // 1 ** NaN and (+-1) ** (+-Infinity) are NaN in script
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::number(base.powf(exponent)))
}

pub fn math_sqrt(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::sqrt)
}

pub fn math_exp(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::exp)
}

pub fn math_log(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::ln)
}

pub fn math_sin(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::sin)
}

pub fn math_cos(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::cos)
}

pub fn math_tan(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::tan)
}

pub fn math_asin(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::asin)
}

pub fn math_acos(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::acos)
}

pub fn math_atan(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    unary(interp, args, f64::atan)
}

pub fn math_atan2(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let y = interp.to_number(&arg(args, 0))?;
    let x = interp.to_number(&arg(args, 1))?;
    Ok(JsValue::number(y.atan2(x)))
}
