use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;

use tracing::debug;

use crate::env::Environment;
use crate::error::RuntimeError;
use crate::value::{Function, Value};

/// Builds the root environment of built-in bindings. Every function checks
/// its own arity and argument types; call-site positions are attached by the
/// Application node that invoked it.
pub fn prelude() -> Rc<RefCell<Environment>> {
    let mut env = Environment::new();

    register(&mut env, "print", |args| {
        arity(&args, 1)?;
        println!("{}", args[0].show());
        Ok(Value::Void)
    });
    register(&mut env, "id", |args| {
        arity(&args, 1)?;
        Ok(args[0].clone())
    });
    register(&mut env, "toString", |args| {
        arity(&args, 1)?;
        Ok(Value::String(args[0].to_string()))
    });
    register(&mut env, "parseInt", |args| match args.len() {
        1 => Ok(Value::Number(parse_int_text(string(&args[0])?, None))),
        2 => Ok(Value::Number(parse_int_text(
            string(&args[0])?,
            Some(number(&args[1])?),
        ))),
        n => Err(RuntimeError::wrong_arity(None, n)),
    });
    register(&mut env, "parseFloat", |args| {
        arity(&args, 1)?;
        Ok(Value::Number(parse_float_text(string(&args[0])?)))
    });

    register(&mut env, "isFinite", |args| {
        arity(&args, 1)?;
        Ok(Value::Boolean(number(&args[0])?.is_finite()))
    });
    register(&mut env, "isNaN", |args| {
        arity(&args, 1)?;
        Ok(Value::Boolean(number(&args[0])?.is_nan()))
    });
    register(&mut env, "isInteger", |args| {
        arity(&args, 1)?;
        let n = number(&args[0])?;
        Ok(Value::Boolean(n.is_finite() && n.fract() == 0.0))
    });

    env.define("pi", Value::Number(PI));
    register(&mut env, "abs", math1(f64::abs));
    register(&mut env, "ceil", math1(f64::ceil));
    register(&mut env, "floor", math1(f64::floor));
    // rounds half toward positive infinity
    register(&mut env, "round", math1(|n| (n + 0.5).floor()));
    register(&mut env, "max", math2(|a, b| {
        if a.is_nan() || b.is_nan() {
            f64::NAN
        } else {
            a.max(b)
        }
    }));
    register(&mut env, "min", math2(|a, b| {
        if a.is_nan() || b.is_nan() {
            f64::NAN
        } else {
            a.min(b)
        }
    }));
    register(&mut env, "sin", math1(f64::sin));
    register(&mut env, "cos", math1(f64::cos));
    register(&mut env, "tan", math1(f64::tan));
    register(&mut env, "asin", math1(f64::asin));
    register(&mut env, "acos", math1(f64::acos));
    register(&mut env, "atan", math1(f64::atan));
    register(&mut env, "atan2", math2(f64::atan2));
    register(&mut env, "sqrt", math1(f64::sqrt));
    register(&mut env, "exp", math1(f64::exp));
    register(&mut env, "log", math1(f64::ln));

    register(&mut env, "not", |args| {
        arity(&args, 1)?;
        Ok(Value::Boolean(!boolean(&args[0])?))
    });

    register(&mut env, "length", |args| {
        arity(&args, 1)?;
        match &args[0] {
            Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
            Value::Array(items) => Ok(Value::Number(items.borrow().len() as f64)),
            other => Err(RuntimeError::not_implemented(other.type_name())),
        }
    });
    register(&mut env, "slice", |args| {
        let (start, stop) = match args.len() {
            2 => (number(&args[1])?, None),
            3 => (number(&args[1])?, Some(number(&args[2])?)),
            n => return Err(RuntimeError::wrong_arity(None, n)),
        };
        match &args[0] {
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (from, to) = slice_range(chars.len(), start, stop);
                Ok(Value::String(chars[from..to].iter().collect()))
            }
            Value::Array(items) => {
                let items = items.borrow();
                let (from, to) = slice_range(items.len(), start, stop);
                Ok(Value::array(items[from..to].to_vec()))
            }
            other => Err(RuntimeError::not_implemented(other.type_name())),
        }
    });
    register(&mut env, "reverse", |args| {
        arity(&args, 1)?;
        match &args[0] {
            Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
            Value::Array(items) => {
                let mut items = items.borrow().clone();
                items.reverse();
                Ok(Value::array(items))
            }
            other => Err(RuntimeError::not_implemented(other.type_name())),
        }
    });

    register(&mut env, "fromCharCode", |args| {
        arity(&args, 1)?;
        let code = number(&args[0])?.floor();
        let c = if (0.0..=u32::MAX as f64).contains(&code) {
            char::from_u32(code as u32).unwrap_or('\u{fffd}')
        } else {
            '\u{fffd}'
        };
        Ok(Value::String(c.to_string()))
    });
    register(&mut env, "charAt", |args| {
        arity(&args, 2)?;
        let s = string(&args[0])?;
        let index = number(&args[1])?.floor();
        let out = if index >= 0.0 {
            s.chars()
                .nth(index as usize)
                .map(|c| c.to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };
        Ok(Value::String(out))
    });
    register(&mut env, "charCodeAt", |args| {
        arity(&args, 2)?;
        let s = string(&args[0])?;
        let index = number(&args[1])?.floor();
        let code = if index >= 0.0 {
            s.chars()
                .nth(index as usize)
                .map(|c| c as u32 as f64)
                .unwrap_or(f64::NAN)
        } else {
            f64::NAN
        };
        Ok(Value::Number(code))
    });
    register(&mut env, "indexOf", |args| {
        let from = match args.len() {
            2 => 0.0,
            3 => number(&args[2])?,
            n => return Err(RuntimeError::wrong_arity(None, n)),
        };
        let haystack = string(&args[0])?;
        let needle = string(&args[1])?;
        Ok(Value::Number(char_index_of(haystack, needle, from)))
    });
    register(&mut env, "lastIndexOf", |args| {
        let from = match args.len() {
            2 => None,
            3 => Some(number(&args[2])?),
            n => return Err(RuntimeError::wrong_arity(None, n)),
        };
        let haystack = string(&args[0])?;
        let needle = string(&args[1])?;
        Ok(Value::Number(char_last_index_of(haystack, needle, from)))
    });
    register(&mut env, "toUpper", |args| {
        arity(&args, 1)?;
        Ok(Value::String(string(&args[0])?.to_uppercase()))
    });
    register(&mut env, "toLower", |args| {
        arity(&args, 1)?;
        Ok(Value::String(string(&args[0])?.to_lowercase()))
    });
    register(&mut env, "replace", |args| {
        arity(&args, 3)?;
        let s = string(&args[0])?;
        let pattern = string(&args[1])?;
        let replacement = string(&args[2])?;
        Ok(Value::String(s.replacen(pattern, replacement, 1)))
    });
    register(&mut env, "substr", |args| {
        let length = match args.len() {
            2 => None,
            3 => Some(number(&args[2])?),
            n => return Err(RuntimeError::wrong_arity(None, n)),
        };
        let s = string(&args[0])?;
        let start = number(&args[1])?;
        Ok(Value::String(substr_text(s, start, length)))
    });
    register(&mut env, "split", |args| {
        arity(&args, 2)?;
        let s = string(&args[0])?;
        let separator = string(&args[1])?;
        let parts: Vec<Value> = if separator.is_empty() {
            s.chars().map(|c| Value::String(c.to_string())).collect()
        } else {
            s.split(separator)
                .map(|part| Value::String(part.to_owned()))
                .collect()
        };
        Ok(Value::array(parts))
    });

    register(&mut env, "newArray", |args| {
        arity(&args, 1)?;
        let len = number(&args[0])?.floor().max(0.0) as usize;
        Ok(Value::array(vec![Value::Void; len]))
    });
    register(&mut env, "copyArray", |args| {
        arity(&args, 1)?;
        Ok(Value::array(array(&args[0])?.borrow().clone()))
    });
    register(&mut env, "concat", |args| {
        arity(&args, 2)?;
        let mut items = array(&args[0])?.borrow().clone();
        items.extend(array(&args[1])?.borrow().iter().cloned());
        Ok(Value::array(items))
    });
    register(&mut env, "join", |args| {
        arity(&args, 2)?;
        let items = array(&args[0])?;
        let separator = string(&args[1])?;
        let parts: Vec<String> = items.borrow().iter().map(Value::to_string).collect();
        Ok(Value::String(parts.join(separator)))
    });
    register(&mut env, "writeArray", |args| {
        arity(&args, 3)?;
        let items = array(&args[0])?;
        let index = index_in(items.borrow().len(), number(&args[1])?)?;
        items.borrow_mut()[index] = args[2].clone();
        Ok(Value::Void)
    });

    let read_array = Value::Function(Function::new(|args| {
        arity(&args, 2)?;
        let items = array(&args[0])?;
        let index = index_in(items.borrow().len(), number(&args[1])?)?;
        let value = items.borrow()[index].clone();
        Ok(value)
    }));
    env.define("readArray", read_array.clone());
    // the same function value, so `(!!) == readArray` holds
    env.define("_!!_", read_array);

    register(&mut env, "push", |args| {
        arity(&args, 2)?;
        array(&args[0])?.borrow_mut().push(args[1].clone());
        Ok(Value::Void)
    });
    register(&mut env, "pop", |args| {
        arity(&args, 1)?;
        array(&args[0])?
            .borrow_mut()
            .pop()
            .ok_or_else(RuntimeError::empty_array)
    });
    register(&mut env, "unshift", |args| {
        arity(&args, 2)?;
        array(&args[0])?.borrow_mut().insert(0, args[1].clone());
        Ok(Value::Void)
    });
    register(&mut env, "shift", |args| {
        arity(&args, 1)?;
        let items = array(&args[0])?;
        let mut items = items.borrow_mut();
        if items.is_empty() {
            return Err(RuntimeError::empty_array());
        }
        Ok(items.remove(0))
    });

    register(&mut env, "some", |args| {
        arity(&args, 2)?;
        let f = function(&args[0])?;
        for item in snapshot(&args[1])? {
            if boolean(&f.call(vec![item])?)? {
                return Ok(Value::Boolean(true));
            }
        }
        Ok(Value::Boolean(false))
    });
    register(&mut env, "every", |args| {
        arity(&args, 2)?;
        let f = function(&args[0])?;
        for item in snapshot(&args[1])? {
            if !boolean(&f.call(vec![item])?)? {
                return Ok(Value::Boolean(false));
            }
        }
        Ok(Value::Boolean(true))
    });
    register(&mut env, "map", |args| {
        arity(&args, 2)?;
        let f = function(&args[0])?;
        let items = snapshot(&args[1])?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(f.call(vec![item])?);
        }
        Ok(Value::array(out))
    });
    // takes the array first, then the function
    register(&mut env, "forEach", |args| {
        arity(&args, 2)?;
        let items = snapshot(&args[0])?;
        let f = function(&args[1])?;
        for item in items {
            f.call(vec![item])?;
        }
        Ok(Value::Void)
    });
    register(&mut env, "filter", |args| {
        arity(&args, 2)?;
        let f = function(&args[0])?;
        let items = snapshot(&args[1])?;
        let mut out = Vec::new();
        for item in items {
            if boolean(&f.call(vec![item.clone()])?)? {
                out.push(item);
            }
        }
        Ok(Value::array(out))
    });
    register(&mut env, "foldl", |args| match args.len() {
        2 => {
            let f = function(&args[0])?;
            let mut items = snapshot(&args[1])?.into_iter();
            let mut acc = items.next().ok_or_else(RuntimeError::empty_array)?;
            for item in items {
                acc = f.call(vec![acc, item])?;
            }
            Ok(acc)
        }
        3 => {
            let f = function(&args[0])?;
            let mut acc = args[1].clone();
            for item in snapshot(&args[2])? {
                acc = f.call(vec![acc, item])?;
            }
            Ok(acc)
        }
        n => Err(RuntimeError::wrong_arity(None, n)),
    });
    // the callback receives (element, accumulator)
    register(&mut env, "foldr", |args| match args.len() {
        2 => {
            let f = function(&args[0])?;
            let mut items = snapshot(&args[1])?.into_iter().rev();
            let mut acc = items.next().ok_or_else(RuntimeError::empty_array)?;
            for item in items {
                acc = f.call(vec![item, acc])?;
            }
            Ok(acc)
        }
        3 => {
            let f = function(&args[0])?;
            let mut acc = args[1].clone();
            for item in snapshot(&args[2])?.into_iter().rev() {
                acc = f.call(vec![item, acc])?;
            }
            Ok(acc)
        }
        n => Err(RuntimeError::wrong_arity(None, n)),
    });
    register(&mut env, "flip", |args| {
        arity(&args, 1)?;
        let f = function(&args[0])?;
        Ok(Value::Function(Function::new(move |mut inner: Vec<Value>| {
            inner.reverse();
            f.call(inner)
        })))
    });
    register(&mut env, "apply", |args| {
        arity(&args, 2)?;
        let f = function(&args[0])?;
        let inner = snapshot(&args[1])?;
        f.call(inner)
    });

    register(&mut env, "_._", |args| {
        arity(&args, 2)?;
        let f = function(&args[0])?;
        let g = function(&args[1])?;
        Ok(Value::Function(Function::new(move |inner: Vec<Value>| {
            let mid = g.call(inner)?;
            f.call(vec![mid])
        })))
    });
    register(&mut env, "_**_", math2(f64::powf));
    register(&mut env, "_*_", math2(|a, b| a * b));
    register(&mut env, "_/_", math2(|a, b| a / b));
    register(&mut env, "_%_", math2(|a, b| a % b));
    register(&mut env, "+_", math1(|n| n));

    let negate = Value::Function(Function::new(math1(|n| -n)));
    env.define("negate", negate.clone());
    env.define("-_", negate);

    register(&mut env, "_+_", math2(|a, b| a + b));
    register(&mut env, "_-_", math2(|a, b| a - b));
    register(&mut env, "_++_", |args| {
        arity(&args, 2)?;
        let left = string(&args[0])?;
        let right = string(&args[1])?;
        Ok(Value::String(format!("{}{}", left, right)))
    });
    register(&mut env, "_==_", |args| equality(&args, false));
    register(&mut env, "_!=_", |args| equality(&args, true));
    register(&mut env, "_<_", |args| {
        compare(&args, |a, b| a < b, |a, b| a < b)
    });
    register(&mut env, "_>_", |args| {
        compare(&args, |a, b| a > b, |a, b| a > b)
    });
    register(&mut env, "_<=_", |args| {
        compare(&args, |a, b| a <= b, |a, b| a <= b)
    });
    register(&mut env, "_>=_", |args| {
        compare(&args, |a, b| a >= b, |a, b| a >= b)
    });
    // both operands are already evaluated by the caller; no short circuit
    register(&mut env, "_&&_", |args| {
        arity(&args, 2)?;
        Ok(Value::Boolean(boolean(&args[0])? && boolean(&args[1])?))
    });
    register(&mut env, "_||_", |args| {
        arity(&args, 2)?;
        Ok(Value::Boolean(boolean(&args[0])? || boolean(&args[1])?))
    });
    register(&mut env, "_$_", |args| {
        arity(&args, 2)?;
        function(&args[0])?.call(vec![args[1].clone()])
    });

    debug!("prelude environment ready");
    Rc::new(RefCell::new(env))
}

fn register(
    env: &mut Environment,
    name: &str,
    f: impl Fn(Vec<Value>) -> Result<Value, RuntimeError> + 'static,
) {
    env.define(name, Value::Function(Function::new(f)));
}

fn arity(args: &[Value], expected: usize) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::wrong_arity(Some(expected), args.len()))
    }
}

fn number(value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(RuntimeError::type_mismatch("number", other.type_name())),
    }
}

fn string(value: &Value) -> Result<&str, RuntimeError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(RuntimeError::type_mismatch("string", other.type_name())),
    }
}

fn boolean(value: &Value) -> Result<bool, RuntimeError> {
    match value {
        Value::Boolean(b) => Ok(*b),
        other => Err(RuntimeError::type_mismatch("boolean", other.type_name())),
    }
}

fn array(value: &Value) -> Result<Rc<RefCell<Vec<Value>>>, RuntimeError> {
    match value {
        Value::Array(items) => Ok(Rc::clone(items)),
        other => Err(RuntimeError::type_mismatch("array", other.type_name())),
    }
}

fn function(value: &Value) -> Result<Function, RuntimeError> {
    match value {
        Value::Function(f) => Ok(f.clone()),
        other => Err(RuntimeError::type_mismatch("function", other.type_name())),
    }
}

// Higher-order functions iterate over a snapshot so a callback that mutates
// the array cannot invalidate the traversal mid-flight.
fn snapshot(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    Ok(array(value)?.borrow().clone())
}

fn math1(
    f: impl Fn(f64) -> f64 + 'static,
) -> impl Fn(Vec<Value>) -> Result<Value, RuntimeError> + 'static {
    move |args| {
        arity(&args, 1)?;
        Ok(Value::Number(f(number(&args[0])?)))
    }
}

fn math2(
    f: impl Fn(f64, f64) -> f64 + 'static,
) -> impl Fn(Vec<Value>) -> Result<Value, RuntimeError> + 'static {
    move |args| {
        arity(&args, 2)?;
        Ok(Value::Number(f(number(&args[0])?, number(&args[1])?)))
    }
}

fn equality(args: &[Value], negated: bool) -> Result<Value, RuntimeError> {
    arity(args, 2)?;
    if args[0].type_name() != args[1].type_name() {
        return Err(RuntimeError::type_mismatch(
            args[0].type_name(),
            args[1].type_name(),
        ));
    }
    let equal = args[0] == args[1];
    Ok(Value::Boolean(if negated { !equal } else { equal }))
}

fn compare(
    args: &[Value],
    num: fn(f64, f64) -> bool,
    text: fn(&str, &str) -> bool,
) -> Result<Value, RuntimeError> {
    arity(args, 2)?;
    match &args[0] {
        Value::Number(a) => Ok(Value::Boolean(num(*a, number(&args[1])?))),
        Value::String(a) => Ok(Value::Boolean(text(a, string(&args[1])?))),
        other => Err(RuntimeError::not_implemented(other.type_name())),
    }
}

fn index_in(len: usize, value: f64) -> Result<usize, RuntimeError> {
    let index = value.floor();
    if index >= 0.0 && index < len as f64 {
        Ok(index as usize)
    } else {
        Err(RuntimeError::out_of_range(index))
    }
}

fn slice_bound(len: usize, value: f64) -> usize {
    let index = value.floor();
    if index.is_nan() {
        0
    } else if index < 0.0 {
        (len as f64 + index).max(0.0) as usize
    } else {
        index.min(len as f64) as usize
    }
}

fn slice_range(len: usize, start: f64, stop: Option<f64>) -> (usize, usize) {
    let from = slice_bound(len, start);
    let to = match stop {
        Some(stop) => slice_bound(len, stop),
        None => len,
    };
    (from, to.max(from))
}

fn char_index_of(haystack: &str, needle: &str, from: f64) -> f64 {
    let chars: Vec<char> = haystack.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    let start = if from.is_nan() || from < 0.0 {
        0
    } else {
        (from.floor() as usize).min(chars.len())
    };
    if needle.is_empty() {
        return start as f64;
    }
    if needle.len() > chars.len() {
        return -1.0;
    }
    for i in start..=chars.len() - needle.len() {
        if chars[i..i + needle.len()] == needle[..] {
            return i as f64;
        }
    }
    -1.0
}

fn char_last_index_of(haystack: &str, needle: &str, from: Option<f64>) -> f64 {
    let chars: Vec<char> = haystack.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    let limit = match from {
        Some(from) if from.is_nan() => chars.len(),
        Some(from) => from.floor().max(0.0).min(chars.len() as f64) as usize,
        None => chars.len(),
    };
    if needle.is_empty() {
        return limit as f64;
    }
    if needle.len() > chars.len() {
        return -1.0;
    }
    let mut i = limit.min(chars.len() - needle.len());
    loop {
        if chars[i..i + needle.len()] == needle[..] {
            return i as f64;
        }
        if i == 0 {
            return -1.0;
        }
        i -= 1;
    }
}

fn substr_text(s: &str, start: f64, length: Option<f64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as f64;
    let start = start.floor();
    let begin = if start.is_nan() {
        0
    } else if start < 0.0 {
        (len + start).max(0.0) as usize
    } else {
        start.min(len) as usize
    };
    let count = match length {
        None => chars.len() - begin,
        Some(length) => {
            let length = length.floor();
            if length.is_nan() || length < 0.0 {
                0
            } else {
                (length as usize).min(chars.len() - begin)
            }
        }
    };
    chars[begin..begin + count].iter().collect()
}

fn parse_int_text(text: &str, radix: Option<f64>) -> f64 {
    let s = text.trim_start();
    let (sign, s) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };

    let mut radix = match radix {
        None => 0,
        Some(r) if !r.is_finite() => 0,
        Some(r) if r < 0.0 => return f64::NAN,
        Some(r) => r.floor() as u32,
    };
    let mut s = s;
    if radix == 16 || radix == 0 {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let mut acc = 0.0;
    let mut any = false;
    for c in s.chars() {
        match c.to_digit(radix) {
            Some(digit) => {
                acc = acc * radix as f64 + digit as f64;
                any = true;
            }
            None => break,
        }
    }
    if any {
        sign * acc
    } else {
        f64::NAN
    }
}

fn parse_float_text(text: &str) -> f64 {
    let s = text.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    if rest.starts_with("Infinity") {
        return sign * f64::INFINITY;
    }

    let bytes = rest.as_bytes();
    let mut end = 0;
    let mut has_digits = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        has_digits = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction = end + 1;
        let mut stop = fraction;
        while stop < bytes.len() && bytes[stop].is_ascii_digit() {
            stop += 1;
        }
        if stop > fraction {
            has_digits = true;
        }
        if has_digits {
            end = stop;
        }
    }
    if has_digits && end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut stop = end + 1;
        if stop < bytes.len() && (bytes[stop] == b'+' || bytes[stop] == b'-') {
            stop += 1;
        }
        let exponent = stop;
        while stop < bytes.len() && bytes[stop].is_ascii_digit() {
            stop += 1;
        }
        if stop > exponent {
            end = stop;
        }
    }
    if !has_digits {
        return f64::NAN;
    }
    sign * rest[..end].parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let env = prelude();
        let value = env.borrow().get(name).expect("missing prelude binding");
        match value {
            Value::Function(f) => f.call(args),
            other => panic!("{} is not a function: {:?}", name, other),
        }
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn text(s: &str) -> Value {
        Value::String(s.to_owned())
    }

    #[test]
    fn arity_errors() {
        let err = call("abs", vec![]).unwrap_err();
        assert_eq!(err.message, "wrong number of arguments: expected 1, actual 0");
        assert_eq!(err.pos, None);

        let err = call("slice", vec![text("abc")]).unwrap_err();
        assert_eq!(err.message, "wrong number of arguments");
    }

    #[test]
    fn type_errors() {
        let err = call("abs", vec![text("x")]).unwrap_err();
        assert_eq!(err.message, "type mismatch: expect 'number', actual 'string'");

        let err = call("length", vec![num(1.0)]).unwrap_err();
        assert_eq!(err.message, "function not implemented for 'number'");
    }

    #[test]
    fn index_operator_is_read_array() {
        let env = prelude();
        let via_operator = env.borrow().get("_!!_").unwrap();
        let via_name = env.borrow().get("readArray").unwrap();
        assert_eq!(via_operator, via_name);
    }

    #[test]
    fn negate_is_the_unary_minus() {
        let env = prelude();
        assert_eq!(
            env.borrow().get("-_").unwrap(),
            env.borrow().get("negate").unwrap()
        );
    }

    #[test]
    fn array_reads_and_writes_are_bounds_checked() {
        let arr = Value::array(vec![num(1.0), num(2.0)]);
        assert_eq!(call("readArray", vec![arr.clone(), num(1.2)]), Ok(num(2.0)));

        let err = call("readArray", vec![arr.clone(), num(2.0)]).unwrap_err();
        assert_eq!(err.message, "index out of range: 2");
        let err = call("readArray", vec![arr.clone(), num(-1.0)]).unwrap_err();
        assert_eq!(err.message, "index out of range: -1");

        call("writeArray", vec![arr.clone(), num(0.0), text("x")]).unwrap();
        assert_eq!(call("readArray", vec![arr, num(0.0)]), Ok(text("x")));
    }

    #[test]
    fn pop_and_shift_error_on_empty() {
        let err = call("pop", vec![Value::array(vec![])]).unwrap_err();
        assert_eq!(err.message, "empty array");
        let err = call("shift", vec![Value::array(vec![])]).unwrap_err();
        assert_eq!(err.message, "empty array");
    }

    #[test]
    fn slice_handles_negative_indices() {
        assert_eq!(call("slice", vec![text("hello"), num(-3.0)]), Ok(text("llo")));
        assert_eq!(
            call("slice", vec![text("hello"), num(1.0), num(3.0)]),
            Ok(text("el"))
        );

        let arr = Value::array(vec![num(1.0), num(2.0), num(3.0)]);
        match call("slice", vec![arr.clone(), num(1.0)]).unwrap() {
            Value::Array(items) => assert_eq!(items.borrow().len(), 2),
            other => panic!("expected array, got {:?}", other),
        }
        // slicing never aliases the source
        let copy = call("slice", vec![arr.clone(), num(0.0)]).unwrap();
        assert_ne!(copy, arr);
    }

    #[test]
    fn string_functions() {
        assert_eq!(call("toUpper", vec![text("abc")]), Ok(text("ABC")));
        assert_eq!(call("toLower", vec![text("AbC")]), Ok(text("abc")));
        assert_eq!(
            call("replace", vec![text("a-a"), text("a"), text("b")]),
            Ok(text("b-a"))
        );
        assert_eq!(call("charAt", vec![text("abc"), num(1.0)]), Ok(text("b")));
        assert_eq!(call("charAt", vec![text("abc"), num(9.0)]), Ok(text("")));
        assert_eq!(
            call("charCodeAt", vec![text("abc"), num(0.0)]),
            Ok(num(97.0))
        );
        assert_eq!(call("fromCharCode", vec![num(97.0)]), Ok(text("a")));
        assert_eq!(
            call("indexOf", vec![text("abcabc"), text("bc")]),
            Ok(num(1.0))
        );
        assert_eq!(
            call("indexOf", vec![text("abcabc"), text("bc"), num(2.0)]),
            Ok(num(4.0))
        );
        assert_eq!(
            call("lastIndexOf", vec![text("abcabc"), text("bc")]),
            Ok(num(4.0))
        );
        assert_eq!(call("indexOf", vec![text("abc"), text("x")]), Ok(num(-1.0)));
        assert_eq!(
            call("substr", vec![text("hello"), num(1.0), num(3.0)]),
            Ok(text("ell"))
        );
        assert_eq!(call("substr", vec![text("hello"), num(-2.0)]), Ok(text("lo")));
    }

    #[test]
    fn split_by_empty_separator_yields_characters() {
        match call("split", vec![text("abc"), text("")]).unwrap() {
            Value::Array(items) => {
                let items = items.borrow();
                assert_eq!(items.len(), 3);
                assert_eq!(items[0], text("a"));
            }
            other => panic!("expected array, got {:?}", other),
        }
        match call("split", vec![text("a,b"), text(",")]).unwrap() {
            Value::Array(items) => assert_eq!(items.borrow().len(), 2),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn join_uses_display_forms() {
        let arr = Value::array(vec![num(1.0), text("a"), Value::Boolean(true)]);
        assert_eq!(call("join", vec![arr, text("-")]), Ok(text("1-a-True")));
    }

    #[test]
    fn parse_int_and_float() {
        assert_eq!(call("parseInt", vec![text("42")]), Ok(num(42.0)));
        assert_eq!(call("parseInt", vec![text("  -7px")]), Ok(num(-7.0)));
        assert_eq!(call("parseInt", vec![text("ff"), num(16.0)]), Ok(num(255.0)));
        assert_eq!(call("parseInt", vec![text("0x10")]), Ok(num(16.0)));
        match call("parseInt", vec![text("zz")]).unwrap() {
            Value::Number(n) => assert!(n.is_nan()),
            other => panic!("expected number, got {:?}", other),
        }

        assert_eq!(call("parseFloat", vec![text("2.5e2xyz")]), Ok(num(250.0)));
        assert_eq!(call("parseFloat", vec![text(".5")]), Ok(num(0.5)));
        assert_eq!(call("parseFloat", vec![text("-Infinity")]), Ok(num(f64::NEG_INFINITY)));
        match call("parseFloat", vec![text("abc")]).unwrap() {
            Value::Number(n) => assert!(n.is_nan()),
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(call("round", vec![num(2.5)]), Ok(num(3.0)));
        assert_eq!(call("round", vec![num(-2.5)]), Ok(num(-2.0)));
        assert_eq!(call("round", vec![num(2.4)]), Ok(num(2.0)));
    }

    #[test]
    fn equality_requires_matching_types() {
        assert_eq!(call("_==_", vec![num(1.0), num(1.0)]), Ok(Value::Boolean(true)));
        assert_eq!(
            call("_!=_", vec![text("a"), text("b")]),
            Ok(Value::Boolean(true))
        );
        let err = call("_==_", vec![num(1.0), text("1")]).unwrap_err();
        assert_eq!(err.message, "type mismatch: expect 'number', actual 'string'");
        // NaN is not equal to itself
        assert_eq!(
            call("_==_", vec![num(f64::NAN), num(f64::NAN)]),
            Ok(Value::Boolean(false))
        );
    }

    #[test]
    fn comparisons_work_on_numbers_and_strings() {
        assert_eq!(call("_<_", vec![num(1.0), num(2.0)]), Ok(Value::Boolean(true)));
        assert_eq!(
            call("_<_", vec![text("abc"), text("abd")]),
            Ok(Value::Boolean(true))
        );
        let err = call("_<_", vec![Value::Boolean(true), Value::Boolean(false)]).unwrap_err();
        assert_eq!(err.message, "function not implemented for 'boolean'");
    }

    #[test]
    fn concat_operator_is_strings_only() {
        assert_eq!(
            call("_++_", vec![text("ab"), text("cd")]),
            Ok(text("abcd"))
        );
        let err = call("_++_", vec![num(1.0), num(2.0)]).unwrap_err();
        assert_eq!(err.message, "type mismatch: expect 'string', actual 'number'");
    }

    #[test]
    fn higher_order_functions() {
        let double = Value::Function(Function::new(|args| {
            Ok(num(number(&args[0]).unwrap() * 2.0))
        }));
        let arr = Value::array(vec![num(1.0), num(2.0), num(3.0)]);
        match call("map", vec![double, arr.clone()]).unwrap() {
            Value::Array(items) => {
                assert_eq!(items.borrow().as_slice(), &[num(2.0), num(4.0), num(6.0)])
            }
            other => panic!("expected array, got {:?}", other),
        }

        let add = Value::Function(Function::new(|args| {
            Ok(num(number(&args[0]).unwrap() + number(&args[1]).unwrap()))
        }));
        assert_eq!(call("foldl", vec![add.clone(), arr.clone()]), Ok(num(6.0)));
        assert_eq!(
            call("foldl", vec![add.clone(), num(10.0), arr.clone()]),
            Ok(num(16.0))
        );
        let err = call("foldl", vec![add.clone(), Value::array(vec![])]).unwrap_err();
        assert_eq!(err.message, "empty array");

        // foldr folds from the right: (1 - (2 - 3))
        let sub = Value::Function(Function::new(|args| {
            Ok(num(number(&args[0]).unwrap() - number(&args[1]).unwrap()))
        }));
        assert_eq!(call("foldr", vec![sub, arr.clone()]), Ok(num(2.0)));

        let positive = Value::Function(Function::new(|args| {
            Ok(Value::Boolean(number(&args[0]).unwrap() > 0.0))
        }));
        assert_eq!(call("every", vec![positive.clone(), arr.clone()]), Ok(Value::Boolean(true)));
        assert_eq!(
            call("some", vec![positive.clone(), Value::array(vec![num(-1.0)])]),
            Ok(Value::Boolean(false))
        );
        match call("filter", vec![positive, Value::array(vec![num(-1.0), num(2.0)])]).unwrap() {
            Value::Array(items) => assert_eq!(items.borrow().as_slice(), &[num(2.0)]),
            other => panic!("expected array, got {:?}", other),
        }

        // a predicate that returns a non-boolean is a type error
        let identity = Value::Function(Function::new(|args| Ok(args[0].clone())));
        let err = call("some", vec![identity, arr]).unwrap_err();
        assert_eq!(err.message, "type mismatch: expect 'boolean', actual 'number'");
    }

    #[test]
    fn flip_and_compose_and_apply() {
        let sub = Value::Function(Function::new(|args| {
            Ok(num(number(&args[0]).unwrap() - number(&args[1]).unwrap()))
        }));
        let flipped = call("flip", vec![sub]).unwrap();
        match &flipped {
            Value::Function(f) => assert_eq!(f.call(vec![num(1.0), num(10.0)]), Ok(num(9.0))),
            other => panic!("expected function, got {:?}", other),
        }

        let double = Value::Function(Function::new(|args| {
            Ok(num(number(&args[0]).unwrap() * 2.0))
        }));
        let inc = Value::Function(Function::new(|args| {
            Ok(num(number(&args[0]).unwrap() + 1.0))
        }));
        // (double . inc) 5 = double (inc 5)
        let composed = call("_._", vec![double.clone(), inc]).unwrap();
        match &composed {
            Value::Function(f) => assert_eq!(f.call(vec![num(5.0)]), Ok(num(12.0))),
            other => panic!("expected function, got {:?}", other),
        }

        assert_eq!(
            call("apply", vec![double.clone(), Value::array(vec![num(4.0)])]),
            Ok(num(8.0))
        );
        assert_eq!(call("_$_", vec![double, num(4.0)]), Ok(num(8.0)));
    }

    #[test]
    fn new_array_is_void_filled() {
        match call("newArray", vec![num(2.7)]).unwrap() {
            Value::Array(items) => {
                assert_eq!(items.borrow().as_slice(), &[Value::Void, Value::Void])
            }
            other => panic!("expected array, got {:?}", other),
        }
    }
}
