//! Standard host functions.
//!
//! A small prelude of named functions emitted actions and guard predicates
//! commonly call. Embedders register their own with [`Env::register`].

use crate::eval::Env;
use std::fmt::Write;
use trellis_core::{TrellisError, TrellisResult, Value};

/// Register the prelude into an environment.
pub fn install(env: &mut Env) {
    env.register("mod", modulo);
    env.register("inc", inc);
    env.register("dec", dec);
    env.register("str", stringify);
    env.register("even?", is_even);
    env.register("odd?", is_odd);
    env.register("pos?", is_pos);
    env.register("neg?", is_neg);
    env.register("zero?", is_zero);
    env.register("not", not);
    env.register("vector", vector);
    env.register("list", list);
}

fn int_arg(name: &str, args: &[Value], n: usize) -> TrellisResult<i64> {
    match args.get(n) {
        Some(Value::Int(i)) => Ok(*i),
        Some(other) => Err(TrellisError::TypeError {
            message: format!("{name} expects an integer, got {other}"),
        }),
        None => Err(TrellisError::ArityError {
            name: name.to_string(),
            expected: n + 1,
            found: args.len(),
        }),
    }
}

/// Floored modulus, matching the host convention.
fn modulo(args: &[Value]) -> TrellisResult<Value> {
    let a = int_arg("mod", args, 0)?;
    let b = int_arg("mod", args, 1)?;
    if b == 0 {
        return Err(TrellisError::TypeError {
            message: "mod by zero".to_string(),
        });
    }
    Ok(Value::Int(a.rem_euclid(b)))
}

fn inc(args: &[Value]) -> TrellisResult<Value> {
    Ok(Value::Int(int_arg("inc", args, 0)? + 1))
}

fn dec(args: &[Value]) -> TrellisResult<Value> {
    Ok(Value::Int(int_arg("dec", args, 0)? - 1))
}

/// Concatenate printed arguments; strings render without quotes.
fn stringify(args: &[Value]) -> TrellisResult<Value> {
    let mut out = String::new();
    for arg in args {
        match arg {
            Value::Str(s) => out.push_str(s),
            Value::Nil => {}
            other => {
                let _ = write!(out, "{other}");
            }
        }
    }
    Ok(Value::str(&out))
}

fn is_even(args: &[Value]) -> TrellisResult<Value> {
    Ok(Value::Bool(int_arg("even?", args, 0)? % 2 == 0))
}

fn is_odd(args: &[Value]) -> TrellisResult<Value> {
    Ok(Value::Bool(int_arg("odd?", args, 0)? % 2 != 0))
}

fn is_pos(args: &[Value]) -> TrellisResult<Value> {
    Ok(Value::Bool(int_arg("pos?", args, 0)? > 0))
}

fn is_neg(args: &[Value]) -> TrellisResult<Value> {
    Ok(Value::Bool(int_arg("neg?", args, 0)? < 0))
}

fn is_zero(args: &[Value]) -> TrellisResult<Value> {
    Ok(Value::Bool(int_arg("zero?", args, 0)? == 0))
}

fn not(args: &[Value]) -> TrellisResult<Value> {
    match args {
        [v] => Ok(Value::Bool(!v.is_truthy())),
        _ => Err(TrellisError::ArityError {
            name: "not".to_string(),
            expected: 1,
            found: args.len(),
        }),
    }
}

fn vector(args: &[Value]) -> TrellisResult<Value> {
    Ok(Value::Vector(args.to_vec()))
}

fn list(args: &[Value]) -> TrellisResult<Value> {
    Ok(Value::List(args.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulo_is_floored() {
        assert_eq!(
            modulo(&[Value::Int(-7), Value::Int(3)]).unwrap(),
            Value::Int(2)
        );
        assert!(modulo(&[Value::Int(1), Value::Int(0)]).is_err());
    }

    #[test]
    fn test_stringify_renders_strings_bare() {
        let out = stringify(&[Value::str("n="), Value::Int(4)]).unwrap();
        assert_eq!(out, Value::str("n=4"));
    }

    #[test]
    fn test_predicates_reject_non_integers() {
        assert!(is_even(&[Value::str("4")]).is_err());
        assert_eq!(is_even(&[Value::Int(4)]).unwrap(), Value::Bool(true));
    }
}
