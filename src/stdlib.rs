use crate::environment::Environment;
use crate::runtime::{Callable, Value};
use log::debug;
use rand::Rng;
use std::f64::consts;
use std::rc::Rc;

fn number_arg(args: &[Value], index: usize) -> Result<f64, String> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(format!(
            "argument {} must be a number, found '{}'",
            index + 1,
            other.kind_name()
        )),
        None => Err(format!("missing argument {}", index + 1)),
    }
}

fn define(env: &Environment, name: &str, value: Value) {
    if let Err(err) = env.declare(name, value) {
        debug!("skipping standard definition: {}", err);
    }
}

/// Builds a root scope holding the built-in numeric functions and constants.
pub fn create_standard_env() -> Environment {
    let env = Environment::new();

    macro_rules! define_builtin {
        ($name:expr, $arity:expr, $func:expr) => {
            define(
                &env,
                $name,
                Value::Callable(Callable::BuiltIn {
                    name: $name.to_string(),
                    arity: $arity,
                    func: Rc::new($func),
                }),
            );
        };
    }

    // One-argument functions lifted straight from f64
    macro_rules! define_unary {
        ($name:expr, $func:expr) => {
            define_builtin!($name, 1, |args: &[Value]| -> Result<Value, String> {
                let f: fn(f64) -> f64 = $func;
                Ok(Value::Number(f(number_arg(args, 0)?)))
            });
        };
    }

    // Constants
    define(&env, "pi", Value::Number(consts::PI));
    define(&env, "e", Value::Number(consts::E));
    define(&env, "tau", Value::Number(consts::TAU));
    define(&env, "inf", Value::Number(f64::INFINITY));
    define(&env, "nan", Value::Number(f64::NAN));

    // Trigonometry
    define_unary!("sin", f64::sin);
    define_unary!("cos", f64::cos);
    define_unary!("tan", f64::tan);
    define_unary!("asin", f64::asin);
    define_unary!("acos", f64::acos);
    define_unary!("atan", f64::atan);
    define_unary!("sinh", f64::sinh);
    define_unary!("cosh", f64::cosh);
    define_unary!("tanh", f64::tanh);

    define_builtin!("atan2", 2, |args: &[Value]| -> Result<Value, String> {
        let y = number_arg(args, 0)?;
        let x = number_arg(args, 1)?;
        Ok(Value::Number(y.atan2(x)))
    });

    // Logarithms and powers
    define_unary!("ln", f64::ln);
    define_unary!("log2", f64::log2);
    define_unary!("log10", f64::log10);
    define_unary!("exp", f64::exp);
    define_unary!("sqrt", f64::sqrt);
    define_unary!("cbrt", f64::cbrt);

    define_builtin!("log", 1, |args: &[Value]| -> Result<Value, String> {
        let x = number_arg(args, 0)?;
        match args.len() {
            1 => Ok(Value::Number(x.ln())),
            _ => Ok(Value::Number(x.log(number_arg(args, 1)?))),
        }
    });

    // Rounding
    define_unary!("floor", f64::floor);
    define_unary!("ceil", f64::ceil);
    define_unary!("round", f64::round);
    define_unary!("trunc", f64::trunc);

    // Extremal
    define_builtin!("min", 1, |args: &[Value]| -> Result<Value, String> {
        let mut result = number_arg(args, 0)?;
        for i in 1..args.len() {
            result = result.min(number_arg(args, i)?);
        }
        Ok(Value::Number(result))
    });

    define_builtin!("max", 1, |args: &[Value]| -> Result<Value, String> {
        let mut result = number_arg(args, 0)?;
        for i in 1..args.len() {
            result = result.max(number_arg(args, i)?);
        }
        Ok(Value::Number(result))
    });

    define_builtin!("clamp", 3, |args: &[Value]| -> Result<Value, String> {
        let x = number_arg(args, 0)?;
        let lo = number_arg(args, 1)?;
        let hi = number_arg(args, 2)?;

        // f64::clamp panics on an inverted or NaN range
        if !(lo <= hi) {
            return Err(format!("invalid range {}..{}", lo, hi));
        }
        Ok(Value::Number(x.clamp(lo, hi)))
    });

    // Misc
    define_unary!("abs", f64::abs);
    define_unary!("sign", |n| if n == 0.0 { n } else { n.signum() });

    define_builtin!("hypot", 2, |args: &[Value]| -> Result<Value, String> {
        let x = number_arg(args, 0)?;
        let y = number_arg(args, 1)?;
        Ok(Value::Number(x.hypot(y)))
    });

    define_builtin!("random", 0, |_args: &[Value]| -> Result<Value, String> {
        Ok(Value::Number(rand::thread_rng().gen()))
    });

    define_builtin!("random_range", 2, |args: &[Value]| -> Result<Value, String> {
        let min = number_arg(args, 0)?;
        let max = number_arg(args, 1)?;

        // gen_range panics on infinite bounds or an overflowing width
        if !min.is_finite() || !max.is_finite() {
            Err(format!("bounds must be finite, found {}..{}", min, max))
        } else if !(min < max) {
            Err("min must be less than max".to_string())
        } else if !(max - min).is_finite() {
            Err(format!("range {}..{} is too wide", min, max))
        } else {
            Ok(Value::Number(rand::thread_rng().gen_range(min..max)))
        }
    });

    env
}
