use crate::environment::{Environment, ScopeError};
use crate::error::{arity_error, internal_error, name_error, type_error, Result};
use crate::parser::{parse, BinaryOp, Block, Expr, ExprType, FunctionDecl, Stmt, StmtType, UnaryOp};
use crate::tokenizer::FileLocation;
use log::trace;
use std::{
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
};

pub type BuiltInFn = dyn Fn(&[Value]) -> std::result::Result<Value, String>;

#[derive(Clone, Default)]
pub enum Value {
    Number(f64),
    Callable(Callable),
    #[default]
    Undefined,
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Callable(_) => "function",
            Value::Undefined => "undefined",
        }
    }

    /// True for a user function whose closure is `env` or a frame below it.
    pub fn captures(&self, env: &Environment) -> bool {
        match self {
            Value::Callable(Callable::Function { closure, .. }) => closure.is_within(env),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                const EPSILON: f64 = 1e-10;
                a == b || (a - b).abs() < EPSILON
            }
            (Value::Undefined, Value::Undefined) => true,
            (Value::Callable(a), Value::Callable(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Callable(c) => write!(f, "{}", c),
            Value::Undefined => write!(f, "undefined"),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(Clone)]
pub enum Callable {
    Function {
        decl: Rc<FunctionDecl>,
        closure: Environment,
    },
    BuiltIn {
        name: String,
        arity: usize,
        func: Rc<BuiltInFn>,
    },
}

impl Display for Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function { decl, .. } => {
                write!(f, "func {}({})", decl.name, decl.params.join(", "))
            }
            Callable::BuiltIn { name, .. } => {
                write!(f, "<built-in {}>", name)
            }
        }
    }
}

impl Debug for Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Callables are equal only when they are the same value.
impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Callable::Function {
                    decl: a,
                    closure: env_a,
                },
                Callable::Function {
                    decl: b,
                    closure: env_b,
                },
            ) => Rc::ptr_eq(a, b) && env_a.ptr_eq(env_b),
            (Callable::BuiltIn { func: a, .. }, Callable::BuiltIn { func: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

/// The outcome of one top-level unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    /// Explicit `return` value, or the value of a trailing expression statement.
    pub value: Option<Value>,
    /// Names newly declared in the root frame, in declaration order.
    pub declared: Vec<String>,
}

enum Flow {
    Normal,
    Return(Value),
}

/// Evaluates a program root against `env`, which is kept and may be reused
/// for the next unit.
pub fn run(program: &Block, env: &Environment) -> Result<Evaluation> {
    let known = env.local_names().len();
    let value = evaluate_root(program, env)?;

    let mut declared = env.local_names();
    let declared = declared.split_off(known.min(declared.len()));

    Ok(Evaluation { value, declared })
}

/// Parses and runs one source unit against `env`.
pub fn interpret(source: &str, env: &Environment) -> Result<Evaluation> {
    let program = parse(source)?;
    run(&program, env)
}

fn evaluate_root(program: &Block, env: &Environment) -> Result<Option<Value>> {
    let mut last = None;

    for stmt in &program.statements {
        match &stmt.stmt_type {
            StmtType::Expression(expr) => last = Some(evaluate(expr, env)?),
            _ => {
                last = None;
                if let Flow::Return(value) = execute(stmt, env)? {
                    return Ok(Some(value));
                }
            }
        }
    }

    Ok(last)
}

fn execute_block(block: &Block, env: &Environment) -> Result<Flow> {
    for stmt in &block.statements {
        if let Flow::Return(value) = execute(stmt, env)? {
            return Ok(Flow::Return(value));
        }
    }
    Ok(Flow::Normal)
}

fn execute(stmt: &Stmt, env: &Environment) -> Result<Flow> {
    match &stmt.stmt_type {
        StmtType::Var { name, initializer } => {
            let value = match initializer {
                Some(expr) => evaluate(expr, env)?,
                None => Value::Undefined,
            };
            declare(env, name, value, stmt.location)?;
            Ok(Flow::Normal)
        }
        StmtType::Return(value) => {
            let value = match value {
                Some(expr) => evaluate(expr, env)?,
                None => Value::Undefined,
            };
            Ok(Flow::Return(value))
        }
        StmtType::Function(decl) => {
            let function = Value::Callable(Callable::Function {
                decl: decl.clone(),
                // Capture the defining frame. The frame now holds a function
                // that holds the frame. Call and block frames are released on
                // exit unless a returned closure still needs them; the root
                // frame lives as long as its session.
                closure: env.clone(),
            });
            declare(env, &decl.name, function, stmt.location)?;
            Ok(Flow::Normal)
        }
        StmtType::Block(block) => {
            let block_env = env.extend();
            let flow = execute_block(block, &block_env);
            release_frame(&block_env, &flow);
            flow
        }
        StmtType::Expression(expr) => {
            evaluate(expr, env)?;
            Ok(Flow::Normal)
        }
    }
}

/// Empties a finished frame unless the value leaving it closes over it.
fn release_frame(env: &Environment, flow: &Result<Flow>) {
    let escapes = match flow {
        Ok(Flow::Return(value)) => value.captures(env),
        _ => false,
    };
    if !escapes {
        env.release();
    }
}

fn declare(env: &Environment, name: &str, value: Value, location: FileLocation) -> Result<()> {
    match env.declare(name, value) {
        Ok(_) => Ok(()),
        Err(err @ ScopeError::AlreadyDeclared(_)) => name_error(&err.to_string(), location),
        Err(err @ ScopeError::Borrowed(_)) => internal_error(&err.to_string(), location),
    }
}

pub fn evaluate(expr: &Expr, env: &Environment) -> Result<Value> {
    match &expr.expr_type {
        ExprType::Number(n) => Ok(Value::Number(*n)),
        ExprType::Identifier(name) => match env.get(name) {
            Some(value) => Ok(value),
            None => name_error(&format!("Unknown value: '{}'", name), expr.location),
        },
        ExprType::Unary { operator, target } => {
            evaluate_unary(operator, target, env, expr.location)
        }
        ExprType::Binary {
            left,
            operator,
            right,
        } => evaluate_binary(left, operator, right, env),
        ExprType::Call { callee, arguments } => {
            let callee_val = evaluate(callee, env)?;
            let mut evaluated_args = Vec::with_capacity(arguments.len());

            for arg in arguments {
                evaluated_args.push(evaluate(arg, env)?);
            }

            call(callee_val, evaluated_args, expr.location)
        }
    }
}

pub fn call(callee: Value, args: Vec<Value>, location: FileLocation) -> Result<Value> {
    match callee {
        Value::Callable(Callable::Function { decl, closure }) => {
            if args.len() < decl.params.len() {
                return arity_error(decl.params.len(), args.len(), location);
            }
            trace!("call {} with {} arguments", decl.name, args.len());

            // Chained to the defining frame, not the caller's
            let call_env = closure.extend();

            // Surplus arguments are dropped by the zip. The body runs in
            // the same frame as the parameters.
            let flow = decl
                .params
                .iter()
                .zip(args)
                .try_for_each(|(param, arg)| declare(&call_env, param, arg, location))
                .and_then(|_| execute_block(&decl.body, &call_env));
            release_frame(&call_env, &flow);

            match flow? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Undefined),
            }
        }
        Value::Callable(Callable::BuiltIn { name, arity, func }) => {
            if args.len() < arity {
                return arity_error(arity, args.len(), location);
            }
            trace!("call built-in {} with {} arguments", name, args.len());

            match func(&args) {
                Ok(value) => Ok(value),
                Err(message) => type_error(&format!("{}: {}", name, message), location),
            }
        }
        other => type_error(
            &format!("Cannot call a value of kind '{}'", other.kind_name()),
            location,
        ),
    }
}

fn evaluate_unary(
    operator: &UnaryOp,
    target: &Expr,
    env: &Environment,
    location: FileLocation,
) -> Result<Value> {
    match evaluate(target, env)? {
        Value::Number(n) => Ok(Value::Number(match operator {
            UnaryOp::Pos => n,
            UnaryOp::Neg => -n,
            UnaryOp::Abs => n.abs(),
        })),
        other => type_error(
            &format!(
                "Unary {} is not supported for values of kind '{}'",
                operator.symbol(),
                other.kind_name()
            ),
            location,
        ),
    }
}

fn evaluate_binary(
    left: &Expr,
    operator: &BinaryOp,
    right: &Expr,
    env: &Environment,
) -> Result<Value> {
    let left_val = evaluate(left, env)?;
    let right_val = evaluate(right, env)?;

    // The left operand's kind selects the operator table
    match (&left_val, &right_val) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(arithmetic(*operator, *a, *b))),
        (Value::Number(_), other) => type_error(
            &format!(
                "Operator '{}' expects a number on the right, found '{}'",
                operator.symbol(),
                other.kind_name()
            ),
            right.location,
        ),
        (other, _) => type_error(
            &format!(
                "Operator '{}' is not supported for values of kind '{}'",
                operator.symbol(),
                other.kind_name()
            ),
            left.location,
        ),
    }
}

fn arithmetic(operator: BinaryOp, a: f64, b: f64) -> f64 {
    match operator {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Pow => a.powf(b),
        BinaryOp::FloorDiv => (a / b).floor(),
    }
}
