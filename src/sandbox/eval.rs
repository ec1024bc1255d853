use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::ast::{BinOp, BoolOp, CmpOp, Expr, Stmt, UnaryOp};
use super::validate::ParsedFunction;

/// Runtime fault inside a validated body. These are call-time errors, not
/// validation errors: the whitelist bounds what a body may contain, not
/// whether its operands line up at runtime.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("name `{0}` is not defined")]
    UndefinedName(String),
    #[error("unsupported operand types for {op}: {lhs} and {rhs}")]
    BadOperands {
        op: String,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("bad operand type for {op}: {operand}")]
    BadUnaryOperand { op: String, operand: &'static str },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {0}")]
    Overflow(String),
    #[error("`{0}` is not callable here")]
    NotCallable(String),
    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),
}

/// Receives everything the sandboxed `print` emits. The evaluator has no
/// other channel to the outside world.
pub trait PrintSink {
    fn print(&mut self, line: &str);
}

impl PrintSink for Vec<String> {
    fn print(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Forwards sandbox output to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl PrintSink for StdoutSink {
    fn print(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Runtime values. `Host` is the opaque reference a bound extension receives
/// in place of its `self` parameter; with attribute access banned there is
/// nothing a body can do with it except pass it around.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(Vec<(Value, Value)>),
    Host(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Host(_) => "host",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            Value::Host(_) => true,
        }
    }

    /// Rendering used by `print`: strings appear raw at the top level.
    pub fn display(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// Rendering used inside containers: strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Dict(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::Host(owner) => format!("<host {owner}>"),
        }
    }
}

/// The isolated evaluation context a validated snippet is defined into.
/// Exposes no ambient capability beyond the implicit `print`.
#[derive(Debug, Default)]
pub struct Scope {
    functions: HashMap<String, Arc<ParsedFunction>>,
}

impl Scope {
    pub fn isolated() -> Self {
        Self::default()
    }

    /// Execute a function definition in this scope. The only definition-time
    /// failure is a parameter list that cannot be bound unambiguously.
    pub fn define(&mut self, func: ParsedFunction) -> Result<(), EvalError> {
        let mut seen = std::collections::HashSet::new();
        for param in &func.params {
            if !seen.insert(param.as_str()) {
                return Err(EvalError::DuplicateParameter(param.clone()));
            }
        }
        self.functions.insert(func.name.clone(), Arc::new(func));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<ParsedFunction>> {
        self.functions.get(name).cloned()
    }
}

/// Run a function body with parameters already bound to `args`.
/// The caller is responsible for arity; `bind` in the extension layer
/// produces the argument-binding errors.
pub fn run_function(
    func: &ParsedFunction,
    args: Vec<Value>,
    sink: &mut dyn PrintSink,
) -> Result<Value, EvalError> {
    let mut locals: HashMap<String, Value> = func
        .params
        .iter()
        .cloned()
        .zip(args)
        .collect();

    match exec_block(&func.body, &mut locals, sink)? {
        Flow::Return(value) => Ok(value),
        Flow::Normal => Ok(Value::None),
    }
}

enum Flow {
    Normal,
    Return(Value),
}

fn exec_block(
    stmts: &[Stmt],
    locals: &mut HashMap<String, Value>,
    sink: &mut dyn PrintSink,
) -> Result<Flow, EvalError> {
    for stmt in stmts {
        match stmt {
            Stmt::Expr(expr) => {
                eval_expr(expr, locals, sink)?;
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => eval_expr(expr, locals, sink)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Pass => {}
            Stmt::If { test, body, orelse } => {
                let branch = if eval_expr(test, locals, sink)?.is_truthy() {
                    body
                } else {
                    orelse
                };
                if let Flow::Return(value) = exec_block(branch, locals, sink)? {
                    return Ok(Flow::Return(value));
                }
            }
            // Nested defs validate but are inert: nothing in the whitelist
            // can call them.
            Stmt::FunctionDef { .. } => {}
            // Unreachable after validation; kept total rather than panicking.
            _ => {}
        }
    }
    Ok(Flow::Normal)
}

fn eval_expr(
    expr: &Expr,
    locals: &HashMap<String, Value>,
    sink: &mut dyn PrintSink,
) -> Result<Value, EvalError> {
    match expr {
        Expr::NoneLit => Ok(Value::None),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Name(name) => locals
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedName(name.clone())),
        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, locals, sink)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    Value::Int(i) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| EvalError::Overflow("-".to_string())),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(EvalError::BadUnaryOperand {
                        op: "-".to_string(),
                        operand: other.type_name(),
                    }),
                },
            }
        }
        Expr::Binary { op, left, right } => {
            let lhs = eval_expr(left, locals, sink)?;
            let rhs = eval_expr(right, locals, sink)?;
            eval_binary(*op, lhs, rhs)
        }
        Expr::Compare { op, left, right } => {
            let lhs = eval_expr(left, locals, sink)?;
            let rhs = eval_expr(right, locals, sink)?;
            eval_compare(*op, lhs, rhs)
        }
        Expr::BoolExpr { op, left, right } => {
            let lhs = eval_expr(left, locals, sink)?;
            match op {
                BoolOp::And if !lhs.is_truthy() => Ok(lhs),
                BoolOp::Or if lhs.is_truthy() => Ok(lhs),
                _ => eval_expr(right, locals, sink),
            }
        }
        Expr::Call { func, args } => {
            let Expr::Name(name) = func.as_ref() else {
                return Err(EvalError::NotCallable("computed target".to_string()));
            };
            if name != "print" {
                return Err(EvalError::NotCallable(name.clone()));
            }
            let mut rendered = Vec::with_capacity(args.len());
            for arg in args {
                rendered.push(eval_expr(arg, locals, sink)?.display());
            }
            sink.print(&rendered.join(" "));
            Ok(Value::None)
        }
        Expr::List(items) | Expr::Tuple(items) | Expr::Set(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(item, locals, sink)?);
            }
            Ok(Value::List(values))
        }
        Expr::Dict(entries) => {
            let mut values = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                values.push((eval_expr(k, locals, sink)?, eval_expr(v, locals, sink)?));
            }
            Ok(Value::Dict(values))
        }
        // Rejected by validation; kept total.
        Expr::Attribute { .. } | Expr::Subscript { .. } | Expr::Lambda { .. } => Err(
            EvalError::NotCallable("construct outside the whitelist".to_string()),
        ),
        Expr::Comprehension(kind) => {
            Err(EvalError::NotCallable(kind.to_string()))
        }
    }
}

fn eval_binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use Value::*;

    let bad = |lhs: &Value, rhs: &Value| EvalError::BadOperands {
        op: op.to_string(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };

    match (op, lhs, rhs) {
        (BinOp::Add, Int(a), Int(b)) => a
            .checked_add(b)
            .map(Int)
            .ok_or_else(|| EvalError::Overflow("+".to_string())),
        (BinOp::Add, Str(a), Str(b)) => Ok(Str(a + &b)),
        (BinOp::Add, List(mut a), List(b)) => {
            a.extend(b);
            Ok(List(a))
        }
        (BinOp::Sub, Int(a), Int(b)) => a
            .checked_sub(b)
            .map(Int)
            .ok_or_else(|| EvalError::Overflow("-".to_string())),
        (BinOp::Mul, Int(a), Int(b)) => a
            .checked_mul(b)
            .map(Int)
            .ok_or_else(|| EvalError::Overflow("*".to_string())),
        (BinOp::Mul, Str(s), Int(n)) | (BinOp::Mul, Int(n), Str(s)) => {
            Ok(Str(s.repeat(n.max(0) as usize)))
        }
        (BinOp::Mul, List(items), Int(n)) => {
            let mut out = Vec::new();
            for _ in 0..n.max(0) {
                out.extend(items.iter().cloned());
            }
            Ok(List(out))
        }
        (BinOp::Div, a, b) => match (as_float(&a), as_float(&b)) {
            (Some(x), Some(y)) => {
                if y == 0.0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Float(x / y))
                }
            }
            _ => Err(bad(&a, &b)),
        },
        (BinOp::FloorDiv, Int(a), Int(b)) => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let q = a / b;
            let floored = if a % b != 0 && (a < 0) != (b < 0) {
                q - 1
            } else {
                q
            };
            Ok(Int(floored))
        }
        (BinOp::Mod, Int(a), Int(b)) => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Int(((a % b) + b) % b))
        }
        (BinOp::Pow, Int(a), Int(b)) => {
            if b < 0 {
                return Ok(Float((a as f64).powi(b as i32)));
            }
            let exp = u32::try_from(b).map_err(|_| EvalError::Overflow("**".to_string()))?;
            a.checked_pow(exp)
                .map(Int)
                .ok_or_else(|| EvalError::Overflow("**".to_string()))
        }
        // Mixed numeric operands promote to float.
        (op, a, b) => match (as_float(&a), as_float(&b)) {
            (Some(x), Some(y)) => match op {
                BinOp::Add => Ok(Float(x + y)),
                BinOp::Sub => Ok(Float(x - y)),
                BinOp::Mul => Ok(Float(x * y)),
                BinOp::FloorDiv => {
                    if y == 0.0 {
                        Err(EvalError::DivisionByZero)
                    } else {
                        Ok(Float((x / y).floor()))
                    }
                }
                BinOp::Mod => {
                    if y == 0.0 {
                        Err(EvalError::DivisionByZero)
                    } else {
                        Ok(Float(x - y * (x / y).floor()))
                    }
                }
                BinOp::Pow => Ok(Float(x.powf(y))),
                BinOp::Div => unreachable!("handled above"),
            },
            _ => Err(bad(&a, &b)),
        },
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn eval_compare(op: CmpOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let bad = || EvalError::BadOperands {
        op: op.to_string(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };

    let result = match op {
        CmpOp::Eq | CmpOp::Is => value_eq(&lhs, &rhs),
        CmpOp::NotEq => !value_eq(&lhs, &rhs),
        CmpOp::In => match (&lhs, &rhs) {
            (Value::Str(needle), Value::Str(haystack)) => haystack.contains(needle.as_str()),
            (item, Value::List(items)) => items.iter().any(|v| value_eq(v, item)),
            _ => return Err(bad()),
        },
        CmpOp::Lt | CmpOp::LtEq | CmpOp::Gt | CmpOp::GtEq => {
            let ordering = match (&lhs, &rhs) {
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                (a, b) => match (as_float(a), as_float(b)) {
                    (Some(x), Some(y)) => x
                        .partial_cmp(&y)
                        .ok_or_else(bad)?,
                    _ => return Err(bad()),
                },
            };
            match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::LtEq => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::GtEq => ordering.is_ge(),
                _ => unreachable!(),
            }
        }
    };
    Ok(Value::Bool(result))
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (as_float(a), as_float(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::validate::validate;

    fn run(src: &str, args: Vec<Value>) -> (Result<Value, EvalError>, Vec<String>) {
        let func = validate(src).expect("valid snippet");
        let mut lines = Vec::new();
        let result = run_function(&func, args, &mut lines);
        (result, lines)
    }

    #[test]
    fn test_print_literal() {
        let (result, lines) = run("def f():\n    print('hello', 42)\n", vec![]);
        assert_eq!(result, Ok(Value::None));
        assert_eq!(lines, vec!["hello 42"]);
    }

    #[test]
    fn test_string_concat_with_param() {
        let (result, lines) = run(
            "def warn(x):\n    print('issue: ' + x)\n",
            vec![Value::Str("hot path".into())],
        );
        assert_eq!(result, Ok(Value::None));
        assert_eq!(lines, vec!["issue: hot path"]);
    }

    #[test]
    fn test_return_value_no_output() {
        let (result, lines) = run("def f():\n    return (2 + 3) * 4\n", vec![]);
        assert_eq!(result, Ok(Value::Int(20)));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_if_branches() {
        let src = "def f(x):\n    if x > 1:\n        print('big')\n    else:\n        print('small')\n";
        let (_, lines) = run(src, vec![Value::Int(5)]);
        assert_eq!(lines, vec!["big"]);
        let (_, lines) = run(src, vec![Value::Int(0)]);
        assert_eq!(lines, vec!["small"]);
    }

    #[test]
    fn test_return_short_circuits_body() {
        let src = "def f():\n    return 1\n    print('never')\n";
        let (result, lines) = run(src, vec![]);
        assert_eq!(result, Ok(Value::Int(1)));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_arithmetic_semantics() {
        let (result, _) = run("def f():\n    return 7 // 2\n", vec![]);
        assert_eq!(result, Ok(Value::Int(3)));
        let (result, _) = run("def f():\n    return -7 // 2\n", vec![]);
        assert_eq!(result, Ok(Value::Int(-4)));
        let (result, _) = run("def f():\n    return -7 % 2\n", vec![]);
        assert_eq!(result, Ok(Value::Int(1)));
        let (result, _) = run("def f():\n    return 2 ** 10\n", vec![]);
        assert_eq!(result, Ok(Value::Int(1024)));
        let (result, _) = run("def f():\n    return 1 / 2\n", vec![]);
        assert_eq!(result, Ok(Value::Float(0.5)));
    }

    #[test]
    fn test_string_repeat_and_membership() {
        let (result, _) = run("def f():\n    return 'ab' * 3\n", vec![]);
        assert_eq!(result, Ok(Value::Str("ababab".into())));
        let (result, _) = run("def f():\n    return 'b' in 'abc'\n", vec![]);
        assert_eq!(result, Ok(Value::Bool(true)));
    }

    #[test]
    fn test_bool_ops_return_operands() {
        let (result, _) = run("def f():\n    return 0 or 'fallback'\n", vec![]);
        assert_eq!(result, Ok(Value::Str("fallback".into())));
        let (result, _) = run("def f():\n    return 1 and 2\n", vec![]);
        assert_eq!(result, Ok(Value::Int(2)));
    }

    #[test]
    fn test_division_by_zero() {
        let (result, _) = run("def f():\n    return 1 / 0\n", vec![]);
        assert_eq!(result, Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_type_mismatch_is_runtime_error() {
        let (result, _) = run(
            "def warn(x):\n    print('issue: ' + x)\n",
            vec![Value::Host("round-table".into())],
        );
        assert!(matches!(result, Err(EvalError::BadOperands { .. })));
    }

    #[test]
    fn test_undefined_name() {
        let (result, _) = run("def f():\n    print(missing)\n", vec![]);
        assert_eq!(result, Err(EvalError::UndefinedName("missing".into())));
    }

    #[test]
    fn test_container_rendering() {
        let (_, lines) = run("def f():\n    print([1, 'a', True], {'k': None})\n", vec![]);
        assert_eq!(lines, vec!["[1, 'a', True] {'k': None}"]);
    }

    #[test]
    fn test_scope_rejects_duplicate_params() {
        let func = validate("def f(a, a):\n    pass\n").expect("valid");
        let mut scope = Scope::isolated();
        assert_eq!(
            scope.define(func),
            Err(EvalError::DuplicateParameter("a".into()))
        );
    }

    #[test]
    fn test_scope_define_and_lookup() {
        let func = validate("def f():\n    pass\n").expect("valid");
        let mut scope = Scope::isolated();
        scope.define(func).expect("define");
        assert!(scope.lookup("f").is_some());
        assert!(scope.lookup("g").is_none());
    }
}
