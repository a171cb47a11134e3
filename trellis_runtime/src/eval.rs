//! Host-expression evaluator.
//!
//! A straightforward tree walker over [`HostExpr`]: lexical scopes for let
//! bindings, a registry of named host functions for calls and guard
//! predicates, and the primitive operations the decision DAG emits.
//!
//! When tracing is enabled the environment counts conditional branches and
//! records which tests succeeded; a no-match failure then carries that
//! breadcrumb detail in its error.

use crate::prelude;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::trace;
use trellis_core::{HostExpr, Lookup, PrimOp, TrellisError, TrellisResult, Value, VectorKind};

/// A named host function callable from emitted code.
pub type HostFn = fn(&[Value]) -> TrellisResult<Value>;

/// Evaluation environment: scoped bindings plus the host function registry.
pub struct Env {
    scopes: Vec<FxHashMap<Arc<str>, Value>>,
    fns: FxHashMap<Arc<str>, HostFn>,
    trace: bool,
    branches: u32,
    breadcrumbs: Vec<String>,
}

impl Env {
    /// An environment with the standard prelude registered.
    pub fn new() -> Self {
        let mut env = Env {
            scopes: vec![FxHashMap::default()],
            fns: FxHashMap::default(),
            trace: false,
            branches: 0,
            breadcrumbs: Vec::new(),
        };
        prelude::install(&mut env);
        env
    }

    /// Toggle branch tracing for no-match diagnostics.
    pub fn set_trace(&mut self, on: bool) {
        self.trace = on;
    }

    /// Bind a value in the current scope.
    pub fn bind(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(Arc::from(name), value);
        }
    }

    /// Register a host function.
    pub fn register(&mut self, name: &str, f: HostFn) {
        self.fns.insert(Arc::from(name), f);
    }

    fn lookup_var(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Evaluate an expression to a value.
    pub fn eval(&mut self, expr: &HostExpr) -> TrellisResult<Value> {
        match expr {
            HostExpr::Literal(v) => Ok(v.clone()),

            HostExpr::Name(name) => {
                self.lookup_var(name)
                    .cloned()
                    .ok_or_else(|| TrellisError::UnboundName {
                        name: name.to_string(),
                    })
            }

            HostExpr::Vector(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<TrellisResult<Vec<_>>>()?;
                Ok(Value::Vector(values))
            }

            HostExpr::Let { bindings, body } => {
                self.scopes.push(FxHashMap::default());
                let result = self.eval_let(bindings, body);
                self.scopes.pop();
                result
            }

            HostExpr::If { test, then, orelse } => {
                let condition = self.eval(test)?;
                self.branches += 1;
                if condition.is_truthy() {
                    if self.trace {
                        self.breadcrumbs.push(test.to_string());
                    }
                    self.eval(then)
                } else {
                    self.eval(orelse)
                }
            }

            HostExpr::And(tests) => {
                let mut last = Value::Bool(true);
                for test in tests {
                    last = self.eval(test)?;
                    if !last.is_truthy() {
                        return Ok(last);
                    }
                }
                Ok(last)
            }

            HostExpr::Or(tests) => {
                let mut last = Value::Bool(false);
                for test in tests {
                    last = self.eval(test)?;
                    if last.is_truthy() {
                        return Ok(last);
                    }
                }
                Ok(last)
            }

            HostExpr::Prim { op, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<TrellisResult<Vec<_>>>()?;
                apply_prim(op, &values)
            }

            HostExpr::Call { name, args } => {
                let f = *self
                    .fns
                    .get(&**name)
                    .ok_or_else(|| TrellisError::UndefinedFunction {
                        name: name.to_string(),
                    })?;
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<TrellisResult<Vec<_>>>()?;
                f(&values)
            }

            HostExpr::Fail => {
                trace!(branches = self.branches, "match fell through to failure");
                let detail = self.trace.then(|| {
                    format!(
                        "{} branches taken; tests passed: [{}]",
                        self.branches,
                        self.breadcrumbs.join(", ")
                    )
                });
                Err(TrellisError::NoMatch { detail })
            }
        }
    }

    fn eval_let(
        &mut self,
        bindings: &[(Arc<str>, HostExpr)],
        body: &HostExpr,
    ) -> TrellisResult<Value> {
        for (name, expr) in bindings {
            let value = self.eval(expr)?;
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(name.clone(), value);
            }
        }
        self.eval(body)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Primitive Operations
// =============================================================================

fn expect_arity(op: &PrimOp, args: &[Value], expected: usize) -> TrellisResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(TrellisError::ArityError {
            name: op.name().to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn type_error(op: &PrimOp, value: &Value) -> TrellisError {
    TrellisError::TypeError {
        message: format!("{} is not applicable to {value}", op.name()),
    }
}

/// Apply an abstract runtime operation.
fn apply_prim(op: &PrimOp, args: &[Value]) -> TrellisResult<Value> {
    match op {
        PrimOp::Eq => {
            expect_arity(op, args, 2)?;
            Ok(Value::Bool(args[0] == args[1]))
        }

        PrimOp::Ge => {
            expect_arity(op, args, 2)?;
            match (&args[0], &args[1]) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(type_error(op, &args[0])),
            }
        }

        PrimOp::First => {
            expect_arity(op, args, 1)?;
            let items = args[0].seq_items().ok_or_else(|| type_error(op, &args[0]))?;
            Ok(items.first().cloned().unwrap_or(Value::Nil))
        }

        PrimOp::Rest => {
            expect_arity(op, args, 1)?;
            let items = args[0].seq_items().ok_or_else(|| type_error(op, &args[0]))?;
            Ok(Value::List(items.get(1..).unwrap_or(&[]).to_vec()))
        }

        PrimOp::Nth => {
            expect_arity(op, args, 2)?;
            let items = indexable_items(op, &args[0])?;
            let index = int_index(op, &args[1])?;
            items
                .get(index)
                .cloned()
                .ok_or(TrellisError::IndexError {
                    index,
                    len: items.len(),
                })
        }

        PrimOp::Subvec => {
            expect_arity(op, args, 2)?;
            let items = indexable_items(op, &args[0])?;
            let start = int_index(op, &args[1])?;
            if start > items.len() {
                return Err(TrellisError::IndexError {
                    index: start,
                    len: items.len(),
                });
            }
            Ok(Value::Vector(items[start..].to_vec()))
        }

        PrimOp::Get => {
            expect_arity(op, args, 2)?;
            Ok(args[0].lookup(&args[1]).unwrap_or(Value::Nil))
        }

        PrimOp::KeySet => {
            expect_arity(op, args, 1)?;
            args[0]
                .key_set()
                .map(Value::Vector)
                .ok_or_else(|| type_error(op, &args[0]))
        }

        PrimOp::IsSequential => {
            expect_arity(op, args, 1)?;
            Ok(Value::Bool(args[0].is_sequential()))
        }

        PrimOp::IsLookup => {
            expect_arity(op, args, 1)?;
            Ok(Value::Bool(args[0].supports_lookup()))
        }

        PrimOp::IsVector(kind) => {
            expect_arity(op, args, 1)?;
            let matches = match kind {
                VectorKind::Vector => matches!(args[0], Value::Vector(_)),
                VectorKind::Array(tag) => {
                    matches!(&args[0], Value::Array { tag: t, .. } if t == tag)
                }
            };
            Ok(Value::Bool(matches))
        }

        PrimOp::Count => {
            expect_arity(op, args, 1)?;
            args[0]
                .count()
                .map(|n| Value::Int(n as i64))
                .ok_or_else(|| type_error(op, &args[0]))
        }

        PrimOp::CoerceVector(_) => {
            expect_arity(op, args, 1)?;
            match &args[0] {
                Value::Array { items, .. } => Ok(Value::Vector(items.clone())),
                Value::Vector(items) => Ok(Value::Vector(items.clone())),
                Value::List(items) => Ok(Value::Vector(items.clone())),
                other => Err(type_error(op, other)),
            }
        }
    }
}

fn indexable_items<'a>(op: &PrimOp, value: &'a Value) -> TrellisResult<&'a [Value]> {
    match value {
        Value::Vector(items) | Value::List(items) | Value::Array { items, .. } => Ok(items),
        other => Err(type_error(op, other)),
    }
}

fn int_index(op: &PrimOp, value: &Value) -> TrellisResult<usize> {
    match value {
        Value::Int(n) if *n >= 0 => Ok(*n as usize),
        other => Err(type_error(op, other)),
    }
}
