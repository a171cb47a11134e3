//! Abstract host expressions.
//!
//! The back-end lowers a decision DAG into this small expression tree rather
//! than into any concrete host language, keeping the compiler core
//! independent of its embedding. A back-end (or the bundled evaluator in
//! `trellis_runtime`) serializes or interprets the tree.
//!
//! [`PrimOp`] enumerates the abstract runtime operations the DAG relies on;
//! everything else an emitted program does (user actions, guard predicates)
//! goes through [`HostExpr::Call`] into the embedder's function registry.

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Kind tag for vector patterns.
///
/// `compile_matchv` selects the kind for the duration of one compile. Typed
/// array kinds are coerced to an indexable vector before matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VectorKind {
    /// The host's general indexable vector. No coercion.
    Vector,
    /// A typed array kind, named by its element tag (e.g. `ints`).
    Array(Arc<str>),
}

impl VectorKind {
    /// Whether occurrences of this kind must be coerced to an indexable
    /// vector before element tests run.
    #[inline]
    #[must_use]
    pub fn needs_coercion(&self) -> bool {
        matches!(self, VectorKind::Array(_))
    }

    /// The kind's tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            VectorKind::Vector => "vector",
            VectorKind::Array(tag) => tag,
        }
    }
}

/// Abstract runtime operations emitted by the decision DAG.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrimOp {
    /// Structural equality.
    Eq,
    /// Integer greater-or-equal.
    Ge,
    /// Head of a sequential value.
    First,
    /// Tail of a sequential value, as a list.
    Rest,
    /// Element at an index.
    Nth,
    /// Sub-slice from an index to the end.
    Subvec,
    /// Keyed lookup with nil default.
    Get,
    /// Sorted key set of a lookup-capable value.
    KeySet,
    /// Is the value sequential?
    IsSequential,
    /// Does the value support keyed lookup?
    IsLookup,
    /// Is the value a vector of the given kind?
    IsVector(VectorKind),
    /// Element count.
    Count,
    /// Coerce a typed array to an indexable vector.
    CoerceVector(VectorKind),
}

impl PrimOp {
    /// Surface name used when printing emitted code.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PrimOp::Eq => "=",
            PrimOp::Ge => ">=",
            PrimOp::First => "first",
            PrimOp::Rest => "rest",
            PrimOp::Nth => "nth",
            PrimOp::Subvec => "subvec",
            PrimOp::Get => "get",
            PrimOp::KeySet => "key-set",
            PrimOp::IsSequential => "sequential?",
            PrimOp::IsLookup => "lookup?",
            PrimOp::IsVector(_) => "vector?",
            PrimOp::Count => "count",
            PrimOp::CoerceVector(_) => "coerce",
        }
    }
}

/// An emitted host expression.
#[derive(Clone, Debug, PartialEq)]
pub enum HostExpr {
    /// A quoted literal value.
    Literal(Value),
    /// A variable reference.
    Name(Arc<str>),
    /// A vector construction.
    Vector(Vec<HostExpr>),
    /// Sequential let bindings around a body.
    Let {
        /// Name/expression pairs, bound left to right.
        bindings: Vec<(Arc<str>, HostExpr)>,
        /// The body expression.
        body: Box<HostExpr>,
    },
    /// A two-way conditional.
    If {
        /// The test expression.
        test: Box<HostExpr>,
        /// Evaluated when the test is truthy.
        then: Box<HostExpr>,
        /// Evaluated otherwise.
        orelse: Box<HostExpr>,
    },
    /// Short-circuiting conjunction.
    And(Vec<HostExpr>),
    /// Short-circuiting disjunction.
    Or(Vec<HostExpr>),
    /// An abstract runtime operation.
    Prim {
        /// The operation.
        op: PrimOp,
        /// Its operands.
        args: Vec<HostExpr>,
    },
    /// A call into the embedder's named function registry.
    Call {
        /// Function name.
        name: Arc<str>,
        /// Argument expressions.
        args: Vec<HostExpr>,
    },
    /// Raise the runtime "no match found" failure.
    Fail,
}

impl HostExpr {
    /// Create a name reference.
    #[inline]
    pub fn name(n: &Arc<str>) -> Self {
        HostExpr::Name(n.clone())
    }

    /// The literal `true`.
    #[inline]
    pub fn truth() -> Self {
        HostExpr::Literal(Value::Bool(true))
    }

    /// Whether this expression is the literal `true`.
    #[inline]
    #[must_use]
    pub fn is_truth(&self) -> bool {
        matches!(self, HostExpr::Literal(Value::Bool(true)))
    }

    /// Create a primitive operation expression.
    #[inline]
    pub fn prim(op: PrimOp, args: Vec<HostExpr>) -> Self {
        HostExpr::Prim { op, args }
    }

    /// Conjunction of tests, dropping literal-true operands.
    ///
    /// Returns `true` for an empty conjunction and the test itself for a
    /// singleton one.
    pub fn conjoin(tests: Vec<HostExpr>) -> Self {
        let mut kept: Vec<HostExpr> = tests.into_iter().filter(|t| !t.is_truth()).collect();
        match kept.len() {
            0 => HostExpr::truth(),
            1 => kept.swap_remove(0),
            _ => HostExpr::And(kept),
        }
    }

    /// Wrap a body in a let, or return the body when there is nothing to bind.
    pub fn let_wrap(bindings: Vec<(Arc<str>, HostExpr)>, body: HostExpr) -> Self {
        if bindings.is_empty() {
            body
        } else {
            HostExpr::Let {
                bindings,
                body: Box::new(body),
            }
        }
    }
}

impl fmt::Display for HostExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostExpr::Literal(v) => write!(f, "{v}"),
            HostExpr::Name(n) => write!(f, "{n}"),
            HostExpr::Vector(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            HostExpr::Let { bindings, body } => {
                write!(f, "(let [")?;
                for (i, (name, expr)) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{name} {expr}")?;
                }
                write!(f, "] {body})")
            }
            HostExpr::If { test, then, orelse } => write!(f, "(if {test} {then} {orelse})"),
            HostExpr::And(tests) => {
                write!(f, "(and")?;
                for t in tests {
                    write!(f, " {t}")?;
                }
                write!(f, ")")
            }
            HostExpr::Or(tests) => {
                write!(f, "(or")?;
                for t in tests {
                    write!(f, " {t}")?;
                }
                write!(f, ")")
            }
            HostExpr::Prim { op, args } => {
                write!(f, "({}", op.name())?;
                if let PrimOp::IsVector(kind) | PrimOp::CoerceVector(kind) = op {
                    write!(f, " :{}", kind.tag())?;
                }
                for a in args {
                    write!(f, " {a}")?;
                }
                write!(f, ")")
            }
            HostExpr::Call { name, args } => {
                write!(f, "({name}")?;
                for a in args {
                    write!(f, " {a}")?;
                }
                write!(f, ")")
            }
            HostExpr::Fail => write!(f, "(fail)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjoin_drops_trivial_tests() {
        let eq = HostExpr::prim(
            PrimOp::Eq,
            vec![HostExpr::Name(Arc::from("x")), HostExpr::Literal(Value::Int(1))],
        );
        assert_eq!(HostExpr::conjoin(vec![]), HostExpr::truth());
        assert_eq!(
            HostExpr::conjoin(vec![HostExpr::truth(), eq.clone()]),
            eq.clone()
        );
        assert!(matches!(
            HostExpr::conjoin(vec![eq.clone(), eq]),
            HostExpr::And(_)
        ));
    }

    #[test]
    fn test_let_wrap_empty_is_identity() {
        let body = HostExpr::Literal(Value::Int(1));
        assert_eq!(HostExpr::let_wrap(vec![], body.clone()), body);
    }

    #[test]
    fn test_display() {
        let expr = HostExpr::Let {
            bindings: vec![(Arc::from("x"), HostExpr::Literal(Value::Int(1)))],
            body: Box::new(HostExpr::Name(Arc::from("x"))),
        };
        assert_eq!(expr.to_string(), "(let [x 1] x)");
    }
}
