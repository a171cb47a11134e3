//! Host-expression emission from decision DAGs.
//!
//! Each DAG node lowers to a small host-expression shape:
//!
//! - `Leaf` - let-bindings (skipping `_`) around the action
//! - `Fail` - the runtime "no match found" failure
//! - `Bind` - let-bindings around the inner node
//! - `Switch` - a cascade of per-pattern tests with an unconditional tail,
//!   preceded by a let of the occurrence when it projects out of a parent
//!
//! The per-pattern test expression comes from the pattern itself; wildcard
//! and or-patterns are compiled away before any switch is built and never
//! produce a test.

use super::decision_tree::DecisionNode;
use super::matrix::Binding;
use super::occurrence::Occurrence;
use super::pattern::{Pattern, PatternKind, WILDCARD_NAME};
use std::sync::Arc;
use trellis_core::{Form, HostExpr, PrimOp, Value};

/// Lower a decision DAG into a host expression.
pub fn lower(node: &DecisionNode) -> HostExpr {
    match node {
        DecisionNode::Leaf { action, bindings } => {
            HostExpr::let_wrap(binding_pairs(bindings), lower_form(action))
        }

        DecisionNode::Fail => HostExpr::Fail,

        DecisionNode::Bind { bindings, node } => {
            HostExpr::let_wrap(binding_pairs(bindings), lower(node))
        }

        DecisionNode::Switch {
            occurrence,
            cases,
            default,
        } => {
            let mut chain = lower(default);
            for case in cases.iter().rev() {
                chain = HostExpr::If {
                    test: Box::new(pattern_test(&case.pattern, occurrence)),
                    then: Box::new(lower(&case.node)),
                    orelse: Box::new(chain),
                };
            }
            match occurrence.bind_expr() {
                Some(expr) => {
                    HostExpr::let_wrap(vec![(occurrence.name.clone(), expr)], chain)
                }
                None => chain,
            }
        }
    }
}

/// Binding pairs for a let, dropping anonymous `_` entries.
fn binding_pairs(bindings: &[Binding]) -> Vec<(Arc<str>, HostExpr)> {
    bindings
        .iter()
        .filter(|b| &*b.name != WILDCARD_NAME)
        .map(|b| (b.name.clone(), b.expr.clone()))
        .collect()
}

/// The test expression for a constructor pattern on an occurrence.
pub fn pattern_test(pattern: &Pattern, occ: &Occurrence) -> HostExpr {
    match &pattern.kind {
        PatternKind::Wildcard { .. } => HostExpr::truth(),

        PatternKind::Literal { value, local } => {
            let rhs = if *local {
                // Compare against the caller local's value, not its name.
                lower_form(value)
            } else {
                HostExpr::Literal(Value::from_form(value))
            };
            HostExpr::prim(PrimOp::Eq, vec![occ.reference(), rhs])
        }

        PatternKind::Seq { .. } => HostExpr::prim(PrimOp::IsSequential, vec![occ.reference()]),

        PatternKind::Rest { inner } => pattern_test(inner, occ),

        PatternKind::Map { .. } => HostExpr::prim(PrimOp::IsLookup, vec![occ.reference()]),

        PatternKind::MapCrash { keys } => {
            let mut key_values: Vec<Value> = keys.iter().map(Value::from_form).collect();
            key_values.sort_by(|a, b| a.total_cmp(b));
            key_values.dedup();
            HostExpr::prim(
                PrimOp::Eq,
                vec![
                    HostExpr::prim(
                        PrimOp::KeySet,
                        vec![HostExpr::Name(occ.map_source().clone())],
                    ),
                    HostExpr::Literal(Value::Vector(key_values)),
                ],
            )
        }

        PatternKind::Vector {
            items,
            kind,
            offset,
            rest,
        } => {
            let mut tests = vec![HostExpr::prim(
                PrimOp::IsVector(kind.clone()),
                vec![occ.reference()],
            )];
            let size = HostExpr::Literal(Value::Int((offset + items.len()) as i64));
            let count = HostExpr::prim(PrimOp::Count, vec![occ.reference()]);
            if rest.is_none() {
                // Exact count when the size is fully known.
                tests.push(HostExpr::prim(PrimOp::Eq, vec![count, size]));
            } else if !items.is_empty() || *offset > 0 {
                // A rest remainder only needs the fixed prefix present.
                tests.push(HostExpr::prim(PrimOp::Ge, vec![count, size]));
            }
            HostExpr::conjoin(tests)
        }

        PatternKind::Guard { inner, preds } => {
            let mut tests = vec![pattern_test(inner, occ)];
            tests.extend(preds.iter().map(|pred| predicate_test(pred, occ)));
            HostExpr::conjoin(tests)
        }

        // Or-patterns are expanded out of switch columns, but survive as a
        // guard's inner pattern; the test is the alternatives' disjunction.
        PatternKind::Or { alts } => {
            let tests: Vec<HostExpr> = alts.iter().map(|alt| pattern_test(alt, occ)).collect();
            if tests.iter().any(HostExpr::is_truth) {
                HostExpr::truth()
            } else {
                HostExpr::Or(tests)
            }
        }
    }
}

/// Apply a guard predicate to an occurrence.
///
/// A symbol names a registered function and is applied to the occurrence;
/// any other form is lowered as-is and used as the test expression.
fn predicate_test(pred: &Form, occ: &Occurrence) -> HostExpr {
    match pred {
        Form::Symbol(name) => HostExpr::Call {
            name: name.clone(),
            args: vec![occ.reference()],
        },
        _ => lower_form(pred),
    }
}

/// Lower an opaque surface form (an action, a predicate, or a lifted
/// occurrence expression) into a host expression.
///
/// Symbols become name references, collection literals build element-wise,
/// lists apply their head symbol, and `(quote s)` yields the symbol value.
pub fn lower_form(form: &Form) -> HostExpr {
    match form {
        Form::Symbol(name) => HostExpr::Name(name.clone()),
        Form::Nil | Form::Bool(_) | Form::Int(_) | Form::Float(_) | Form::Str(_)
        | Form::Keyword(_) => HostExpr::Literal(Value::from_form(form)),
        Form::Vector(items) => HostExpr::Vector(items.iter().map(lower_form).collect()),
        Form::List(items) => {
            if let Some(sym) = form.as_quoted() {
                return HostExpr::Literal(Value::Symbol(sym.clone()));
            }
            match items.first() {
                None => HostExpr::Literal(Value::List(Vec::new())),
                Some(Form::Symbol(name)) => HostExpr::Call {
                    name: name.clone(),
                    args: items[1..].iter().map(lower_form).collect(),
                },
                // A non-symbol head has no application semantics here;
                // treat the list as data.
                Some(_) => HostExpr::Literal(Value::from_form(form)),
            }
        }
        Form::Map(_) => HostExpr::Literal(Value::from_form(form)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::VectorKind;

    fn occ(name: &str) -> Occurrence {
        Occurrence::plain(Arc::from(name))
    }

    #[test]
    fn test_literal_test_is_equality() {
        let t = pattern_test(&Pattern::literal(Form::Int(4)), &occ("x"));
        assert_eq!(t.to_string(), "(= x 4)");
    }

    #[test]
    fn test_local_literal_compares_by_name() {
        let t = pattern_test(&Pattern::local_literal(&Arc::from("y")), &occ("x"));
        assert_eq!(t.to_string(), "(= x y)");
    }

    #[test]
    fn test_quoted_symbol_compares_by_symbol_value() {
        let t = pattern_test(&Pattern::literal(Form::sym("red")), &occ("x"));
        assert_eq!(t.to_string(), "(= x red)");
        // The right-hand side is a literal symbol, not a name reference.
        if let HostExpr::Prim { args, .. } = t {
            assert_eq!(args[1], HostExpr::Literal(Value::sym("red")));
        } else {
            panic!("expected prim");
        }
    }

    #[test]
    fn test_vector_test_checks_kind_and_count() {
        let p = Pattern::of(PatternKind::Vector {
            items: vec![Pattern::wildcard(), Pattern::wildcard()],
            kind: VectorKind::Vector,
            offset: 0,
            rest: None,
        });
        let t = pattern_test(&p, &occ("v"));
        assert_eq!(t.to_string(), "(and (vector? :vector v) (= (count v) 2))");
    }

    #[test]
    fn test_vector_test_with_rest_requires_prefix_count() {
        let p = Pattern::of(PatternKind::Vector {
            items: vec![Pattern::wildcard()],
            kind: VectorKind::Vector,
            offset: 0,
            rest: Some(Box::new(Pattern::wildcard())),
        });
        let t = pattern_test(&p, &occ("v"));
        assert_eq!(t.to_string(), "(and (vector? :vector v) (>= (count v) 1))");
    }

    #[test]
    fn test_vector_test_bare_rest_is_kind_only() {
        let p = Pattern::of(PatternKind::Vector {
            items: vec![],
            kind: VectorKind::Vector,
            offset: 0,
            rest: Some(Box::new(Pattern::named_wildcard("r")))
        });
        let t = pattern_test(&p, &occ("v"));
        assert_eq!(t.to_string(), "(vector? :vector v)");
    }

    #[test]
    fn test_guard_test_applies_predicates_after_inner() {
        let p = Pattern::of(PatternKind::Guard {
            inner: Box::new(Pattern::named_wildcard("a")),
            preds: vec![Form::sym("even?")],
        });
        let t = pattern_test(&p, &occ("x"));
        // Wildcard inner contributes no test of its own.
        assert_eq!(t.to_string(), "(even? x)");
    }

    #[test]
    fn test_crash_test_compares_key_sets() {
        let p = Pattern::of(PatternKind::MapCrash {
            keys: vec![Form::kw("b"), Form::kw("a")],
        });
        let entry = Occurrence {
            name: Arc::from("m_c_1__"),
            kind: super::super::occurrence::OccurrenceKind::MapEntry {
                map: Arc::from("m"),
                key: Form::kw("c"),
            },
            lifted: None,
        };
        let t = pattern_test(&p, &entry);
        assert_eq!(t.to_string(), "(= (key-set m) [:a :b])");
    }

    #[test]
    fn test_leaf_lowering_skips_anonymous_bindings() {
        let node = DecisionNode::Leaf {
            action: Form::sym("b"),
            bindings: vec![
                Binding {
                    name: Arc::from("_"),
                    expr: HostExpr::Name(Arc::from("x")),
                },
                Binding {
                    name: Arc::from("b"),
                    expr: HostExpr::Name(Arc::from("y")),
                },
            ],
        };
        assert_eq!(lower(&node).to_string(), "(let [b y] b)");
    }

    #[test]
    fn test_lower_form_application() {
        let form = Form::List(vec![Form::sym("mod"), Form::sym("x"), Form::Int(3)]);
        assert_eq!(lower_form(&form).to_string(), "(mod x 3)");
    }

    #[test]
    fn test_lower_form_vector_builds_elementwise() {
        let form = Form::Vector(vec![Form::kw("a0"), Form::sym("b")]);
        assert_eq!(lower_form(&form).to_string(), "[:a0 b]");
    }
}
