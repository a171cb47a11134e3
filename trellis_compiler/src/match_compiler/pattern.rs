//! Pattern AST and constructor ordering.
//!
//! The pattern set is closed: every variant the compiler understands is a
//! case of [`PatternKind`], and the three per-variant operations of the
//! algorithm (test emission, specialization, comparison) are exhaustive
//! matches over it. `Rest` and `MapCrash` are internal variants introduced
//! during emission and specialization; they never come from user syntax
//! directly.

use std::sync::Arc;
use trellis_core::{Form, VectorKind};

/// Default name carried by anonymous wildcards.
pub const WILDCARD_NAME: &str = "_";

/// A pattern with its capture metadata.
///
/// `as_name` is the `:as` capture, bound to the occurrence the pattern is
/// matched against when its column is consumed.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    /// The pattern variant.
    pub kind: PatternKind,
    /// Optional `:as` capture name.
    pub as_name: Option<Arc<str>>,
}

/// The closed set of pattern variants.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternKind {
    /// Matches anything; a non-default name captures the occurrence.
    Wildcard {
        /// Bind name; `_` for anonymous wildcards.
        name: Arc<str>,
    },

    /// Equality match against a value.
    Literal {
        /// The literal form.
        value: Form,
        /// When true the form is a symbol naming a caller local and the
        /// test compares against its runtime value, not the quoted symbol.
        local: bool,
    },

    /// Matches a sequential head/tail structure.
    Seq {
        /// Ordered sub-patterns; never empty.
        items: Vec<Pattern>,
    },

    /// Internal marker: the remainder of the enclosing sequence.
    Rest {
        /// Pattern matched against the remainder.
        inner: Box<Pattern>,
    },

    /// Matches a lookup-capable value.
    Map {
        /// Key to sub-pattern entries, in surface order.
        entries: Vec<(Form, Pattern)>,
        /// Optional `:only` key set requiring exact keys.
        only: Option<Vec<Form>>,
    },

    /// Internal: asserts a map has exactly this key set.
    MapCrash {
        /// The required key set, sorted.
        keys: Vec<Form>,
    },

    /// Matches an indexable sequence.
    Vector {
        /// Element sub-patterns, excluding any rest remainder.
        items: Vec<Pattern>,
        /// The vector kind in effect when the pattern was emitted.
        kind: VectorKind,
        /// Index offset applied to element projections.
        offset: usize,
        /// Pattern for the remainder after `&`, when present.
        rest: Option<Box<Pattern>>,
    },

    /// Matches if any alternative matches.
    Or {
        /// The alternatives; never empty.
        alts: Vec<Pattern>,
    },

    /// Matches if the inner pattern matches and every predicate holds.
    Guard {
        /// The guarded pattern.
        inner: Box<Pattern>,
        /// Predicate forms, deduplicated; order-insensitive for equality.
        preds: Vec<Form>,
    },
}

impl Pattern {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// An anonymous wildcard.
    #[inline]
    pub fn wildcard() -> Self {
        Self::named_wildcard(WILDCARD_NAME)
    }

    /// A wildcard that captures under `name`.
    pub fn named_wildcard(name: &str) -> Self {
        Pattern {
            kind: PatternKind::Wildcard {
                name: Arc::from(name),
            },
            as_name: None,
        }
    }

    /// A quoted literal pattern.
    pub fn literal(value: Form) -> Self {
        Pattern {
            kind: PatternKind::Literal {
                value,
                local: false,
            },
            as_name: None,
        }
    }

    /// A literal pattern comparing against a caller local's value.
    pub fn local_literal(name: &Arc<str>) -> Self {
        Pattern {
            kind: PatternKind::Literal {
                value: Form::Symbol(name.clone()),
                local: true,
            },
            as_name: None,
        }
    }

    /// Wrap a kind into a pattern without capture metadata.
    #[inline]
    pub fn of(kind: PatternKind) -> Self {
        Pattern {
            kind,
            as_name: None,
        }
    }

    /// Attach an `:as` capture name.
    #[must_use]
    pub fn with_as(mut self, name: Arc<str>) -> Self {
        self.as_name = Some(name);
        self
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether this pattern is a wildcard (matches anything, no test).
    #[inline]
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, PatternKind::Wildcard { .. })
    }

    /// Whether this pattern is the internal map key-set assertion.
    #[inline]
    #[must_use]
    pub fn is_crash(&self) -> bool {
        matches!(self.kind, PatternKind::MapCrash { .. })
    }

    /// Whether this pattern is a pseudo-pattern that must be expanded
    /// before a column can be switched on.
    #[inline]
    #[must_use]
    pub fn is_pseudo(&self) -> bool {
        matches!(self.kind, PatternKind::Or { .. })
    }

    /// The capture name of a named wildcard, if any.
    pub fn wildcard_name(&self) -> Option<&Arc<str>> {
        match &self.kind {
            PatternKind::Wildcard { name } if &**name != WILDCARD_NAME => Some(name),
            _ => None,
        }
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// Result of comparing two patterns for constructor grouping.
///
/// `Incomparable` patterns behave as distinct constructors; sorting keeps
/// their insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternOrder {
    /// Left sorts before right.
    Lt,
    /// Same constructor.
    Eq,
    /// Left sorts after right.
    Gt,
    /// Distinct constructors with no defined order.
    Incomparable,
}

/// Total-order comparison used when grouping a column's constructors.
///
/// - Wildcard is greatest (any non-wildcard sorts before it).
/// - Literal sorts before any non-literal, non-wildcard.
/// - Two literals compare naturally, with symbols after non-symbols; a
///   local/quoted flag mismatch on the same symbol keeps them distinct.
/// - Two guards are equal iff their predicate sets are equal.
/// - Two or-patterns are equal iff element-wise equal.
/// - Two map crashes are equal iff their key sets are equal.
/// - Remaining same-variant pairs are equal; different variants are
///   incomparable.
pub fn pattern_compare(a: &Pattern, b: &Pattern) -> PatternOrder {
    use PatternKind::*;

    match (&a.kind, &b.kind) {
        (Wildcard { .. }, Wildcard { .. }) => PatternOrder::Eq,
        (_, Wildcard { .. }) => PatternOrder::Lt,
        (Wildcard { .. }, _) => PatternOrder::Gt,

        (
            Literal {
                value: va,
                local: la,
            },
            Literal {
                value: vb,
                local: lb,
            },
        ) => {
            if va == vb {
                if la == lb {
                    PatternOrder::Eq
                } else {
                    PatternOrder::Incomparable
                }
            } else {
                match va.total_cmp(vb) {
                    std::cmp::Ordering::Less => PatternOrder::Lt,
                    std::cmp::Ordering::Greater => PatternOrder::Gt,
                    std::cmp::Ordering::Equal => PatternOrder::Eq,
                }
            }
        }
        (Literal { .. }, _) => PatternOrder::Lt,
        (_, Literal { .. }) => PatternOrder::Gt,

        (Guard { preds: pa, .. }, Guard { preds: pb, .. }) => {
            if form_set_eq(pa, pb) {
                PatternOrder::Eq
            } else {
                PatternOrder::Incomparable
            }
        }

        (Or { alts: aa }, Or { alts: ab }) => {
            let eq = aa.len() == ab.len()
                && aa
                    .iter()
                    .zip(ab)
                    .all(|(x, y)| pattern_compare(x, y) == PatternOrder::Eq);
            if eq {
                PatternOrder::Eq
            } else {
                PatternOrder::Incomparable
            }
        }

        (MapCrash { keys: ka }, MapCrash { keys: kb }) => {
            if ka == kb {
                PatternOrder::Eq
            } else {
                PatternOrder::Incomparable
            }
        }

        (Seq { .. }, Seq { .. })
        | (Rest { .. }, Rest { .. })
        | (Map { .. }, Map { .. })
        | (Vector { .. }, Vector { .. }) => PatternOrder::Eq,

        _ => PatternOrder::Incomparable,
    }
}

/// Whether two patterns denote the same constructor.
#[inline]
#[must_use]
pub fn pattern_equals(a: &Pattern, b: &Pattern) -> bool {
    pattern_compare(a, b) == PatternOrder::Eq
}

/// Order-insensitive form collection equality (predicate sets).
pub(crate) fn form_set_eq(a: &[Form], b: &[Form]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(n: i64) -> Pattern {
        Pattern::literal(Form::Int(n))
    }

    #[test]
    fn test_wildcard_is_greatest() {
        assert_eq!(
            pattern_compare(&lit(1), &Pattern::wildcard()),
            PatternOrder::Lt
        );
        assert_eq!(
            pattern_compare(&Pattern::wildcard(), &lit(1)),
            PatternOrder::Gt
        );
        assert_eq!(
            pattern_compare(&Pattern::wildcard(), &Pattern::named_wildcard("x")),
            PatternOrder::Eq
        );
    }

    #[test]
    fn test_literal_sorts_before_constructors() {
        let seq = Pattern::of(PatternKind::Seq {
            items: vec![lit(1)],
        });
        assert_eq!(pattern_compare(&lit(1), &seq), PatternOrder::Lt);
        assert_eq!(pattern_compare(&seq, &lit(1)), PatternOrder::Gt);
    }

    #[test]
    fn test_literal_symbols_after_non_symbols() {
        let sym = Pattern::literal(Form::sym("zzz"));
        assert_eq!(pattern_compare(&lit(5), &sym), PatternOrder::Lt);
        assert_eq!(pattern_compare(&sym, &lit(5)), PatternOrder::Gt);
    }

    #[test]
    fn test_local_and_quoted_literals_stay_distinct() {
        let local = Pattern::local_literal(&Arc::from("x"));
        let quoted = Pattern::literal(Form::sym("x"));
        assert_eq!(pattern_compare(&local, &quoted), PatternOrder::Incomparable);
        assert_eq!(pattern_compare(&local, &local.clone()), PatternOrder::Eq);
    }

    #[test]
    fn test_guard_equality_is_pred_set_equality() {
        let g1 = Pattern::of(PatternKind::Guard {
            inner: Box::new(Pattern::wildcard()),
            preds: vec![Form::sym("even?")],
        });
        let g2 = Pattern::of(PatternKind::Guard {
            inner: Box::new(Pattern::named_wildcard("b")),
            preds: vec![Form::sym("even?")],
        });
        let g3 = Pattern::of(PatternKind::Guard {
            inner: Box::new(Pattern::wildcard()),
            preds: vec![Form::sym("odd?"), Form::sym("div3?")],
        });
        assert_eq!(pattern_compare(&g1, &g2), PatternOrder::Eq);
        assert_eq!(pattern_compare(&g1, &g3), PatternOrder::Incomparable);
    }

    #[test]
    fn test_same_variant_defaults_equal() {
        let v1 = Pattern::of(PatternKind::Vector {
            items: vec![lit(1)],
            kind: VectorKind::Vector,
            offset: 0,
            rest: None,
        });
        let v2 = Pattern::of(PatternKind::Vector {
            items: vec![lit(2), lit(3)],
            kind: VectorKind::Vector,
            offset: 0,
            rest: None,
        });
        assert_eq!(pattern_compare(&v1, &v2), PatternOrder::Eq);
    }

    #[test]
    fn test_crash_equality_by_key_set() {
        let c1 = Pattern::of(PatternKind::MapCrash {
            keys: vec![Form::kw("a"), Form::kw("b")],
        });
        let c2 = Pattern::of(PatternKind::MapCrash {
            keys: vec![Form::kw("a")],
        });
        assert_eq!(pattern_compare(&c1, &c1.clone()), PatternOrder::Eq);
        assert_eq!(pattern_compare(&c1, &c2), PatternOrder::Incomparable);
    }
}
