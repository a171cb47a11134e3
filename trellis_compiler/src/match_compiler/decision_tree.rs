//! Decision DAG generation using Maranget's algorithm.
//!
//! The compiler recursively reduces the pattern matrix: pick the most
//! useful column, enumerate its constructors, specialize per constructor,
//! and emit a `Switch` whose default covers the wildcard rows. Base cases
//! produce `Leaf` and `Fail` nodes; `Bind` nodes introduce lifted
//! occurrence expressions and vector coercions.
//!
//! All compile-local state lives in [`CompileCtx`]; nothing persists across
//! invocations, so compiling the same input twice yields structurally equal
//! DAGs.

use super::codegen::lower_form;
use super::matrix::{Binding, PatternMatrix};
use super::occurrence::Occurrence;
use super::pattern::{pattern_compare, pattern_equals, Pattern, PatternOrder};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::trace;
use trellis_core::{Form, HostExpr, MatchWarning, VectorKind};

// =============================================================================
// Compile Context
// =============================================================================

/// Per-invocation compiler state.
///
/// Replaces what would otherwise be process globals: the vector kind in
/// effect, the caller's local names, the once-only inexhaustiveness flag,
/// and the fresh-name counter.
#[derive(Clone, Debug)]
pub struct CompileCtx {
    /// Vector kind applied to vector patterns emitted during this compile.
    pub vector_kind: VectorKind,
    /// Caller locals; symbols naming one compile as by-value literals.
    pub locals: FxHashSet<Arc<str>>,
    /// Warnings accumulated during the compile.
    pub warnings: Vec<MatchWarning>,
    warned: bool,
    counter: u64,
}

impl CompileCtx {
    /// A fresh context with the default vector kind and no locals.
    pub fn new() -> Self {
        CompileCtx {
            vector_kind: VectorKind::Vector,
            locals: FxHashSet::default(),
            warnings: Vec::new(),
            warned: false,
            counter: 0,
        }
    }

    /// A fresh context compiling under the given vector kind.
    pub fn with_vector_kind(kind: VectorKind) -> Self {
        CompileCtx {
            vector_kind: kind,
            ..Self::new()
        }
    }

    /// Mint a fresh occurrence name.
    pub fn gensym(&mut self, prefix: &str) -> Arc<str> {
        self.counter += 1;
        Arc::from(format!("{prefix}_{}__", self.counter))
    }

    /// Whether a symbol names a caller local.
    #[must_use]
    pub fn is_local(&self, name: &str) -> bool {
        self.locals.contains(name)
    }

    /// Record the inexhaustiveness warning, at most once per compile.
    pub(crate) fn warn_inexhaustive(&mut self) {
        if !self.warned {
            self.warned = true;
            tracing::warn!("non-exhaustive pattern match: consider adding an :else clause");
            self.warnings.push(MatchWarning::InexhaustiveMatch);
        }
    }
}

impl Default for CompileCtx {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Decision DAG
// =============================================================================

/// A node in the decision DAG.
#[derive(Clone, Debug, PartialEq)]
pub enum DecisionNode {
    /// Match succeeded: evaluate the action under the bindings.
    Leaf {
        /// The clause action.
        action: Form,
        /// Bindings in scope for the action.
        bindings: Vec<Binding>,
    },

    /// No clause matched; raise the runtime failure.
    Fail,

    /// Introduce bindings, then evaluate the inner node.
    Bind {
        /// Name/expression pairs, bound in order.
        bindings: Vec<Binding>,
        /// The wrapped node.
        node: Box<DecisionNode>,
    },

    /// Test an occurrence against each case pattern in order, falling
    /// through to the default.
    Switch {
        /// The occurrence under test.
        occurrence: Occurrence,
        /// Constructor cases, in constructor order.
        cases: Vec<SwitchCase>,
        /// Taken when no case test succeeds.
        default: Box<DecisionNode>,
    },
}

/// A case in a switch node.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    /// The constructor pattern; its test guards the child.
    pub pattern: Pattern,
    /// Subtree compiled from the specialized matrix.
    pub node: DecisionNode,
}

impl DecisionNode {
    /// Count total nodes in the DAG.
    pub fn node_count(&self) -> usize {
        match self {
            DecisionNode::Leaf { .. } | DecisionNode::Fail => 1,
            DecisionNode::Bind { node, .. } => 1 + node.node_count(),
            DecisionNode::Switch { cases, default, .. } => {
                1 + cases.iter().map(|c| c.node.node_count()).sum::<usize>()
                    + default.node_count()
            }
        }
    }

    /// Maximum depth of the DAG.
    pub fn max_depth(&self) -> usize {
        match self {
            DecisionNode::Leaf { .. } | DecisionNode::Fail => 1,
            DecisionNode::Bind { node, .. } => 1 + node.max_depth(),
            DecisionNode::Switch { cases, default, .. } => {
                let case_max = cases.iter().map(|c| c.node.max_depth()).max().unwrap_or(0);
                1 + case_max.max(default.max_depth())
            }
        }
    }
}

// =============================================================================
// Maranget's Algorithm
// =============================================================================

/// Compile a pattern matrix into a decision DAG.
pub fn compile(matrix: &PatternMatrix, ctx: &mut CompileCtx) -> DecisionNode {
    // Base case 1: no rows, no possible match.
    if matrix.is_empty() {
        ctx.warn_inexhaustive();
        return DecisionNode::Fail;
    }

    let first = &matrix.rows[0];

    // Base case 2: a width-zero row matched outright.
    if first.patterns.is_empty() {
        return DecisionNode::Leaf {
            action: first.action.clone(),
            bindings: first.bindings.clone(),
        };
    }

    // Base case 3: the first row is all wildcards; bind the named ones to
    // their occurrences and stop testing.
    if first.all_wildcards() {
        let mut bindings = first.bindings.clone();
        for (p, occ) in first.patterns.iter().zip(&matrix.occurrences) {
            if let Some(as_name) = &p.as_name {
                bindings.push(Binding {
                    name: as_name.clone(),
                    expr: leaf_bind_expr(occ),
                });
            }
            if let Some(name) = p.wildcard_name() {
                bindings.push(Binding {
                    name: name.clone(),
                    expr: leaf_bind_expr(occ),
                });
            }
        }
        return DecisionNode::Leaf {
            action: first.action.clone(),
            bindings,
        };
    }

    // Choose the column to switch on; bring it to the front if needed.
    let col = choose_column(matrix);
    if col != 0 {
        trace!(column = col, "swapping chosen column into position 0");
        return compile(&matrix.swap_columns(0, col), ctx);
    }

    // Lifted occurrence expressions are bound exactly once, in front of the
    // first switch built while they are still in the occurrence vector.
    let lifted: Vec<Binding> = matrix
        .occurrences
        .iter()
        .filter_map(|occ| {
            occ.lifted.as_ref().map(|form| Binding {
                name: occ.name.clone(),
                expr: lower_form(form),
            })
        })
        .collect();
    if !lifted.is_empty() {
        let inner = compile(&matrix.clear_lifted(), ctx);
        return DecisionNode::Bind {
            bindings: lifted,
            node: Box::new(inner),
        };
    }

    // Normalize pseudo-patterns: expand or-patterns in column 0 until none
    // remain.
    if let Some(or) = matrix.column(0).find(|p| p.is_pseudo()).cloned() {
        trace!("expanding or-pattern alternatives in column 0");
        return compile(&matrix.specialize_or(&or), ctx);
    }

    let occ0 = matrix.occurrences[0].clone();
    let constructors = column_constructors(matrix);
    trace!(
        occurrence = %occ0.name,
        constructors = constructors.len(),
        "switching on column 0"
    );

    let mut cases = Vec::with_capacity(constructors.len());
    for ctor in &constructors {
        let specialized = matrix.specialize(ctor, ctx);
        let pending = specialized.pending_binds.clone();
        let child = compile(&specialized, ctx);
        let child = if pending.is_empty() {
            child
        } else {
            DecisionNode::Bind {
                bindings: pending,
                node: Box::new(child),
            }
        };
        cases.push(SwitchCase {
            pattern: ctor.clone(),
            node: child,
        });
    }

    let default_matrix = matrix.specialize(&Pattern::wildcard(), ctx);
    let default = compile(&default_matrix, ctx);

    DecisionNode::Switch {
        occurrence: occ0,
        cases,
        default: Box::new(default),
    }
}

/// Score every column and pick the best; ties break to the lowest index.
fn choose_column(matrix: &PatternMatrix) -> usize {
    let mut best_col = 0;
    // Sentinel below any real score, so even an all-crash column is chosen.
    let mut best_score = -2i32;
    for col in 0..matrix.width() {
        let score = column_score(matrix, col);
        if score > best_score {
            best_score = score;
            best_col = col;
        }
    }
    best_col
}

/// Usefulness score of one column.
///
/// A constructor entry is useful when no row above it in the column holds a
/// wildcard; the score is the useful-entry count, demoted to −1 when the
/// column contains a key-set crash.
fn column_score(matrix: &PatternMatrix, col: usize) -> i32 {
    let mut score = 0;
    let mut above_all_constructors = true;
    for p in matrix.column(col) {
        if p.is_crash() {
            return -1;
        }
        if p.is_wildcard() {
            above_all_constructors = false;
        } else if above_all_constructors {
            score += 1;
        }
    }
    score
}

/// The column's constructor set: non-wildcards, deduplicated by pattern
/// equality and sorted by the total order (insertion order on ties).
fn column_constructors(matrix: &PatternMatrix) -> Vec<Pattern> {
    let mut ctors: Vec<Pattern> = Vec::new();
    for p in matrix.column(0) {
        if p.is_wildcard() {
            continue;
        }
        if !ctors.iter().any(|c| pattern_equals(c, p)) {
            ctors.push(p.clone());
        }
    }
    ctors.sort_by(|a, b| match pattern_compare(a, b) {
        PatternOrder::Lt => Ordering::Less,
        PatternOrder::Gt => Ordering::Greater,
        PatternOrder::Eq | PatternOrder::Incomparable => Ordering::Equal,
    });
    ctors
}

/// The expression a leaf binds a named wildcard's occurrence to.
///
/// Lifted occurrences embed their original expression; projected
/// occurrences embed their projection; plain occurrences are referenced by
/// name.
fn leaf_bind_expr(occ: &Occurrence) -> HostExpr {
    if let Some(form) = &occ.lifted {
        return lower_form(form);
    }
    occ.bind_expr()
        .unwrap_or_else(|| HostExpr::Name(occ.name.clone()))
}
