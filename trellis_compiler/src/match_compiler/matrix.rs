//! Pattern matrix and specialization.
//!
//! The pattern matrix is the working state of the compiler: rows are match
//! clauses, columns are occurrences. Specializing the matrix by a
//! constructor reduces it under the assumption that the constructor matched
//! column 0, per Maranget's algorithm. Each pattern variant contributes its
//! own specialization rule; wildcard specialization doubles as the default
//! matrix construction.
//!
//! Every operation is purely functional: specialization returns a fresh
//! matrix and never mutates its input.

use super::decision_tree::CompileCtx;
use super::occurrence::{Occurrence, OccurrenceKind, SeqPart};
use super::pattern::{pattern_equals, Pattern, PatternKind};
use smallvec::SmallVec;
use std::sync::Arc;
use trellis_core::{Form, HostExpr, PrimOp};

/// Row patterns are kept inline for the common narrow-matrix case.
pub type PatternVec = SmallVec<[Pattern; 4]>;

/// A name/expression pair introduced by a capture or an occurrence bind.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    /// The bound name.
    pub name: Arc<str>,
    /// The bound expression.
    pub expr: HostExpr,
}

impl Binding {
    /// Bind a name to an occurrence by reference.
    pub fn to_occurrence(name: Arc<str>, occ: &Occurrence) -> Self {
        Binding {
            name,
            expr: HostExpr::Name(occ.name.clone()),
        }
    }
}

/// A row in the pattern matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternRow {
    /// Remaining patterns to match, one per occurrence column.
    pub patterns: PatternVec,
    /// The clause action, carried opaquely.
    pub action: Form,
    /// Bindings collected while columns were consumed, in declaration order.
    pub bindings: Vec<Binding>,
}

impl PatternRow {
    /// Create a fresh row with no bindings.
    pub fn new(patterns: Vec<Pattern>, action: Form) -> Self {
        PatternRow {
            patterns: PatternVec::from_vec(patterns),
            action,
            bindings: Vec::new(),
        }
    }

    /// The row's first pattern.
    #[inline]
    pub fn head(&self) -> &Pattern {
        &self.patterns[0]
    }

    /// Whether every pattern in the row is a wildcard.
    pub fn all_wildcards(&self) -> bool {
        self.patterns.iter().all(Pattern::is_wildcard)
    }

    /// Drop pattern `n`, binding its `:as` capture and named-wildcard name
    /// (if any) to the occurrence being consumed.
    pub fn drop_nth_bind(&self, n: usize, occ: &Occurrence) -> PatternRow {
        let dropped = &self.patterns[n];
        let mut bindings = self.bindings.clone();
        if let Some(as_name) = &dropped.as_name {
            bindings.push(Binding::to_occurrence(as_name.clone(), occ));
        }
        if let Some(name) = dropped.wildcard_name() {
            bindings.push(Binding::to_occurrence(name.clone(), occ));
        }
        let patterns = self
            .patterns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != n)
            .map(|(_, p)| p.clone())
            .collect();
        PatternRow {
            patterns,
            action: self.action.clone(),
            bindings,
        }
    }
}

/// Pattern matrix: rows of patterns over a vector of occurrences.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternMatrix {
    /// The rows.
    pub rows: Vec<PatternRow>,
    /// One occurrence per column.
    pub occurrences: Vec<Occurrence>,
    /// Bindings the compiler must emit in front of the subtree built from
    /// this matrix (vector-kind coercion).
    pub pending_binds: Vec<Binding>,
}

impl PatternMatrix {
    /// Create a matrix from rows and occurrences.
    pub fn new(rows: Vec<PatternRow>, occurrences: Vec<Occurrence>) -> Self {
        PatternMatrix {
            rows,
            occurrences,
            pending_binds: Vec::new(),
        }
    }

    /// Check if the matrix has no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.occurrences.len()
    }

    /// The vertical slice of pattern `i` across all rows.
    pub fn column(&self, i: usize) -> impl Iterator<Item = &Pattern> {
        self.rows.iter().map(move |row| &row.patterns[i])
    }

    /// Swap columns `i` and `j` in every row and in the occurrence vector.
    #[must_use]
    pub fn swap_columns(&self, i: usize, j: usize) -> PatternMatrix {
        let mut swapped = self.clone();
        for row in &mut swapped.rows {
            row.patterns.swap(i, j);
        }
        swapped.occurrences.swap(i, j);
        swapped
    }

    /// Return a copy with lifted-expression markers cleared, after a `Bind`
    /// node has introduced those occurrences by name.
    #[must_use]
    pub fn clear_lifted(&self) -> PatternMatrix {
        let mut cleared = self.clone();
        for occ in &mut cleared.occurrences {
            occ.lifted = None;
        }
        cleared
    }

    // =========================================================================
    // Specialization
    // =========================================================================

    /// Specialize the matrix by `p` at column 0.
    ///
    /// Dispatches to the per-variant rule; `p` is the representative
    /// constructor chosen from the column (or a wildcard for the default
    /// matrix).
    pub fn specialize(&self, p: &Pattern, ctx: &mut CompileCtx) -> PatternMatrix {
        match &p.kind {
            PatternKind::Seq { .. } => self.specialize_seq(ctx),
            PatternKind::Map { .. } => self.specialize_map(ctx),
            PatternKind::MapCrash { .. } => self.specialize_crash(p),
            PatternKind::Vector { .. } => self.specialize_vector(p, ctx),
            PatternKind::Or { .. } => self.specialize_or(p),
            PatternKind::Guard { .. } => self.specialize_guard(p),
            // Wildcard, literals, and internal markers consume the column
            // without expansion.
            _ => self.specialize_default(p),
        }
    }

    /// Rows whose head would flow into a specialization by `p`: heads equal
    /// to `p`, plus wildcard heads (which match any constructor).
    fn retains(head: &Pattern, p: &Pattern) -> bool {
        if p.is_wildcard() {
            head.is_wildcard()
        } else {
            head.is_wildcard() || pattern_equals(head, p)
        }
    }

    /// Default rule: retain matching rows and drop column 0 with bindings.
    ///
    /// With a wildcard `p` this builds the default matrix (wildcard rows
    /// only); with a literal it filters to that literal plus wildcards.
    fn specialize_default(&self, p: &Pattern) -> PatternMatrix {
        let occ0 = &self.occurrences[0];
        let rows = self
            .rows
            .iter()
            .filter(|row| Self::retains(row.head(), p))
            .map(|row| row.drop_nth_bind(0, occ0))
            .collect();
        PatternMatrix::new(rows, self.occurrences[1..].to_vec())
    }

    /// Seq rule: split column 0 into head and tail columns.
    fn specialize_seq(&self, ctx: &mut CompileCtx) -> PatternMatrix {
        let occ0 = self.occurrences[0].clone();
        let root = match &occ0.kind {
            OccurrenceKind::Seq { root, .. } => root.clone(),
            _ => occ0.name.clone(),
        };
        let head_occ = Occurrence {
            name: ctx.gensym(&format!("{root}_head")),
            kind: OccurrenceKind::Seq {
                root: root.clone(),
                parent: occ0.name.clone(),
                part: SeqPart::First,
            },
            lifted: None,
        };
        let tail_occ = Occurrence {
            name: ctx.gensym(&format!("{root}_tail")),
            kind: OccurrenceKind::Seq {
                root,
                parent: occ0.name.clone(),
                part: SeqPart::Rest,
            },
            lifted: None,
        };

        let seq_rep = Pattern::of(PatternKind::Seq {
            items: vec![Pattern::wildcard()],
        });
        let mut rows = Vec::new();
        for row in &self.rows {
            if !Self::retains(row.head(), &seq_rep) {
                continue;
            }
            let (head, tail) = split_seq(row.head());
            let dropped = row.drop_nth_bind(0, &occ0);
            let mut patterns = PatternVec::new();
            patterns.push(head);
            patterns.push(tail);
            patterns.extend(dropped.patterns);
            rows.push(PatternRow {
                patterns,
                action: dropped.action,
                bindings: dropped.bindings,
            });
        }

        let mut occurrences = vec![head_occ, tail_occ];
        occurrences.extend_from_slice(&self.occurrences[1..]);
        PatternMatrix::new(rows, occurrences)
    }

    /// Map rule: expand column 0 into one column per mentioned key.
    fn specialize_map(&self, ctx: &mut CompileCtx) -> PatternMatrix {
        let occ0 = self.occurrences[0].clone();
        let map_rep = Pattern::of(PatternKind::Map {
            entries: Vec::new(),
            only: None,
        });

        // Every key mentioned across retained rows, sorted.
        let mut all_keys: Vec<Form> = Vec::new();
        for row in &self.rows {
            if !Self::retains(row.head(), &map_rep) {
                continue;
            }
            if let PatternKind::Map { entries, only } = &row.head().kind {
                for (k, _) in entries {
                    all_keys.push(k.clone());
                }
                if let Some(only) = only {
                    all_keys.extend(only.iter().cloned());
                }
            }
        }
        all_keys.sort_by(|a, b| a.total_cmp(b));
        all_keys.dedup();

        let key_occs: Vec<Occurrence> = all_keys
            .iter()
            .map(|k| Occurrence {
                name: ctx.gensym(&format!("{}_{}", occ0.name, key_slug(k))),
                kind: OccurrenceKind::MapEntry {
                    map: occ0.name.clone(),
                    key: k.clone(),
                },
                lifted: None,
            })
            .collect();

        let mut rows = Vec::new();
        for row in &self.rows {
            if !Self::retains(row.head(), &map_rep) {
                continue;
            }
            let subs: Vec<Pattern> = match &row.head().kind {
                PatternKind::Map { entries, only } => all_keys
                    .iter()
                    .map(|k| {
                        if let Some((_, sub)) = entries.iter().find(|(ek, _)| ek == k) {
                            sub.clone()
                        } else {
                            match only {
                                None => Pattern::wildcard(),
                                Some(os) if os.contains(k) => Pattern::wildcard(),
                                Some(os) => {
                                    let mut keys = os.clone();
                                    keys.sort_by(|a, b| a.total_cmp(b));
                                    keys.dedup();
                                    Pattern::of(PatternKind::MapCrash { keys })
                                }
                            }
                        }
                    })
                    .collect(),
                _ => all_keys.iter().map(|_| Pattern::wildcard()).collect(),
            };
            let dropped = row.drop_nth_bind(0, &occ0);
            let mut patterns = PatternVec::from_vec(subs);
            patterns.extend(dropped.patterns);
            rows.push(PatternRow {
                patterns,
                action: dropped.action,
                bindings: dropped.bindings,
            });
        }

        let mut occurrences = key_occs;
        occurrences.extend_from_slice(&self.occurrences[1..]);
        PatternMatrix::new(rows, occurrences)
    }

    /// MapCrash rule: the key-set assertion either fails the whole column
    /// (empty result) or resolves directly to the first retained row.
    fn specialize_crash(&self, p: &Pattern) -> PatternMatrix {
        let occ0 = &self.occurrences[0];
        let first = self
            .rows
            .iter()
            .find(|row| Self::retains(row.head(), p))
            .map(|row| row.drop_nth_bind(0, occ0));
        match first {
            None => PatternMatrix::new(Vec::new(), Vec::new()),
            Some(row) => {
                let resolved = PatternRow {
                    patterns: PatternVec::new(),
                    action: row.action,
                    bindings: row.bindings,
                };
                PatternMatrix::new(vec![resolved], Vec::new())
            }
        }
    }

    /// Vector rule: split column 0 into element columns, plus a slice
    /// column when any retained row uses a rest pattern.
    fn specialize_vector(&self, p: &Pattern, ctx: &mut CompileCtx) -> PatternMatrix {
        let occ0 = self.occurrences[0].clone();
        let (p_kind, p_offset) = match &p.kind {
            PatternKind::Vector { kind, offset, .. } => (kind.clone(), *offset),
            _ => (ctx.vector_kind.clone(), 0),
        };

        // Fold (has_rest, min_size) over the retained vector rows.
        let mut has_rest = false;
        let mut min_size: Option<usize> = None;
        for row in &self.rows {
            if let PatternKind::Vector { items, rest, .. } = &row.head().kind {
                has_rest |= rest.is_some();
                let size = items.len();
                min_size = Some(min_size.map_or(size, |m| m.min(size)));
            }
        }
        let min_size = min_size.unwrap_or(0);

        let elem_occs: Vec<Occurrence> = (0..min_size)
            .map(|i| Occurrence {
                name: ctx.gensym(&format!("{}_{}", occ0.name, p_offset + i)),
                kind: OccurrenceKind::Element {
                    source: occ0.name.clone(),
                    index: p_offset + i,
                },
                lifted: None,
            })
            .collect();
        let slice_occ = has_rest.then(|| Occurrence {
            name: ctx.gensym(&format!("{}_rest", occ0.name)),
            kind: OccurrenceKind::Slice {
                source: occ0.name.clone(),
                start: p_offset + min_size,
            },
            lifted: None,
        });

        let mut rows = Vec::new();
        for row in &self.rows {
            if !Self::retains(row.head(), p) {
                continue;
            }
            let mut subs: Vec<Pattern> = Vec::with_capacity(min_size + 1);
            match &row.head().kind {
                PatternKind::Vector {
                    items, rest, kind, ..
                } => {
                    subs.extend(items[..min_size].iter().cloned());
                    if has_rest {
                        let rem: Vec<Pattern> = items[min_size..].to_vec();
                        let remainder = if rem.is_empty() {
                            match rest {
                                Some(r) => (**r).clone(),
                                None => Pattern::of(PatternKind::Vector {
                                    items: Vec::new(),
                                    kind: kind.clone(),
                                    offset: 0,
                                    rest: None,
                                }),
                            }
                        } else {
                            Pattern::of(PatternKind::Vector {
                                items: rem,
                                kind: kind.clone(),
                                offset: 0,
                                rest: rest.clone(),
                            })
                        };
                        subs.push(remainder);
                    }
                }
                _ => {
                    subs.extend((0..min_size).map(|_| Pattern::wildcard()));
                    if has_rest {
                        subs.push(Pattern::wildcard());
                    }
                }
            }
            let dropped = row.drop_nth_bind(0, &occ0);
            let mut patterns = PatternVec::from_vec(subs);
            patterns.extend(dropped.patterns);
            rows.push(PatternRow {
                patterns,
                action: dropped.action,
                bindings: dropped.bindings,
            });
        }

        let mut occurrences = elem_occs;
        occurrences.extend(slice_occ);
        occurrences.extend_from_slice(&self.occurrences[1..]);

        let mut matrix = PatternMatrix::new(rows, occurrences);
        if p_kind.needs_coercion() {
            matrix.pending_binds.push(Binding {
                name: occ0.name.clone(),
                expr: HostExpr::prim(
                    PrimOp::CoerceVector(p_kind),
                    vec![HostExpr::Name(occ0.name.clone())],
                ),
            });
        }
        matrix
    }

    /// Or rule: expand each row matching the or-pattern into one row per
    /// alternative. Wildcard rows pass through unchanged.
    pub fn specialize_or(&self, p: &Pattern) -> PatternMatrix {
        let mut rows = Vec::new();
        for row in &self.rows {
            let head = row.head();
            if !head.is_wildcard() && pattern_equals(head, p) {
                if let PatternKind::Or { alts } = &head.kind {
                    for alt in alts {
                        let mut alt = alt.clone();
                        if alt.as_name.is_none() {
                            alt.as_name = head.as_name.clone();
                        }
                        let mut expanded = row.clone();
                        expanded.patterns[0] = alt;
                        rows.push(expanded);
                    }
                    continue;
                }
            }
            rows.push(row.clone());
        }
        PatternMatrix::new(rows, self.occurrences.clone())
    }

    /// Guard rule: strip the guard from matching rows, leaving the inner
    /// pattern in the same slot. Width and occurrences are unchanged.
    fn specialize_guard(&self, p: &Pattern) -> PatternMatrix {
        let mut rows = Vec::new();
        for row in &self.rows {
            let head = row.head();
            if !Self::retains(head, p) {
                continue;
            }
            if let PatternKind::Guard { inner, .. } = &head.kind {
                let mut inner = (**inner).clone();
                if inner.as_name.is_none() {
                    inner.as_name = head.as_name.clone();
                }
                let mut stripped = row.clone();
                stripped.patterns[0] = inner;
                rows.push(stripped);
            } else {
                rows.push(row.clone());
            }
        }
        PatternMatrix::new(rows, self.occurrences.clone())
    }
}

/// Split a seq-column pattern into head and tail patterns.
fn split_seq(p: &Pattern) -> (Pattern, Pattern) {
    match &p.kind {
        PatternKind::Seq { items } => {
            let head = items[0].clone();
            let tail = if items.len() == 1 {
                Pattern::literal(Form::List(Vec::new()))
            } else if let PatternKind::Rest { inner } = &items[1].kind {
                (**inner).clone()
            } else {
                Pattern::of(PatternKind::Seq {
                    items: items[1..].to_vec(),
                })
            };
            (head, tail)
        }
        _ => (Pattern::wildcard(), Pattern::wildcard()),
    }
}

/// A readable fragment for fresh map-entry occurrence names.
fn key_slug(key: &Form) -> String {
    match key {
        Form::Keyword(k) | Form::Symbol(k) | Form::Str(k) => k.replace(['.', '/'], "_"),
        Form::Int(n) => n.to_string(),
        _ => "key".to_string(),
    }
}
