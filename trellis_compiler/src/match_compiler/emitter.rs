//! Surface-clause front end.
//!
//! Validates the occurrence vector and clause rows, lifts non-symbol
//! occurrences to fresh names, translates pattern expressions into the
//! pattern AST by structural dispatch, and assembles the initial pattern
//! matrix for the Maranget core.
//!
//! # Pattern surface
//!
//! - literals, `'sym` quoted symbols
//! - symbols: binding names, or by-value literals when they name a local
//! - `[p ...]` vectors, with `& p` marking a rest remainder
//! - `{k p ...}` maps
//! - wrapper lists: `(p | q | ...)`, `(p :as name)`, `(p :when preds)`,
//!   `(xs :seq)`, `(xs <vector-kind> offset? n?)`, `(p :only keys)`

use super::codegen::lower;
use super::decision_tree::{compile, CompileCtx, DecisionNode};
use super::matrix::{PatternMatrix, PatternRow};
use super::occurrence::Occurrence;
use super::pattern::{Pattern, PatternKind};
use crate::CompileResult;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use trellis_core::{Form, HostExpr, MatchWarning, TrellisError, VectorKind};

/// Tag listing cited by the unknown-tag error.
const VALID_TAGS: &str =
    "|, :as, :when, :seq, :only, :vector, :ints, :longs, :floats, :doubles, :booleans, :objects";

/// Typed array kinds accepted as vector-kind wrapper tags.
const ARRAY_TAGS: &[&str] = &["ints", "longs", "floats", "doubles", "booleans", "objects"];

// =============================================================================
// Public Entry Points
// =============================================================================

/// Configured match compiler entry point.
///
/// Carries the caller's local names (symbols that compile as by-value
/// literals instead of binding wildcards) and the vector kind in effect.
#[derive(Clone, Debug, Default)]
pub struct MatchCompiler {
    vector_kind: Option<VectorKind>,
    locals: FxHashSet<Arc<str>>,
}

/// The output of one compile invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledMatch {
    /// The decision DAG, for inspection.
    pub tree: DecisionNode,
    /// The lowered host expression.
    pub expr: HostExpr,
    /// Warnings gathered during the compile.
    pub warnings: Vec<MatchWarning>,
}

impl MatchCompiler {
    /// A compiler with the default vector kind and no locals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile vector patterns under the given kind (the `matchv` framing).
    #[must_use]
    pub fn vector_kind(mut self, kind: VectorKind) -> Self {
        self.vector_kind = Some(kind);
        self
    }

    /// Declare caller locals.
    #[must_use]
    pub fn locals<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.locals.extend(names.into_iter().map(Arc::from));
        self
    }

    /// Compile an occurrence vector and alternating pattern-row/action
    /// clauses into a decision tree and its lowered expression.
    pub fn compile(&self, occurrences: &Form, clauses: &[Form]) -> CompileResult<CompiledMatch> {
        let occ_forms = occurrences
            .as_vector()
            .ok_or_else(|| TrellisError::OccurrencesNotVector {
                found: occurrences.to_string(),
            })?;
        if clauses.len() % 2 != 0 {
            return Err(TrellisError::OddClauseCount {
                count: clauses.len(),
            });
        }

        let mut ctx = CompileCtx::with_vector_kind(
            self.vector_kind.clone().unwrap_or(VectorKind::Vector),
        );
        ctx.locals = self.locals.clone();

        // Lift non-symbol occurrences to fresh names; a Bind node later
        // introduces each original expression exactly once.
        let occs: Vec<Occurrence> = occ_forms
            .iter()
            .map(|form| match form {
                Form::Symbol(name) => Occurrence::plain(name.clone()),
                other => {
                    let name = ctx.gensym("ocr");
                    Occurrence::lifted(name, other.clone())
                }
            })
            .collect();

        let arity = occs.len();
        let row_count = clauses.len() / 2;
        let mut rows = Vec::with_capacity(row_count);
        for (i, pair) in clauses.chunks_exact(2).enumerate() {
            let row_num = i + 1;
            let (row_form, action) = (&pair[0], &pair[1]);
            let patterns: Vec<Pattern> = if row_form.is_else() {
                if row_num != row_count {
                    return Err(TrellisError::MisplacedElse { row: row_num });
                }
                (0..arity).map(|_| Pattern::wildcard()).collect()
            } else {
                let items = row_form
                    .as_vector()
                    .ok_or_else(|| TrellisError::RowNotVector {
                        row: row_num,
                        found: row_form.to_string(),
                    })?;
                if items.len() != arity {
                    return Err(TrellisError::RowArityMismatch {
                        row: row_num,
                        pattern: row_form.to_string(),
                        found: items.len(),
                        expected: arity,
                    });
                }
                items
                    .iter()
                    .map(|p| emit_pattern(p, &mut ctx))
                    .collect::<CompileResult<_>>()?
            };
            rows.push(PatternRow::new(patterns, action.clone()));
        }

        let matrix = PatternMatrix::new(rows, occs);
        let tree = compile(&matrix, &mut ctx);
        let expr = lower(&tree);
        Ok(CompiledMatch {
            tree,
            expr,
            warnings: ctx.warnings,
        })
    }

    /// Compile a single-occurrence match: the occurrence and each non-`:else`
    /// row pattern are wrapped in singleton vectors.
    pub fn compile_one(&self, occurrence: &Form, clauses: &[Form]) -> CompileResult<CompiledMatch> {
        let occurrences = Form::Vector(vec![occurrence.clone()]);
        let framed: Vec<Form> = clauses
            .chunks(2)
            .flat_map(|pair| {
                let mut framed_pair = Vec::with_capacity(2);
                match pair.first() {
                    Some(row) if row.is_else() => framed_pair.push(row.clone()),
                    Some(row) => framed_pair.push(Form::Vector(vec![row.clone()])),
                    None => {}
                }
                framed_pair.extend(pair.get(1).cloned());
                framed_pair
            })
            .collect();
        self.compile(&occurrences, &framed)
    }
}

/// Compile with the default configuration; see [`MatchCompiler::compile`].
pub fn compile_match(occurrences: &Form, clauses: &[Form]) -> CompileResult<HostExpr> {
    MatchCompiler::new()
        .compile(occurrences, clauses)
        .map(|compiled| compiled.expr)
}

/// Compile a single-value match; see [`MatchCompiler::compile_one`].
pub fn compile_match_one(occurrence: &Form, clauses: &[Form]) -> CompileResult<HostExpr> {
    MatchCompiler::new()
        .compile_one(occurrence, clauses)
        .map(|compiled| compiled.expr)
}

/// Compile under a vector kind; see [`MatchCompiler::vector_kind`].
pub fn compile_matchv(
    kind: VectorKind,
    occurrences: &Form,
    clauses: &[Form],
) -> CompileResult<HostExpr> {
    MatchCompiler::new()
        .vector_kind(kind)
        .compile(occurrences, clauses)
        .map(|compiled| compiled.expr)
}

// =============================================================================
// Pattern Emission
// =============================================================================

/// Translate one pattern expression by structural dispatch.
pub fn emit_pattern(form: &Form, ctx: &mut CompileCtx) -> CompileResult<Pattern> {
    match form {
        Form::Vector(items) => emit_vector(items, ctx.vector_kind.clone(), 0, ctx),

        Form::Map(pairs) => {
            let entries = pairs
                .iter()
                .map(|(k, v)| Ok((k.clone(), emit_pattern(v, ctx)?)))
                .collect::<CompileResult<Vec<_>>>()?;
            Ok(Pattern::of(PatternKind::Map {
                entries,
                only: None,
            }))
        }

        Form::Symbol(name) => {
            if &**name == "_" {
                Ok(Pattern::wildcard())
            } else if ctx.is_local(name) {
                Ok(Pattern::local_literal(name))
            } else {
                Ok(Pattern::named_wildcard(name))
            }
        }

        Form::List(items) => {
            if let Some(sym) = form.as_quoted() {
                return Ok(Pattern::literal(Form::Symbol(sym.clone())));
            }
            if items.len() >= 2 {
                return emit_wrapper(items, form, ctx);
            }
            Ok(Pattern::literal(form.clone()))
        }

        _ => Ok(Pattern::literal(form.clone())),
    }
}

/// Dispatch a wrapper list on its second element.
fn emit_wrapper(items: &[Form], whole: &Form, ctx: &mut CompileCtx) -> CompileResult<Pattern> {
    let tag = &items[1];

    if tag.is_rest_marker() {
        return Err(invalid(whole, "`&` is only meaningful inside a sequence"));
    }
    if matches!(tag, Form::Symbol(s) if &**s == "|") {
        return emit_or(items, whole, ctx);
    }

    let Some(keyword) = tag.as_keyword() else {
        return Err(TrellisError::UnknownPatternTag {
            tag: tag.to_string(),
            valid: VALID_TAGS.to_string(),
        });
    };

    match &**keyword {
        "as" => {
            if items.len() != 3 {
                return Err(invalid(whole, ":as takes exactly one name"));
            }
            let name = items[2]
                .as_symbol()
                .ok_or_else(|| invalid(whole, ":as name must be a symbol"))?;
            let inner = emit_pattern(&items[0], ctx)?;
            // An anonymous wildcard captured via :as is just a named wildcard.
            if inner.is_wildcard() && inner.wildcard_name().is_none() {
                Ok(Pattern::named_wildcard(name))
            } else {
                Ok(inner.with_as(name.clone()))
            }
        }

        "when" => {
            if items.len() != 3 {
                return Err(invalid(whole, ":when takes exactly one predicate form"));
            }
            let mut preds: Vec<Form> = match &items[2] {
                Form::Vector(ps) => ps.clone(),
                single => vec![single.clone()],
            };
            // Predicate sets are order-insensitive and duplicate-free.
            let mut deduped = Vec::with_capacity(preds.len());
            for p in preds.drain(..) {
                if !deduped.contains(&p) {
                    deduped.push(p);
                }
            }
            Ok(Pattern::of(PatternKind::Guard {
                inner: Box::new(emit_pattern(&items[0], ctx)?),
                preds: deduped,
            }))
        }

        "seq" => {
            if items.len() != 2 {
                return Err(invalid(whole, ":seq takes no further arguments"));
            }
            let elements = match &items[0] {
                Form::Vector(es) | Form::List(es) => es.as_slice(),
                _ => return Err(invalid(whole, ":seq requires a collection of patterns")),
            };
            emit_seq(elements, whole, ctx)
        }

        "only" => {
            if items.len() != 3 {
                return Err(invalid(whole, ":only takes exactly one key vector"));
            }
            let keys = items[2]
                .as_vector()
                .ok_or_else(|| invalid(whole, ":only keys must be a vector"))?;
            let inner = emit_pattern(&items[0], ctx)?;
            match inner.kind {
                PatternKind::Map { entries, .. } => Ok(Pattern {
                    kind: PatternKind::Map {
                        entries,
                        only: Some(keys.to_vec()),
                    },
                    as_name: inner.as_name,
                }),
                _ => Err(invalid(whole, ":only applies to map patterns")),
            }
        }

        "vector" => emit_vector_wrapper(items, whole, VectorKind::Vector, ctx),

        tag if ARRAY_TAGS.contains(&tag) => {
            let kind = VectorKind::Array(Arc::from(tag));
            emit_vector_wrapper(items, whole, kind, ctx)
        }

        _ => Err(TrellisError::UnknownPatternTag {
            tag: tag.to_string(),
            valid: VALID_TAGS.to_string(),
        }),
    }
}

/// `(p | q | ...)` alternation.
fn emit_or(items: &[Form], whole: &Form, ctx: &mut CompileCtx) -> CompileResult<Pattern> {
    if items.len() % 2 == 0 {
        return Err(invalid(whole, "alternation must interleave patterns with |"));
    }
    let mut alts = Vec::with_capacity(items.len() / 2 + 1);
    for (i, item) in items.iter().enumerate() {
        if i % 2 == 1 {
            if !matches!(item, Form::Symbol(s) if &**s == "|") {
                return Err(invalid(whole, "alternation must interleave patterns with |"));
            }
        } else {
            alts.push(emit_pattern(item, ctx)?);
        }
    }
    Ok(Pattern::of(PatternKind::Or { alts }))
}

/// `(xs <vector-kind> offset? n?)` wrapper.
fn emit_vector_wrapper(
    items: &[Form],
    whole: &Form,
    kind: VectorKind,
    ctx: &mut CompileCtx,
) -> CompileResult<Pattern> {
    if items.len() > 4 {
        return Err(invalid(whole, "vector wrapper takes at most offset and size"));
    }
    let elements = items[0]
        .as_vector()
        .ok_or_else(|| invalid(whole, "vector wrapper requires a vector of patterns"))?;
    let offset = match items.get(2) {
        None => 0,
        Some(Form::Int(n)) if *n >= 0 => *n as usize,
        Some(_) => return Err(invalid(whole, "vector offset must be a non-negative integer")),
    };
    if let Some(size) = items.get(3) {
        if !matches!(size, Form::Int(n) if *n >= 0) {
            return Err(invalid(whole, "vector size must be a non-negative integer"));
        }
    }
    emit_vector(elements, kind, offset, ctx)
}

/// A vector literal pattern, honoring a `& rest` tail.
fn emit_vector(
    items: &[Form],
    kind: VectorKind,
    offset: usize,
    ctx: &mut CompileCtx,
) -> CompileResult<Pattern> {
    let mut elems = Vec::new();
    let mut rest = None;
    let mut i = 0;
    while i < items.len() {
        if items[i].is_rest_marker() {
            if i + 2 != items.len() {
                return Err(invalid(
                    &Form::Vector(items.to_vec()),
                    "`&` must be followed by exactly one rest pattern",
                ));
            }
            rest = Some(Box::new(emit_pattern(&items[i + 1], ctx)?));
            break;
        }
        elems.push(emit_pattern(&items[i], ctx)?);
        i += 1;
    }
    Ok(Pattern::of(PatternKind::Vector {
        items: elems,
        kind,
        offset,
        rest,
    }))
}

/// A seq pattern's element list, honoring a `& rest` tail.
fn emit_seq(items: &[Form], whole: &Form, ctx: &mut CompileCtx) -> CompileResult<Pattern> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < items.len() {
        if items[i].is_rest_marker() {
            if out.is_empty() {
                return Err(invalid(whole, "`&` must follow at least one element"));
            }
            if i + 2 != items.len() {
                return Err(invalid(whole, "`&` must be followed by exactly one rest pattern"));
            }
            out.push(Pattern::of(PatternKind::Rest {
                inner: Box::new(emit_pattern(&items[i + 1], ctx)?),
            }));
            break;
        }
        out.push(emit_pattern(&items[i], ctx)?);
        i += 1;
    }
    if out.is_empty() {
        return Err(invalid(whole, ":seq requires at least one element"));
    }
    Ok(Pattern::of(PatternKind::Seq { items: out }))
}

fn invalid(form: &Form, message: &str) -> TrellisError {
    TrellisError::InvalidPattern {
        pattern: form.to_string(),
        message: message.to_string(),
    }
}
