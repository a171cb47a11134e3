//! Error types and result definitions for Trellis.
//!
//! This module provides the error hierarchy covering all phases:
//! - Reader errors (surface-syntax text that does not parse)
//! - Compile errors (malformed occurrences, rows, or pattern forms)
//! - Runtime errors (evaluation of emitted match code)
//!
//! An inexhaustive match is deliberately *not* an error: it is surfaced as a
//! [`MatchWarning`] and the compiled tree receives a failure tail instead.

use std::fmt;
use thiserror::Error;

/// The unified result type used throughout Trellis.
pub type TrellisResult<T> = Result<T, TrellisError>;

/// Comprehensive error type covering all Trellis error conditions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrellisError {
    /// Surface text failed to parse into a form.
    #[error("ReadError: {message} (at offset {pos})")]
    ReadError {
        /// Error description.
        message: String,
        /// Byte offset in the source text.
        pos: usize,
    },

    /// The occurrences container was not a vector.
    #[error("CompileError: occurrences must be given as a vector, found {found}")]
    OccurrencesNotVector {
        /// Printed representation of the offending form.
        found: String,
    },

    /// A pattern row was not a vector.
    #[error("CompileError: pattern row {row} must be a vector, found {found}")]
    RowNotVector {
        /// One-based clause row number.
        row: usize,
        /// Printed representation of the offending form.
        found: String,
    },

    /// A pattern row's arity did not match the occurrence vector.
    #[error(
        "CompileError: pattern row {row} {pattern} has {found} patterns, expected {expected}"
    )]
    RowArityMismatch {
        /// One-based clause row number.
        row: usize,
        /// Printed representation of the row.
        pattern: String,
        /// Number of patterns found in the row.
        found: usize,
        /// Expected arity (the occurrence count).
        expected: usize,
    },

    /// `:else` appeared somewhere other than the last row.
    #[error("CompileError: :else can only appear as the last clause (found at row {row})")]
    MisplacedElse {
        /// One-based clause row number.
        row: usize,
    },

    /// The clause list did not come in pattern/action pairs.
    #[error("CompileError: match clauses must be pattern/action pairs, found {count} forms")]
    OddClauseCount {
        /// Number of clause forms supplied.
        count: usize,
    },

    /// A wrapper list used an unrecognized tag in its second position.
    #[error("CompileError: unknown pattern tag {tag}; valid tags are {valid}")]
    UnknownPatternTag {
        /// The offending tag form.
        tag: String,
        /// Comma-separated listing of the valid tags.
        valid: String,
    },

    /// A pattern form was structurally invalid.
    #[error("CompileError: invalid pattern {pattern}: {message}")]
    InvalidPattern {
        /// Printed representation of the pattern form.
        pattern: String,
        /// What was wrong with it.
        message: String,
    },

    /// No clause matched the runtime input.
    #[error("NoMatchError: no match found{}", no_match_suffix(.detail))]
    NoMatch {
        /// Branch counter and test breadcrumbs, present when tracing is on.
        detail: Option<String>,
    },

    /// A name was referenced but not bound in any scope.
    #[error("RuntimeError: unbound name '{name}'")]
    UnboundName {
        /// The unresolved name.
        name: String,
    },

    /// A function was called but not registered with the environment.
    #[error("RuntimeError: undefined function '{name}'")]
    UndefinedFunction {
        /// The unresolved function name.
        name: String,
    },

    /// A runtime operation was applied to a value of the wrong shape.
    #[error("TypeError: {message}")]
    TypeError {
        /// Error description.
        message: String,
    },

    /// A function received the wrong number of arguments.
    #[error("ArityError: {name} expects {expected} arguments, got {found}")]
    ArityError {
        /// Function name.
        name: String,
        /// Expected argument count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },

    /// A sequence index was out of range.
    #[error("IndexError: index {index} out of range for length {len}")]
    IndexError {
        /// The requested index.
        index: usize,
        /// The actual length.
        len: usize,
    },
}

fn no_match_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(" ({d})"),
        None => String::new(),
    }
}

/// A non-fatal diagnostic produced during match compilation.
///
/// Warnings are accumulated per compile invocation and reported at most once
/// each; they never abort the compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchWarning {
    /// The clause rows do not cover every input; the compiled tree falls
    /// through to a runtime failure.
    InexhaustiveMatch,
}

impl fmt::Display for MatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchWarning::InexhaustiveMatch => {
                write!(f, "non-exhaustive pattern match: consider adding an :else clause")
            }
        }
    }
}
