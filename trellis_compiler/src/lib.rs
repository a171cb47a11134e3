//! Match compiler for Trellis.
//!
//! This crate provides the compilation pipeline from surface clauses to an
//! executable decision tree, lowered to abstract host expressions.
//!
//! # Architecture
//!
//! ```text
//! clauses → emit patterns → PatternMatrix → compile → DecisionNode DAG → lower → HostExpr
//! ```
//!
//! # Key Types
//!
//! - [`MatchCompiler`] - Configured entry point (locals, vector kind)
//! - [`CompiledMatch`] - Decision DAG, lowered expression, and warnings
//! - [`Pattern`] - The closed pattern AST
//! - [`PatternMatrix`] - The matrix the Maranget core iterates on
//! - [`DecisionNode`] - Leaf / Fail / Bind / Switch DAG nodes

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod match_compiler;

pub use match_compiler::codegen::{lower, lower_form};
pub use match_compiler::decision_tree::{compile, CompileCtx, DecisionNode, SwitchCase};
pub use match_compiler::emitter::{
    compile_match, compile_match_one, compile_matchv, CompiledMatch, MatchCompiler,
};
pub use match_compiler::matrix::{Binding, PatternMatrix, PatternRow};
pub use match_compiler::occurrence::{Occurrence, OccurrenceKind, SeqPart};
pub use match_compiler::pattern::{pattern_compare, Pattern, PatternKind, PatternOrder};

/// The result type used throughout the compilation pipeline.
pub type CompileResult<T> = trellis_core::TrellisResult<T>;
