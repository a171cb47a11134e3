//! Match Clause Compiler
//!
//! Implements Maranget's decision tree algorithm ("Compiling Pattern
//! Matching to Good Decision Trees") over a Lisp-like clause surface:
//!
//! - `pattern` - The closed pattern AST and the constructor total order
//! - `occurrence` - Named handles for sub-values and their projections
//! - `matrix` - Pattern matrix construction and per-variant specialization
//! - `decision_tree` - Column heuristic, base cases, DAG construction
//! - `codegen` - Host-expression emission from decision DAGs
//! - `emitter` - Surface-clause front end and the public entry points

pub mod codegen;
pub mod decision_tree;
pub mod emitter;
pub mod matrix;
pub mod occurrence;
pub mod pattern;
