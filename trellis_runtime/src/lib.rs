//! Runtime for compiled Trellis matches.
//!
//! Provides an evaluator for the abstract host expressions the compiler
//! emits, over the structural [`Value`](trellis_core::Value) model:
//!
//! - **Environments**: lexical scopes plus a registry of named host functions
//! - **Primitive Operations**: the abstract operations decision DAGs rely on
//! - **Failure Plane**: "no match found" errors, with branch-trace detail
//!   when tracing is enabled on the environment
//!
//! The evaluator is a collaborator of the compiler core, not part of it:
//! any back-end that implements the same primitive operations can execute
//! emitted expressions instead.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod eval;
pub mod prelude;

pub use eval::{Env, HostFn};
