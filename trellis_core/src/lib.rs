//! # Trellis Core
//!
//! Foundational types shared across all Trellis components:
//!
//! - **Surface Forms**: the Lisp-like expression tree the compiler consumes
//!   (occurrences, pattern rows, actions, predicates)
//! - **Reader**: text to [`Form`] parsing
//! - **Value System**: structural runtime values plus the [`Lookup`] protocol
//! - **Host Expressions**: the abstract expression tree the back-end emits
//! - **Error Handling**: result types and error definitions

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod error;
pub mod form;
pub mod host_expr;
pub mod reader;
pub mod value;

pub use error::{MatchWarning, TrellisError, TrellisResult};
pub use form::Form;
pub use host_expr::{HostExpr, PrimOp, VectorKind};
pub use reader::{read, read_many};
pub use value::{Lookup, Value};
