//! Occurrence model.
//!
//! An occurrence is a named handle for a sub-value of the match input.
//! Specialization replaces an occurrence with fresh occurrences for its
//! components (sequence head/tail, vector elements and slices, map values);
//! the metadata here records how each one projects out of its parent so the
//! back-end can emit the binding expression.

use std::sync::Arc;
use trellis_core::{Form, HostExpr, PrimOp, Value};

/// Which half of a sequence split an occurrence projects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqPart {
    /// The head element.
    First,
    /// The tail sequence.
    Rest,
}

/// How an occurrence relates to its parent value.
#[derive(Clone, Debug, PartialEq)]
pub enum OccurrenceKind {
    /// A top-level occurrence; the name itself is the value.
    Plain,

    /// Head or tail of a sequential parent.
    Seq {
        /// The root sequence occurrence this chain started from.
        root: Arc<str>,
        /// The immediate parent occurrence.
        parent: Arc<str>,
        /// Which half to project.
        part: SeqPart,
    },

    /// An indexed element of a vector parent.
    Element {
        /// The vector occurrence.
        source: Arc<str>,
        /// Absolute element index (offset already applied).
        index: usize,
    },

    /// A sub-slice of a vector parent, from `start` to the end.
    Slice {
        /// The vector occurrence.
        source: Arc<str>,
        /// Slice start index.
        start: usize,
    },

    /// A keyed entry of a lookup-capable parent.
    MapEntry {
        /// The map occurrence.
        map: Arc<str>,
        /// The key, projected with a nil default.
        key: Form,
    },
}

/// A named handle for a sub-value of the match input.
#[derive(Clone, Debug, PartialEq)]
pub struct Occurrence {
    /// The occurrence name, referenced by emitted code.
    pub name: Arc<str>,
    /// Projection metadata.
    pub kind: OccurrenceKind,
    /// The original expression, when the user passed a non-symbol
    /// occurrence that was lifted to a fresh name. A `Bind` node
    /// introduces the let at the right scope, exactly once.
    pub lifted: Option<Form>,
}

impl Occurrence {
    /// A plain occurrence over an existing name.
    pub fn plain(name: Arc<str>) -> Self {
        Occurrence {
            name,
            kind: OccurrenceKind::Plain,
            lifted: None,
        }
    }

    /// A fresh occurrence standing in for a lifted expression.
    pub fn lifted(name: Arc<str>, expr: Form) -> Self {
        Occurrence {
            name,
            kind: OccurrenceKind::Plain,
            lifted: Some(expr),
        }
    }

    /// Reference this occurrence by name.
    #[inline]
    pub fn reference(&self) -> HostExpr {
        HostExpr::Name(self.name.clone())
    }

    /// The projection expression binding this occurrence from its parent,
    /// or `None` for plain occurrences.
    pub fn bind_expr(&self) -> Option<HostExpr> {
        match &self.kind {
            OccurrenceKind::Plain => None,
            OccurrenceKind::Seq { parent, part, .. } => {
                let op = match part {
                    SeqPart::First => PrimOp::First,
                    SeqPart::Rest => PrimOp::Rest,
                };
                Some(HostExpr::prim(op, vec![HostExpr::Name(parent.clone())]))
            }
            OccurrenceKind::Element { source, index } => Some(HostExpr::prim(
                PrimOp::Nth,
                vec![
                    HostExpr::Name(source.clone()),
                    HostExpr::Literal(Value::Int(*index as i64)),
                ],
            )),
            OccurrenceKind::Slice { source, start } => Some(HostExpr::prim(
                PrimOp::Subvec,
                vec![
                    HostExpr::Name(source.clone()),
                    HostExpr::Literal(Value::Int(*start as i64)),
                ],
            )),
            OccurrenceKind::MapEntry { map, key } => Some(HostExpr::prim(
                PrimOp::Get,
                vec![
                    HostExpr::Name(map.clone()),
                    HostExpr::Literal(Value::from_form(key)),
                ],
            )),
        }
    }

    /// The map occurrence backing a map-entry occurrence.
    ///
    /// Key-set assertions test the map itself, not the projected entry.
    pub fn map_source(&self) -> &Arc<str> {
        match &self.kind {
            OccurrenceKind::MapEntry { map, .. } => map,
            _ => &self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_has_no_bind_expr() {
        let occ = Occurrence::plain(Arc::from("x"));
        assert_eq!(occ.bind_expr(), None);
    }

    #[test]
    fn test_seq_projections() {
        let head = Occurrence {
            name: Arc::from("s_head_1__"),
            kind: OccurrenceKind::Seq {
                root: Arc::from("s"),
                parent: Arc::from("s"),
                part: SeqPart::First,
            },
            lifted: None,
        };
        assert_eq!(head.bind_expr().map(|e| e.to_string()), Some("(first s)".into()));
    }

    #[test]
    fn test_element_projection_carries_index() {
        let occ = Occurrence {
            name: Arc::from("v_2__"),
            kind: OccurrenceKind::Element {
                source: Arc::from("v"),
                index: 2,
            },
            lifted: None,
        };
        assert_eq!(occ.bind_expr().map(|e| e.to_string()), Some("(nth v 2)".into()));
    }

    #[test]
    fn test_map_source_backpointer() {
        let occ = Occurrence {
            name: Arc::from("m_a_1__"),
            kind: OccurrenceKind::MapEntry {
                map: Arc::from("m"),
                key: Form::kw("a"),
            },
            lifted: None,
        };
        assert_eq!(&**occ.map_source(), "m");
    }
}
