//! Classifies a path as a simple entity path or a relation (pivot) path.
//!
//! A numeric segment immediately followed by a name segment is the only signal that the
//! number is a parent id rather than a member id; the first such pair wins.

use crate::path::segments::PathSegments;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathShape {
    /// One entity collection, optionally ending in a member id.
    Simple,
    /// Parent id at `parent_id_index`, relation name right after it, optional related member id after that.
    Relation {
        parent_id_index: usize,
        relation_index: usize,
        relation_id_index: Option<usize>,
    },
}

impl PathShape {
    pub fn is_relation(&self) -> bool {
        matches!(self, PathShape::Relation { .. })
    }
}

pub fn classify(segments: &PathSegments) -> PathShape {
    let pivot = (0..segments.len().saturating_sub(1))
        .find(|&i| segments.is_numeric_at(i) && !segments.is_numeric_at(i + 1));
    match pivot {
        Some(i) => PathShape::Relation {
            parent_id_index: i,
            relation_index: i + 1,
            relation_id_index: segments.is_numeric_at(i + 2).then_some(i + 2),
        },
        None => PathShape::Simple,
    }
}
