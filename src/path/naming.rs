//! Naming convention: name segments -> canonical entity type identity and storage name.
//!
//! `catalog/product-images` becomes namespace `["Catalog", "ProductImages"]` and type name
//! `ProductImageEntity` (studly form of the singular last segment plus [`ENTITY_TYPE_SUFFIX`]).

use crate::case::to_studly_case;
use crate::error::ResolutionError;
use crate::path::segments::{self, is_numeric, parse_id, PathSegments};
use crate::pluralize::Pluralizer;
use serde::Serialize;
use std::fmt;

/// Appended to every canonical type name.
pub const ENTITY_TYPE_SUFFIX: &str = "Entity";

/// Canonical identity of a resolvable entity type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityTypeRef {
    pub namespace: Vec<String>,
    pub type_name: String,
}

impl fmt::Display for EntityTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.namespace {
            write!(f, "{}::", part)?;
        }
        f.write_str(&self.type_name)
    }
}

/// Build the type identity from name segments (numeric segments must already be stripped).
pub fn build_type<S: AsRef<str>>(name_segments: &[S]) -> Result<EntityTypeRef, ResolutionError> {
    let last = name_segments
        .last()
        .map(AsRef::as_ref)
        .ok_or_else(|| ResolutionError::MalformedPath("no entity name in path".into()))?;
    if let Some(bad) = name_segments.iter().map(AsRef::as_ref).find(|s| is_numeric(s) || s.is_empty()) {
        return Err(ResolutionError::MalformedPath(format!(
            "'{}' is not an entity name in '{}'",
            bad,
            segments::join(name_segments)
        )));
    }
    let namespace = name_segments
        .iter()
        .map(|s| to_studly_case(s.as_ref()))
        .collect();
    let type_name = format!(
        "{}{}",
        to_studly_case(&Pluralizer::singularize(last)),
        ENTITY_TYPE_SUFFIX
    );
    Ok(EntityTypeRef { namespace, type_name })
}

/// Result of parsing a simple (non-relation) path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MainPath {
    pub entity_type: EntityTypeRef,
    /// Raw last name segment.
    pub storage_name: String,
    /// Name segments rejoined, without the member id.
    pub main_path: String,
    pub member_id: Option<u64>,
}

/// Parse a simple path: strip a trailing member id, then build the type from what remains.
pub fn parse_main(segments: &PathSegments) -> Result<MainPath, ResolutionError> {
    let all = segments.as_slice();
    let (names, member_id) = match all.split_last() {
        Some((last, rest)) if is_numeric(last) => (rest, Some(parse_id(last)?)),
        _ => (all, None),
    };
    let storage_name = names
        .last()
        .cloned()
        .ok_or_else(|| ResolutionError::MalformedPath(segments.full_path()))?;
    let entity_type = build_type(names)?;
    Ok(MainPath {
        entity_type,
        storage_name,
        main_path: segments::join(names),
        member_id,
    })
}
