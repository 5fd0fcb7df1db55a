//! Route resolver: turns a path into a fully described main or relation resolution.
//! Fails closed; nothing here guesses a type or falls back to another relation.

use crate::case::to_snake_case;
use crate::config::{EntityRegistry, RelationDecl, RelationKind};
use crate::error::ResolutionError;
use crate::path::classify::{classify, PathShape};
use crate::path::naming::{build_type, parse_main, EntityTypeRef};
use crate::path::segments::{self, is_numeric, parse_id, PathSegments};
use serde::Serialize;

/// What the resolver needs from the entity type registry.
pub trait EntityLookup {
    /// Storage name of a registered type; `None` when the type is unknown.
    fn storage_name(&self, entity: &EntityTypeRef) -> Option<&str>;

    /// Relation declared on `parent` under its canonical (snake_case) name.
    fn relation(&self, parent: &EntityTypeRef, relation_name: &str) -> Option<&RelationDecl>;
}

impl EntityLookup for EntityRegistry {
    fn storage_name(&self, entity: &EntityTypeRef) -> Option<&str> {
        self.entity(entity).map(|e| e.storage_name.as_str())
    }

    fn relation(&self, parent: &EntityTypeRef, relation_name: &str) -> Option<&RelationDecl> {
        EntityRegistry::relation(self, parent, relation_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MainResolution {
    pub entity_type: EntityTypeRef,
    pub storage_name: String,
    pub main_path: String,
    pub full_path: String,
    pub member_id: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelationResolution {
    /// The related (child) type.
    pub entity_type: EntityTypeRef,
    pub storage_name: String,
    pub parent_entity_type: EntityTypeRef,
    pub parent_storage_name: String,
    pub relation_name: String,
    pub original_relation_name: String,
    pub parent_id: u64,
    pub relation_id: Option<u64>,
    pub main_path: String,
    pub full_path: String,
    pub kind: RelationKind,
}

/// Resolution result: exactly one of the two shapes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedPath {
    Main(MainResolution),
    Relation(RelationResolution),
}

impl ResolvedPath {
    /// Type whose rows the request addresses (the child type for relation paths).
    pub fn entity_type(&self) -> &EntityTypeRef {
        match self {
            ResolvedPath::Main(m) => &m.entity_type,
            ResolvedPath::Relation(r) => &r.entity_type,
        }
    }

    pub fn storage_name(&self) -> &str {
        match self {
            ResolvedPath::Main(m) => &m.storage_name,
            ResolvedPath::Relation(r) => &r.storage_name,
        }
    }

    pub fn full_path(&self) -> &str {
        match self {
            ResolvedPath::Main(m) => &m.full_path,
            ResolvedPath::Relation(r) => &r.full_path,
        }
    }
}

pub struct RouteResolver<'r, R: ?Sized> {
    registry: &'r R,
}

impl<'r, R: EntityLookup + ?Sized> RouteResolver<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        RouteResolver { registry }
    }

    /// Split a raw `/` path and resolve it.
    pub fn resolve_str(&self, path: &str) -> Result<ResolvedPath, ResolutionError> {
        self.resolve(&PathSegments::parse(path)?)
    }

    pub fn resolve(&self, segments: &PathSegments) -> Result<ResolvedPath, ResolutionError> {
        let resolved = match classify(segments) {
            PathShape::Simple => self.resolve_main(segments)?,
            PathShape::Relation {
                parent_id_index,
                relation_index,
                relation_id_index,
            } => self.resolve_relation(segments, parent_id_index, relation_index, relation_id_index)?,
        };
        tracing::debug!(path = %resolved.full_path(), entity = %resolved.entity_type(), "resolved");
        Ok(resolved)
    }

    fn resolve_main(&self, segments: &PathSegments) -> Result<ResolvedPath, ResolutionError> {
        let main = parse_main(segments)?;
        if self.registry.storage_name(&main.entity_type).is_none() {
            return Err(ResolutionError::UnknownEntityType {
                type_name: main.entity_type.to_string(),
                path: main.main_path,
            });
        }
        Ok(ResolvedPath::Main(MainResolution {
            entity_type: main.entity_type,
            storage_name: main.storage_name,
            main_path: main.main_path,
            full_path: segments.full_path(),
            member_id: main.member_id,
        }))
    }

    fn resolve_relation(
        &self,
        segments: &PathSegments,
        parent_id_index: usize,
        relation_index: usize,
        relation_id_index: Option<usize>,
    ) -> Result<ResolvedPath, ResolutionError> {
        let all = segments.as_slice();
        let parent_id_raw = &all[parent_id_index];
        let parent_names: Vec<&str> = all[..parent_id_index]
            .iter()
            .map(String::as_str)
            .filter(|s| !is_numeric(s))
            .collect();
        if parent_names.is_empty() {
            return Err(ResolutionError::MalformedRelationPath(parent_id_raw.clone()));
        }
        let parent_id = parse_id(parent_id_raw)?;
        let parent_type = build_type(&parent_names)?;
        let main_path = segments::join(&parent_names);
        let parent_storage_name = self
            .registry
            .storage_name(&parent_type)
            .ok_or_else(|| ResolutionError::UnknownEntityType {
                type_name: parent_type.to_string(),
                path: main_path.clone(),
            })?
            .to_string();

        let original_relation_name = all[relation_index].clone();
        let relation_name = to_snake_case(&original_relation_name);
        let relation = self
            .registry
            .relation(&parent_type, &relation_name)
            .ok_or_else(|| ResolutionError::RelationNotFound {
                parent: parent_type.to_string(),
                relation: original_relation_name.clone(),
            })?;

        let relation_id = relation_id_index.map(|i| parse_id(&all[i])).transpose()?;
        let consumed = relation_id_index.unwrap_or(relation_index) + 1;
        if consumed < all.len() {
            tracing::debug!(
                path = %segments.full_path(),
                ignored = %segments::join(&all[consumed..]),
                "segments after relation are not traversed"
            );
        }

        Ok(ResolvedPath::Relation(RelationResolution {
            entity_type: relation.related.clone(),
            storage_name: relation.storage_name.clone(),
            parent_entity_type: parent_type,
            parent_storage_name,
            relation_name,
            original_relation_name,
            parent_id,
            relation_id,
            main_path,
            full_path: segments.full_path(),
            kind: relation.kind.clone(),
        }))
    }
}
