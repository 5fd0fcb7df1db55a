//! Entity type registry: config validated and flattened for runtime lookups.
//! Built once and never mutated; reload swaps in a whole new registry.

use crate::config::{FieldConfig, InputKind, ValidationRule, View};
use crate::path::EntityTypeRef;
use serde::Serialize;
use std::collections::HashMap;

/// How the related rows are reached from a parent row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKind {
    HasMany {
        foreign_key: String,
    },
    BelongsToMany {
        pivot_table: String,
        foreign_pivot_key: String,
        related_pivot_key: String,
    },
}

/// A named association declared on a parent entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelationDecl {
    /// Canonical snake_case name.
    pub name: String,
    pub related: EntityTypeRef,
    pub storage_name: String,
    #[serde(flatten)]
    pub kind: RelationKind,
}

#[derive(Clone, Debug, Serialize)]
pub struct FieldMeta {
    pub name: String,
    pub displayable_in: Vec<View>,
    pub filterable: bool,
    pub sortable: bool,
    pub input_kind: InputKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pg_type: Option<String>,
}

impl From<&FieldConfig> for FieldMeta {
    fn from(f: &FieldConfig) -> Self {
        FieldMeta {
            name: f.name.clone(),
            displayable_in: f.displayable_in.clone(),
            filterable: f.filterable,
            sortable: f.sortable,
            input_kind: f.input_kind,
            pg_type: f.pg_type.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisteredEntity {
    pub type_ref: EntityTypeRef,
    /// Declared collection path (name segments joined by '/').
    pub path: String,
    pub storage_name: String,
    pub primary_key: String,
    pub operations: Vec<String>,
    /// Empty means "no metadata": every column is exposed and accepted.
    pub fields: Vec<FieldMeta>,
    #[serde(skip)]
    pub validation: HashMap<String, ValidationRule>,
    pub relations: HashMap<String, RelationDecl>,
}

impl RegisteredEntity {
    pub fn allows(&self, operation: &str) -> bool {
        self.operations.iter().any(|o| o == operation)
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field_metadata(&self) -> bool {
        !self.fields.is_empty()
    }

    /// SQL cast for a column, if declared.
    pub fn pg_type(&self, column: &str) -> Option<&str> {
        self.field(column).and_then(|f| f.pg_type.as_deref())
    }
}

/// Read-only lookup table from canonical type to declaration.
#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    pub(crate) schema: String,
    pub(crate) entities: HashMap<EntityTypeRef, RegisteredEntity>,
    /// Declaration order, for stable listings.
    pub(crate) order: Vec<EntityTypeRef>,
}

impl EntityRegistry {
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn entity(&self, type_ref: &EntityTypeRef) -> Option<&RegisteredEntity> {
        self.entities.get(type_ref)
    }

    pub fn relation(&self, parent: &EntityTypeRef, relation_name: &str) -> Option<&RelationDecl> {
        self.entities.get(parent)?.relations.get(relation_name)
    }

    /// Relations of one entity, sorted by name.
    pub fn relations_for(&self, parent: &EntityTypeRef) -> Vec<&RelationDecl> {
        let mut out: Vec<&RelationDecl> = self
            .entities
            .get(parent)
            .map(|e| e.relations.values().collect())
            .unwrap_or_default();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// All entities in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = &RegisteredEntity> {
        self.order.iter().filter_map(|t| self.entities.get(t))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
