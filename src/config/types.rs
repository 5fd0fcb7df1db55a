//! Raw config types matching the entity declaration file (JSON or YAML).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Operations an entity can expose. Anything else in `operations` is rejected at load.
pub const KNOWN_OPERATIONS: &[&str] = &["list", "read", "create", "update", "delete"];

fn default_schema() -> String {
    "public".into()
}

fn default_operations() -> Vec<String> {
    KNOWN_OPERATIONS.iter().map(|s| s.to_string()).collect()
}

/// Views a field can be displayed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    List,
    Detail,
    Form,
}

/// Input widget hint for form generation; also drives query-string value typing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Text,
    Textarea,
    Number,
    Boolean,
    Date,
    Datetime,
    Select,
    Hidden,
}

/// Per-field declarative metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default = "default_views")]
    pub displayable_in: Vec<View>,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub input_kind: InputKind,
    /// SQL type used to cast bound values (e.g. "timestamptz", "numeric").
    #[serde(default)]
    pub pg_type: Option<String>,
}

fn default_views() -> Vec<View> {
    vec![View::List, View::Detail, View::Form]
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// How a relation is stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKindConfig {
    /// Related rows carry a foreign key to the parent.
    HasMany {
        #[serde(default)]
        foreign_key: Option<String>,
    },
    /// Parent and related rows are joined through a pivot table.
    BelongsToMany {
        pivot_table: String,
        #[serde(default)]
        foreign_pivot_key: Option<String>,
        #[serde(default)]
        related_pivot_key: Option<String>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationConfig {
    /// Path of the related entity (name segments, e.g. "catalog/product-image").
    pub related: String,
    /// Storage override; defaults to the related entity's storage.
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(flatten)]
    pub kind: RelationKindConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Name segments of the entity's collection path (e.g. "catalog/product").
    pub path: String,
    /// Storage override; defaults to the raw last path segment.
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default = "default_operations")]
    pub operations: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
    /// Keyed by relation name as it may appear in URLs; canonicalized to snake_case at load.
    #[serde(default)]
    pub relations: BTreeMap<String, RelationConfig>,
}

/// Whole declaration file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntitiesConfig {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        EntitiesConfig {
            schema: default_schema(),
            entities: Vec::new(),
        }
    }
}
