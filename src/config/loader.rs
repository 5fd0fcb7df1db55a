//! Load entity declarations from a JSON or YAML file and build the registry.

use crate::case::to_snake_case;
use crate::config::resolved::{EntityRegistry, FieldMeta, RegisteredEntity, RelationDecl, RelationKind};
use crate::config::types::*;
use crate::config::validator::{declared_type, validate};
use crate::error::ConfigError;
use crate::pluralize::Pluralizer;
use std::collections::HashMap;
use std::path::Path;

/// Declaration file format, picked from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

pub fn parse_config(text: &str, format: ConfigFormat) -> Result<EntitiesConfig, ConfigError> {
    match format {
        ConfigFormat::Json => serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string())),
        ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|e| ConfigError::Load(e.to_string())),
    }
}

/// Read and parse a declaration file (does not validate).
pub async fn load_from_path(path: &Path) -> Result<EntitiesConfig, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_config(&text, ConfigFormat::from_path(path))
}

/// Read, validate and build in one step. Used at startup and on reload.
pub async fn load_registry(path: &Path) -> Result<EntityRegistry, ConfigError> {
    let config = load_from_path(path).await?;
    resolve(&config)
}

/// Build the registry from config (validates first).
pub fn resolve(config: &EntitiesConfig) -> Result<EntityRegistry, ConfigError> {
    validate(config)?;

    let mut storage_by_type = HashMap::new();
    for entity in &config.entities {
        let (segments, type_ref) = declared_type(&entity.path)?;
        storage_by_type.insert(type_ref, default_storage(entity, segments.as_slice()));
    }

    let mut entities = HashMap::new();
    let mut order = Vec::new();
    for entity in &config.entities {
        let (segments, type_ref) = declared_type(&entity.path)?;
        let parent_key = key_stem(segments.as_slice());

        let mut relations = HashMap::new();
        for (name, relation) in &entity.relations {
            let (related_segments, related) = declared_type(&relation.related)?;
            let storage_name = match &relation.storage {
                Some(s) => s.clone(),
                None => storage_by_type
                    .get(&related)
                    .cloned()
                    .ok_or_else(|| ConfigError::MissingReference {
                        kind: "related entity",
                        id: relation.related.clone(),
                    })?,
            };
            let kind = match &relation.kind {
                RelationKindConfig::HasMany { foreign_key } => RelationKind::HasMany {
                    foreign_key: foreign_key.clone().unwrap_or_else(|| format!("{}_id", parent_key)),
                },
                RelationKindConfig::BelongsToMany {
                    pivot_table,
                    foreign_pivot_key,
                    related_pivot_key,
                } => RelationKind::BelongsToMany {
                    pivot_table: pivot_table.clone(),
                    foreign_pivot_key: foreign_pivot_key
                        .clone()
                        .unwrap_or_else(|| format!("{}_id", parent_key)),
                    related_pivot_key: related_pivot_key
                        .clone()
                        .unwrap_or_else(|| format!("{}_id", key_stem(related_segments.as_slice()))),
                },
            };
            let canonical = to_snake_case(name);
            relations.insert(
                canonical.clone(),
                RelationDecl {
                    name: canonical,
                    related,
                    storage_name,
                    kind,
                },
            );
        }

        let registered = RegisteredEntity {
            type_ref: type_ref.clone(),
            path: segments.full_path(),
            storage_name: default_storage(entity, segments.as_slice()),
            primary_key: entity.primary_key.clone().unwrap_or_else(|| "id".into()),
            operations: entity.operations.clone(),
            fields: entity.fields.iter().map(FieldMeta::from).collect(),
            validation: entity.validation.clone(),
            relations,
        };
        order.push(type_ref.clone());
        entities.insert(type_ref, registered);
    }

    tracing::info!(entities = entities.len(), schema = %config.schema, "entity registry built");
    Ok(EntityRegistry {
        schema: config.schema.clone(),
        entities,
        order,
    })
}

fn default_storage(entity: &EntityConfig, segments: &[String]) -> String {
    entity
        .storage
        .clone()
        .or_else(|| segments.last().cloned())
        .unwrap_or_default()
}

/// snake_case singular of the last segment, used for default key names ("product" -> "product_id").
fn key_stem(segments: &[String]) -> String {
    segments
        .last()
        .map(|s| to_snake_case(&Pluralizer::singularize(s)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::build_type;

    const YAML: &str = r#"
schema: shop
entities:
  - path: catalog/product
    fields:
      - name: title
        filterable: true
        sortable: true
      - name: price
        input_kind: number
        pg_type: numeric
    validation:
      title: { required: true, max_length: 200 }
    relations:
      images:
        related: catalog/product-image
        kind: has_many
      productTags:
        related: catalog/tags
        kind: belongs_to_many
        pivot_table: product_tag
  - path: catalog/product-image
    storage: cat_product_image
  - path: catalog/tags
    operations: [list, read]
"#;

    #[test]
    fn test_resolve_yaml_config() {
        let config = parse_config(YAML, ConfigFormat::Yaml).unwrap();
        let registry = resolve(&config).unwrap();
        assert_eq!(registry.schema(), "shop");
        assert_eq!(registry.len(), 3);

        let product = build_type(&["catalog", "product"]).unwrap();
        let entity = registry.entity(&product).unwrap();
        assert_eq!(entity.storage_name, "product");
        assert_eq!(entity.primary_key, "id");
        assert_eq!(entity.path, "catalog/product");
        assert!(entity.allows("delete"));
        assert_eq!(entity.pg_type("price"), Some("numeric"));

        let images = registry.relation(&product, "images").unwrap();
        assert_eq!(images.storage_name, "cat_product_image");
        assert_eq!(
            images.kind,
            RelationKind::HasMany {
                foreign_key: "product_id".into()
            }
        );

        let tags = registry.relation(&product, "product_tags").unwrap();
        assert_eq!(tags.storage_name, "tags");
        assert_eq!(
            tags.kind,
            RelationKind::BelongsToMany {
                pivot_table: "product_tag".into(),
                foreign_pivot_key: "product_id".into(),
                related_pivot_key: "tag_id".into(),
            }
        );
        assert!(registry.relation(&product, "productTags").is_none());
    }

    #[test]
    fn test_entities_keep_declaration_order() {
        let registry = resolve(&parse_config(YAML, ConfigFormat::Yaml).unwrap()).unwrap();
        let paths: Vec<&str> = registry.entities().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["catalog/product", "catalog/product-image", "catalog/tags"]);
    }

    #[test]
    fn test_relations_for_sorted_by_name() {
        let registry = resolve(&parse_config(YAML, ConfigFormat::Yaml).unwrap()).unwrap();
        let product = build_type(&["catalog", "product"]).unwrap();
        let names: Vec<&str> = registry.relations_for(&product).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["images", "product_tags"]);
    }

    #[test]
    fn test_json_defaults() {
        let config = parse_config(r#"{ "entities": [ { "path": "orders" } ] }"#, ConfigFormat::Json).unwrap();
        assert_eq!(config.schema, "public");
        let registry = resolve(&config).unwrap();
        let entity = registry.entities().next().unwrap();
        assert_eq!(entity.type_ref.type_name, "OrderEntity");
        assert_eq!(entity.operations.len(), KNOWN_OPERATIONS.len());
        assert!(!entity.has_field_metadata());
    }

    #[test]
    fn test_parse_error_is_load_error() {
        assert!(matches!(
            parse_config("{ not json", ConfigFormat::Json),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/entities.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("entities.YML")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("entities.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("entities")), ConfigFormat::Json);
    }

    #[tokio::test]
    async fn test_load_registry_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.yaml");
        std::fs::write(&path, YAML).unwrap();
        let registry = load_registry(&path).await.unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_path(&dir.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
