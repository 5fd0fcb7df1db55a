//! Config validation: identifiers, paths, operations and relation targets.

use crate::case::to_snake_case;
use crate::config::{EntitiesConfig, EntityConfig, RelationKindConfig, KNOWN_OPERATIONS};
use crate::error::ConfigError;
use crate::path::{build_type, EntityTypeRef, PathSegments};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

/// SQL-safe identifier (storage names, keys, field names).
pub fn is_valid_identifier(s: &str) -> bool {
    identifier_re().is_match(s)
}

fn check_identifier(kind: &'static str, value: &str) -> Result<(), ConfigError> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Canonical type of a declared entity or relation target path.
pub fn declared_type(path: &str) -> Result<(PathSegments, EntityTypeRef), ConfigError> {
    let segments = PathSegments::parse(path).map_err(|e| ConfigError::Validation(format!("path '{}': {}", path, e)))?;
    let type_ref =
        build_type(segments.as_slice()).map_err(|e| ConfigError::Validation(format!("path '{}': {}", path, e)))?;
    Ok((segments, type_ref))
}

pub fn validate(config: &EntitiesConfig) -> Result<(), ConfigError> {
    check_identifier("schema", &config.schema)?;

    let mut types: HashMap<EntityTypeRef, &str> = HashMap::new();
    for entity in &config.entities {
        let (_, type_ref) = declared_type(&entity.path)?;
        if let Some(previous) = types.insert(type_ref.clone(), entity.path.as_str()) {
            return Err(ConfigError::DuplicateEntity(format!(
                "{} (paths '{}' and '{}')",
                type_ref, previous, entity.path
            )));
        }
    }

    for entity in &config.entities {
        validate_entity(entity, &types)?;
    }
    Ok(())
}

fn validate_entity(entity: &EntityConfig, types: &HashMap<EntityTypeRef, &str>) -> Result<(), ConfigError> {
    let (segments, type_ref) = declared_type(&entity.path)?;
    if let Some(storage) = &entity.storage {
        check_identifier("storage", storage)?;
    } else if let Some(last) = segments.as_slice().last() {
        check_identifier("storage (from path)", last)?;
    }
    if let Some(pk) = &entity.primary_key {
        check_identifier("primary_key", pk)?;
    }
    for op in &entity.operations {
        if !KNOWN_OPERATIONS.contains(&op.as_str()) {
            return Err(ConfigError::Validation(format!(
                "{}: unknown operation '{}' (expected one of {:?})",
                entity.path, op, KNOWN_OPERATIONS
            )));
        }
    }

    let mut field_names = HashSet::new();
    for field in &entity.fields {
        check_identifier("field", &field.name)?;
        if !field_names.insert(field.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "{}: duplicate field '{}'",
                entity.path, field.name
            )));
        }
        if let Some(pg_type) = &field.pg_type {
            check_identifier("pg_type", pg_type)?;
        }
    }
    if !entity.fields.is_empty() {
        for column in entity.validation.keys() {
            if !field_names.contains(column.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "field",
                    id: format!("{}.{}", entity.path, column),
                });
            }
        }
    }

    let mut relation_names = HashSet::new();
    for (name, relation) in &entity.relations {
        let canonical = to_snake_case(name);
        check_identifier("relation name", &canonical)?;
        if !relation_names.insert(canonical.clone()) {
            return Err(ConfigError::DuplicateRelation {
                entity: type_ref.to_string(),
                relation: canonical,
            });
        }
        let (_, related) = declared_type(&relation.related)?;
        if !types.contains_key(&related) {
            return Err(ConfigError::MissingReference {
                kind: "related entity",
                id: relation.related.clone(),
            });
        }
        if let Some(storage) = &relation.storage {
            check_identifier("relation storage", storage)?;
        }
        match &relation.kind {
            RelationKindConfig::HasMany { foreign_key } => {
                if let Some(fk) = foreign_key {
                    check_identifier("foreign_key", fk)?;
                }
            }
            RelationKindConfig::BelongsToMany {
                pivot_table,
                foreign_pivot_key,
                related_pivot_key,
            } => {
                check_identifier("pivot_table", pivot_table)?;
                for key in [foreign_pivot_key, related_pivot_key].into_iter().flatten() {
                    check_identifier("pivot key", key)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RelationConfig, RelationKindConfig};

    fn entity(path: &str) -> EntityConfig {
        serde_json::from_value(serde_json::json!({ "path": path })).unwrap()
    }

    fn has_many(related: &str) -> RelationConfig {
        RelationConfig {
            related: related.into(),
            storage: None,
            kind: RelationKindConfig::HasMany { foreign_key: None },
        }
    }

    fn config(entities: Vec<EntityConfig>) -> EntitiesConfig {
        EntitiesConfig {
            schema: "public".into(),
            entities,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let mut product = entity("catalog/product");
        product.relations.insert("images".into(), has_many("catalog/product-image"));
        let mut image = entity("catalog/product-image");
        image.storage = Some("cat_product_image".into());
        let c = config(vec![product, image]);
        validate(&c).unwrap();
    }

    #[test]
    fn test_duplicate_entity_type_rejected() {
        let c = config(vec![entity("catalog/product"), entity("catalog/product")]);
        assert!(matches!(validate(&c), Err(ConfigError::DuplicateEntity(_))));
    }

    #[test]
    fn test_numeric_segment_in_entity_path_rejected() {
        let c = config(vec![entity("catalog/42")]);
        assert!(matches!(validate(&c), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unregistered_relation_target_rejected() {
        let mut product = entity("catalog/product");
        product.relations.insert("images".into(), has_many("catalog/image"));
        let c = config(vec![product]);
        assert!(matches!(
            validate(&c),
            Err(ConfigError::MissingReference { kind: "related entity", .. })
        ));
    }

    #[test]
    fn test_relation_names_collide_after_canonicalization() {
        let mut product = entity("catalog/product");
        product.relations.insert("gallery-images".into(), has_many("catalog/product"));
        product.relations.insert("gallery_images".into(), has_many("catalog/product"));
        let c = config(vec![product]);
        assert!(matches!(validate(&c), Err(ConfigError::DuplicateRelation { .. })));
    }

    #[test]
    fn test_unsafe_identifiers_rejected() {
        let mut e = entity("catalog/product");
        e.storage = Some("product; drop table x".into());
        assert!(matches!(
            validate(&config(vec![e])),
            Err(ConfigError::InvalidIdentifier { kind: "storage", .. })
        ));

        // kebab-case last segment needs an explicit storage name
        let e = entity("catalog/product-image");
        assert!(matches!(
            validate(&config(vec![e])),
            Err(ConfigError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let mut e = entity("catalog/product");
        e.operations = vec!["list".into(), "explode".into()];
        assert!(matches!(validate(&config(vec![e])), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rule_must_reference_declared_field() {
        let e: EntityConfig = serde_json::from_value(serde_json::json!({
            "path": "catalog/product",
            "fields": [{ "name": "title" }],
            "validation": { "price": { "required": true } }
        }))
        .unwrap();
        assert!(matches!(
            validate(&config(vec![e])),
            Err(ConfigError::MissingReference { kind: "field", .. })
        ));
    }

    #[test]
    fn test_identifier_regex() {
        assert!(is_valid_identifier("cat_product_image"));
        assert!(is_valid_identifier("_x1"));
        assert!(!is_valid_identifier("1x"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier(""));
    }
}
