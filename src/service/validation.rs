//! Request validation from config rules.

use crate::config::ValidationRule;
use crate::error::AppError;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-column rules. All required fields must be present.
    pub fn validate(
        body: &BTreeMap<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        for (col, rule) in rules {
            let val = body.get(col);
            if rule.required == Some(true) && (val.is_none() || val == Some(&Value::Null)) {
                return Err(AppError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for PATCH). Required is not enforced for missing fields.
    pub fn validate_partial(
        body: &BTreeMap<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        for (col, v) in body {
            if let Some(rule) = rules.get(col) {
                if rule.required == Some(true) && v.is_null() {
                    return Err(AppError::Validation(format!("{} cannot be null", col)));
                }
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
        if let Some(ref pattern) = rule.pattern {
            let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                col,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else {
        return Err(AppError::Validation(format!("{} must be a string", col)));
    };
    let ok = match format.to_lowercase().as_str() {
        "email" => {
            let mut parts = s.splitn(2, '@');
            let local = parts.next().unwrap_or_default();
            let domain = parts.next().unwrap_or_default();
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        "date" => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        "datetime" => {
            chrono::DateTime::parse_from_rfc3339(s).is_ok()
                || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        }
        other => {
            tracing::warn!(field = col, format = other, "unknown validation format ignored");
            true
        }
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be a valid {}", col, format)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(v: serde_json::Value) -> HashMap<String, ValidationRule> {
        serde_json::from_value(v).unwrap()
    }

    fn body(v: serde_json::Value) -> BTreeMap<String, Value> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_required_missing_and_null() {
        let r = rules(json!({ "title": { "required": true } }));
        assert!(RequestValidator::validate(&body(json!({})), &r).is_err());
        assert!(RequestValidator::validate(&body(json!({ "title": null })), &r).is_err());
        assert!(RequestValidator::validate(&body(json!({ "title": "x" })), &r).is_ok());
    }

    #[test]
    fn test_partial_skips_missing_required() {
        let r = rules(json!({ "title": { "required": true, "max_length": 3 } }));
        assert!(RequestValidator::validate_partial(&body(json!({})), &r).is_ok());
        assert!(RequestValidator::validate_partial(&body(json!({ "title": "long" })), &r).is_err());
        assert!(RequestValidator::validate_partial(&body(json!({ "title": null })), &r).is_err());
    }

    #[test]
    fn test_length_counts_characters() {
        let r = rules(json!({ "name": { "max_length": 4 } }));
        assert!(RequestValidator::validate(&body(json!({ "name": "ÿÿÿÿ" })), &r).is_ok());
    }

    #[test]
    fn test_formats() {
        let r = rules(json!({
            "email": { "format": "email" },
            "ref": { "format": "uuid" },
            "day": { "format": "date" },
            "at": { "format": "datetime" }
        }));
        let good = body(json!({
            "email": "a@example.com",
            "ref": "550e8400-e29b-41d4-a716-446655440000",
            "day": "2024-02-29",
            "at": "2024-02-29T10:00:00Z"
        }));
        assert!(RequestValidator::validate(&good, &r).is_ok());
        for (k, bad) in [("email", "a@b"), ("ref", "nope"), ("day", "2023-02-29"), ("at", "yesterday")] {
            let mut b = good.clone();
            b.insert(k.to_string(), json!(bad));
            assert!(RequestValidator::validate(&b, &r).is_err(), "{} accepted {}", k, bad);
        }
    }

    #[test]
    fn test_allowed_and_range() {
        let r = rules(json!({
            "status": { "allowed": ["draft", "live"] },
            "qty": { "minimum": 1, "maximum": 10 }
        }));
        assert!(RequestValidator::validate(&body(json!({ "status": "live", "qty": 10 })), &r).is_ok());
        assert!(RequestValidator::validate(&body(json!({ "status": "gone" })), &r).is_err());
        assert!(RequestValidator::validate(&body(json!({ "qty": 0 })), &r).is_err());
    }
}
