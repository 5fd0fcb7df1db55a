//! Case conversion: path segments -> studly type names, relation names -> snake_case,
//! response keys snake_case -> camelCase and request keys camelCase -> snake_case.

use serde_json::{Map, Value};

/// Split an identifier into words on `_`, `-` and lower/digit -> upper transitions.
/// e.g. "product-image" -> ["product", "image"], "productImage" -> ["product", "Image"]
fn words(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    for (i, c) in s.char_indices() {
        if c == '_' || c == '-' {
            if i > start {
                out.push(&s[start..i]);
            }
            start = i + c.len_utf8();
            prev = None;
            continue;
        }
        if c.is_ascii_uppercase() {
            if let Some(p) = prev {
                if (p.is_ascii_lowercase() || p.is_ascii_digit()) && i > start {
                    out.push(&s[start..i]);
                    start = i;
                }
            }
        }
        prev = Some(c);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

/// Convert an identifier to StudlyCase (capitalized words, joined).
/// e.g. "product-image" -> "ProductImage", "order_line" -> "OrderLine", "catalog" -> "Catalog"
pub fn to_studly_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in words(s) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Convert a single identifier from snake_case to camelCase.
/// e.g. "user_id" -> "userId", "created_at" -> "createdAt"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert an identifier from camelCase or kebab-case to snake_case.
/// e.g. "userId" -> "user_id", "product-images" -> "product_images"
pub fn to_snake_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Convert all keys of a JSON object from snake_case to camelCase (in place).
/// Used for API responses so the client receives camelCase keys.
pub fn object_keys_to_camel_case(obj: &mut Map<String, Value>) {
    let keys: Vec<String> = obj.keys().cloned().collect();
    for k in keys {
        let camel = to_camel_case(&k);
        if camel != k {
            if let Some(v) = obj.remove(&k) {
                obj.insert(camel, v);
            }
        }
    }
}

/// Convert all keys of a JSON object from camelCase to snake_case (in place).
/// Used for request bodies so we use snake_case for column names.
pub fn object_keys_to_snake_case(obj: &mut Map<String, Value>) {
    let keys: Vec<String> = obj.keys().cloned().collect();
    for k in keys {
        let snake = to_snake_case(&k);
        if snake != k {
            if let Some(v) = obj.remove(&k) {
                obj.insert(snake, v);
            }
        }
    }
}

/// Apply camelCase conversion to a Value. If it's an object, converts its keys; otherwise no-op.
pub fn value_keys_to_camel_case(value: &mut Value) {
    if let Value::Object(ref mut map) = value {
        object_keys_to_camel_case(map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_studly_from_kebab_and_snake() {
        assert_eq!(to_studly_case("catalog"), "Catalog");
        assert_eq!(to_studly_case("product-image"), "ProductImage");
        assert_eq!(to_studly_case("order_line"), "OrderLine");
        assert_eq!(to_studly_case("productImage"), "ProductImage");
    }

    #[test]
    fn test_studly_ignores_repeated_separators() {
        assert_eq!(to_studly_case("__a--b_"), "AB");
        assert_eq!(to_studly_case(""), "");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("images"), "images");
        assert_eq!(to_snake_case("product-images"), "product_images");
        assert_eq!(to_snake_case("productImages"), "product_images");
        assert_eq!(to_snake_case("Variant2Options"), "variant2_options");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("user_id"), "userId");
        assert_eq!(to_camel_case("created_at"), "createdAt");
        assert_eq!(to_camel_case("id"), "id");
    }

    #[test]
    fn test_object_keys_round_trip_direction() {
        let mut obj = Map::new();
        obj.insert("productId".into(), Value::from(1));
        object_keys_to_snake_case(&mut obj);
        assert!(obj.contains_key("product_id"));
        object_keys_to_camel_case(&mut obj);
        assert!(obj.contains_key("productId"));
    }
}
