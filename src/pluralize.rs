//! Singularization of English nouns used when deriving entity type names
//!
//! Rules are fixed and locale-free so the same segment always yields the same name.

/// Utility for converting plural path segments to their singular form
pub struct Pluralizer;

impl Pluralizer {
    /// Convert a plural noun to its singular form
    ///
    /// Only the trailing word of a compound segment is affected, separators are preserved.
    ///
    /// # Examples
    ///
    /// ```
    /// use pivot_rest::pluralize::Pluralizer;
    ///
    /// assert_eq!(Pluralizer::singularize("products"), "product");
    /// assert_eq!(Pluralizer::singularize("categories"), "category");
    /// assert_eq!(Pluralizer::singularize("addresses"), "address");
    /// assert_eq!(Pluralizer::singularize("product-images"), "product-image");
    /// ```
    pub fn singularize(plural: &str) -> String {
        if plural.is_empty() {
            return plural.to_string();
        }

        let lower = plural.to_ascii_lowercase();
        if let Some((irregular_plural, singular)) = Self::irregular(&lower) {
            let stem = &plural[..plural.len() - irregular_plural.len()];
            return format!("{}{}", stem, singular);
        }

        match plural {
            // Words ending in ies -> y
            s if s.ends_with("ies") && s.len() > 3 => {
                format!("{}y", &s[..s.len() - 3])
            }

            // Words ending in sses, shes, ches, xes, zes -> remove es
            s if s.len() > 4
                && (s.ends_with("sses")
                    || s.ends_with("shes")
                    || s.ends_with("ches")
                    || s.ends_with("xes")
                    || s.ends_with("zes")) =>
            {
                s[..s.len() - 2].to_string()
            }

            // Words ending in oes -> o
            s if s.ends_with("oes") && s.len() > 3 => s[..s.len() - 2].to_string(),

            // Words already singular with a trailing s
            s if s.ends_with("ss") || s.ends_with("us") || s.ends_with("is") => s.to_string(),

            // Default: remove trailing s
            s if s.ends_with('s') && s.len() > 1 => s[..s.len() - 1].to_string(),

            // No plural form detected
            s => s.to_string(),
        }
    }

    fn irregular(lower: &str) -> Option<(&'static str, &'static str)> {
        const IRREGULAR: &[(&str, &str)] = &[
            ("people", "person"),
            ("children", "child"),
            ("men", "man"),
            ("women", "woman"),
        ];
        IRREGULAR.iter().find_map(|(plural, singular)| {
            let boundary = lower.len() == plural.len()
                || lower
                    .as_bytes()
                    .get(lower.len().wrapping_sub(plural.len() + 1))
                    .is_some_and(|b| *b == b'-' || *b == b'_');
            (lower.ends_with(plural) && boundary).then_some((*plural, *singular))
        })
    }
}
