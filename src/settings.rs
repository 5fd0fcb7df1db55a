//! Process settings from environment (a `.env` file is honoured when present).

use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Entity declaration file (`.json`, `.yaml` or `.yml`).
    pub entity_config: PathBuf,
    pub bind_addr: String,
    pub max_body_bytes: usize,
    pub db_max_connections: u32,
}

impl Settings {
    pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

    /// Read settings; loads `.env` first if it exists. Unparseable numbers fall back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Settings {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/pivot".into()),
            entity_config: lookup("ENTITY_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("entities.json")),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            max_body_bytes: lookup("MAX_BODY_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(Self::DEFAULT_MAX_BODY_BYTES),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let s = Settings::from_lookup(|_| None);
        assert_eq!(s.database_url, "postgres://localhost/pivot");
        assert_eq!(s.entity_config, PathBuf::from("entities.json"));
        assert_eq!(s.bind_addr, "0.0.0.0:3000");
        assert_eq!(s.max_body_bytes, Settings::DEFAULT_MAX_BODY_BYTES);
        assert_eq!(s.db_max_connections, 5);
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let env: HashMap<&str, &str> = [
            ("ENTITY_CONFIG", "conf/entities.yaml"),
            ("MAX_BODY_BYTES", "2048"),
            ("DB_MAX_CONNECTIONS", "lots"),
        ]
        .into_iter()
        .collect();
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.entity_config, PathBuf::from("conf/entities.yaml"));
        assert_eq!(s.max_body_bytes, 2048);
        assert_eq!(s.db_max_connections, 5);
    }
}
