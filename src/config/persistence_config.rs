use super::{EnvLookup, parse_var};
use anyhow::Result;

/// Prediction history storage
#[derive(Debug, Clone)]
pub struct PersistenceEnvConfig {
    pub database_url: String,
    /// Records returned per kind when reading history.
    pub history_limit: usize,
}

impl PersistenceEnvConfig {
    pub fn from_lookup(lookup: &EnvLookup) -> Result<Self> {
        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://data/stockcast.db".to_string()),
            history_limit: parse_var(lookup, "HISTORY_LIMIT", 50usize)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::lookup_from;

    #[test]
    fn test_persistence_defaults() {
        let config = PersistenceEnvConfig::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, "sqlite://data/stockcast.db");
        assert_eq!(config.history_limit, 50);

        assert!(PersistenceEnvConfig::from_lookup(&lookup_from(&[("HISTORY_LIMIT", "x")])).is_err());
    }
}
