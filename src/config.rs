use crate::error::ConfigError;
use crate::products::TokenGranularity;
use crate::store::{ArticleTable, SourceColumn};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_DATA_PATH: &str = "vmware_kb_articles.csv";
pub const DEFAULT_THRESHOLD: u8 = 70;
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Column used for product filtering and the product index.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterColumn {
    /// `product` when the table has that column, otherwise `keywords`.
    #[default]
    Auto,
    Product,
    Keywords,
}

impl FilterColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Product => "product",
            Self::Keywords => "keywords",
        }
    }

    pub fn parse_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "product" => Ok(Self::Product),
            "keywords" => Ok(Self::Keywords),
            other => Err(ConfigError::UnknownValue {
                kind: "filter column",
                value: other.to_string(),
            }),
        }
    }

    pub fn resolve(&self, table: &ArticleTable) -> SourceColumn {
        match self {
            Self::Product => SourceColumn::Product,
            Self::Keywords => SourceColumn::Keywords,
            Self::Auto if table.has_product_column() => SourceColumn::Product,
            Self::Auto => SourceColumn::Keywords,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinderConfig {
    pub data_path: PathBuf,
    /// Rows must score strictly above this to match.
    pub threshold: u8,
    /// Score memo size; 0 disables memoisation.
    pub cache_capacity: usize,
    pub granularity: TokenGranularity,
    pub filter_column: FilterColumn,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            threshold: DEFAULT_THRESHOLD,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            granularity: TokenGranularity::default(),
            filter_column: FilterColumn::default(),
        }
    }
}

impl FinderConfig {
    /// Defaults overridden by `KBFIND_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("KBFIND_DATA_PATH").filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("KBFIND_THRESHOLD") {
            match raw.trim().parse::<u8>() {
                Ok(v) if v <= 100 => config.threshold = v,
                _ => warn!(value = %raw, "Ignoring invalid KBFIND_THRESHOLD"),
            }
        }
        if let Some(raw) = lookup("KBFIND_CACHE_CAPACITY") {
            match raw.trim().parse::<usize>() {
                Ok(v) => config.cache_capacity = v,
                Err(_) => warn!(value = %raw, "Ignoring invalid KBFIND_CACHE_CAPACITY"),
            }
        }
        if let Some(raw) = lookup("KBFIND_TOKEN_GRANULARITY") {
            match TokenGranularity::parse_str(&raw) {
                Ok(v) => config.granularity = v,
                Err(e) => warn!(error = %e, "Ignoring KBFIND_TOKEN_GRANULARITY"),
            }
        }
        if let Some(raw) = lookup("KBFIND_FILTER_COLUMN") {
            match FilterColumn::parse_str(&raw) {
                Ok(v) => config.filter_column = v,
                Err(e) => warn!(error = %e, "Ignoring KBFIND_FILTER_COLUMN"),
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold > 100 {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = FinderConfig::from_lookup(lookup(&[]));
        assert_eq!(config.threshold, 70);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.granularity, TokenGranularity::Phrase);
        assert_eq!(config.filter_column, FilterColumn::Auto);
        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
    }

    #[test]
    fn env_overrides_apply() {
        let config = FinderConfig::from_lookup(lookup(&[
            ("KBFIND_DATA_PATH", "/srv/kb.csv"),
            ("KBFIND_THRESHOLD", "85"),
            ("KBFIND_CACHE_CAPACITY", "0"),
            ("KBFIND_TOKEN_GRANULARITY", "first-word"),
            ("KBFIND_FILTER_COLUMN", "keywords"),
        ]));
        assert_eq!(config.data_path, PathBuf::from("/srv/kb.csv"));
        assert_eq!(config.threshold, 85);
        assert_eq!(config.cache_capacity, 0);
        assert_eq!(config.granularity, TokenGranularity::FirstWord);
        assert_eq!(config.filter_column, FilterColumn::Keywords);
    }

    #[test]
    fn invalid_env_values_fall_back() {
        let config = FinderConfig::from_lookup(lookup(&[
            ("KBFIND_THRESHOLD", "150"),
            ("KBFIND_CACHE_CAPACITY", "lots"),
            ("KBFIND_FILTER_COLUMN", "title"),
        ]));
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.filter_column, FilterColumn::Auto);
    }

    #[test]
    fn validate_rejects_threshold_above_100() {
        let config = FinderConfig {
            threshold: 101,
            ..FinderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ThresholdOutOfRange(101)));
    }

    #[test]
    fn auto_column_follows_table_shape() {
        use crate::store::ArticleRecord;
        let with_product = ArticleTable::from_records(vec![
            ArticleRecord::new("KB1", "t", "k").with_product("vSAN"),
        ]);
        let without = ArticleTable::from_records(vec![ArticleRecord::new("KB1", "t", "k")]);
        assert_eq!(FilterColumn::Auto.resolve(&with_product), SourceColumn::Product);
        assert_eq!(FilterColumn::Auto.resolve(&without), SourceColumn::Keywords);
        assert_eq!(FilterColumn::Keywords.resolve(&with_product), SourceColumn::Keywords);
    }
}
