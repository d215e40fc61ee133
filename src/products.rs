use crate::error::ConfigError;
use crate::store::{ArticleTable, SourceColumn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a comma-separated tag entry becomes a selectable product token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TokenGranularity {
    /// Whole trimmed entry, e.g. `vSAN disk failure`.
    #[default]
    Phrase,
    /// First whitespace-delimited word of the entry, e.g. `vSAN`.
    FirstWord,
}

impl TokenGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phrase => "phrase",
            Self::FirstWord => "first-word",
        }
    }

    pub fn parse_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "phrase" => Ok(Self::Phrase),
            "first-word" | "first_word" | "word" => Ok(Self::FirstWord),
            other => Err(ConfigError::UnknownValue {
                kind: "token granularity",
                value: other.to_string(),
            }),
        }
    }
}

/// Sorted, de-duplicated product tokens derived once from a loaded table.
#[derive(Debug, Clone, Serialize)]
pub struct ProductIndex {
    column: SourceColumn,
    granularity: TokenGranularity,
    tokens: Vec<String>,
}

impl ProductIndex {
    pub fn build(table: &ArticleTable, column: SourceColumn, granularity: TokenGranularity) -> Self {
        Self {
            column,
            granularity,
            tokens: extract_tokens(table, column, granularity),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn column(&self) -> SourceColumn {
        self.column
    }

    pub fn granularity(&self) -> TokenGranularity {
        self.granularity
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.binary_search_by(|t| t.as_str().cmp(token)).is_ok()
    }
}

pub fn extract_tokens(
    table: &ArticleTable,
    column: SourceColumn,
    granularity: TokenGranularity,
) -> Vec<String> {
    let mut tokens = BTreeSet::new();
    for record in table.rows() {
        let value = record.field(column);
        if value.trim().is_empty() {
            continue;
        }
        for piece in value.split(',') {
            let piece = piece.trim();
            let token = match granularity {
                TokenGranularity::Phrase => Some(piece),
                TokenGranularity::FirstWord => piece.split_whitespace().next(),
            };
            if let Some(token) = token.filter(|t| !t.is_empty()) {
                tokens.insert(token.to_string());
            }
        }
    }
    tokens.into_iter().collect()
}
