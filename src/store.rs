use crate::error::LoadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Columns every data file must carry (after header trimming).
pub const REQUIRED_COLUMNS: [&str; 4] = ["article_id", "title", "keywords", "url"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Yes,
    No,
    #[default]
    Unspecified,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Unspecified => "unspecified",
        }
    }

    pub fn parse_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "yes" => Self::Yes,
            "no" => Self::No,
            _ => Self::Unspecified,
        }
    }
}

/// Which text field of a record the product filter and product index read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceColumn {
    Keywords,
    Product,
}

impl SourceColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keywords => "keywords",
            Self::Product => "product",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ArticleRecord {
    pub article_id: String,
    pub title: String,
    pub keywords: String,
    pub product: String,
    pub url: Option<String>,
    pub complexity: Complexity,
    #[serde(skip)]
    keywords_lower: String,
    #[serde(skip)]
    product_lower: String,
}

impl ArticleRecord {
    pub fn new(article_id: &str, title: &str, keywords: &str) -> Self {
        Self {
            article_id: article_id.to_string(),
            title: title.to_string(),
            keywords: keywords.to_string(),
            product: String::new(),
            url: None,
            complexity: Complexity::Unspecified,
            keywords_lower: keywords.to_lowercase(),
            product_lower: String::new(),
        }
    }

    pub fn with_product(mut self, product: &str) -> Self {
        self.product = product.to_string();
        self.product_lower = product.to_lowercase();
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        let url = url.trim();
        self.url = (!url.is_empty()).then(|| url.to_string());
        self
    }

    pub fn with_complexity(mut self, raw: &str) -> Self {
        self.complexity = Complexity::parse_str(raw);
        self
    }

    /// Lowercased keyword text, computed once when the record is built.
    pub fn keywords_lower(&self) -> &str {
        &self.keywords_lower
    }

    pub fn field(&self, column: SourceColumn) -> &str {
        match column {
            SourceColumn::Keywords => &self.keywords,
            SourceColumn::Product => &self.product,
        }
    }

    pub fn field_lower(&self, column: SourceColumn) -> &str {
        match column {
            SourceColumn::Keywords => &self.keywords_lower,
            SourceColumn::Product => &self.product_lower,
        }
    }
}

/// A cell that was absent or blank where a value was expected.
/// Recorded, substituted with an empty string, never fatal.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MissingField {
    /// 1-based data row (header excluded).
    pub row: usize,
    pub column: &'static str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub rows: usize,
    pub missing_fields: Vec<MissingField>,
}

/// Immutable in-memory article table. No write path exists after load.
#[derive(Debug, Clone)]
pub struct ArticleTable {
    path: PathBuf,
    rows: Vec<ArticleRecord>,
    has_product_column: bool,
    has_complexity_column: bool,
    content_hash: String,
    loaded_at: DateTime<Utc>,
    report: LoadReport,
}

struct ColumnMap {
    article_id: usize,
    title: usize,
    keywords: usize,
    url: usize,
    product: Option<usize>,
    complexity: Option<usize>,
}

impl ColumnMap {
    fn resolve(path: &Path, headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let position = |name: &str| names.iter().position(|n| n.eq_ignore_ascii_case(name));
        let required = |name: &'static str| {
            position(name).ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
        };

        Ok(Self {
            article_id: required(REQUIRED_COLUMNS[0])?,
            title: required(REQUIRED_COLUMNS[1])?,
            keywords: required(REQUIRED_COLUMNS[2])?,
            url: required(REQUIRED_COLUMNS[3])?,
            product: position("product"),
            complexity: position("complexity"),
        })
    }
}

impl ArticleTable {
    /// Reads and parses the delimited file at `path`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(path, &bytes)?;
        info!(
            path = %path.display(),
            rows = table.rows.len(),
            missing_fields = table.report.missing_fields.len(),
            "Loaded article table"
        );
        Ok(table)
    }

    /// Parses CSV bytes; `path` is only used for diagnostics.
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self, LoadError> {
        let csv_err = |source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        let headers = reader.headers().map_err(csv_err)?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::Empty(path.to_path_buf()));
        }
        let columns = ColumnMap::resolve(path, &headers)?;

        let mut rows = Vec::new();
        let mut report = LoadReport::default();

        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(csv_err)?;
            let row = i + 1;
            let cell = |idx: usize| record.get(idx).unwrap_or("");

            let article_id = cell(columns.article_id).trim();
            if article_id.is_empty() {
                report.missing_fields.push(MissingField { row, column: "article_id" });
            }
            let keywords = cell(columns.keywords);
            if keywords.trim().is_empty() {
                report.missing_fields.push(MissingField { row, column: "keywords" });
            }

            let mut article = ArticleRecord::new(article_id, cell(columns.title).trim(), keywords)
                .with_url(cell(columns.url));
            if let Some(idx) = columns.product {
                article = article.with_product(cell(idx));
            }
            if let Some(idx) = columns.complexity {
                article = article.with_complexity(cell(idx));
            }
            rows.push(article);
        }

        report.rows = rows.len();
        if !report.missing_fields.is_empty() {
            warn!(
                path = %path.display(),
                count = report.missing_fields.len(),
                "Rows with missing fields were substituted with empty values"
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            rows,
            has_product_column: columns.product.is_some(),
            has_complexity_column: columns.complexity.is_some(),
            content_hash: compute_hash(bytes),
            loaded_at: Utc::now(),
            report,
        })
    }

    /// Builds a table from records already in memory (no backing file).
    pub fn from_records(rows: Vec<ArticleRecord>) -> Self {
        let has_product_column = rows.iter().any(|r| !r.product.is_empty());
        let has_complexity_column = rows.iter().any(|r| r.complexity != Complexity::Unspecified);
        Self {
            path: PathBuf::new(),
            report: LoadReport {
                rows: rows.len(),
                missing_fields: Vec::new(),
            },
            rows,
            has_product_column,
            has_complexity_column,
            content_hash: String::new(),
            loaded_at: Utc::now(),
        }
    }

    pub fn rows(&self) -> &[ArticleRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_product_column(&self) -> bool {
        self.has_product_column
    }

    pub fn has_complexity_column(&self) -> bool {
        self.has_complexity_column
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// True when the backing file's bytes no longer hash to what was loaded.
    pub fn is_stale(&self) -> Result<bool, LoadError> {
        if self.path.as_os_str().is_empty() {
            return Ok(false);
        }
        if !self.path.exists() {
            return Err(LoadError::NotFound(self.path.clone()));
        }
        let bytes = std::fs::read(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(compute_hash(&bytes) != self.content_hash)
    }
}

pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SAMPLE: &str = "article_id , title ,keywords, url ,product,Complexity\n\
        KB1001,Replace failed disk,vSAN disk failure timeout,https://kb.example/1001,vSAN,Yes \n\
        KB1002,Reset SSO password,vCenter login error,,vCenter,no\n";

    #[test]
    fn column_names_are_trimmed() {
        let table = ArticleTable::parse(Path::new("mem.csv"), SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].article_id, "KB1001");
        assert_eq!(table.rows()[0].title, "Replace failed disk");
        assert!(table.has_product_column());
        assert!(table.has_complexity_column());
    }

    #[test]
    fn blank_url_becomes_none() {
        let table = ArticleTable::parse(Path::new("mem.csv"), SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.rows()[0].url.as_deref(), Some("https://kb.example/1001"));
        assert_eq!(table.rows()[1].url, None);
    }

    #[test]
    fn complexity_is_trimmed_and_case_folded() {
        let table = ArticleTable::parse(Path::new("mem.csv"), SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.rows()[0].complexity, Complexity::Yes);
        assert_eq!(table.rows()[1].complexity, Complexity::No);
        assert_eq!(Complexity::parse_str("maybe"), Complexity::Unspecified);
        assert_eq!(Complexity::parse_str(""), Complexity::Unspecified);
    }

    #[test]
    fn short_row_is_padded_and_reported() {
        let data = "article_id,title,keywords,url\nKB1,Only title\nKB2,t,disk,\n";
        let table = ArticleTable::parse(Path::new("mem.csv"), data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].keywords, "");
        assert_eq!(
            table.report().missing_fields,
            vec![MissingField { row: 1, column: "keywords" }]
        );
        assert!(!table.has_product_column());
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let data = "article_id,title,url\nKB1,t,u\n";
        let err = ArticleTable::parse(Path::new("mem.csv"), data.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { column: "keywords", .. }));
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = ArticleTable::parse(Path::new("mem.csv"), b"").unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }

    #[test]
    fn load_missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArticleTable::load(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn stale_after_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.csv");
        fs::write(&path, SAMPLE).unwrap();

        let table = ArticleTable::load(&path).unwrap();
        assert!(!table.is_stale().unwrap());

        fs::write(&path, format!("{SAMPLE}KB1003,t,esxi purple screen,,ESXi,\n")).unwrap();
        assert!(table.is_stale().unwrap());
    }

    #[test]
    fn hash_is_64_hex_chars() {
        let h = compute_hash(b"test");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
