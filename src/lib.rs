pub mod advisory;
pub mod config;
pub mod error;
pub mod products;
pub mod query;
pub mod report;
pub mod scorer;
pub mod store;

use crate::config::FinderConfig;
use crate::error::{LoadError, QueryError};
use crate::products::ProductIndex;
use crate::query::{CancelToken, QueryEngine};
use crate::report::QueryReport;
use crate::scorer::{CacheStats, Scorer};
use crate::store::{ArticleTable, SourceColumn};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Snapshot of what is loaded and how queries are configured.
#[derive(Debug, Clone, Serialize)]
pub struct FinderStatus {
    pub data_path: String,
    pub rows: usize,
    pub missing_fields: usize,
    pub loaded_at: DateTime<Utc>,
    pub content_hash: String,
    pub has_complexity_column: bool,
    pub filter_setting: &'static str,
    pub filter_column: &'static str,
    pub granularity: &'static str,
    pub products: usize,
    pub threshold: u8,
    pub cache: CacheStats,
}

/// Loaded table, derived product list and score memo for one process.
///
/// Cloning shares all three; the table is never mutated in place, a reload
/// swaps in a new one.
#[derive(Clone)]
pub struct KbFinder {
    config: FinderConfig,
    table: Arc<ArticleTable>,
    products: Arc<ProductIndex>,
    scorer: Arc<Scorer>,
}

impl KbFinder {
    pub fn open(config: FinderConfig) -> Result<Self, LoadError> {
        let table = ArticleTable::load(&config.data_path)?;
        Ok(Self::from_table(config, table))
    }

    pub fn from_table(config: FinderConfig, table: ArticleTable) -> Self {
        let column = config.filter_column.resolve(&table);
        let products = ProductIndex::build(&table, column, config.granularity);
        let scorer = Scorer::new(config.cache_capacity);
        Self {
            config,
            table: Arc::new(table),
            products: Arc::new(products),
            scorer: Arc::new(scorer),
        }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn table(&self) -> &ArticleTable {
        &self.table
    }

    pub fn products(&self) -> &ProductIndex {
        &self.products
    }

    pub fn filter_column(&self) -> SourceColumn {
        self.products.column()
    }

    pub fn engine(&self) -> QueryEngine<'_> {
        QueryEngine::new(&self.table, &self.scorer, self.config.threshold, self.filter_column())
    }

    pub fn search(&self, query: &str, product_filter: &str) -> QueryReport {
        let engine = self.engine();
        let matches = engine.find(query, product_filter);
        let candidates = engine.candidates(product_filter).len();
        QueryReport::build(query, product_filter, candidates, &matches)
    }

    pub fn search_cancellable(
        &self,
        query: &str,
        product_filter: &str,
        cancel: &CancelToken,
    ) -> Result<QueryReport, QueryError> {
        let engine = self.engine();
        let matches = engine.find_cancellable(query, product_filter, cancel)?;
        let candidates = engine.candidates(product_filter).len();
        Ok(QueryReport::build(query, product_filter, candidates, &matches))
    }

    pub fn status(&self) -> FinderStatus {
        FinderStatus {
            data_path: self.table.path().display().to_string(),
            rows: self.table.len(),
            missing_fields: self.table.report().missing_fields.len(),
            loaded_at: self.table.loaded_at(),
            content_hash: self.table.content_hash().to_string(),
            has_complexity_column: self.table.has_complexity_column(),
            filter_setting: self.config().filter_column.as_str(),
            filter_column: self.filter_column().as_str(),
            granularity: self.products.granularity().as_str(),
            products: self.products.tokens().len(),
            threshold: self.config().threshold,
            cache: self.cache_stats(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.scorer.stats()
    }

    pub fn invalidate_cache(&self) {
        self.scorer.clear();
    }

    /// Re-reads the data file if its contents changed since load.
    /// Returns whether a new table was swapped in.
    pub fn reload_if_changed(&mut self) -> Result<bool, LoadError> {
        if !self.table.is_stale()? {
            return Ok(false);
        }
        let table = ArticleTable::load(self.table.path())?;
        let column = self.config.filter_column.resolve(&table);
        self.products = Arc::new(ProductIndex::build(&table, column, self.config.granularity));
        self.table = Arc::new(table);
        self.scorer.clear();
        info!(
            path = %self.table.path().display(),
            rows = self.table.len(),
            loaded_at = %self.table.loaded_at(),
            hash = %self.table.content_hash(),
            "Reloaded changed article table"
        );
        Ok(true)
    }
}
