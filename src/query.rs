use crate::error::QueryError;
use crate::scorer::Scorer;
use crate::store::{ArticleRecord, ArticleTable, SourceColumn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Product filter value meaning "no product restriction".
pub const ALL_PRODUCTS: &str = "All";

#[derive(Debug, Clone)]
pub struct ArticleMatch<'a> {
    pub record: &'a ArticleRecord,
    pub score: u8,
}

/// Shared flag a caller flips to stop an in-flight scan.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct QueryEngine<'a> {
    table: &'a ArticleTable,
    scorer: &'a Scorer,
    threshold: u8,
    filter_column: SourceColumn,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        table: &'a ArticleTable,
        scorer: &'a Scorer,
        threshold: u8,
        filter_column: SourceColumn,
    ) -> Self {
        Self {
            table,
            scorer,
            threshold,
            filter_column,
        }
    }

    /// Rows whose keywords score strictly above the threshold, in table order.
    /// An empty or whitespace-only query matches nothing; it is not a wildcard.
    pub fn find(&self, query: &str, product_filter: &str) -> Vec<ArticleMatch<'a>> {
        self.scan(query, product_filter, None).unwrap_or_default()
    }

    pub fn find_cancellable(
        &self,
        query: &str,
        product_filter: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<ArticleMatch<'a>>, QueryError> {
        self.scan(query, product_filter, Some(cancel))
    }

    /// Rows that survive the product filter, before any scoring.
    pub fn candidates(&self, product_filter: &str) -> Vec<&'a ArticleRecord> {
        let rows = self.table.rows();
        if product_filter == ALL_PRODUCTS {
            return rows.iter().collect();
        }
        let needle = product_filter.to_lowercase();
        rows.iter()
            .filter(|r| r.field_lower(self.filter_column).contains(&needle))
            .collect()
    }

    fn scan(
        &self,
        query: &str,
        product_filter: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<ArticleMatch<'a>>, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let candidates = self.candidates(product_filter);
        let query_lower = query.to_lowercase();

        let scored: Vec<Option<ArticleMatch<'a>>> = candidates
            .par_iter()
            .map(|&record| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Err(QueryError::Cancelled);
                }
                let score = self.scorer.score(&query_lower, record.keywords_lower());
                Ok((score > self.threshold).then_some(ArticleMatch { record, score }))
            })
            .collect::<Result<Vec<_>, QueryError>>()?;

        let matches: Vec<ArticleMatch<'a>> = scored.into_iter().flatten().collect();
        debug!(
            query = %query_lower,
            product_filter,
            candidates = candidates.len(),
            matched = matches.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query complete"
        );
        Ok(matches)
    }
}
