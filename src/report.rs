use crate::advisory::{advise, Advisory, AdvisoryLevel};
use crate::query::ArticleMatch;
use serde::Serialize;
use std::fmt::Write;

pub const NO_URL_MARKER: &str = "No URL";
pub const NO_MATCHES_MESSAGE: &str = "No matching KB articles found.";

/// One result row as the presentation layer sees it.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub article_id: String,
    pub title: String,
    pub url: String,
    pub product: String,
    pub score: u8,
    pub complexity: &'static str,
    pub advisory: Advisory,
}

impl From<&ArticleMatch<'_>> for ArticleView {
    fn from(m: &ArticleMatch<'_>) -> Self {
        Self {
            article_id: m.record.article_id.clone(),
            title: m.record.title.clone(),
            url: m
                .record
                .url
                .clone()
                .unwrap_or_else(|| NO_URL_MARKER.to_string()),
            product: m.record.product.clone(),
            score: m.score,
            complexity: m.record.complexity.as_str(),
            advisory: advise(m.record.complexity),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub query: String,
    pub product_filter: String,
    pub candidates: usize,
    pub matches: Vec<ArticleView>,
}

impl QueryReport {
    pub fn build(query: &str, product_filter: &str, candidates: usize, matches: &[ArticleMatch<'_>]) -> Self {
        Self {
            query: query.to_string(),
            product_filter: product_filter.to_string(),
            candidates,
            matches: matches.iter().map(ArticleView::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn render_text(&self) -> String {
        if self.matches.is_empty() {
            return format!("{NO_MATCHES_MESSAGE}\n");
        }
        let mut out = String::from("Matching KB Articles:\n");
        for view in &self.matches {
            let _ = writeln!(out, "Article ID: {}", view.article_id);
            let _ = writeln!(out, "Resolution: {}", view.title);
            let _ = writeln!(out, "URL:        {}", view.url);
            if !view.product.is_empty() {
                let _ = writeln!(out, "Product:    {}", view.product);
            }
            let _ = writeln!(out, "Score:      {}", view.score);
            let _ = writeln!(out, "Complexity: {}", view.complexity);
            let prefix = match view.advisory.level {
                AdvisoryLevel::Warning => "WARNING: ",
                AdvisoryLevel::Info => "Note: ",
                AdvisoryLevel::Unspecified => "",
            };
            let _ = writeln!(out, "{prefix}{}", view.advisory.message);
            out.push_str("---\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ArticleRecord;

    #[test]
    fn missing_url_uses_marker() {
        let record = ArticleRecord::new("KB1", "Fix", "disk");
        let view = ArticleView::from(&ArticleMatch { record: &record, score: 100 });
        assert_eq!(view.url, NO_URL_MARKER);
        assert_eq!(view.advisory.level, AdvisoryLevel::Unspecified);
    }

    #[test]
    fn empty_report_renders_no_match_message() {
        let report = QueryReport::build("disk", "All", 3, &[]);
        assert!(report.is_empty());
        assert_eq!(report.render_text(), "No matching KB articles found.\n");
    }

    #[test]
    fn render_includes_escalation_warning() {
        let record = ArticleRecord::new("KB1001", "Replace failed disk", "vsan disk failure")
            .with_url("https://kb.example/1001")
            .with_complexity("Yes ");
        let report = QueryReport::build("disk", "All", 1, &[ArticleMatch { record: &record, score: 100 }]);
        let text = report.render_text();
        assert!(text.contains("Article ID: KB1001"));
        assert!(text.contains("https://kb.example/1001"));
        assert!(text.contains("WARNING: "));
        assert!(text.contains("Complexity: yes"));
    }

    #[test]
    fn serializes_advisory_level() {
        let record = ArticleRecord::new("KB2", "t", "k").with_complexity("no");
        let view = ArticleView::from(&ArticleMatch { record: &record, score: 90 });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["advisory"]["level"], "info");
        assert_eq!(json["url"], "No URL");
        assert_eq!(json["complexity"], "no");
    }
}
