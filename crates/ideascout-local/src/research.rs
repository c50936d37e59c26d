//! Keyword -> search -> scrape -> chunked summarize -> merge.
//!
//! Every outbound call is sequential and every size is capped by [`ResearchLimits`]; there
//! is no fan-out and no admission control beyond those caps.

use crate::chunk::chunk_text;
use crate::extract::page_text;
use crate::retry::CompletionCaller;
use crate::textprep::{keywords_label, truncate_chars};
use ideascout_core::{
    ChatMessage, Error, ResearchReport, Result, ScrapeProvider, SearchItem, SearchProvider,
    SearchQuery,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_RESULTS_SUMMARY: &str = "No results found.";
pub const NO_RELEVANT_DATA_SUMMARY: &str = "No relevant data found from scraped pages.";
pub const NO_SUMMARY: &str = "No summary generated.";

pub const CHUNK_INSTRUCTION: &str = "Summarize this competitor & market data clearly.";

pub const MERGE_INSTRUCTION: &str = "You are a business research assistant. Combine these summaries into a single structured **business research report**.

Rules:
- Markdown format
- Headings (#, ##, ###)
- Lists and bullets
- Bold/italic emphasis
- Clean, professional style";

/// Search phrase sent to the provider for a keyword label.
pub fn search_phrase(keywords: &str) -> String {
    format!("market research, competitors, trends for: {keywords}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchLimits {
    /// Search results scraped per request.
    pub max_pages: usize,
    pub max_chars_per_page: usize,
    /// Scraping stops (and the text is cut) once this many chars are collected.
    pub max_total_chars: usize,
    pub chunk_chars: usize,
}

impl Default for ResearchLimits {
    fn default() -> Self {
        Self {
            max_pages: 1,
            max_chars_per_page: 12_000,
            max_total_chars: 20_000,
            chunk_chars: 8_000,
        }
    }
}

#[derive(Clone)]
pub struct ResearchPipeline {
    search: Arc<dyn SearchProvider>,
    scrape: Arc<dyn ScrapeProvider>,
    completions: CompletionCaller,
    limits: ResearchLimits,
}

impl ResearchPipeline {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        scrape: Arc<dyn ScrapeProvider>,
        completions: CompletionCaller,
        limits: ResearchLimits,
    ) -> Self {
        Self {
            search,
            scrape,
            completions,
            limits,
        }
    }

    pub fn limits(&self) -> &ResearchLimits {
        &self.limits
    }

    /// Research one query.
    ///
    /// Empty searches and empty scrapes are not errors: they return a report whose summary
    /// says so. Errors are `InvalidInput` for an empty or whitespace-only query (it is
    /// rejected, not researched as "general research"), quota errors from the search or
    /// completion providers, and anything else a provider surfaces.
    pub async fn run(&self, query: &str) -> Result<ResearchReport> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("missing query text".to_string()));
        }
        info!(query, "research request");

        let keywords = keywords_label(query);
        let resp = self
            .search
            .search(&SearchQuery {
                query: search_phrase(&keywords),
                max_results: None,
            })
            .await?;
        debug!(
            provider = %resp.provider,
            results = resp.web.len(),
            "search complete"
        );
        if resp.web.is_empty() {
            return Ok(ResearchReport {
                keywords,
                summary: NO_RESULTS_SUMMARY.to_string(),
            });
        }

        let scraped = self.scrape_top(&resp.web).await;
        if scraped.trim().is_empty() {
            return Ok(ResearchReport {
                keywords,
                summary: NO_RELEVANT_DATA_SUMMARY.to_string(),
            });
        }
        info!(chars = scraped.chars().count(), "final scraped text length");

        let summary = self.summarize(&scraped).await?;
        Ok(ResearchReport { keywords, summary })
    }

    /// Scrape the first `max_pages` results. Failures are logged and skipped.
    async fn scrape_top(&self, results: &[SearchItem]) -> String {
        let mut out = String::new();
        let mut total = 0usize;
        for item in results.iter().take(self.limits.max_pages) {
            let Some(hit) = item.as_web() else {
                continue;
            };
            let page = match self.scrape.scrape(&hit.url).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(url = %hit.url, error = %e, "failed to scrape url");
                    continue;
                }
            };
            let text = page_text(&page);
            let text = truncate_chars(&text, self.limits.max_chars_per_page);
            if !text.trim().is_empty() {
                let chars = text.chars().count();
                info!(url = %hit.url, chars, "scraped page");
                out.push_str(text);
                out.push_str("\n\n");
                total += chars + 2;
            }
            if total >= self.limits.max_total_chars {
                out = truncate_chars(&out, self.limits.max_total_chars).to_string();
                break;
            }
        }
        out
    }

    /// Summarize each chunk in order, then merge the partials into one report.
    async fn summarize(&self, text: &str) -> Result<String> {
        let chunks = chunk_text(text, self.limits.chunk_chars);
        let mut partials = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let content = self
                .completions
                .call(&[
                    ChatMessage::system(CHUNK_INSTRUCTION),
                    ChatMessage::user(*chunk),
                ])
                .await?;
            debug!(chunk = i, of = chunks.len(), "chunk summarized");
            partials.push(content.trim().to_string());
        }

        let merged = self
            .completions
            .call(&[
                ChatMessage::system(MERGE_INSTRUCTION),
                ChatMessage::user(partials.join("\n\n")),
            ])
            .await?;
        let merged = merged.trim();
        Ok(if merged.is_empty() {
            NO_SUMMARY.to_string()
        } else {
            merged.to_string()
        })
    }
}
