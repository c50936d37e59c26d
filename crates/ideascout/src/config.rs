//! Command-line and environment configuration.
//!
//! Provider credentials and endpoints are read from the environment by the provider
//! clients themselves (`IDEASCOUT_*` first, vendor names as fallback). The knobs here are
//! the ones worth overriding per run.

use ideascout_core::{DocumentStore, Error, Result};
use ideascout_local::convex::ConvexStore;
use ideascout_local::env_any;
use ideascout_local::firecrawl::FirecrawlClient;
use ideascout_local::jsonl_store::JsonlStore;
use ideascout_local::openai_compat::OpenAiCompatClient;
use ideascout_local::research::{ResearchLimits, ResearchPipeline};
use ideascout_local::retry::{CompletionCaller, LinearBackoff};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(clap::Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Chat model for chunk summaries and the merged report.
    #[arg(long, env = "IDEASCOUT_OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,
    /// Search results to scrape per request.
    #[arg(long, default_value_t = 1)]
    pub max_pages: usize,
    #[arg(long, default_value_t = 12_000)]
    pub max_chars_per_page: usize,
    #[arg(long, default_value_t = 20_000)]
    pub max_total_chars: usize,
    /// Characters per summarization chunk.
    #[arg(long, default_value_t = 8_000)]
    pub chunk_size: usize,
    /// Attempts per completion call, counting the first one.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,
    /// Attempt N waits N times this long after a rate-limit/quota error.
    #[arg(long, default_value_t = 1_000)]
    pub retry_base_ms: u64,
}

impl Default for PipelineArgs {
    fn default() -> Self {
        let limits = ResearchLimits::default();
        let backoff = LinearBackoff::default();
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_pages: limits.max_pages,
            max_chars_per_page: limits.max_chars_per_page,
            max_total_chars: limits.max_total_chars,
            chunk_size: limits.chunk_chars,
            retries: backoff.max_attempts,
            retry_base_ms: backoff.step.as_millis() as u64,
        }
    }
}

impl PipelineArgs {
    pub fn limits(&self) -> ResearchLimits {
        ResearchLimits {
            max_pages: self.max_pages,
            max_chars_per_page: self.max_chars_per_page,
            max_total_chars: self.max_total_chars,
            chunk_chars: self.chunk_size.max(1),
        }
    }

    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff {
            max_attempts: self.retries.max(1),
            step: Duration::from_millis(self.retry_base_ms),
        }
    }

    /// Wire Firecrawl (search + scrape) and the OpenAI-compatible client into a pipeline.
    pub fn build(&self, client: reqwest::Client) -> Result<ResearchPipeline> {
        let firecrawl = Arc::new(FirecrawlClient::from_env(client.clone())?);
        let llm = Arc::new(OpenAiCompatClient::from_env(client)?);
        Ok(ResearchPipeline::new(
            firecrawl.clone(),
            firecrawl,
            CompletionCaller::new(llm, self.model.clone(), self.backoff()),
            self.limits(),
        ))
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// Convex when `IDEASCOUT_CONVEX_URL` is set, otherwise the local JSONL file.
    #[default]
    Auto,
    Convex,
    Jsonl,
    Off,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Where successful research reports are persisted.
    #[arg(long = "store", env = "IDEASCOUT_STORE", value_enum, default_value_t = StoreKind::Auto)]
    pub kind: StoreKind,
    /// JSONL file for `--store jsonl` (and `auto` without Convex).
    #[arg(long = "store-path", env = "IDEASCOUT_STORE_PATH")]
    pub path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(default_store_path)
    }

    pub fn build(&self, client: reqwest::Client) -> Result<Option<Arc<dyn DocumentStore>>> {
        let use_convex = match self.kind {
            StoreKind::Off => return Ok(None),
            StoreKind::Convex => true,
            StoreKind::Jsonl => false,
            StoreKind::Auto => ConvexStore::configured(),
        };
        if use_convex {
            return Ok(Some(Arc::new(ConvexStore::from_env(client)?)));
        }
        let path = self.resolved_path().ok_or_else(|| {
            Error::NotConfigured("no data directory; set IDEASCOUT_STORE_PATH".to_string())
        })?;
        Ok(Some(Arc::new(JsonlStore::new(path))))
    }
}

/// `<data_local_dir>/ideascout/research.jsonl`.
pub fn default_store_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("ideascout").join("research.jsonl"))
}

/// What `doctor` reports: presence only, never values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Configured {
    pub firecrawl: bool,
    pub openai: bool,
    pub openai_base_url: bool,
    pub convex: bool,
}

impl Configured {
    pub fn from_env() -> Self {
        Self {
            firecrawl: env_any(&["IDEASCOUT_FIRECRAWL_API_KEY", "FIRECRAWL_API_KEY"]).is_some(),
            openai: env_any(&["IDEASCOUT_OPENAI_API_KEY", "OPENAI_API_KEY"]).is_some(),
            openai_base_url: env_any(&["IDEASCOUT_OPENAI_BASE_URL"]).is_some(),
            convex: ConvexStore::configured(),
        }
    }

    /// Both providers are usable: Firecrawl has a key and the LLM has a key or a gateway.
    pub fn ready(&self) -> bool {
        self.firecrawl && (self.openai || self.openai_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_defaults() {
        let a = PipelineArgs::default();
        assert_eq!(a.limits(), ResearchLimits::default());
        assert_eq!(a.backoff(), LinearBackoff::default());
        assert_eq!(a.model, DEFAULT_MODEL);
    }

    #[test]
    fn zero_retries_and_chunk_size_are_clamped() {
        let a = PipelineArgs {
            retries: 0,
            chunk_size: 0,
            ..PipelineArgs::default()
        };
        assert_eq!(a.backoff().max_attempts, 1);
        assert_eq!(a.limits().chunk_chars, 1);
    }

    #[test]
    fn store_off_builds_nothing_and_jsonl_uses_the_given_path() {
        let off = StoreArgs {
            kind: StoreKind::Off,
            path: None,
        };
        assert!(off.build(reqwest::Client::new()).unwrap().is_none());

        let jsonl = StoreArgs {
            kind: StoreKind::Jsonl,
            path: Some(PathBuf::from("/tmp/ideascout-test/research.jsonl")),
        };
        let store = jsonl.build(reqwest::Client::new()).unwrap().unwrap();
        assert_eq!(store.name(), "jsonl");
    }

    #[test]
    fn default_store_path_ends_in_research_jsonl() {
        if let Some(p) = default_store_path() {
            assert!(p.ends_with("ideascout/research.jsonl"), "{p:?}");
        }
    }
}
