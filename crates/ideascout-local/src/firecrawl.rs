use crate::env_any;
use ideascout_core::{
    Error, PageResult, Result, ScrapeProvider, SearchItem, SearchProvider, SearchQuery,
    SearchResponse,
};
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.firecrawl.dev";

fn firecrawl_api_key_from_env() -> Option<String> {
    env_any(&["IDEASCOUT_FIRECRAWL_API_KEY", "FIRECRAWL_API_KEY"])
}

fn firecrawl_endpoint_from_env() -> Option<String> {
    env_any(&["IDEASCOUT_FIRECRAWL_ENDPOINT"])
}

#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl FirecrawlClient {
    pub fn new(client: reqwest::Client, api_key: String, endpoint: &str) -> Result<Self> {
        let parsed = url::Url::parse(endpoint.trim())
            .map_err(|e| Error::NotConfigured(format!("firecrawl endpoint {endpoint:?}: {e}")))?;
        Ok(Self {
            client,
            api_key,
            endpoint: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = firecrawl_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured(
                "missing IDEASCOUT_FIRECRAWL_API_KEY (or FIRECRAWL_API_KEY)".to_string(),
            )
        })?;
        // Tests and self-hosted deployments point this at their own instance.
        let endpoint =
            firecrawl_endpoint_from_env().unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Self::new(client, api_key, &endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.endpoint))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }
}

/// 429 is a rate limit; 402 is Firecrawl's "out of credits". Both are quota signals.
fn is_quota_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::PAYMENT_REQUIRED
}

#[async_trait::async_trait]
impl SearchProvider for FirecrawlClient {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let mut body = serde_json::json!({ "query": q.query });
        if let Some(limit) = q.max_results {
            body["limit"] = serde_json::json!(limit);
        }

        let resp = self
            .post("/v2/search")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let status = resp.status();
        if is_quota_status(status) {
            return Err(Error::RateLimited(format!(
                "firecrawl search HTTP {status}"
            )));
        }
        if !status.is_success() {
            return Err(Error::Search(format!("firecrawl search HTTP {status}")));
        }

        let parsed: FirecrawlSearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        if !parsed.success {
            return Err(Error::Search(
                "firecrawl search returned success=false".to_string(),
            ));
        }

        let web = match parsed.data {
            Some(FirecrawlSearchData::Flat(items)) => items,
            Some(FirecrawlSearchData::Grouped { web }) => web,
            None => Vec::new(),
        };
        debug!(
            results = web.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "firecrawl search"
        );
        Ok(SearchResponse {
            web,
            provider: SearchProvider::name(self).to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ScrapeProvider for FirecrawlClient {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    async fn scrape(&self, url: &str) -> Result<PageResult> {
        let t0 = Instant::now();
        let body = serde_json::json!({
            "url": url,
            "formats": ["markdown"],
            "onlyMainContent": true
        });

        let resp = self
            .post("/v2/scrape")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Scrape(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Scrape(format!("firecrawl scrape HTTP {status}")));
        }

        let parsed: FirecrawlScrapeResponse = resp
            .json()
            .await
            .map_err(|e| Error::Scrape(e.to_string()))?;
        if !parsed.success {
            return Err(Error::Scrape(
                "firecrawl scrape returned success=false".to_string(),
            ));
        }

        debug!(
            url,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "firecrawl scrape"
        );
        Ok(PageResult::from(parsed.data.unwrap_or_default()))
    }
}

#[derive(Debug, Deserialize)]
struct FirecrawlSearchResponse {
    success: bool,
    data: Option<FirecrawlSearchData>,
}

/// v2 groups results by source (`{ "web": [...] }`); v1 returned a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FirecrawlSearchData {
    Flat(Vec<SearchItem>),
    Grouped {
        #[serde(default)]
        web: Vec<SearchItem>,
    },
}

#[derive(Debug, Deserialize)]
struct FirecrawlScrapeResponse {
    success: bool,
    data: Option<serde_json::Value>,
}
