use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("scrape failed: {0}")]
    Scrape(String),
    #[error("llm failed: {0}")]
    Llm(String),
    /// The provider answered with a rate-limit or quota signal (HTTP 429, `insufficient_quota`).
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("failed after {attempts} retries")]
    RetriesExhausted { attempts: u32 },
    #[error("store error: {0}")]
    Store(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl Error {
    /// True for errors that should surface to users as "quota exceeded" rather than a
    /// generic failure.
    pub fn is_quota(&self) -> bool {
        matches!(self, Error::RateLimited(_) | Error::RetriesExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl SearchResult {
    /// `None` unless `url` is a string. Other fields are read leniently: a non-string
    /// `title` is dropped, and `snippet` falls back to `description`.
    pub fn from_object(obj: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        let url = obj.get("url")?.as_str()?;
        let text = |k: &str| obj.get(k).and_then(|v| v.as_str()).map(str::to_string);
        Some(Self {
            url: url.to_string(),
            title: text("title"),
            snippet: text("snippet").or_else(|| text("description")),
        })
    }
}

/// One entry of a provider's `web` list.
///
/// Providers are not strict about the shape of these entries; only a string `url` makes
/// an entry `Web`. Anything else lands in `Other` and is never scraped.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(from = "serde_json::Value")]
pub enum SearchItem {
    Web(SearchResult),
    Other(serde_json::Value),
}

impl From<serde_json::Value> for SearchItem {
    fn from(v: serde_json::Value) -> Self {
        match v.as_object().and_then(SearchResult::from_object) {
            Some(r) => SearchItem::Web(r),
            None => SearchItem::Other(v),
        }
    }
}

impl Serialize for SearchItem {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SearchItem::Web(r) => r.serialize(s),
            SearchItem::Other(v) => v.serialize(s),
        }
    }
}

impl SearchItem {
    pub fn as_web(&self) -> Option<&SearchResult> {
        match self {
            SearchItem::Web(r) => Some(r),
            SearchItem::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub web: Vec<SearchItem>,
    pub provider: String,
}

/// Text-bearing fields a scraped page may carry, highest priority first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageField {
    Markdown,
    Content,
    Text,
    Data,
    Html,
}

impl PageField {
    pub const PRIORITY: [PageField; 5] = [
        PageField::Markdown,
        PageField::Content,
        PageField::Text,
        PageField::Data,
        PageField::Html,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PageField::Markdown => "markdown",
            PageField::Content => "content",
            PageField::Text => "text",
            PageField::Data => "data",
            PageField::Html => "html",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageDocument {
    pub field: PageField,
    pub text: String,
}

impl PageDocument {
    /// Pick the highest-priority field holding a non-blank string.
    pub fn from_object(obj: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        PageField::PRIORITY.into_iter().find_map(|field| {
            let s = obj.get(field.key())?.as_str()?;
            if s.trim().is_empty() {
                return None;
            }
            Some(Self {
                field,
                text: s.to_string(),
            })
        })
    }
}

/// A scrape result, classified by shape.
///
/// Deserializes from any JSON value: top-level text fields win, then a `pages` list, and
/// everything else is kept verbatim for diagnostics.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(from = "serde_json::Value")]
pub enum PageResult {
    Document(PageDocument),
    /// Sub-pages in order; `None` where a sub-page had no usable text.
    Pages(Vec<Option<PageDocument>>),
    Unrecognized(serde_json::Value),
}

impl From<serde_json::Value> for PageResult {
    fn from(v: serde_json::Value) -> Self {
        let Some(obj) = v.as_object() else {
            return PageResult::Unrecognized(v);
        };
        if let Some(doc) = PageDocument::from_object(obj) {
            return PageResult::Document(doc);
        }
        if let Some(pages) = obj.get("pages").and_then(|p| p.as_array()) {
            let docs = pages
                .iter()
                .map(|p| p.as_object().and_then(PageDocument::from_object))
                .collect();
            return PageResult::Pages(docs);
        }
        PageResult::Unrecognized(v)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchReport {
    pub keywords: String,
    pub summary: String,
}

/// Append-only persisted form of a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchRecord {
    pub idea: String,
    pub keywords: String,
    pub summary: String,
    /// Epoch milliseconds.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

impl ResearchRecord {
    pub fn new(idea: impl Into<String>, report: &ResearchReport, created_at: i64) -> Self {
        Self {
            idea: idea.into(),
            keywords: report.keywords.clone(),
            summary: report.summary.clone(),
            created_at,
        }
    }
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse>;
}

#[async_trait::async_trait]
pub trait ScrapeProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn scrape(&self, url: &str) -> Result<PageResult>;
}

#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;
    /// Returns the first choice's message content, or an empty string when there is none.
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String>;
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn insert(&self, record: &ResearchRecord) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_prefers_top_level_fields_in_priority_order() {
        let p: PageResult =
            serde_json::from_value(json!({ "html": "<p>x</p>", "content": "body" })).unwrap();
        assert_eq!(
            p,
            PageResult::Document(PageDocument {
                field: PageField::Content,
                text: "body".to_string()
            })
        );
    }

    #[test]
    fn blank_top_level_falls_back_to_pages() {
        let p: PageResult = serde_json::from_value(json!({
            "markdown": "   ",
            "pages": [ { "text": "one" }, { "nothing": 1 }, "junk" ]
        }))
        .unwrap();
        let PageResult::Pages(pages) = p else {
            panic!("expected pages, got {p:?}");
        };
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].as_ref().map(|d| d.text.as_str()), Some("one"));
        assert!(pages[1].is_none());
        assert!(pages[2].is_none());
    }

    #[test]
    fn non_string_data_field_is_not_text() {
        let p: PageResult =
            serde_json::from_value(json!({ "data": { "markdown": "nested" } })).unwrap();
        assert!(matches!(p, PageResult::Unrecognized(_)));
    }

    #[test]
    fn search_items_without_string_url_are_other() {
        let items: Vec<SearchItem> = serde_json::from_value(json!([
            { "url": "https://a.example", "description": "d" },
            { "url": 7 },
            null
        ]))
        .unwrap();
        assert_eq!(
            items[0].as_web().map(|r| r.snippet.as_deref()),
            Some(Some("d"))
        );
        assert!(items[1].as_web().is_none());
        assert!(items[2].as_web().is_none());
    }

    #[test]
    fn string_url_alone_makes_a_web_item() {
        let odd_title: SearchItem =
            serde_json::from_value(json!({ "url": "https://a.example", "title": 5 })).unwrap();
        assert_eq!(
            odd_title.as_web(),
            Some(&SearchResult {
                url: "https://a.example".to_string(),
                title: None,
                snippet: None,
            })
        );

        let both: SearchItem = serde_json::from_value(
            json!({ "url": "https://b.example", "snippet": "s", "description": "d" }),
        )
        .unwrap();
        assert_eq!(both.as_web().and_then(|r| r.snippet.as_deref()), Some("s"));
    }

    #[test]
    fn quota_errors_are_classified() {
        assert!(Error::RateLimited("429".into()).is_quota());
        assert!(Error::RetriesExhausted { attempts: 3 }.is_quota());
        assert!(!Error::Llm("boom".into()).is_quota());
    }

    #[test]
    fn record_serializes_created_at_in_camel_case() {
        let r = ResearchRecord::new(
            "idea",
            &ResearchReport {
                keywords: "k".into(),
                summary: "s".into(),
            },
            42,
        );
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["createdAt"], 42);
        assert_eq!(v["idea"], "idea");
    }
}
