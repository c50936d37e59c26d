use crate::textprep::clean_text;
use ideascout_core::PageResult;
use tracing::warn;

/// Cleaned text of a scraped page, or `""` when the page carries none.
///
/// Sub-pages are cleaned one by one and joined with blank lines. Pages that yield nothing
/// are logged in full so provider shape changes show up in the logs.
pub fn page_text(page: &PageResult) -> String {
    let text = match page {
        PageResult::Document(doc) => clean_text(&doc.text),
        PageResult::Pages(pages) => pages
            .iter()
            .map(|p| p.as_ref().map(|d| clean_text(&d.text)).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n\n"),
        PageResult::Unrecognized(_) => String::new(),
    };
    if text.trim().is_empty() {
        match page {
            PageResult::Unrecognized(raw) => {
                warn!(page = %raw, "page returned no text");
            }
            other => {
                warn!(page = ?other, "page returned no text");
            }
        }
        return String::new();
    }
    text
}
